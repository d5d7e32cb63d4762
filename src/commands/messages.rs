//! チャットに送る定型文

pub const MOD_ONLY: &str = "Only moderators and the broadcaster can use this command.";
pub const BROADCASTER_ONLY: &str = "Only the broadcaster can use this command.";

pub const GENERIC_ERROR: &str = "An error occurred";

pub const TITLE_UPDATED: &str = "Stream title updated!";
pub const NOTHING_TO_CANCEL: &str = "Nothing to cancel.";
pub const PREDICTION_CANCELLED: &str = "Prediction cancelled.";
pub const POLL_ENDED: &str = "Poll ended.";
pub const POLL_ALREADY_RUNNING: &str = "A poll is already running.";
pub const SHOUTOUTS_RESET: &str = "Shoutout list has been reset.";

pub const THANOS_TIMEOUT_REASON: &str = "Perfectly balanced, as all things should be.";

/// thanos 実行後に1つだけ投稿する引用
pub const THANOS_QUOTES: [&str; 6] = [
    "I am inevitable.",
    "Perfectly balanced, as all things should be.",
    "The hardest choices require the strongest wills.",
    "Dread it. Run from it. Destiny arrives all the same.",
    "You could not live with your own failure. Where did that bring you? Back to me.",
    "I used the stones to destroy the stones.",
];

pub const DEFAULT_SHOUTOUT_TEMPLATE: &str = "!so {user}";

pub fn game_updated(name: &str) -> String {
    format!("Game set to {}!", name)
}

pub fn prediction_started(title: &str, seconds: u64) -> String {
    format!(
        "Prediction started: {} You have {} seconds to place your points!",
        title, seconds
    )
}

pub fn prediction_resolved(outcome_title: &str) -> String {
    format!("Prediction resolved: \"{}\" wins!", outcome_title)
}

pub fn poll_started(title: &str, seconds: u64) -> String {
    format!("Poll started: {} Voting closes in {} seconds.", title, seconds)
}

pub fn clip_created(edit_url: &str) -> String {
    format!("Clip created! {}", edit_url)
}

pub fn raid_thanks(raider: &str, viewers: u64) -> String {
    format!(
        "Thank you so much for the raid, {}! Welcome to all {} of you!",
        raider, viewers
    )
}

/// `{user}` をログイン名で置き換える
pub fn shoutout(template: &str, username: &str) -> String {
    template.replace("{user}", username)
}
