pub mod permissions; // 権限チェック
pub mod shoutout; // シャウトアウト管理

pub use permissions::{is_broadcaster, is_moderator, Requirement};
pub use shoutout::{ExemptChatters, ShoutoutRecord, ShoutoutTracker};
