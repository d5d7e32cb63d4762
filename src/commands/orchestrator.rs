//! コマンドオーケストレーター
//!
//! エンゲージメントセッションとシャウトアウトトラッカーを所有し、
//! コマンド名ごとのハンドラへ振り分ける。状態を変えるハンドラは必ず先に権限を確認し、
//! プラットフォーム呼び出しが成功した後にだけ状態を更新する。
//!
//! ハンドラは1つずつ最後まで実行される前提（`&mut self`）。

use futures_util::future::join_all;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::api::control_surface::{ChannelUpdate, Chatter, ControlSurface, PlatformError};
use crate::chat_management::{ExemptChatters, Requirement, ShoutoutTracker};
use crate::commands::{
    error_translator, messages, BuiltinCommand, CommandOutcome, InvocationContext,
};
use crate::engagement::{default_poll_request, default_prediction_request, EngagementSession};
use crate::events::ChatEvent;

/// thanos のタイムアウト秒数
pub const THANOS_TIMEOUT_SECS: u64 = 15;

/// ゲーム固定コマンドの定義
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamePreset {
    /// コマンド名（`!` なし）
    pub command: String,
    /// プラットフォーム上のゲームID
    pub game_id: String,
    /// 返信に使う表示名
    pub name: String,
}

impl GamePreset {
    pub fn new(command: &str, game_id: &str, name: &str) -> Self {
        Self {
            command: command.to_string(),
            game_id: game_id.to_string(),
            name: name.to_string(),
        }
    }

    fn matches(&self, command: &str) -> bool {
        self.command.eq_ignore_ascii_case(command.trim().trim_start_matches('!'))
    }
}

/// 起動時に決まる設定
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub game_presets: Vec<GamePreset>,
    pub exempt_chatters: ExemptChatters,
    /// `{user}` を含むシャウトアウトコマンドのテンプレート
    pub shoutout_template: String,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            game_presets: Vec::new(),
            exempt_chatters: ExemptChatters::default(),
            shoutout_template: messages::DEFAULT_SHOUTOUT_TEMPLATE.to_string(),
        }
    }
}

pub struct Orchestrator {
    surface: Arc<dyn ControlSurface>,
    session: EngagementSession,
    tracker: ShoutoutTracker,
    game_presets: Vec<GamePreset>,
    shoutout_template: String,
    rng: StdRng,
}

impl Orchestrator {
    pub fn new(surface: Arc<dyn ControlSurface>, settings: OrchestratorSettings) -> Self {
        Self {
            surface,
            session: EngagementSession::new(),
            tracker: ShoutoutTracker::new(settings.exempt_chatters),
            game_presets: settings.game_presets,
            shoutout_template: settings.shoutout_template,
            rng: StdRng::from_entropy(),
        }
    }

    /// 乱数源を差し替える（テストで抽選を固定するため）
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn session(&self) -> &EngagementSession {
        &self.session
    }

    pub fn tracker(&self) -> &ShoutoutTracker {
        &self.tracker
    }

    /// トラッカーの準備。現在の視聴者一覧の取得に失敗しても空の状態で使えるようにする
    pub async fn initialize(&mut self) -> Result<usize, PlatformError> {
        match self.surface.list_chatters().await {
            Ok(chatters) => {
                let count = chatters.len();
                self.tracker
                    .initialize(chatters.iter().map(|c| c.user_login.as_str()));
                Ok(count)
            }
            Err(e) => {
                self.tracker.initialize(Vec::<String>::new());
                Err(e)
            }
        }
    }

    /// 受信イベントを1件処理する。コマンドの場合のみ結果を返す
    pub async fn handle_event(&mut self, event: ChatEvent) -> Option<CommandOutcome> {
        match event {
            ChatEvent::Connected { address } => {
                self.on_connected(address.as_deref());
                None
            }
            ChatEvent::Command { command, context } => Some(self.dispatch(&command, context).await),
            ChatEvent::Message { username } => {
                self.on_message(&username).await;
                None
            }
            ChatEvent::Raid { username, viewers } => {
                self.on_raid(&username, viewers).await;
                None
            }
            ChatEvent::Join { channel, username } => {
                self.on_join(&channel, &username);
                None
            }
        }
    }

    /// コマンドを対応するハンドラへ振り分ける
    pub async fn dispatch(&mut self, command: &str, ctx: InvocationContext) -> CommandOutcome {
        let outcome = match BuiltinCommand::parse(command) {
            Some(BuiltinCommand::Prediction) => self.prediction(&ctx).await,
            Some(BuiltinCommand::Poll) => self.poll(&ctx).await,
            Some(BuiltinCommand::Clip) => self.clip(&ctx).await,
            Some(BuiltinCommand::Cancel) => self.cancel(&ctx).await,
            Some(BuiltinCommand::Reset) => self.reset(&ctx).await,
            Some(BuiltinCommand::Thanos) => self.thanos(&ctx).await,
            Some(BuiltinCommand::Title) => self.title(&ctx).await,
            None => match self.game_presets.iter().find(|p| p.matches(command)).cloned() {
                Some(preset) => self.set_game(&ctx, &preset).await,
                None => {
                    tracing::debug!("🤷 [ORCHESTRATOR] Unknown command: {}", command);
                    CommandOutcome::Unknown
                }
            },
        };

        tracing::info!(
            command = %command,
            invoker = %ctx.invoker,
            outcome = %outcome,
            "🎯 [ORCHESTRATOR] Command handled"
        );
        outcome
    }

    /// 権限を確認し、足りなければ拒否メッセージを返信する
    async fn permitted(&self, requirement: Requirement, ctx: &InvocationContext) -> bool {
        if requirement.allows(ctx) {
            return true;
        }
        tracing::info!(
            "🚫 [ORCHESTRATOR] {} lacks {:?} permission",
            ctx.invoker,
            requirement
        );
        self.respond(ctx, requirement.rejection()).await;
        false
    }

    async fn respond(&self, ctx: &InvocationContext, text: &str) {
        if let Err(e) = self.surface.reply(&ctx.message_id, text).await {
            tracing::warn!("⚠️ [ORCHESTRATOR] Failed to reply to {}: {}", ctx.message_id, e);
        }
    }

    async fn fail(&self, ctx: &InvocationContext, error: &PlatformError) -> CommandOutcome {
        error_translator::report(self.surface.as_ref(), error, &ctx.message_id).await;
        CommandOutcome::Failed
    }

    /// 予想がなければ作成、あれば引数の番号で確定する
    async fn prediction(&mut self, ctx: &InvocationContext) -> CommandOutcome {
        if !self.permitted(Requirement::Moderator, ctx).await {
            return CommandOutcome::Denied;
        }

        let Some(prediction_id) = self.session.active_prediction().map(|p| p.id.clone()) else {
            return self.create_prediction(ctx).await;
        };

        let outcome = match self.session.winning_outcome(ctx.first_arg()) {
            Ok(outcome) => outcome,
            Err(invalid) => {
                tracing::info!("✋ [ORCHESTRATOR] Rejected resolve: {}", invalid);
                self.respond(ctx, &invalid.to_string()).await;
                return CommandOutcome::Invalid;
            }
        };

        match self
            .surface
            .resolve_prediction(&prediction_id, &outcome.id)
            .await
        {
            Ok(()) => {
                self.session.prediction_finished();
                self.respond(ctx, &messages::prediction_resolved(&outcome.title))
                    .await;
                CommandOutcome::Completed
            }
            Err(e) => self.fail(ctx, &e).await,
        }
    }

    async fn create_prediction(&mut self, ctx: &InvocationContext) -> CommandOutcome {
        let request = default_prediction_request();
        match self.surface.create_prediction(&request).await {
            Ok(prediction) => {
                let text = messages::prediction_started(
                    &prediction.title,
                    prediction.auto_lock_after.as_secs(),
                );
                self.session.prediction_started(prediction);
                self.respond(ctx, &text).await;
                CommandOutcome::Completed
            }
            Err(e) => self.fail(ctx, &e).await,
        }
    }

    async fn poll(&mut self, ctx: &InvocationContext) -> CommandOutcome {
        if !self.permitted(Requirement::Moderator, ctx).await {
            return CommandOutcome::Denied;
        }
        if self.session.has_poll() {
            self.respond(ctx, messages::POLL_ALREADY_RUNNING).await;
            return CommandOutcome::Ignored;
        }

        let request = default_poll_request();
        match self.surface.create_poll(&request).await {
            Ok(poll) => {
                let text = messages::poll_started(&poll.title, poll.duration.as_secs());
                self.session.poll_started(poll);
                self.respond(ctx, &text).await;
                CommandOutcome::Completed
            }
            Err(e) => self.fail(ctx, &e).await,
        }
    }

    /// 実行中の予想をキャンセルし、実行中の投票を終了する（両方あれば両方）
    async fn cancel(&mut self, ctx: &InvocationContext) -> CommandOutcome {
        if !self.permitted(Requirement::Moderator, ctx).await {
            return CommandOutcome::Denied;
        }
        if self.session.is_idle() {
            self.respond(ctx, messages::NOTHING_TO_CANCEL).await;
            return CommandOutcome::Ignored;
        }

        let mut failed = false;

        if let Some(prediction_id) = self.session.active_prediction().map(|p| p.id.clone()) {
            match self.surface.cancel_prediction(&prediction_id).await {
                Ok(()) => {
                    self.session.prediction_finished();
                    self.respond(ctx, messages::PREDICTION_CANCELLED).await;
                }
                Err(e) => {
                    self.fail(ctx, &e).await;
                    failed = true;
                }
            }
        }

        if let Some(poll_id) = self.session.active_poll().map(|p| p.id.clone()) {
            match self.surface.end_poll(&poll_id).await {
                Ok(()) => {
                    self.session.poll_finished();
                    self.respond(ctx, messages::POLL_ENDED).await;
                }
                Err(e) => {
                    self.fail(ctx, &e).await;
                    failed = true;
                }
            }
        }

        if failed {
            CommandOutcome::Failed
        } else {
            CommandOutcome::Completed
        }
    }

    async fn reset(&mut self, ctx: &InvocationContext) -> CommandOutcome {
        if !self.permitted(Requirement::Broadcaster, ctx).await {
            return CommandOutcome::Denied;
        }
        self.tracker.reset();
        self.respond(ctx, messages::SHOUTOUTS_RESET).await;
        CommandOutcome::Completed
    }

    async fn clip(&mut self, ctx: &InvocationContext) -> CommandOutcome {
        match self.surface.create_clip(false).await {
            Ok(clip) => {
                self.respond(ctx, &messages::clip_created(&clip.edit_url()))
                    .await;
                CommandOutcome::Completed
            }
            Err(e) => self.fail(ctx, &e).await,
        }
    }

    async fn title(&mut self, ctx: &InvocationContext) -> CommandOutcome {
        if ctx.first_arg().is_none() {
            return CommandOutcome::Ignored;
        }
        if !self.permitted(Requirement::Moderator, ctx).await {
            return CommandOutcome::Denied;
        }

        let title = ctx.args.join(" ").trim().to_string();
        match self.surface.update_channel(&ChannelUpdate::title(title)).await {
            Ok(()) => {
                self.respond(ctx, messages::TITLE_UPDATED).await;
                CommandOutcome::Completed
            }
            Err(e) => self.fail(ctx, &e).await,
        }
    }

    async fn set_game(&mut self, ctx: &InvocationContext, preset: &GamePreset) -> CommandOutcome {
        if !self.permitted(Requirement::Moderator, ctx).await {
            return CommandOutcome::Denied;
        }

        match self
            .surface
            .update_channel(&ChannelUpdate::game(&preset.game_id))
            .await
        {
            Ok(()) => {
                self.respond(ctx, &messages::game_updated(&preset.name))
                    .await;
                CommandOutcome::Completed
            }
            Err(e) => self.fail(ctx, &e).await,
        }
    }

    /// 対象外を除いた視聴者の半数（切り捨て）を無作為に選ぶ
    pub fn select_victims(&mut self, chatters: Vec<Chatter>) -> Vec<Chatter> {
        let exempt = self.tracker.exempt();
        let mut candidates: Vec<Chatter> = chatters
            .into_iter()
            .filter(|c| !exempt.contains(&c.user_login))
            .collect();

        candidates.shuffle(&mut self.rng);
        let half = candidates.len() / 2;
        candidates.truncate(half);
        candidates
    }

    async fn thanos(&mut self, ctx: &InvocationContext) -> CommandOutcome {
        if !self.permitted(Requirement::Broadcaster, ctx).await {
            return CommandOutcome::Denied;
        }

        let chatters = match self.surface.list_chatters().await {
            Ok(chatters) => chatters,
            Err(e) => return self.fail(ctx, &e).await,
        };

        let victims = self.select_victims(chatters);
        let quote = messages::THANOS_QUOTES[self.rng.gen_range(0..messages::THANOS_QUOTES.len())];

        tracing::info!("🫰 [ORCHESTRATOR] Snapping {} chatters", victims.len());

        let duration = Duration::from_secs(THANOS_TIMEOUT_SECS);
        let surface = self.surface.as_ref();
        let results = join_all(victims.iter().map(|victim| {
            surface.timeout_user(victim, duration, messages::THANOS_TIMEOUT_REASON)
        }))
        .await;

        for (victim, result) in victims.iter().zip(&results) {
            if let Err(e) = result {
                tracing::warn!(
                    "⚠️ [ORCHESTRATOR] Timeout of {} failed: {}",
                    victim.user_login,
                    e
                );
            }
        }

        match self.surface.send_chat_message(quote).await {
            Ok(()) => CommandOutcome::Completed,
            Err(e) => self.fail(ctx, &e).await,
        }
    }

    /// チャット1行ごとに呼ばれる。未シャウトアウトなら発行してから記録する
    pub async fn on_message(&mut self, username: &str) {
        if !self.tracker.should_shout_out(username) {
            return;
        }

        let text = messages::shoutout(&self.shoutout_template, username);
        match self.surface.send_chat_message(&text).await {
            Ok(()) => {
                self.tracker.mark_shouted_out(username);
                tracing::info!("📣 [SHOUTOUT] Shouted out {}", username);
            }
            Err(e) => {
                tracing::error!("❌ [SHOUTOUT] Failed to shout out {}: {}", username, e);
            }
        }
    }

    /// レイド受信。権限もトラッカーも見ずに、お礼とシャウトアウトを必ず投稿する
    pub async fn on_raid(&mut self, raider: &str, viewers: u64) {
        tracing::info!("🎉 [ORCHESTRATOR] Raid from {} with {} viewers", raider, viewers);

        let thanks = messages::raid_thanks(raider, viewers);
        if let Err(e) = self.surface.send_chat_message(&thanks).await {
            tracing::error!("❌ [ORCHESTRATOR] Failed to thank raider {}: {}", raider, e);
        }

        let shoutout = messages::shoutout(&self.shoutout_template, raider);
        if let Err(e) = self.surface.send_chat_message(&shoutout).await {
            tracing::error!("❌ [ORCHESTRATOR] Failed to shout out raider {}: {}", raider, e);
        }
    }

    pub fn on_join(&mut self, channel: &str, username: &str) {
        tracing::debug!("👋 [ORCHESTRATOR] {} joined {}", username, channel);
        self.tracker.observe(username);
    }

    pub fn on_connected(&mut self, address: Option<&str>) {
        tracing::info!(
            "🔌 [ORCHESTRATOR] Connected to chat{}",
            address.map(|a| format!(" ({})", a)).unwrap_or_default()
        );
    }
}
