//! チャットコマンド
//!
//! コマンド名の解決、呼び出しコンテキスト、実行結果の型を定義する。
//! 実際の処理は [`orchestrator::Orchestrator`] が行う。

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::api::control_surface::MessageId;

pub mod error_translator;
pub mod messages;
pub mod orchestrator;

pub use orchestrator::{GamePreset, Orchestrator, OrchestratorSettings};

/// 呼び出し元のロール
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roles {
    #[serde(default)]
    pub broadcaster: bool,
    #[serde(default)]
    pub moderator: bool,
}

/// コマンド1回分の呼び出しコンテキスト
///
/// ハンドラの実行中だけ生きる値で、保存はしない。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationContext {
    /// 呼び出した視聴者のログイン名
    pub invoker: String,
    #[serde(default)]
    pub roles: Roles,
    /// パース済みの引数
    #[serde(default)]
    pub args: Vec<String>,
    /// 返信先メッセージ
    pub message_id: MessageId,
}

impl InvocationContext {
    pub fn new(invoker: impl Into<String>, message_id: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            invoker: invoker.into(),
            roles: Roles::default(),
            args,
            message_id: MessageId(message_id.into()),
        }
    }

    pub fn with_roles(mut self, roles: Roles) -> Self {
        self.roles = roles;
        self
    }

    pub fn as_broadcaster(self) -> Self {
        self.with_roles(Roles {
            broadcaster: true,
            moderator: false,
        })
    }

    pub fn as_moderator(self) -> Self {
        self.with_roles(Roles {
            broadcaster: false,
            moderator: true,
        })
    }

    /// 最初の引数（空白のみなら `None`）
    pub fn first_arg(&self) -> Option<&str> {
        self.args
            .first()
            .map(|s| s.as_str())
            .filter(|s| !s.trim().is_empty())
    }
}

/// 組み込みコマンド
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinCommand {
    Prediction,
    Poll,
    Clip,
    Cancel,
    Reset,
    Thanos,
    Title,
}

impl BuiltinCommand {
    /// コマンド名から解決（先頭の `!` と大文字小文字は無視）
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim().trim_start_matches('!').to_lowercase();
        match name.as_str() {
            "prediction" => Some(Self::Prediction),
            "poll" => Some(Self::Poll),
            "clip" => Some(Self::Clip),
            "cancel" => Some(Self::Cancel),
            "reset" => Some(Self::Reset),
            "thanos" => Some(Self::Thanos),
            "title" => Some(Self::Title),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Prediction => "prediction",
            Self::Poll => "poll",
            Self::Clip => "clip",
            Self::Cancel => "cancel",
            Self::Reset => "reset",
            Self::Thanos => "thanos",
            Self::Title => "title",
        }
    }
}

impl fmt::Display for BuiltinCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// コマンド実行結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// 正常終了
    Completed,
    /// 権限不足で拒否
    Denied,
    /// 引数の検証エラー
    Invalid,
    /// プラットフォーム呼び出しの失敗
    Failed,
    /// 何もしなかった（空のタイトルなど）
    Ignored,
    /// 未知のコマンド
    Unknown,
}

impl fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CommandOutcome::Completed => "completed",
            CommandOutcome::Denied => "denied",
            CommandOutcome::Invalid => "invalid",
            CommandOutcome::Failed => "failed",
            CommandOutcome::Ignored => "ignored",
            CommandOutcome::Unknown => "unknown",
        };
        f.write_str(label)
    }
}
