//! アプリケーション設定管理モジュール
//!
//! XDGディレクトリ上の TOML 設定ファイルを読み込み、環境変数で認証情報を上書きする。

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::api::helix::{HelixCredentials, DEFAULT_BASE_URL};
use crate::chat_management::ExemptChatters;
use crate::commands::{messages, BuiltinCommand, GamePreset, OrchestratorSettings};

pub const ENV_CLIENT_ID: &str = "EMCEE_CLIENT_ID";
pub const ENV_ACCESS_TOKEN: &str = "EMCEE_ACCESS_TOKEN";
pub const ENV_BROADCASTER_ID: &str = "EMCEE_BROADCASTER_ID";
pub const ENV_BOT_USER_ID: &str = "EMCEE_BOT_USER_ID";

/// 設定エラー
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("設定ディレクトリを特定できません")]
    NoProjectDirs,

    #[error("設定ファイルの読み込みに失敗しました ({path}): {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("設定ファイルの解析に失敗しました ({path}): {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("必須の設定がありません: {0}")]
    Missing(&'static str),
}

/// 設定の読み込み元
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// ファイルがなく既定値を使った
    Defaults(PathBuf),
}

impl ConfigSource {
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => {
                info!("✅ Configuration loaded from: {}", path.display())
            }
            ConfigSource::Defaults(path) => info!(
                "Config file not found, using default settings: {}",
                path.display()
            ),
        }
    }
}

/// チャンネル設定
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// 配信者のログイン名
    pub login: String,
    pub broadcaster_id: String,
    /// Bot アカウントのログイン名
    pub bot_login: String,
    pub bot_user_id: String,
}

/// Helix API 設定
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HelixConfig {
    pub base_url: String,
    pub client_id: String,
    /// 通常は環境変数で渡す
    pub access_token: Option<String>,
}

impl Default for HelixConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            client_id: String::new(),
            access_token: None,
        }
    }
}

/// ログ設定
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// カスタムログディレクトリ（Noneの場合はXDGデフォルト使用）
    pub log_dir: Option<PathBuf>,
    /// ログレベル (trace/debug/info/warn/error)
    pub log_level: String,
    /// ファイル出力有効化
    pub enable_file_logging: bool,
    /// 保存するログファイル数上限
    pub max_log_files: u32,
    /// ログファイル名の接頭辞
    pub log_file_prefix: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            log_level: "info".to_string(),
            enable_file_logging: true,
            max_log_files: 30,
            log_file_prefix: "emcee.log".to_string(),
        }
    }
}

/// 既定のゲーム固定コマンド
pub fn default_game_presets() -> Vec<GamePreset> {
    vec![
        GamePreset::new("justchatting", "509658", "Just Chatting"),
        GamePreset::new("valorant", "516575", "VALORANT"),
        GamePreset::new("minecraft", "27471", "Minecraft"),
    ]
}

/// 既定の対象外アカウント（よく使われるBot）
pub fn default_exempt_chatters() -> Vec<String> {
    ["nightbot", "streamelements", "streamlabs", "moobot", "fossabot", "soundalerts"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// アプリケーション設定
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub channel: ChannelConfig,
    pub helix: HelixConfig,
    pub game_presets: Vec<GamePreset>,
    pub exempt_chatters: Vec<String>,
    /// `{user}` がログイン名に置き換わる
    pub shoutout_template: String,
    pub log: LogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            channel: ChannelConfig::default(),
            helix: HelixConfig::default(),
            game_presets: default_game_presets(),
            exempt_chatters: default_exempt_chatters(),
            shoutout_template: messages::DEFAULT_SHOUTOUT_TEMPLATE.to_string(),
            log: LogConfig::default(),
        }
    }
}

impl AppConfig {
    /// XDGディレクトリに基づく設定ファイルパスを取得
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let project_dirs =
            ProjectDirs::from("dev", "emcee", "emcee").ok_or(ConfigError::NoProjectDirs)?;
        Ok(project_dirs.config_dir().join("config.toml"))
    }

    /// ログの既定ディレクトリ
    pub fn default_log_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "emcee", "emcee").map(|d| d.data_local_dir().join("logs"))
    }

    /// 設定を読み込み（ファイルがなければ既定値）
    ///
    /// ログ初期化より前に呼ばれるため、ここではログを出さない。
    /// 読み込み元は [`ConfigSource`] として返すので、ログ初期化後に出力すること。
    pub fn load(path: &Path) -> Result<(Self, ConfigSource), ConfigError> {
        if !path.exists() {
            return Ok((Self::default(), ConfigSource::Defaults(path.to_path_buf())));
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AppConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        Ok((config, ConfigSource::File(path.to_path_buf())))
    }

    /// 環境変数で上書き
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_CLIENT_ID) {
            self.helix.client_id = v;
        }
        if let Some(v) = get(ENV_ACCESS_TOKEN) {
            self.helix.access_token = Some(v);
        }
        if let Some(v) = get(ENV_BROADCASTER_ID) {
            self.channel.broadcaster_id = v;
        }
        if let Some(v) = get(ENV_BOT_USER_ID) {
            self.channel.bot_user_id = v;
        }
    }

    /// 実際にプラットフォームへ接続するのに必要な値が揃っているか
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.helix.client_id.trim().is_empty() {
            return Err(ConfigError::Missing("helix.client_id"));
        }
        if self
            .helix
            .access_token
            .as_deref()
            .map_or(true, |t| t.trim().is_empty())
        {
            return Err(ConfigError::Missing("helix.access_token"));
        }
        if self.channel.broadcaster_id.trim().is_empty() {
            return Err(ConfigError::Missing("channel.broadcaster_id"));
        }
        if self.channel.bot_user_id.trim().is_empty() {
            return Err(ConfigError::Missing("channel.bot_user_id"));
        }

        for preset in &self.game_presets {
            if BuiltinCommand::parse(&preset.command).is_some() {
                warn!(
                    "⚠️ Game preset '{}' is shadowed by a built-in command",
                    preset.command
                );
            }
        }
        Ok(())
    }

    pub fn helix_credentials(&self) -> Result<HelixCredentials, ConfigError> {
        let access_token = self
            .helix
            .access_token
            .clone()
            .ok_or(ConfigError::Missing("helix.access_token"))?;
        Ok(HelixCredentials {
            client_id: self.helix.client_id.clone(),
            access_token,
            broadcaster_id: self.channel.broadcaster_id.clone(),
            bot_user_id: self.channel.bot_user_id.clone(),
        })
    }

    /// 対象外リストに Bot 自身と配信者を加えたもの
    pub fn exempt_chatters(&self) -> ExemptChatters {
        ExemptChatters::new(
            self.exempt_chatters
                .iter()
                .map(String::as_str)
                .chain([self.channel.bot_login.as_str(), self.channel.login.as_str()]),
        )
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            game_presets: self.game_presets.clone(),
            exempt_chatters: self.exempt_chatters(),
            shoutout_template: self.shoutout_template.clone(),
        }
    }
}
