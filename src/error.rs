//! クレート共通のエラー型

use thiserror::Error;

use crate::api::control_surface::PlatformError;
use crate::config::ConfigError;
use crate::engagement::ValidationError;
use crate::io::FeedError;

#[derive(Error, Debug)]
pub enum EmceeError {
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Event feed error: {0}")]
    Feed(#[from] FeedError),

    #[error(transparent)]
    General(#[from] anyhow::Error),
}

pub type EmceeResult<T> = Result<T, EmceeError>;
