//! Control-surface abstraction.
//!
//! The orchestrator only talks to the platform through [`ControlSurface`], so a
//! real HTTP client and the in-memory [`crate::api::scripted::ScriptedSurface`]
//! are interchangeable.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Failure reported by a control-surface call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlatformError {
    /// The platform answered with a non-success HTTP status
    #[error("Platform API returned status {status_code}: {body}")]
    StructuredApi { status_code: u16, body: String },

    /// Anything else (connection failures, undecodable responses, ...)
    #[error("Platform call failed: {message}")]
    Other { message: String },
}

impl PlatformError {
    pub fn structured(status_code: u16, body: impl Into<String>) -> Self {
        Self::StructuredApi {
            status_code,
            body: body.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Extract the `message` field of a structured JSON error body, if non-blank.
    pub fn api_message(&self) -> Option<String> {
        match self {
            PlatformError::StructuredApi { body, .. } => {
                serde_json::from_str::<serde_json::Value>(body)
                    .ok()?
                    .get("message")?
                    .as_str()
                    .filter(|m| !m.trim().is_empty())
                    .map(|s| s.to_string())
            }
            PlatformError::Other { .. } => None,
        }
    }
}

impl From<reqwest::Error> for PlatformError {
    fn from(err: reqwest::Error) -> Self {
        PlatformError::other(err.to_string())
    }
}

/// Id of a chat message, used as the parent of a reply.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClipId(pub String);

impl ClipId {
    /// Edit page for a freshly created clip.
    pub fn edit_url(&self) -> String {
        format!("https://clips.twitch.tv/{}/edit", self.0)
    }
}

/// Channel metadata update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChannelUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_id: Option<String>,
}

impl ChannelUpdate {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            game_id: None,
        }
    }

    pub fn game(game_id: impl Into<String>) -> Self {
        Self {
            title: None,
            game_id: Some(game_id.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPrediction {
    pub title: String,
    pub outcomes: Vec<String>,
    pub prediction_window: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub id: String,
    pub title: String,
    /// 1-based position, the number chatters type to pick it
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub id: String,
    pub title: String,
    pub outcomes: Vec<Outcome>,
    pub auto_lock_after: Duration,
}

impl Prediction {
    /// Outcome by its 1-based index.
    pub fn outcome(&self, index: usize) -> Option<&Outcome> {
        index.checked_sub(1).and_then(|i| self.outcomes.get(i))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPoll {
    pub title: String,
    pub choices: Vec<String>,
    pub duration: Duration,
    pub channel_points_per_vote: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Poll {
    pub id: String,
    pub title: String,
    pub choices: Vec<String>,
    pub duration: Duration,
    pub channel_points_per_vote: u32,
}

/// A user currently present in chat.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Chatter {
    pub user_id: String,
    pub user_login: String,
}

/// The operations the assistant needs from the streaming platform.
#[async_trait]
pub trait ControlSurface: Send + Sync {
    async fn update_channel(&self, update: &ChannelUpdate) -> Result<(), PlatformError>;

    async fn create_prediction(&self, request: &NewPrediction)
        -> Result<Prediction, PlatformError>;

    async fn resolve_prediction(
        &self,
        prediction_id: &str,
        winning_outcome_id: &str,
    ) -> Result<(), PlatformError>;

    async fn cancel_prediction(&self, prediction_id: &str) -> Result<(), PlatformError>;

    async fn create_poll(&self, request: &NewPoll) -> Result<Poll, PlatformError>;

    /// End a poll before its natural duration.
    async fn end_poll(&self, poll_id: &str) -> Result<(), PlatformError>;

    async fn create_clip(&self, has_delay: bool) -> Result<ClipId, PlatformError>;

    async fn list_chatters(&self) -> Result<Vec<Chatter>, PlatformError>;

    async fn timeout_user(
        &self,
        chatter: &Chatter,
        duration: Duration,
        reason: &str,
    ) -> Result<(), PlatformError>;

    /// Post a plain chat message.
    async fn send_chat_message(&self, text: &str) -> Result<(), PlatformError>;

    /// Reply to a specific chat message.
    async fn reply(&self, parent: &MessageId, text: &str) -> Result<(), PlatformError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_message_extraction() {
        let err = PlatformError::structured(
            400,
            r#"{"error":"Bad Request","status":400,"message":"prediction already active"}"#,
        );
        assert_eq!(err.api_message().as_deref(), Some("prediction already active"));

        let no_message = PlatformError::structured(500, r#"{"error":"Internal"}"#);
        assert_eq!(no_message.api_message(), None);

        let not_json = PlatformError::structured(502, "<html>bad gateway</html>");
        assert_eq!(not_json.api_message(), None);

        assert_eq!(PlatformError::other("connection reset").api_message(), None);
    }

    #[test]
    fn test_prediction_outcome_lookup_is_one_based() {
        let prediction = Prediction {
            id: "p1".to_string(),
            title: "Will we win?".to_string(),
            outcomes: vec![
                Outcome {
                    id: "o1".to_string(),
                    title: "Yes".to_string(),
                    index: 1,
                },
                Outcome {
                    id: "o2".to_string(),
                    title: "No".to_string(),
                    index: 2,
                },
            ],
            auto_lock_after: Duration::from_secs(60),
        };

        assert!(prediction.outcome(0).is_none());
        assert_eq!(prediction.outcome(1).map(|o| o.id.as_str()), Some("o1"));
        assert_eq!(prediction.outcome(2).map(|o| o.id.as_str()), Some("o2"));
        assert!(prediction.outcome(3).is_none());
    }

    #[test]
    fn test_clip_edit_url() {
        let clip = ClipId("AwkwardHelplessSalamanderSwiftRage".to_string());
        assert_eq!(
            clip.edit_url(),
            "https://clips.twitch.tv/AwkwardHelplessSalamanderSwiftRage/edit"
        );
    }

    #[test]
    fn test_channel_update_serialization_skips_empty_fields() {
        let json = serde_json::to_value(ChannelUpdate::title("New title")).unwrap();
        assert_eq!(json, serde_json::json!({"title": "New title"}));

        let json = serde_json::to_value(ChannelUpdate::game("509658")).unwrap();
        assert_eq!(json, serde_json::json!({"game_id": "509658"}));
    }
}
