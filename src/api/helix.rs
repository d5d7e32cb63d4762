//! Helix REST implementation of [`ControlSurface`].

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use std::time::Duration;

use crate::api::control_surface::{
    ChannelUpdate, Chatter, ClipId, ControlSurface, MessageId, NewPoll, NewPrediction, Outcome,
    PlatformError, Poll, Prediction,
};

pub const DEFAULT_BASE_URL: &str = "https://api.twitch.tv/helix";

/// Page size for `GET /chat/chatters` (the platform maximum)
const CHATTERS_PAGE_SIZE: &str = "1000";

/// Credentials and ids the client acts with.
#[derive(Debug, Clone)]
pub struct HelixCredentials {
    pub client_id: String,
    pub access_token: String,
    /// Channel the bot operates on
    pub broadcaster_id: String,
    /// User the token belongs to; moderator and chat sender for every call
    pub bot_user_id: String,
}

#[derive(Debug, Clone)]
pub struct HelixClient {
    base_url: String,
    credentials: HelixCredentials,
    http_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: Vec<T>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HelixOutcome {
    id: String,
    title: String,
}

#[derive(Debug, Deserialize)]
struct HelixPrediction {
    id: String,
    title: String,
    outcomes: Vec<HelixOutcome>,
    prediction_window: u64,
}

#[derive(Debug, Deserialize)]
struct HelixChoice {
    title: String,
}

#[derive(Debug, Deserialize)]
struct HelixPoll {
    id: String,
    title: String,
    choices: Vec<HelixChoice>,
    duration: u64,
    #[serde(default)]
    channel_points_per_vote: u32,
}

#[derive(Debug, Deserialize)]
struct HelixClip {
    id: String,
}

#[derive(Debug, Deserialize)]
struct HelixSentMessage {
    is_sent: bool,
    #[serde(default)]
    drop_reason: Option<DropReason>,
}

#[derive(Debug, Default, Deserialize)]
struct DropReason {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct HelixChatter {
    user_id: String,
    user_login: String,
}

impl From<HelixPrediction> for Prediction {
    fn from(p: HelixPrediction) -> Self {
        Prediction {
            id: p.id,
            title: p.title,
            outcomes: p
                .outcomes
                .into_iter()
                .enumerate()
                .map(|(i, o)| Outcome {
                    id: o.id,
                    title: o.title,
                    index: i + 1,
                })
                .collect(),
            auto_lock_after: Duration::from_secs(p.prediction_window),
        }
    }
}

impl From<HelixPoll> for Poll {
    fn from(p: HelixPoll) -> Self {
        Poll {
            id: p.id,
            title: p.title,
            choices: p.choices.into_iter().map(|c| c.title).collect(),
            duration: Duration::from_secs(p.duration),
            channel_points_per_vote: p.channel_points_per_vote,
        }
    }
}

impl HelixClient {
    pub fn new(credentials: HelixCredentials) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, credentials)
    }

    pub fn with_base_url(base_url: impl Into<String>, credentials: HelixCredentials) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            http_client: reqwest::Client::new(),
        }
    }

    pub fn credentials(&self) -> &HelixCredentials {
        &self.credentials
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.http_client
            .request(method, url)
            .header("Client-Id", &self.credentials.client_id)
            .bearer_auth(&self.credentials.access_token)
    }

    /// Send a request; non-2xx statuses become [`PlatformError::StructuredApi`].
    async fn send(&self, request: RequestBuilder) -> Result<Response, PlatformError> {
        let response = request.send().await.map_err(|e| {
            tracing::error!("❌ [HELIX] HTTP request failed: {}", e);
            PlatformError::from(e)
        })?;

        let status = response.status();
        tracing::debug!("📡 [HELIX] {} -> {}", response.url().path(), status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("⚠️ [HELIX] Request rejected with status {}", status);
            return Err(PlatformError::structured(status.as_u16(), body));
        }

        Ok(response)
    }

    async fn first_item<T>(&self, request: RequestBuilder) -> Result<T, PlatformError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self.send(request).await?;
        let envelope: DataEnvelope<T> = response.json().await.map_err(|e| {
            tracing::error!("❌ [HELIX] Failed to parse response: {}", e);
            PlatformError::other(format!("Failed to parse response: {}", e))
        })?;

        envelope
            .data
            .into_iter()
            .next()
            .ok_or_else(|| PlatformError::other("Response contained no data"))
    }

    async fn post_chat(&self, text: &str, parent: Option<&MessageId>) -> Result<(), PlatformError> {
        let mut body = serde_json::json!({
            "broadcaster_id": self.credentials.broadcaster_id,
            "sender_id": self.credentials.bot_user_id,
            "message": text,
        });
        if let Some(parent) = parent {
            body["reply_parent_message_id"] = serde_json::Value::String(parent.0.clone());
        }

        let sent: HelixSentMessage = self
            .first_item(self.request(Method::POST, "/chat/messages").json(&body))
            .await?;
        if sent.is_sent {
            return Ok(());
        }

        // 200 でも破棄されることがある（重複・レート制限・AutoMod）
        let reason = sent.drop_reason.unwrap_or_default();
        tracing::warn!(
            code = %reason.code,
            "⚠️ [HELIX] Chat message dropped: {}",
            reason.message
        );
        Err(PlatformError::other(if reason.message.is_empty() {
            "Chat message was not sent".to_string()
        } else {
            format!("Chat message was not sent: {}", reason.message)
        }))
    }
}

#[async_trait]
impl ControlSurface for HelixClient {
    async fn update_channel(&self, update: &ChannelUpdate) -> Result<(), PlatformError> {
        tracing::info!("📝 [HELIX] Updating channel info: {:?}", update);
        self.send(
            self.request(Method::PATCH, "/channels")
                .query(&[("broadcaster_id", &self.credentials.broadcaster_id)])
                .json(update),
        )
        .await?;
        Ok(())
    }

    async fn create_prediction(
        &self,
        request: &NewPrediction,
    ) -> Result<Prediction, PlatformError> {
        let outcomes: Vec<_> = request
            .outcomes
            .iter()
            .map(|title| serde_json::json!({ "title": title }))
            .collect();
        let body = serde_json::json!({
            "broadcaster_id": self.credentials.broadcaster_id,
            "title": request.title,
            "outcomes": outcomes,
            "prediction_window": request.prediction_window.as_secs(),
        });

        let prediction: HelixPrediction = self
            .first_item(self.request(Method::POST, "/predictions").json(&body))
            .await?;
        tracing::info!("🔮 [HELIX] Prediction created: {}", prediction.id);
        Ok(prediction.into())
    }

    async fn resolve_prediction(
        &self,
        prediction_id: &str,
        winning_outcome_id: &str,
    ) -> Result<(), PlatformError> {
        let body = serde_json::json!({
            "broadcaster_id": self.credentials.broadcaster_id,
            "id": prediction_id,
            "status": "RESOLVED",
            "winning_outcome_id": winning_outcome_id,
        });
        self.send(self.request(Method::PATCH, "/predictions").json(&body))
            .await?;
        Ok(())
    }

    async fn cancel_prediction(&self, prediction_id: &str) -> Result<(), PlatformError> {
        let body = serde_json::json!({
            "broadcaster_id": self.credentials.broadcaster_id,
            "id": prediction_id,
            "status": "CANCELED",
        });
        self.send(self.request(Method::PATCH, "/predictions").json(&body))
            .await?;
        Ok(())
    }

    async fn create_poll(&self, request: &NewPoll) -> Result<Poll, PlatformError> {
        let choices: Vec<_> = request
            .choices
            .iter()
            .map(|title| serde_json::json!({ "title": title }))
            .collect();
        let body = serde_json::json!({
            "broadcaster_id": self.credentials.broadcaster_id,
            "title": request.title,
            "choices": choices,
            "duration": request.duration.as_secs(),
            "channel_points_voting_enabled": request.channel_points_per_vote > 0,
            "channel_points_per_vote": request.channel_points_per_vote,
        });

        let poll: HelixPoll = self
            .first_item(self.request(Method::POST, "/polls").json(&body))
            .await?;
        tracing::info!("📊 [HELIX] Poll created: {}", poll.id);
        Ok(poll.into())
    }

    async fn end_poll(&self, poll_id: &str) -> Result<(), PlatformError> {
        let body = serde_json::json!({
            "broadcaster_id": self.credentials.broadcaster_id,
            "id": poll_id,
            "status": "TERMINATED",
        });
        self.send(self.request(Method::PATCH, "/polls").json(&body))
            .await?;
        Ok(())
    }

    async fn create_clip(&self, has_delay: bool) -> Result<ClipId, PlatformError> {
        let clip: HelixClip = self
            .first_item(self.request(Method::POST, "/clips").query(&[
                ("broadcaster_id", self.credentials.broadcaster_id.as_str()),
                ("has_delay", if has_delay { "true" } else { "false" }),
            ]))
            .await?;
        tracing::info!("🎬 [HELIX] Clip created: {}", clip.id);
        Ok(ClipId(clip.id))
    }

    async fn list_chatters(&self) -> Result<Vec<Chatter>, PlatformError> {
        let mut chatters = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut query = vec![
                ("broadcaster_id", self.credentials.broadcaster_id.clone()),
                ("moderator_id", self.credentials.bot_user_id.clone()),
                ("first", CHATTERS_PAGE_SIZE.to_string()),
            ];
            if let Some(after) = cursor.take() {
                query.push(("after", after));
            }

            let response = self
                .send(self.request(Method::GET, "/chat/chatters").query(&query))
                .await?;
            let page: DataEnvelope<HelixChatter> = response.json().await.map_err(|e| {
                PlatformError::other(format!("Failed to parse chatters response: {}", e))
            })?;

            chatters.extend(page.data.into_iter().map(|c| Chatter {
                user_id: c.user_id,
                user_login: c.user_login,
            }));

            match page.pagination.and_then(|p| p.cursor) {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }

        tracing::debug!("👥 [HELIX] Fetched {} chatters", chatters.len());
        Ok(chatters)
    }

    async fn timeout_user(
        &self,
        chatter: &Chatter,
        duration: Duration,
        reason: &str,
    ) -> Result<(), PlatformError> {
        let body = serde_json::json!({
            "data": {
                "user_id": chatter.user_id,
                "duration": duration.as_secs(),
                "reason": reason,
            }
        });
        self.send(
            self.request(Method::POST, "/moderation/bans")
                .query(&[
                    ("broadcaster_id", &self.credentials.broadcaster_id),
                    ("moderator_id", &self.credentials.bot_user_id),
                ])
                .json(&body),
        )
        .await?;
        Ok(())
    }

    async fn send_chat_message(&self, text: &str) -> Result<(), PlatformError> {
        self.post_chat(text, None).await
    }

    async fn reply(&self, parent: &MessageId, text: &str) -> Result<(), PlatformError> {
        self.post_chat(text, Some(parent)).await
    }
}
