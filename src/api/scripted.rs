//! In-memory control surface.
//!
//! Records every call instead of reaching the platform. The binary uses it for
//! `--dry-run` rehearsals; tests use it to observe what the orchestrator did and
//! to make individual operations fail.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

use crate::api::control_surface::{
    ChannelUpdate, Chatter, ClipId, ControlSurface, MessageId, NewPoll, NewPrediction, Outcome,
    PlatformError, Poll, Prediction,
};

/// A call the surface received, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    UpdateChannel(ChannelUpdate),
    CreatePrediction(NewPrediction),
    ResolvePrediction {
        prediction_id: String,
        winning_outcome_id: String,
    },
    CancelPrediction(String),
    CreatePoll(NewPoll),
    EndPoll(String),
    CreateClip { has_delay: bool },
    ListChatters,
    Timeout { user_login: String, duration: Duration },
    ChatMessage(String),
    Reply { parent: MessageId, text: String },
}

/// Operation kinds that can be scripted to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    UpdateChannel,
    CreatePrediction,
    ResolvePrediction,
    CancelPrediction,
    CreatePoll,
    EndPoll,
    CreateClip,
    ListChatters,
    Timeout,
    ChatMessage,
    Reply,
}

#[derive(Debug, Default)]
struct ScriptState {
    calls: Vec<SurfaceCall>,
    failures: HashMap<Operation, PlatformError>,
    timeout_failures: HashMap<String, PlatformError>,
    chatters: Vec<Chatter>,
    next_id: u64,
}

impl ScriptState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }
}

#[derive(Debug, Default)]
pub struct ScriptedSurface {
    state: Mutex<ScriptState>,
}

impl ScriptedSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chatters returned by `list_chatters`.
    pub fn with_chatters<I, S>(self, logins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        {
            let mut state = self.state.lock();
            state.chatters = logins
                .into_iter()
                .enumerate()
                .map(|(i, login)| Chatter {
                    user_id: format!("{}", 1000 + i),
                    user_login: login.into(),
                })
                .collect();
        }
        self
    }

    /// Make every subsequent call of `operation` fail with `error`.
    pub fn fail(&self, operation: Operation, error: PlatformError) {
        self.state.lock().failures.insert(operation, error);
    }

    /// Make only the timeout of `user_login` fail.
    pub fn fail_timeout_for(&self, user_login: &str, error: PlatformError) {
        self.state
            .lock()
            .timeout_failures
            .insert(user_login.to_string(), error);
    }

    pub fn clear_failures(&self) {
        let mut state = self.state.lock();
        state.failures.clear();
        state.timeout_failures.clear();
    }

    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.state.lock().calls.clone()
    }

    pub fn take_calls(&self) -> Vec<SurfaceCall> {
        std::mem::take(&mut self.state.lock().calls)
    }

    /// Texts of every chat post and reply, in order.
    pub fn chat_lines(&self) -> Vec<String> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                SurfaceCall::ChatMessage(text) => Some(text.clone()),
                SurfaceCall::Reply { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Record the call, then either return the scripted failure or `Ok(())`.
    fn record(&self, operation: Operation, call: SurfaceCall) -> Result<(), PlatformError> {
        tracing::info!("🧪 [DRY_RUN] {:?}", call);
        let mut state = self.state.lock();
        state.calls.push(call);
        match state.failures.get(&operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ControlSurface for ScriptedSurface {
    async fn update_channel(&self, update: &ChannelUpdate) -> Result<(), PlatformError> {
        self.record(
            Operation::UpdateChannel,
            SurfaceCall::UpdateChannel(update.clone()),
        )
    }

    async fn create_prediction(
        &self,
        request: &NewPrediction,
    ) -> Result<Prediction, PlatformError> {
        self.record(
            Operation::CreatePrediction,
            SurfaceCall::CreatePrediction(request.clone()),
        )?;

        let mut state = self.state.lock();
        let id = state.next_id("prediction");
        let outcomes = request
            .outcomes
            .iter()
            .enumerate()
            .map(|(i, title)| Outcome {
                id: format!("{}-outcome-{}", id, i + 1),
                title: title.clone(),
                index: i + 1,
            })
            .collect();

        Ok(Prediction {
            id,
            title: request.title.clone(),
            outcomes,
            auto_lock_after: request.prediction_window,
        })
    }

    async fn resolve_prediction(
        &self,
        prediction_id: &str,
        winning_outcome_id: &str,
    ) -> Result<(), PlatformError> {
        self.record(
            Operation::ResolvePrediction,
            SurfaceCall::ResolvePrediction {
                prediction_id: prediction_id.to_string(),
                winning_outcome_id: winning_outcome_id.to_string(),
            },
        )
    }

    async fn cancel_prediction(&self, prediction_id: &str) -> Result<(), PlatformError> {
        self.record(
            Operation::CancelPrediction,
            SurfaceCall::CancelPrediction(prediction_id.to_string()),
        )
    }

    async fn create_poll(&self, request: &NewPoll) -> Result<Poll, PlatformError> {
        self.record(Operation::CreatePoll, SurfaceCall::CreatePoll(request.clone()))?;

        let id = self.state.lock().next_id("poll");
        Ok(Poll {
            id,
            title: request.title.clone(),
            choices: request.choices.clone(),
            duration: request.duration,
            channel_points_per_vote: request.channel_points_per_vote,
        })
    }

    async fn end_poll(&self, poll_id: &str) -> Result<(), PlatformError> {
        self.record(Operation::EndPoll, SurfaceCall::EndPoll(poll_id.to_string()))
    }

    async fn create_clip(&self, has_delay: bool) -> Result<ClipId, PlatformError> {
        self.record(Operation::CreateClip, SurfaceCall::CreateClip { has_delay })?;
        Ok(ClipId(self.state.lock().next_id("clip")))
    }

    async fn list_chatters(&self) -> Result<Vec<Chatter>, PlatformError> {
        self.record(Operation::ListChatters, SurfaceCall::ListChatters)?;
        Ok(self.state.lock().chatters.clone())
    }

    async fn timeout_user(
        &self,
        chatter: &Chatter,
        duration: Duration,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        self.record(
            Operation::Timeout,
            SurfaceCall::Timeout {
                user_login: chatter.user_login.clone(),
                duration,
            },
        )?;

        match self.state.lock().timeout_failures.get(&chatter.user_login) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn send_chat_message(&self, text: &str) -> Result<(), PlatformError> {
        self.record(
            Operation::ChatMessage,
            SurfaceCall::ChatMessage(text.to_string()),
        )
    }

    async fn reply(&self, parent: &MessageId, text: &str) -> Result<(), PlatformError> {
        self.record(
            Operation::Reply,
            SurfaceCall::Reply {
                parent: parent.clone(),
                text: text.to_string(),
            },
        )
    }
}
