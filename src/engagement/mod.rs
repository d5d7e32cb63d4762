//! 予想・投票のセッション管理
//!
//! チャンネルごとに「実行中の予想」と「実行中の投票」をそれぞれ最大1つ保持する。
//! I/Oは行わず、状態の保持と入力の検証のみを担当する。

use std::time::Duration;
use thiserror::Error;

use crate::api::control_surface::{NewPoll, NewPrediction, Outcome, Poll, Prediction};

/// 予想のタイトル（固定）
pub const PREDICTION_TITLE: &str = "Will we win this one?";
/// 予想の選択肢（固定、常に2つ）
pub const PREDICTION_OUTCOMES: [&str; 2] = ["Yes", "No"];
/// 予想の自動ロックまでの秒数
pub const PREDICTION_WINDOW_SECS: u64 = 60;

pub const POLL_TITLE: &str = "What should we do next?";
pub const POLL_CHOICES: [&str; 3] = ["Keep going", "Switch it up", "Chat decides"];
pub const POLL_DURATION_SECS: u64 = 60;
/// 1票あたりのチャンネルポイント
pub const POLL_CHANNEL_POINTS_PER_VOTE: u32 = 100;

/// コマンド引数の検証エラー
///
/// 表示文字列はそのままチャットへの返信として使われる。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("There is no active prediction to resolve.")]
    NoActivePrediction,

    #[error("Tell me which outcome won: 1 to {count}.")]
    MissingOutcome { count: usize },

    #[error("\"{raw}\" is not a number. Pick an outcome from 1 to {count}.")]
    NotANumber { raw: String, count: usize },

    #[error("Outcome {index} doesn't exist. Pick an outcome from 1 to {count}.")]
    OutOfRange { index: i64, count: usize },
}

/// 予想作成リクエスト（既定値）
pub fn default_prediction_request() -> NewPrediction {
    NewPrediction {
        title: PREDICTION_TITLE.to_string(),
        outcomes: PREDICTION_OUTCOMES.iter().map(|s| s.to_string()).collect(),
        prediction_window: Duration::from_secs(PREDICTION_WINDOW_SECS),
    }
}

/// 投票作成リクエスト（既定値）
pub fn default_poll_request() -> NewPoll {
    NewPoll {
        title: POLL_TITLE.to_string(),
        choices: POLL_CHOICES.iter().map(|s| s.to_string()).collect(),
        duration: Duration::from_secs(POLL_DURATION_SECS),
        channel_points_per_vote: POLL_CHANNEL_POINTS_PER_VOTE,
    }
}

/// 1始まりの結果番号を検証して該当する選択肢を返す
pub fn select_outcome<'a>(
    prediction: &'a Prediction,
    raw: Option<&str>,
) -> Result<&'a Outcome, ValidationError> {
    let count = prediction.outcomes.len();
    let raw = match raw.map(str::trim) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Err(ValidationError::MissingOutcome { count }),
    };

    let index: i64 = raw.parse().map_err(|_| ValidationError::NotANumber {
        raw: raw.to_string(),
        count,
    })?;

    usize::try_from(index)
        .ok()
        .and_then(|i| prediction.outcome(i))
        .ok_or(ValidationError::OutOfRange { index, count })
}

/// エンゲージメントセッション
///
/// 予想と投票はそれぞれ独立に `Absent` / `Active` の状態を持つ。
/// 状態はプラットフォームへの呼び出しが成功した後にのみ更新すること。
#[derive(Debug, Clone, Default)]
pub struct EngagementSession {
    active_prediction: Option<Prediction>,
    active_poll: Option<Poll>,
}

impl EngagementSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_prediction(&self) -> Option<&Prediction> {
        self.active_prediction.as_ref()
    }

    pub fn active_poll(&self) -> Option<&Poll> {
        self.active_poll.as_ref()
    }

    pub fn has_prediction(&self) -> bool {
        self.active_prediction.is_some()
    }

    pub fn has_poll(&self) -> bool {
        self.active_poll.is_some()
    }

    pub fn is_idle(&self) -> bool {
        !self.has_prediction() && !self.has_poll()
    }

    /// 作成に成功した予想を登録
    pub fn prediction_started(&mut self, prediction: Prediction) {
        tracing::debug!("🔮 [SESSION] Prediction active: {}", prediction.id);
        self.active_prediction = Some(prediction);
    }

    /// 確定・キャンセルに成功した予想を外す
    pub fn prediction_finished(&mut self) -> Option<Prediction> {
        let finished = self.active_prediction.take();
        if let Some(ref p) = finished {
            tracing::debug!("🔮 [SESSION] Prediction cleared: {}", p.id);
        }
        finished
    }

    pub fn poll_started(&mut self, poll: Poll) {
        tracing::debug!("📊 [SESSION] Poll active: {}", poll.id);
        self.active_poll = Some(poll);
    }

    pub fn poll_finished(&mut self) -> Option<Poll> {
        let finished = self.active_poll.take();
        if let Some(ref p) = finished {
            tracing::debug!("📊 [SESSION] Poll cleared: {}", p.id);
        }
        finished
    }

    /// 実行中の予想に対して勝者を選ぶ
    pub fn winning_outcome(&self, raw: Option<&str>) -> Result<Outcome, ValidationError> {
        let prediction = self
            .active_prediction
            .as_ref()
            .ok_or(ValidationError::NoActivePrediction)?;
        select_outcome(prediction, raw).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_way_prediction() -> Prediction {
        Prediction {
            id: "p1".to_string(),
            title: PREDICTION_TITLE.to_string(),
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
        }
    }

    #[test]
    fn test_defaults_are_fixed() {
        let prediction = default_prediction_request();
        assert_eq!(prediction.outcomes, vec!["Yes", "No"]);
        assert_eq!(prediction.prediction_window, Duration::from_secs(60));

        let poll = default_poll_request();
        assert_eq!(poll.choices.len(), 3);
        assert_eq!(poll.duration, Duration::from_secs(60));
        assert_eq!(poll.channel_points_per_vote, POLL_CHANNEL_POINTS_PER_VOTE);
    }

    #[test]
    fn test_select_outcome_valid_indices() {
        let prediction = two_way_prediction();
        assert_eq!(select_outcome(&prediction, Some("1")).unwrap().id, "o1");
        assert_eq!(select_outcome(&prediction, Some(" 2 ")).unwrap().id, "o2");
    }

    #[test]
    fn test_select_outcome_rejects_out_of_range() {
        let prediction = two_way_prediction();

        for raw in ["0", "-1", "3", "99"] {
            match select_outcome(&prediction, Some(raw)) {
                Err(ValidationError::OutOfRange { count, .. }) => assert_eq!(count, 2),
                other => panic!("Expected OutOfRange for {}, got {:?}", raw, other),
            }
        }
    }

    #[test]
    fn test_select_outcome_rejects_non_numeric_and_missing() {
        let prediction = two_way_prediction();

        assert_eq!(
            select_outcome(&prediction, Some("yes")),
            Err(ValidationError::NotANumber {
                raw: "yes".to_string(),
                count: 2
            })
        );
        assert_eq!(
            select_outcome(&prediction, Some("1.5")).unwrap_err(),
            ValidationError::NotANumber {
                raw: "1.5".to_string(),
                count: 2
            }
        );
        assert_eq!(
            select_outcome(&prediction, None),
            Err(ValidationError::MissingOutcome { count: 2 })
        );
        assert_eq!(
            select_outcome(&prediction, Some("")),
            Err(ValidationError::MissingOutcome { count: 2 })
        );
    }

    #[test]
    fn test_session_slots_are_independent() {
        let mut session = EngagementSession::new();
        assert!(session.is_idle());

        session.prediction_started(two_way_prediction());
        assert!(session.has_prediction());
        assert!(!session.has_poll());

        session.poll_started(Poll {
            id: "poll1".to_string(),
            title: POLL_TITLE.to_string(),
            choices: vec![],
            duration: Duration::from_secs(60),
            channel_points_per_vote: 100,
        });
        assert!(session.has_poll());

        assert_eq!(session.prediction_finished().map(|p| p.id), Some("p1".to_string()));
        assert!(!session.has_prediction());
        assert!(session.has_poll());

        session.poll_finished();
        assert!(session.is_idle());
        assert!(session.poll_finished().is_none());
    }

    #[test]
    fn test_winning_outcome_requires_active_prediction() {
        let mut session = EngagementSession::new();
        assert_eq!(
            session.winning_outcome(Some("1")),
            Err(ValidationError::NoActivePrediction)
        );

        session.prediction_started(two_way_prediction());
        assert_eq!(session.winning_outcome(Some("2")).unwrap().title, "No");
    }

    #[test]
    fn test_validation_messages_are_user_facing() {
        let err = ValidationError::OutOfRange { index: 5, count: 2 };
        assert_eq!(
            err.to_string(),
            "Outcome 5 doesn't exist. Pick an outcome from 1 to 2."
        );
    }
}
