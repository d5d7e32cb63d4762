//! 受信イベント定義
//!
//! チャット接続側から渡されるイベント。コマンドはすでに名前と引数に分解済みで届く。

use serde::{Deserialize, Serialize};

use crate::commands::InvocationContext;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// チャットへの接続完了
    Connected {
        #[serde(default)]
        address: Option<String>,
    },
    /// パース済みのコマンド呼び出し
    Command {
        command: String,
        context: InvocationContext,
    },
    /// 通常のチャットメッセージ
    Message { username: String },
    /// レイド受信
    Raid { username: String, viewers: u64 },
    /// 視聴者の入室
    Join { channel: String, username: String },
}

impl ChatEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            ChatEvent::Connected { .. } => "Connected",
            ChatEvent::Command { .. } => "Command",
            ChatEvent::Message { .. } => "Message",
            ChatEvent::Raid { .. } => "Raid",
            ChatEvent::Join { .. } => "Join",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::control_surface::MessageId;

    #[test]
    fn test_command_event_from_json() {
        let event: ChatEvent = serde_json::from_str(
            r#"{"type":"command","command":"prediction",
                "context":{"invoker":"mod1","roles":{"moderator":true},"args":["2"],"message_id":"m1"}}"#,
        )
        .unwrap();

        match event {
            ChatEvent::Command { command, context } => {
                assert_eq!(command, "prediction");
                assert!(context.roles.moderator);
                assert!(!context.roles.broadcaster);
                assert_eq!(context.args, vec!["2"]);
                assert_eq!(context.message_id, MessageId("m1".to_string()));
            }
            other => panic!("Expected Command, got {:?}", other),
        }
    }

    #[test]
    fn test_simple_events_from_json() {
        let raid: ChatEvent =
            serde_json::from_str(r#"{"type":"raid","username":"alice","viewers":50}"#).unwrap();
        assert_eq!(
            raid,
            ChatEvent::Raid {
                username: "alice".to_string(),
                viewers: 50
            }
        );
        assert_eq!(raid.event_name(), "Raid");

        let connected: ChatEvent = serde_json::from_str(r#"{"type":"connected"}"#).unwrap();
        assert_eq!(connected, ChatEvent::Connected { address: None });

        let join: ChatEvent =
            serde_json::from_str(r##"{"type":"join","channel":"#me","username":"bob"}"##).unwrap();
        assert_eq!(join.event_name(), "Join");
    }

    #[test]
    fn test_unknown_event_type_is_rejected() {
        assert!(serde_json::from_str::<ChatEvent>(r#"{"type":"subscribe","username":"x"}"#).is_err());
    }
}
