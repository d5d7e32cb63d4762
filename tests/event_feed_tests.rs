//! イベントフィード経由のエンドツーエンドテスト
//!
//! NDJSON を読み込み、ドライラン用サーフェスに対してオーケストレーターを動かす

use std::io::Write;
use std::sync::Arc;

use emcee::{
    api::SurfaceCall,
    io::{event_stream, load_events_file},
    ChatEvent, CommandOutcome, FeedError, Orchestrator, OrchestratorSettings, ScriptedSurface,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::NamedTempFile;
use tokio_stream::StreamExt;

const SESSION_FEED: &str = r##"{"type":"connected","address":"irc.example.net"}
{"type":"join","channel":"#streamer","username":"alice"}
{"type":"message","username":"alice"}
{"type":"command","command":"prediction","context":{"invoker":"mod1","roles":{"moderator":true},"message_id":"m1"}}

{"type":"command","command":"prediction","context":{"invoker":"mod1","roles":{"moderator":true},"args":["1"],"message_id":"m2"}}
{"type":"command","command":"poll","context":{"invoker":"viewer","message_id":"m3"}}
{"type":"raid","username":"bob","viewers":12}
"##;

#[tokio::test]
async fn test_feed_drives_orchestrator() {
    let surface = Arc::new(ScriptedSurface::new());
    let mut orch = Orchestrator::new(surface.clone(), OrchestratorSettings::default())
        .with_rng(StdRng::seed_from_u64(1));
    orch.initialize().await.unwrap();
    surface.take_calls();

    let mut events = Box::pin(event_stream(SESSION_FEED.as_bytes()));
    let mut outcomes = Vec::new();
    while let Some(event) = events.next().await {
        if let Some(outcome) = orch.handle_event(event.unwrap()).await {
            outcomes.push(outcome);
        }
    }

    assert_eq!(
        outcomes,
        vec![
            CommandOutcome::Completed,
            CommandOutcome::Completed,
            CommandOutcome::Denied,
        ]
    );
    assert!(orch.session().is_idle());

    let calls = surface.calls();
    assert_eq!(calls[0], SurfaceCall::ChatMessage("!so alice".to_string()));
    assert!(calls
        .iter()
        .any(|c| matches!(c, SurfaceCall::ResolvePrediction { .. })));
    assert!(!calls.iter().any(|c| matches!(c, SurfaceCall::CreatePoll(_))));
    assert_eq!(
        calls.last(),
        Some(&SurfaceCall::ChatMessage("!so bob".to_string()))
    );
}

#[tokio::test]
async fn test_malformed_line_does_not_end_stream() {
    let feed = "{\"type\":\"message\",\"username\":\"a\"}\nnot json\n{\"type\":\"message\",\"username\":\"b\"}\n";
    let items: Vec<_> = Box::pin(event_stream(feed.as_bytes())).collect().await;

    assert_eq!(items.len(), 3);
    assert!(items[0].is_ok());
    assert!(matches!(items[1], Err(FeedError::JsonParse { line: 2, .. })));
    assert!(matches!(
        items[2],
        Ok(ChatEvent::Message { ref username }) if username == "b"
    ));
}

#[test]
fn test_load_events_file_counts_every_event() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(SESSION_FEED.as_bytes()).unwrap();

    let events = load_events_file(file.path().to_str().unwrap()).unwrap();
    assert_eq!(events.len(), 7);
    assert_eq!(events[0].event_name(), "Connected");
    assert_eq!(events[6].event_name(), "Raid");
}
