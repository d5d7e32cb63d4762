//! NDJSON (Newline Delimited JSON) event feed.
//!
//! Each line holds one [`ChatEvent`] tagged by `"type"`. Blank lines are skipped.
//! The feed can be consumed as an async stream (stdin or a file) or loaded
//! eagerly for validation.

use std::fs::File;
use std::io::{BufRead, BufReader};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_stream::wrappers::LinesStream;
use tokio_stream::{Stream, StreamExt};

use crate::events::ChatEvent;

/// Error types for reading the event feed.
#[derive(Error, Debug)]
pub enum FeedError {
    /// I/O error when reading the feed
    #[error("Feed I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error at line {line}: {source}")]
    JsonParse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// Empty feed
    #[error("No valid data found: {context}")]
    NoData { context: String },
}

impl FeedError {
    /// Create a no data error
    pub fn no_data(context: impl Into<String>) -> Self {
        Self::NoData {
            context: context.into(),
        }
    }
}

/// Parse one feed line. Returns `Ok(None)` for blank lines.
pub fn parse_event_line(line: &str, line_number: usize) -> Result<Option<ChatEvent>, FeedError> {
    if line.trim().is_empty() {
        return Ok(None);
    }

    serde_json::from_str(line)
        .map(Some)
        .map_err(|e| FeedError::JsonParse {
            line: line_number,
            source: e,
        })
}

/// Stream events from an async reader, line by line.
///
/// A malformed line yields an `Err` item; the stream continues with the next line.
pub fn event_stream<R>(reader: R) -> impl Stream<Item = Result<ChatEvent, FeedError>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line_number = 0usize;
    LinesStream::new(reader.lines()).filter_map(move |line| {
        line_number += 1;
        match line {
            Ok(line) => parse_event_line(&line, line_number).transpose(),
            Err(e) => Some(Err(FeedError::Io(e))),
        }
    })
}

/// Load and validate a whole feed file.
///
/// # Arguments
/// * `path` - Path to the NDJSON file
///
/// # Returns
/// Every event in the file, or the first error encountered
pub fn load_events_file(path: &str) -> Result<Vec<ChatEvent>, FeedError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut events = Vec::new();

    for (line_number, line) in reader.lines().enumerate() {
        let line = line?;
        if let Some(event) = parse_event_line(&line, line_number + 1)? {
            events.push(event);
        }
    }

    if events.is_empty() {
        return Err(FeedError::no_data(format!(
            "No valid events found in file '{}'",
            path
        )));
    }

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_event_stream_skips_blank_and_reports_bad_lines() {
        let input = concat!(
            "{\"type\":\"connected\"}\n",
            "\n",
            "not json\n",
            "{\"type\":\"message\",\"username\":\"alice\"}\n",
        );

        let items: Vec<_> = event_stream(input.as_bytes()).collect().await;
        assert_eq!(items.len(), 3);
        assert!(matches!(items[0], Ok(ChatEvent::Connected { .. })));
        match &items[1] {
            Err(FeedError::JsonParse { line, .. }) => assert_eq!(*line, 3),
            other => panic!("Expected JsonParse, got {:?}", other),
        }
        assert_eq!(
            items[2].as_ref().unwrap(),
            &ChatEvent::Message {
                username: "alice".to_string()
            }
        );
    }

    #[test]
    fn test_load_events_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"type":"raid","username":"alice","viewers":50}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"type":"message","username":"bob"}}"#).unwrap();

        let events = load_events_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_load_events_file_empty_is_error() {
        let file = NamedTempFile::new().unwrap();
        let result = load_events_file(file.path().to_str().unwrap());
        assert!(matches!(result, Err(FeedError::NoData { .. })));
    }

    #[test]
    fn test_load_events_file_reports_line_number() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"type":"message","username":"bob"}}"#).unwrap();
        writeln!(file, r#"{{"type":"message"}}"#).unwrap();

        match load_events_file(file.path().to_str().unwrap()) {
            Err(FeedError::JsonParse { line, .. }) => assert_eq!(line, 2),
            other => panic!("Expected JsonParse, got {:?}", other),
        }
    }
}
