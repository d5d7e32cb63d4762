//! I/O utilities for the inbound event feed.
//!
//! This module provides utilities for reading NDJSON files and streams
//! containing chat events.

pub mod ndjson;

// Re-export commonly used types and functions
pub use ndjson::{event_stream, load_events_file, parse_event_line, FeedError};
