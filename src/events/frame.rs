//! `text/event-stream` style framing
//!
//! Every event becomes one frame: `data: <json>\n\n`. The JSON is a single line,
//! so the blank line unambiguously ends the frame.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

const PREFIX: &str = "data: ";
const TERMINATOR: &str = "\n\n";

/// Errors raised while reading a frame back
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame does not start with 'data: '")]
    MissingPrefix,

    #[error("invalid frame payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Serializes an event into one frame
pub fn encode_frame<E: Serialize>(event: &E) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(event)?;
    Ok(format!("{PREFIX}{json}{TERMINATOR}"))
}

/// Parses one frame, with or without its trailing blank line
pub fn decode_frame<E: DeserializeOwned>(frame: &str) -> Result<E, FrameError> {
    let payload = frame
        .trim_end_matches('\n')
        .strip_prefix(PREFIX)
        .ok_or(FrameError::MissingPrefix)?;
    Ok(serde_json::from_str(payload)?)
}
