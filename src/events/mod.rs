//! Event stream protocol
//!
//! Both pipelines report progress as an ordered, append-only sequence of typed
//! events. Producers push into an [`EventSink`]; transports serialize each event as
//! a self-delimited `data: <json>\n\n` frame.

mod frame;
mod sink;
mod types;

pub use frame::{decode_frame, encode_frame, FrameError};
pub use sink::{ChannelSink, EventSink, FrameWriter, SinkClosed};
pub use types::{Attribute, CrawlEvent, ItemRecord, StreamEvent, SyncEvent};
