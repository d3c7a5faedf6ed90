//! Event sinks
//!
//! A sink accepts events in order and reports when its consumer is gone. Producers
//! check [`EventSink::is_closed`] before starting network work and stop as soon as
//! a send fails.

use crate::events::frame::encode_frame;
use crate::events::types::StreamEvent;
use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// The consumer can no longer accept events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("event sink closed")]
pub struct SinkClosed;

/// Destination of a pipeline's event stream
#[async_trait]
pub trait EventSink<E: StreamEvent>: Send {
    /// Pushes one event to the consumer
    async fn send(&mut self, event: E) -> Result<(), SinkClosed>;

    /// Returns true once the consumer has gone away
    fn is_closed(&self) -> bool;
}

/// In-memory sink that records every event; never closes
#[async_trait]
impl<E: StreamEvent> EventSink<E> for Vec<E> {
    async fn send(&mut self, event: E) -> Result<(), SinkClosed> {
        self.push(event);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        false
    }
}

/// Sink backed by a bounded channel
///
/// The receiving half is exposed as a `Stream`. Dropping the stream closes the
/// sink. The sink also closes itself after forwarding a terminal event, so nothing
/// can follow `ERROR` or `DONE`.
pub struct ChannelSink<E> {
    tx: Option<mpsc::Sender<E>>,
}

impl<E: StreamEvent> ChannelSink<E> {
    pub fn new(tx: mpsc::Sender<E>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Creates a sink together with the stream its events arrive on
    pub fn channel(capacity: usize) -> (Self, ReceiverStream<E>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), ReceiverStream::new(rx))
    }
}

#[async_trait]
impl<E: StreamEvent> EventSink<E> for ChannelSink<E> {
    async fn send(&mut self, event: E) -> Result<(), SinkClosed> {
        let tx = self.tx.as_ref().ok_or(SinkClosed)?;
        let terminal = event.is_terminal();

        tx.send(event).await.map_err(|_| SinkClosed)?;

        if terminal {
            self.tx = None;
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.tx.as_ref().map_or(true, |tx| tx.is_closed())
    }
}

/// Sink that writes frames straight to a byte stream (stdout, a socket)
///
/// Each frame is flushed as soon as it is written. A write error, such as a
/// broken pipe, is treated as the consumer disconnecting.
pub struct FrameWriter<W> {
    writer: W,
    closed: bool,
}

impl<W: AsyncWrite + Unpin + Send> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            closed: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<E, W> EventSink<E> for FrameWriter<W>
where
    E: StreamEvent,
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, event: E) -> Result<(), SinkClosed> {
        if self.closed {
            return Err(SinkClosed);
        }

        let frame = match encode_frame(&event) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!("Failed to encode event: {}", e);
                return Err(SinkClosed);
            }
        };

        let written = async {
            self.writer.write_all(frame.as_bytes()).await?;
            self.writer.flush().await
        }
        .await;

        if let Err(e) = written {
            tracing::info!("Event consumer disconnected: {}", e);
            self.closed = true;
            return Err(SinkClosed);
        }

        if event.is_terminal() {
            self.closed = true;
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}
