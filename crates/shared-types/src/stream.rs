//! # Message Stream Port
//!
//! The transport boundary consumed by both protocol engines. A production
//! deployment backs this with a gRPC (or equivalent) bidirectional stream;
//! tests and single-process wiring use the in-memory [`ChannelStream`] pair.

use crate::envelope::Envelope;
use crate::errors::StreamError;
use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

/// One side of a bidirectional envelope stream.
///
/// Implementations must be safe for concurrent use: the receive loop and
/// background ledger tasks send on the same stream.
#[async_trait]
pub trait MessageStream: Send + Sync {
    /// Send one envelope to the remote side.
    async fn send(&self, envelope: Envelope) -> Result<(), StreamError>;

    /// Receive the next envelope.
    ///
    /// `Ok(None)` is the distinguished clean end-of-stream signal; any
    /// `Err` is a transport failure.
    async fn recv(&self) -> Result<Option<Envelope>, StreamError>;
}

/// In-memory duplex stream over tokio channels.
///
/// One of a pair created by [`stream_pair`]; what one side sends, the other
/// receives. Dropping a side ends the peer's stream cleanly.
pub struct ChannelStream {
    outbound: mpsc::Sender<Envelope>,
    inbound: Mutex<mpsc::Receiver<Envelope>>,
}

impl ChannelStream {
    fn new(outbound: mpsc::Sender<Envelope>, inbound: mpsc::Receiver<Envelope>) -> Self {
        Self {
            outbound,
            inbound: Mutex::new(inbound),
        }
    }
}

#[async_trait]
impl MessageStream for ChannelStream {
    async fn send(&self, envelope: Envelope) -> Result<(), StreamError> {
        self.outbound
            .send(envelope)
            .await
            .map_err(|e| StreamError::Closed(format!("remote side dropped ({})", e.0.message_type)))
    }

    async fn recv(&self) -> Result<Option<Envelope>, StreamError> {
        // None from the channel means every sender is gone: clean EOF.
        Ok(self.inbound.lock().await.recv().await)
    }
}

/// Create a connected pair of in-memory streams.
#[must_use]
pub fn stream_pair(capacity: usize) -> (ChannelStream, ChannelStream) {
    let (a_tx, a_rx) = mpsc::channel(capacity);
    let (b_tx, b_rx) = mpsc::channel(capacity);
    (ChannelStream::new(a_tx, b_rx), ChannelStream::new(b_tx, a_rx))
}
