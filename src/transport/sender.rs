//! Outbound packet senders.
//!
//! The real socket lives outside this crate; hosts implement
//! [`PacketSender`] over it. [`ChannelSender`] hands messages to a tokio
//! channel, which is what the demo uses.

use std::sync::Arc;

use crate::codec::Message;
use crate::core::TransportError;

/// Something that can put a message on the wire.
pub trait PacketSender: Send + Sync {
    /// Queue `message` for delivery with its own delivery tag.
    fn send(&self, message: Message) -> Result<(), TransportError>;
}

impl<T: PacketSender + ?Sized> PacketSender for Arc<T> {
    fn send(&self, message: Message) -> Result<(), TransportError> {
        (**self).send(message)
    }
}

/// Sender backed by an unbounded tokio channel.
#[cfg(feature = "transport")]
#[derive(Debug, Clone)]
pub struct ChannelSender {
    tx: tokio::sync::mpsc::UnboundedSender<Message>,
}

#[cfg(feature = "transport")]
impl ChannelSender {
    /// Create a sender and the receiving end of its channel.
    pub fn pair() -> (Self, tokio::sync::mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Wrap an existing channel.
    pub fn new(tx: tokio::sync::mpsc::UnboundedSender<Message>) -> Self {
        Self { tx }
    }
}

#[cfg(feature = "transport")]
impl PacketSender for ChannelSender {
    fn send(&self, message: Message) -> Result<(), TransportError> {
        self.tx
            .send(message)
            .map_err(|_| TransportError::ChannelClosed)
    }
}

/// In-memory sender for unit tests. Can be closed to simulate a dead link.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordingSender {
    sent: Arc<std::sync::Mutex<Vec<Message>>>,
    closed: Arc<std::sync::atomic::AtomicBool>,
}

#[cfg(test)]
impl RecordingSender {
    pub(crate) fn take(&self) -> Vec<Message> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }

    pub(crate) fn close(&self) {
        self.closed.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    pub(crate) fn reopen(&self) {
        self.closed.store(false, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
impl PacketSender for RecordingSender {
    fn send(&self, message: Message) -> Result<(), TransportError> {
        if self.closed.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(TransportError::ChannelClosed);
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}
