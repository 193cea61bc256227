//! Control Channel: bounded, non-blocking conduit from the console to the loop.
//!
//! Neither side ever blocks. When the buffer is full the sender evicts the
//! oldest pending message to make room (drop-oldest): only the latest
//! control intent matters, and a flooding console must not stall anything.
//! The loop samples the channel at most once per tick with
//! [`ControlReceiver::try_receive`].

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Topic of a control message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Topic {
    /// Toggle the cursor between idle and pressed.
    Poke,
    /// Request a graceful shutdown.
    Stop,
    /// Any topic the loop does not act on.
    Other(String),
}

impl From<String> for Topic {
    fn from(name: String) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "poke" => Self::Poke,
            "stop" => Self::Stop,
            _ => Self::Other(name),
        }
    }
}

impl From<&str> for Topic {
    fn from(name: &str) -> Self {
        Self::from(name.to_string())
    }
}

impl From<Topic> for String {
    fn from(topic: Topic) -> Self {
        match topic {
            Topic::Poke => "poke".to_string(),
            Topic::Stop => "stop".to_string(),
            Topic::Other(name) => name,
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Poke => f.write_str("poke"),
            Self::Stop => f.write_str("stop"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

/// A topic-tagged message from the console.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlMessage {
    /// What the message asks for.
    pub topic: Topic,
    /// Opaque data; the loop never looks inside.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl ControlMessage {
    /// A message with no payload.
    pub const fn new(topic: Topic) -> Self {
        Self {
            topic,
            payload: serde_json::Value::Null,
        }
    }

    /// Shorthand for a `Poke` message.
    pub const fn poke() -> Self {
        Self::new(Topic::Poke)
    }

    /// Shorthand for a `Stop` message.
    pub const fn stop() -> Self {
        Self::new(Topic::Stop)
    }
}

/// What happened to a message handed to [`ControlSender::try_send`].
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// Queued without displacing anything.
    Queued,
    /// Queued after evicting the oldest pending message.
    ReplacedOldest(ControlMessage),
    /// The loop has gone away; the message was discarded.
    Closed,
}

/// Producer half. Cloneable so every console connection can hold one.
#[derive(Debug, Clone)]
pub struct ControlSender {
    tx: Sender<ControlMessage>,
    /// Kept only to evict the oldest message when full.
    evict: Receiver<ControlMessage>,
    closed: Arc<AtomicBool>,
}

/// Consumer half, owned by the input translator.
#[derive(Debug)]
pub struct ControlReceiver {
    rx: Receiver<ControlMessage>,
    closed: Arc<AtomicBool>,
}

/// Create a control channel holding at most `capacity` pending messages.
///
/// A capacity of 0 is raised to 1.
pub fn channel(capacity: usize) -> (ControlSender, ControlReceiver) {
    let (tx, rx) = bounded(capacity.max(1));
    let closed = Arc::new(AtomicBool::new(false));
    (
        ControlSender {
            tx,
            evict: rx.clone(),
            closed: Arc::clone(&closed),
        },
        ControlReceiver { rx, closed },
    )
}

impl ControlSender {
    /// Queue `message` without blocking, evicting the oldest if full.
    pub fn try_send(&self, message: ControlMessage) -> SendOutcome {
        if self.closed.load(Ordering::Acquire) {
            return SendOutcome::Closed;
        }

        let mut pending = message;
        let mut evicted = None;
        loop {
            match self.tx.try_send(pending) {
                Ok(()) => {
                    return evicted.map_or(SendOutcome::Queued, SendOutcome::ReplacedOldest);
                }
                Err(TrySendError::Full(message)) => {
                    pending = message;
                    // The consumer may have drained it in between; either way
                    // there is room on the next attempt unless another
                    // producer raced us, in which case we go around again.
                    if let Ok(oldest) = self.evict.try_recv() {
                        trace!(topic = %oldest.topic, "control channel full, dropping oldest");
                        evicted = Some(oldest);
                    }
                }
                Err(TrySendError::Disconnected(_)) => return SendOutcome::Closed,
            }
        }
    }

    /// Whether the consumer has been dropped.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl ControlReceiver {
    /// Take one pending message, if any. Never blocks.
    #[inline]
    pub fn try_receive(&self) -> Option<ControlMessage> {
        match self.rx.try_recv() {
            Ok(message) => Some(message),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Number of messages currently waiting.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl Drop for ControlReceiver {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_oldest_with_capacity_one() {
        let (tx, rx) = channel(1);
        assert_eq!(tx.try_send(ControlMessage::poke()), SendOutcome::Queued);
        assert_eq!(
            tx.try_send(ControlMessage::stop()),
            SendOutcome::ReplacedOldest(ControlMessage::poke())
        );

        assert_eq!(rx.try_receive(), Some(ControlMessage::stop()));
        assert_eq!(rx.try_receive(), None);
    }

    #[test]
    fn test_try_receive_empty_is_none() {
        let (_tx, rx) = channel(4);
        assert_eq!(rx.try_receive(), None);
    }

    #[test]
    fn test_flood_keeps_latest() {
        let (tx, rx) = channel(2);
        for i in 0..100 {
            let mut message = ControlMessage::poke();
            message.payload = serde_json::json!(i);
            tx.try_send(message);
        }
        assert_eq!(rx.pending(), 2);
        assert_eq!(rx.try_receive().unwrap().payload, serde_json::json!(98));
        assert_eq!(rx.try_receive().unwrap().payload, serde_json::json!(99));
    }

    #[test]
    fn test_send_after_receiver_dropped() {
        let (tx, rx) = channel(1);
        drop(rx);
        assert!(tx.is_closed());
        assert_eq!(tx.try_send(ControlMessage::poke()), SendOutcome::Closed);
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let (tx, rx) = channel(0);
        assert_eq!(tx.try_send(ControlMessage::poke()), SendOutcome::Queued);
        assert_eq!(rx.try_receive(), Some(ControlMessage::poke()));
    }

    #[test]
    fn test_topic_parsing() {
        assert_eq!(Topic::from("Poke"), Topic::Poke);
        assert_eq!(Topic::from(" STOP "), Topic::Stop);
        assert_eq!(Topic::from("ping"), Topic::Other("ping".to_string()));
    }

    #[test]
    fn test_message_json_round_trip_shape() {
        let message: ControlMessage =
            serde_json::from_str(r#"{"topic": "stop", "payload": {"reason": "done"}}"#).unwrap();
        assert_eq!(message.topic, Topic::Stop);
        assert_eq!(message.payload["reason"], "done");

        let bare: ControlMessage = serde_json::from_str(r#"{"topic": "poke"}"#).unwrap();
        assert_eq!(bare, ControlMessage::poke());
        assert_eq!(
            serde_json::to_string(&bare).unwrap(),
            r#"{"topic":"poke","payload":null}"#
        );
    }
}
