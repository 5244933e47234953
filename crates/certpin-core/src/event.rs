//! Verification lifecycle events.
//!
//! A verifier emits exactly one [`VerificationEvent::Begin`] followed by
//! exactly one of [`VerificationEvent::Done`] or [`VerificationEvent::Error`]
//! per handshake. Delivery is best-effort: the channel holds a single
//! event and a full or closed channel drops the event instead of stalling
//! the TLS callback.

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::trace;

use crate::VerifyError;

/// Buffer size of the event channel.
pub const EVENT_BUFFER: usize = 1;

/// Progress of a single verification attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationEvent {
    /// Verification started
    Begin,
    /// The chain was accepted
    Done,
    /// The chain was rejected
    Error(VerifyError),
}

impl VerificationEvent {
    /// Returns true for `Done` and `Error`
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error(_))
    }
}

/// Receiving half of the event channel.
pub type EventReceiver = mpsc::Receiver<VerificationEvent>;

/// Sending half of the event channel. Sends never block.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<VerificationEvent>,
}

/// Create a bounded, drop-on-full event channel.
#[must_use]
pub fn event_channel() -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    (EventSender { tx }, rx)
}

impl EventSender {
    /// Try to deliver `event`; returns false if it was dropped.
    pub fn emit(&self, event: VerificationEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                trace!(?event, "verification event dropped: channel full");
                false
            }
            Err(TrySendError::Closed(event)) => {
                trace!(?event, "verification event dropped: receiver gone");
                false
            }
        }
    }
}
