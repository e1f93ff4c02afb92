//! Typed events published to a `stencil_logging::Logger` during halo exchange.
//!
//! Grounded on `communication/src/log_events.rs`'s `CommunicationEvent`/`MessageEvent`/
//! `StateEvent` split, narrowed to what this crate's exchanger actually emits.

use crate::topology::Direction;

/// A halo-exchange event observed by one worker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HaloEvent {
    /// A strip was handed to the message layer for sending.
    Message(MessageEvent),
    /// A request set transitioned between posted and drained.
    State(StateEvent),
}

/// An observed send or receive of a packed halo strip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MessageEvent {
    /// `true` for a send, `false` for a receive.
    pub is_send: bool,
    /// The direction the strip travelled in (from this worker's perspective).
    pub direction: Direction,
    /// The peer rank on the other end.
    pub peer: usize,
    /// Number of `f64` values packed into the strip.
    pub len: usize,
}

/// A request-set lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateEvent {
    /// `true` for the send set, `false` for the receive set.
    pub is_send_set: bool,
    /// `true` when requests were just posted; `false` when they were just drained (awaited).
    pub posted: bool,
    /// How many requests were posted or drained.
    pub count: usize,
}

impl From<MessageEvent> for HaloEvent {
    fn from(v: MessageEvent) -> HaloEvent {
        HaloEvent::Message(v)
    }
}

impl From<StateEvent> for HaloEvent {
    fn from(v: StateEvent) -> HaloEvent {
        HaloEvent::State(v)
    }
}
