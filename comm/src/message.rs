//! The minimal push/pull channel interface the halo exchanger is built against.
//!
//! Mirrors the teacher's own `Push`/`Pull` traits (`timely_communication::{Push, Pull}`),
//! modernized to use `dyn` trait objects instead of the teacher's pre-2018 bare-trait syntax.
//! Values here are always `Vec<f64>` strip payloads (a packed halo rectangle), never a
//! generically typed payload: this crate has no wire-format serialization story, so it sticks
//! to the one concrete type the solver actually needs.

/// The send half of a point-to-point channel.
pub trait Push: Send {
    /// Sends `value`, taking ownership.
    fn push(&mut self, value: Vec<f64>);
}

/// The receive half of a point-to-point channel.
pub trait Pull: Send {
    /// Attempts to receive a value without blocking. Returns `None` if nothing has arrived yet.
    fn try_pull(&mut self) -> Option<Vec<f64>>;

    /// Blocks until a value arrives.
    fn pull(&mut self) -> Vec<f64>;
}

/// The push half of an intra-process channel, backed by `std::sync::mpsc`.
pub struct ChannelPusher {
    target: std::sync::mpsc::Sender<Vec<f64>>,
}

impl ChannelPusher {
    pub(crate) fn new(target: std::sync::mpsc::Sender<Vec<f64>>) -> Self {
        ChannelPusher { target }
    }
}

impl Push for ChannelPusher {
    fn push(&mut self, value: Vec<f64>) {
        // An `mpsc::Sender::send` only fails if the receiver has already been dropped, which
        // for a live peer in this process is an unrecoverable communication failure; we let it
        // surface as a panic here and classify it at the call site via `CommError`.
        self.target.send(value).expect("peer channel closed while sending halo strip");
    }
}

/// The receive half of an intra-process channel, backed by `std::sync::mpsc`.
pub struct ChannelPuller {
    source: std::sync::mpsc::Receiver<Vec<f64>>,
}

impl ChannelPuller {
    pub(crate) fn new(source: std::sync::mpsc::Receiver<Vec<f64>>) -> Self {
        ChannelPuller { source }
    }
}

impl Pull for ChannelPuller {
    fn try_pull(&mut self) -> Option<Vec<f64>> {
        self.source.try_recv().ok()
    }

    fn pull(&mut self) -> Vec<f64> {
        self.source.recv().expect("peer channel closed while awaiting halo strip")
    }
}
