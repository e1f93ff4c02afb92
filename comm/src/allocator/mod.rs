//! Channel allocation between the workers of one solver run.
//!
//! Grounded on `timely_communication::allocator::{Allocate, Generic}`: a worker sees its own
//! `index()`/`peers()`, and can `allocate_channel` a full mesh of point-to-point endpoints
//! (one [`crate::message::Push`] per peer, one [`crate::message::Pull`] for itself) keyed by a
//! small integer identifier. The halo exchanger allocates one channel per [`crate::topology::Direction`].

pub mod process;
pub mod thread;

pub use process::Process;
pub use thread::Thread;

use crate::message::{Pull, Push};

/// The interface a worker has onto the shared channel-allocation fabric.
///
/// Each worker is expected to call `allocate_channel` with the same sequence of identifiers as
/// every other worker (so that channel `k` means the same thing everywhere); this crate's
/// exchanger always allocates channel `d.index()` for each [`crate::topology::Direction`] `d`,
/// in a fixed order, satisfying that requirement automatically.
pub trait Allocate {
    /// This worker's rank, in `0..peers()`.
    fn index(&self) -> usize;
    /// The total number of workers sharing this fabric.
    fn peers(&self) -> usize;
    /// Allocates a full mesh of endpoints for logical channel `identifier`: one sender per
    /// peer (indexed by rank) and the one receiver that collects whatever peers send to this
    /// worker's slot.
    fn allocate_channel(&mut self, identifier: usize) -> (Vec<Box<dyn Push>>, Box<dyn Pull>);
}

/// Enumerates the concrete `Allocate` implementors this crate ships.
///
/// A `Generic::Thread` is used for single-worker (`P=1`) runs, where no cross-worker channel
/// ever gets exercised; `Generic::Process` backs every multi-worker run, with workers as
/// `std::thread`s inside this one process (see `crate::initialize`).
pub enum Generic {
    /// Single in-process worker, no peers.
    Thread(Thread),
    /// One of several in-process worker threads.
    Process(Process),
}

impl Allocate for Generic {
    fn index(&self) -> usize {
        match self {
            Generic::Thread(t) => t.index(),
            Generic::Process(p) => p.index(),
        }
    }

    fn peers(&self) -> usize {
        match self {
            Generic::Thread(t) => t.peers(),
            Generic::Process(p) => p.peers(),
        }
    }

    fn allocate_channel(&mut self, identifier: usize) -> (Vec<Box<dyn Push>>, Box<dyn Pull>) {
        match self {
            Generic::Thread(t) => t.allocate_channel(identifier),
            Generic::Process(p) => p.allocate_channel(identifier),
        }
    }
}

/// Builds a [`Generic`] allocator inside the worker thread that will use it; kept `Send` so
/// the builder (not the allocator itself, which may hold non-`Send` state in richer
/// implementations) can be handed across the thread boundary at spawn time.
pub enum GenericBuilder {
    /// Builds a `Generic::Thread`.
    Thread,
    /// Builds one `Generic::Process` out of a shared, pre-allocated vector.
    Process(process::ProcessBuilder),
}

impl GenericBuilder {
    /// Materializes the allocator described by this builder.
    pub fn build(self) -> Generic {
        match self {
            GenericBuilder::Thread => Generic::Thread(Thread::new()),
            GenericBuilder::Process(builder) => Generic::Process(builder.build()),
        }
    }
}
