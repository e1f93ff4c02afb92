//! The trivial single-worker allocator, used for `P = 1` runs.
//!
//! No channel allocated here is ever exercised (a lone worker has no neighbors in any
//! direction), but the type exists so that `Generic::Thread` satisfies `Allocate` uniformly
//! with `Generic::Process`, mirroring `timely_communication::allocator::thread::Thread`.

use super::Allocate;
use crate::message::{Pull, Push};

/// Single-worker allocator: `index() == 0`, `peers() == 1`.
pub struct Thread;

impl Thread {
    /// Builds the allocator.
    pub fn new() -> Self {
        Thread
    }
}

impl Default for Thread {
    fn default() -> Self {
        Thread::new()
    }
}

/// A pusher that always fails to deliver; never constructed for a live direction on a 1-worker
/// mesh, but required to return *something* of the right shape from `allocate_channel`.
struct DeadPusher;

impl Push for DeadPusher {
    fn push(&mut self, _value: Vec<f64>) {
        unreachable!("single-worker topology has no live neighbors to send to")
    }
}

/// A puller that never yields anything.
struct DeadPuller;

impl Pull for DeadPuller {
    fn try_pull(&mut self) -> Option<Vec<f64>> {
        None
    }

    fn pull(&mut self) -> Vec<f64> {
        unreachable!("single-worker topology has no live neighbors to receive from")
    }
}

impl Allocate for Thread {
    fn index(&self) -> usize {
        0
    }

    fn peers(&self) -> usize {
        1
    }

    fn allocate_channel(&mut self, _identifier: usize) -> (Vec<Box<dyn Push>>, Box<dyn Pull>) {
        (vec![Box::new(DeadPusher)], Box::new(DeadPuller))
    }
}
