//! The bounded request sets the exchanger uses to track outstanding sends/receives.
//!
//! A [`RequestSet`] holds at most `neighbor_count` outstanding handles (8 for the time-skewed
//! variant's diagonals, 4 otherwise) plus a fill index, mirroring the original source's
//! `RqBuffer` (`MPI_Request[RQ_COUNT]` plus a `nextId` cursor). Its lifecycle spans exactly one
//! iteration pair: entries are posted at iteration `k` and drained (awaited) at iteration `k+1`.

use crate::error::UsageError;
use crate::topology::Direction;

const CAPACITY: usize = 8;

/// A bounded, order-preserving collection of posted-but-not-yet-awaited directions.
pub struct RequestSet {
    label: &'static str,
    slots: [Option<Direction>; CAPACITY],
    len: usize,
}

impl RequestSet {
    /// Creates an empty request set, labeled `"send"` or `"receive"` for diagnostics.
    pub fn new(label: &'static str) -> Self {
        RequestSet { label, slots: [None; CAPACITY], len: 0 }
    }

    /// Records that a request was posted in `direction`.
    pub fn post(&mut self, direction: Direction) -> Result<(), UsageError> {
        if self.len >= CAPACITY {
            return Err(UsageError::RequestSetOverflow { what: self.label, capacity: CAPACITY });
        }
        self.slots[self.len] = Some(direction);
        self.len += 1;
        Ok(())
    }

    /// Drains every posted direction (in post order) and resets the set to empty, as the
    /// `wait_for_*` barrier does once every outstanding request has completed.
    pub fn drain(&mut self) -> Vec<Direction> {
        let drained: Vec<Direction> = self.slots[..self.len].iter().filter_map(|s| *s).collect();
        self.reset();
        drained
    }

    /// Overwrites every slot with the null sentinel without returning the drained directions;
    /// used by `Drop` to implement the spec's cancellation semantics (a warning, not a panic,
    /// for any request left outstanding at shutdown).
    fn reset(&mut self) {
        self.slots = [None; CAPACITY];
        self.len = 0;
    }

    /// Number of currently outstanding (posted but not drained) requests.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether any requests are currently outstanding.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Drop for RequestSet {
    fn drop(&mut self) {
        if !self.is_empty() {
            tracing::warn!(
                label = self.label,
                outstanding = self.len,
                "request set dropped with outstanding requests; cancelling without wait"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn posts_and_drains_in_order() {
        let mut set = RequestSet::new("send");
        set.post(Direction::Left).unwrap();
        set.post(Direction::Top).unwrap();
        assert_eq!(set.len(), 2);
        let drained = set.drain();
        assert_eq!(drained, vec![Direction::Left, Direction::Top]);
        assert!(set.is_empty());
    }

    #[test]
    fn overflow_is_rejected() {
        let mut set = RequestSet::new("receive");
        for _ in 0..CAPACITY {
            set.post(Direction::Left).unwrap();
        }
        assert_eq!(
            set.post(Direction::Left),
            Err(UsageError::RequestSetOverflow { what: "receive", capacity: CAPACITY })
        );
    }
}
