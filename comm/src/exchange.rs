//! The halo exchanger: non-blocking send/receive of boundary strips between neighboring
//! workers, plus the `Loan` bookkeeping that proves which workspace regions are currently
//! exposed to the network.
//!
//! One channel is allocated per [`Direction`] at construction (`allocator.allocate_channel(d.index())`),
//! so every worker in the mesh calls `allocate_channel` with the same fixed set of identifiers
//! regardless of which directions have a live neighbor locally — required so channel `k` means
//! the same thing on every worker (see [`crate::allocator::Allocate`]).

use stencil_grid::Workspace;

use crate::error::UsageError;
use crate::log_events::{HaloEvent, MessageEvent, StateEvent};
use crate::message::{Pull, Push};
use crate::request::RequestSet;
use crate::topology::{Direction, Topology, ALL_DIRECTIONS, AXIS_DIRECTIONS};
use crate::Allocate;

use stencil_logging::Logger;

/// Proof that a region of the workspace is currently lent to the network and must not be
/// touched by worker code until it comes back via the matching `wait_*` call.
///
/// Zero-cost: no cells are actually locked, the type exists only so that the driver's control
/// flow reads as a loan-and-return pair rather than an unenforced convention. `SendLoan` covers
/// the inner-boundary strips handed to `post_sends`; `RecvLoan` covers the outer-halo cells
/// `post_receives` has promised to fill in.
#[derive(Debug)]
pub struct SendLoan {
    directions: Vec<Direction>,
}

/// See [`SendLoan`]; the receive-side counterpart.
#[derive(Debug)]
pub struct RecvLoan {
    directions: Vec<Direction>,
}

impl SendLoan {
    /// Directions whose inner-boundary strip is currently out on loan to the network.
    pub fn directions(&self) -> &[Direction] {
        &self.directions
    }
}

impl RecvLoan {
    /// Directions whose outer-halo strip is currently promised but not yet delivered.
    pub fn directions(&self) -> &[Direction] {
        &self.directions
    }
}

/// The origin and extent of a packed strip for one direction, at halo width `w`, against an
/// `n x n` owned slice. `for_send` selects the inner-boundary (owned) rectangle; otherwise the
/// outer-halo (foreign) rectangle. Mirrors the offset table verbatim: at `w = 1` it reduces to
/// the basic variant's single-cell-wide strips, so one routine serves both designs.
fn strip_rect(direction: Direction, w: usize, n: usize, for_send: bool) -> (i64, i64, usize, usize) {
    let w_i = w as i64;
    let n_i = n as i64;
    match direction {
        Direction::Left => {
            if for_send { (0, 0, w, n) } else { (-w_i, 0, w, n) }
        }
        Direction::Right => {
            if for_send { (n_i - w_i, 0, w, n) } else { (n_i, 0, w, n) }
        }
        Direction::Top => {
            if for_send { (0, n_i - w_i, n, w) } else { (0, n_i, n, w) }
        }
        Direction::Bottom => {
            if for_send { (0, 0, n, w) } else { (0, -w_i, n, w) }
        }
        Direction::TopLeft => {
            if for_send { (0, n_i - w_i, w, w) } else { (-w_i, n_i, w, w) }
        }
        Direction::TopRight => {
            if for_send { (n_i - w_i, n_i - w_i, w, w) } else { (n_i, n_i, w, w) }
        }
        Direction::BottomLeft => {
            if for_send { (0, 0, w, w) } else { (-w_i, -w_i, w, w) }
        }
        Direction::BottomRight => {
            if for_send { (n_i - w_i, 0, w, w) } else { (n_i, -w_i, w, w) }
        }
    }
}

/// Packs the rectangle `strip_rect(direction, w, n, true)` out of the back buffer, row-major in
/// `y` then `x`, per §9's "single source of truth" offset table.
fn pack(ws: &Workspace, direction: Direction, w: usize) -> Vec<f64> {
    let n = ws.inner_length();
    let (ox, oy, sx, sy) = strip_rect(direction, w, n, true);
    let mut out = Vec::with_capacity(sx * sy);
    for dy in 0..sy as i64 {
        for dx in 0..sx as i64 {
            out.push(ws.get_back(ox + dx, oy + dy));
        }
    }
    out
}

/// Unpacks a received strip into the back buffer's outer-halo rectangle for `direction`, in the
/// same row-major order [`pack`] used.
fn unpack(ws: &mut Workspace, direction: Direction, w: usize, data: &[f64]) {
    let n = ws.inner_length();
    let (ox, oy, sx, sy) = strip_rect(direction, w, n, false);
    assert_eq!(data.len(), sx * sy, "received strip size mismatch for {direction}");
    let mut it = data.iter();
    for dy in 0..sy as i64 {
        for dx in 0..sx as i64 {
            ws.set_back(ox + dx, oy + dy, *it.next().expect("strip iterator exhausted early"));
        }
    }
}

/// Schedules non-blocking sends/receives of halo strips and tracks the outstanding request
/// sets, for a fixed halo width and a fixed set of directions (4 for the basic/asynchronous
/// designs, 8 for the time-skewed design).
pub struct HaloExchanger {
    width: usize,
    directions: Vec<Direction>,
    pushers: Vec<Option<Box<dyn Push>>>,
    pullers: Vec<Option<Box<dyn Pull>>>,
    peers: Vec<Option<usize>>,
    send_set: RequestSet,
    recv_set: RequestSet,
    logger: Option<Logger<HaloEvent>>,
}

impl HaloExchanger {
    /// Builds an exchanger for halo width `width`, allocating one channel per direction in
    /// `directions` (pass [`AXIS_DIRECTIONS`] for Design A/B, [`ALL_DIRECTIONS`] for Design C).
    ///
    /// Every worker must call this with the same `directions` slice (same order), since channel
    /// identifiers are just `Direction::index()` and must line up mesh-wide.
    pub fn new(
        allocator: &mut dyn Allocate,
        topology: &Topology,
        directions: &'static [Direction],
        width: usize,
        logger: Option<Logger<HaloEvent>>,
    ) -> Self {
        let mut pushers: Vec<Option<Box<dyn Push>>> = (0..8).map(|_| None).collect();
        let mut pullers: Vec<Option<Box<dyn Pull>>> = (0..8).map(|_| None).collect();
        let mut peers: Vec<Option<usize>> = vec![None; 8];

        for &direction in directions {
            let (mut channel_pushers, puller) = allocator.allocate_channel(direction.index());
            if let Some(neighbor) = topology.neighbor(direction) {
                pushers[direction.index()] = Some(channel_pushers.remove(neighbor));
                peers[direction.index()] = Some(neighbor);
            }
            // The receiver claimed here answers identifier `direction.index()`, which is fed by
            // whichever peer finds *us* as its own `direction` neighbor — that peer is, from our
            // side, our `direction.opposite()` neighbor. So this puller fills our
            // `direction.opposite()` halo, not our `direction` halo; store it there, and only if
            // that neighbor actually exists.
            if topology.neighbor(direction.opposite()).is_some() {
                pullers[direction.opposite().index()] = Some(puller);
            }
        }

        HaloExchanger {
            width,
            directions: directions.to_vec(),
            pushers,
            pullers,
            peers,
            send_set: RequestSet::new("send"),
            recv_set: RequestSet::new("receive"),
            logger,
        }
    }

    /// Convenience constructor for the 4-neighbor designs (A and B).
    pub fn for_axis_directions(
        allocator: &mut dyn Allocate,
        topology: &Topology,
        logger: Option<Logger<HaloEvent>>,
    ) -> Self {
        HaloExchanger::new(allocator, topology, &AXIS_DIRECTIONS, 1, logger)
    }

    /// Convenience constructor for the time-skewed design, with halo/window width `t`.
    pub fn for_time_skewing(
        allocator: &mut dyn Allocate,
        topology: &Topology,
        t: usize,
        logger: Option<Logger<HaloEvent>>,
    ) -> Self {
        HaloExchanger::new(allocator, topology, &ALL_DIRECTIONS, t, logger)
    }

    fn log(&self, event: impl Into<HaloEvent>) {
        if let Some(logger) = &self.logger {
            logger.log(event.into());
        }
    }

    /// Packs and sends the inner-boundary strip in every live direction, reading from `ws`'s
    /// back buffer. Returns a [`SendLoan`] naming the directions now out on loan; the caller
    /// must not mutate those inner-boundary cells until [`HaloExchanger::wait_for_sends`].
    pub fn post_sends(&mut self, ws: &Workspace) -> Result<SendLoan, UsageError> {
        let mut loaned = Vec::new();
        for &direction in &self.directions.clone() {
            let Some(peer) = self.peers[direction.index()] else { continue };
            let strip = pack(ws, direction, self.width);
            let len = strip.len();
            self.pushers[direction.index()]
                .as_mut()
                .expect("pusher allocated for every live direction")
                .push(strip);
            self.send_set.post(direction)?;
            self.log(MessageEvent { is_send: true, direction, peer, len });
            loaned.push(direction);
        }
        Ok(SendLoan { directions: loaned })
    }

    /// Posts a receive placeholder for every live direction; the actual transfer completes in
    /// [`HaloExchanger::wait_for_receives`], which is where the blocking `pull()` happens.
    /// Returns a [`RecvLoan`] naming the directions whose outer-halo cells are not yet valid.
    pub fn post_receives(&mut self) -> Result<RecvLoan, UsageError> {
        let mut loaned = Vec::new();
        for &direction in &self.directions.clone() {
            if self.peers[direction.index()].is_none() {
                continue;
            }
            self.recv_set.post(direction)?;
            loaned.push(direction);
        }
        Ok(RecvLoan { directions: loaned })
    }

    /// Waits for every posted send to complete (a no-op beyond bookkeeping: `mpsc::Sender::send`
    /// never blocks on a live peer), consuming the loan it returned.
    pub fn wait_for_sends(&mut self, loan: SendLoan) {
        let drained = self.send_set.drain();
        debug_assert_eq!(drained, loan.directions);
        self.log(StateEvent { is_send_set: true, posted: false, count: drained.len() });
    }

    /// Blocks until every posted receive has arrived and unpacks each strip into `ws`'s back
    /// buffer, consuming the loan `post_receives` returned. After this returns, the outer halo
    /// is valid for every direction that was loaned.
    pub fn wait_for_receives(&mut self, ws: &mut Workspace, loan: RecvLoan) {
        let drained = self.recv_set.drain();
        debug_assert_eq!(drained, loan.directions);
        for direction in drained {
            let peer = self.peers[direction.index()].expect("drained direction has a live peer");
            let strip = self.pullers[direction.index()]
                .as_mut()
                .expect("puller allocated for every live direction")
                .pull();
            let len = strip.len();
            unpack(ws, direction, self.width, &strip);
            self.log(MessageEvent { is_send: false, direction, peer, len });
        }
        self.log(StateEvent { is_send_set: false, posted: false, count: loan.directions.len() });
    }

    /// Design A: synchronous exchange-then-compute. Packs and sends every inner boundary strip,
    /// then blocks until every matching receive has arrived and landed in `ws`'s back buffer,
    /// before returning. No overlap with computation; provided for comparison and for the
    /// `T = 1` time-skewing equivalence test.
    pub fn exchange_synchronously(&mut self, ws: &mut Workspace) -> Result<(), UsageError> {
        let send_loan = self.post_sends(ws)?;
        let recv_loan = self.post_receives()?;
        self.wait_for_receives(ws, recv_loan);
        self.wait_for_sends(send_loan);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::Process;

    #[test]
    fn strip_rect_at_width_one_matches_single_cell_strips() {
        let n = 5;
        assert_eq!(strip_rect(Direction::Left, 1, n, true), (0, 0, 1, 5));
        assert_eq!(strip_rect(Direction::Left, 1, n, false), (-1, 0, 1, 5));
        assert_eq!(strip_rect(Direction::Right, 1, n, true), (4, 0, 1, 5));
        assert_eq!(strip_rect(Direction::Top, 1, n, true), (0, 4, 5, 1));
        assert_eq!(strip_rect(Direction::Bottom, 1, n, false), (0, -1, 5, 1));
    }

    #[test]
    fn strip_rect_corners_at_width_t() {
        let n = 6;
        let t = 2;
        assert_eq!(strip_rect(Direction::TopLeft, t, n, true), (0, 4, 2, 2));
        assert_eq!(strip_rect(Direction::TopLeft, t, n, false), (-2, 6, 2, 2));
        assert_eq!(strip_rect(Direction::BottomRight, t, n, true), (4, 0, 2, 2));
        assert_eq!(strip_rect(Direction::BottomRight, t, n, false), (6, -2, 2, 2));
    }

    #[test]
    fn pack_unpack_round_trips_strips_across_a_four_worker_mesh() {
        // A 2x2 mesh, every rank built: each live channel's sender and its matching
        // `HaloExchanger` both need to exist, or `wait_for_receives` blocks forever on a
        // neighbor nobody ever constructed.
        let builders = Process::new_vector(4);
        let mut allocators: Vec<Process> = builders.into_iter().map(|b| b.build()).collect();
        let topologies: Vec<Topology> = (0..4).map(|rank| Topology::new(rank, 2)).collect();

        let mut exchangers: Vec<HaloExchanger> = allocators
            .iter_mut()
            .zip(&topologies)
            .map(|(allocator, topology)| {
                HaloExchanger::for_axis_directions(allocator, topology, None)
            })
            .collect();

        // Rank 0: (row 0, col 0); right neighbor 1, top neighbor 2.
        // Rank 1: (row 0, col 1); left neighbor 0, top neighbor 3.
        // Rank 2: (row 1, col 0); bottom neighbor 0, right neighbor 3.
        // Rank 3: (row 1, col 1); left neighbor 2, bottom neighbor 1.
        let marker = |rank: usize| 10.0 * (rank as f64 + 1.0);
        let mut workspaces: Vec<Workspace> = (0..4)
            .map(|rank| {
                let mut ws = Workspace::new(3, 1, 0.0);
                for y in 0..3 {
                    for x in 0..3 {
                        ws.set_front(x, y, marker(rank));
                    }
                }
                ws.swap();
                ws
            })
            .collect();

        let send_loans: Vec<SendLoan> = exchangers
            .iter_mut()
            .zip(&workspaces)
            .map(|(exchanger, ws)| exchanger.post_sends(ws).unwrap())
            .collect();
        let recv_loans: Vec<RecvLoan> =
            exchangers.iter_mut().map(|exchanger| exchanger.post_receives().unwrap()).collect();

        for ((exchanger, ws), loan) in
            exchangers.iter_mut().zip(&mut workspaces).zip(recv_loans)
        {
            exchanger.wait_for_receives(ws, loan);
        }
        for (exchanger, loan) in exchangers.iter_mut().zip(send_loans) {
            exchanger.wait_for_sends(loan);
        }

        for i in 0..3 {
            assert_eq!(workspaces[0].get_back(3, i), marker(1));
            assert_eq!(workspaces[0].get_back(i, 3), marker(2));
            assert_eq!(workspaces[1].get_back(-1, i), marker(0));
            assert_eq!(workspaces[1].get_back(i, 3), marker(3));
            assert_eq!(workspaces[2].get_back(i, -1), marker(0));
            assert_eq!(workspaces[2].get_back(3, i), marker(3));
            assert_eq!(workspaces[3].get_back(-1, i), marker(2));
            assert_eq!(workspaces[3].get_back(i, -1), marker(1));
        }
    }
}
