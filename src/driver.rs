//! The per-worker solver state machine: interior update, halo synchronization, boundary
//! update, buffer swap, and the next round of posted communication.
//!
//! Grounded on the original source's `main` loop (`src/parallel_async.cpp`) and on
//! `SPEC_FULL.md`'s Design A/B pseudocode. Both synchronous ("exchange-then-compute") and
//! asynchronous ("overlap") scheduling share the same `HaloExchanger` primitives: the
//! synchronous design simply swaps before exchanging and waits immediately, rather than
//! carrying the post loans across an iteration boundary.

use stencil_comm::{Allocate, HaloExchanger, Partitioner, RecvLoan, SendLoan, Topology};
use stencil_grid::Workspace;
use stencil_logging::Logger;

use crate::dump::FileDumper;
use crate::kernel::Kernel;

/// Selects which halo-exchange scheduling the driver uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Design A: compute the whole slice, then exchange, then swap.
    Synchronous,
    /// Design B: overlap interior computation with the previous iteration's pending exchange.
    Asynchronous,
}

/// Runs the 4-neighbor stencil solver for one worker.
pub struct Driver<K> {
    kernel: K,
    workspace: Workspace,
    exchanger: HaloExchanger,
    offset_x: f64,
    offset_y: f64,
    h: f64,
    mode: SyncMode,
    pending_send: Option<SendLoan>,
    pending_recv: Option<RecvLoan>,
}

impl<K: Kernel> Driver<K> {
    /// Builds a driver for `rank` in the mesh `partitioner` describes, using `allocator` to
    /// stand up the halo exchanger's channels.
    pub fn new(
        kernel: K,
        partitioner: &Partitioner,
        rank: usize,
        allocator: &mut dyn Allocate,
        mode: SyncMode,
        logger: Option<Logger<stencil_comm::HaloEvent>>,
    ) -> Self {
        let topology = Topology::new(rank, partitioner.mesh_side());
        let n = partitioner.slice_size();
        let workspace = Workspace::new(n, 1, 0.0);
        let exchanger = HaloExchanger::for_axis_directions(allocator, &topology, logger);
        let (row, col) = partitioner.grid_position(rank);
        let (offset_x, offset_y) = partitioner.offsets(row, col);

        Driver {
            kernel,
            workspace,
            exchanger,
            offset_x,
            offset_y,
            h: partitioner.step(),
            mode,
            pending_send: None,
            pending_recv: None,
        }
    }

    /// Read-only access to the workspace, for dumping or testing.
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    fn world_position(&self, x: i64, y: i64) -> (f64, f64) {
        (self.offset_x + (x as f64 + 1.0) * self.h, self.offset_y + (y as f64 + 1.0) * self.h)
    }

    fn compute_point(&mut self, x: i64, y: i64) {
        let l = self.workspace.get_back(x - 1, y);
        let b = self.workspace.get_back(x, y - 1);
        let r = self.workspace.get_back(x + 1, y);
        let t = self.workspace.get_back(x, y + 1);
        let v = self.kernel.update(l, b, r, t);
        self.workspace.set_front(x, y, v);
    }

    fn compute_boundary(&mut self) {
        let n = self.workspace.inner_length() as i64;
        for y in 0..n {
            self.compute_point(0, y);
        }
        for y in 0..n {
            self.compute_point(n - 1, y);
        }
        for x in 0..n {
            self.compute_point(x, n - 1);
        }
        for x in 0..n {
            self.compute_point(x, 0);
        }
    }

    /// Fills the slice with the kernel's initial condition, then brings up the first round of
    /// halo data (synchronously for [`SyncMode::Synchronous`], or posted-ahead for
    /// [`SyncMode::Asynchronous`], matching the original source's "send our part of initial
    /// condition to neighbours" step).
    pub fn initialize(&mut self) {
        let n = self.workspace.inner_length() as i64;
        for y in 0..n {
            for x in 0..n {
                let (wx, wy) = self.world_position(x, y);
                let v = self.kernel.initial(wx, wy);
                self.workspace.set_front(x, y, v);
            }
        }
        self.workspace.swap();

        match self.mode {
            SyncMode::Synchronous => {
                self.exchanger
                    .exchange_synchronously(&mut self.workspace)
                    .expect("halo exchange request set overflow during initialization");
            }
            SyncMode::Asynchronous => {
                let send_loan = self
                    .exchanger
                    .post_sends(&self.workspace)
                    .expect("halo exchange request set overflow during initialization");
                let recv_loan = self
                    .exchanger
                    .post_receives()
                    .expect("halo exchange request set overflow during initialization");
                self.pending_send = Some(send_loan);
                self.pending_recv = Some(recv_loan);
            }
        }
    }

    /// Advances the solver by one iteration, writing a dump via `dumper` if it selects `k`.
    pub fn step(&mut self, k: usize, dumper: Option<&FileDumper>) {
        match self.mode {
            SyncMode::Synchronous => self.step_synchronous(k, dumper),
            SyncMode::Asynchronous => self.step_asynchronous(k, dumper),
        }
    }

    fn step_synchronous(&mut self, k: usize, dumper: Option<&FileDumper>) {
        let n = self.workspace.inner_length() as i64;
        for y in 0..n {
            for x in 0..n {
                self.compute_point(x, y);
            }
        }
        self.workspace.swap();
        self.exchanger
            .exchange_synchronously(&mut self.workspace)
            .expect("halo exchange request set overflow");
        if let Some(d) = dumper {
            d.dump(&self.workspace, k);
        }
    }

    fn step_asynchronous(&mut self, k: usize, dumper: Option<&FileDumper>) {
        let n = self.workspace.inner_length() as i64;
        for y in 1..n - 1 {
            for x in 1..n - 1 {
                self.compute_point(x, y);
            }
        }

        let recv_loan = self.pending_recv.take().expect("receive loan posted during initialize");
        self.exchanger.wait_for_receives(&mut self.workspace, recv_loan);
        let send_loan = self.pending_send.take().expect("send loan posted during initialize");
        self.exchanger.wait_for_sends(send_loan);

        self.compute_boundary();
        self.workspace.swap();

        let send_loan = self.exchanger.post_sends(&self.workspace).expect("halo request set overflow");
        let recv_loan = self.exchanger.post_receives().expect("halo request set overflow");
        self.pending_send = Some(send_loan);
        self.pending_recv = Some(recv_loan);

        if let Some(d) = dumper {
            d.dump(&self.workspace, k);
        }
    }

    /// Runs `initialize` followed by `time_steps` calls to `step`.
    pub fn run(&mut self, time_steps: usize, dumper: Option<&FileDumper>) {
        self.initialize();
        for k in 0..time_steps {
            self.step(k, dumper);
        }
    }
}
