//! The double-buffered, halo-padded grid storage shared by every solver variant.
//!
//! A [`Workspace`] owns two equally-sized buffers (`front`, `back`) addressed by coordinates
//! in `[-w, n+w)`, where `n` is the side length of the worker's owned slice and `w` is the
//! halo width (1 for the basic asynchronous solver, `T` for the time-skewed variant). `front`
//! is the write target of the iteration in progress; `back` is the read source. `swap()` flips
//! which of the two backing buffers plays which role without moving any data, so that handles
//! into the halo regions (held by the communication layer between `post_*` and `wait_*`)
//! remain valid across the flip.

use thiserror::Error;

/// Coordinate-space and request-set misuse; always an implementation bug, never a runtime
/// condition a caller should recover from.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UsageError {
    /// A coordinate fell outside `[-w, n+w)` on one or both axes.
    #[error("coordinate ({x}, {y}) out of bounds for inner length {n} and halo width {w}")]
    OutOfBounds { x: i64, y: i64, n: usize, w: usize },
}

/// A double-buffered square grid with halo padding of width `w` around an `n x n` owned slice.
///
/// Storage is `[buf0, buf1]`; `front_idx`/`back_idx` are the two (complementary) indices into
/// that pair naming which buffer currently plays which logical role. `swap()` toggles the two
/// indices rather than moving data, preserving stable addresses for any outstanding network
/// loans (see `stencil_comm::exchange::Loan`).
pub struct Workspace {
    n: usize,
    w: usize,
    side: usize,
    buffers: [Vec<f64>; 2],
    front_idx: usize,
}

impl Workspace {
    /// Allocates a workspace for an `n x n` owned slice with halo width `w`, both buffers
    /// initialized to `dirichlet` everywhere (the Dirichlet boundary constant). Because every
    /// halo cell for a direction with no neighbor is never written again, invariant I2 (`outer
    /// halo cells for missing neighbors retain the Dirichlet constant for the process lifetime`)
    /// holds for free.
    pub fn new(n: usize, w: usize, dirichlet: f64) -> Self {
        let side = n + 2 * w;
        let len = side * side;
        Workspace {
            n,
            w,
            side,
            buffers: [vec![dirichlet; len], vec![dirichlet; len]],
            front_idx: 0,
        }
    }

    /// Side length of the owned (non-halo) slice.
    pub fn inner_length(&self) -> usize {
        self.n
    }

    /// Halo width in cells.
    pub fn halo_width(&self) -> usize {
        self.w
    }

    fn offset(&self, x: i64, y: i64) -> Result<usize, UsageError> {
        let w = self.w as i64;
        let n = self.n as i64;
        if x < -w || x >= n + w || y < -w || y >= n + w {
            return Err(UsageError::OutOfBounds { x, y, n: self.n, w: self.w });
        }
        let row = (w + y) as usize;
        let col = (w + x) as usize;
        Ok(row * self.side + col)
    }

    /// Writes `value` into the front buffer at `(x, y)`. `(x, y)` may address any cell in
    /// `[-w, n+w)`, including halo cells (the exchanger writes received data there).
    pub fn set_front(&mut self, x: i64, y: i64, value: f64) {
        let idx = self.offset(x, y).expect("set_front: coordinate out of bounds");
        self.buffers[self.front_idx][idx] = value;
    }

    /// Reads the back buffer at `(x, y)`.
    pub fn get_back(&self, x: i64, y: i64) -> f64 {
        let idx = self.offset(x, y).expect("get_back: coordinate out of bounds");
        self.buffers[self.back_idx()][idx]
    }

    /// Fallible variant of [`Workspace::set_front`], for callers that want to surface
    /// [`UsageError`] rather than panic (used by the boundary/exchange code, which treats
    /// any out-of-bounds access as a fatal assertion per the error-handling design).
    pub fn try_set_front(&mut self, x: i64, y: i64, value: f64) -> Result<(), UsageError> {
        let idx = self.offset(x, y)?;
        self.buffers[self.front_idx][idx] = value;
        Ok(())
    }

    /// Fallible variant of [`Workspace::get_back`].
    pub fn try_get_back(&self, x: i64, y: i64) -> Result<f64, UsageError> {
        let idx = self.offset(x, y)?;
        Ok(self.buffers[self.back_idx()][idx])
    }

    /// Writes `value` directly into the back buffer at `(x, y)`.
    ///
    /// Used only by the halo exchanger: received strips land in the back buffer (the one the
    /// *next* iteration's interior phase will read), not the front buffer, per the solver
    /// driver's `post_receives(back)` step — mirroring the original source's
    /// `copy_outer_buffer_to(back)`, which writes arrived halo data directly into `back` rather
    /// than staging it through `front`.
    pub fn set_back(&mut self, x: i64, y: i64, value: f64) {
        let idx = self.offset(x, y).expect("set_back: coordinate out of bounds");
        let back = self.back_idx();
        self.buffers[back][idx] = value;
    }

    /// Fallible variant of [`Workspace::set_back`].
    pub fn try_set_back(&mut self, x: i64, y: i64, value: f64) -> Result<(), UsageError> {
        let idx = self.offset(x, y)?;
        let back = self.back_idx();
        self.buffers[back][idx] = value;
        Ok(())
    }

    fn back_idx(&self) -> usize {
        1 - self.front_idx
    }

    /// Flips the logical roles of front and back. The physical storage address computed
    /// for any `(x, y)` is unchanged by this call (invariant I3); only which buffer answers
    /// `set_front`/`get_back` changes.
    pub fn swap(&mut self) {
        self.front_idx = self.back_idx();
    }

    /// Direct slice access to the back buffer, used by the exchanger to pack outbound strips
    /// without going through per-cell bounds checks.
    pub fn back_slice(&self) -> &[f64] {
        &self.buffers[self.back_idx()]
    }

    /// Direct mutable slice access to the front buffer, used by the exchanger to unpack
    /// inbound strips.
    pub fn front_slice_mut(&mut self) -> &mut [f64] {
        &mut self.buffers[self.front_idx]
    }

    /// Row stride of the backing storage (`n + 2w`), needed by the exchanger to compute
    /// strided offsets for vertical strips and sub-rectangles.
    pub fn stride(&self) -> usize {
        self.side
    }

    /// Converts a workspace coordinate into a flat index into [`Workspace::back_slice`] /
    /// [`Workspace::front_slice_mut`], without going through the panicking accessor.
    pub fn flat_index(&self, x: i64, y: i64) -> Result<usize, UsageError> {
        self.offset(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_preserves_storage_address_but_flips_role() {
        let mut ws = Workspace::new(2, 1, 0.0);
        ws.set_front(0, 0, 1.0);
        assert_eq!(ws.get_back(0, 0), 0.0);
        ws.swap();
        assert_eq!(ws.get_back(0, 0), 1.0);
    }

    #[test]
    fn halo_cells_default_to_dirichlet_until_written() {
        let ws = Workspace::new(3, 1, 0.0);
        assert_eq!(ws.get_back(-1, 0), 0.0);
        assert_eq!(ws.get_back(3, 2), 0.0);
    }

    #[test]
    fn out_of_bounds_access_is_rejected() {
        let ws = Workspace::new(2, 1, 0.0);
        assert_eq!(
            ws.try_get_back(-2, 0),
            Err(UsageError::OutOfBounds { x: -2, y: 0, n: 2, w: 1 })
        );
        assert_eq!(
            ws.try_get_back(0, 3),
            Err(UsageError::OutOfBounds { x: 0, y: 3, n: 2, w: 1 })
        );
    }

    #[test]
    fn repeated_swap_is_involutive() {
        let mut ws = Workspace::new(2, 1, 0.0);
        ws.set_front(0, 0, 1.0);
        ws.swap();
        ws.set_front(0, 0, 2.0);
        ws.swap();
        assert_eq!(ws.get_back(0, 0), 2.0);
    }
}
