//! Per-rank result dumping: down-sampled snapshots of the back buffer, written as plain-text
//! `x y t u` quadruples.
//!
//! Grounded on the original source's `FileDumper<Workspace>` / `dumpBackbuffer`, with dump
//! density decoupled from the driver via a `DumpPolicy` trait (mirroring `get_freq_sel`).
//! Per the error-handling design, I/O failures here are never fatal: they are logged per rank
//! and the run continues.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Decides, for a given iteration index, whether a snapshot should be written.
pub trait DumpPolicy: Send + Sync {
    /// Whether iteration `k` should be dumped.
    fn should_dump(&self, k: usize) -> bool;
}

/// Dumps the first `k` iterations (`0..k`) and nothing after.
pub struct FirstK {
    k: usize,
}

impl FirstK {
    /// Dumps iterations `0..k`.
    pub fn new(k: usize) -> Self {
        FirstK { k }
    }
}

impl DumpPolicy for FirstK {
    fn should_dump(&self, k: usize) -> bool {
        k < self.k
    }
}

/// Dumps every `k`-th iteration (`0, k, 2k, ...`). `k == 0` never dumps.
pub struct EveryKth {
    k: usize,
}

impl EveryKth {
    /// Dumps iterations that are multiples of `k`.
    pub fn new(k: usize) -> Self {
        EveryKth { k }
    }
}

impl DumpPolicy for EveryKth {
    fn should_dump(&self, k: usize) -> bool {
        self.k != 0 && k % self.k == 0
    }
}

/// Default down-sampling density: samples per side of the local slice, regardless of `n`.
pub const DEFAULT_SAMPLES_PER_SIDE: usize = 25;

/// Writes down-sampled snapshots of one worker's back buffer to `<out_dir>/<rank>_t_<k>`.
pub struct FileDumper {
    rank: usize,
    offset_x: f64,
    offset_y: f64,
    h: f64,
    samples_per_side: usize,
    out_dir: PathBuf,
    policy: Box<dyn DumpPolicy>,
}

impl FileDumper {
    /// Builds a dumper for `rank`, whose local slice's world-space lower-left corner is
    /// `(offset_x, offset_y)` and spatial step is `h`, writing into `out_dir`.
    pub fn new(
        rank: usize,
        offset_x: f64,
        offset_y: f64,
        h: f64,
        out_dir: impl AsRef<Path>,
        policy: Box<dyn DumpPolicy>,
    ) -> Self {
        FileDumper {
            rank,
            offset_x,
            offset_y,
            h,
            samples_per_side: DEFAULT_SAMPLES_PER_SIDE,
            out_dir: out_dir.as_ref().to_path_buf(),
            policy,
        }
    }

    /// Overrides the default down-sampling density.
    pub fn with_samples_per_side(mut self, samples_per_side: usize) -> Self {
        self.samples_per_side = samples_per_side.max(1);
        self
    }

    /// Writes a snapshot of `ws`'s back buffer for iteration `k`, if `policy` selects it.
    /// A failure to write is logged and otherwise ignored; it never aborts the run.
    pub fn dump(&self, ws: &stencil_grid::Workspace, k: usize) {
        if !self.policy.should_dump(k) {
            return;
        }
        if let Err(e) = self.write_snapshot(ws, k) {
            tracing::warn!(rank = self.rank, iteration = k, error = %e, "failed to write dump file");
        }
    }

    fn write_snapshot(&self, ws: &stencil_grid::Workspace, k: usize) -> io::Result<()> {
        std::fs::create_dir_all(&self.out_dir)?;
        let path = self.out_dir.join(format!("{}_t_{}", self.rank, k));
        let mut file = File::create(path)?;

        let n = ws.inner_length();
        let step = (n / self.samples_per_side.max(1)).max(1);

        let mut x_idx = 0usize;
        while x_idx < n {
            let mut y_idx = 0usize;
            while y_idx < n {
                let x = self.offset_x + (x_idx as f64 + 1.0) * self.h;
                let y = self.offset_y + (y_idx as f64 + 1.0) * self.h;
                let u = ws.get_back(x_idx as i64, y_idx as i64);
                writeln!(file, "{x} {y} {k} {u}")?;
                y_idx += step;
            }
            writeln!(file)?;
            x_idx += step;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stencil_grid::Workspace;

    #[test]
    fn first_k_dumps_only_the_leading_iterations() {
        let policy = FirstK::new(3);
        assert!(policy.should_dump(0));
        assert!(policy.should_dump(2));
        assert!(!policy.should_dump(3));
    }

    #[test]
    fn every_kth_dumps_on_multiples() {
        let policy = EveryKth::new(4);
        assert!(policy.should_dump(0));
        assert!(policy.should_dump(8));
        assert!(!policy.should_dump(1));
        assert!(!EveryKth::new(0).should_dump(0));
    }

    #[test]
    fn dump_writes_a_file_with_one_record_per_sample() {
        let dir = std::env::temp_dir().join("stencil_dump_test");
        let ws = Workspace::new(4, 1, 0.0);
        let dumper = FileDumper::new(0, 0.0, 0.0, 0.2, &dir, Box::new(FirstK::new(1)))
            .with_samples_per_side(4);
        dumper.dump(&ws, 0);
        let contents = std::fs::read_to_string(dir.join("0_t_0")).unwrap();
        assert_eq!(contents.lines().filter(|l| !l.is_empty()).count(), 16);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
