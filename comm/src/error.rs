//! Fatal error kinds for configuration and communication failures.
//!
//! Per the error-handling design, every variant here is fatal: there is no retry path.
//! `ConfigError` is reported once by rank 0 and aborts all ranks before any allocation;
//! `CommError` aborts the collective mid-run; `ResourceError` models an allocation failure at
//! the one seam (`Workspace::new`'s caller) where the documented contract wants a typed error
//! rather than Rust's usual abort-on-OOM.

use thiserror::Error;

/// Fatal at startup: bad worker-count/grid shape, or a malformed CLI invocation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// `P` is not a perfect square, so no `S x S` worker mesh exists.
    #[error("worker count {p} is not a perfect square")]
    NonSquareWorkerCount {
        /// The worker count that failed the perfect-square check.
        p: usize,
    },
    /// `S` does not evenly divide `N`, so the grid cannot be sliced equally.
    #[error("grid side {n} is not divisible by worker mesh side {s}")]
    IndivisibleGrid {
        /// The grid side length.
        n: usize,
        /// The worker mesh side length (`sqrt(P)`).
        s: usize,
    },
    /// The CLI arguments could not be parsed into a `Config`.
    #[error("invalid command line arguments: {0}")]
    InvalidArguments(String),
}

/// Fatal mid-run: a transport failure during post/wait, or a failure to bring up or tear down
/// the worker thread group itself.
#[derive(Debug, Error)]
pub enum CommError {
    /// A worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    SpawnFailed(String),
    /// A worker thread panicked or could not be joined.
    #[error("failed to join worker thread: {0}")]
    JoinFailed(String),
    /// A channel closed while a send or receive was outstanding.
    #[error("channel to peer {peer} closed while awaiting {direction:?}")]
    ChannelClosed {
        /// The peer rank the channel was connected to.
        peer: usize,
        /// The logical direction (as a label) the channel was carrying.
        direction: &'static str,
    },
}

/// Fatal: a buffer could not be allocated.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// Allocation of a workspace or communication buffer failed.
    #[error("failed to allocate {len} doubles for {purpose}")]
    Allocation {
        /// Requested buffer length, in elements.
        len: usize,
        /// What the buffer was for, for diagnostics.
        purpose: &'static str,
    },
}

/// Fatal assertion: the communication layer was used in a way that indicates an implementation
/// bug, rather than a runtime condition. (`stencil_grid::UsageError` covers the sibling
/// coordinate-bounds half of this same error kind; the two live in separate crates because
/// that is where each underlying invariant is enforced.)
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UsageError {
    /// More outstanding requests were posted than the bounded request set can hold.
    #[error("request set overflow: attempted to post a {what} request beyond capacity {capacity}")]
    RequestSetOverflow {
        /// Which request set ("send" or "receive").
        what: &'static str,
        /// The fixed capacity of the request set (the neighbor count).
        capacity: usize,
    },
}
