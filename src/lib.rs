//! The stencil solver binary's library half: kernel, driver (Designs A/B), time-skewed driver
//! (Design C), CLI parsing, dumping, and timing. Kept as a library so the pieces below are
//! independently testable without going through `main`.

pub mod config_cli;
pub mod driver;
pub mod dump;
pub mod kernel;
pub mod time_skew;
pub mod timer;

pub use config_cli::{parse as parse_config, Config};
pub use driver::{Driver, SyncMode};
pub use dump::{DumpPolicy, EveryKth, FileDumper, FirstK};
pub use kernel::{JacobiMean, Kernel};
pub use time_skew::TimeSkewDriver;
pub use timer::Timer;
