//! Domain decomposition, neighbor topology, the non-blocking message layer, the halo
//! exchanger, and worker-group bootstrap for the stencil solver.
//!
//! Grounded on `timely_communication`: this crate keeps its allocator/channel trait shape
//! (`Allocate`, `Push`/`Pull`, `Generic`/`GenericBuilder`, `Configuration`/`initialize_from`/
//! `WorkerGuards`) and narrows the payload to the one concrete type this solver ever moves
//! across a channel, a packed halo strip.

pub mod allocator;
pub mod config;
pub mod error;
pub mod exchange;
pub mod initialize;
pub mod log_events;
pub mod message;
pub mod request;
pub mod topology;

pub use allocator::{Allocate, Generic, GenericBuilder};
pub use config::Partitioner;
pub use error::{CommError, ConfigError, ResourceError, UsageError};
pub use exchange::{HaloExchanger, RecvLoan, SendLoan};
pub use initialize::{initialize_from, Configuration, WorkerGuards};
pub use log_events::HaloEvent;
pub use message::{Pull, Push};
pub use request::RequestSet;
pub use topology::{Direction, Topology, ALL_DIRECTIONS, AXIS_DIRECTIONS};
