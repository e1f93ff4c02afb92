//! Worker-group bootstrap: turns a [`Configuration`] into `std::thread`s, each running the
//! supplied closure against its own [`crate::allocator::Generic`] allocator.
//!
//! Grounded on `timely_communication::initialize::{Configuration, initialize_from,
//! WorkerGuards}`, narrowed to the two configurations this solver actually launches (no
//! `Cluster` variant: this crate has no networking allocator) and using `CommError` in place of
//! the teacher's `String` errors.

use std::thread;

use crate::allocator::{Generic, GenericBuilder, Process};
use crate::error::CommError;

/// How many workers to spawn, and with which allocator.
pub enum Configuration {
    /// A single in-process worker; no channel allocation overhead.
    Thread,
    /// `usize` worker threads inside this process, each with a full [`Generic`] allocator.
    Process(usize),
}

impl Configuration {
    /// Builds the [`GenericBuilder`]s this configuration describes, one per worker-to-be.
    pub fn builders(self) -> Vec<GenericBuilder> {
        match self {
            Configuration::Thread => vec![GenericBuilder::Thread],
            Configuration::Process(workers) => {
                Process::new_vector(workers).into_iter().map(GenericBuilder::Process).collect()
            }
        }
    }
}

/// Spawns one `std::thread` per builder, named `"worker thread {index}"`, each running `func`
/// against the [`Generic`] allocator that builder produces.
pub fn initialize_from<T, F>(builders: Vec<GenericBuilder>, func: F) -> Result<WorkerGuards<T>, CommError>
where
    T: Send + 'static,
    F: Fn(Generic) -> T + Send + Sync + 'static,
{
    use std::sync::Arc;

    let logic = Arc::new(func);
    let mut guards = Vec::with_capacity(builders.len());
    for (index, builder) in builders.into_iter().enumerate() {
        let clone = logic.clone();
        let handle = thread::Builder::new()
            .name(format!("worker thread {index}"))
            .spawn(move || (*clone)(builder.build()))
            .map_err(|e| CommError::SpawnFailed(e.to_string()))?;
        guards.push(handle);
    }
    Ok(WorkerGuards { guards })
}

/// Owns the `JoinHandle`s for a worker group; joins them on [`WorkerGuards::join`] or on drop.
pub struct WorkerGuards<T: Send + 'static> {
    guards: Vec<thread::JoinHandle<T>>,
}

impl<T: Send + 'static> WorkerGuards<T> {
    /// Joins every worker thread and returns its result (or the panic payload, stringified).
    pub fn join(mut self) -> Vec<Result<T, CommError>> {
        self.guards
            .drain(..)
            .map(|g| g.join().map_err(|e| CommError::JoinFailed(format!("{e:?}"))))
            .collect()
    }
}

impl<T: Send + 'static> Drop for WorkerGuards<T> {
    fn drop(&mut self) {
        for guard in self.guards.drain(..) {
            guard.join().expect("worker thread panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_configuration_builds_a_single_builder() {
        assert_eq!(Configuration::Thread.builders().len(), 1);
    }

    #[test]
    fn process_configuration_builds_requested_worker_count() {
        assert_eq!(Configuration::Process(4).builders().len(), 4);
    }

    #[test]
    fn initialize_from_runs_every_worker_and_joins_results() {
        let guards = initialize_from(Configuration::Process(3).builders(), |allocator| {
            use crate::allocator::Allocate;
            allocator.index()
        })
        .unwrap();
        let mut results: Vec<usize> = guards.join().into_iter().map(Result::unwrap).collect();
        results.sort_unstable();
        assert_eq!(results, vec![0, 1, 2]);
    }
}
