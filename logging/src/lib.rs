//! A small generic event-logging registry, shared by the communication layer.
//!
//! This mirrors the role of the teacher's own dataflow-event logging: a named binding from
//! a logical stream (e.g. `"halo"`) to a typed action invoked on batches of timestamped events.
//! It is deliberately independent of `tracing`: this registry is for structured, replayable
//! event batches (one record per halo message), while `tracing` carries free-form diagnostics.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Binds logical stream names to type-erased loggers.
pub struct Registry {
    time: Instant,
    map: HashMap<String, Box<dyn Any>>,
}

impl Registry {
    /// Creates a new registry anchored at `time`; all logged events are timestamped
    /// relative to this instant.
    pub fn new(time: Instant) -> Self {
        Registry { time, map: HashMap::new() }
    }

    /// Binds `name` to `action`, returning any previously bound logger under that name.
    ///
    /// The action observes non-decreasing `Duration` timestamps. The logging stream for
    /// `name` ends only when the associated `Logger` clones are all dropped, not when a new
    /// binding replaces this one.
    pub fn insert<T: 'static>(
        &mut self,
        name: impl Into<String>,
        action: impl Fn(&Duration, &[(Duration, T)]) + 'static,
    ) -> Option<Box<dyn Any>> {
        let logger = Logger::<T>::new(self.time, action);
        self.map.insert(name.into(), Box::new(logger))
    }

    /// Removes and returns a previously bound logger.
    pub fn remove(&mut self, name: &str) -> Option<Box<dyn Any>> {
        self.map.remove(name)
    }

    /// Retrieves a clone of a bound logger, if one exists under `name` with the matching type.
    pub fn get<T: 'static>(&self, name: &str) -> Option<Logger<T>> {
        self.map
            .get(name)
            .and_then(|entry| entry.downcast_ref::<Logger<T>>())
            .cloned()
    }
}

/// A cheaply-clonable, buffering logger for events of type `T`.
pub struct Logger<T> {
    time: Instant,
    action: Rc<dyn Fn(&Duration, &[(Duration, T)])>,
    buffer: Rc<RefCell<Vec<(Duration, T)>>>,
}

impl<T> Clone for Logger<T> {
    fn clone(&self) -> Self {
        Logger { time: self.time, action: Rc::clone(&self.action), buffer: Rc::clone(&self.buffer) }
    }
}

impl<T> Logger<T> {
    /// Allocates a new logger bound to `action`, buffering up to 1024 events before flushing.
    pub fn new(time: Instant, action: impl Fn(&Duration, &[(Duration, T)]) + 'static) -> Self {
        Logger {
            time,
            action: Rc::new(action),
            buffer: Rc::new(RefCell::new(Vec::with_capacity(1024))),
        }
    }

    /// Records `event`, timestamped at the moment of the call. May trigger a flush if the
    /// buffer has reached capacity.
    pub fn log(&self, event: T) {
        let mut buffer = self.buffer.borrow_mut();
        buffer.push((self.time.elapsed(), event));
        if buffer.len() == buffer.capacity() {
            (self.action)(&self.time.elapsed(), &buffer[..]);
            buffer.clear();
        }
    }

    /// Flushes any buffered events, regardless of capacity.
    pub fn flush(&self) {
        let mut buffer = self.buffer.borrow_mut();
        (self.action)(&self.time.elapsed(), &buffer[..]);
        buffer.clear();
    }
}

/// A `Send` variant of [`Logger`] usable from code that is generic over thread-spawned workers.
///
/// The teacher's own logging core is explicitly `!Send` (`Rc`-backed, thread-local buffers);
/// workers in this crate run on distinct `std::thread`s, each owning its own `Registry`, so no
/// cross-thread sharing of a single `Logger` is required.
pub type SharedAction<T> = Arc<dyn Fn(&Duration, &[(Duration, T)]) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc as StdRc;

    #[test]
    fn flush_invokes_action_with_buffered_events() {
        let seen = StdRc::new(Cell::new(0usize));
        let seen2 = StdRc::clone(&seen);
        let logger = Logger::<u32>::new(Instant::now(), move |_, batch| {
            seen2.set(seen2.get() + batch.len());
        });
        logger.log(1);
        logger.log(2);
        logger.flush();
        assert_eq!(seen.get(), 2);
    }

    #[test]
    fn registry_roundtrips_typed_logger() {
        let mut registry = Registry::new(Instant::now());
        registry.insert::<u32>("halo", |_, _| {});
        assert!(registry.get::<u32>("halo").is_some());
        assert!(registry.get::<u64>("halo").is_none());
        registry.remove("halo");
        assert!(registry.get::<u32>("halo").is_none());
    }
}
