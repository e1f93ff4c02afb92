//! Typed inter-thread, intra-process channels.
//!
//! Grounded on `timely_communication::allocator::process::{Process, ProcessBuilder}`, modernized
//! to drop the `Box<dyn Any + Send>` downcasting dance in favor of a concrete `Vec<f64>`
//! payload (this crate has exactly one message type, a packed halo strip) and `dyn Push`/`dyn
//! Pull` trait objects instead of pre-2018 bare-trait syntax.
//!
//! For channel `identifier`, every worker gets a full mesh: one [`crate::message::Push`] per
//! peer (so it can address any of them) and the one [`crate::message::Pull`] that collects
//! whatever peers addressed to it. The mesh is built lazily, on whichever worker calls
//! `allocate_channel(identifier)` first. Its senders are shared and cloned out by every caller;
//! its receivers are handed out one at a time, each claimed exactly once by the worker whose
//! rank owns that slot.

use std::collections::HashMap;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};

use super::Allocate;
use crate::message::{ChannelPuller, ChannelPusher, Pull, Push};

type ChannelMesh = (Vec<Sender<Vec<f64>>>, Vec<Option<Receiver<Vec<f64>>>>);

/// Builds one [`Process`] allocator per worker, all sharing the same channel table.
pub struct ProcessBuilder {
    index: usize,
    peers: usize,
    channels: Arc<Mutex<HashMap<usize, ChannelMesh>>>,
}

impl ProcessBuilder {
    /// Materializes the allocator this builder describes.
    pub fn build(self) -> Process {
        Process { index: self.index, peers: self.peers, channels: self.channels }
    }
}

/// An allocator for inter-thread, intra-process communication among `peers` worker threads.
pub struct Process {
    index: usize,
    peers: usize,
    channels: Arc<Mutex<HashMap<usize, ChannelMesh>>>,
}

impl Process {
    /// Builds `peers` linked [`ProcessBuilder`]s, one per worker-to-be.
    pub fn new_vector(peers: usize) -> Vec<ProcessBuilder> {
        let channels = Arc::new(Mutex::new(HashMap::new()));
        (0..peers)
            .map(|index| ProcessBuilder { index, peers, channels: channels.clone() })
            .collect()
    }
}

impl Allocate for Process {
    fn index(&self) -> usize {
        self.index
    }

    fn peers(&self) -> usize {
        self.peers
    }

    fn allocate_channel(&mut self, identifier: usize) -> (Vec<Box<dyn Push>>, Box<dyn Pull>) {
        let mut channels = self.channels.lock().expect("channel table mutex poisoned");

        let (senders, receiver, emptied_after) = {
            let mesh = channels.entry(identifier).or_insert_with(|| {
                // One (Sender, Receiver) pair per worker: anyone may send into slot `i`, but
                // only worker `i` ever takes the receiver out. The senders live in their own
                // vector, outside any `Option`, so claiming a receiver never disturbs a sender
                // another worker still needs to clone.
                let mut senders = Vec::with_capacity(self.peers);
                let mut receivers = Vec::with_capacity(self.peers);
                for _ in 0..self.peers {
                    let (tx, rx): (Sender<Vec<f64>>, Receiver<Vec<f64>>) = channel();
                    senders.push(tx);
                    receivers.push(Some(rx));
                }
                (senders, receivers)
            });

            let all_senders = mesh.0.clone();
            let receiver =
                mesh.1[self.index].take().expect("channel already claimed by this worker");
            let emptied_after = mesh.1.iter().all(|slot| slot.is_none());
            (all_senders, receiver, emptied_after)
        };

        if emptied_after {
            channels.remove(&identifier);
        }

        let pushers = senders
            .into_iter()
            .map(|s| Box::new(ChannelPusher::new(s)) as Box<dyn Push>)
            .collect();
        let puller = Box::new(ChannelPuller::new(receiver)) as Box<dyn Pull>;

        (pushers, puller)
    }
}
