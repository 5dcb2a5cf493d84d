//! Pending Change Tracker
//!
//! Mount and unmount notifications received since the last flush of each
//! root. An id found in both sets at flush time cancels out.

use std::collections::HashMap;

use crate::NodeId;

/// Where an id stands in the current batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingStatus {
    /// Nothing pending
    Clean,
    /// Mounted this batch
    Mounted,
    /// Unmounted this batch
    Unmounted,
    /// Mounted and unmounted within the same batch
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    root: NodeId,
    seq: u64,
}

/// Pending mount/unmount sets, partitioned by root
#[derive(Debug, Default)]
pub struct PendingChanges {
    mounts: HashMap<NodeId, Pending>,
    unmounts: HashMap<NodeId, Pending>,
    seq: u64,
}

impl PendingChanges {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    pub fn record_mount(&mut self, id: NodeId, root: NodeId) {
        if !self.mounts.contains_key(&id) {
            let seq = self.next_seq();
            self.mounts.insert(id, Pending { root, seq });
        }
    }

    pub fn record_unmount(&mut self, id: NodeId, root: NodeId) {
        if !self.unmounts.contains_key(&id) {
            let seq = self.next_seq();
            self.unmounts.insert(id, Pending { root, seq });
        }
    }

    pub fn status(&self, id: NodeId) -> PendingStatus {
        match (self.mounts.contains_key(&id), self.unmounts.contains_key(&id)) {
            (true, true) => PendingStatus::Cancelled,
            (true, false) => PendingStatus::Mounted,
            (false, true) => PendingStatus::Unmounted,
            (false, false) => PendingStatus::Clean,
        }
    }

    pub fn is_unmounted(&self, id: NodeId) -> bool {
        self.unmounts.contains_key(&id)
    }

    /// Remove `id` from both sets, returning what was pending
    pub fn take(&mut self, id: NodeId) -> PendingStatus {
        let status = self.status(id);
        self.mounts.remove(&id);
        self.unmounts.remove(&id);
        status
    }

    /// Remove every entry of `root`, in arrival order
    pub fn drain_root(&mut self, root: NodeId) -> Vec<(NodeId, PendingStatus)> {
        let mut order: HashMap<NodeId, u64> = HashMap::new();
        for (&id, pending) in self.mounts.iter().chain(self.unmounts.iter()) {
            if pending.root == root {
                let seq = order.entry(id).or_insert(pending.seq);
                *seq = (*seq).min(pending.seq);
            }
        }

        let mut drained: Vec<(u64, NodeId)> = order.into_iter().map(|(id, seq)| (seq, id)).collect();
        drained.sort_unstable();
        drained.into_iter().map(|(_, id)| (id, self.take(id))).collect()
    }

    /// Whether `root` has anything waiting
    pub fn has_pending(&self, root: NodeId) -> bool {
        self.mounts.values().chain(self.unmounts.values()).any(|p| p.root == root)
    }

    /// Number of ids with a pending entry
    pub fn len(&self) -> usize {
        self.mounts.len() + self.unmounts.keys().filter(|id| !self.mounts.contains_key(id)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty() && self.unmounts.is_empty()
    }
}
