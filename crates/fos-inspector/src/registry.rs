//! Identifier Registry
//!
//! Bidirectional map between host nodes and `NodeId`s. Released ids go back
//! into a free pool and are handed out again, lowest first, before new ids are
//! minted.

use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;

use crate::NodeId;

#[derive(Debug)]
struct Entry<N> {
    node: N,
    host_key: Option<String>,
}

/// Host node <-> `NodeId` registry
#[derive(Debug)]
pub struct IdRegistry<N> {
    ids: HashMap<N, NodeId>,
    entries: HashMap<NodeId, Entry<N>>,
    host_keys: HashMap<String, NodeId>,
    free: BTreeSet<u32>,
    next: u32,
}

impl<N: Clone + Eq + Hash> IdRegistry<N> {
    pub fn new() -> Self {
        Self {
            ids: HashMap::new(),
            entries: HashMap::new(),
            host_keys: HashMap::new(),
            free: BTreeSet::new(),
            next: 1,
        }
    }

    /// Id for `node`, allocating one on first sight
    pub fn id_for(&mut self, node: &N) -> NodeId {
        if let Some(&id) = self.ids.get(node) {
            return id;
        }

        let id = match self.free.pop_first() {
            Some(raw) => NodeId(raw),
            None => {
                let raw = self.next;
                self.next += 1;
                NodeId(raw)
            }
        };

        self.ids.insert(node.clone(), id);
        self.entries.insert(id, Entry { node: node.clone(), host_key: None });
        id
    }

    /// Id for `node` if it is registered
    pub fn id_of(&self, node: &N) -> Option<NodeId> {
        self.ids.get(node).copied()
    }

    /// Registered node for `id`
    pub fn node_for(&self, id: NodeId) -> Option<&N> {
        self.entries.get(&id).map(|e| &e.node)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Attach the host's own key to a registered id.
    ///
    /// A key already pointing at another id is moved to this one.
    pub fn set_host_key(&mut self, id: NodeId, key: String) {
        let Some(entry) = self.entries.get_mut(&id) else {
            return;
        };
        if let Some(old) = entry.host_key.replace(key.clone()) {
            if self.host_keys.get(&old) == Some(&id) {
                self.host_keys.remove(&old);
            }
        }
        if let Some(previous) = self.host_keys.insert(key, id) {
            if previous != id {
                if let Some(other) = self.entries.get_mut(&previous) {
                    other.host_key = None;
                }
            }
        }
    }

    /// Registered id carrying the given host key
    pub fn id_for_host_key(&self, key: &str) -> Option<NodeId> {
        self.host_keys.get(key).copied()
    }

    /// Forget `id` in both directions; the value becomes reusable
    pub fn release(&mut self, id: NodeId) -> Option<N> {
        let entry = self.entries.remove(&id)?;
        self.ids.remove(&entry.node);
        if let Some(key) = entry.host_key {
            if self.host_keys.get(&key) == Some(&id) {
                self.host_keys.remove(&key);
            }
        }
        self.free.insert(id.0);
        Some(entry.node)
    }

    /// Number of registered nodes
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Clone + Eq + Hash> Default for IdRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}
