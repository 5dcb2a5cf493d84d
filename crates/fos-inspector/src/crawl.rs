//! Crawl Algorithm
//!
//! Walks the live host tree from one root, top-down, and turns the pending
//! changes of that root into operations. Only significant nodes (the root and
//! class-like components) reach the wire; everything in between is elided and
//! its children are reattached to the nearest significant ancestor.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::config::InspectorConfig;
use crate::element::ElementType;
use crate::host::HostRenderer;
use crate::operations::{NodeRecord, OperationBuffer};
use crate::registry::IdRegistry;
use crate::tracker::{PendingChanges, PendingStatus};
use crate::NodeId;

/// Per-attach tree bookkeeping
#[derive(Debug)]
pub(crate) struct TreeState<N> {
    pub registry: IdRegistry<N>,
    pub pending: PendingChanges,
    /// Ids of attached roots
    pub roots: HashSet<NodeId>,
    /// Ids whose Add reached the remote side
    pub known: HashSet<NodeId>,
    /// Root each registered id was last seen under
    pub node_roots: HashMap<NodeId, NodeId>,
}

impl<N: Clone + Eq + Hash> TreeState<N> {
    pub fn new() -> Self {
        Self {
            registry: IdRegistry::new(),
            pending: PendingChanges::new(),
            roots: HashSet::new(),
            known: HashSet::new(),
            node_roots: HashMap::new(),
        }
    }

    /// Id for `node`, recording the host key on first sight
    pub fn register<H>(&mut self, host: &H, node: &N) -> NodeId
    where
        H: HostRenderer<Node = N>,
    {
        if let Some(id) = self.registry.id_of(node) {
            return id;
        }
        let id = self.registry.id_for(node);
        if let Some(key) = host.host_key(node) {
            self.registry.set_host_key(id, key);
        }
        id
    }

    /// Root id for `node`: the one remembered at mount time, else the top of
    /// its parent chain
    pub fn root_for<H>(&mut self, host: &H, node: &N) -> NodeId
    where
        H: HostRenderer<Node = N>,
    {
        if let Some(root) = self
            .registry
            .id_of(node)
            .and_then(|id| self.node_roots.get(&id).copied())
        {
            return root;
        }
        let top = top_of_chain(host, node);
        self.register(host, &top)
    }

    /// Forget `id` everywhere
    pub fn release(&mut self, id: NodeId) -> Option<N> {
        self.known.remove(&id);
        self.roots.remove(&id);
        self.node_roots.remove(&id);
        self.registry.release(id)
    }
}

/// Walk parent links up to the topmost ancestor
pub(crate) fn top_of_chain<H: HostRenderer>(host: &H, node: &H::Node) -> H::Node {
    let mut current = node.clone();
    while let Some(parent) = host.parent(&current) {
        current = parent;
    }
    current
}

/// Crawl `root_id` and resolve all of its pending changes
pub(crate) fn flush_root<H: HostRenderer>(
    host: &H,
    state: &mut TreeState<H::Node>,
    config: &InspectorConfig,
    root_id: NodeId,
) -> OperationBuffer {
    let mut crawl = Crawl {
        host,
        state,
        config,
        root_id,
        ops: OperationBuffer::new(),
    };

    let root = crawl.state.registry.node_for(root_id).cloned();
    match root {
        Some(root) if !crawl.state.pending.is_unmounted(root_id) => crawl.walk(root),
        Some(_) => tracing::trace!("Root {} unmounted, skipping crawl", root_id),
        None => tracing::debug!("Flush for unregistered root {}", root_id),
    }
    crawl.resolve_unvisited();
    crawl.ops
}

struct Crawl<'a, H: HostRenderer> {
    host: &'a H,
    state: &'a mut TreeState<H::Node>,
    config: &'a InspectorConfig,
    root_id: NodeId,
    ops: OperationBuffer,
}

impl<H: HostRenderer> Crawl<'_, H> {
    /// Pre-order walk, so a parent's Add always precedes its children's
    fn walk(&mut self, root: H::Node) {
        let mut stack: Vec<(H::Node, Option<NodeId>)> = vec![(root, None)];

        while let Some((node, ancestor)) = stack.pop() {
            let id = self.state.register(self.host, &node);
            self.state.node_roots.insert(id, self.root_id);

            let info = self.host.describe(&node);
            let is_root = id == self.root_id;
            let significant = is_root
                || info.as_ref().map(|info| info.element_type()) == Some(ElementType::Class);

            match self.state.pending.take(id) {
                PendingStatus::Cancelled => {
                    tracing::trace!("Mount and unmount of {} cancelled out", id);
                    self.state.release(id);
                    continue;
                }
                PendingStatus::Unmounted => {
                    tracing::trace!("Ignoring unmount of {}: still reachable", id);
                }
                PendingStatus::Mounted | PendingStatus::Clean => {}
            }

            // Anything reachable and significant the remote has not seen yet
            // is added, including nodes mounted before the inspector attached.
            if significant && !self.state.known.contains(&id) {
                if is_root {
                    self.add_root(id);
                } else if let Some(parent_id) = ancestor {
                    let info = info.as_ref();
                    let owner = info.and_then(|info| info.owner.clone());
                    let owner_id = owner.map(|owner| self.state.register(self.host, &owner));
                    self.add_node(NodeRecord {
                        id,
                        element_type: ElementType::Class,
                        parent_id,
                        owner_id,
                        display_name: info.and_then(|info| info.display_name.clone()),
                        key: info.and_then(|info| info.key.clone()),
                    });
                }
            }

            let next_ancestor = if significant { Some(id) } else { ancestor };
            let children = self.host.children(&node);
            stack.extend(children.into_iter().rev().map(|child| (child, next_ancestor)));
        }
    }

    fn add_root(&mut self, id: NodeId) {
        if self.state.known.insert(id) {
            self.state.roots.insert(id);
            self.ops
                .push_add_root(id, self.config.supports_profiling, self.config.owner_metadata);
        }
    }

    fn add_node(&mut self, record: NodeRecord) {
        if self.state.known.insert(record.id) {
            self.ops.push_add_node(&record);
        }
    }

    /// Pending entries of this root the walk never reached
    fn resolve_unvisited(&mut self) {
        for (id, status) in self.state.pending.drain_root(self.root_id) {
            match status {
                PendingStatus::Cancelled => {
                    tracing::trace!("Mount and unmount of {} cancelled out", id);
                    self.state.release(id);
                }
                PendingStatus::Unmounted => {
                    if self.state.known.contains(&id) {
                        self.ops.push_remove(id);
                    }
                    self.state.release(id);
                }
                PendingStatus::Mounted => {
                    if !self.state.known.contains(&id) {
                        self.state.release(id);
                    }
                }
                PendingStatus::Clean => {}
            }
        }
    }
}
