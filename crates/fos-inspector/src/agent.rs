//! Inspector - the attached agent
//!
//! Owns everything an attach creates: the wrapped entry points, the tree
//! bookkeeping and the per-root deferred flushes.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::adapter::{probe, Capabilities, HostShape, NativeLookup};
use crate::config::InspectorConfig;
use crate::crawl::{self, top_of_chain, TreeState};
use crate::element::SourceLocation;
use crate::error::InspectorError;
use crate::hooks::{InstalledHooks, NodeCallback, RootCallback};
use crate::host::{DataKind, EntryPointKind, HostRenderer};
use crate::inspect::{json_or_null, InspectedElement};
use crate::scheduler::{Scheduler, TaskHandle};
use crate::transport::{DevtoolsHook, HookEvent};
use crate::value::{with_value_at, PathKey, Value};
use crate::NodeId;

/// Component tree inspector attached to one host.
///
/// Dropping the inspector detaches it.
pub struct Inspector<H: HostRenderer> {
    shared: Rc<Shared<H>>,
}

struct Shared<H: HostRenderer> {
    host: Rc<H>,
    hook: Rc<dyn DevtoolsHook>,
    scheduler: Rc<dyn Scheduler>,
    config: InspectorConfig,
    capabilities: Capabilities,
    lookup: NativeLookup,
    attached: Cell<bool>,
    hooks: RefCell<Option<InstalledHooks<H::Node, H::RootRequest>>>,
    state: RefCell<AgentState<H::Node>>,
}

struct AgentState<N> {
    tree: TreeState<N>,
    /// At most one scheduled flush per root
    flushes: HashMap<NodeId, TaskHandle>,
    selected: Option<NodeId>,
    view_source: Option<SourceLocation>,
}

impl<H: HostRenderer> Inspector<H> {
    /// Attach to `host`: probe its shape, wrap its entry points and, if
    /// configured, report the roots it already has.
    pub fn attach(
        host: Rc<H>,
        hook: Rc<dyn DevtoolsHook>,
        scheduler: Rc<dyn Scheduler>,
        config: InspectorConfig,
    ) -> Result<Self, InspectorError> {
        if !host.entry_points().any_installed() {
            return Err(InspectorError::NothingToIntercept);
        }

        let capabilities = probe(&*host);
        match &capabilities {
            Ok(shape) => tracing::info!("Attaching inspector {} to {:?} host", crate::VERSION, shape),
            Err(err) => tracing::warn!("{}; native lookups disabled", err),
        }

        let shared = Rc::new(Shared {
            lookup: NativeLookup::new(&capabilities),
            capabilities,
            host,
            hook,
            scheduler,
            config,
            attached: Cell::new(true),
            hooks: RefCell::new(None),
            state: RefCell::new(AgentState {
                tree: TreeState::new(),
                flushes: HashMap::new(),
                selected: None,
                view_source: None,
            }),
        });

        let weak = Rc::downgrade(&shared);
        let on_node: NodeCallback<H::Node> = Rc::new(move |kind: EntryPointKind, node: &H::Node| {
            if let Some(shared) = weak.upgrade() {
                shared.on_entry(kind, node);
            }
        });
        let weak = Rc::downgrade(&shared);
        let on_render_root: RootCallback<H::Node, H::RootRequest> =
            Rc::new(move |_request: &H::RootRequest, root: &H::Node| {
                if let Some(shared) = weak.upgrade() {
                    shared.on_render_root(root);
                }
            });

        let installed = InstalledHooks::install(shared.host.entry_points(), on_node, on_render_root);
        tracing::debug!(
            "Wrapped entry points {:?} (render root: {})",
            installed.wrapped(),
            installed.wraps_render_root()
        );
        *shared.hooks.borrow_mut() = Some(installed);

        if shared.config.crawl_existing_roots {
            shared.report_existing_roots();
        }

        Ok(Self { shared })
    }

    /// Restore the host's entry points and drop outstanding flushes.
    /// Calling it again does nothing.
    pub fn detach(&self) {
        let shared = &self.shared;
        if !shared.attached.replace(false) {
            return;
        }

        let installed = shared.hooks.borrow_mut().take();
        if let Some(installed) = installed {
            installed.restore(shared.host.entry_points());
        }

        let handles: Vec<TaskHandle> = {
            let mut state = shared.state.borrow_mut();
            state.tree = TreeState::new();
            state.selected = None;
            state.view_source = None;
            state.flushes.drain().map(|(_, handle)| handle).collect()
        };
        for handle in handles {
            shared.scheduler.cancel(handle);
        }
        tracing::info!("Inspector detached");
    }

    pub fn is_attached(&self) -> bool {
        self.shared.attached.get()
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.shared.capabilities
    }

    pub fn host_shape(&self) -> Option<HostShape> {
        self.shared.lookup.shape()
    }

    pub fn config(&self) -> &InspectorConfig {
        &self.shared.config
    }

    pub fn host(&self) -> &Rc<H> {
        &self.shared.host
    }

    /// Registered id of `node`
    pub fn id_of(&self, node: &H::Node) -> Option<NodeId> {
        self.shared.state.borrow().tree.registry.id_of(node)
    }

    /// Node registered under `id`
    pub fn node_for(&self, id: NodeId) -> Option<H::Node> {
        self.shared.node(id)
    }

    /// Ids of attached roots, ascending
    pub fn roots(&self) -> Vec<NodeId> {
        let state = self.shared.state.borrow();
        let mut roots: Vec<NodeId> = state.tree.roots.iter().copied().collect();
        roots.sort_unstable();
        roots
    }

    /// Roots with a flush scheduled
    pub fn scheduled_flushes(&self) -> usize {
        self.shared.state.borrow().flushes.len()
    }

    // === State mutation ===

    /// Set a value inside a node's props and re-render it. Stale ids, empty
    /// paths and paths that do not fit the current value are ignored.
    pub fn set_in_props(&self, id: NodeId, path: &[PathKey], value: Value) -> bool {
        self.shared.set_in(id, DataKind::Props, path, value)
    }

    pub fn set_in_state(&self, id: NodeId, path: &[PathKey], value: Value) -> bool {
        self.shared.set_in(id, DataKind::State, path, value)
    }

    pub fn set_in_context(&self, id: NodeId, path: &[PathKey], value: Value) -> bool {
        self.shared.set_in(id, DataKind::Context, path, value)
    }

    // === Inspection ===

    pub fn inspect_element(&self, id: NodeId) -> Option<InspectedElement> {
        let state = self.shared.state.borrow();
        let is_root = state.tree.roots.contains(&id);
        InspectedElement::collect(&*self.shared.host, &state.tree.registry, id, is_root)
    }

    /// Mark `id` as the selected element; `false` for unknown ids
    pub fn select_element(&self, id: NodeId) -> bool {
        let mut state = self.shared.state.borrow_mut();
        if !state.tree.registry.contains(id) {
            return false;
        }
        state.selected = Some(id);
        true
    }

    pub fn selected_element(&self) -> Option<NodeId> {
        self.shared.state.borrow().selected
    }

    /// Log an element's containers to the console log target
    pub fn log_element_to_console(&self, id: NodeId) -> bool {
        let Some(element) = self.inspect_element(id) else {
            tracing::debug!("Nothing to log for stale id {}", id);
            return false;
        };
        let native = self.get_native_from_internal(id);
        tracing::info!(
            target: "fos_inspector::console",
            props = %json_or_null(element.props.as_ref()),
            state = %json_or_null(element.state.as_ref()),
            context = %json_or_null(element.context.as_ref()),
            native = ?native,
            "{}",
            element
        );
        true
    }

    /// Remember where an element is defined so the frontend can open it
    pub fn prepare_view_element_source(&self, id: NodeId) -> Option<SourceLocation> {
        let node = self.shared.node(id)?;
        let source = self.shared.host.source_location(&node);
        self.shared.state.borrow_mut().view_source = source.clone();
        source
    }

    /// Location stored by the last `prepare_view_element_source`
    pub fn view_source_target(&self) -> Option<SourceLocation> {
        self.shared.state.borrow().view_source.clone()
    }

    /// Native view of a registered node, if the host shape supports it
    pub fn get_native_from_internal(&self, id: NodeId) -> Option<H::Native> {
        let state = self.shared.state.borrow();
        self.shared
            .lookup
            .id_to_native(&*self.shared.host, &state.tree.registry, id)
    }

    /// Registered id of the node rendering `native`
    pub fn get_internal_id_from_native(&self, native: &H::Native) -> Option<NodeId> {
        let state = self.shared.state.borrow();
        self.shared
            .lookup
            .native_to_id(&*self.shared.host, &state.tree.registry, native)
    }
}

impl<H: HostRenderer> Drop for Inspector<H> {
    fn drop(&mut self) {
        self.detach();
    }
}

impl<H: HostRenderer> std::fmt::Debug for Inspector<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.borrow();
        f.debug_struct("Inspector")
            .field("attached", &self.shared.attached.get())
            .field("capabilities", &self.shared.capabilities)
            .field("nodes", &state.tree.registry.len())
            .field("roots", &state.tree.roots.len())
            .field("scheduled_flushes", &state.flushes.len())
            .finish()
    }
}

impl<H: HostRenderer> Shared<H> {
    fn node(&self, id: NodeId) -> Option<H::Node> {
        self.state.borrow().tree.registry.node_for(id).cloned()
    }

    fn on_entry(self: &Rc<Self>, kind: EntryPointKind, node: &H::Node) {
        if !self.attached.get() {
            return;
        }
        match kind {
            EntryPointKind::Mount => self.on_mount(node),
            EntryPointKind::Update => self.on_update(node),
            EntryPointKind::Unmount => self.on_unmount(node),
        }
    }

    fn on_mount(self: &Rc<Self>, node: &H::Node) {
        let root = {
            let mut state = self.state.borrow_mut();
            let tree = &mut state.tree;
            let top = top_of_chain(&*self.host, node);
            let root = tree.register(&*self.host, &top);
            let id = tree.register(&*self.host, node);
            tree.node_roots.insert(id, root);
            tree.pending.record_mount(id, root);
            tracing::trace!("Mounted {} under root {}", id, root);
            root
        };
        self.schedule_flush(root);
    }

    fn on_update(self: &Rc<Self>, node: &H::Node) {
        let root = self.state.borrow_mut().tree.root_for(&*self.host, node);
        self.schedule_flush(root);
    }

    fn on_unmount(self: &Rc<Self>, node: &H::Node) {
        let root = {
            let mut state = self.state.borrow_mut();
            let tree = &mut state.tree;
            let Some(id) = tree.registry.id_of(node) else {
                tracing::trace!("Ignoring unmount of unregistered node {:?}", node);
                return;
            };
            let root = tree.root_for(&*self.host, node);
            tree.pending.record_unmount(id, root);
            tracing::trace!("Unmounted {} under root {}", id, root);
            root
        };
        self.schedule_flush(root);
    }

    /// A root render finished: flush it right away, superseding any
    /// scheduled flush of the same root
    fn on_render_root(self: &Rc<Self>, root: &H::Node) {
        if !self.attached.get() {
            return;
        }
        if self.host.parent(root).is_some() || !self.host.roots().contains(root) {
            tracing::debug!("Root render returned {:?}, which is not a mounted root", root);
            return;
        }
        let (id, scheduled) = {
            let mut state = self.state.borrow_mut();
            let id = state.tree.register(&*self.host, root);
            state.tree.node_roots.insert(id, id);
            if state.tree.roots.insert(id) {
                state.tree.pending.record_mount(id, id);
            }
            (id, state.flushes.remove(&id))
        };
        if let Some(handle) = scheduled {
            self.scheduler.cancel(handle);
        }
        self.flush(id);
    }

    fn schedule_flush(self: &Rc<Self>, root: NodeId) {
        if !self.attached.get() || self.state.borrow().flushes.contains_key(&root) {
            return;
        }
        let weak: Weak<Self> = Rc::downgrade(self);
        let handle = self.scheduler.schedule(Box::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.run_scheduled_flush(root);
            }
        }));
        self.state.borrow_mut().flushes.insert(root, handle);
    }

    fn run_scheduled_flush(&self, root: NodeId) {
        if !self.attached.get() {
            tracing::trace!("Scheduled flush of {} fired after detach", root);
            return;
        }
        let claimed = self.state.borrow_mut().flushes.remove(&root).is_some();
        if claimed {
            self.flush(root);
        }
    }

    fn flush(&self, root: NodeId) {
        let words = {
            let mut state = self.state.borrow_mut();
            let ops = crawl::flush_root(&*self.host, &mut state.tree, &self.config, root);
            tracing::debug!("Flushing root {}: {} operations", root, ops.operation_count());
            ops.finish(self.config.renderer_id, root)
        };
        self.hook.emit(HookEvent::Operations(words));
    }

    /// Register every node under the host's current roots as freshly mounted
    /// and flush each root
    fn report_existing_roots(&self) {
        let roots = self.host.roots();
        if roots.is_empty() {
            return;
        }

        let ids: Vec<NodeId> = {
            let mut state = self.state.borrow_mut();
            let tree = &mut state.tree;
            roots
                .into_iter()
                .map(|root| {
                    let root_id = tree.register(&*self.host, &root);
                    tree.roots.insert(root_id);
                    let mut stack = vec![root];
                    while let Some(node) = stack.pop() {
                        let id = tree.register(&*self.host, &node);
                        tree.node_roots.insert(id, root_id);
                        tree.pending.record_mount(id, root_id);
                        stack.extend(self.host.children(&node));
                    }
                    root_id
                })
                .collect()
        };

        tracing::info!("Reporting {} existing root(s)", ids.len());
        for id in ids {
            self.flush(id);
        }
    }

    fn set_in(&self, id: NodeId, kind: DataKind, path: &[PathKey], value: Value) -> bool {
        if !self.attached.get() || path.is_empty() {
            return false;
        }
        let Some(node) = self.node(id) else {
            tracing::debug!("Ignoring {:?} edit for stale id {}", kind, id);
            return false;
        };
        let Some(current) = self.host.data(&node, kind) else {
            tracing::debug!("{} has no {:?} to edit", id, kind);
            return false;
        };

        let next = match with_value_at(&current, path, value) {
            Ok(next) => next,
            Err(err) => {
                tracing::warn!("Rejected {:?} edit on {}: {}", kind, id, err);
                return false;
            }
        };
        if !self.host.set_data(&node, kind, next) {
            return false;
        }
        self.host.force_update(&node);
        true
    }
}
