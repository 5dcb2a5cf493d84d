//! Host tree seam
//!
//! The inspector never owns the tree it observes. A host exposes its mutation
//! entry points through an [`EntryPoints`] table it calls itself, plus a few
//! read accessors and, depending on its generation, one native lookup service.

use std::cell::RefCell;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use crate::element::{ElementInfo, SourceLocation};
use crate::error::HostLookupError;
use crate::value::Value;

/// Node level entry point (mount, update, unmount)
pub type NodeEntry<N> = Rc<dyn Fn(&N)>;

/// Root render entry point; returns the root node it rendered into
pub type RootEntry<N, R> = Rc<dyn Fn(&R) -> N>;

/// Node level entry point kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryPointKind {
    Mount,
    Update,
    Unmount,
}

impl EntryPointKind {
    pub const ALL: [EntryPointKind; 3] = [Self::Mount, Self::Update, Self::Unmount];
}

/// Hookable entry points of a host.
///
/// The host installs its real implementations here and performs every mount,
/// update, unmount and root render by calling through the table, so whatever
/// is installed at call time runs.
pub struct EntryPoints<N, R> {
    mount: RefCell<Option<NodeEntry<N>>>,
    update: RefCell<Option<NodeEntry<N>>>,
    unmount: RefCell<Option<NodeEntry<N>>>,
    render_root: RefCell<Option<RootEntry<N, R>>>,
    /// Wrappers left in place by an out-of-order restore, with what they wrap
    retired: RefCell<Vec<(EntryPointKind, NodeEntry<N>, NodeEntry<N>)>>,
    retired_roots: RefCell<Vec<(RootEntry<N, R>, RootEntry<N, R>)>>,
}

fn same_entry<T: ?Sized>(a: &Rc<T>, b: &Rc<T>) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

impl<N, R> EntryPoints<N, R> {
    pub fn new() -> Self {
        Self {
            mount: RefCell::new(None),
            update: RefCell::new(None),
            unmount: RefCell::new(None),
            render_root: RefCell::new(None),
            retired: RefCell::new(Vec::new()),
            retired_roots: RefCell::new(Vec::new()),
        }
    }

    fn slot(&self, kind: EntryPointKind) -> &RefCell<Option<NodeEntry<N>>> {
        match kind {
            EntryPointKind::Mount => &self.mount,
            EntryPointKind::Update => &self.update,
            EntryPointKind::Unmount => &self.unmount,
        }
    }

    /// Currently installed entry point
    pub fn get(&self, kind: EntryPointKind) -> Option<NodeEntry<N>> {
        self.slot(kind).borrow().clone()
    }

    /// Install an entry point, returning the previous one
    pub fn set(&self, kind: EntryPointKind, entry: Option<NodeEntry<N>>) -> Option<NodeEntry<N>> {
        self.slot(kind).replace(entry)
    }

    pub fn render_root_entry(&self) -> Option<RootEntry<N, R>> {
        self.render_root.borrow().clone()
    }

    pub fn set_render_root(&self, entry: Option<RootEntry<N, R>>) -> Option<RootEntry<N, R>> {
        self.render_root.replace(entry)
    }

    /// Run the installed entry point; `false` when none is installed
    pub fn call(&self, kind: EntryPointKind, node: &N) -> bool {
        // Clone out first: the entry may reach back into this table.
        let entry = self.get(kind);
        match entry {
            Some(entry) => {
                entry(node);
                true
            }
            None => false,
        }
    }

    pub fn call_render_root(&self, request: &R) -> Option<N> {
        let entry = self.render_root_entry();
        entry.map(|entry| entry(request))
    }

    /// Whether `entry` is the one currently installed for `kind`
    pub(crate) fn is_installed(&self, kind: EntryPointKind, entry: &NodeEntry<N>) -> bool {
        self.slot(kind).borrow().as_ref().is_some_and(|current| same_entry(current, entry))
    }

    pub(crate) fn is_render_root_installed(&self, entry: &RootEntry<N, R>) -> bool {
        self.render_root.borrow().as_ref().is_some_and(|current| same_entry(current, entry))
    }

    /// Remember that `wrapper` stays in a call chain as a pass-through for
    /// `original`
    pub(crate) fn retire(&self, kind: EntryPointKind, wrapper: NodeEntry<N>, original: NodeEntry<N>) {
        self.retired.borrow_mut().push((kind, wrapper, original));
    }

    pub(crate) fn retire_render_root(&self, wrapper: RootEntry<N, R>, original: RootEntry<N, R>) {
        self.retired_roots.borrow_mut().push((wrapper, original));
    }

    /// Follow retired wrappers from `entry` down to the first live entry
    pub(crate) fn skip_retired(&self, kind: EntryPointKind, mut entry: NodeEntry<N>) -> NodeEntry<N> {
        let mut retired = self.retired.borrow_mut();
        while let Some(pos) = retired
            .iter()
            .position(|(k, wrapper, _)| *k == kind && same_entry(wrapper, &entry))
        {
            entry = retired.swap_remove(pos).2;
        }
        entry
    }

    pub(crate) fn skip_retired_render_root(&self, mut entry: RootEntry<N, R>) -> RootEntry<N, R> {
        let mut retired = self.retired_roots.borrow_mut();
        while let Some(pos) = retired.iter().position(|(wrapper, _)| same_entry(wrapper, &entry)) {
            entry = retired.swap_remove(pos).1;
        }
        entry
    }

    /// Whether any entry point is installed
    pub fn any_installed(&self) -> bool {
        EntryPointKind::ALL.iter().any(|&kind| self.slot(kind).borrow().is_some())
            || self.render_root.borrow().is_some()
    }
}

impl<N, R> Default for EntryPoints<N, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N, R> fmt::Debug for EntryPoints<N, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryPoints")
            .field("mount", &self.mount.borrow().is_some())
            .field("update", &self.update.borrow().is_some())
            .field("unmount", &self.unmount.borrow().is_some())
            .field("render_root", &self.render_root.borrow().is_some())
            .finish()
    }
}

/// Container addressed by the state mutation interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
    Props,
    State,
    Context,
}

/// Native tag bookkeeping (native-like hosts)
pub trait NativeTags<N, T> {
    /// Native tag of a node's rendered view
    fn native_tag(&self, node: &N) -> Option<T>;
    /// Host key of the node owning a native tag
    fn host_key_for_tag(&self, tag: &T) -> Option<String>;
}

/// Instance lookup service (mid-generation hosts)
pub trait InstanceTree<N, T> {
    fn native_for_instance(&self, node: &N) -> Option<T>;
    /// Closest host node rendering `native` or one of its ancestors
    fn closest_instance(&self, native: &T) -> Option<N>;
}

/// Getter/setter pair over DOM-like natives (oldest hosts)
pub trait LegacyMount<T> {
    /// Host key stamped on a native, if any
    fn host_key_of(&self, native: &T) -> Option<String>;
    fn native_for_host_key(&self, key: &str) -> Result<T, HostLookupError>;
    fn parent_native(&self, native: &T) -> Option<T>;
}

/// A host component tree the inspector can attach to
pub trait HostRenderer: 'static {
    /// Opaque, identity comparable node handle
    type Node: Clone + Eq + Hash + fmt::Debug + 'static;
    /// Native view handle
    type Native: Clone + fmt::Debug + 'static;
    /// Argument of the root render entry point
    type RootRequest: 'static;

    fn entry_points(&self) -> &EntryPoints<Self::Node, Self::RootRequest>;

    /// Current element of a node; `None` when the node has none
    fn describe(&self, node: &Self::Node) -> Option<ElementInfo<Self::Node>>;
    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;
    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;
    /// Roots currently mounted
    fn roots(&self) -> Vec<Self::Node>;

    /// Host's own string id for a node
    fn host_key(&self, _node: &Self::Node) -> Option<String> {
        None
    }

    fn data(&self, node: &Self::Node, kind: DataKind) -> Option<Value>;
    /// Replace a node's container; `false` if the node cannot hold it
    fn set_data(&self, node: &Self::Node, kind: DataKind, value: Value) -> bool;
    /// Re-render a node through the host's own update path
    fn force_update(&self, node: &Self::Node);

    fn source_location(&self, _node: &Self::Node) -> Option<SourceLocation> {
        None
    }

    fn native_tags(&self) -> Option<&dyn NativeTags<Self::Node, Self::Native>> {
        None
    }

    fn instance_tree(&self) -> Option<&dyn InstanceTree<Self::Node, Self::Native>> {
        None
    }

    fn legacy_mount(&self) -> Option<&dyn LegacyMount<Self::Native>> {
        None
    }
}
