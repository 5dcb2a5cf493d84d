//! Legacy host
//!
//! The real mount, update, unmount and root render implementations live in
//! the host's entry point table. Nested work (mounting children, unmounting a
//! subtree) calls back through the table, so whatever is installed there at
//! call time sees every node.

use std::cell::{Cell, Ref, RefCell};
use std::rc::{Rc, Weak};

use fos_inspector::{
    DataKind, ElementInfo, ElementKind, EntryPointKind, EntryPoints, HostRenderer, InstanceTree,
    LegacyMount, NativeTags, SourceLocation, Value,
};

use crate::arena::{Instance, InstanceArena};
use crate::element::{Component, Element};
use crate::error::HostError;
use crate::native::{NativeTable, NativeView};
use crate::{InstanceId, NativeId};

/// Host API generation; decides which native lookup service is exposed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generation {
    /// Native tag registry
    Native,
    /// Instance <-> native lookup service
    InstanceTree,
    /// Key getter/setter over DOM-like views
    LegacyDom,
    /// None of the above
    Unknown,
}

/// Argument of the root render entry point
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub element: Element,
    pub container: String,
}

/// In-memory legacy component host
pub struct LegacyHost {
    generation: Generation,
    entry_points: EntryPoints<InstanceId, RenderRequest>,
    pub(crate) arena: RefCell<InstanceArena>,
    pub(crate) natives: RefCell<NativeTable>,
    containers: RefCell<Vec<(String, InstanceId)>>,
    next_root: Cell<u32>,
}

impl LegacyHost {
    /// Create a host with its real entry points installed
    pub fn new(generation: Generation) -> Rc<Self> {
        Rc::new_cyclic(|weak: &Weak<Self>| {
            let entry_points = EntryPoints::new();

            let host = weak.clone();
            entry_points.set(
                EntryPointKind::Mount,
                Some(Rc::new(move |id: &InstanceId| {
                    if let Some(host) = host.upgrade() {
                        host.mount_instance(*id);
                    }
                })),
            );
            let host = weak.clone();
            entry_points.set(
                EntryPointKind::Update,
                Some(Rc::new(move |id: &InstanceId| {
                    if let Some(host) = host.upgrade() {
                        host.update_instance(*id);
                    }
                })),
            );
            let host = weak.clone();
            entry_points.set(
                EntryPointKind::Unmount,
                Some(Rc::new(move |id: &InstanceId| {
                    if let Some(host) = host.upgrade() {
                        host.unmount_instance(*id);
                    }
                })),
            );
            let host = weak.clone();
            entry_points.set_render_root(Some(Rc::new(move |request: &RenderRequest| {
                host.upgrade()
                    .map(|host| host.render_instance(request))
                    .unwrap_or(InstanceId::NONE)
            })));

            Self {
                generation,
                entry_points,
                arena: RefCell::new(InstanceArena::new()),
                natives: RefCell::new(NativeTable::new()),
                containers: RefCell::new(Vec::new()),
                next_root: Cell::new(0),
            }
        })
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    // === Public mutation API ===

    /// Render `element` as the root of `container`, replacing any previous root
    pub fn render(&self, element: Element, container: &str) -> Result<InstanceId, HostError> {
        let request = RenderRequest {
            element,
            container: container.to_string(),
        };
        self.entry_points
            .call_render_root(&request)
            .filter(|root| root.is_valid())
            .ok_or(HostError::MissingEntryPoint("render root"))
    }

    /// Mount `element` as the last child of `parent`
    pub fn mount_child(&self, parent: InstanceId, element: Element) -> Result<InstanceId, HostError> {
        self.ensure_mounted(parent)?;
        let child = self
            .arena
            .borrow_mut()
            .create_child(parent, element)
            .ok_or(HostError::UnknownInstance(parent))?;
        if !self.entry_points.call(EntryPointKind::Mount, &child) {
            self.arena.borrow_mut().detach(child);
            return Err(HostError::MissingEntryPoint("mount"));
        }
        Ok(child)
    }

    /// Re-render a mounted instance
    pub fn update(&self, id: InstanceId) -> Result<(), HostError> {
        self.ensure_mounted(id)?;
        if !self.entry_points.call(EntryPointKind::Update, &id) {
            return Err(HostError::MissingEntryPoint("update"));
        }
        Ok(())
    }

    /// Unmount an instance and its subtree
    pub fn unmount(&self, id: InstanceId) -> Result<(), HostError> {
        self.ensure_mounted(id)?;
        if !self.entry_points.call(EntryPointKind::Unmount, &id) {
            return Err(HostError::MissingEntryPoint("unmount"));
        }
        self.containers.borrow_mut().retain(|(_, root)| *root != id);
        Ok(())
    }

    /// Unmount whatever is rendered into `container`
    pub fn unmount_root(&self, container: &str) -> Result<(), HostError> {
        let root = self.root_of(container).ok_or_else(|| HostError::NoRoot(container.to_string()))?;
        self.unmount(root)
    }

    /// Set a class instance's state and re-render it
    pub fn set_state(&self, id: InstanceId, state: Value) -> Result<(), HostError> {
        if !self.set_data(&id, DataKind::State, state) {
            return Err(HostError::UnknownInstance(id));
        }
        self.update(id)
    }

    // === Queries ===

    pub fn instance(&self, id: InstanceId) -> Option<Ref<'_, Instance>> {
        Ref::filter_map(self.arena.borrow(), |arena| arena.get(id)).ok()
    }

    pub fn is_mounted(&self, id: InstanceId) -> bool {
        self.instance(id).is_some_and(|instance| instance.mounted)
    }

    pub fn render_count(&self, id: InstanceId) -> u32 {
        self.instance(id).map_or(0, |instance| instance.render_count)
    }

    pub fn root_of(&self, container: &str) -> Option<InstanceId> {
        self.containers
            .borrow()
            .iter()
            .find(|(name, _)| name == container)
            .map(|(_, root)| *root)
    }

    /// Native view rendered by an instance
    pub fn native_of(&self, id: InstanceId) -> Option<NativeId> {
        self.arena.borrow().rendered_native(id)
    }

    pub fn native(&self, id: NativeId) -> Option<NativeView> {
        self.natives.borrow().get(id).cloned()
    }

    /// View created outside the host under `parent`, carrying no key
    pub fn create_untagged_native(&self, parent: NativeId, tag: &str) -> NativeId {
        self.natives.borrow_mut().create(NativeView {
            tag: tag.to_string(),
            parent: Some(parent),
            instance: None,
            host_key: None,
            attached: true,
        })
    }

    fn ensure_mounted(&self, id: InstanceId) -> Result<(), HostError> {
        match self.instance(id) {
            Some(instance) if instance.mounted => Ok(()),
            Some(_) => Err(HostError::NotMounted(id)),
            None => Err(HostError::UnknownInstance(id)),
        }
    }

    // === Real entry point implementations ===

    fn mount_instance(&self, id: InstanceId) {
        let (template, view) = {
            let mut arena = self.arena.borrow_mut();
            let Some(instance) = arena.get_mut(id) else {
                tracing::warn!("Mount of unknown instance {}", id);
                return;
            };
            if instance.mounted {
                tracing::debug!("Instance {} already mounted", id);
                return;
            }
            instance.mounted = true;
            instance.render_count += 1;
            let template = std::mem::take(&mut instance.template);
            let view = match &instance.component {
                Component::Host { tag } => Some((tag.clone(), instance.host_key.clone(), instance.parent)),
                _ => None,
            };
            (template, view)
        };

        if let Some((tag, host_key, parent)) = view {
            let parent_native = parent.and_then(|parent| self.closest_native(parent));
            let native = self.natives.borrow_mut().create(NativeView {
                tag,
                parent: parent_native,
                instance: Some(id),
                host_key: Some(host_key),
                attached: true,
            });
            if let Some(instance) = self.arena.borrow_mut().get_mut(id) {
                instance.native = Some(native);
            }
        }
        tracing::trace!("Mounted instance {}", id);

        for element in template {
            let child = self.arena.borrow_mut().create_child(id, element);
            if let Some(child) = child {
                self.entry_points.call(EntryPointKind::Mount, &child);
            }
        }
    }

    fn update_instance(&self, id: InstanceId) {
        let mut arena = self.arena.borrow_mut();
        match arena.get_mut(id) {
            Some(instance) if instance.mounted => {
                instance.render_count += 1;
                tracing::trace!("Updated instance {}", id);
            }
            _ => tracing::debug!("Update of unmounted instance {}", id),
        }
    }

    fn unmount_instance(&self, id: InstanceId) {
        let children = match self.instance(id) {
            Some(instance) if instance.mounted => instance.children.clone(),
            _ => {
                tracing::debug!("Unmount of unmounted instance {}", id);
                return;
            }
        };
        for child in children {
            self.entry_points.call(EntryPointKind::Unmount, &child);
        }

        let native = {
            let mut arena = self.arena.borrow_mut();
            arena.detach(id);
            arena.get_mut(id).and_then(|instance| {
                instance.mounted = false;
                instance.native.take()
            })
        };
        if let Some(native) = native {
            self.natives.borrow_mut().detach(native);
        }
        tracing::trace!("Unmounted instance {}", id);
    }

    fn render_instance(&self, request: &RenderRequest) -> InstanceId {
        if let Some(previous) = self.root_of(&request.container) {
            tracing::debug!("Replacing root {} of {:?}", previous, request.container);
            self.entry_points.call(EntryPointKind::Unmount, &previous);
            self.containers
                .borrow_mut()
                .retain(|(name, _)| *name != request.container);
        }

        let index = self.next_root.get();
        self.next_root.set(index + 1);
        let root = self
            .arena
            .borrow_mut()
            .create_root(request.element.clone(), format!(".{}", index));
        self.containers
            .borrow_mut()
            .push((request.container.clone(), root));
        self.entry_points.call(EntryPointKind::Mount, &root);
        tracing::debug!("Rendered root {} into {:?}", root, request.container);
        root
    }

    /// Native of `id` or of its closest ancestor that has one
    fn closest_native(&self, id: InstanceId) -> Option<NativeId> {
        let arena = self.arena.borrow();
        let mut current = Some(id);
        while let Some(instance) = current.and_then(|id| arena.get(id)) {
            if instance.native.is_some() {
                return instance.native;
            }
            current = instance.parent;
        }
        None
    }
}

impl std::fmt::Debug for LegacyHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacyHost")
            .field("generation", &self.generation)
            .field("instances", &self.arena.borrow().len())
            .field("natives", &self.natives.borrow().len())
            .field("roots", &self.containers.borrow().len())
            .finish()
    }
}

impl HostRenderer for LegacyHost {
    type Node = InstanceId;
    type Native = NativeId;
    type RootRequest = RenderRequest;

    fn entry_points(&self) -> &EntryPoints<InstanceId, RenderRequest> {
        &self.entry_points
    }

    fn describe(&self, node: &InstanceId) -> Option<ElementInfo<InstanceId>> {
        let instance = self.instance(*node)?;
        let kind = match &instance.component {
            Component::Class { .. } => ElementKind::Composite { has_instance: true },
            Component::Function { .. } => ElementKind::Composite { has_instance: false },
            Component::Host { .. } => ElementKind::Host,
            Component::Text(_) => ElementKind::Other,
            Component::Empty => return None,
        };
        Some(ElementInfo {
            kind,
            display_name: instance.component.display_name().map(str::to_string),
            key: instance.key.clone(),
            owner: instance.owner,
        })
    }

    fn parent(&self, node: &InstanceId) -> Option<InstanceId> {
        self.instance(*node)?.parent
    }

    fn children(&self, node: &InstanceId) -> Vec<InstanceId> {
        self.instance(*node)
            .map(|instance| instance.children.clone())
            .unwrap_or_default()
    }

    fn roots(&self) -> Vec<InstanceId> {
        let roots: Vec<InstanceId> = self.containers.borrow().iter().map(|(_, root)| *root).collect();
        roots.into_iter().filter(|root| self.is_mounted(*root)).collect()
    }

    fn host_key(&self, node: &InstanceId) -> Option<String> {
        self.instance(*node).map(|instance| instance.host_key.clone())
    }

    fn data(&self, node: &InstanceId, kind: DataKind) -> Option<Value> {
        let instance = self.instance(*node)?;
        match kind {
            DataKind::Props => match instance.component {
                Component::Text(_) | Component::Empty => None,
                _ => Some(instance.props.clone()),
            },
            DataKind::State => instance.state.clone(),
            DataKind::Context => instance.context.clone(),
        }
    }

    fn set_data(&self, node: &InstanceId, kind: DataKind, value: Value) -> bool {
        let mut arena = self.arena.borrow_mut();
        let Some(instance) = arena.get_mut(*node) else {
            return false;
        };
        match kind {
            DataKind::Props if !matches!(instance.component, Component::Text(_) | Component::Empty) => {
                instance.props = value;
                true
            }
            DataKind::State if instance.has_instance() => {
                instance.state = Some(value);
                true
            }
            DataKind::Context if instance.component.is_composite() => {
                instance.context = Some(value);
                true
            }
            _ => false,
        }
    }

    fn force_update(&self, node: &InstanceId) {
        if let Err(err) = self.update(*node) {
            tracing::debug!("Forced update skipped: {}", err);
        }
    }

    fn source_location(&self, node: &InstanceId) -> Option<SourceLocation> {
        self.instance(*node)?.source.clone()
    }

    fn native_tags(&self) -> Option<&dyn NativeTags<InstanceId, NativeId>> {
        (self.generation == Generation::Native).then_some(self as &dyn NativeTags<InstanceId, NativeId>)
    }

    fn instance_tree(&self) -> Option<&dyn InstanceTree<InstanceId, NativeId>> {
        (self.generation == Generation::InstanceTree).then_some(self as &dyn InstanceTree<InstanceId, NativeId>)
    }

    fn legacy_mount(&self) -> Option<&dyn LegacyMount<NativeId>> {
        (self.generation == Generation::LegacyDom).then_some(self as &dyn LegacyMount<NativeId>)
    }
}
