//! Instance arena
//!
//! Every mounted element becomes an instance in one flat vector. Slots are
//! never reused, so an `InstanceId` keeps naming the same instance even after
//! it unmounts.

use fos_inspector::{SourceLocation, Value};

use crate::element::{Component, Element};
use crate::{InstanceId, NativeId};

/// Internal instance of one element
#[derive(Debug)]
pub struct Instance {
    pub component: Component,
    pub key: Option<String>,
    pub props: Value,
    pub state: Option<Value>,
    pub context: Option<Value>,
    pub source: Option<SourceLocation>,
    /// Nearest composite ancestor
    pub owner: Option<InstanceId>,
    pub parent: Option<InstanceId>,
    pub children: Vec<InstanceId>,
    /// Legacy string id, unique per host
    pub host_key: String,
    /// View created for a host component
    pub native: Option<NativeId>,
    pub mounted: bool,
    pub render_count: u32,
    /// Child descriptors not instantiated yet
    pub(crate) template: Vec<Element>,
    next_child: u32,
}

impl Instance {
    fn from_element(element: Element, parent: Option<InstanceId>, owner: Option<InstanceId>, host_key: String) -> Self {
        Self {
            component: element.component,
            key: element.key,
            props: element.props,
            state: element.state,
            context: element.context,
            source: element.source,
            owner,
            parent,
            children: Vec::new(),
            host_key,
            native: None,
            mounted: false,
            render_count: 0,
            template: element.children,
            next_child: 0,
        }
    }

    /// Whether the instance keeps a public instance
    #[inline]
    pub fn has_instance(&self) -> bool {
        matches!(self.component, Component::Class { .. })
    }
}

/// Arena of instances
#[derive(Debug, Default)]
pub struct InstanceArena {
    instances: Vec<Instance>,
}

impl InstanceArena {
    pub fn new() -> Self {
        Self { instances: Vec::new() }
    }

    pub fn get(&self, id: InstanceId) -> Option<&Instance> {
        self.instances.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: InstanceId) -> Option<&mut Instance> {
        self.instances.get_mut(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// New top-level instance
    pub fn create_root(&mut self, element: Element, host_key: String) -> InstanceId {
        self.push(Instance::from_element(element, None, None, host_key))
    }

    /// New instance appended to `parent`'s children
    pub fn create_child(&mut self, parent: InstanceId, element: Element) -> Option<InstanceId> {
        let owner = self.owner_below(parent);
        let host_key = {
            let parent = self.get_mut(parent)?;
            let key = match &element.key {
                Some(key) => format!("{}.${}", parent.host_key, key),
                None => format!("{}.{}", parent.host_key, parent.next_child),
            };
            parent.next_child += 1;
            key
        };
        let id = self.push(Instance::from_element(element, Some(parent), owner, host_key));
        if let Some(parent) = self.get_mut(parent) {
            parent.children.push(id);
        }
        Some(id)
    }

    /// Drop `id` from its parent's child list
    pub fn detach(&mut self, id: InstanceId) {
        let parent = self.get(id).and_then(|instance| instance.parent);
        if let Some(parent) = parent.and_then(|parent| self.get_mut(parent)) {
            parent.children.retain(|&child| child != id);
        }
    }

    /// Owner for a new child of `parent`: the closest composite at or above it
    fn owner_below(&self, parent: InstanceId) -> Option<InstanceId> {
        let mut current = Some(parent);
        while let Some(id) = current {
            let instance = self.get(id)?;
            if instance.component.is_composite() {
                return Some(id);
            }
            current = instance.parent;
        }
        None
    }

    /// Native rendered by `id`: its own, or the first one found below it
    pub fn rendered_native(&self, id: InstanceId) -> Option<NativeId> {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let instance = self.get(current)?;
            if let Some(native) = instance.native {
                return Some(native);
            }
            stack.extend(instance.children.iter().rev().copied());
        }
        None
    }

    /// Mounted instance with the given legacy key
    pub fn find_by_host_key(&self, key: &str) -> Option<InstanceId> {
        self.instances
            .iter()
            .position(|instance| instance.mounted && instance.host_key == key)
            .map(|index| InstanceId(index as u32))
    }

    fn push(&mut self, instance: Instance) -> InstanceId {
        let id = InstanceId(self.instances.len() as u32);
        self.instances.push(instance);
        id
    }
}
