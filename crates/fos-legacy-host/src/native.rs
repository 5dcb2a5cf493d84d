//! Native view table
//!
//! Stand-in for the platform views a host renders into. Tagged views carry
//! the legacy key of the instance that created them; untagged views (created
//! outside the host) only know their parent.

use crate::{InstanceId, NativeId};

/// One platform view
#[derive(Debug, Clone)]
pub struct NativeView {
    pub tag: String,
    pub parent: Option<NativeId>,
    /// Instance that created the view
    pub instance: Option<InstanceId>,
    /// Legacy key stamped on the view
    pub host_key: Option<String>,
    pub attached: bool,
}

#[derive(Debug, Default)]
pub struct NativeTable {
    views: Vec<NativeView>,
}

impl NativeTable {
    pub fn new() -> Self {
        Self { views: Vec::new() }
    }

    pub fn get(&self, id: NativeId) -> Option<&NativeView> {
        self.views.get(id.0 as usize)
    }

    pub fn create(&mut self, view: NativeView) -> NativeId {
        let id = NativeId(self.views.len() as u32);
        self.views.push(view);
        id
    }

    pub fn detach(&mut self, id: NativeId) {
        if let Some(view) = self.views.get_mut(id.0 as usize) {
            view.attached = false;
        }
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Walk up from `id` to the first view created by an instance
    pub fn closest_owned(&self, id: NativeId) -> Option<(NativeId, InstanceId)> {
        let mut current = Some(id);
        while let Some(native) = current {
            let view = self.get(native)?;
            if let Some(instance) = view.instance {
                return Some((native, instance));
            }
            current = view.parent;
        }
        None
    }
}
