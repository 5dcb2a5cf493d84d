//! Native lookup services
//!
//! One per host generation. The host implements all three; `HostRenderer`
//! only hands out the one matching its generation.

use fos_inspector::{HostLookupError, InstanceTree, LegacyMount, NativeTags};

use crate::host::LegacyHost;
use crate::{InstanceId, NativeId};

impl LegacyHost {
    /// Mounted instance owning `native` or its closest owned ancestor view
    fn owning_instance(&self, native: NativeId) -> Option<InstanceId> {
        let (_, instance) = self.natives.borrow().closest_owned(native)?;
        self.is_mounted(instance).then_some(instance)
    }
}

impl NativeTags<InstanceId, NativeId> for LegacyHost {
    fn native_tag(&self, node: &InstanceId) -> Option<NativeId> {
        self.native_of(*node)
    }

    fn host_key_for_tag(&self, tag: &NativeId) -> Option<String> {
        let instance = self.owning_instance(*tag)?;
        self.arena.borrow().get(instance).map(|instance| instance.host_key.clone())
    }
}

impl InstanceTree<InstanceId, NativeId> for LegacyHost {
    fn native_for_instance(&self, node: &InstanceId) -> Option<NativeId> {
        self.native_of(*node)
    }

    fn closest_instance(&self, native: &NativeId) -> Option<InstanceId> {
        self.owning_instance(*native)
    }
}

impl LegacyMount<NativeId> for LegacyHost {
    fn host_key_of(&self, native: &NativeId) -> Option<String> {
        self.natives.borrow().get(*native)?.host_key.clone()
    }

    fn native_for_host_key(&self, key: &str) -> Result<NativeId, HostLookupError> {
        let instance = self
            .arena
            .borrow()
            .find_by_host_key(key)
            .ok_or_else(|| HostLookupError::UnknownKey(key.to_string()))?;
        self.native_of(instance)
            .filter(|native| self.native(*native).is_some_and(|view| view.attached))
            .ok_or_else(|| HostLookupError::Detached(key.to_string()))
    }

    fn parent_native(&self, native: &NativeId) -> Option<NativeId> {
        self.natives.borrow().get(*native)?.parent
    }
}
