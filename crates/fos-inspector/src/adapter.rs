//! Host Capability Adapter
//!
//! Picks one of the known host API shapes by probing, in priority order, and
//! derives the native <-> id lookups for it. Only the inspection surface uses
//! these; the crawl never does.

use crate::error::UnsupportedHost;
use crate::host::HostRenderer;
use crate::registry::IdRegistry;
use crate::NodeId;

/// Known host API shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum HostShape {
    /// Native tags mapped to root node ids
    Native,
    /// Node <-> instance lookup service
    InstanceTree,
    /// Id getter/setter with parent walk fallback
    LegacyDom,
}

type Probe<H> = fn(&H) -> bool;

/// Ordered probe list; the first matching predicate wins
fn probes<H: HostRenderer>() -> [(Probe<H>, HostShape); 3] {
    [
        (|host: &H| host.native_tags().is_some(), HostShape::Native),
        (|host: &H| host.instance_tree().is_some(), HostShape::InstanceTree),
        (|host: &H| host.legacy_mount().is_some(), HostShape::LegacyDom),
    ]
}

/// Select the host shape
pub fn probe<H: HostRenderer>(host: &H) -> Result<HostShape, UnsupportedHost> {
    probes::<H>()
        .into_iter()
        .find(|(matches, _)| matches(host))
        .map(|(_, shape)| shape)
        .ok_or(UnsupportedHost)
}

/// Outcome of probing, kept for the lifetime of an attach
pub type Capabilities = Result<HostShape, UnsupportedHost>;

/// Native lookup capability record
#[derive(Debug, Clone)]
pub struct NativeLookup {
    shape: Option<HostShape>,
}

impl NativeLookup {
    pub fn new(capabilities: &Capabilities) -> Self {
        Self { shape: capabilities.as_ref().ok().copied() }
    }

    pub fn shape(&self) -> Option<HostShape> {
        self.shape
    }

    /// Registered id of the node rendering `native`
    pub fn native_to_id<H: HostRenderer>(
        &self,
        host: &H,
        registry: &IdRegistry<H::Node>,
        native: &H::Native,
    ) -> Option<NodeId> {
        match self.shape? {
            HostShape::Native => {
                let key = host.native_tags()?.host_key_for_tag(native)?;
                registry.id_for_host_key(&key)
            }
            HostShape::InstanceTree => {
                let node = host.instance_tree()?.closest_instance(native)?;
                registry.id_of(&node)
            }
            HostShape::LegacyDom => {
                let mount = host.legacy_mount()?;
                let mut current = native.clone();
                loop {
                    if let Some(key) = mount.host_key_of(&current) {
                        return registry.id_for_host_key(&key);
                    }
                    current = mount.parent_native(&current)?;
                }
            }
        }
    }

    /// Native view of the node registered under `id`
    pub fn id_to_native<H: HostRenderer>(
        &self,
        host: &H,
        registry: &IdRegistry<H::Node>,
        id: NodeId,
    ) -> Option<H::Native> {
        let shape = self.shape?;
        let node = registry.node_for(id)?;
        match shape {
            HostShape::Native => host.native_tags()?.native_tag(node),
            HostShape::InstanceTree => host.instance_tree()?.native_for_instance(node),
            HostShape::LegacyDom => {
                let key = host.host_key(node)?;
                match host.legacy_mount()?.native_for_host_key(&key) {
                    Ok(native) => Some(native),
                    Err(err) => {
                        tracing::debug!("Native lookup for {} failed: {}", id, err);
                        None
                    }
                }
            }
        }
    }
}
