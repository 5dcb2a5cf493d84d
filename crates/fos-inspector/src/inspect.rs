//! Element inspection
//!
//! Snapshot of one registered node for the inspection surface: what the
//! frontend shows in its side panel and what gets logged to the console.

use std::fmt;

use serde::Serialize;

use crate::element::{ElementKind, ElementType, SourceLocation};
use crate::host::{DataKind, HostRenderer};
use crate::registry::IdRegistry;
use crate::value::Value;
use crate::NodeId;

/// Inspected element
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectedElement {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub element_type: ElementType,
    pub display_name: Option<String>,
    pub key: Option<String>,
    pub owner_id: Option<NodeId>,
    pub props: Option<Value>,
    pub state: Option<Value>,
    pub context: Option<Value>,
    /// Whether edits through the state mutation interface can land
    pub can_edit_values: bool,
    pub source: Option<SourceLocation>,
}

impl InspectedElement {
    pub(crate) fn collect<H: HostRenderer>(
        host: &H,
        registry: &IdRegistry<H::Node>,
        id: NodeId,
        is_root: bool,
    ) -> Option<Self> {
        let node = registry.node_for(id)?;
        let info = host.describe(node);

        let element_type = if is_root {
            ElementType::Root
        } else {
            ElementType::classify(info.as_ref().map(|info| info.kind))
        };
        let can_edit_values = matches!(
            info.as_ref().map(|info| info.kind),
            Some(ElementKind::Composite { has_instance: true })
        );
        let (display_name, key, owner_id) = match info {
            Some(info) => (
                info.display_name,
                info.key,
                info.owner.and_then(|owner| registry.id_of(&owner)),
            ),
            None => (None, None, None),
        };

        Some(Self {
            id,
            element_type,
            display_name,
            key,
            owner_id,
            props: host.data(node, DataKind::Props),
            state: host.data(node, DataKind::State),
            context: host.data(node, DataKind::Context),
            can_edit_values,
            source: host.source_location(node),
        })
    }

    /// Name shown in the tree, `Unknown` when the element has none
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or("Unknown")
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for InspectedElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.name())?;
        if let Some(key) = &self.key {
            write!(f, " key={:?}", key)?;
        }
        write!(f, " /> {}", self.id)
    }
}

/// Compact JSON of an optional container for log lines
pub(crate) fn json_or_null(value: Option<&Value>) -> String {
    value
        .and_then(|value| serde_json::to_string(value).ok())
        .unwrap_or_else(|| "null".to_string())
}
