//! Inspector Configuration

use serde::Deserialize;

/// Inspector configuration options
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InspectorConfig {
    /// Renderer id written in every batch header
    pub renderer_id: u32,

    /// Advertise profiling support on Add-Root
    pub supports_profiling: bool,

    /// Advertise owner metadata on Add-Root
    pub owner_metadata: bool,

    /// Report roots already mounted when the inspector attaches
    pub crawl_existing_roots: bool,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            renderer_id: 1,
            supports_profiling: false,
            owner_metadata: true,
            crawl_existing_roots: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: InspectorConfig = serde_json::from_str(r#"{ "renderer_id": 7 }"#).unwrap();
        assert_eq!(config.renderer_id, 7);
        assert!(config.owner_metadata);
        assert!(!config.supports_profiling);
    }
}
