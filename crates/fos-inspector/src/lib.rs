//! fOS Inspector
//!
//! Component tree inspector backend for fOS DevTools.
//!
//! Attaches to a host component tree whose mutations are only visible through
//! a handful of entry points, and turns those mutations into batches of
//! compact binary tree operations for a remote DevTools frontend.
//!
//! Features:
//! - Stable node ids with recycling
//! - Host shape probing (native, instance tree, legacy DOM)
//! - Entry point interception with clean restore
//! - Pending change tracking with same-batch cancellation
//! - Deferred, per-root batching
//! - Path based props/state/context editing
//!
//! # Example
//! ```rust,ignore
//! use fos_inspector::{DeferredQueue, Inspector, InspectorConfig, RecordingHook};
//!
//! let hook = Rc::new(RecordingHook::new());
//! let queue = Rc::new(DeferredQueue::new());
//! let inspector = Inspector::attach(host, hook.clone(), queue.clone(), InspectorConfig::default())?;
//! // ... mutate the host ...
//! queue.run_until_idle();
//! inspector.detach();
//! ```

mod adapter;
mod agent;
mod config;
mod crawl;
mod element;
mod error;
mod hooks;
mod host;
mod inspect;
mod registry;
mod scheduler;
mod tracker;
mod transport;

pub mod operations;
pub mod value;

pub use adapter::{Capabilities, HostShape, NativeLookup, probe};
pub use agent::Inspector;
pub use config::InspectorConfig;
pub use element::{ElementInfo, ElementKind, ElementType, SourceLocation};
pub use error::{HostLookupError, InspectorError, UnsupportedHost};
pub use hooks::InstalledHooks;
pub use host::{
    DataKind, EntryPointKind, EntryPoints, HostRenderer, InstanceTree, LegacyMount, NativeTags,
    NodeEntry, RootEntry,
};
pub use inspect::InspectedElement;
pub use operations::{NodeRecord, Operation, OperationBatch, OperationBuffer};
pub use registry::IdRegistry;
pub use scheduler::{DeferredQueue, LocalExecutorScheduler, Scheduler, Task, TaskHandle};
pub use tracker::{PendingChanges, PendingStatus};
pub use transport::{DevtoolsHook, HookEvent, RecordingHook};
pub use value::{PathError, PathKey, Value};

/// Inspector version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Process-lifetime node identifier.
///
/// Ids are positive; `0` is reserved on the wire for "no node" (no owner, no
/// parent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Wire sentinel for an absent node
    pub const NONE: u32 = 0;

    /// Build an id from a raw wire value, rejecting the sentinel
    pub fn new(raw: u32) -> Option<Self> {
        (raw != Self::NONE).then_some(Self(raw))
    }

    /// Raw wire value
    #[inline]
    pub fn get(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
