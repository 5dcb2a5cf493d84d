//! fOS Legacy Host
//!
//! In-memory component host with the entry point layout of the legacy
//! component runtimes the fOS inspector attaches to.
//!
//! The host owns an arena of instances and a table of native views. All
//! mutations go through its [`EntryPoints`](fos_inspector::EntryPoints) table,
//! so an attached inspector observes every mount, update, unmount and root
//! render. Which native lookup service the host exposes depends on its
//! [`Generation`].

mod arena;
mod element;
mod error;
mod host;
mod lookup;
mod native;

pub use arena::{Instance, InstanceArena};
pub use element::{Component, Element};
pub use error::HostError;
pub use host::{Generation, LegacyHost, RenderRequest};
pub use native::{NativeTable, NativeView};

/// Instance identifier (index into the arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceId(pub(crate) u32);

impl InstanceId {
    /// Returned by a root render that could not run
    pub const NONE: InstanceId = InstanceId(u32::MAX);

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::NONE
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "i{}", self.0)
    }
}

/// Native view identifier (index into the native table)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NativeId(pub(crate) u32);

impl NativeId {
    /// Raw native tag
    #[inline]
    pub fn tag(self) -> u32 {
        self.0
    }
}
