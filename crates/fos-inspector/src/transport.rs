//! Transport seam
//!
//! Everything the inspector reports leaves through a [`DevtoolsHook`]. Delivery
//! is fire-and-forget.

use std::cell::RefCell;

/// Outbound event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookEvent {
    /// One encoded batch: header followed by operations
    Operations(Vec<u32>),
}

impl HookEvent {
    /// Wire event name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Operations(_) => "operations",
        }
    }
}

/// Receiver of inspector events
pub trait DevtoolsHook {
    fn emit(&self, event: HookEvent);
}

/// Hook that keeps every emitted batch
#[derive(Debug, Default)]
pub struct RecordingHook {
    batches: RefCell<Vec<Vec<u32>>>,
}

impl RecordingHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.batches.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.borrow().is_empty()
    }

    /// Drain the recorded batches
    pub fn take(&self) -> Vec<Vec<u32>> {
        std::mem::take(&mut *self.batches.borrow_mut())
    }
}

impl DevtoolsHook for RecordingHook {
    fn emit(&self, event: HookEvent) {
        match event {
            HookEvent::Operations(words) => self.batches.borrow_mut().push(words),
        }
    }
}
