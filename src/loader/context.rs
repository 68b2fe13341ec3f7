//! Package Context Slot
//!
//! The native initializer ABI reads a single process-wide "current package"
//! marker to decide what logical name it is registering under. This module
//! owns that slot and hands out scoped, save/restore guards around it.
//!
//! The slot is deliberately a service object rather than a hidden global so
//! tests and embedders can inject their own instance; `PackageContext::global`
//! mirrors the single process-global slot of the underlying ABI.

use std::cell::RefCell;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

static GLOBAL: Lazy<Arc<PackageContext>> = Lazy::new(|| Arc::new(PackageContext::new()));

/// Process-wide "current package" marker.
///
/// A `ReentrantMutex` backs the slot: managed loads from different threads
/// serialize around the whole enter/invoke/exit bracket, while an initializer
/// that loads another native library on the same thread may legally nest.
pub struct PackageContext {
    slot: ReentrantMutex<RefCell<Option<String>>>,
}

impl PackageContext {
    /// Create a standalone context slot (tests, embedders with their own ABI).
    pub fn new() -> Self {
        Self {
            slot: ReentrantMutex::new(RefCell::new(None)),
        }
    }

    /// The default process-wide slot.
    pub fn global() -> Arc<PackageContext> {
        Arc::clone(&GLOBAL)
    }

    /// Read the slot's current value.
    pub fn current(&self) -> Option<String> {
        self.slot.lock().borrow().clone()
    }

    /// Install `name` in the slot for the lifetime of the returned guard.
    ///
    /// The guard records the value it observed on entry and restores it when
    /// dropped, on every exit path. Guards nest like a stack: each restores
    /// only what it saw. The underlying lock is held until the guard drops,
    /// so the entire bracket is a critical section.
    pub fn scoped(&self, name: &str) -> PackageContextGuard<'_> {
        let lock = self.slot.lock();
        let previous = lock.borrow_mut().replace(name.to_string());
        PackageContextGuard { lock, previous }
    }
}

impl Default for PackageContext {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard over a scoped package-context write.
pub struct PackageContextGuard<'a> {
    lock: ReentrantMutexGuard<'a, RefCell<Option<String>>>,
    previous: Option<String>,
}

impl Drop for PackageContextGuard<'_> {
    fn drop(&mut self) {
        *self.lock.borrow_mut() = self.previous.take();
    }
}
