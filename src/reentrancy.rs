//! Debug-only reentrancy guard.
//!
//! The map calls into user code (key `Eq`, the hash strategy, value
//! constructors) in the middle of lookups and inserts. In debug builds every
//! guarded section records which operation holds the map, and a nested entry
//! from that user code panics naming both. In release builds this is a zero-sized no-op.

use core::cell::Cell;
use core::marker::PhantomData;

/// Per-instance tracker. Guard sections that run user code with
/// `let _g = self.reentrancy.enter("op");`.
#[derive(Debug, Default)]
pub(crate) struct DebugReentrancy {
    #[cfg(debug_assertions)]
    active: Cell<Option<&'static str>>,
    // Keeps the owner !Sync even in release builds.
    _nosync: PhantomData<Cell<()>>,
}

impl DebugReentrancy {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            active: Cell::new(None),
            _nosync: PhantomData,
        }
    }

    /// Enter the guarded section for `op`. Panics in debug builds if another
    /// operation is already inside.
    #[inline]
    pub(crate) fn enter(&self, op: &'static str) -> ReentrancyGuard<'_> {
        #[cfg(debug_assertions)]
        {
            if let Some(outer) = self.active.get() {
                panic!("reentrant call into LinearHashMap::{op} while {outer} is in progress");
            }
            self.active.set(Some(op));
            return ReentrancyGuard { owner: self };
        }

        #[cfg(not(debug_assertions))]
        {
            let _ = op;
            return ReentrancyGuard { _z: PhantomData };
        }
    }

    /// Name of the operation currently inside, if any. Always `None` in
    /// release builds.
    #[allow(dead_code)]
    pub(crate) fn active(&self) -> Option<&'static str> {
        #[cfg(debug_assertions)]
        {
            return self.active.get();
        }
        #[cfg(not(debug_assertions))]
        {
            return None;
        }
    }
}

/// RAII guard returned by `DebugReentrancy::enter`.
pub(crate) struct ReentrancyGuard<'a> {
    #[cfg(debug_assertions)]
    owner: &'a DebugReentrancy,
    #[cfg(not(debug_assertions))]
    _z: PhantomData<&'a ()>,
}

impl Drop for ReentrancyGuard<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        {
            debug_assert!(self.owner.active.get().is_some());
            self.owner.active.set(None);
        }
    }
}
