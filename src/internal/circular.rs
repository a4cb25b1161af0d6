//! Circular dependency detection infrastructure.

use std::cell::RefCell;

use crate::descriptors::CacheSlot;
use crate::error::{DiError, DiResult};
use crate::key::ServiceKey;

/// Nesting limit. Each level costs several stack frames, so this trips well
/// before a default 2 MiB thread stack runs out.
pub(crate) const MAX_DEPTH: usize = 128;

// Resolution is synchronous, so the keys currently being resolved on this
// thread form a stack.
thread_local! {
    static RESOLUTION_STACK: RefCell<Vec<ServiceKey>> = const { RefCell::new(Vec::new()) };
    static INITIALIZING: RefCell<Vec<(usize, CacheSlot)>> = const { RefCell::new(Vec::new()) };
}

/// Marks `key` as in progress for as long as the guard lives.
pub(crate) struct ResolutionGuard {
    depth: usize,
}

impl ResolutionGuard {
    /// Pushes `key`, failing if it is already being resolved on this thread.
    pub(crate) fn enter(key: &ServiceKey) -> DiResult<Self> {
        RESOLUTION_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();

            if stack.iter().any(|k| k == key) {
                let mut path: Vec<String> = stack.iter().map(ServiceKey::display_name).collect();
                path.push(key.display_name());
                return Err(DiError::Circular(path));
            }
            if stack.len() >= MAX_DEPTH {
                return Err(DiError::DepthExceeded(stack.len()));
            }

            stack.push(key.clone());
            Ok(Self { depth: stack.len() })
        })
    }
}

impl Drop for ResolutionGuard {
    fn drop(&mut self) {
        RESOLUTION_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            debug_assert_eq!(stack.len(), self.depth);
            stack.truncate(self.depth - 1);
        });
    }
}

/// Marks a cache slot as being initialized by this thread.
///
/// Several keys can share one slot (every contract of one implementation),
/// so re-entering a slot under a different key is still a cycle. Waiting on
/// our own slot's init cell would never return.
pub(crate) struct SlotGuard {
    depth: usize,
}

impl SlotGuard {
    /// `cache` identifies the owning cache, since root and scope caches use
    /// the same slot values.
    pub(crate) fn enter(cache: usize, slot: &CacheSlot, requested: &ServiceKey) -> DiResult<Self> {
        INITIALIZING.with(|slots| {
            let mut slots = slots.borrow_mut();

            if slots.iter().any(|(c, s)| *c == cache && s == slot) {
                let mut path: Vec<String> =
                    RESOLUTION_STACK.with(|stack| stack.borrow().iter().map(ServiceKey::display_name).collect());
                path.push(match slot {
                    CacheSlot::Implementation(implementation) => implementation.display_name(),
                    CacheSlot::Descriptor(_) => requested.display_name(),
                });
                return Err(DiError::Circular(path));
            }

            slots.push((cache, slot.clone()));
            Ok(Self { depth: slots.len() })
        })
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        INITIALIZING.with(|slots| {
            let mut slots = slots.borrow_mut();
            debug_assert_eq!(slots.len(), self.depth);
            slots.truncate(self.depth - 1);
        });
    }
}
