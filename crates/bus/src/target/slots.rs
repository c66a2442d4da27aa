//! XUSB user-index allocator
//!
//! An Xbox 360 target carries a user index (the LED ring number reported to
//! XInput). The pool hands out the lowest index not held by a live
//! [`SlotGuard`] and takes it back when the guard is dropped. It has no upper
//! bound, so claiming never fails.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::trace;

#[derive(Debug, Default)]
struct SlotState {
    /// Indices below `next` that were handed back
    released: BTreeSet<u32>,
    next: u32,
}

/// Shared pool of user indices
#[derive(Debug, Default)]
pub struct SlotPool {
    state: Mutex<SlotState>,
}

impl SlotPool {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Claim the lowest free index
    pub fn claim(self: &Arc<Self>) -> SlotGuard {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        // Every live guard belongs to a registry entry or an in-flight
        // plug-in, so `next` stays far below u32::MAX.
        let index = match state.released.pop_first() {
            Some(index) => index,
            None => {
                state.next += 1;
                state.next - 1
            }
        };
        trace!("Claimed user index {}", index);
        SlotGuard {
            pool: Arc::clone(self),
            index,
        }
    }

    /// Number of indices currently held
    pub fn in_use(&self) -> usize {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.next as usize - state.released.len()
    }

    fn release(&self, index: u32) {
        trace!("Released user index {}", index);
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.released.insert(index);
        // Shrink the high-water mark when the top indices are all free
        while let Some(&top) = state.released.last()
            && top + 1 == state.next
        {
            state.released.remove(&top);
            state.next = top;
        }
    }
}

/// Claimed index, returned to its pool on drop
#[derive(Debug)]
pub struct SlotGuard {
    pool: Arc<SlotPool>,
    index: u32,
}

impl SlotGuard {
    pub fn index(&self) -> u32 {
        self.index
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.pool.release(self.index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_lowest_free_index() {
        let pool = SlotPool::new();
        let a = pool.claim();
        let b = pool.claim();
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);

        drop(a);
        let c = pool.claim();
        assert_eq!(c.index(), 0);
        assert_eq!(pool.in_use(), 2);
    }

    #[test]
    fn test_never_exhausted() {
        let pool = SlotPool::new();
        let held: Vec<_> = (0..1000).map(|_| pool.claim()).collect();
        assert_eq!(held.last().map(SlotGuard::index), Some(999));
        assert_eq!(pool.in_use(), 1000);

        drop(held);
        assert_eq!(pool.in_use(), 0);
        assert_eq!(pool.claim().index(), 0);
    }

    #[test]
    fn test_release_out_of_order() {
        let pool = SlotPool::new();
        let a = pool.claim();
        let b = pool.claim();
        let c = pool.claim();

        drop(b);
        drop(c);
        assert_eq!(pool.in_use(), 1);
        assert_eq!(pool.claim().index(), 1);

        drop(a);
        assert_eq!(pool.in_use(), 0);
    }
}
