//! Deferred guard implementation for testing.

use std::collections::HashSet;
use std::sync::Mutex;

use super::Guard;

/// A guard that defers all node destruction until it is dropped.
///
/// Useful in tests, where destruction timing should be predictable and a
/// leak check can run at a known point. Not suitable for long-running
/// use: retired memory accumulates until the owning collection drops.
///
/// Nodes are collected from multiple threads behind a `Mutex` and freed
/// in the guard's `Drop`.
pub struct DeferredGuard {
    deferred: Mutex<Vec<DeferredNode>>,
    #[cfg(debug_assertions)]
    seen: Mutex<HashSet<usize>>,
}

struct DeferredNode {
    ptr: *mut (),
    dealloc: unsafe fn(*mut ()),
}

// Safety: the pointer is only touched once, under the Mutex, at drop time.
unsafe impl Send for DeferredNode {}

impl DeferredGuard {
    pub fn new() -> Self {
        DeferredGuard {
            deferred: Mutex::new(Vec::new()),
            #[cfg(debug_assertions)]
            seen: Mutex::new(HashSet::new()),
        }
    }
}

impl Default for DeferredGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DeferredGuard {
    fn drop(&mut self) {
        let nodes = self.deferred.get_mut().unwrap();

        // A pointer retired twice would be freed twice.
        let mut seen: HashSet<usize> = HashSet::with_capacity(nodes.len());
        for node in nodes.iter() {
            assert!(
                seen.insert(node.ptr as usize),
                "pointer {:#x} was retired more than once",
                node.ptr as usize
            );
        }

        for node in nodes.drain(..) {
            unsafe {
                (node.dealloc)(node.ptr);
            }
        }
    }
}

impl Guard for DeferredGuard {
    /// Protection comes from the collection's stored guard, so there is
    /// nothing to pin per operation.
    type ReadGuard = ();

    fn pin() -> Self::ReadGuard {}

    unsafe fn defer_destroy<N>(&self, node: *mut N, dealloc: unsafe fn(*mut N)) {
        #[cfg(debug_assertions)]
        {
            let mut seen = self.seen.lock().unwrap();
            assert!(
                seen.insert(node as usize),
                "duplicate defer_destroy at {:#x}",
                node as usize
            );
        }

        let node = DeferredNode {
            ptr: node as *mut (),
            dealloc: unsafe {
                std::mem::transmute::<unsafe fn(*mut N), unsafe fn(*mut ())>(dealloc)
            },
        };
        self.deferred.lock().unwrap().push(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deferred_guard_frees_on_drop() {
        let guard = DeferredGuard::default();

        for i in 0..10 {
            let ptr = Box::into_raw(Box::new(i));
            unsafe {
                guard.defer_destroy(ptr, |p| {
                    drop(Box::from_raw(p));
                });
            }
        }
        // All 10 nodes freed when the guard drops here.
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "duplicate defer_destroy")]
    fn test_duplicate_retirement_is_detected() {
        let guard = DeferredGuard::default();
        let ptr = Box::into_raw(Box::new(1u32));

        unsafe {
            guard.defer_destroy(ptr, |p| drop(Box::from_raw(p)));
            guard.defer_destroy(ptr, |p| drop(Box::from_raw(p)));
        }
    }
}
