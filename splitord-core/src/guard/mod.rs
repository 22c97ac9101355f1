//! Guard trait for memory reclamation strategies.
//!
//! Unlinking a node from a lock-free structure does not make it safe to
//! free: a concurrent reader may still hold a reference obtained before
//! the unlink. Every physical free therefore goes through a `Guard`, and
//! the collections are generic over which reclamation scheme backs it:
//!
//! ```text
//! OrderedList<T, G: Guard>
//!     │
//!     ├── OrderedList<T, EpochGuard>      (production, splitord-crossbeam)
//!     └── OrderedList<T, DeferredGuard>   (testing, deterministic teardown)
//! ```

mod deferred_guard;

pub use deferred_guard::DeferredGuard;

/// A memory reclamation strategy protecting concurrent access to nodes.
///
/// # Safety Contract
///
/// Implementations must ensure that a pointer passed to `defer_destroy`
/// is not freed while any thread holding a live `ReadGuard` pinned before
/// the call could still reach it.
///
/// The guard stored in a collection schedules deferred destruction;
/// per-operation protection is a separate `pin()` call, because pinning
/// (for epoch-based schemes) is a per-thread, per-operation affair.
pub trait Guard: Sized + Default + Send + Sync {
    /// An active guard that protects reads for its lifetime.
    ///
    /// For epoch-based guards this is a pinned epoch handle; for the
    /// deferred guard it is a unit type, since the collection's stored
    /// guard already keeps every node alive.
    type ReadGuard: Sized;

    /// Pin an active read guard for the duration of one operation or
    /// iteration.
    fn pin() -> Self::ReadGuard;

    /// Schedule a node for destruction once no reader can reach it.
    ///
    /// # Safety
    ///
    /// - `node` must have been allocated by the collection that owns this
    ///   guard and must be unreachable by new traversals
    /// - `dealloc` must be the matching deallocation function for `node`
    /// - each pointer may be deferred at most once
    unsafe fn defer_destroy<N>(&self, node: *mut N, dealloc: unsafe fn(*mut N));
}
