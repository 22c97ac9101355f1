use std::cmp::Ordering as CmpOrdering;
use std::marker::PhantomData;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

use crate::data_structures::MarkedPtr;
use crate::guard::Guard;

type NodePtr<T> = *mut OrderedListNode<T>;

//
// Concurrent singly-linked sorted list based on Harris's
// 'A Pragmatic Implementation of Non-Blocking Linked-Lists'.
// Every traversal can start from an arbitrary node instead of the head,
// which is the hook the split-ordered hash set uses to jump straight to a
// bucket's sentinel.
//
// =============================================================================
// STRUCTURE
// =============================================================================
//
// The list is bootstrapped with two permanent boundary nodes. The head
// sorts before every key, the tail after every key, so a walk never has
// to reason about an empty window:
//
// ┌──────┐    ┌──────┐    ┌──────┐    ┌──────┐
// │ HEAD │───►│  10  │───►│  20  │───►│ TAIL │──► null
// └──────┘    └──────┘    └──────┘    └──────┘
//
// The mark bit on node.next means the NODE ITSELF is logically deleted.
//
// INVARIANTS:
// 1. Strictly ascending key order, no duplicate keys
// 2. Boundary nodes are never marked and never removed
// 3. A marked node is physically unlinked by whichever later CAS snips it
//
// =============================================================================
// REMOVE (two-phase delete)
// =============================================================================
//
// Phase 1: the mark CAS on curr.next (the linearization point)
// Phase 2: one unlink CAS on pred.next; if it fails, any later traversal
//          through the window performs the snip instead
//
// The thread whose CAS physically unlinks a marked node is the only one
// that can have done so, and it alone hands the node to the guard for
// deferred destruction. That keeps retirement exactly-once even though
// unlinking can be finished by a helper.
//
pub struct OrderedListNode<T> {
    data: Option<T>,
    next: AtomicPtr<OrderedListNode<T>>,
}

impl<T> OrderedListNode<T> {
    fn new(data: T) -> Self {
        OrderedListNode {
            data: Some(data),
            next: AtomicPtr::new(ptr::null_mut()),
        }
    }

    fn new_boundary() -> Self {
        OrderedListNode {
            data: None,
            next: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// True for the head and tail bootstrap nodes, which carry no data.
    pub(crate) fn is_boundary(&self) -> bool {
        self.data.is_none()
    }

    pub(crate) fn key(&self) -> &T {
        self.data
            .as_ref()
            .expect("boundary nodes carry no key")
    }

    /// Load next pointer (Acquire ordering)
    #[inline]
    pub(crate) fn get_next(&self) -> NodePtr<T> {
        self.next.load(Ordering::Acquire)
    }

    /// Store next pointer (Release ordering)
    #[inline]
    fn set_next(&self, ptr: NodePtr<T>) {
        self.next.store(ptr, Ordering::Release)
    }

    /// CAS next pointer over the whole tagged word (Release/Relaxed)
    #[inline]
    fn cas_next(&self, expected: NodePtr<T>, new: NodePtr<T>) -> Result<NodePtr<T>, NodePtr<T>> {
        self.next
            .compare_exchange(expected, new, Ordering::Release, Ordering::Relaxed)
    }

    /// Weak CAS next pointer, for retry loops (Release/Relaxed)
    #[inline]
    fn cas_next_weak(
        &self,
        expected: NodePtr<T>,
        new: NodePtr<T>,
    ) -> Result<NodePtr<T>, NodePtr<T>> {
        self.next
            .compare_exchange_weak(expected, new, Ordering::Release, Ordering::Relaxed)
    }

    /// Deallocate a node.
    ///
    /// # Safety
    /// - `ptr` must have been allocated by this list with `Box::new`
    /// - must be called at most once, and the node never accessed after
    pub(crate) unsafe fn dealloc_ptr(ptr: NodePtr<T>) {
        unsafe { drop(Box::from_raw(ptr)) };
    }
}

/// Adjacent unmarked nodes bracketing a search key:
/// `pred.key < key <= curr.key`, with `curr` possibly the tail boundary.
pub(crate) struct Window<T> {
    pub(crate) pred: NodePtr<T>,
    pub(crate) curr: NodePtr<T>,
}

pub struct OrderedList<T, G: Guard> {
    head: AtomicPtr<OrderedListNode<T>>,
    /// Shared guard instance for deferred destruction. Every physically
    /// unlinked node is routed through it.
    guard: G,
    _marker: PhantomData<T>,
}

impl<T, G> OrderedList<T, G>
where
    T: Eq + Ord,
    G: Guard,
{
    pub fn new() -> Self {
        let tail = Box::into_raw(Box::new(OrderedListNode::new_boundary()));
        let head = OrderedListNode::new_boundary();
        head.set_next(tail);

        OrderedList {
            head: AtomicPtr::new(Box::into_raw(Box::new(head))),
            guard: G::default(),
            _marker: PhantomData,
        }
    }

    /// The shared guard instance for this collection.
    pub fn guard(&self) -> &G {
        &self.guard
    }

    pub(crate) fn head_ptr(&self) -> NodePtr<T> {
        self.head.load(Ordering::Acquire)
    }

    // Core operation: find with cleanup.
    //
    // Walks forward from `start`, snipping out any marked node it meets.
    // A failed snip CAS means the window changed under us (pred marked, or
    // a concurrent insert/unlink); the walk restarts from `start`, not
    // from the head, so bucket sentinels stay effective as entry points.
    //
    // `start` must be a node that is never removed (the head or a bucket
    // sentinel); a marked tag on it is stripped defensively.
    pub(crate) fn find_window(&self, start: NodePtr<T>, key: &T) -> Window<T> {
        'retry: loop {
            let mut pred = MarkedPtr::unmask(start);
            let mut curr = MarkedPtr::unmask(unsafe { (*pred).get_next() });

            loop {
                let succ_raw = unsafe { (*curr).get_next() };
                let succ = MarkedPtr::new(succ_raw);

                if succ.is_marked() {
                    // curr is logically deleted: snip it before advancing.
                    match unsafe { (*pred).cas_next(curr, succ.as_ptr()) } {
                        Ok(_) => {
                            // The winning snip owns the retirement.
                            unsafe {
                                self.guard.defer_destroy(curr, OrderedListNode::dealloc_ptr);
                            }
                            curr = succ.as_ptr();
                            continue;
                        }
                        Err(_) => continue 'retry,
                    }
                }

                unsafe {
                    if (*curr).is_boundary() || (*curr).key() >= key {
                        // The tail boundary sorts after every key.
                        // Double-check curr was not marked while we looked.
                        if MarkedPtr::new((*curr).get_next()).is_marked() {
                            continue 'retry;
                        }
                        return Window { pred, curr };
                    }
                }

                pred = curr;
                curr = succ.as_ptr();
            }
        }
    }

    /// Insert starting the search at `start`.
    ///
    /// Returns a pointer to the linked node, durable for the lifetime of
    /// the list (the hash layer records sentinel nodes this way), or
    /// `None` if an equal item is already present.
    pub(crate) fn insert_from(&self, start: NodePtr<T>, item: T) -> Option<NodePtr<T>> {
        let new_node = Box::into_raw(Box::new(OrderedListNode::new(item)));

        loop {
            let key = unsafe { (*new_node).key() };
            let w = self.find_window(start, key);

            unsafe {
                if !(*w.curr).is_boundary() && (*w.curr).key() == key {
                    // Duplicate. The candidate was never shared, so it can
                    // be freed directly.
                    OrderedListNode::dealloc_ptr(new_node);
                    return None;
                }

                (*new_node).set_next(w.curr);

                if (*w.pred).cas_next_weak(w.curr, new_node).is_ok() {
                    return Some(new_node);
                }
            }
            // CAS failed, re-find and retry.
        }
    }

    /// Remove the item equal to `key`, searching from `start`.
    ///
    /// The mark CAS on the victim's next pointer is the linearization
    /// point. One unlink attempt follows; if it loses a race the node
    /// stays marked and the next traversal through the window snips it.
    pub(crate) fn remove_from(&self, start: NodePtr<T>, key: &T) -> bool {
        loop {
            let w = self.find_window(start, key);

            unsafe {
                if (*w.curr).is_boundary() || (*w.curr).key() != key {
                    return false;
                }

                let succ_raw = (*w.curr).get_next();
                let succ = MarkedPtr::new(succ_raw);

                if succ.is_marked() {
                    // Another remove already logically deleted it.
                    return false;
                }

                if (*w.curr)
                    .cas_next_weak(succ_raw, succ.with_mark().as_raw())
                    .is_err()
                {
                    // Next pointer changed under us (insert after curr, or
                    // a competing mark); retry from the window search.
                    continue;
                }

                if (*w.pred).cas_next(w.curr, succ.as_ptr()).is_ok() {
                    self.guard
                        .defer_destroy(w.curr, OrderedListNode::dealloc_ptr);
                }

                return true;
            }
        }
    }

    /// Read-only membership test from `start`: no snipping, no CAS.
    ///
    /// True iff an unmarked node equal to `key` is reached.
    pub(crate) fn contains_from(&self, start: NodePtr<T>, key: &T) -> bool {
        let mut node = MarkedPtr::unmask(unsafe { (*MarkedPtr::unmask(start)).get_next() });

        loop {
            if node.is_null() {
                return false;
            }

            unsafe {
                if (*node).is_boundary() {
                    // Reached the tail.
                    return false;
                }

                let next = (*node).get_next();

                match (*node).key().cmp(key) {
                    CmpOrdering::Less => node = MarkedPtr::unmask(next),
                    CmpOrdering::Equal => return !MarkedPtr::new(next).is_marked(),
                    CmpOrdering::Greater => return false,
                }
            }
        }
    }

    /// Locate the node equal to `key`, searching from `start`.
    pub(crate) fn find_node_from(&self, start: NodePtr<T>, key: &T) -> Option<NodePtr<T>> {
        let w = self.find_window(start, key);

        unsafe {
            if !(*w.curr).is_boundary() && (*w.curr).key() == key {
                Some(w.curr)
            } else {
                None
            }
        }
    }

    // =========================================================================
    // Safe head-anchored API
    // =========================================================================

    /// Insert an item. Returns `true` if it was absent.
    pub fn insert(&self, item: T) -> bool {
        let _guard = G::pin();
        self.insert_from(self.head_ptr(), item).is_some()
    }

    /// Remove an item. Returns `true` if it was present.
    pub fn remove(&self, key: &T) -> bool {
        let _guard = G::pin();
        self.remove_from(self.head_ptr(), key)
    }

    /// Membership test.
    pub fn contains(&self, key: &T) -> bool {
        let _guard = G::pin();
        self.contains_from(self.head_ptr(), key)
    }

    /// Iterate live items in key order. Not a snapshot under concurrent
    /// mutation: items inserted or removed mid-walk may or may not appear.
    pub fn iter(&self) -> Iter<'_, T, G> {
        Iter {
            _guard: G::pin(),
            curr: self.head_ptr(),
            _list: PhantomData,
        }
    }

    /// Collect all live items into a Vec.
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.iter().collect()
    }

    pub fn is_empty(&self) -> bool {
        let _guard = G::pin();
        let mut curr = self.head_ptr();

        loop {
            if curr.is_null() {
                return true;
            }
            unsafe {
                let node = &*curr;
                let next_raw = node.get_next();
                if !node.is_boundary() && !MarkedPtr::new(next_raw).is_marked() {
                    return false;
                }
                curr = MarkedPtr::unmask(next_raw);
            }
        }
    }
}

impl<T, G> Default for OrderedList<T, G>
where
    T: Eq + Ord,
    G: Guard,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, G: Guard> Drop for OrderedList<T, G> {
    fn drop(&mut self) {
        // Free every node still reachable, boundaries included. Marked
        // nodes that were never physically unlinked are still linked here
        // and freed now; snipped nodes were already handed to the guard,
        // which releases them when it drops after this.
        let mut curr = self.head.load(Ordering::Acquire);

        while !curr.is_null() {
            unsafe {
                let next = MarkedPtr::unmask((*curr).get_next());
                OrderedListNode::dealloc_ptr(curr);
                curr = next;
            }
        }
    }
}

/// Iterator over live (unmarked, non-boundary) items.
///
/// Holds a read guard for its whole lifetime so the nodes it walks cannot
/// be reclaimed under it.
pub struct Iter<'a, T, G: Guard> {
    _guard: G::ReadGuard,
    curr: NodePtr<T>,
    _list: PhantomData<&'a OrderedList<T, G>>,
}

impl<T, G> Iterator for Iter<'_, T, G>
where
    T: Clone,
    G: Guard,
{
    type Item = T;

    fn next(&mut self) -> Option<T> {
        loop {
            if self.curr.is_null() {
                return None;
            }

            unsafe {
                let node = &*self.curr;
                let next_raw = node.get_next();

                // Advance past the mark bit either way.
                self.curr = MarkedPtr::unmask(next_raw);

                if !node.is_boundary() && !MarkedPtr::new(next_raw).is_marked() {
                    return Some(node.key().clone());
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
