use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};

use crate::data_structures::MarkedPtr;
use crate::data_structures::hash::split_key::{bucket_index, hash, item_key, sentinel_key};
use crate::data_structures::sorted::{OrderedList, OrderedListNode};
use crate::guard::Guard;

/// Buckets at construction time. Bucket 0 is the list head.
const INITIAL_BUCKETS: usize = 2;
/// Average elements per bucket that trigger a doubling.
const MAX_LOAD: usize = 4;
/// Hard cap on the bucket count; growth past it is silently skipped.
const MAX_BUCKETS: usize = 1 << 16;

/// A unified element type for the split-ordered list: bucket sentinels
/// and items coexist in the same list, interleaved by split key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SplitOrderedEntry {
    Sentinel { key: u64, bucket: usize },
    Item { key: u64, value: u64 },
}

impl SplitOrderedEntry {
    fn new_sentinel(bucket: usize) -> Self {
        SplitOrderedEntry::Sentinel {
            key: sentinel_key(bucket),
            bucket,
        }
    }

    fn new_item(value: u64) -> Self {
        SplitOrderedEntry::Item {
            key: item_key(hash(value)),
            value,
        }
    }

    fn split_key(&self) -> u64 {
        match self {
            SplitOrderedEntry::Sentinel { key, .. } => *key,
            SplitOrderedEntry::Item { key, .. } => *key,
        }
    }
}

impl PartialOrd for SplitOrderedEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SplitOrderedEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Primary ordering by split key; the payload breaks ties. A
        // sentinel and an item can never share a split key (the encoding
        // reserves the LSB), but the order must still be total.
        match self.split_key().cmp(&other.split_key()) {
            std::cmp::Ordering::Equal => match (self, other) {
                (SplitOrderedEntry::Sentinel { .. }, SplitOrderedEntry::Item { .. }) => {
                    std::cmp::Ordering::Less
                }
                (SplitOrderedEntry::Item { .. }, SplitOrderedEntry::Sentinel { .. }) => {
                    std::cmp::Ordering::Greater
                }
                (
                    SplitOrderedEntry::Sentinel { bucket: b1, .. },
                    SplitOrderedEntry::Sentinel { bucket: b2, .. },
                ) => b1.cmp(b2),
                (
                    SplitOrderedEntry::Item { value: v1, .. },
                    SplitOrderedEntry::Item { value: v2, .. },
                ) => v1.cmp(v2),
            },
            ord => ord,
        }
    }
}

type SentinelPtr = *mut OrderedListNode<SplitOrderedEntry>;

/// One published generation of the hash index. Immutable once published;
/// growth allocates a successor and retires this one through the guard.
struct BucketTable {
    sentinels: Box<[AtomicPtr<OrderedListNode<SplitOrderedEntry>>]>,
}

impl BucketTable {
    fn with_len(len: usize) -> Self {
        let sentinels = (0..len)
            .map(|_| AtomicPtr::new(std::ptr::null_mut()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        BucketTable { sentinels }
    }

    fn len(&self) -> usize {
        self.sentinels.len()
    }

    fn sentinel(&self, bucket: usize) -> SentinelPtr {
        self.sentinels[bucket].load(Ordering::Acquire)
    }

    fn set_sentinel(&self, bucket: usize, node: SentinelPtr) {
        self.sentinels[bucket].store(node, Ordering::Release);
    }

    /// # Safety
    /// `ptr` must come from `Box::into_raw` and be dropped at most once.
    unsafe fn dealloc(ptr: *mut BucketTable) {
        unsafe { drop(Box::from_raw(ptr)) };
    }
}

#[doc = r#"Lock-free hash set of `u64` values using a split-ordered list.

Based on Shalev and Shavit's "Split-Ordered Lists: Lock-Free Extensible
Hash Tables" (2006). A single sorted linked list holds every element; the
hash index is an array of sentinel nodes pointing into it, one per bucket.

# How resizing avoids rehashing

Entries are ordered by the *reverse* of their hash bits. Reversal moves
the bucket-selecting low bits to the top of the sort key, so the members
of bucket `b` in a table of `N` buckets occupy one contiguous run of the
list. Doubling the table to `2N` splits each run in two by inserting one
new sentinel per new bucket at a deterministic position inside its
parent's run:

```text
N=2:  HEAD(S0) → i(h%2=0) → i(h%2=0) → S1 → i(h%2=1) → TAIL
N=4:  HEAD(S0) → i(h%4=0) → S2 → i(h%4=2) → S1 → i(h%4=1) → S3 → … → TAIL
```

No item ever moves. The old bucket array stays valid throughout (its
sentinels remain correct entry points, traversals just walk a little
further), so readers and writers never wait for a resize.

# Growth protocol

The bucket-array pointer carries a growth flag in its LSB. One thread
claims the flag with a CAS, builds the doubled array (copying the old
sentinel pointers and inserting the new sentinels through their parents),
then publishes it with a single store that also clears the flag. Threads
that lose the claim simply continue at the old size.

# Counter

The element counter is approximate by design: it is maintained with
relaxed fetch-add/sub and only steers the growth heuristic, never
correctness.
"#]
pub struct SplitOrderedHashSet<G: Guard> {
    list: OrderedList<SplitOrderedEntry, G>,
    /// Current bucket table; the LSB of this pointer is the growth flag.
    buckets: AtomicPtr<BucketTable>,
    /// Approximate element count (items only, sentinels excluded).
    len: AtomicUsize,
}

impl<G: Guard> SplitOrderedHashSet<G> {
    /// Create an empty set with two buckets: bucket 0 anchored at the
    /// list head, bucket 1 at a freshly inserted sentinel.
    pub fn new() -> Self {
        let list: OrderedList<SplitOrderedEntry, G> = OrderedList::new();
        let head = list.head_ptr();

        let table = BucketTable::with_len(INITIAL_BUCKETS);
        table.set_sentinel(0, head);

        let sentinel_1 = list
            .insert_from(head, SplitOrderedEntry::new_sentinel(1))
            .expect("fresh list already contained sentinel 1");
        table.set_sentinel(1, sentinel_1);

        SplitOrderedHashSet {
            list,
            buckets: AtomicPtr::new(Box::into_raw(Box::new(table))),
            len: AtomicUsize::new(0),
        }
    }

    /// The current bucket table, growth flag stripped.
    ///
    /// The reference is only valid while the caller holds a read guard:
    /// a retired table is reclaimed once all pinned readers are done.
    fn table(&self) -> &BucketTable {
        let raw = self.buckets.load(Ordering::Acquire);
        unsafe { &*MarkedPtr::unmask(raw) }
    }

    /// Add a value. Returns `true` if it was absent.
    pub fn add(&self, value: u64) -> bool {
        let _guard = G::pin();

        let table = self.table();
        let start = table.sentinel(bucket_index(hash(value), table.len()));

        if self
            .list
            .insert_from(start, SplitOrderedEntry::new_item(value))
            .is_none()
        {
            return false;
        }

        let len = self.len.fetch_add(1, Ordering::Relaxed) + 1;
        if len > MAX_LOAD * table.len() {
            self.try_grow();
        }

        true
    }

    /// Remove a value. Returns `true` if it was present.
    pub fn remove(&self, value: u64) -> bool {
        let _guard = G::pin();

        let table = self.table();
        let start = table.sentinel(bucket_index(hash(value), table.len()));

        if self
            .list
            .remove_from(start, &SplitOrderedEntry::new_item(value))
        {
            self.len.fetch_sub(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Membership test. Read-only: performs no unlinking.
    pub fn contains(&self, value: u64) -> bool {
        let _guard = G::pin();

        let table = self.table();
        let start = table.sentinel(bucket_index(hash(value), table.len()));

        self.list
            .contains_from(start, &SplitOrderedEntry::new_item(value))
    }

    /// Approximate number of elements. Exact whenever the set is
    /// quiescent; may briefly lag under concurrent mutation.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of buckets currently published. Always a power of two and
    /// never decreases.
    pub fn bucket_count(&self) -> usize {
        let _guard = G::pin();
        self.table().len()
    }

    /// Visit every live value in split-key order.
    ///
    /// Under concurrent mutation this is not a snapshot: values inserted
    /// or removed during the walk may or may not be visited.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(u64),
    {
        for value in self.iter() {
            f(value);
        }
    }

    /// Iterate live values in split-key order. Same consistency caveat
    /// as [`SplitOrderedHashSet::for_each`].
    pub fn iter(&self) -> Values<'_, G> {
        Values {
            inner: self.list.iter(),
        }
    }

    /// Attempt to double the bucket count.
    ///
    /// Exactly one thread wins the claim CAS; everyone else returns and
    /// proceeds at the old size, which stays fully usable throughout.
    fn try_grow(&self) {
        let raw = self.buckets.load(Ordering::Acquire);
        let current = MarkedPtr::new(raw);

        if current.is_marked() {
            // A growth is already in progress.
            return;
        }

        let old = unsafe { &*current.as_ptr() };
        let n = old.len();
        if n >= MAX_BUCKETS {
            return;
        }

        // Claim exclusive growth rights by setting the flag bit.
        if self
            .buckets
            .compare_exchange(
                raw,
                current.with_mark().as_raw(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return;
        }

        let table = BucketTable::with_len(n * 2);

        // Existing sentinels stay valid entry points: copy them verbatim.
        for b in 0..n {
            table.set_sentinel(b, old.sentinel(b));
        }

        // Each new bucket splits its parent (the index with the highest
        // bit cleared). The split-order encoding places the new sentinel
        // exactly where the parent's run partitions in two.
        for b in n..n * 2 {
            let parent = b - n;
            let node = self.install_sentinel(table.sentinel(parent), b);
            table.set_sentinel(b, node);
        }

        // Publish, clearing the flag in the same store.
        self.buckets
            .store(Box::into_raw(Box::new(table)), Ordering::Release);

        // The old table stays readable for threads that loaded it before
        // publication; retire it through the guard.
        unsafe {
            self.list
                .guard()
                .defer_destroy(current.as_ptr(), BucketTable::dealloc);
        }
    }

    fn install_sentinel(&self, start: SentinelPtr, bucket: usize) -> SentinelPtr {
        let entry = SplitOrderedEntry::new_sentinel(bucket);

        if let Some(node) = self.list.insert_from(start, entry.clone()) {
            return node;
        }

        // Growth is exclusive, so a duplicate can only mean this sentinel
        // is already in the list; accept the one present.
        self.list
            .find_node_from(start, &entry)
            .expect("sentinel neither inserted nor present")
    }

    /// Verify the structural invariants. Intended for quiescent moments
    /// (tests, debugging); panics on any violation.
    ///
    /// Checks: strict ascending split order, sentinel coverage of every
    /// bucket, items resident in the bucket their hash selects, and the
    /// counter matching the live item count.
    pub fn check_integrity(&self) {
        let _guard = G::pin();

        let table = self.table();
        let n = table.len();

        assert!(n.is_power_of_two(), "bucket count {n} not a power of two");
        assert_eq!(
            table.sentinel(0),
            self.list.head_ptr(),
            "bucket 0 must be anchored at the list head"
        );

        for b in 1..n {
            let node = table.sentinel(b);
            assert!(!node.is_null(), "bucket {b} has no sentinel");
            let entry = unsafe { (*node).key() };
            assert_eq!(
                *entry,
                SplitOrderedEntry::new_sentinel(b),
                "bucket {b} entry does not point at its sentinel"
            );
        }

        let mut prev: Option<SplitOrderedEntry> = None;
        let mut current_bucket = 0usize;
        let mut items = 0usize;
        let mut sentinels = 0usize;

        for entry in self.list.iter() {
            if let Some(ref p) = prev {
                assert!(*p < entry, "list order violated: {p:?} !< {entry:?}");
            }

            match entry {
                SplitOrderedEntry::Sentinel { bucket, .. } => {
                    assert!(bucket < n, "sentinel for bucket {bucket} beyond table");
                    current_bucket = bucket;
                    sentinels += 1;
                }
                SplitOrderedEntry::Item { value, .. } => {
                    assert_eq!(
                        bucket_index(hash(value), n),
                        current_bucket,
                        "value {value} sits outside its bucket's run"
                    );
                    items += 1;
                }
            }

            prev = Some(entry);
        }

        // Bucket 0's sentinel is the head boundary, so the list holds
        // exactly n - 1 sentinel entries.
        assert_eq!(sentinels, n - 1, "sentinel count does not match table");
        assert_eq!(items, self.len(), "counter out of sync with live items");
    }
}

impl<G: Guard> Default for SplitOrderedHashSet<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: Guard> Drop for SplitOrderedHashSet<G> {
    fn drop(&mut self) {
        // The nodes (sentinels included) belong to the list and are freed
        // with it; only the current table is owned here. Tables retired by
        // earlier growths sit in the guard and are released when it drops.
        let raw = MarkedPtr::unmask(self.buckets.load(Ordering::Acquire));
        unsafe { drop(Box::from_raw(raw)) };
    }
}

/// Iterator over live values, sentinels filtered out.
pub struct Values<'a, G: Guard> {
    inner: crate::data_structures::sorted::Iter<'a, SplitOrderedEntry, G>,
}

impl<G: Guard> Iterator for Values<'_, G> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        loop {
            match self.inner.next()? {
                SplitOrderedEntry::Item { value, .. } => return Some(value),
                SplitOrderedEntry::Sentinel { .. } => continue,
            }
        }
    }
}

// ============================================================================
// Tests - basics live here; scenario and stress tests are in tests/
// ============================================================================
