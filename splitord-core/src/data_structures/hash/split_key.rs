//! Split-order key encoding.
//!
//! Items are ordered by the bit-reversal of their hash, sentinels by the
//! bit-reversal of their bucket index. Reversing puts the bucket-selecting
//! low bits at the top of the key, so every bucket's members form one
//! contiguous run of the list, and doubling the table only ever splits a
//! run in place:
//!
//! - `sentinel_key(b)` reverses `b` with the top bit cleared → LSB 0
//! - `item_key(v)` reverses `hash(v)` with the top bit set → LSB 1
//!
//! A sentinel therefore sorts strictly before every item of its bucket.

/// High bit reserved to separate item keys from sentinel keys.
const TOP: u64 = 1 << 63;
/// Clears the reserved bit before reversal.
const MASK: u64 = !TOP;

/// Pure integer bit-mixer (the splitmix64 finalizer). The exact constants
/// are not load-bearing; what matters is determinism and well-mixed low
/// bits, since the bucket index is taken from the low bits.
pub(crate) fn hash(value: u64) -> u64 {
    let mut x = value;
    x ^= x >> 30;
    x = x.wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^= x >> 31;
    x
}

/// Sort key for the sentinel of `bucket`. The result has LSB 0.
pub(crate) fn sentinel_key(bucket: usize) -> u64 {
    ((bucket as u64) & MASK).reverse_bits()
}

/// Sort key for an item, derived from its hash. The result has LSB 1.
pub(crate) fn item_key(hash: u64) -> u64 {
    ((hash & MASK) | TOP).reverse_bits()
}

/// Bucket selected by a hash in a table of `buckets` entries.
pub(crate) fn bucket_index(hash: u64, buckets: usize) -> usize {
    debug_assert!(buckets.is_power_of_two());
    (hash as usize) & (buckets - 1)
}
