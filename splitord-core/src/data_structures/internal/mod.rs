//! Internal implementation details shared by the collections.

mod marked_ptr;

pub(crate) use marked_ptr::MarkedPtr;
