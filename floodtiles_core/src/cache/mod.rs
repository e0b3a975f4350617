//! A generic, byte-budgeted LRU cache, keyed on an explicit [`ByteSized`] cost per value rather
//! than a fixed `size_of::<K>() + size_of::<V>()` estimate, since the decompressed-array cache
//! needs this: `ElevationArray`s vary in size and are measured in megabytes, not bytes.

mod byte_limited;
pub use byte_limited::*;
