//! Hash collections with the `ahash` hasher.
//!
//! Builder-side maps are keyed by short strings and packed integers, where
//! SipHash's DoS resistance buys nothing.

/// A `hashbrown` map using `ahash`.
pub type FxHashMap<K, V> = hashbrown::HashMap<K, V, ahash::RandomState>;

/// A `hashbrown` set using `ahash`.
pub type FxHashSet<T> = hashbrown::HashSet<T, ahash::RandomState>;

/// An insertion-ordered set using `ahash`.
pub type FxIndexSet<T> = indexmap::IndexSet<T, ahash::RandomState>;
