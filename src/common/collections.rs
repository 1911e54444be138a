//! Hashers and collection aliases used throughout the crate.

pub use std::collections::{BTreeMap, BTreeSet, VecDeque, hash_map};

pub type HashMap<K, V> = rustc_hash::FxHashMap<K, V>;
pub type HashSet<T> = rustc_hash::FxHashSet<T>;
