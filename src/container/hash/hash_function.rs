use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Abstracts how a key is reduced to the 32-bit value the header/directory
/// pages index by. Pluggable so an index can be built over a different key
/// type without the directory/bucket pages caring how hashing works.
pub trait HashFunction<K>: Send + Sync {
    fn hash_key(&self, key: &K) -> u32;
}

/// The default hash, built on `std::hash::Hash` via `DefaultHasher`. This
/// does not reproduce any particular reference implementation's exact bit
/// pattern; no test here depends on hash values beyond distribution and
/// determinism within a single process.
pub struct DefaultHashFunction<K> {
    _marker: PhantomData<fn(&K)>,
}

impl<K> DefaultHashFunction<K> {
    pub fn new() -> Self {
        Self { _marker: PhantomData }
    }
}

impl<K> Default for DefaultHashFunction<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Hash> HashFunction<K> for DefaultHashFunction<K> {
    fn hash_key(&self, key: &K) -> u32 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish() as u32
    }
}
