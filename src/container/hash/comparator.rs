use std::cmp::Ordering;
use std::marker::PhantomData;

/// Orders two keys so a bucket can detect an existing key without requiring
/// `Eq`. Separated from `PartialEq`/`Ord` the way the reference index takes
/// an explicit comparator object, so a caller can plug in e.g. a
/// case-insensitive ordering without changing the key type.
pub trait StorageComparator<K>: Send + Sync {
    fn compare(&self, a: &K, b: &K) -> Ordering;
}

/// The default comparator: just `Ord::cmp`. Used by every test instantiation
/// in this crate (`i32` and `i64` keys).
pub struct DefaultComparator<K> {
    _marker: PhantomData<fn(&K)>,
}

impl<K> DefaultComparator<K> {
    pub fn new() -> Self {
        Self { _marker: PhantomData }
    }
}

impl<K> Default for DefaultComparator<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord> StorageComparator<K> for DefaultComparator<K> {
    fn compare(&self, a: &K, b: &K) -> Ordering {
        a.cmp(b)
    }
}

/// Alias matching the reference index's integer-key comparator name.
pub type IntComparator = DefaultComparator<i32>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_by_value() {
        let cmp = IntComparator::new();
        assert_eq!(cmp.compare(&1, &2), Ordering::Less);
        assert_eq!(cmp.compare(&2, &2), Ordering::Equal);
    }
}
