//! Reusable-instance pool.
//!
//! Cities are checked out of an [`EntityPool`] when placed and released back
//! when their team loses them for good (deactivation, match reset). Released
//! instances are reset to kind defaults immediately, so nothing from a
//! previous tenancy survives into the next checkout. The pool grows on
//! demand and never fails.

use serde::{Deserialize, Serialize};

/// A value that can be recycled through an [`EntityPool`].
pub trait Poolable {
    /// Discriminant used to match checkouts with free instances.
    type Kind: Copy + PartialEq;
    /// Source of default values used to build and reset instances.
    type Defaults;

    /// Construct a brand-new instance of `kind`.
    fn create(kind: Self::Kind, defaults: &Self::Defaults) -> Self;

    /// Kind of this instance.
    fn kind(&self) -> Self::Kind;

    /// Restore every mutable field to the kind defaults.
    fn reset(&mut self, defaults: &Self::Defaults);
}

/// Counters describing pool usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PoolStats {
    /// Instances constructed because no free one matched.
    pub created: u64,
    /// Checkouts served from released instances.
    pub reused: u64,
    /// Instances released back into the pool.
    pub released: u64,
}

/// Free list of reset instances, grown on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityPool<T> {
    free: Vec<T>,
    stats: PoolStats,
}

impl<T> Default for EntityPool<T> {
    fn default() -> Self {
        Self {
            free: Vec::new(),
            stats: PoolStats::default(),
        }
    }
}

impl<T: Poolable> EntityPool<T> {
    /// Create an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take an instance of `kind`, reusing a released one when available.
    pub fn checkout(&mut self, kind: T::Kind, defaults: &T::Defaults) -> T {
        if let Some(index) = self.free.iter().rposition(|item| item.kind() == kind) {
            self.stats.reused += 1;
            self.free.swap_remove(index)
        } else {
            self.stats.created += 1;
            T::create(kind, defaults)
        }
    }

    /// Reset `item` and make it available for a future checkout.
    pub fn release(&mut self, mut item: T, defaults: &T::Defaults) {
        item.reset(defaults);
        self.stats.released += 1;
        self.free.push(item);
    }

    /// Number of instances waiting to be reused.
    #[must_use]
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Usage counters.
    #[must_use]
    pub const fn stats(&self) -> PoolStats {
        self.stats
    }

    /// Iterate over the free instances.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.free.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Crate {
        size: u8,
        stamp: u32,
    }

    impl Poolable for Crate {
        type Kind = u8;
        type Defaults = u32;

        fn create(kind: u8, defaults: &u32) -> Self {
            Self {
                size: kind,
                stamp: *defaults,
            }
        }

        fn kind(&self) -> u8 {
            self.size
        }

        fn reset(&mut self, defaults: &u32) {
            self.stamp = *defaults;
        }
    }

    #[test]
    fn test_checkout_creates_when_empty() {
        let mut pool: EntityPool<Crate> = EntityPool::new();
        let item = pool.checkout(2, &0);
        assert_eq!(item, Crate { size: 2, stamp: 0 });
        assert_eq!(pool.stats().created, 1);
        assert_eq!(pool.stats().reused, 0);
    }

    #[test]
    fn test_release_resets_and_reuses() {
        let mut pool: EntityPool<Crate> = EntityPool::new();
        let mut item = pool.checkout(2, &0);
        item.stamp = 99;
        pool.release(item, &0);
        assert_eq!(pool.available(), 1);
        assert!(pool.iter().all(|c| c.stamp == 0));

        let again = pool.checkout(2, &0);
        assert_eq!(again.stamp, 0);
        assert_eq!(pool.stats().reused, 1);
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn test_checkout_matches_kind() {
        let mut pool: EntityPool<Crate> = EntityPool::new();
        let small = pool.checkout(1, &0);
        pool.release(small, &0);

        let big = pool.checkout(3, &0);
        assert_eq!(big.size, 3);
        assert_eq!(pool.available(), 1);
        assert_eq!(pool.stats().created, 2);
    }
}
