//! Memo for optimizer results.
//!
//! Entries are keyed by the exact order size and the pack-size snapshot they
//! were computed with. Once the configured capacity is reached, the entry that
//! was computed longest ago is evicted.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::model::{PackSizes, Shipment};

/// Structural cache key: order size plus the pack sizes used for the search.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub order_size: i64,
    pub pack_sizes: PackSizes,
}

impl CacheKey {
    pub fn new(order_size: i64, pack_sizes: PackSizes) -> Self {
        Self {
            order_size,
            pack_sizes,
        }
    }
}

/// Bounded memo of computed shipments.
///
/// Not synchronised on its own; the owner guards it together with the
/// configuration it belongs to.
#[derive(Debug)]
pub struct ShipmentCache {
    capacity: usize,
    entries: HashMap<CacheKey, Arc<Shipment>>,
    computed_order: VecDeque<CacheKey>,
}

impl ShipmentCache {
    /// Creates an empty cache. A capacity of `0` disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            computed_order: VecDeque::new(),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<Shipment>> {
        self.entries.get(key).cloned()
    }

    /// Stores a freshly computed shipment, evicting the oldest computation if full.
    pub fn insert(&mut self, key: CacheKey, shipment: Arc<Shipment>) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.contains_key(&key) {
            self.entries.insert(key, shipment);
            return;
        }

        while self.entries.len() >= self.capacity {
            let Some(oldest) = self.computed_order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
        }

        self.computed_order.push_back(key.clone());
        self.entries.insert(key, shipment);
    }

    /// Removes all cached entries.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.computed_order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn keys(&self) -> impl Iterator<Item = &CacheKey> {
        self.entries.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(order_size: i64, sizes: &[i64]) -> CacheKey {
        CacheKey::new(order_size, PackSizes::new(sizes.to_vec()).unwrap())
    }

    fn shipment(packs: &[u64]) -> Arc<Shipment> {
        Arc::new(Shipment::from_packs(packs.iter().copied()))
    }

    #[test]
    fn lookup_requires_exact_key() {
        let mut cache = ShipmentCache::new(8);
        cache.insert(key(500, &[250, 500]), shipment(&[500]));

        assert!(cache.get(&key(500, &[500, 250])).is_some());
        assert!(cache.get(&key(501, &[250, 500])).is_none());
        assert!(cache.get(&key(500, &[250, 500, 1000])).is_none());
        assert!(cache.get(&key(500, &[250])).is_none());
    }

    #[test]
    fn evicts_least_recently_computed_entry() {
        let mut cache = ShipmentCache::new(2);
        cache.insert(key(1, &[10]), shipment(&[10]));
        cache.insert(key(2, &[10]), shipment(&[10]));
        // Reading does not refresh an entry.
        assert!(cache.get(&key(1, &[10])).is_some());
        cache.insert(key(3, &[10]), shipment(&[10]));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&key(1, &[10])).is_none());
        assert!(cache.get(&key(2, &[10])).is_some());
        assert!(cache.get(&key(3, &[10])).is_some());
    }

    #[test]
    fn reinserting_existing_key_keeps_size() {
        let mut cache = ShipmentCache::new(2);
        cache.insert(key(1, &[10]), shipment(&[10]));
        cache.insert(key(1, &[10]), shipment(&[10]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn zero_capacity_disables_caching() {
        let mut cache = ShipmentCache::new(0);
        cache.insert(key(1, &[10]), shipment(&[10]));
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn clear_drops_everything() {
        let mut cache = ShipmentCache::new(4);
        cache.insert(key(1, &[10]), shipment(&[10]));
        cache.insert(key(2, &[10]), shipment(&[10]));
        cache.clear();
        assert_eq!(cache.len(), 0);
        assert!(cache.get(&key(1, &[10])).is_none());
    }
}
