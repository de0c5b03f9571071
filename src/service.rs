//! Calculation service.
//!
//! Owns the active pack-size configuration and the result memo behind a single
//! reader/writer lock, so replacing the configuration and invalidating the memo
//! happen in the same critical section.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::cache::{CacheKey, ShipmentCache};
use crate::model::{PackSizes, Shipment, ValidationError};
use crate::optimizer::{OptimizeError, optimize};

#[derive(Debug)]
struct CalculatorState {
    pack_sizes: PackSizes,
    cache: ShipmentCache,
}

/// Thread-safe pack calculator shared by all request handlers.
#[derive(Debug)]
pub struct PackCalculator {
    state: RwLock<CalculatorState>,
}

impl PackCalculator {
    /// Creates a calculator with the given configuration and memo capacity.
    pub fn new(pack_sizes: PackSizes, cache_capacity: usize) -> Self {
        info!(%pack_sizes, cache_capacity, "Pack calculator initialised");
        Self {
            state: RwLock::new(CalculatorState {
                pack_sizes,
                cache: ShipmentCache::new(cache_capacity),
            }),
        }
    }

    /// Validates and installs new pack sizes.
    ///
    /// On failure the previous configuration stays active and the memo is kept.
    ///
    /// # Returns
    /// The stored sizes, sorted largest first
    pub fn set_pack_sizes(&self, sizes: Vec<i64>) -> Result<PackSizes, ValidationError> {
        let pack_sizes = PackSizes::new(sizes)?;

        let mut state = self.state.write();
        let dropped = state.cache.len();
        state.pack_sizes = pack_sizes.clone();
        state.cache.clear();
        drop(state);

        info!(%pack_sizes, dropped_results = dropped, "Pack sizes updated");
        Ok(pack_sizes)
    }

    /// Returns a snapshot of the active pack sizes.
    pub fn pack_sizes(&self) -> PackSizes {
        self.state.read().pack_sizes.clone()
    }

    /// Calculates the shipment for `order_size` under the active configuration.
    ///
    /// Results are memoised per `(order_size, pack sizes)`. The search itself
    /// runs without holding the lock; its result is only stored if the
    /// configuration has not changed in the meantime.
    pub fn calculate(&self, order_size: i64) -> Result<Arc<Shipment>, OptimizeError> {
        let key = {
            let state = self.state.read();
            let key = CacheKey::new(order_size, state.pack_sizes.clone());
            if let Some(cached) = state.cache.get(&key) {
                debug!(order_size, "Cache hit");
                return Ok(cached);
            }
            key
        };

        debug!(order_size, pack_sizes = %key.pack_sizes, "Cache miss");
        let shipment = Arc::new(optimize(order_size, &key.pack_sizes)?);
        self.store(key, Arc::clone(&shipment));

        Ok(shipment)
    }

    /// Memoises `shipment` unless the pack sizes in `key` are no longer active.
    fn store(&self, key: CacheKey, shipment: Arc<Shipment>) {
        let mut state = self.state.write();
        if state.pack_sizes != key.pack_sizes {
            debug!(
                order_size = key.order_size,
                "Pack sizes changed during search, result not cached"
            );
            return;
        }
        state.cache.insert(key, shipment);
    }

    /// Number of memoised results.
    pub fn cache_len(&self) -> usize {
        self.state.read().cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::thread;

    fn calculator(sizes: &[i64]) -> PackCalculator {
        PackCalculator::new(PackSizes::new(sizes.to_vec()).unwrap(), 16)
    }

    #[test]
    fn new_calculator_sorts_sizes_descending() {
        let calc = calculator(&[250, 500, 1000]);
        assert_eq!(calc.pack_sizes().to_vec(), vec![1000, 500, 250]);
    }

    #[test]
    fn set_and_get_pack_sizes() {
        let calc = calculator(&[250]);
        let stored = calc.set_pack_sizes(vec![100, 200, 300]).unwrap();
        assert_eq!(stored.to_vec(), vec![300, 200, 100]);
        assert_eq!(calc.pack_sizes().to_vec(), vec![300, 200, 100]);
    }

    #[test]
    fn invalid_sizes_keep_previous_configuration() {
        let calc = calculator(&[250, 500, 1000]);
        calc.calculate(600).unwrap();

        let err = calc.set_pack_sizes(vec![100, -50, 300]).unwrap_err();
        assert_eq!(err, ValidationError::NonPositive(-50));
        assert_eq!(calc.pack_sizes().to_vec(), vec![1000, 500, 250]);
        assert_eq!(calc.cache_len(), 1);

        assert_eq!(
            calc.set_pack_sizes(Vec::new()).unwrap_err(),
            ValidationError::Empty
        );
        assert_eq!(calc.pack_sizes().to_vec(), vec![1000, 500, 250]);
    }

    #[test]
    fn repeated_calculation_is_served_from_cache() {
        let calc = calculator(&[250, 500, 1000]);
        let first = calc.calculate(500).unwrap();
        let second = calc.calculate(500).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calc.cache_len(), 1);
    }

    #[test]
    fn changing_sizes_invalidates_cache() {
        let calc = calculator(&[250, 500, 1000, 2000, 5000]);
        let before = calc.calculate(500).unwrap();
        assert_eq!(before.packs, BTreeMap::from([(500, 1)]));

        calc.set_pack_sizes(vec![100, 200]).unwrap();
        assert_eq!(calc.cache_len(), 0);

        let after = calc.calculate(500).unwrap();
        assert_ne!(before.packs, after.packs);
        assert_eq!(after.total_items, 500);
        assert_eq!(after.total_packs, 3);
    }

    #[test]
    fn reinstating_sizes_recomputes_under_new_snapshot() {
        let calc = calculator(&[250, 500]);
        let first = calc.calculate(750).unwrap();
        calc.set_pack_sizes(vec![750]).unwrap();
        calc.set_pack_sizes(vec![500, 250]).unwrap();
        let second = calc.calculate(750).unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
    }

    #[test]
    fn edge_case_with_coprime_sizes() {
        let calc = calculator(&[23, 31, 53]);
        let result = calc.calculate(500_000).unwrap();
        assert_eq!(
            result.packs,
            BTreeMap::from([(23, 2), (31, 7), (53, 9429)])
        );
        assert_eq!(result.total_items, 500_000);
    }

    #[test]
    fn non_positive_orders_return_empty_shipment() {
        let calc = calculator(&[250, 500]);
        assert_eq!(*calc.calculate(0).unwrap(), Shipment::empty());
        assert_eq!(*calc.calculate(-10).unwrap(), Shipment::empty());
    }

    #[test]
    fn concurrent_calculations_agree() {
        let calc = Arc::new(calculator(&[250, 500, 1000, 2000, 5000]));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let calc = Arc::clone(&calc);
                thread::spawn(move || calc.calculate(12001).unwrap())
            })
            .collect();

        for handle in handles {
            let result = handle.join().unwrap();
            assert_eq!(result.total_items, 12250);
            assert_eq!(result.total_packs, 4);
        }
        assert_eq!(calc.cache_len(), 1);
    }

    #[test]
    fn result_for_replaced_sizes_is_not_stored() {
        let calc = calculator(&[250, 500]);
        let stale = CacheKey::new(750, calc.pack_sizes());
        let shipment = Arc::new(optimize(750, &stale.pack_sizes).unwrap());

        calc.set_pack_sizes(vec![300]).unwrap();
        calc.store(stale, Arc::clone(&shipment));
        assert_eq!(calc.cache_len(), 0);

        let current = CacheKey::new(750, calc.pack_sizes());
        calc.store(current, shipment);
        assert_eq!(calc.cache_len(), 1);
    }

    #[test]
    fn cache_only_holds_active_sizes_while_sizes_change() {
        let calc = Arc::new(PackCalculator::new(
            PackSizes::new(vec![23, 31, 53]).unwrap(),
            1024,
        ));

        let workers: Vec<_> = (0..4)
            .map(|worker| {
                let calc = Arc::clone(&calc);
                thread::spawn(move || {
                    for step in 0..25 {
                        let order_size = 50_000 + worker * 100 + step;
                        let result = calc.calculate(order_size).unwrap();
                        assert!(result.total_items >= order_size as u64);
                    }
                })
            })
            .collect();

        let switcher = {
            let calc = Arc::clone(&calc);
            thread::spawn(move || {
                for round in 0..200 {
                    let sizes = if round % 2 == 0 {
                        vec![250, 500, 1000]
                    } else {
                        vec![23, 31, 53]
                    };
                    calc.set_pack_sizes(sizes).unwrap();
                    thread::yield_now();
                }
            })
        };

        for worker in workers {
            worker.join().unwrap();
        }
        switcher.join().unwrap();

        let state = calc.state.read();
        for key in state.cache.keys() {
            assert_eq!(key.pack_sizes, state.pack_sizes);
        }
    }
}
