use std::{
    collections::HashMap,
    fmt::Display,
    hash::Hash,
    sync::{
        Arc, OnceLock,
        atomic::{AtomicUsize, Ordering},
    },
};

use parking_lot::Mutex;

use crate::Error;

/// A publish-once cell shared by every caller of one key.
struct Slot<V> {
    cell: OnceLock<Result<Arc<V>, Error>>,
}

impl<V> Default for Slot<V> {
    fn default() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }
}

/// Keyed cache that runs at most one generation per key at a time.
///
/// The map lock is held only to find or insert a slot. Callers then block
/// on the slot's `OnceLock` until the first caller publishes. A failure is
/// handed to every waiter of that slot and the slot is dropped, so a later
/// call generates again.
pub(crate) struct SingleFlight<K, V> {
    slots: Mutex<HashMap<K, Arc<Slot<V>>>>,
    generations: AtomicUsize,
}

impl<K, V> Default for SingleFlight<K, V> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            generations: AtomicUsize::new(0),
        }
    }
}

impl<K, V> SingleFlight<K, V>
where
    K: Copy + Eq + Hash + Display,
    V: PartialEq,
{
    /// Returns the published value for `key`, generating it on a miss.
    pub(crate) fn get_or_generate<F>(&self, key: K, generate: F) -> Result<Arc<V>, Error>
    where
        F: FnOnce() -> Result<V, Error>,
    {
        let slot = self.slot(key);

        let result = slot.cell.get_or_init(|| {
            self.generations.fetch_add(1, Ordering::Relaxed);
            log::info!("cache miss for {key}, generating");
            generate().map(Arc::new)
        });

        if result.is_err() {
            self.remove_if_current(key, &slot);
        }
        result.clone()
    }

    /// Returns the published value for `key`, if any.
    pub(crate) fn get(&self, key: K) -> Option<Arc<V>> {
        let slot = self.slots.lock().get(&key).cloned()?;
        match slot.cell.get() {
            Some(Ok(value)) => Some(Arc::clone(value)),
            _ => None,
        }
    }

    /// Publishes an externally produced value.
    ///
    /// Blocks while a generation of the same key is in flight. An equal
    /// value already present is returned instead.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CacheKeyCollision`] if a different value is already
    /// published under `key`.
    pub(crate) fn preload(&self, key: K, value: V) -> Result<Arc<V>, Error> {
        let value = Arc::new(value);
        loop {
            let slot = self.slot(key);
            if slot.cell.set(Ok(Arc::clone(&value))).is_ok() {
                log::debug!("preloaded {key}");
                return Ok(value);
            }

            match slot.cell.get() {
                Some(Ok(existing)) if **existing == *value => return Ok(Arc::clone(existing)),
                Some(Ok(_)) => {
                    log::warn!("preload of {key} conflicts with the cached table");
                    return Err(Error::CacheKeyCollision {
                        key: key.to_string(),
                        reason: "a different table is already cached".into(),
                    });
                }
                // A failed generation leaves its slot behind only briefly.
                _ => self.remove_if_current(key, &slot),
            }
        }
    }

    /// Drops `key`, returning whether it was present.
    ///
    /// Callers already holding the value or waiting on its generation are
    /// unaffected.
    pub(crate) fn evict(&self, key: K) -> bool {
        self.slots.lock().remove(&key).is_some()
    }

    pub(crate) fn clear(&self) {
        self.slots.lock().clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.lock().len()
    }

    /// Number of generations started so far.
    pub(crate) fn generations(&self) -> usize {
        self.generations.load(Ordering::Relaxed)
    }

    fn slot(&self, key: K) -> Arc<Slot<V>> {
        Arc::clone(self.slots.lock().entry(key).or_default())
    }

    fn remove_if_current(&self, key: K, slot: &Arc<Slot<V>>) {
        let mut slots = self.slots.lock();
        if slots.get(&key).is_some_and(|current| Arc::ptr_eq(current, slot)) {
            slots.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::{thread, time::Duration};

    use crate::key::SoilId;

    fn failure() -> Error {
        Error::numerical("soil1", "boom")
    }

    #[test]
    fn generates_once_per_key() {
        let cache = SingleFlight::<SoilId, u32>::default();
        assert_eq!(cache.get_or_generate(SoilId(1), || Ok(10)).as_deref(), Ok(&10));
        assert_eq!(cache.get_or_generate(SoilId(1), || Ok(20)).as_deref(), Ok(&10));
        assert_eq!(cache.get_or_generate(SoilId(2), || Ok(30)).as_deref(), Ok(&30));
        assert_eq!(cache.generations(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn concurrent_callers_share_one_generation() {
        let cache = SingleFlight::<SoilId, u32>::default();
        let results: Vec<_> = thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        cache.get_or_generate(SoilId(1), || {
                            thread::sleep(Duration::from_millis(20));
                            Ok(7)
                        })
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("thread completes"))
                .collect()
        });

        assert_eq!(cache.generations(), 1);
        let first = results[0].as_ref().expect("generated");
        for result in &results {
            assert!(Arc::ptr_eq(first, result.as_ref().expect("generated")));
        }
    }

    #[test]
    fn failures_are_not_cached() {
        let cache = SingleFlight::<SoilId, u32>::default();
        assert_eq!(cache.get_or_generate(SoilId(1), || Err(failure())), Err(failure()));
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.get_or_generate(SoilId(1), || Ok(3)).as_deref(), Ok(&3));
        assert_eq!(cache.generations(), 2);
    }

    #[test]
    fn preload_detects_conflicts() {
        let cache = SingleFlight::<SoilId, u32>::default();
        assert_eq!(cache.preload(SoilId(1), 5).as_deref(), Ok(&5));
        assert_eq!(cache.preload(SoilId(1), 5).as_deref(), Ok(&5));
        assert!(matches!(
            cache.preload(SoilId(1), 6),
            Err(Error::CacheKeyCollision { .. })
        ));
        assert_eq!(cache.get_or_generate(SoilId(1), || Ok(9)).as_deref(), Ok(&5));
        assert_eq!(cache.generations(), 0);
    }

    #[test]
    fn evict_forces_regeneration() {
        let cache = SingleFlight::<SoilId, u32>::default();
        cache.get_or_generate(SoilId(1), || Ok(1)).expect("generated");
        assert!(cache.evict(SoilId(1)));
        assert!(!cache.evict(SoilId(1)));
        assert_eq!(cache.get(SoilId(1)), None);
        assert_eq!(cache.get_or_generate(SoilId(1), || Ok(2)).as_deref(), Ok(&2));
        assert_eq!(cache.generations(), 2);

        cache.clear();
        assert_eq!(cache.len(), 0);
    }
}
