//! Per-hero cache of calculated attributes.
//!
//! Entries are immutable [`Arc`] snapshots. A recompute builds a new bundle
//! and replaces the entry, so a reader holding a snapshot never sees a
//! partial write.
//!
//! Two invalidation paths exist. [`AttributeCache::invalidate`] drops the
//! entry at once, so the next read recomputes. [`AttributeCache::schedule`]
//! leaves the entry in place and arms a debounced recompute; reads keep
//! returning the previous snapshot until the job runs.

use crate::calculator::CalculatedAttributes;
use crate::debounce::Debouncer;
use crate::ids::HeroKey;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cached bundles plus the debounced recompute queue.
///
/// # Examples
///
/// ```rust
/// use zzgear::cache::AttributeCache;
/// use zzgear::calculator::{calculate, HeroBaseStats};
/// use zzgear::{AttributeMap, HeroKey};
/// use std::time::Duration;
///
/// let mut cache = AttributeCache::new(Duration::from_millis(100));
/// let hero = HeroKey::new("knight");
/// let compute = || calculate(&HeroBaseStats::default(), &AttributeMap::new(), None, None, 700.0);
///
/// let first = cache.get_or_compute(&hero, compute);
/// let second = cache.get_or_compute(&hero, compute);
/// assert!(std::sync::Arc::ptr_eq(&first, &second));
/// assert_eq!(cache.recompute_count(&hero), 1);
/// ```
#[derive(Debug)]
pub struct AttributeCache {
    entries: HashMap<HeroKey, Arc<CalculatedAttributes>>,
    recompute: Debouncer<HeroKey>,
    recompute_counts: HashMap<HeroKey, u64>,
}

impl AttributeCache {
    pub fn new(debounce_delay: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            recompute: Debouncer::new(debounce_delay),
            recompute_counts: HashMap::new(),
        }
    }

    /// Cached snapshot, if one is present.
    pub fn get(&self, hero: &HeroKey) -> Option<Arc<CalculatedAttributes>> {
        let hit = self.entries.get(hero).cloned();
        if hit.is_some() {
            tracing::trace!(%hero, "attribute cache hit");
        }
        hit
    }

    /// Return the cached snapshot, computing and storing one on a miss.
    pub fn get_or_compute<F>(&mut self, hero: &HeroKey, compute: F) -> Arc<CalculatedAttributes>
    where
        F: FnOnce() -> CalculatedAttributes,
    {
        match self.get(hero) {
            Some(snapshot) => snapshot,
            None => self.store(hero.clone(), compute()),
        }
    }

    /// Publish a freshly computed bundle, replacing any previous snapshot.
    pub fn store(&mut self, hero: HeroKey, calculated: CalculatedAttributes) -> Arc<CalculatedAttributes> {
        let snapshot = Arc::new(calculated);
        *self.recompute_counts.entry(hero.clone()).or_insert(0) += 1;
        tracing::debug!(%hero, "attributes recomputed");
        self.entries.insert(hero, Arc::clone(&snapshot));
        snapshot
    }

    /// Drop the entry immediately. Any pending debounced recompute is
    /// cancelled, since the next read recomputes anyway.
    ///
    /// Returns whether anything was dropped or cancelled.
    pub fn invalidate(&mut self, hero: &HeroKey) -> bool {
        let dropped = self.entries.remove(hero).is_some();
        let cancelled = self.recompute.cancel(hero);
        dropped || cancelled
    }

    /// Arm (or re-arm) the debounced recompute for `hero`.
    pub fn schedule(&mut self, hero: &HeroKey, now: Instant) {
        self.recompute.schedule(hero.clone(), now);
    }

    /// Heroes whose debounced recompute is due at `now`. They are no
    /// longer pending once returned.
    pub fn take_due(&mut self, now: Instant) -> Vec<HeroKey> {
        self.recompute.poll(now)
    }

    pub fn is_recompute_pending(&self, hero: &HeroKey) -> bool {
        self.recompute.is_pending(hero)
    }

    /// How many times a bundle has been computed and stored for `hero`.
    pub fn recompute_count(&self, hero: &HeroKey) -> u64 {
        self.recompute_counts.get(hero).copied().unwrap_or(0)
    }

    /// Forget everything about `hero`.
    pub fn remove(&mut self, hero: &HeroKey) {
        self.entries.remove(hero);
        self.recompute.cancel(hero);
        self.recompute_counts.remove(hero);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.recompute.clear();
        self.recompute_counts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::{AttributeKind, AttributeMap};
    use crate::calculator::{calculate, HeroBaseStats};

    fn bundle(strength: f64) -> CalculatedAttributes {
        let base = HeroBaseStats {
            strength,
            ..Default::default()
        };
        calculate(&base, &AttributeMap::new(), None, None, 700.0)
    }

    #[test]
    fn test_invalidate_forces_recompute() {
        let mut cache = AttributeCache::new(Duration::from_millis(100));
        let hero = HeroKey::new("a");
        cache.get_or_compute(&hero, || bundle(1.0));
        assert!(cache.invalidate(&hero));
        assert!(cache.get(&hero).is_none());

        let fresh = cache.get_or_compute(&hero, || bundle(2.0));
        assert_eq!(fresh.get(AttributeKind::Strength), 2.0);
        assert_eq!(cache.recompute_count(&hero), 2);
    }

    #[test]
    fn test_schedule_keeps_previous_snapshot() {
        let mut cache = AttributeCache::new(Duration::from_millis(100));
        let hero = HeroKey::new("a");
        let t0 = Instant::now();
        cache.get_or_compute(&hero, || bundle(1.0));

        cache.schedule(&hero, t0);
        assert!(cache.is_recompute_pending(&hero));
        assert_eq!(cache.get(&hero).unwrap().get(AttributeKind::Strength), 1.0);

        assert!(cache.take_due(t0 + Duration::from_millis(50)).is_empty());
        assert_eq!(cache.take_due(t0 + Duration::from_millis(100)), vec![hero.clone()]);
        assert!(!cache.is_recompute_pending(&hero));
    }

    #[test]
    fn test_held_snapshot_survives_replacement() {
        let mut cache = AttributeCache::new(Duration::from_millis(100));
        let hero = HeroKey::new("a");
        let held = cache.get_or_compute(&hero, || bundle(1.0));
        cache.store(hero.clone(), bundle(9.0));
        assert_eq!(held.get(AttributeKind::Strength), 1.0);
        assert_eq!(cache.get(&hero).unwrap().get(AttributeKind::Strength), 9.0);
    }

    #[test]
    fn test_invalidate_cancels_pending_recompute() {
        let mut cache = AttributeCache::new(Duration::from_millis(100));
        let hero = HeroKey::new("a");
        cache.schedule(&hero, Instant::now());
        assert!(cache.invalidate(&hero));
        assert!(!cache.is_recompute_pending(&hero));
        assert!(!cache.invalidate(&hero));
    }
}
