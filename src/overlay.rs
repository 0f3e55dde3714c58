//! Temporary attribute overlay for respec previews.
//!
//! The overlay stores proposed absolute values per hero and attribute. It
//! never touches committed base stats; clearing it abandons the preview.
//! Only increases above `base + equipment` cost points. Point accounting is
//! recomputed from scratch on every call, so the order in which entries
//! were edited does not matter.

use crate::attribute::{AttributeKind, AttributeMap, StatValue};
use crate::calculator::HeroBaseStats;
use crate::error::GearError;
use crate::ids::HeroKey;
use std::collections::HashMap;

/// Per-hero preview values.
///
/// # Examples
///
/// ```rust
/// use zzgear::calculator::HeroBaseStats;
/// use zzgear::overlay::TempOverlay;
/// use zzgear::{AttributeKind, AttributeMap, HeroKey};
///
/// let hero = HeroKey::new("mage");
/// let base = HeroBaseStats { strength: 10.0, attribute_points: 5, ..Default::default() };
/// let bonuses = AttributeMap::new();
///
/// let mut overlay = TempOverlay::new();
/// overlay.apply_temp_change(&hero, AttributeKind::Strength, 13.0).unwrap();
/// assert_eq!(overlay.available_points(&hero, &base, &bonuses), 2.0);
///
/// overlay.clear_temp_changes(&hero);
/// assert_eq!(overlay.available_points(&hero, &base, &bonuses), 5.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TempOverlay {
    entries: HashMap<HeroKey, AttributeMap>,
}

impl TempOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert the proposed absolute value of `kind` for `hero`.
    pub fn apply_temp_change(
        &mut self,
        hero: &HeroKey,
        kind: AttributeKind,
        proposed: StatValue,
    ) -> Result<(), GearError> {
        if !kind.is_allocatable() {
            return Err(GearError::NotAllocatable(kind));
        }
        self.entries
            .entry(hero.clone())
            .or_default()
            .set(kind, proposed);
        tracing::debug!(%hero, attribute = %kind, proposed, "preview value set");
        Ok(())
    }

    /// Discard every preview entry for `hero`. Returns whether any existed.
    pub fn clear_temp_changes(&mut self, hero: &HeroKey) -> bool {
        self.entries.remove(hero).is_some_and(|map| !map.is_empty())
    }

    pub fn get(&self, hero: &HeroKey) -> Option<&AttributeMap> {
        self.entries.get(hero).filter(|map| !map.is_empty())
    }

    pub fn has_changes(&self, hero: &HeroKey) -> bool {
        self.get(hero).is_some()
    }

    /// Points consumed by the preview: the sum of every increase above
    /// `base + equipment`. Decreases cost nothing and refund nothing.
    pub fn spent_points(&self, hero: &HeroKey, base: &HeroBaseStats, bonuses: &AttributeMap) -> StatValue {
        self.get(hero)
            .map(|map| {
                map.iter()
                    .map(|(kind, proposed)| {
                        let floor = base.get(kind) + bonuses.get(kind);
                        (proposed - floor).max(0.0)
                    })
                    .sum()
            })
            .unwrap_or(0.0)
    }

    /// Unspent points left after the preview. Negative when the preview
    /// proposes more than the hero can afford.
    pub fn available_points(&self, hero: &HeroKey, base: &HeroBaseStats, bonuses: &AttributeMap) -> StatValue {
        StatValue::from(base.attribute_points) - self.spent_points(hero, base, bonuses)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
