//! Attribute calculation.
//!
//! [`calculate`] is a pure function from a hero's inputs to a
//! [`CalculatedAttributes`] bundle. For each attribute:
//!
//! ```text
//! base + equipment bonus + overlay delta → class modifiers → value
//! ```
//!
//! The overlay holds absolute proposed values. It is folded in as a delta,
//! `proposed - (base + equipment)`, so class modifiers always see the
//! proposed total regardless of how it was reached.
//!
//! Leadership is not a base stat: it starts from a configured constant and
//! only armor slots add to it (see [`Equipment::aggregate_bonuses`]).
//!
//! [`Equipment::aggregate_bonuses`]: crate::equipment::Equipment::aggregate_bonuses

use crate::attribute::{AttributeKind, AttributeMap, StatValue};
use crate::class::ClassModifiers;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::IntoEnumIterator;

/// Raw, committed hero attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeroBaseStats {
    pub strength: StatValue,
    pub dexterity: StatValue,
    pub armor: StatValue,
    pub vitality: StatValue,
    /// Unspent points available for allocation.
    pub attribute_points: u32,
}

impl HeroBaseStats {
    /// Base value of an attribute. Leadership has no base value here.
    pub fn get(&self, kind: AttributeKind) -> StatValue {
        match kind {
            AttributeKind::Strength => self.strength,
            AttributeKind::Dexterity => self.dexterity,
            AttributeKind::Armor => self.armor,
            AttributeKind::Vitality => self.vitality,
            AttributeKind::Leadership => 0.0,
        }
    }
}

/// Final value of one attribute with the steps that produced it.
///
/// `sources` lists the additive inputs in the order they were summed;
/// `modifiers` lists each class modifier step as
/// `(description, value_after_step)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeBreakdown {
    pub kind: AttributeKind,
    pub value: StatValue,
    pub sources: Vec<(String, StatValue)>,
    pub modifiers: Vec<(String, StatValue)>,
}

impl AttributeBreakdown {
    pub fn new(kind: AttributeKind) -> Self {
        Self {
            kind,
            value: 0.0,
            sources: Vec::new(),
            modifiers: Vec::new(),
        }
    }

    pub fn add_source(&mut self, description: impl Into<String>, value: StatValue) {
        self.sources.push((description.into(), value));
    }

    /// Sum of all additive sources, before class modifiers.
    pub fn pre_modifier_total(&self) -> StatValue {
        self.sources.iter().map(|(_, v)| v).sum()
    }
}

/// Derived attributes for one hero.
///
/// # Examples
///
/// ```rust
/// use zzgear::calculator::{calculate, HeroBaseStats};
/// use zzgear::{AttributeKind, AttributeMap};
///
/// let base = HeroBaseStats { strength: 10.0, ..Default::default() };
/// let mut bonuses = AttributeMap::new();
/// bonuses.add(AttributeKind::Strength, 4.0);
/// bonuses.add(AttributeKind::Leadership, 30.0);
///
/// let calc = calculate(&base, &bonuses, None, None, 700.0);
/// assert_eq!(calc.get(AttributeKind::Strength), 14.0);
/// assert_eq!(calc.get(AttributeKind::Leadership), 730.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatedAttributes {
    values: AttributeMap,
    breakdowns: BTreeMap<AttributeKind, AttributeBreakdown>,
    /// Unspent attribute points at the time of calculation.
    pub attribute_points: u32,
}

impl CalculatedAttributes {
    pub fn get(&self, kind: AttributeKind) -> StatValue {
        self.values.get(kind)
    }

    pub fn values(&self) -> &AttributeMap {
        &self.values
    }

    pub fn breakdown(&self, kind: AttributeKind) -> Option<&AttributeBreakdown> {
        self.breakdowns.get(&kind)
    }

    pub fn leadership(&self) -> StatValue {
        self.get(AttributeKind::Leadership)
    }
}

/// Compute derived attributes from a hero's inputs.
///
/// `bonuses` must already exclude weapon leadership, which is what
/// [`Equipment::aggregate_bonuses`](crate::equipment::Equipment::aggregate_bonuses)
/// produces. Overlay entries for non-allocatable attributes are ignored.
pub fn calculate(
    base: &HeroBaseStats,
    bonuses: &AttributeMap,
    overlay: Option<&AttributeMap>,
    class: Option<&ClassModifiers>,
    leadership_base: StatValue,
) -> CalculatedAttributes {
    let mut values = AttributeMap::new();
    let mut breakdowns = BTreeMap::new();

    for kind in AttributeKind::iter() {
        let mut breakdown = AttributeBreakdown::new(kind);

        if kind == AttributeKind::Leadership {
            breakdown.add_source("Base", leadership_base);
        } else {
            breakdown.add_source("Base", base.get(kind));
        }
        let bonus = bonuses.get(kind);
        if bonus != 0.0 {
            breakdown.add_source("Equipment", bonus);
        }

        if kind.is_allocatable() {
            if let Some(proposed) = overlay.and_then(|o| o.entry(kind)) {
                let delta = proposed - breakdown.pre_modifier_total();
                breakdown.add_source("Preview", delta);
            }
        }

        let mut value = breakdown.pre_modifier_total();
        if let Some(class) = class {
            value = class.apply(kind, value, &mut breakdown.modifiers);
        }
        breakdown.value = value;

        values.set(kind, value);
        breakdowns.insert(kind, breakdown);
    }

    CalculatedAttributes {
        values,
        breakdowns,
        attribute_points: base.attribute_points,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> HeroBaseStats {
        HeroBaseStats {
            strength: 10.0,
            dexterity: 8.0,
            armor: 5.0,
            vitality: 12.0,
            attribute_points: 5,
        }
    }

    #[test]
    fn test_base_plus_equipment() {
        let mut bonuses = AttributeMap::new();
        bonuses.add(AttributeKind::Armor, 7.0);
        let calc = calculate(&base(), &bonuses, None, None, 700.0);

        assert_eq!(calc.get(AttributeKind::Armor), 12.0);
        assert_eq!(calc.get(AttributeKind::Strength), 10.0);
        assert_eq!(calc.leadership(), 700.0);
        assert_eq!(calc.attribute_points, 5);

        let armor = calc.breakdown(AttributeKind::Armor).unwrap();
        assert_eq!(armor.sources.len(), 2);
        assert_eq!(armor.sources[1], ("Equipment".to_string(), 7.0));
    }

    #[test]
    fn test_overlay_replaces_total() {
        let mut bonuses = AttributeMap::new();
        bonuses.add(AttributeKind::Strength, 2.0);
        let mut overlay = AttributeMap::new();
        overlay.set(AttributeKind::Strength, 15.0);
        overlay.set(AttributeKind::Leadership, 5000.0);

        let calc = calculate(&base(), &bonuses, Some(&overlay), None, 700.0);
        assert_eq!(calc.get(AttributeKind::Strength), 15.0);
        // Leadership cannot be previewed.
        assert_eq!(calc.leadership(), 700.0);
    }

    #[test]
    fn test_class_modifiers_run_after_overlay() {
        let mut overlay = AttributeMap::new();
        overlay.set(AttributeKind::Dexterity, 20.0);
        let class = ClassModifiers::new().multiply(AttributeKind::Dexterity, 1.5);

        let calc = calculate(&base(), &AttributeMap::new(), Some(&overlay), Some(&class), 700.0);
        assert_eq!(calc.get(AttributeKind::Dexterity), 30.0);
        let dex = calc.breakdown(AttributeKind::Dexterity).unwrap();
        assert_eq!(dex.modifiers.len(), 1);
        assert_eq!(dex.pre_modifier_total(), 20.0);
    }

    #[test]
    fn test_leadership_uses_configured_base() {
        let mut bonuses = AttributeMap::new();
        bonuses.add(AttributeKind::Leadership, 70.0);
        let calc = calculate(&base(), &bonuses, None, None, 500.0);
        assert_eq!(calc.leadership(), 570.0);
    }
}
