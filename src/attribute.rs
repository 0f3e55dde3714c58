//! Attribute kinds and attribute maps.
//!
//! Attributes form a closed enumeration. Every lookup goes through
//! [`AttributeKind`], so there is no "unrecognized attribute" path: a name
//! either parses into a kind or is rejected at the boundary.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumIter, EnumString};

/// Numeric type used for all attribute values.
pub type StatValue = f64;

/// Every attribute the core knows about.
///
/// # Examples
///
/// ```rust
/// use zzgear::AttributeKind;
/// use std::str::FromStr;
///
/// assert_eq!(AttributeKind::from_str("strength").unwrap(), AttributeKind::Strength);
/// assert_eq!(AttributeKind::Leadership.to_string(), "leadership");
/// assert!(!AttributeKind::Leadership.is_allocatable());
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum AttributeKind {
    Strength,
    Dexterity,
    Armor,
    Vitality,
    /// Derived from a constant plus armor-slot contributions; never a base stat.
    Leadership,
}

impl AttributeKind {
    /// Attributes that live in hero base stats and accept attribute points.
    pub const ALLOCATABLE: [AttributeKind; 4] = [
        AttributeKind::Strength,
        AttributeKind::Dexterity,
        AttributeKind::Armor,
        AttributeKind::Vitality,
    ];

    /// Whether unspent attribute points can be put into this attribute.
    pub fn is_allocatable(self) -> bool {
        !matches!(self, AttributeKind::Leadership)
    }
}

/// Sparse map from attribute kind to value.
///
/// Missing entries read as `0.0`.
///
/// # Examples
///
/// ```rust
/// use zzgear::{AttributeKind, AttributeMap};
///
/// let mut map = AttributeMap::new();
/// map.add(AttributeKind::Strength, 5.0);
/// map.add(AttributeKind::Strength, 2.0);
/// assert_eq!(map.get(AttributeKind::Strength), 7.0);
/// assert_eq!(map.get(AttributeKind::Armor), 0.0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeMap(BTreeMap<AttributeKind, StatValue>);

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: AttributeKind) -> StatValue {
        self.0.get(&kind).copied().unwrap_or(0.0)
    }

    /// Returns the stored entry, distinguishing "absent" from zero.
    pub fn entry(&self, kind: AttributeKind) -> Option<StatValue> {
        self.0.get(&kind).copied()
    }

    pub fn set(&mut self, kind: AttributeKind, value: StatValue) {
        self.0.insert(kind, value);
    }

    /// Adds `value` to the existing entry (or to zero).
    pub fn add(&mut self, kind: AttributeKind, value: StatValue) {
        *self.0.entry(kind).or_insert(0.0) += value;
    }

    pub fn remove(&mut self, kind: AttributeKind) -> Option<StatValue> {
        self.0.remove(&kind)
    }

    /// Adds every entry of `other` into `self`.
    pub fn merge_add(&mut self, other: &AttributeMap) {
        for (kind, value) in other.iter() {
            self.add(kind, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (AttributeKind, StatValue)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl FromIterator<(AttributeKind, StatValue)> for AttributeMap {
    fn from_iter<I: IntoIterator<Item = (AttributeKind, StatValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
