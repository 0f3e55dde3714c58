//! Class modifier bundles.
//!
//! Class definitions live outside this crate. What the calculator consumes
//! is a [`ClassModifiers`] bundle: per-attribute modifiers grouped into
//! phases. Phases run in order (additive, multiplicative, final); within a
//! phase, modifiers run in registration order, except clamps, which combine
//! into the most restrictive bounds before being applied once.

use crate::attribute::{AttributeKind, StatValue};
use crate::ids::ClassId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Phase a modifier is applied in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierPhase {
    /// Flat additions, applied first.
    Additive,
    /// Scaling, applied after every addition.
    Multiplicative,
    /// Caps and floors, applied last.
    Final,
}

/// A single modifier operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierOp {
    Add(StatValue),
    Multiply(StatValue),
    ClampMin(StatValue),
    ClampMax(StatValue),
}

impl ModifierOp {
    pub fn phase(self) -> ModifierPhase {
        match self {
            ModifierOp::Add(_) => ModifierPhase::Additive,
            ModifierOp::Multiply(_) => ModifierPhase::Multiplicative,
            ModifierOp::ClampMin(_) | ModifierOp::ClampMax(_) => ModifierPhase::Final,
        }
    }

    fn description(self) -> String {
        match self {
            ModifierOp::Add(v) => format!("{v:+}"),
            ModifierOp::Multiply(v) => format!("×{v:.2}"),
            ModifierOp::ClampMin(v) => format!("min {v}"),
            ModifierOp::ClampMax(v) => format!("max {v}"),
        }
    }
}

/// One modifier targeting one attribute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassModifier {
    pub target: AttributeKind,
    pub op: ModifierOp,
}

/// Modifier bundle supplied by a class definition.
///
/// # Examples
///
/// ```rust
/// use zzgear::class::ClassModifiers;
/// use zzgear::AttributeKind;
///
/// let warrior = ClassModifiers::new()
///     .add(AttributeKind::Strength, 5.0)
///     .multiply(AttributeKind::Strength, 2.0)
///     .clamp_max(AttributeKind::Strength, 40.0);
///
/// let mut trail = Vec::new();
/// // (10 + 5) * 2 = 30, under the cap
/// assert_eq!(warrior.apply(AttributeKind::Strength, 10.0, &mut trail), 30.0);
/// // (20 + 5) * 2 = 50, capped at 40
/// assert_eq!(warrior.apply(AttributeKind::Strength, 20.0, &mut trail), 40.0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassModifiers {
    #[serde(default)]
    pub modifiers: Vec<ClassModifier>,
}

impl ClassModifiers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, target: AttributeKind, op: ModifierOp) -> Self {
        self.modifiers.push(ClassModifier { target, op });
        self
    }

    pub fn add(self, target: AttributeKind, value: StatValue) -> Self {
        self.with(target, ModifierOp::Add(value))
    }

    pub fn multiply(self, target: AttributeKind, factor: StatValue) -> Self {
        self.with(target, ModifierOp::Multiply(factor))
    }

    pub fn clamp_min(self, target: AttributeKind, min: StatValue) -> Self {
        self.with(target, ModifierOp::ClampMin(min))
    }

    pub fn clamp_max(self, target: AttributeKind, max: StatValue) -> Self {
        self.with(target, ModifierOp::ClampMax(max))
    }

    pub fn is_empty(&self) -> bool {
        self.modifiers.is_empty()
    }

    /// Apply every modifier targeting `kind` to `value`.
    ///
    /// Each applied step is appended to `trail` as
    /// `(description, value_after_step)`.
    pub fn apply(
        &self,
        kind: AttributeKind,
        value: StatValue,
        trail: &mut Vec<(String, StatValue)>,
    ) -> StatValue {
        let mut ops: Vec<ModifierOp> = self
            .modifiers
            .iter()
            .filter(|m| m.target == kind)
            .map(|m| m.op)
            .collect();
        if ops.is_empty() {
            return value;
        }
        // Stable: registration order survives within a phase.
        ops.sort_by_key(|op| op.phase());

        let mut current = value;
        let mut min_bound: Option<StatValue> = None;
        let mut max_bound: Option<StatValue> = None;
        for op in ops {
            match op {
                ModifierOp::Add(v) => current += v,
                ModifierOp::Multiply(f) => current *= f,
                ModifierOp::ClampMin(v) => {
                    min_bound = Some(min_bound.map_or(v, |m| m.max(v)));
                    continue;
                }
                ModifierOp::ClampMax(v) => {
                    max_bound = Some(max_bound.map_or(v, |m| m.min(v)));
                    continue;
                }
            }
            trail.push((op.description(), current));
        }

        if min_bound.is_some() || max_bound.is_some() {
            if let Some(min) = min_bound {
                current = current.max(min);
            }
            if let Some(max) = max_bound {
                current = current.min(max);
            }
            let label = match (min_bound, max_bound) {
                (Some(min), Some(max)) => format!("clamp {min}..{max}"),
                (Some(min), None) => format!("min {min}"),
                (None, Some(max)) => format!("max {max}"),
                (None, None) => String::new(),
            };
            trail.push((label, current));
        }
        current
    }
}

/// Resolves class ids to modifier bundles.
pub trait ClassProvider: Send + Sync {
    /// Modifiers for `class_id`, or `None` if the class has none.
    fn class_modifiers(&self, class_id: &ClassId) -> Option<&ClassModifiers>;
}

/// In-memory class table.
#[derive(Debug, Clone, Default)]
pub struct MemoryClassProvider {
    classes: HashMap<ClassId, ClassModifiers>,
}

impl MemoryClassProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, class_id: impl Into<ClassId>, modifiers: ClassModifiers) {
        self.classes.insert(class_id.into(), modifiers);
    }
}

impl ClassProvider for MemoryClassProvider {
    fn class_modifiers(&self, class_id: &ClassId) -> Option<&ClassModifiers> {
        self.classes.get(class_id)
    }
}
