//! Player snapshots and the save hook.
//!
//! The storage format belongs to the host. This module defines what gets
//! handed over ([`PlayerSnapshot`]) and the hook it is handed to
//! ([`SnapshotSink`]). Saving is fire-and-forget from the service's side:
//! a failed save is logged and never fails the operation that caused it.

use crate::calculator::HeroBaseStats;
use crate::equipment::Equipment;
use crate::error::SaveError;
use crate::ids::{ClassId, HeroKey};
use crate::inventory::InventoryStore;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Everything needed to restore one hero's gear state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub hero: HeroKey,
    #[serde(default)]
    pub class_id: Option<ClassId>,
    pub base_stats: HeroBaseStats,
    pub inventory: InventoryStore,
    pub equipment: Equipment,
}

impl PlayerSnapshot {
    pub fn to_json(&self) -> Result<String, SaveError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SaveError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Receives a snapshot after every successful mutation.
pub trait SnapshotSink: Send {
    fn save(&mut self, snapshot: &PlayerSnapshot) -> Result<(), SaveError>;
}

/// Sink that keeps every snapshot in memory.
///
/// Clones share storage, so a caller can keep a handle and inspect what
/// the service saved.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    saved: Arc<Mutex<Vec<PlayerSnapshot>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved(&self) -> Vec<PlayerSnapshot> {
        match self.saved.lock() {
            Ok(saved) => saved.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn latest(&self) -> Option<PlayerSnapshot> {
        self.saved().pop()
    }
}

impl SnapshotSink for MemorySink {
    fn save(&mut self, snapshot: &PlayerSnapshot) -> Result<(), SaveError> {
        self.saved
            .lock()
            .map_err(|_| SaveError::Backend("snapshot store poisoned".to_string()))?
            .push(snapshot.clone());
        Ok(())
    }
}
