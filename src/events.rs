//! Change events and a synchronous publish/subscribe bus.
//!
//! Listeners run on the publisher's call stack, in subscription order.

use crate::equipment::EquipmentSlot;
use crate::ids::HeroKey;
use crate::item::ItemInstance;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Something that changed for one hero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GearEvent {
    Equipped {
        hero: HeroKey,
        slot: EquipmentSlot,
        item: ItemInstance,
        previous: Option<ItemInstance>,
    },
    Unequipped {
        hero: HeroKey,
        slot: EquipmentSlot,
        item: ItemInstance,
    },
    /// Two equipment slots exchanged occupants.
    Swapped {
        hero: HeroKey,
        first: EquipmentSlot,
        second: EquipmentSlot,
    },
    InventoryChanged {
        hero: HeroKey,
    },
    CacheInvalidated {
        hero: HeroKey,
    },
}

/// Coarse event classification, for listeners that filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Equipment,
    Inventory,
    Cache,
}

impl GearEvent {
    pub fn hero(&self) -> &HeroKey {
        match self {
            GearEvent::Equipped { hero, .. }
            | GearEvent::Unequipped { hero, .. }
            | GearEvent::Swapped { hero, .. }
            | GearEvent::InventoryChanged { hero }
            | GearEvent::CacheInvalidated { hero } => hero,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            GearEvent::Equipped { .. } | GearEvent::Unequipped { .. } | GearEvent::Swapped { .. } => {
                EventKind::Equipment
            }
            GearEvent::InventoryChanged { .. } => EventKind::Inventory,
            GearEvent::CacheInvalidated { .. } => EventKind::Cache,
        }
    }
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&GearEvent) + Send>;

/// Synchronous event bus.
///
/// # Examples
///
/// ```rust
/// use zzgear::events::{EventBus, GearEvent};
/// use zzgear::HeroKey;
/// use std::sync::{Arc, Mutex};
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let sink = Arc::clone(&seen);
///
/// let mut bus = EventBus::new();
/// let id = bus.subscribe(move |event| sink.lock().unwrap().push(event.clone()));
///
/// bus.publish(&GearEvent::InventoryChanged { hero: HeroKey::new("a") });
/// assert!(bus.unsubscribe(id));
/// bus.publish(&GearEvent::InventoryChanged { hero: HeroKey::new("a") });
///
/// assert_eq!(seen.lock().unwrap().len(), 1);
/// ```
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<(ListenerId, Listener)>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&GearEvent) + Send + 'static,
    {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns whether it was subscribed.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    pub fn publish(&mut self, event: &GearEvent) {
        if self.listeners.is_empty() {
            tracing::trace!(kind = ?event.kind(), "no listeners for event");
            return;
        }
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_listeners_run_in_subscription_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();
        for tag in ["first", "second"] {
            let order = Arc::clone(&order);
            bus.subscribe(move |_| order.lock().unwrap().push(tag));
        }
        bus.publish(&GearEvent::CacheInvalidated {
            hero: HeroKey::new("h"),
        });
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_unsubscribe_unknown_id() {
        let mut bus = EventBus::new();
        let id = bus.subscribe(|_| {});
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn test_event_accessors() {
        let event = GearEvent::Swapped {
            hero: HeroKey::new("h"),
            first: EquipmentSlot::Gloves,
            second: EquipmentSlot::Boots,
        };
        assert_eq!(event.hero().as_str(), "h");
        assert_eq!(event.kind(), EventKind::Equipment);
    }
}
