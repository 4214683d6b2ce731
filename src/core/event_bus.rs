use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use glam::DVec2;

use crate::terrain::chunk_position::ChunkPosition;

// EventBus
//
// Typed publish/subscribe for terrain change notifications. Consumers that keep
// absolute positions (vegetation, markers, debug overlays) listen here instead
// of polling the controller.

// Boxed event handler type
type BoxedHandler = Arc<dyn Fn(&dyn Any) + Send + Sync>;

// Generic event bus for type-safe event handling
pub struct EventBus {
    handlers: Mutex<HashMap<TypeId, Vec<BoxedHandler>>>,
}

impl EventBus {
    pub fn new() -> Self {
        EventBus {
            handlers: Mutex::new(HashMap::new()),
        }
    }

    // A panicking handler must not take the bus down with it
    fn lock(&self) -> MutexGuard<'_, HashMap<TypeId, Vec<BoxedHandler>>> {
        self.handlers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // Subscribe to a specific event type
    pub fn subscribe<T>(&self, handler: Arc<dyn Fn(&T) + Send + Sync + 'static>)
    where
        T: Send + Sync + 'static,
    {
        // Create a type-erased handler
        let boxed_handler: BoxedHandler = Arc::new(move |event: &dyn Any| {
            if let Some(specific_event) = event.downcast_ref::<T>() {
                handler(specific_event);
            }
        });

        self.lock()
            .entry(TypeId::of::<T>())
            .or_default()
            .push(boxed_handler);
    }

    // Publish an event to all relevant handlers
    pub fn publish<T>(&self, event: T)
    where
        T: Send + Sync + 'static,
    {
        // Handlers run outside the lock so they may subscribe or publish themselves
        let event_handlers = self.lock().get(&TypeId::of::<T>()).cloned();
        if let Some(event_handlers) = event_handlers {
            for handler in &event_handlers {
                handler(&event);
            }
        }
    }

    pub fn subscriber_count<T: 'static>(&self) -> usize {
        self.lock().get(&TypeId::of::<T>()).map_or(0, Vec::len)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

// Terrain event types

/// The scene origin moved; every stored scene position must move by `delta`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OriginShifted {
    pub delta: DVec2,
    pub cumulative: DVec2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLoaded {
    pub position: ChunkPosition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkUnloaded {
    pub position: ChunkPosition,
}
