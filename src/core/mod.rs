pub mod event_bus;
pub mod world_manager;

pub use event_bus::{ChunkLoaded, ChunkUnloaded, EventBus, OriginShifted};
pub use world_manager::{TerrainWorld, TickReport};
