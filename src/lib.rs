pub mod config;
pub mod core;
pub mod terrain;
pub mod threading;
pub mod utils;

pub use config::{ConfigurationError, ConfigurationManager, StreamingConfiguration};
pub use crate::core::{EventBus, TerrainWorld, TickReport};
pub use terrain::{ChunkPosition, TerrainChunk, TerrainConfig, TerrainError, TerrainResult};
