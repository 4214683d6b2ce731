// Export all components from the terrain module
pub mod chunk_manager;
pub mod chunk_position;
pub mod floating_origin;
pub mod height_field;
pub mod height_query;
pub mod mesh_builder;
pub mod noise;
pub mod terrain_chunk;
pub mod terrain_config;
pub mod terrain_error;

// Re-export main types for easier access
pub use chunk_manager::{StreamingController, StreamingStats, TickOutcome};
pub use chunk_position::ChunkPosition;
pub use floating_origin::{FloatingOriginRebaser, OriginShift};
pub use height_field::{HeightField, HeightFieldGenerator};
pub use mesh_builder::{LodMesh, MeshBuilder, map_border_index};
pub use terrain_chunk::{ChunkSurface, ChunkTransform, TerrainChunk};
pub use terrain_config::TerrainConfig;
pub use terrain_error::{TerrainError, TerrainResult};
