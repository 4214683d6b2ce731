// src/terrain/terrain_error.rs
use thiserror::Error;

use crate::config::config_manager::ConfigurationError;
use crate::terrain::chunk_position::ChunkPosition;

/// Errors surfaced by the terrain streaming core.
#[derive(Debug, Error)]
pub enum TerrainError {
    /// A coordinate lookup found no resident chunk.
    #[error("no resident chunk at {0}")]
    ChunkNotFound(ChunkPosition),

    /// Height field or mesh generation failed for one chunk.
    #[error("generation failed for chunk {position}: {reason}")]
    Generation {
        position: ChunkPosition,
        reason: String,
    },

    #[error("height field has {actual} interior samples, expected {expected}")]
    InvalidHeightField { expected: usize, actual: usize },

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Config(#[from] ConfigurationError),
}

pub type TerrainResult<T> = Result<T, TerrainError>;
