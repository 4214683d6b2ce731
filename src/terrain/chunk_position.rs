// src/terrain/chunk_position.rs
use std::fmt;

use glam::DVec2;
use serde::{Deserialize, Serialize};

// Unique identifier for a chunk on the infinite grid.
// Chunk (x, z) is centred on the absolute world position (x, z) * chunk side length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ChunkPosition {
    pub x: i32,
    pub z: i32,
}

impl ChunkPosition {
    pub const ORIGIN: ChunkPosition = ChunkPosition { x: 0, z: 0 };

    pub const fn new(x: i32, z: i32) -> Self {
        ChunkPosition { x, z }
    }

    /// Maps an absolute horizontal world position to the chunk that owns it.
    ///
    /// Per axis: `sign(v) * ceil(max(|v| - side / 2, 0) / side)`, with zero mapping to zero.
    /// Half-way boundaries belong to the chunk nearer the origin.
    pub fn from_world(world_xz: DVec2, chunk_side_length: f64) -> Self {
        ChunkPosition {
            x: chunk_axis(world_xz.x, chunk_side_length),
            z: chunk_axis(world_xz.y, chunk_side_length),
        }
    }

    /// Absolute world position of the chunk centre.
    pub fn world_center(&self, chunk_side_length: f64) -> DVec2 {
        DVec2::new(self.x as f64, self.z as f64) * chunk_side_length
    }

    pub fn offset(&self, dx: i32, dz: i32) -> Self {
        ChunkPosition::new(self.x + dx, self.z + dz)
    }

    pub fn distance_squared(&self, other: ChunkPosition) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dz = (self.z - other.z) as i64;
        dx * dx + dz * dz
    }

    /// Euclidean distance in chunk units.
    pub fn distance(&self, other: ChunkPosition) -> f32 {
        (self.distance_squared(other) as f64).sqrt() as f32
    }
}

impl fmt::Display for ChunkPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

fn chunk_axis(v: f64, side: f64) -> i32 {
    let half = 0.5 * side;
    if v > 0.0 {
        ((v - half).max(0.0) / side).ceil() as i32
    } else if v < 0.0 {
        -(((-v) - half).max(0.0) / side).ceil() as i32
    } else {
        0
    }
}
