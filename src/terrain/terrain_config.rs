// src/terrain/terrain_config.rs
use serde::{Deserialize, Serialize};

use crate::config::config_manager::ConfigurationError;

// Streaming and mesh settings shared by every chunk.
// Built once at startup and handed to each component behind an Arc; nothing mutates it afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Vertices along one chunk edge. `(grid_resolution - 1)` must divide by `2^(levels_of_detail - 1)`.
    pub grid_resolution: usize,
    /// World units per grid cell.
    pub world_scale: f32,
    /// Multiplier applied to raw noise heights.
    pub height_scale: f32,

    /// Radius of the wanted disk, in chunks.
    pub render_distance: i32,
    /// Extra chunks kept alive beyond the render distance before eviction.
    pub retention_margin: i32,

    pub levels_of_detail: usize,
    /// Levels above this collapse into the single coarsest mesh.
    pub lod_limit: usize,
    /// Coarse chunks sink by `level * descend_multiplier`. Absent means no offset.
    pub descend_multiplier: Option<f32>,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        TerrainConfig {
            grid_resolution: 129,
            world_scale: 1.0,
            height_scale: 60.0,
            render_distance: 8,
            retention_margin: 2,
            levels_of_detail: 5,
            lod_limit: 2,
            descend_multiplier: None,
        }
    }
}

impl TerrainConfig {
    /// World units covered by one chunk edge.
    pub fn chunk_side_length(&self) -> f32 {
        (self.grid_resolution - 1) as f32 * self.world_scale
    }

    /// Number of meshes built per chunk: the levels up to the limit plus the collapsed far level.
    pub fn lod_mesh_count(&self) -> usize {
        (self.lod_limit + 2).min(self.levels_of_detail)
    }

    /// True detail level rendered by the mesh at `mesh_index`.
    pub fn mesh_level(&self, mesh_index: usize) -> usize {
        if mesh_index <= self.lod_limit {
            mesh_index
        } else {
            self.levels_of_detail - 1
        }
    }

    /// Mesh slot used to display a (normalised) detail level.
    pub fn mesh_index_for_level(&self, level: usize) -> usize {
        level.min(self.lod_limit + 1).min(self.lod_mesh_count() - 1)
    }

    /// Target detail level for a chunk `distance` chunks from the viewer.
    pub fn lod_for_distance(&self, distance: f32) -> usize {
        let lod = (distance.max(0.0) as usize).min(self.levels_of_detail - 1);
        if lod > self.lod_limit {
            self.levels_of_detail - 1
        } else {
            lod
        }
    }

    /// Number of coordinates in the wanted disk.
    pub fn wanted_chunk_count(&self) -> usize {
        let r = self.render_distance;
        let mut count = 0;
        for x in -r..r {
            for z in -r..r {
                if x * x + z * z < r * r {
                    count += 1;
                }
            }
        }
        count
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let n = self.grid_resolution;
        if n < 3 || n % 2 == 0 {
            return Err(ConfigurationError::Invalid(format!(
                "terrain.grid_resolution must be odd and at least 3, got {}",
                n
            )));
        }
        if self.levels_of_detail < 2 {
            return Err(ConfigurationError::Invalid(format!(
                "terrain.levels_of_detail must be at least 2, got {}",
                self.levels_of_detail
            )));
        }
        let coarsest_stride = 1usize
            .checked_shl((self.levels_of_detail - 1) as u32)
            .unwrap_or(usize::MAX);
        if (n - 1) % coarsest_stride != 0 {
            return Err(ConfigurationError::Invalid(format!(
                "terrain.grid_resolution - 1 ({}) must be divisible by 2^{} for {} detail levels",
                n - 1,
                self.levels_of_detail - 1,
                self.levels_of_detail
            )));
        }
        if !(self.world_scale.is_finite() && self.world_scale > 0.0) {
            return Err(ConfigurationError::Invalid(format!(
                "terrain.world_scale must be positive, got {}",
                self.world_scale
            )));
        }
        if !self.height_scale.is_finite() {
            return Err(ConfigurationError::Invalid(format!(
                "terrain.height_scale must be finite, got {}",
                self.height_scale
            )));
        }
        if self.render_distance < 1 {
            return Err(ConfigurationError::Invalid(format!(
                "terrain.render_distance must be at least 1, got {}",
                self.render_distance
            )));
        }
        if self.retention_margin < 0 {
            return Err(ConfigurationError::Invalid(format!(
                "terrain.retention_margin must not be negative, got {}",
                self.retention_margin
            )));
        }
        if let Some(descend) = self.descend_multiplier {
            if !descend.is_finite() {
                return Err(ConfigurationError::Invalid(format!(
                    "terrain.descend_multiplier must be finite, got {}",
                    descend
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(levels_of_detail: usize, lod_limit: usize) -> TerrainConfig {
        TerrainConfig {
            grid_resolution: 17,
            levels_of_detail,
            lod_limit,
            ..TerrainConfig::default()
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(TerrainConfig::default().validate().is_ok());
    }

    #[test]
    fn side_length_uses_cells_not_vertices() {
        let c = TerrainConfig {
            grid_resolution: 5,
            world_scale: 1.0,
            ..TerrainConfig::default()
        };
        assert_eq!(c.chunk_side_length(), 4.0);
    }

    #[test]
    fn mesh_count_collapses_levels_past_limit() {
        assert_eq!(config(5, 2).lod_mesh_count(), 4);
        assert_eq!(config(5, 0).lod_mesh_count(), 2);
        assert_eq!(config(3, 4).lod_mesh_count(), 3);
        assert_eq!(config(2, 0).lod_mesh_count(), 2);
    }

    #[test]
    fn last_mesh_is_the_far_level() {
        let c = config(5, 2);
        assert_eq!(c.mesh_level(0), 0);
        assert_eq!(c.mesh_level(2), 2);
        assert_eq!(c.mesh_level(3), 4);
        assert_eq!(c.mesh_index_for_level(4), 3);
        assert_eq!(c.mesh_index_for_level(1), 1);
    }

    #[test]
    fn lod_for_distance_clamps_and_snaps() {
        let c = config(5, 2);
        assert_eq!(c.lod_for_distance(0.0), 0);
        assert_eq!(c.lod_for_distance(1.9), 1);
        assert_eq!(c.lod_for_distance(2.5), 2);
        assert_eq!(c.lod_for_distance(3.0), 4);
        assert_eq!(c.lod_for_distance(40.0), 4);
    }

    #[test]
    fn rejects_resolution_not_divisible_by_coarsest_stride() {
        let c = TerrainConfig {
            grid_resolution: 13,
            levels_of_detail: 4,
            ..TerrainConfig::default()
        };
        assert!(c.validate().is_err());
        let c = TerrainConfig {
            grid_resolution: 10,
            ..TerrainConfig::default()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_single_level() {
        assert!(config(1, 0).validate().is_err());
    }

    #[test]
    fn wanted_count_matches_disk() {
        let c = TerrainConfig {
            render_distance: 1,
            ..TerrainConfig::default()
        };
        assert_eq!(c.wanted_chunk_count(), 1);
        let c = TerrainConfig {
            render_distance: 2,
            ..TerrainConfig::default()
        };
        // (0,0), four axis neighbours and four diagonals at distance² = 2 < 4
        assert_eq!(c.wanted_chunk_count(), 9);
    }
}
