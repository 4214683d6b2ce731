// src/terrain/terrain_chunk.rs
use std::fmt;
use std::sync::Arc;

use glam::{DVec2, Vec3};
use log::trace;

use crate::terrain::chunk_position::ChunkPosition;
use crate::terrain::mesh_builder::LodMesh;
use crate::terrain::terrain_config::TerrainConfig;
use crate::terrain::terrain_error::{TerrainError, TerrainResult};

/// Where a chunk sits in the scene. Mesh vertices are in grid cells, so the
/// horizontal scale converts them to world units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkTransform {
    pub translation: Vec3,
    pub scale: Vec3,
}

impl ChunkTransform {
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        local * self.scale + self.translation
    }
}

/// Full-detail surface of a chunk, for collision, vegetation and other consumers
/// that need the exact ground.
#[derive(Debug, Clone, Copy)]
pub struct ChunkSurface<'a> {
    pub position: ChunkPosition,
    pub vertices: &'a [Vec3],
    pub triangles: &'a [u32],
    pub transform: ChunkTransform,
}

pub struct TerrainChunk {
    position: ChunkPosition,
    config: Arc<TerrainConfig>,
    meshes: Vec<LodMesh>,
    lod: Option<usize>,
    mesh_index: usize,
    active: bool,
    collision_enabled: bool,
    // Scene-space centre, kept in double precision so repeated shifts don't drift
    scene_center: DVec2,
    vertical_offset: f32,
}

impl TerrainChunk {
    pub fn new(
        position: ChunkPosition,
        meshes: Vec<LodMesh>,
        config: Arc<TerrainConfig>,
    ) -> TerrainResult<Self> {
        match meshes.first() {
            Some(finest) if finest.level == 0 => {}
            _ => {
                return Err(TerrainError::Generation {
                    position,
                    reason: "mesh set has no full-detail level".to_string(),
                });
            }
        }

        let scene_center = position.world_center(config.chunk_side_length() as f64);
        Ok(TerrainChunk {
            position,
            config,
            meshes,
            lod: None,
            mesh_index: 0,
            active: true,
            collision_enabled: false,
            scene_center,
            vertical_offset: 0.0,
        })
    }

    pub fn position(&self) -> ChunkPosition {
        self.position
    }

    pub fn label(&self) -> String {
        format!("T{}", self.position)
    }

    pub fn meshes(&self) -> &[LodMesh] {
        &self.meshes
    }

    /// Detail level last assigned, already normalised. `None` until the first assignment.
    pub fn lod(&self) -> Option<usize> {
        self.lod
    }

    pub fn mesh_index(&self) -> usize {
        self.mesh_index
    }

    /// Mesh to render, or `None` before any level was assigned.
    pub fn current_mesh(&self) -> Option<&LodMesh> {
        self.lod.map(|_| &self.meshes[self.mesh_index])
    }

    /// The full-detail mesh, which also backs collision and height queries.
    pub fn finest_mesh(&self) -> &LodMesh {
        &self.meshes[0]
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        if self.active != active {
            trace!("{} active: {}", self.label(), active);
            self.active = active;
        }
    }

    pub fn collision_enabled(&self) -> bool {
        self.collision_enabled
    }

    pub fn collision_mesh(&self) -> Option<&LodMesh> {
        self.collision_enabled.then(|| self.finest_mesh())
    }

    /// Assigns a detail level. Returns whether anything changed.
    pub fn set_lod(&mut self, level: usize) -> bool {
        // Level 1 renders with the full-detail mesh
        let level = if level == 1 { 0 } else { level };
        if self.lod == Some(level) {
            return false;
        }

        self.lod = Some(level);
        self.mesh_index = self
            .config
            .mesh_index_for_level(level)
            .min(self.meshes.len() - 1);
        self.collision_enabled = self.mesh_index <= 1 && self.meshes.len() > 1;
        self.vertical_offset = self
            .config
            .descend_multiplier
            .map_or(0.0, |descend| -(level as f32) * descend);

        trace!(
            "{} lod {} (mesh {}, collision {})",
            self.label(),
            level,
            self.mesh_index,
            self.collision_enabled
        );
        true
    }

    /// Places the chunk for an origin whose cumulative shift is `origin_delta`.
    pub fn place(&mut self, origin_delta: DVec2) {
        let side = self.config.chunk_side_length() as f64;
        self.scene_center = self.position.world_center(side) + origin_delta;
    }

    pub fn shift_origin(&mut self, delta: DVec2) {
        self.scene_center += delta;
    }

    pub fn scene_center(&self) -> DVec2 {
        self.scene_center
    }

    pub fn transform(&self) -> ChunkTransform {
        let scale = self.config.world_scale;
        ChunkTransform {
            translation: Vec3::new(
                self.scene_center.x as f32,
                self.vertical_offset,
                self.scene_center.y as f32,
            ),
            scale: Vec3::new(scale, 1.0, scale),
        }
    }

    pub fn surface(&self) -> ChunkSurface<'_> {
        let finest = self.finest_mesh();
        ChunkSurface {
            position: self.position,
            vertices: &finest.vertices,
            triangles: &finest.triangles,
            transform: self.transform(),
        }
    }
}

impl fmt::Debug for TerrainChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TerrainChunk")
            .field("position", &self.position)
            .field("lod", &self.lod)
            .field("mesh_index", &self.mesh_index)
            .field("active", &self.active)
            .field("collision_enabled", &self.collision_enabled)
            .field("scene_center", &self.scene_center)
            .finish()
    }
}
