// src/terrain/mesh_builder.rs
use std::sync::Arc;

use glam::{Vec2, Vec3};
use log::trace;

use crate::terrain::height_field::HeightField;
use crate::terrain::terrain_config::TerrainConfig;
use crate::terrain::terrain_error::{TerrainError, TerrainResult};

/// One detail level of a chunk.
///
/// Vertices are chunk-local: x and z are in grid cells relative to the chunk
/// centre, y is the scaled height. Vertex `row * edge + column` lies at grid
/// position `(column * stride, row * stride)`.
#[derive(Debug, Clone, PartialEq)]
pub struct LodMesh {
    pub level: usize,
    pub stride: usize,
    /// Vertices along one edge.
    pub edge: usize,
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<u32>,
    pub uvs: Vec<Vec2>,
    pub normals: Vec<Vec3>,
}

impl LodMesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len() / 3
    }

    /// Corner indices of triangle `t`.
    pub fn triangle(&self, t: usize) -> [usize; 3] {
        let base = t * 3;
        [
            self.triangles[base] as usize,
            self.triangles[base + 1] as usize,
            self.triangles[base + 2] as usize,
        ]
    }
}

/// Vertices per edge for a detail level.
pub fn lod_edge(grid_resolution: usize, level: usize) -> usize {
    (grid_resolution - 1) / (1 << level) + 1
}

/// Level-0 vertex index of border vertex `local_index` of a level-`level` mesh.
///
/// Panics when `local_index` lies outside the level's vertex grid.
pub fn map_border_index(grid_resolution: usize, level: usize, local_index: usize) -> usize {
    let stride = 1usize << level;
    let small_size = (grid_resolution - 1) / stride + 1;
    assert!(
        local_index < small_size * small_size,
        "local index {} out of range for level {} ({}x{} vertices)",
        local_index,
        level,
        small_size,
        small_size
    );
    let row = local_index / small_size;
    let col = local_index % small_size;
    row * stride * grid_resolution + col * stride
}

/// Indices of every edge and corner vertex of an `edge × edge` grid, row-major.
pub fn border_indices(edge: usize) -> impl Iterator<Item = usize> {
    (0..edge * edge).filter(move |&index| {
        let row = index / edge;
        let col = index % edge;
        row == 0 || col == 0 || row + 1 == edge || col + 1 == edge
    })
}

// Two triangles per quad, both wound to face +Y: (v00, v01, v11) and (v00, v11, v10).
fn grid_triangles(edge: usize) -> Vec<u32> {
    let quads = (edge - 1) * (edge - 1);
    let mut triangles = Vec::with_capacity(quads * 6);
    for row in 0..edge - 1 {
        for col in 0..edge - 1 {
            let v00 = (row * edge + col) as u32;
            let v10 = v00 + 1;
            let v01 = v00 + edge as u32;
            let v11 = v01 + 1;
            triangles.extend_from_slice(&[v00, v01, v11, v00, v11, v10]);
        }
    }
    triangles
}

/// Per-vertex normals: the normalised sum of the unit normals of every adjacent face.
pub fn recalculate_normals(vertices: &[Vec3], triangles: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; vertices.len()];
    for tri in triangles.chunks_exact(3) {
        let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        let face = (vertices[b] - vertices[a])
            .cross(vertices[c] - vertices[a])
            .normalize_or_zero();
        normals[a] += face;
        normals[b] += face;
        normals[c] += face;
    }
    for normal in &mut normals {
        *normal = normal.try_normalize().unwrap_or(Vec3::Y);
    }
    normals
}

/// Builds the LOD mesh set of a chunk from its height field.
pub struct MeshBuilder {
    config: Arc<TerrainConfig>,
}

impl MeshBuilder {
    pub fn new(config: Arc<TerrainConfig>) -> Self {
        MeshBuilder { config }
    }

    /// True detail levels that get a mesh, finest first.
    pub fn mesh_levels(&self) -> Vec<usize> {
        let last = self.config.levels_of_detail - 1;
        (0..self.config.levels_of_detail)
            .filter(|&level| level <= self.config.lod_limit || level == last)
            .collect()
    }

    pub fn build(&self, field: &HeightField) -> TerrainResult<Vec<LodMesh>> {
        let n = self.config.grid_resolution;
        if field.resolution() != n {
            return Err(TerrainError::InvalidHeightField {
                expected: n * n,
                actual: field.heights().len(),
            });
        }

        let levels = self.mesh_levels();
        let mut meshes = Vec::with_capacity(levels.len());
        for level in levels {
            let mut mesh = self.build_level(field, level);
            if level == 0 {
                self.stitch_level_zero(field, &mut mesh)?;
            } else if let Some(finest) = meshes.first() {
                copy_border_normals(n, finest, &mut mesh);
            }
            meshes.push(mesh);
        }

        trace!(
            "MeshBuilder: built {} meshes for chunk {}",
            meshes.len(),
            field.position
        );
        Ok(meshes)
    }

    fn vertex(&self, column: i32, row: i32, height: f32) -> Vec3 {
        let half = ((self.config.grid_resolution - 1) / 2) as f32;
        Vec3::new(
            column as f32 - half,
            height * self.config.height_scale,
            row as f32 - half,
        )
    }

    fn build_level(&self, field: &HeightField, level: usize) -> LodMesh {
        let n = self.config.grid_resolution;
        let stride = 1usize << level;
        let edge = lod_edge(n, level);
        let cells = (n - 1) as f32;

        let mut vertices = Vec::with_capacity(edge * edge);
        let mut uvs = Vec::with_capacity(edge * edge);
        for row in 0..edge {
            for col in 0..edge {
                let (gi, gj) = (col * stride, row * stride);
                vertices.push(self.vertex(gi as i32, gj as i32, field.height(gi, gj)));
                uvs.push(Vec2::new(gi as f32 / cells, gj as f32 / cells));
            }
        }

        let triangles = grid_triangles(edge);
        let normals = recalculate_normals(&vertices, &triangles);
        LodMesh {
            level,
            stride,
            edge,
            vertices,
            triangles,
            uvs,
            normals,
        }
    }

    // Edge normals of the full-detail mesh are taken from the grid extended by the
    // border ring, so they match what the neighbouring chunk computes.
    fn stitch_level_zero(&self, field: &HeightField, mesh: &mut LodMesh) -> TerrainResult<()> {
        let n = self.config.grid_resolution;
        let extended = n + 2;

        let mut vertices = Vec::with_capacity(extended * extended);
        for row in -1..=(n as i32) {
            for column in -1..=(n as i32) {
                let height = field.sample(column, row).ok_or_else(|| TerrainError::Generation {
                    position: field.position,
                    reason: format!("missing border sample ({}, {})", column, row),
                })?;
                vertices.push(self.vertex(column, row, height));
            }
        }
        let normals = recalculate_normals(&vertices, &grid_triangles(extended));

        for index in border_indices(n) {
            let (row, col) = (index / n, index % n);
            mesh.normals[index] = normals[(row + 1) * extended + col + 1];
        }
        Ok(())
    }
}

fn copy_border_normals(grid_resolution: usize, finest: &LodMesh, mesh: &mut LodMesh) {
    for local in border_indices(mesh.edge) {
        mesh.normals[local] = finest.normals[map_border_index(grid_resolution, mesh.level, local)];
    }
}
