// src/terrain/height_query.rs
use std::collections::HashMap;

use glam::{DVec2, Vec3};

use crate::terrain::chunk_position::ChunkPosition;
use crate::terrain::terrain_chunk::TerrainChunk;
use crate::terrain::terrain_config::TerrainConfig;
use crate::terrain::terrain_error::{TerrainError, TerrainResult};

/// Exact height of the full-detail surface at an absolute horizontal position.
pub fn height_at(
    chunks: &HashMap<ChunkPosition, TerrainChunk>,
    config: &TerrainConfig,
    world_xz: DVec2,
) -> TerrainResult<f32> {
    let side = config.chunk_side_length() as f64;
    let position = ChunkPosition::from_world(world_xz, side);
    let chunk = chunks
        .get(&position)
        .ok_or(TerrainError::ChunkNotFound(position))?;
    Ok(chunk_height(chunk, config, world_xz))
}

/// Height of `chunk`'s full-detail surface at `world_xz` (absolute). Points
/// outside the chunk are clamped onto its outermost quads.
pub fn chunk_height(chunk: &TerrainChunk, config: &TerrainConfig, world_xz: DVec2) -> f32 {
    let n = config.grid_resolution;
    let half = ((n - 1) / 2) as f64;
    let side = config.chunk_side_length() as f64;

    // Grid coordinates, 0 at the chunk's first vertex
    let local = (world_xz - chunk.position().world_center(side)) / config.world_scale as f64;
    let gx = local.x + half;
    let gz = local.y + half;

    let max_quad = (n - 2) as f64;
    let col = gx.floor().clamp(0.0, max_quad) as usize;
    let row = gz.floor().clamp(0.0, max_quad) as usize;
    let fx = gx - col as f64;
    let fz = gz - row as f64;

    // First triangle of a quad holds the half above its diagonal
    let quad = row * (n - 1) + col;
    let triangle = if fz >= fx { quad * 2 } else { quad * 2 + 1 };

    let mesh = chunk.finest_mesh();
    let [a, b, c] = mesh.triangle(triangle).map(|i| mesh.vertices[i]);
    plane_height(a, b, c, (gx - half) as f32, (gz - half) as f32)
}

// Solves the triangle's plane for y at (x, z).
fn plane_height(a: Vec3, b: Vec3, c: Vec3, x: f32, z: f32) -> f32 {
    let normal = (b - a).cross(c - a);
    a.y - (normal.x * (x - a.x) + normal.z * (z - a.z)) / normal.y
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use glam::IVec2;

    use crate::terrain::height_field::{HeightField, HeightFieldGenerator};
    use crate::terrain::mesh_builder::MeshBuilder;
    use crate::terrain::noise::NoiseParameters;

    fn scenario_config() -> Arc<TerrainConfig> {
        Arc::new(TerrainConfig {
            grid_resolution: 5,
            world_scale: 1.0,
            height_scale: 1.0,
            levels_of_detail: 2,
            lod_limit: 0,
            ..TerrainConfig::default()
        })
    }

    fn resident(
        config: &Arc<TerrainConfig>,
        fields: Vec<HeightField>,
    ) -> HashMap<ChunkPosition, TerrainChunk> {
        let builder = MeshBuilder::new(config.clone());
        fields
            .into_iter()
            .map(|field| {
                let meshes = builder.build(&field).unwrap();
                let chunk = TerrainChunk::new(field.position, meshes, config.clone()).unwrap();
                (field.position, chunk)
            })
            .collect()
    }

    #[test]
    fn flat_field_is_zero() {
        let config = scenario_config();
        let chunks = resident(&config, vec![HeightField::flat(ChunkPosition::ORIGIN, 5, 0.0)]);
        assert_eq!(height_at(&chunks, &config, DVec2::ZERO).unwrap(), 0.0);
        assert_eq!(height_at(&chunks, &config, DVec2::new(1.3, -1.7)).unwrap(), 0.0);
    }

    #[test]
    fn spike_interpolates_between_zero_and_peak() {
        let config = scenario_config();
        let mut heights = vec![0.0; 25];
        heights[2 * 5 + 2] = 1.0;
        let border = (-1..=5)
            .flat_map(|column| (-1..=5).map(move |row| IVec2::new(column, row)))
            .filter(|cell| !(0..5).contains(&cell.x) || !(0..5).contains(&cell.y))
            .map(|cell| (cell, 0.0))
            .collect();
        let field = HeightField::new(ChunkPosition::ORIGIN, 5, heights, border).unwrap();
        let chunks = resident(&config, vec![field]);

        assert_eq!(height_at(&chunks, &config, DVec2::ZERO).unwrap(), 1.0);
        for p in [DVec2::new(0.25, 0.1), DVec2::new(-0.3, 0.2), DVec2::new(0.1, -0.4)] {
            let h = height_at(&chunks, &config, p).unwrap();
            assert!(h > 0.0 && h < 1.0, "height {} at {:?}", h, p);
        }
        // Lower triangle of the quad right of the spike: height falls linearly in x
        let h = height_at(&chunks, &config, DVec2::new(0.25, 0.1)).unwrap();
        assert!((h - 0.75).abs() < 1e-6);
    }

    #[test]
    fn missing_chunk_is_not_found() {
        let config = scenario_config();
        let chunks = resident(&config, vec![HeightField::flat(ChunkPosition::ORIGIN, 5, 0.0)]);
        let result = height_at(&chunks, &config, DVec2::new(8.0, 0.0));
        assert!(matches!(
            result,
            Err(TerrainError::ChunkNotFound(p)) if p == ChunkPosition::new(2, 0)
        ));
    }

    #[test]
    fn matches_vertices_of_generated_terrain() {
        let config = Arc::new(TerrainConfig {
            grid_resolution: 17,
            world_scale: 3.0,
            height_scale: 40.0,
            levels_of_detail: 3,
            lod_limit: 1,
            ..TerrainConfig::default()
        });
        let generator = HeightFieldGenerator::new(17, &NoiseParameters::default());
        let position = ChunkPosition::new(-2, 1);
        let field = generator.generate(position).unwrap();
        let expected = field.height(5, 11) * 40.0;
        let chunks = resident(&config, vec![field]);

        // Vertex (5, 11) of chunk (-2, 1); side = 48
        let world = DVec2::new(-2.0 * 48.0 + (5.0 - 8.0) * 3.0, 48.0 + (11.0 - 8.0) * 3.0);
        let h = height_at(&chunks, &config, world).unwrap();
        assert!((h - expected).abs() < 1e-3, "{} vs {}", h, expected);
    }

    #[test]
    fn shared_edge_agrees_between_neighbours() {
        let config = Arc::new(TerrainConfig {
            grid_resolution: 9,
            height_scale: 10.0,
            levels_of_detail: 2,
            lod_limit: 0,
            ..TerrainConfig::default()
        });
        let generator = HeightFieldGenerator::new(9, &NoiseParameters::default());
        let left = generator.generate(ChunkPosition::new(0, 0)).unwrap();
        let right = generator.generate(ChunkPosition::new(1, 0)).unwrap();
        let chunks = resident(&config, vec![left, right]);

        // x = 4 is the boundary, z between vertices
        let on_edge = DVec2::new(4.0, 1.5);
        let a = chunk_height(&chunks[&ChunkPosition::new(0, 0)], &config, on_edge);
        let b = chunk_height(&chunks[&ChunkPosition::new(1, 0)], &config, on_edge);
        assert!((a - b).abs() < 1e-4, "{} vs {}", a, b);
    }
}
