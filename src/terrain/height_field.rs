// src/terrain/height_field.rs
use std::collections::HashMap;
use std::sync::Arc;

use glam::{DVec2, IVec2};
use log::trace;

use crate::terrain::chunk_position::ChunkPosition;
use crate::terrain::noise::{NoiseParameters, TerrainNoise};
use crate::terrain::terrain_error::{TerrainError, TerrainResult};

/// Raw height samples for one chunk.
///
/// Interior samples are stored row-major (`row = z`, `column = x`). The ring one
/// cell outside the grid lives in a separate map, keyed by `(column, row)` with
/// `-1` and `resolution` as the out-of-grid indices; it only feeds edge normals.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightField {
    pub position: ChunkPosition,
    resolution: usize,
    heights: Vec<f32>,
    border: HashMap<IVec2, f32>,
}

impl HeightField {
    /// Wraps pre-computed samples. `border` must hold every ring cell.
    pub fn new(
        position: ChunkPosition,
        resolution: usize,
        heights: Vec<f32>,
        border: HashMap<IVec2, f32>,
    ) -> TerrainResult<Self> {
        let expected = resolution * resolution;
        if heights.len() != expected {
            return Err(TerrainError::InvalidHeightField {
                expected,
                actual: heights.len(),
            });
        }
        let field = HeightField {
            position,
            resolution,
            heights,
            border,
        };
        if let Some(missing) = field.border_cells().find(|cell| !field.border.contains_key(cell)) {
            return Err(TerrainError::Generation {
                position,
                reason: format!("border ring is missing cell {}", missing),
            });
        }
        Ok(field)
    }

    /// A height field where every sample, ring included, is `height`.
    pub fn flat(position: ChunkPosition, resolution: usize, height: f32) -> Self {
        let border = border_cells(resolution).map(|cell| (cell, height)).collect();
        HeightField {
            position,
            resolution,
            heights: vec![height; resolution * resolution],
            border,
        }
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    /// Interior sample at `(column, row)`.
    pub fn height(&self, column: usize, row: usize) -> f32 {
        self.heights[row * self.resolution + column]
    }

    /// Sample anywhere in `-1..=resolution` on both axes, ring included.
    pub fn sample(&self, column: i32, row: i32) -> Option<f32> {
        let n = self.resolution as i32;
        if (0..n).contains(&column) && (0..n).contains(&row) {
            Some(self.height(column as usize, row as usize))
        } else {
            self.border.get(&IVec2::new(column, row)).copied()
        }
    }

    pub fn border_len(&self) -> usize {
        self.border.len()
    }

    fn border_cells(&self) -> impl Iterator<Item = IVec2> + use<> {
        border_cells(self.resolution)
    }
}

// Every ring cell, corners included: (n + 2)² - n² of them.
fn border_cells(resolution: usize) -> impl Iterator<Item = IVec2> {
    let n = resolution as i32;
    (-1..=n).flat_map(move |row| {
        (-1..=n)
            .filter(move |&column| column < 0 || column == n || row < 0 || row == n)
            .map(move |column| IVec2::new(column, row))
    })
}

/// Samples layered noise into height fields. Holds only read-only state, so one
/// instance is shared by every worker.
pub struct HeightFieldGenerator {
    resolution: usize,
    noise: TerrainNoise,
}

impl HeightFieldGenerator {
    pub fn new(resolution: usize, params: &NoiseParameters) -> Self {
        HeightFieldGenerator {
            resolution,
            noise: TerrainNoise::new(params),
        }
    }

    pub fn shared(resolution: usize, params: &NoiseParameters) -> Arc<Self> {
        Arc::new(Self::new(resolution, params))
    }

    /// Noise-space position (in grid cells) of vertex `(column, row)` of `position`.
    /// Adjacent chunks share the positions of their common edge.
    fn sample_point(&self, position: ChunkPosition, column: i32, row: i32) -> DVec2 {
        let cells = (self.resolution - 1) as f64;
        let half = cells / 2.0;
        DVec2::new(
            position.x as f64 * cells + column as f64 - half,
            position.z as f64 * cells + row as f64 - half,
        )
    }

    pub fn generate(&self, position: ChunkPosition) -> TerrainResult<HeightField> {
        let n = self.resolution as i32;
        let mut heights = vec![0.0f32; self.resolution * self.resolution];
        let mut border = HashMap::with_capacity((4 * self.resolution) + 4);

        for row in -1..=n {
            for column in -1..=n {
                let value = self.noise.sample(self.sample_point(position, column, row));
                if !value.is_finite() {
                    return Err(TerrainError::Generation {
                        position,
                        reason: format!("non-finite noise sample at ({}, {})", column, row),
                    });
                }

                // Ring samples feed edge normals only and never land in the grid
                if column < 0 || column == n || row < 0 || row == n {
                    border.insert(IVec2::new(column, row), value as f32);
                } else {
                    heights[(row * n + column) as usize] = value as f32;
                }
            }
        }

        trace!("HeightFieldGenerator: generated chunk {}", position);
        Ok(HeightField {
            position,
            resolution: self.resolution,
            heights,
            border,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_has_expected_cell_count() {
        let field = HeightField::flat(ChunkPosition::ORIGIN, 5, 0.0);
        assert_eq!(field.border_len(), 7 * 7 - 5 * 5);
        assert_eq!(field.sample(-1, -1), Some(0.0));
        assert_eq!(field.sample(5, 2), Some(0.0));
        assert_eq!(field.sample(-2, 0), None);
    }

    #[test]
    fn rejects_wrong_interior_size() {
        let result = HeightField::new(ChunkPosition::ORIGIN, 5, vec![0.0; 24], HashMap::new());
        assert!(matches!(
            result,
            Err(TerrainError::InvalidHeightField { expected: 25, actual: 24 })
        ));
    }

    #[test]
    fn rejects_incomplete_ring() {
        let result = HeightField::new(ChunkPosition::ORIGIN, 5, vec![0.0; 25], HashMap::new());
        assert!(result.is_err());
    }

    #[test]
    fn generation_is_bit_identical() {
        let params = NoiseParameters::default();
        let a = HeightFieldGenerator::new(17, &params);
        let b = HeightFieldGenerator::new(17, &params);
        let pos = ChunkPosition::new(3, -2);
        let fa = a.generate(pos).unwrap();
        let fb = b.generate(pos).unwrap();
        let bits = |f: &HeightField| f.heights().iter().map(|h| h.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&fa), bits(&fb));
        for row in -1..=17 {
            for column in -1..=17 {
                assert_eq!(
                    fa.sample(column, row).map(f32::to_bits),
                    fb.sample(column, row).map(f32::to_bits)
                );
            }
        }
    }

    #[test]
    fn neighbours_agree_on_shared_edge_and_ring() {
        let generator = HeightFieldGenerator::new(17, &NoiseParameters::default());
        let left = generator.generate(ChunkPosition::new(0, 0)).unwrap();
        let right = generator.generate(ChunkPosition::new(1, 0)).unwrap();
        for row in 0..17 {
            // Shared edge
            assert_eq!(left.height(16, row), right.height(0, row));
            // The ring of one chunk is the second column of its neighbour
            assert_eq!(right.sample(-1, row as i32), Some(left.height(15, row)));
            assert_eq!(left.sample(17, row as i32), Some(right.height(1, row)));
        }
    }

    #[test]
    fn border_never_overwrites_interior() {
        let generator = HeightFieldGenerator::new(9, &NoiseParameters::default());
        let field = generator.generate(ChunkPosition::new(-4, 7)).unwrap();
        assert_eq!(field.heights().len(), 81);
        assert_eq!(field.border_len(), 11 * 11 - 81);
        assert!(field.border.keys().all(|c| c.x < 0 || c.x == 9 || c.y < 0 || c.y == 9));
    }
}
