// src/terrain/noise/noise_utils.rs
use glam::DVec2;
use noise::{Fbm, MultiFractal, NoiseFn, Perlin, ScalePoint};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::terrain::noise::noise_parameters::NoiseParameters;

type BoxedNoise = Box<dyn NoiseFn<f64, 2> + Send + Sync>;

// Layers are pushed apart in the noise domain so they don't correlate near the origin
const LAYER_OFFSET_RANGE: f64 = 10_000.0;

// Helper function to create a noise-rs boxed trait object from fractal parameters.
// A single octave is plain Perlin scaled by frequency.
pub fn create_noise_function_from_params(
    seed: u32,
    frequency: f64,
    octaves: usize,
    persistence: f64,
    lacunarity: f64,
) -> BoxedNoise {
    if octaves <= 1 {
        return Box::new(ScalePoint::new(Perlin::new(seed)).set_scale(frequency));
    }

    Box::new(
        Fbm::<Perlin>::new(seed)
            .set_frequency(frequency)
            .set_octaves(octaves)
            .set_lacunarity(lacunarity)
            .set_persistence(persistence),
    )
}

/// Remaps a noise value in `[-1, 1]` through the sharpness curve.
///
/// Larger sharpness pushes most values towards the ends of the range, which
/// flattens lowlands and sharpens peaks.
pub fn noise_smooth_step(value: f64, sharpness: f64) -> f64 {
    let t = (value + 1.0) / 2.0 * (sharpness * 2.0 + 1.0) - sharpness;
    smooth_step(-1.0, 1.0, t)
}

fn smooth_step(from: f64, to: f64, t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    let t = -2.0 * t * t * t + 3.0 * t * t;
    to * t + from * (1.0 - t)
}

struct NoiseLayer {
    function: BoxedNoise,
    offset: DVec2,
}

impl NoiseLayer {
    fn sample(&self, point: DVec2) -> f64 {
        let p = point + self.offset;
        self.function.get([p.x, p.y])
    }
}

/// The layered height function: a continental base plus two shaped mountain layers.
pub struct TerrainNoise {
    base: Option<NoiseLayer>,
    mountains: Option<[NoiseLayer; 2]>,
    base_influence: f64,
    mountain_influence: f64,
    sharpness: f64,
}

impl TerrainNoise {
    pub fn new(params: &NoiseParameters) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(params.seed as u64);
        let world_offset = DVec2::from_array(params.world_offset);

        let base = params.enable_base.then(|| NoiseLayer {
            function: create_noise_function_from_params(
                params.seed,
                params.scale,
                params.octaves,
                params.persistence,
                params.lacunarity,
            ),
            offset: world_offset,
        });

        let m = &params.mountain;
        let mountain_frequency = m.frequency(params.scale);
        let mountain_offset = world_offset + DVec2::from_array(m.offset);
        // Always draw both offsets so the stream doesn't depend on which layers are enabled
        let mut layer_offset = || {
            DVec2::new(
                rng.random_range(-LAYER_OFFSET_RANGE..LAYER_OFFSET_RANGE),
                rng.random_range(-LAYER_OFFSET_RANGE..LAYER_OFFSET_RANGE),
            )
        };
        let first_offset = layer_offset();
        let second_offset = layer_offset();

        let mountains = m.enabled.then(|| {
            [
                NoiseLayer {
                    function: create_noise_function_from_params(
                        params.seed.wrapping_add(1),
                        mountain_frequency,
                        m.octaves,
                        m.persistence,
                        m.lacunarity,
                    ),
                    offset: mountain_offset + first_offset,
                },
                NoiseLayer {
                    function: create_noise_function_from_params(
                        params.seed.wrapping_add(2),
                        mountain_frequency * 2.0,
                        1,
                        m.persistence,
                        m.lacunarity,
                    ),
                    offset: mountain_offset + second_offset,
                },
            ]
        });

        TerrainNoise {
            base,
            mountains,
            base_influence: params.base_influence,
            mountain_influence: m.influence,
            sharpness: m.sharpness,
        }
    }

    /// Raw (unscaled) height at a point given in grid cells.
    pub fn sample(&self, point: DVec2) -> f64 {
        let mut height = self
            .base
            .as_ref()
            .map_or(0.0, |layer| layer.sample(point) * self.base_influence);

        if let Some(mountains) = &self.mountains {
            for layer in mountains {
                height += noise_smooth_step(layer.sample(point), self.sharpness)
                    * self.mountain_influence
                    / 2.0;
            }
            height /= 2.0;
        }

        height
    }
}
