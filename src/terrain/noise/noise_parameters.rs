// src/terrain/noise/noise_parameters.rs
use serde::{Deserialize, Serialize};

use crate::config::config_manager::ConfigurationError;

/// Upper bound accepted for any fractal octave count.
pub const MAX_NOISE_OCTAVES: usize = 32;

// --- Main Parameter Struct ---
// Read-only after startup; shared with the workers behind an Arc.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseParameters {
    pub seed: u32,
    /// Frequency of the base layer, in cycles per grid cell.
    pub scale: f64,
    pub octaves: usize,
    pub persistence: f64,
    pub lacunarity: f64,

    pub enable_base: bool,
    pub base_influence: f64,
    /// Added to every sample position, in grid cells.
    pub world_offset: [f64; 2],

    pub mountain: MountainParameters,
}

// Mountain layers are shaped through the sharpness curve before blending
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MountainParameters {
    pub enabled: bool,
    /// Mountain frequency is `scale / ratio`.
    pub ratio: f64,
    pub influence: f64,
    pub sharpness: f64,
    pub octaves: usize,
    pub persistence: f64,
    pub lacunarity: f64,
    pub offset: [f64; 2],
}

impl Default for NoiseParameters {
    fn default() -> Self {
        NoiseParameters {
            seed: 1831,
            scale: 0.004,
            octaves: 6,
            persistence: 0.45,
            lacunarity: 2.1,
            enable_base: true,
            base_influence: 1.0,
            world_offset: [0.0, 0.0],
            mountain: MountainParameters::default(),
        }
    }
}

impl Default for MountainParameters {
    fn default() -> Self {
        MountainParameters {
            enabled: true,
            ratio: 4.0,
            influence: 1.5,
            sharpness: 1.0,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
            offset: [0.0, 0.0],
        }
    }
}

impl MountainParameters {
    pub fn frequency(&self, base_scale: f64) -> f64 {
        base_scale / self.ratio
    }
}

impl NoiseParameters {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        check_positive("noise.scale", self.scale)?;
        check_fractal("noise", self.octaves, self.persistence, self.lacunarity)?;
        check_finite("noise.base_influence", self.base_influence)?;
        check_finite("noise.world_offset", self.world_offset[0])?;
        check_finite("noise.world_offset", self.world_offset[1])?;

        let m = &self.mountain;
        check_positive("noise.mountain.ratio", m.ratio)?;
        check_finite("noise.mountain.influence", m.influence)?;
        check_finite("noise.mountain.sharpness", m.sharpness)?;
        if m.sharpness < 0.0 {
            return Err(ConfigurationError::Invalid(
                "noise.mountain.sharpness must not be negative".to_string(),
            ));
        }
        check_fractal("noise.mountain", m.octaves, m.persistence, m.lacunarity)?;
        check_finite("noise.mountain.offset", m.offset[0])?;
        check_finite("noise.mountain.offset", m.offset[1])?;
        Ok(())
    }
}

fn check_finite(name: &str, value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigurationError::Invalid(format!("{} must be finite, got {}", name, value)))
    }
}

fn check_positive(name: &str, value: f64) -> Result<(), ConfigurationError> {
    check_finite(name, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigurationError::Invalid(format!("{} must be positive, got {}", name, value)))
    }
}

fn check_fractal(
    prefix: &str,
    octaves: usize,
    persistence: f64,
    lacunarity: f64,
) -> Result<(), ConfigurationError> {
    if octaves == 0 || octaves > MAX_NOISE_OCTAVES {
        return Err(ConfigurationError::Invalid(format!(
            "{}.octaves must be within 1..={}, got {}",
            prefix, MAX_NOISE_OCTAVES, octaves
        )));
    }
    check_finite(&format!("{}.persistence", prefix), persistence)?;
    check_positive(&format!("{}.lacunarity", prefix), lacunarity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(NoiseParameters::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_octaves() {
        let mut params = NoiseParameters::default();
        params.octaves = 0;
        assert!(params.validate().is_err());
    }

    #[test]
    fn rejects_non_finite_scale() {
        let mut params = NoiseParameters::default();
        params.scale = f64::NAN;
        assert!(params.validate().is_err());
        params.scale = -1.0;
        assert!(params.validate().is_err());
    }

    #[test]
    fn rejects_negative_sharpness() {
        let mut params = NoiseParameters::default();
        params.mountain.sharpness = -0.5;
        assert!(params.validate().is_err());
    }
}
