pub mod noise_parameters;
pub mod noise_utils;

pub use noise_parameters::{MountainParameters, NoiseParameters};
pub use noise_utils::{create_noise_function_from_params, noise_smooth_step, TerrainNoise};
