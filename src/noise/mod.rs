pub mod fbm;
pub mod presets;

pub use fbm::{
    BASE_FREQUENCY, DOMAIN_OFFSET, MIN_AMPLITUDE, TIME_DRIFT, displacement_height, encode_normal,
    falloff_multiplier, falloff_weight, fbm, gradient_normal, inverse_amplitude, value_noise,
};
pub use presets::{NOISE_PRESETS, NoisePreset};
