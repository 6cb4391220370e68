pub mod camera;
pub mod gpu;
pub mod passes;
pub mod targets;

pub use camera::OrbitCamera;
pub use gpu::GpuState;
pub use passes::{CLEAR_COLOR, FrameParams, RenderState};
pub use targets::MAP_RESOLUTION;
