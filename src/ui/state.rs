/// Everything the side panel edits. The shell reads this each frame and
/// forwards the values to the passes, so there is no extra sync step.
pub struct UiState {
    pub amplitude: f32,
    pub rate: f32,
    pub octaves: u32,
    pub lacunarity: f32,
    pub selected_preset: usize,

    pub falloff_enabled: bool,
    pub show_maps: bool,
    pub wireframe: bool,

    pub resolution_x: u32,
    pub resolution_z: u32,

    pub vsync_enabled: bool,
    pub show_stats: bool,
    pub fps_cap_enabled: bool,
    pub fps_cap: u32,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            amplitude: 0.2,
            rate: 1.0,
            octaves: 8,
            lacunarity: 4.0,
            selected_preset: 0,

            falloff_enabled: true,
            show_maps: false,
            wireframe: false,

            resolution_x: 400,
            resolution_z: 100,

            vsync_enabled: false,
            show_stats: true,
            fps_cap_enabled: false,
            fps_cap: 144,
        }
    }
}
