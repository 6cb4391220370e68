pub struct NoisePreset {
    pub name: &'static str,
    pub description: &'static str,
    pub amplitude: f32,
    pub rate: f32,
    pub octaves: u32,
    pub lacunarity: f32,
}

pub const NOISE_PRESETS: &[NoisePreset] = &[
    NoisePreset {
        name: "Rolling Hills",
        description: "Slow drifting terrain, full octave stack",
        amplitude: 0.2,
        rate: 1.0,
        octaves: 8,
        lacunarity: 4.0,
    },
    NoisePreset {
        name: "Calm Water",
        description: "Shallow, smooth, gently animated",
        amplitude: 0.05,
        rate: 0.4,
        octaves: 4,
        lacunarity: 2.0,
    },
    NoisePreset {
        name: "Jagged Peaks",
        description: "Tall relief with fine detail",
        amplitude: 0.35,
        rate: 0.6,
        octaves: 10,
        lacunarity: 3.0,
    },
    NoisePreset {
        name: "Dunes",
        description: "Broad low-frequency swells",
        amplitude: 0.15,
        rate: 0.25,
        octaves: 3,
        lacunarity: 2.5,
    },
    NoisePreset {
        name: "Static Relief",
        description: "Frozen field, rate zero",
        amplitude: 0.25,
        rate: 0.0,
        octaves: 8,
        lacunarity: 4.0,
    },
];
