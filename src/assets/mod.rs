pub mod obj;

pub use obj::{load_mesh, save_mesh};

use glam::Vec2;
use std::fs;
use std::path::Path;

use crate::noise;

/// On-disk copy of the shader, so edits can be picked up with a reload
/// keypress while the app runs. Falls back to the compiled-in copy when the
/// file is not there (installed builds).
pub const SHADER_PATH: &str = "src/renderer/shaders.wgsl";

pub const SURFACE_TEXTURE_PATH: &str = "assets/surface.png";
pub const MESH_PATH: &str = "assets/mesh.obj";
pub const EXPORT_PATH: &str = "mesh_export.obj";

const EMBEDDED_SHADER: &str = include_str!("../renderer/shaders.wgsl");

pub fn load_shader_source() -> Result<String, String> {
    let path = Path::new(SHADER_PATH);
    if path.exists() {
        fs::read_to_string(path).map_err(|e| format!("read {}: {}", SHADER_PATH, e))
    } else {
        Ok(EMBEDDED_SHADER.to_string())
    }
}

pub struct SurfacePixels {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Diffuse texture for the mesh pass. Decodes `assets/surface.png` when
/// present; a decode failure there is a startup error. Without the file, a
/// stone-and-sand texture is baked from the same value noise the
/// displacement shader uses, so the demo runs with no assets on disk.
pub fn load_surface_texture() -> Result<SurfacePixels, String> {
    let path = Path::new(SURFACE_TEXTURE_PATH);
    if path.exists() {
        let img = image::open(path)
            .map_err(|e| format!("decode {}: {}", SURFACE_TEXTURE_PATH, e))?
            .to_rgba8();
        let (width, height) = img.dimensions();
        return Ok(SurfacePixels {
            rgba: img.into_raw(),
            width,
            height,
        });
    }

    log::info!("{} not found, baking procedural surface", SURFACE_TEXTURE_PATH);
    Ok(bake_procedural_surface(256))
}

fn bake_procedural_surface(size: u32) -> SurfacePixels {
    const DARK: [f32; 3] = [62.0, 58.0, 66.0];
    const LIGHT: [f32; 3] = [178.0, 160.0, 128.0];

    let mut rgba = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let p = Vec2::new(
                x as f32 / size as f32 * 6.0 + noise::DOMAIN_OFFSET,
                y as f32 / size as f32 * 6.0 + noise::DOMAIN_OFFSET,
            );
            let t = (noise::fbm(p, 5, 2.0) * 0.5 + 0.5).clamp(0.0, 1.0);

            for c in 0..3 {
                rgba.push((DARK[c] + t * (LIGHT[c] - DARK[c])) as u8);
            }
            rgba.push(255);
        }
    }

    SurfacePixels {
        rgba,
        width: size,
        height: size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_shader_is_nonempty() {
        assert!(EMBEDDED_SHADER.contains("fn vs_fullscreen"));
        assert!(EMBEDDED_SHADER.contains("fn fs_displacement"));
    }

    #[test]
    fn procedural_surface_has_expected_shape() {
        let pixels = bake_procedural_surface(32);
        assert_eq!(pixels.width, 32);
        assert_eq!(pixels.height, 32);
        assert_eq!(pixels.rgba.len(), 32 * 32 * 4);
        assert!(pixels.rgba.chunks_exact(4).all(|px| px[3] == 255));
    }

    #[test]
    fn procedural_surface_is_deterministic() {
        let a = bake_procedural_surface(16);
        let b = bake_procedural_surface(16);
        assert_eq!(a.rgba, b.rgba);
    }
}
