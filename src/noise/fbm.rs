use glam::Vec2;

/// Frequency of the first octave over the UV square.
pub const BASE_FREQUENCY: f32 = 4.0;

/// Constant shift into positive coordinates. Float-to-integer casts truncate
/// toward zero on both CPU and GPU, so the sampling domain must stay positive.
pub const DOMAIN_OFFSET: f32 = 64.0;

/// UV drift per second of animation time.
pub const TIME_DRIFT: Vec2 = Vec2::new(0.1, 0.07);

/// Smallest amplitude the gradient rescale will divide by.
pub const MIN_AMPLITUDE: f32 = 1e-4;

fn hash(x: u32, y: u32) -> u32 {
    let mut h = x.wrapping_mul(374_761_393);
    h = h.wrapping_add(y.wrapping_mul(668_265_263));
    h = (h ^ (h >> 13)).wrapping_mul(1_274_126_177);
    h ^ (h >> 16)
}

fn rand01(h: u32) -> f32 {
    (h & 0x00FF_FFFF) as f32 / 16_777_216.0
}

fn smoothstep01(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

/// Lattice value noise in [-1, 1]. The WGSL displacement shader evaluates the
/// same lattice, hash and fade, so CPU samples predict GPU texels.
pub fn value_noise(p: Vec2) -> f32 {
    let xi = p.x.floor();
    let yi = p.y.floor();
    let xf = p.x - xi;
    let yf = p.y - yi;

    let x0 = xi as u32;
    let y0 = yi as u32;

    let v00 = rand01(hash(x0, y0));
    let v10 = rand01(hash(x0.wrapping_add(1), y0));
    let v01 = rand01(hash(x0, y0.wrapping_add(1)));
    let v11 = rand01(hash(x0.wrapping_add(1), y0.wrapping_add(1)));

    let sx = smoothstep01(xf);
    let sy = smoothstep01(yf);

    let a = v00 + sx * (v10 - v00);
    let b = v01 + sx * (v11 - v01);
    let v = a + sy * (b - a);

    v * 2.0 - 1.0
}

/// Fractal sum: each octave's frequency grows by `lacunarity` and its
/// amplitude halves, starting at 0.5. Total stays inside (-1, 1).
pub fn fbm(p: Vec2, octaves: u32, lacunarity: f32) -> f32 {
    let mut value = 0.0;
    let mut amplitude = 0.5;
    let mut frequency = 1.0;
    for _ in 0..octaves {
        value += amplitude * value_noise(p * frequency);
        amplitude *= 0.5;
        frequency *= lacunarity;
    }
    value
}

/// Height the displacement pass writes for the texel at `uv`, in mesh units.
pub fn displacement_height(
    uv: Vec2,
    time: f32,
    amplitude: f32,
    octaves: u32,
    lacunarity: f32,
) -> f32 {
    let p = (uv + TIME_DRIFT * time) * BASE_FREQUENCY + Vec2::splat(DOMAIN_OFFSET);
    amplitude * fbm(p, octaves, lacunarity)
}

/// Edge attenuation 16·u(1-u)·v(1-v): exactly 0 on the UV-domain boundary,
/// exactly 1 at the center, monotone from edge to center along each axis.
pub fn falloff_weight(u: f32, v: f32) -> f32 {
    16.0 * u * (1.0 - u) * v * (1.0 - v)
}

/// The falloff term the mesh pass applies: the edge curve when the toggle is
/// on, exactly 1 when it is off.
pub fn falloff_multiplier(enabled: bool, u: f32, v: f32) -> f32 {
    if enabled { falloff_weight(u, v) } else { 1.0 }
}

/// 1/amplitude with the divisor clamped away from zero.
pub fn inverse_amplitude(amplitude: f32) -> f32 {
    1.0 / amplitude.abs().max(MIN_AMPLITUDE)
}

/// Tangent-space normal from the four neighbor heights of a texel. Heights
/// are rescaled back into noise space by `inv_amplitude` so perceived
/// steepness does not change with displacement amplitude.
pub fn gradient_normal(
    left: f32,
    right: f32,
    bottom: f32,
    top: f32,
    inv_amplitude: f32,
) -> [f32; 3] {
    let du = (right - left) * inv_amplitude;
    let dv = (top - bottom) * inv_amplitude;
    let len = (du * du + dv * dv + 4.0).sqrt();
    [-du / len, -dv / len, 2.0 / len]
}

/// Maps a unit normal from [-1,1] per channel into texel bytes. A flat field
/// encodes to (128, 128, 255).
pub fn encode_normal(n: [f32; 3]) -> [u8; 3] {
    let to_byte = |c: f32| ((c * 0.5 + 0.5).clamp(0.0, 1.0) * 255.0).round() as u8;
    [to_byte(n[0]), to_byte(n[1]), to_byte(n[2])]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic_and_asymmetric() {
        assert_eq!(hash(17, 93), hash(17, 93));
        assert_ne!(hash(1, 2), hash(2, 1));
        assert_ne!(hash(0, 0), hash(0, 1));
    }

    #[test]
    fn rand01_stays_in_unit_interval() {
        for i in 0..10_000u32 {
            let r = rand01(hash(i, i.wrapping_mul(7919)));
            assert!((0.0..1.0).contains(&r));
        }
    }

    #[test]
    fn value_noise_bounded() {
        for i in 0..64 {
            for j in 0..64 {
                let p = Vec2::new(
                    DOMAIN_OFFSET + i as f32 * 0.37,
                    DOMAIN_OFFSET + j as f32 * 0.53,
                );
                let v = value_noise(p);
                assert!((-1.0..=1.0).contains(&v), "noise {v} out of range at {p}");
            }
        }
    }

    #[test]
    fn fbm_bounded_for_all_octave_counts() {
        for octaves in 1..=10 {
            for i in 0..32 {
                let p = Vec2::new(DOMAIN_OFFSET + i as f32 * 0.71, DOMAIN_OFFSET + 3.3);
                let v = fbm(p, octaves, 4.0);
                assert!(v.abs() < 1.0, "fbm {v} out of range, octaves {octaves}");
            }
        }
    }

    #[test]
    fn fbm_is_continuous() {
        let p = Vec2::new(DOMAIN_OFFSET + 1.234, DOMAIN_OFFSET + 5.678);
        let a = fbm(p, 8, 2.0);
        let b = fbm(p + Vec2::splat(1e-5), 8, 2.0);
        assert!((a - b).abs() < 1e-2);
    }

    #[test]
    fn displacement_is_deterministic() {
        let uv = Vec2::new(0.25, 0.75);
        let a = displacement_height(uv, 3.5, 0.2, 8, 4.0);
        let b = displacement_height(uv, 3.5, 0.2, 8, 4.0);
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn displacement_scales_exactly_with_amplitude() {
        // Doubling is a power-of-two scale, exact in f32.
        for i in 0..16 {
            let uv = Vec2::new(i as f32 / 16.0, 1.0 - i as f32 / 17.0);
            let h1 = displacement_height(uv, 2.0, 0.2, 8, 4.0);
            let h2 = displacement_height(uv, 2.0, 0.4, 8, 4.0);
            assert_eq!(h2.to_bits(), (2.0 * h1).to_bits());
        }
    }

    #[test]
    fn displacement_bounded_by_amplitude() {
        for i in 0..16 {
            for j in 0..16 {
                let uv = Vec2::new(i as f32 / 16.0, j as f32 / 16.0);
                let h = displacement_height(uv, 7.7, 0.2, 8, 4.0);
                assert!(h.abs() < 0.2);
            }
        }
    }

    #[test]
    fn falloff_is_zero_on_boundary_and_one_at_center() {
        for t in [0.0, 0.31, 0.5, 0.77, 1.0] {
            assert_eq!(falloff_weight(0.0, t), 0.0);
            assert_eq!(falloff_weight(1.0, t), 0.0);
            assert_eq!(falloff_weight(t, 0.0), 0.0);
            assert_eq!(falloff_weight(t, 1.0), 0.0);
        }
        assert_eq!(falloff_weight(0.5, 0.5), 1.0);
    }

    #[test]
    fn falloff_monotone_from_edge_to_center() {
        let mut prev = 0.0;
        for i in 0..=50 {
            let u = i as f32 / 100.0;
            let w = falloff_weight(u, 0.5);
            assert!(w >= prev);
            prev = w;
        }
    }

    #[test]
    fn falloff_small_at_outermost_grid_vertices() {
        // Default 400x100 grid: last-row UVs are 399/400 and 99/100.
        assert!(falloff_weight(399.0 / 400.0, 0.5) < 0.01);
        assert!(falloff_weight(399.0 / 400.0, 99.0 / 100.0) < 0.01);
    }

    #[test]
    fn disabled_falloff_multiplier_is_identity() {
        for t in [0.0, 0.31, 0.5, 1.0] {
            assert_eq!(falloff_multiplier(false, 0.0, t), 1.0);
            assert_eq!(falloff_multiplier(false, t, 1.0), 1.0);
            assert_eq!(falloff_multiplier(false, t, t), 1.0);
        }
        assert_eq!(falloff_multiplier(true, 0.0, 0.5), 0.0);
        assert_eq!(
            falloff_multiplier(true, 0.25, 0.75),
            falloff_weight(0.25, 0.75)
        );
    }

    #[test]
    fn inverse_amplitude_guards_zero() {
        assert!(inverse_amplitude(0.0).is_finite());
        assert!(inverse_amplitude(-0.0).is_finite());
        assert_eq!(inverse_amplitude(0.2), 5.0);
    }

    #[test]
    fn flat_field_yields_up_normal() {
        let n = gradient_normal(0.3, 0.3, 0.3, 0.3, 5.0);
        assert_eq!(n, [0.0, 0.0, 1.0]);
        assert_eq!(encode_normal(n), [128, 128, 255]);
    }

    #[test]
    fn gradient_normal_is_unit_even_at_zero_amplitude() {
        let inv = inverse_amplitude(0.0);
        let n = gradient_normal(0.01, -0.02, 0.005, -0.01, inv);
        let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
        assert!(n.iter().all(|c| c.is_finite()));
        assert!((len - 1.0).abs() < 1e-4);
    }

    #[test]
    fn encode_normal_clamps() {
        assert_eq!(encode_normal([-2.0, 2.0, 0.0]), [0, 255, 128]);
    }
}
