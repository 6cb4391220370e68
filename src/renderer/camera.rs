use glam::{EulerRot, Mat4, Quat, Vec2, Vec3};

/// Orbits a fixed target. Orientation lives in yaw/pitch and is materialized
/// as a quaternion; the eye position is always derived from it, never stored.
pub struct OrbitCamera {
    pub target: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,

    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,

    pub mouse_sensitivity: f32,
    pub zoom_speed: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            yaw: 0.35,
            pitch: 0.45,
            distance: 130.0,

            fov: 60.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 5000.0,

            mouse_sensitivity: 0.005,
            zoom_speed: 8.0,
        }
    }
}

impl OrbitCamera {
    pub fn orbit_rotation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, -self.pitch, 0.0)
    }

    pub fn position(&self) -> Vec3 {
        self.target + self.orbit_rotation() * (Vec3::Z * self.distance)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn process_mouse_movement(&mut self, delta: Vec2) {
        self.yaw += delta.x * self.mouse_sensitivity;
        self.pitch -= delta.y * self.mouse_sensitivity;

        let max_pitch = 89.0_f32.to_radians();
        self.pitch = self.pitch.clamp(-max_pitch, max_pitch);
    }

    pub fn process_scroll(&mut self, delta: f32) {
        self.distance = (self.distance - delta * self.zoom_speed).clamp(10.0, 2000.0);
    }

    pub fn reset(&mut self) {
        let aspect = self.aspect;
        *self = Self::default();
        self.aspect = aspect;
    }

    pub fn set_aspect(&mut self, width: f32, height: f32) {
        // Minimizing delivers zero-sized resizes; keep the last real aspect.
        if width > 0.0 && height > 0.0 {
            self.aspect = width / height;
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 3],
    pub _padding: f32,
}

impl CameraUniform {
    pub fn from_camera(camera: &OrbitCamera) -> Self {
        Self {
            view_proj: camera.view_projection_matrix().to_cols_array_2d(),
            camera_pos: camera.position().to_array(),
            _padding: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rest_pose_sits_behind_target_on_z() {
        let camera = OrbitCamera {
            yaw: 0.0,
            pitch: 0.0,
            distance: 130.0,
            ..Default::default()
        };
        let p = camera.position();
        assert!((p - Vec3::new(0.0, 0.0, 130.0)).length() < 1e-4);
    }

    #[test]
    fn positive_pitch_raises_the_eye() {
        let camera = OrbitCamera {
            yaw: 0.0,
            pitch: 0.5,
            ..Default::default()
        };
        assert!(camera.position().y > 0.0);
    }

    #[test]
    fn pitch_clamps_and_zoom_clamps() {
        let mut camera = OrbitCamera::default();
        camera.process_mouse_movement(Vec2::new(0.0, -1e6));
        assert!(camera.pitch <= 89.0_f32.to_radians());

        camera.process_scroll(1e6);
        assert!(camera.distance >= 10.0);
        camera.process_scroll(-1e6);
        assert!(camera.distance <= 2000.0);
    }

    #[test]
    fn orbit_preserves_distance() {
        let mut camera = OrbitCamera::default();
        camera.process_mouse_movement(Vec2::new(37.0, -12.0));
        let d = (camera.position() - camera.target).length();
        assert!((d - camera.distance).abs() < 1e-3);
    }

    #[test]
    fn zero_sized_resize_leaves_aspect_intact() {
        let mut camera = OrbitCamera::default();
        camera.set_aspect(1280.0, 720.0);

        camera.set_aspect(0.0, 0.0);
        camera.set_aspect(640.0, 0.0);
        camera.set_aspect(0.0, 480.0);

        assert_eq!(camera.aspect, 1280.0 / 720.0);
        assert!(camera.view_projection_matrix().is_finite());
    }
}
