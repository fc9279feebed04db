use glam::{Mat4, Vec3};

/// How yaw and pitch evolve between frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrbitMode {
    /// Mouse look drives yaw and pitch.
    Manual,
    /// Yaw advances at a constant angular velocity; pitch stays frozen at
    /// the value it had when the mode was entered. Mouse look is ignored.
    Revolve { yaw_velocity: f32 },
}

/// Orbit camera circling the world origin.
///
/// Angles are stored in degrees and converted at the point of use; pitch is
/// clamped to (-89, 89) degrees to keep the pole singularity out of reach.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    pub yaw: f32,
    pub pitch: f32,
    pub radius: f32,
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub mode: OrbitMode,
}

const PITCH_LIMIT: f32 = 89.0;

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            pitch: 45.0,
            radius: 200.0,
            fov_y: 80.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 350.0,
            mode: OrbitMode::Manual,
        }
    }
}

impl OrbitCamera {
    /// Apply a filtered mouse-look delta, in degrees. Ignored while
    /// revolving.
    pub fn apply_look(&mut self, delta_yaw: f32, delta_pitch: f32) {
        if let OrbitMode::Revolve { .. } = self.mode {
            return;
        }
        self.yaw += delta_yaw;
        self.pitch = (self.pitch + delta_pitch).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Advance revolve motion. A no-op in manual mode.
    pub fn update(&mut self, dt: f32) {
        if let OrbitMode::Revolve { yaw_velocity } = self.mode {
            self.yaw += yaw_velocity * dt;
        }
    }

    /// Switch between manual and revolve mode, keeping the current pitch.
    pub fn toggle_revolve(&mut self, yaw_velocity: f32) {
        self.mode = match self.mode {
            OrbitMode::Manual => OrbitMode::Revolve { yaw_velocity },
            OrbitMode::Revolve { .. } => OrbitMode::Manual,
        };
    }

    pub fn is_revolving(&self) -> bool {
        matches!(self.mode, OrbitMode::Revolve { .. })
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        if height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    /// World position on the orbit sphere.
    pub fn position(&self) -> Vec3 {
        let yaw = self.yaw.to_radians();
        let pitch = self.pitch.to_radians();
        Vec3::new(
            self.radius * pitch.cos() * yaw.sin(),
            self.radius * pitch.sin(),
            self.radius * pitch.cos() * yaw.cos(),
        )
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), Vec3::ZERO, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_matches_spherical_form() {
        let cam = OrbitCamera {
            yaw: 90.0,
            pitch: 0.0,
            radius: 200.0,
            ..Default::default()
        };
        let pos = cam.position();
        assert!((pos - Vec3::new(200.0, 0.0, 0.0)).length() < 1e-3);

        let cam_up = OrbitCamera {
            yaw: 0.0,
            pitch: 45.0,
            radius: 200.0,
            ..Default::default()
        };
        let pos = cam_up.position();
        let expected = 200.0 * 45.0_f32.to_radians().sin();
        assert!((pos.y - expected).abs() < 1e-3);
        assert!((pos.length() - 200.0).abs() < 1e-3);
    }

    #[test]
    fn pitch_pins_at_both_limits() {
        let mut cam = OrbitCamera::default();
        for _ in 0..500 {
            cam.apply_look(0.0, 1.0);
        }
        assert_eq!(cam.pitch, 89.0);
        for _ in 0..500 {
            cam.apply_look(0.0, -1.0);
        }
        assert_eq!(cam.pitch, -89.0);
    }

    #[test]
    fn revolve_freezes_pitch_and_spins_yaw() {
        let mut cam = OrbitCamera::default();
        cam.toggle_revolve(15.0);
        let pitch_at_entry = cam.pitch;
        cam.apply_look(10.0, 10.0);
        assert_eq!(cam.pitch, pitch_at_entry, "mouse look ignored in revolve mode");
        let yaw_before = cam.yaw;
        cam.update(2.0);
        assert!((cam.yaw - (yaw_before + 30.0)).abs() < 1e-4);

        cam.toggle_revolve(15.0);
        assert!(!cam.is_revolving());
        cam.apply_look(0.0, 5.0);
        assert_eq!(cam.pitch, pitch_at_entry + 5.0);
    }

    #[test]
    fn view_projection_is_finite() {
        let mut cam = OrbitCamera::default();
        cam.set_aspect(1280, 720);
        let vp = cam.view_projection();
        assert!(vp.to_cols_array().iter().all(|v| v.is_finite()));
    }
}
