use glam::{Mat4, Vec3};

use crate::camera::OrbitCamera;
use crate::daycycle::SunState;

/// Half-extent of the orthographic shadow frustum.
const SHADOW_EXTENT: f32 = 150.0;
const SHADOW_NEAR: f32 = 1.0;
const SHADOW_FAR: f32 = 400.0;

/// View-projection of the shadow-casting light: an orthographic frustum
/// covering the scene, looking from the light's position at the origin.
///
/// When the light direction is within a hair of vertical the usual world-up
/// would collapse the view basis, so the up-vector switches to the Z axis.
pub fn light_space_matrix(light_position: Vec3, sun_dir: Vec3) -> Mat4 {
    let up = if sun_dir.y.abs() < 0.999 {
        Vec3::Y
    } else {
        Vec3::Z
    };
    let projection = Mat4::orthographic_rh(
        -SHADOW_EXTENT,
        SHADOW_EXTENT,
        -SHADOW_EXTENT,
        SHADOW_EXTENT,
        SHADOW_NEAR,
        SHADOW_FAR,
    );
    let view = Mat4::look_at_rh(light_position, Vec3::ZERO, up);
    projection * view
}

/// Everything a render backend needs for one frame, computed once after
/// the camera and day cycle have been stepped. Node matrices are not here;
/// they live on the nodes, rewritten by the same frame's propagation pass.
#[derive(Debug, Clone, Copy)]
pub struct FrameContext {
    pub camera_position: Vec3,
    pub view: Mat4,
    pub projection: Mat4,
    pub view_projection: Mat4,
    pub sun_dir: Vec3,
    /// Color of the first extracted light; white until propagation has run.
    pub sun_color: Vec3,
    pub light_position: Vec3,
    pub light_space_matrix: Mat4,
    pub day_factor: f32,
    pub day_progress: f32,
}

impl FrameContext {
    pub fn compose(camera: &OrbitCamera, sun: &SunState, day_progress: f32) -> Self {
        let view = camera.view_matrix();
        let projection = camera.projection_matrix();
        Self {
            camera_position: camera.position(),
            view,
            projection,
            view_projection: projection * view,
            sun_dir: sun.sun_dir,
            sun_color: Vec3::ONE,
            light_position: sun.light_position,
            light_space_matrix: light_space_matrix(sun.light_position, sun.sun_dir),
            day_factor: sun.day_factor,
            day_progress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_origin_lands_inside_the_shadow_frustum() {
        let sun_dir = Vec3::new(3.0, 0.0, 1.0).normalize();
        let m = light_space_matrix(-sun_dir * 300.0, sun_dir);
        let origin = m * Vec3::ZERO.extend(1.0);
        assert!((origin.w - 1.0).abs() < 1e-5, "orthographic w stays 1");
        assert!(origin.x.abs() < 1.0 && origin.y.abs() < 1.0);
        assert!(origin.z > 0.0 && origin.z < 1.0);
    }

    #[test]
    fn vertical_light_switches_up_vector() {
        let sun_dir = Vec3::new(0.0, -1.0, 0.0);
        let m = light_space_matrix(-sun_dir * 300.0, sun_dir);
        assert!(m.to_cols_array().iter().all(|v| v.is_finite()));
        assert!(m.determinant().abs() > 1e-6, "view basis must not collapse");

        // A point off-axis still projects to a distinct location.
        let p = m * Vec3::new(10.0, 0.0, 0.0).extend(1.0);
        let q = m * Vec3::new(-10.0, 0.0, 0.0).extend(1.0);
        assert!((p - q).length() > 1e-3);
    }

    #[test]
    fn near_vertical_light_keeps_world_up() {
        let sun_dir = Vec3::new(0.1, 0.9, 0.1).normalize();
        assert!(sun_dir.y.abs() < 0.999);
        let m = light_space_matrix(-sun_dir * 300.0, sun_dir);
        assert!(m.determinant().abs() > 1e-6);
    }

    #[test]
    fn compose_matches_camera_and_sun() {
        let mut camera = OrbitCamera::default();
        camera.set_aspect(1024, 768);
        let sun = SunState {
            sun_dir: Vec3::new(0.6, -0.8, 0.0),
            light_position: Vec3::new(-180.0, 240.0, 0.0),
            day_factor: 1.0,
        };
        let ctx = FrameContext::compose(&camera, &sun, 0.75);
        assert_eq!(ctx.camera_position, camera.position());
        assert_eq!(ctx.view_projection, ctx.projection * ctx.view);
        assert_eq!(ctx.sun_color, Vec3::ONE);
        assert_eq!(ctx.day_progress, 0.75);
    }
}
