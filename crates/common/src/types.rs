use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Index of a node inside a scene graph arena. Stable for the graph's
/// lifetime; nodes are never removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

/// Opaque handle to GPU-resident mesh geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MeshHandle(pub u64);

/// Opaque handle to a GPU-resident texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TextureHandle(pub u64);

/// Local spatial transform relative to the parent node.
///
/// `rotation` holds Euler angles in radians. The composed matrix applies
/// them in Y, X, Z order around `reference_point`; changing that order
/// changes the rendered output, so it is not configurable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
    /// Pivot for rotation and scale, in local coordinates.
    pub reference_point: Vec3,
}

impl Transform {
    /// Matrix form: `T(position) * T(pivot) * Ry * Rx * Rz * S * T(-pivot)`.
    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.position)
            * Mat4::from_translation(self.reference_point)
            * Mat4::from_rotation_y(self.rotation.y)
            * Mat4::from_rotation_x(self.rotation.x)
            * Mat4::from_rotation_z(self.rotation.z)
            * Mat4::from_scale(self.scale)
            * Mat4::from_translation(-self.reference_point)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            reference_point: Vec3::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mat_approx_eq(a: Mat4, b: Mat4) {
        for (x, y) in a.to_cols_array().iter().zip(b.to_cols_array().iter()) {
            assert!((x - y).abs() < 1e-5, "{a:?} != {b:?}");
        }
    }

    #[test]
    fn default_transform_is_identity() {
        mat_approx_eq(Transform::default().local_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn translation_only() {
        let t = Transform {
            position: Vec3::new(0.0, 0.0, -80.0),
            ..Default::default()
        };
        mat_approx_eq(t.local_matrix(), Mat4::from_translation(Vec3::new(0.0, 0.0, -80.0)));
    }

    #[test]
    fn rotation_order_is_y_then_x_then_z() {
        let t = Transform {
            rotation: Vec3::new(0.4, 1.1, -0.7),
            ..Default::default()
        };
        let expected = Mat4::from_rotation_y(1.1)
            * Mat4::from_rotation_x(0.4)
            * Mat4::from_rotation_z(-0.7);
        mat_approx_eq(t.local_matrix(), expected);
    }

    #[test]
    fn pivot_is_fixed_under_rotation() {
        let pivot = Vec3::new(3.0, -2.0, 5.0);
        let t = Transform {
            rotation: Vec3::new(0.9, 2.3, 0.1),
            reference_point: pivot,
            ..Default::default()
        };
        let moved = t.local_matrix().transform_point3(pivot);
        assert!((moved - pivot).length() < 1e-4);
    }

    #[test]
    fn local_matrix_invertible_for_nonzero_scale() {
        let t = Transform {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Vec3::new(0.5, -0.25, 1.5),
            scale: Vec3::new(2.0, 0.5, 3.0),
            reference_point: Vec3::new(0.0, 1.0, 0.0),
        };
        let m = t.local_matrix();
        mat_approx_eq(m * m.inverse(), Mat4::IDENTITY);
    }
}
