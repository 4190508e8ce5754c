//! Math utilities and types
//!
//! Aliases over `nalgebra` used throughout the engine, plus the [`Transform`]
//! every scene node owns.

pub use nalgebra::{Matrix3, Matrix4, Quaternion, Unit, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Position, rotation and per-axis scale of a scene node.
///
/// The matrix form is never stored; [`Transform::local_matrix`] recomputes
/// `T * R * S` from the three components every time it is asked.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// Position in parent space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with only position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Builder form of [`Transform::set_uniform_scale`]
    #[must_use]
    pub fn with_uniform_scale(mut self, scale: f32) -> Self {
        self.set_uniform_scale(scale);
        self
    }

    /// Replace the position
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Replace the rotation
    pub fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
    }

    /// Replace the rotation from Euler angles in radians (roll, pitch, yaw)
    pub fn set_rotation_euler(&mut self, x: f32, y: f32, z: f32) {
        self.rotation = Quat::from_euler_angles(x, y, z);
    }

    /// Replace the per-axis scale
    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
    }

    /// Set the same scale on all three axes
    pub fn set_uniform_scale(&mut self, scale: f32) {
        self.scale = Vec3::repeat(scale);
    }

    /// Rotate by `angle` radians about `axis` (applied after the current rotation)
    pub fn rotate(&mut self, axis: &Unit<Vec3>, angle: f32) {
        self.rotation = Quat::from_axis_angle(axis, angle) * self.rotation;
    }

    /// Local matrix: translation * rotation * scale
    pub fn local_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// World matrix for this transform under `parent_world`
    pub fn world_matrix(&self, parent_world: &Mat4) -> Mat4 {
        parent_world * self.local_matrix()
    }

    /// Apply this transform to a point
    pub fn transform_point(&self, point: Point3) -> Point3 {
        self.local_matrix().transform_point(&point)
    }

    /// Decompose a translation * rotation * scale matrix.
    ///
    /// Shear and negative scale are not recovered.
    pub fn from_matrix(matrix: &Mat4) -> Self {
        let position = Vec3::new(matrix.m14, matrix.m24, matrix.m34);

        let scale_x = Vec3::new(matrix.m11, matrix.m21, matrix.m31).magnitude();
        let scale_y = Vec3::new(matrix.m12, matrix.m22, matrix.m32).magnitude();
        let scale_z = Vec3::new(matrix.m13, matrix.m23, matrix.m33).magnitude();
        let scale = Vec3::new(scale_x, scale_y, scale_z);

        let rotation_matrix = Mat3::new(
            matrix.m11 / scale_x, matrix.m12 / scale_y, matrix.m13 / scale_z,
            matrix.m21 / scale_x, matrix.m22 / scale_y, matrix.m23 / scale_z,
            matrix.m31 / scale_x, matrix.m32 / scale_y, matrix.m33 / scale_z,
        );
        let rotation = Quat::from_matrix(&rotation_matrix);

        Self {
            position,
            rotation,
            scale,
        }
    }
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// 2 * Pi
    pub const TAU: f32 = 2.0 * PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }
}

/// Extension trait for Mat4 with camera helpers
pub trait Mat4Ext {
    /// Perspective projection with Vulkan's 0..1 depth range and Y pointing down in clip space
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Right-handed look-at view matrix
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        let tan_half_fovy = (fov_y * 0.5).tan();

        let mut result = Mat4::zeros();
        result[(0, 0)] = 1.0 / (aspect * tan_half_fovy);
        // Clip space Y points down in Vulkan.
        result[(1, 1)] = -1.0 / tan_half_fovy;
        result[(2, 2)] = far / (near - far);
        result[(2, 3)] = -(near * far) / (far - near);
        result[(3, 2)] = -1.0;
        result
    }

    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        let forward = (target - eye).normalize();
        let right = forward.cross(&up).normalize();
        let camera_up = right.cross(&forward);

        let translation = Mat4::new_translation(&-eye);

        let rotation = Mat4::new(
            right.x, right.y, right.z, 0.0,
            camera_up.x, camera_up.y, camera_up.z, 0.0,
            -forward.x, -forward.y, -forward.z, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );

        rotation * translation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_local_matrix_is_identity() {
        assert_relative_eq!(Transform::default().local_matrix(), Mat4::identity());
    }

    #[test]
    fn test_position_and_scale_round_trip() {
        let transform = Transform::from_position(Vec3::new(0.0, 5.0, 0.0)).with_uniform_scale(3.0);
        let decomposed = Transform::from_matrix(&transform.local_matrix());

        assert_relative_eq!(decomposed.position, Vec3::new(0.0, 5.0, 0.0), epsilon = 1e-5);
        assert_relative_eq!(decomposed.scale, Vec3::repeat(3.0), epsilon = 1e-5);
        assert_relative_eq!(decomposed.rotation.angle(), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_scale_applies_before_translation() {
        let transform = Transform::from_position(Vec3::new(1.0, 0.0, 0.0)).with_uniform_scale(2.0);
        let p = transform.transform_point(Point3::new(1.0, 1.0, 1.0));
        assert_relative_eq!(p, Point3::new(3.0, 2.0, 2.0), epsilon = 1e-6);
    }

    #[test]
    fn test_rotation_round_trip() {
        let mut transform = Transform::from_position(Vec3::new(-2.0, 1.0, 4.0));
        transform.set_rotation_euler(0.3, 1.1, -0.4);
        transform.set_scale(Vec3::new(1.0, 2.0, 0.5));

        let decomposed = Transform::from_matrix(&transform.local_matrix());
        assert_relative_eq!(decomposed.local_matrix(), transform.local_matrix(), epsilon = 1e-5);
    }

    #[test]
    fn test_rotate_composes_after_current_rotation() {
        let mut transform = Transform::default();
        transform.rotate(&Vec3::z_axis(), constants::TAU / 4.0);
        transform.rotate(&Vec3::y_axis(), constants::TAU / 4.0);

        // x -> y under the first turn; y is unchanged by the second
        let p = transform.transform_point(Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p, Point3::new(0.0, 1.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_world_matrix_composes_parent_first() {
        let parent = Transform::from_position(Vec3::new(0.0, 10.0, 0.0)).with_uniform_scale(2.0);
        let child = Transform::from_position(Vec3::new(1.0, 0.0, 0.0));

        let world = child.world_matrix(&parent.local_matrix());
        let origin = world.transform_point(&Point3::origin());
        assert_relative_eq!(origin, Point3::new(2.0, 10.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_perspective_depth_range() {
        let proj = Mat4::perspective(utils::deg_to_rad(60.0), 1.0, 0.1, 100.0);

        let near = proj * Vec4::new(0.0, 0.0, -0.1, 1.0);
        let far = proj * Vec4::new(0.0, 0.0, -100.0, 1.0);
        assert_relative_eq!(near.z / near.w, 0.0, epsilon = 1e-5);
        assert_relative_eq!(far.z / far.w, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_look_at_moves_target_onto_negative_z() {
        let eye = Vec3::new(0.0, 0.0, 5.0);
        let view = Mat4::look_at(eye, Vec3::zeros(), Vec3::y());
        let p = view.transform_point(&Point3::origin());
        assert_relative_eq!(p, Point3::new(0.0, 0.0, -5.0), epsilon = 1e-6);
    }
}
