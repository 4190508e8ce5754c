//! Per-frame uniform values and draw statistics

use crate::foundation::math::{Mat4, Vec3, Vec4};
use crate::render::camera::Camera;
use crate::render::material::{names, UniformSet, UniformValue};

/// Values shared by every draw in a frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameUniforms {
    /// Camera view matrix
    pub view: Mat4,
    /// Camera projection matrix
    pub projection: Mat4,
    /// Light position in view space
    pub light_position: Vec4,
}

impl FrameUniforms {
    /// Matrices from `camera`, light moved into view space
    pub fn new(camera: &Camera, light_world: Vec3) -> Self {
        let view = camera.view_matrix();
        Self {
            light_position: view * light_world.push(1.0),
            projection: camera.projection_matrix(),
            view,
        }
    }

    /// Transient uniforms for one node
    pub fn node_uniforms(&self, model: &Mat4, colour: Option<Vec4>) -> UniformSet {
        let mut uniforms = UniformSet::new();
        uniforms.set(names::MODEL, UniformValue::Mat4(*model));
        uniforms.set(names::VIEW, UniformValue::Mat4(self.view));
        uniforms.set(names::PROJECTION, UniformValue::Mat4(self.projection));
        uniforms.set(names::LIGHT_POSITION, UniformValue::Vec4(self.light_position));
        if let Some(colour) = colour {
            uniforms.set(names::COLOUR, UniformValue::Vec4(colour));
        }
        uniforms
    }
}

/// Counters for one drawn frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrawStats {
    /// Passes traversed
    pub passes: usize,
    /// Draw calls issued
    pub draws: usize,
    /// Nodes whose mesh was absent
    pub skipped_meshes: usize,
    /// Binds refused by unlinked materials
    pub refused_binds: usize,
    /// Nodes dropped because the backend rejected the bind or draw
    pub failed_draws: usize,
    /// False when the backend skipped the frame
    pub presented: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_light_is_in_view_space() {
        let camera = Camera::perspective(Vec3::new(0.0, 0.0, 5.0), 60.0, 1.0, 0.1, 100.0);
        let frame = FrameUniforms::new(&camera, Vec3::zeros());
        assert_relative_eq!(frame.light_position, Vec4::new(0.0, 0.0, -5.0, 1.0), epsilon = 1e-5);
    }

    #[test]
    fn test_colour_only_when_given() {
        let camera = Camera::perspective(Vec3::zeros(), 60.0, 1.0, 0.1, 100.0);
        let frame = FrameUniforms::new(&camera, Vec3::zeros());

        let plain = frame.node_uniforms(&Mat4::identity(), None);
        assert!(plain.get(names::COLOUR).is_none());
        assert_eq!(plain.len(), 4);

        let tinted = frame.node_uniforms(&Mat4::identity(), Some(Vec4::new(1.0, 0.0, 0.0, 1.0)));
        assert_eq!(tinted.vec4(names::COLOUR), Some(Vec4::new(1.0, 0.0, 0.0, 1.0)));
    }
}
