//! # 3D Camera
//!
//! Perspective camera with first-person controls. Orientation is kept as
//! yaw and pitch so mouse-look never rolls the view; the look target is
//! derived from them on demand.

use crate::core::CameraConfig;
use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec3};

/// Pitch stays just short of straight up or down
const PITCH_LIMIT: f32 = 1.55;

/// Direction of a keyboard camera move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraMove {
    /// Along the view direction
    Forward,
    /// Against the view direction
    Backward,
    /// Strafe left
    Left,
    /// Strafe right
    Right,
    /// World up
    Up,
    /// World down
    Down,
}

/// Perspective camera
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,

    /// Rotation about world Y in radians; 0 looks down -Z
    pub yaw: f32,

    /// Rotation above the horizon in radians
    pub pitch: f32,

    /// Vertical field of view in radians
    pub fov: f32,

    /// Aspect ratio (width / height)
    pub aspect: f32,

    /// Distance to near clipping plane
    pub near: f32,

    /// Distance to far clipping plane
    pub far: f32,
}

impl Camera {
    /// Create a perspective camera looking down -Z
    pub fn perspective(position: Vec3, fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position,
            yaw: 0.0,
            pitch: 0.0,
            fov: utils::deg_to_rad(fov_degrees),
            aspect,
            near,
            far,
        }
    }

    /// Camera described by configuration, looking at the configured target
    pub fn from_config(config: &CameraConfig, aspect: f32) -> Self {
        let mut camera = Self::perspective(
            Vec3::from(config.position),
            config.fov_degrees,
            aspect,
            config.near,
            config.far,
        );
        camera.look_at(Vec3::from(config.target));
        camera
    }

    /// Point the camera at `target`
    pub fn look_at(&mut self, target: Vec3) {
        let Some(dir) = (target - self.position).try_normalize(f32::EPSILON) else {
            return;
        };
        self.pitch = dir.y.asin().clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.yaw = dir.x.atan2(-dir.z);
        log::trace!("Camera looking at {:?} (yaw {:.3}, pitch {:.3})", target, self.yaw, self.pitch);
    }

    /// Unit view direction
    pub fn forward(&self) -> Vec3 {
        Vec3::new(
            self.yaw.sin() * self.pitch.cos(),
            self.pitch.sin(),
            -self.yaw.cos() * self.pitch.cos(),
        )
    }

    /// Unit strafe direction, always horizontal
    pub fn right(&self) -> Vec3 {
        Vec3::new(self.yaw.cos(), 0.0, self.yaw.sin())
    }

    /// Translate by `distance` in the given direction
    pub fn translate(&mut self, direction: CameraMove, distance: f32) {
        let offset = match direction {
            CameraMove::Forward => self.forward(),
            CameraMove::Backward => -self.forward(),
            CameraMove::Left => -self.right(),
            CameraMove::Right => self.right(),
            CameraMove::Up => Vec3::y(),
            CameraMove::Down => -Vec3::y(),
        };
        self.position += offset * distance;
    }

    /// Turn by yaw and pitch deltas in radians
    pub fn rotate(&mut self, delta_yaw: f32, delta_pitch: f32) {
        self.yaw = (self.yaw + delta_yaw).rem_euclid(std::f32::consts::TAU);
        self.pitch = (self.pitch + delta_pitch).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Update camera aspect ratio for viewport changes
    pub fn set_aspect_ratio(&mut self, aspect: f32) {
        if (self.aspect - aspect).abs() > 0.01 {
            log::info!("Camera aspect ratio changed: {:.3} -> {:.3}", self.aspect, aspect);
        }
        self.aspect = aspect;
    }

    /// World to view transform
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at(self.position, self.position + self.forward(), Vec3::y())
    }

    /// View to clip transform
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective(self.fov, self.aspect, self.near, self.far)
    }
}
