//! Per-node motion driven by the frame delta

use std::fmt::Debug;

use crate::foundation::colour::colour_from_hue;
use crate::foundation::math::{Transform, Unit, Vec3, Vec4};

/// The parts of a node a behaviour may change
pub struct NodeState<'a> {
    /// Local transform
    pub transform: &'a mut Transform,
    /// Per-node colour
    pub tint: &'a mut Option<Vec4>,
}

/// Something that animates a node once per update
pub trait Behaviour: Debug {
    /// Advance by `dt` seconds
    fn update(&mut self, node: NodeState<'_>, dt: f32);
}

/// Moves along a horizontal circle with a vertical bob four times per lap
#[derive(Debug, Clone, PartialEq)]
pub struct LightOrbit {
    /// Circle radius
    pub radius: f32,
    /// Centre height
    pub height: f32,
    /// Bob amplitude
    pub bob: f32,
    /// Current angle in radians
    pub angle: f32,
}

impl LightOrbit {
    /// Orbit starting at angle zero
    pub fn new(radius: f32, height: f32, bob: f32) -> Self {
        Self {
            radius,
            height,
            bob,
            angle: 0.0,
        }
    }

    /// Position for the current angle
    pub fn position(&self) -> Vec3 {
        Vec3::new(
            self.angle.cos() * self.radius,
            (4.0 * self.angle).cos() * self.bob + self.height,
            self.angle.sin() * self.radius,
        )
    }
}

impl Behaviour for LightOrbit {
    fn update(&mut self, node: NodeState<'_>, dt: f32) {
        if dt == 0.0 {
            return;
        }
        self.angle += dt;
        node.transform.position = self.position();
    }
}

/// Cycles the tint around the colour wheel
#[derive(Debug, Clone, PartialEq)]
pub struct HueCycle {
    /// Hue turns per second
    pub speed: f32,
    /// Current hue in `[0, 1)`
    pub hue: f32,
}

impl HueCycle {
    /// Start at hue zero
    pub fn new(speed: f32) -> Self {
        Self { speed, hue: 0.0 }
    }
}

impl Behaviour for HueCycle {
    fn update(&mut self, node: NodeState<'_>, dt: f32) {
        self.hue = (self.hue + dt * self.speed).rem_euclid(1.0);
        *node.tint = Some(colour_from_hue(self.hue));
    }
}

/// Constant rotation about an axis
#[derive(Debug, Clone, PartialEq)]
pub struct Spin {
    /// Rotation axis
    pub axis: Unit<Vec3>,
    /// Angular speed
    pub radians_per_second: f32,
}

impl Spin {
    /// Spin about `axis`
    pub fn new(axis: Vec3, radians_per_second: f32) -> Self {
        Self {
            axis: Unit::new_normalize(axis),
            radians_per_second,
        }
    }
}

impl Behaviour for Spin {
    fn update(&mut self, node: NodeState<'_>, dt: f32) {
        node.transform.rotate(&self.axis, self.radians_per_second * dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_orbit_follows_light_path() {
        let mut orbit = LightOrbit::new(10.0, 10.0, 2.0);
        let mut transform = Transform::default();
        let mut tint = None;

        orbit.update(NodeState { transform: &mut transform, tint: &mut tint }, 0.5);
        assert_relative_eq!(
            transform.position,
            Vec3::new(0.5_f32.cos() * 10.0, 2.0_f32.cos() * 2.0 + 10.0, 0.5_f32.sin() * 10.0),
            epsilon = 1e-5
        );
    }

    #[test]
    fn test_orbit_holds_still_at_zero_dt() {
        let mut orbit = LightOrbit::new(10.0, 10.0, 2.0);
        let mut transform = Transform::from_position(Vec3::new(0.0, 5.0, 0.0));
        let mut tint = None;

        orbit.update(NodeState { transform: &mut transform, tint: &mut tint }, 0.0);
        assert_relative_eq!(transform.position, Vec3::new(0.0, 5.0, 0.0));
    }

    #[test]
    fn test_hue_wraps_at_one() {
        let mut cycle = HueCycle::new(0.1);
        cycle.hue = 0.95;
        let mut transform = Transform::default();
        let mut tint = None;

        cycle.update(NodeState { transform: &mut transform, tint: &mut tint }, 1.0);
        assert_relative_eq!(cycle.hue, 0.05, epsilon = 1e-5);
        assert!(tint.is_some());
    }

    #[test]
    fn test_hue_wraps_after_long_step() {
        let mut cycle = HueCycle::new(1.0);
        let mut transform = Transform::default();
        let mut tint = None;

        cycle.update(NodeState { transform: &mut transform, tint: &mut tint }, 2.5);
        assert_relative_eq!(cycle.hue, 0.5, epsilon = 1e-5);
        assert_eq!(tint, Some(colour_from_hue(0.5)));

        cycle.update(NodeState { transform: &mut transform, tint: &mut tint }, 3.75);
        assert!((0.0..1.0).contains(&cycle.hue));
        assert_relative_eq!(cycle.hue, 0.25, epsilon = 1e-5);
    }

    #[test]
    fn test_spin_rotates() {
        let mut spin = Spin::new(Vec3::y(), std::f32::consts::FRAC_PI_2);
        let mut transform = Transform::default();
        let mut tint = None;

        spin.update(NodeState { transform: &mut transform, tint: &mut tint }, 1.0);
        assert_relative_eq!(transform.rotation.angle(), std::f32::consts::FRAC_PI_2, epsilon = 1e-5);

        // Steps accumulate onto the current rotation
        spin.update(NodeState { transform: &mut transform, tint: &mut tint }, 1.0);
        assert_relative_eq!(transform.rotation.angle(), std::f32::consts::PI, epsilon = 1e-4);
        assert_relative_eq!(transform.rotation.axis().unwrap().y.abs(), 1.0, epsilon = 1e-4);
    }
}
