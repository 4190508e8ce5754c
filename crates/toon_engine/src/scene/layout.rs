//! Placement helpers for building scenes

use crate::foundation::math::{constants, Vec3};

/// `count` points evenly spaced on a horizontal circle, starting on +X
pub fn ring_positions(count: usize, radius: f32, height: f32) -> Vec<Vec3> {
    if count == 0 {
        return Vec::new();
    }
    let step = constants::TAU / count as f32;
    (0..count)
        .map(|i| {
            let angle = step * i as f32;
            Vec3::new(angle.cos() * radius, height, angle.sin() * radius)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::utils::deg_to_rad;
    use approx::assert_relative_eq;

    #[test]
    fn test_twelve_on_a_ring() {
        let ring = ring_positions(12, 10.0, 2.0);
        assert_eq!(ring.len(), 12);
        for (i, p) in ring.iter().enumerate() {
            let angle = deg_to_rad(30.0 * i as f32);
            assert_relative_eq!(*p, Vec3::new(angle.cos() * 10.0, 2.0, angle.sin() * 10.0), epsilon = 1e-4);
        }
    }

    #[test]
    fn test_empty_ring() {
        assert!(ring_positions(0, 10.0, 2.0).is_empty());
    }
}
