//! Colour helpers

use super::math::Vec4;

/// Fully saturated, half-bright colour for a hue in `[0, 1)`.
///
/// Equivalent to HSV(360 * hue, 1.0, 0.5) with alpha 1. Hues outside the
/// range wrap.
pub fn colour_from_hue(hue: f32) -> Vec4 {
    const VALUE: f32 = 0.5;
    let h = hue.rem_euclid(1.0) * 6.0;
    // With saturation 1 the chroma equals the value and the secondary
    // channel ramps linearly inside each sextant.
    let x = VALUE * (1.0 - ((h % 2.0) - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (VALUE, x, 0.0),
        1 => (x, VALUE, 0.0),
        2 => (0.0, VALUE, x),
        3 => (0.0, x, VALUE),
        4 => (x, 0.0, VALUE),
        _ => (VALUE, 0.0, x),
    };
    Vec4::new(r, g, b, 1.0)
}

/// Opaque RGB colour
pub fn rgb(r: f32, g: f32, b: f32) -> Vec4 {
    Vec4::new(r, g, b, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_primaries() {
        assert_relative_eq!(colour_from_hue(0.0), rgb(0.5, 0.0, 0.0));
        assert_relative_eq!(colour_from_hue(1.0 / 3.0), rgb(0.0, 0.5, 0.0), epsilon = 1e-5);
        assert_relative_eq!(colour_from_hue(2.0 / 3.0), rgb(0.0, 0.0, 0.5), epsilon = 1e-5);
    }

    #[test]
    fn test_secondaries() {
        assert_relative_eq!(colour_from_hue(1.0 / 6.0), rgb(0.5, 0.5, 0.0), epsilon = 1e-5);
        assert_relative_eq!(colour_from_hue(0.5), rgb(0.0, 0.5, 0.5), epsilon = 1e-5);
        assert_relative_eq!(colour_from_hue(5.0 / 6.0), rgb(0.5, 0.0, 0.5), epsilon = 1e-5);
    }

    #[test]
    fn test_secondary_channel_ramps() {
        // Red to yellow, a quarter of the way in
        assert_relative_eq!(colour_from_hue(1.0 / 24.0), rgb(0.5, 0.125, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_hue_wraps() {
        assert_relative_eq!(colour_from_hue(1.25), colour_from_hue(0.25), epsilon = 1e-5);
        assert_relative_eq!(colour_from_hue(-0.75), colour_from_hue(0.25), epsilon = 1e-5);
    }
}
