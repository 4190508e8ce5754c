//! Render modes and the passes each one draws

use std::fmt;

use crate::foundation::math::Vec4;
use crate::render::api::{CullMode, PolygonMode, RasterState};

/// Line width of the outline pass unless configured otherwise
pub const DEFAULT_OUTLINE_WIDTH: f32 = 6.0;

/// Global shading mode, switched by input between frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderMode {
    /// Each node draws with its own material
    #[default]
    Default,
    /// Every node draws with the toon material
    Toon,
    /// Inflated back-face outlines, then toon fill
    ToonOutlines,
}

/// Material used for a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialOverride {
    /// Node's own material
    None,
    /// Shared toon material
    Toon,
    /// Shared outline material
    Outline,
}

/// One traversal of the scene forest
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassConfig {
    /// Fixed-function state for the pass
    pub raster: RasterState,
    /// Material applied to every node in the pass
    pub material: MaterialOverride,
}

impl RenderMode {
    /// All modes in key order
    pub const ALL: [Self; 3] = [Self::Default, Self::Toon, Self::ToonOutlines];

    /// Clear colour for the mode
    pub fn clear_colour(self) -> Vec4 {
        match self {
            Self::Default => Vec4::new(0.8, 0.8, 0.8, 0.0),
            Self::Toon => Vec4::new(0.0, 0.8, 0.8, 0.0),
            Self::ToonOutlines => Vec4::new(0.8, 0.0, 0.8, 0.0),
        }
    }

    /// Ordered passes; outlines come before the fill they surround
    pub fn passes(self, outline_width: f32) -> Vec<PassConfig> {
        let unculled_fill = RasterState {
            cull: CullMode::None,
            polygon: PolygonMode::Fill,
            line_width: 1.0,
        };

        match self {
            Self::Default => vec![PassConfig {
                raster: unculled_fill,
                material: MaterialOverride::None,
            }],
            Self::Toon => vec![PassConfig {
                raster: unculled_fill,
                material: MaterialOverride::Toon,
            }],
            Self::ToonOutlines => vec![
                PassConfig {
                    raster: RasterState {
                        cull: CullMode::Front,
                        polygon: PolygonMode::Line,
                        line_width: outline_width,
                    },
                    material: MaterialOverride::Outline,
                },
                PassConfig {
                    raster: RasterState {
                        cull: CullMode::Back,
                        polygon: PolygonMode::Fill,
                        line_width: 1.0,
                    },
                    material: MaterialOverride::Toon,
                },
            ],
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("default"),
            Self::Toon => f.write_str("toon"),
            Self::ToonOutlines => f.write_str("toon+outlines"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_clear_colours() {
        assert_relative_eq!(RenderMode::Default.clear_colour(), Vec4::new(0.8, 0.8, 0.8, 0.0));
        assert_relative_eq!(RenderMode::Toon.clear_colour(), Vec4::new(0.0, 0.8, 0.8, 0.0));
        assert_relative_eq!(RenderMode::ToonOutlines.clear_colour(), Vec4::new(0.8, 0.0, 0.8, 0.0));
    }

    #[test]
    fn test_single_pass_modes_disable_culling() {
        for mode in [RenderMode::Default, RenderMode::Toon] {
            let passes = mode.passes(DEFAULT_OUTLINE_WIDTH);
            assert_eq!(passes.len(), 1);
            assert_eq!(passes[0].raster.cull, CullMode::None);
            assert_eq!(passes[0].raster.polygon, PolygonMode::Fill);
        }
    }

    #[test]
    fn test_outline_pass_precedes_toon_fill() {
        let passes = RenderMode::ToonOutlines.passes(DEFAULT_OUTLINE_WIDTH);
        assert_eq!(passes.len(), 2);

        assert_eq!(passes[0].material, MaterialOverride::Outline);
        assert_eq!(passes[0].raster.cull, CullMode::Front);
        assert_eq!(passes[0].raster.polygon, PolygonMode::Line);
        assert_relative_eq!(passes[0].raster.line_width, 6.0);

        assert_eq!(passes[1].material, MaterialOverride::Toon);
        assert_eq!(passes[1].raster.cull, CullMode::Back);
        assert_eq!(passes[1].raster.polygon, PolygonMode::Fill);
    }
}
