//! Image loading utilities for texture data
//!
//! Decodes image files through the `image` crate into tightly packed RGBA8.

use std::path::Path;

use super::AssetError;

/// Loaded image data ready for GPU upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    /// Raw RGBA pixel data, rows top to bottom
    pub data: Vec<u8>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
}

impl ImageData {
    /// Load an image from a file path.
    ///
    /// With `flip` the rows are reversed so the first row in memory is the
    /// bottom of the picture, matching UVs authored with a bottom-left origin.
    pub fn from_file<P: AsRef<Path>>(path: P, flip: bool) -> Result<Self, AssetError> {
        let path_ref = path.as_ref();

        log::debug!("Loading image from: {:?}", path_ref);

        let img = image::open(path_ref).map_err(|e| {
            AssetError::LoadFailed(format!("Failed to load image {}: {}", path_ref.display(), e))
        })?;
        let img = if flip { img.flipv() } else { img };

        let rgba_img = img.to_rgba8();
        let (width, height) = rgba_img.dimensions();

        log::info!("Loaded image {}x{} from {:?}", width, height, path_ref);

        Ok(Self {
            data: rgba_img.into_raw(),
            width,
            height,
        })
    }

    /// Decode an in-memory encoded image
    pub fn from_bytes(bytes: &[u8], flip: bool) -> Result<Self, AssetError> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| AssetError::LoadFailed(format!("Failed to load image from bytes: {}", e)))?;
        let img = if flip { img.flipv() } else { img };

        let rgba_img = img.to_rgba8();
        let (width, height) = rgba_img.dimensions();

        Ok(Self {
            data: rgba_img.into_raw(),
            width,
            height,
        })
    }

    /// Create a solid color image
    pub fn solid_color(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixel_count = (width * height) as usize;
        Self {
            data: color.repeat(pixel_count),
            width,
            height,
        }
    }

    /// Get the size of the image data in bytes
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// RGBA of the pixel at (x, y), row 0 first in memory
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = ((y * self.width + x) * 4) as usize;
        let px = self.data.get(offset..offset + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, ImageFormat, Rgba};
    use std::io::Cursor;

    fn encoded_two_row_png() -> Vec<u8> {
        // 1x2: red on top, blue below
        let img: ImageBuffer<Rgba<u8>, Vec<u8>> = ImageBuffer::from_fn(1, 2, |_, y| {
            if y == 0 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        });
        let mut bytes = Cursor::new(Vec::new());
        img.write_to(&mut bytes, ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    #[test]
    fn test_solid_color_image() {
        let img = ImageData::solid_color(4, 4, [255, 0, 0, 255]);
        assert_eq!(img.width, 4);
        assert_eq!(img.height, 4);
        assert_eq!(img.size_bytes(), 4 * 4 * 4);
        assert_eq!(img.pixel(3, 3), Some([255, 0, 0, 255]));
        assert_eq!(img.pixel(4, 0), None);
    }

    #[test]
    fn test_flip_reverses_rows() {
        let bytes = encoded_two_row_png();

        let upright = ImageData::from_bytes(&bytes, false).unwrap();
        assert_eq!(upright.pixel(0, 0), Some([255, 0, 0, 255]));

        let flipped = ImageData::from_bytes(&bytes, true).unwrap();
        assert_eq!(flipped.pixel(0, 0), Some([0, 0, 255, 255]));
        assert_eq!(flipped.pixel(0, 1), Some([255, 0, 0, 255]));
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let err = ImageData::from_file("does/not/exist.png", false).unwrap_err();
        assert!(matches!(err, AssetError::LoadFailed(_)));
    }
}
