//! Image files as field sources.

use flowfield_core::{FieldError, ImageLoader, PixelBuffer};
use image::RgbaImage;

/// Loads field source images from the filesystem with the `image` crate.
///
/// The decoded image is drawn at the origin of a transparent
/// `width × height` canvas, so larger images are cropped and smaller ones
/// leave zero bytes to the right and below.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageFileLoader;

impl ImageLoader for ImageFileLoader {
    fn load(&self, reference: &str, width: usize, height: usize) -> Result<PixelBuffer, FieldError> {
        let decoded = image::open(reference)
            .map_err(|e| FieldError::Image(format!("{reference}: {e}")))?
            .to_rgba8();
        let w = u32::try_from(width).map_err(|_| FieldError::InvalidDimensions)?;
        let h = u32::try_from(height).map_err(|_| FieldError::InvalidDimensions)?;
        let mut canvas = RgbaImage::new(w, h);
        image::imageops::replace(&mut canvas, &decoded, 0, 0);
        log::debug!(
            "loaded {reference} ({}x{}) onto {width}x{height} canvas",
            decoded.width(),
            decoded.height()
        );
        PixelBuffer::new(width, height, canvas.into_raw())
    }
}
