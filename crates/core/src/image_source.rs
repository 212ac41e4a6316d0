//! Pixel buffers and the image-loading collaborator interface.
//!
//! Image decoding lives outside the core. A loader resolves an opaque
//! reference (a path, URL or handle) into a [`PixelBuffer`] covering the
//! field's full `width × height`, RGBA8, row-major, top-to-bottom.

use crate::error::FieldError;

/// Bytes per RGBA8 pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// An RGBA8 pixel buffer, row-major, top row first.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wraps raw RGBA bytes, validating `data.len() == width * height * 4`.
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Result<Self, FieldError> {
        if width == 0 || height == 0 {
            return Err(FieldError::InvalidDimensions);
        }
        let expected = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(BYTES_PER_PIXEL))
            .ok_or(FieldError::InvalidDimensions)?;
        if data.len() != expected {
            return Err(FieldError::PixelBufferSize {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A buffer where every pixel has the given RGBA value.
    pub fn filled(width: usize, height: usize, rgba: [u8; 4]) -> Result<Self, FieldError> {
        let len = width
            .checked_mul(height)
            .ok_or(FieldError::InvalidDimensions)?;
        Self::new(width, height, rgba.repeat(len))
    }

    /// Image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Read-only access to the RGBA8 bytes, row-major, four per pixel.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Red byte of the pixel at flat pixel index `i`, or 0 past the end.
    pub fn red_at(&self, i: usize) -> u8 {
        i.checked_mul(BYTES_PER_PIXEL)
            .and_then(|b| self.data.get(b))
            .copied()
            .unwrap_or(0)
    }
}

/// Resolves an image reference into a pixel buffer sized to the field.
///
/// Loaders run on a background thread, hence `Send + 'static`.
pub trait ImageLoader: Send + 'static {
    fn load(&self, reference: &str, width: usize, height: usize)
        -> Result<PixelBuffer, FieldError>;
}

impl<F> ImageLoader for F
where
    F: Fn(&str, usize, usize) -> Result<PixelBuffer, FieldError> + Send + 'static,
{
    fn load(&self, reference: &str, width: usize, height: usize) -> Result<PixelBuffer, FieldError> {
        self(reference, width, height)
    }
}

/// Loader for fields that never take an image source. Always fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoImageLoader;

impl ImageLoader for NoImageLoader {
    fn load(&self, reference: &str, _width: usize, _height: usize) -> Result<PixelBuffer, FieldError> {
        Err(FieldError::Image(format!(
            "no image loader configured for '{reference}'"
        )))
    }
}
