//! Error types for the flowfield core.

use thiserror::Error;

/// Errors produced by field construction, lookup, and image sourcing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
    /// Width, height, depth or resolution produced an empty grid.
    #[error("invalid dimensions: width, height, depth and resolution must yield a non-empty grid")]
    InvalidDimensions,

    /// The source descriptor was neither an image reference nor a noise config.
    #[error("invalid field source: expected an image reference or a noise config, got {0}")]
    InvalidSource(String),

    /// `lookup` was called before the grid finished generating.
    #[error("vector field is not ready")]
    NotReady,

    /// The image collaborator failed to produce a pixel buffer.
    #[error("image source failed: {0}")]
    Image(String),

    /// A pixel buffer did not hold `width * height * 4` bytes.
    #[error("pixel buffer size mismatch: expected {expected} bytes, got {got}")]
    PixelBufferSize { expected: usize, got: usize },
}
