//! Reproducible description of one flow-field render.
//!
//! A [`RunSpec`] records the plane size, field layout, source descriptor,
//! simulation parameters, PRNG seed and step count. Feeding the same spec
//! to the same binary reproduces the same trail.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::FieldError;
use crate::field::FieldDims;

/// Inputs of one render, serialized as JSON.
///
/// The generated grid is never stored, only what is needed to rebuild it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSpec {
    /// Plane width in pixels.
    pub width: usize,
    /// Plane height in pixels.
    pub height: usize,
    /// Field layers; defaults to 1.
    #[serde(default = "default_depth")]
    pub depth: usize,
    /// Cell edge length in pixels.
    pub resolution: usize,
    /// Field source descriptor: a string for an image, an object for noise.
    #[serde(default = "empty_object")]
    pub source: Value,
    /// Simulation parameters.
    #[serde(default = "empty_object")]
    pub params: Value,
    /// Seeds particle spawning.
    pub seed: u64,
    /// Simulation ticks to run before the snapshot.
    #[serde(default)]
    pub steps: usize,
}

fn default_depth() -> usize {
    1
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

impl RunSpec {
    /// A single-layer noise run with default params and no steps.
    pub fn new(width: usize, height: usize, resolution: usize, seed: u64) -> Self {
        Self {
            width,
            height,
            depth: default_depth(),
            resolution,
            source: empty_object(),
            params: empty_object(),
            seed,
            steps: 0,
        }
    }

    /// The field dimensions this run describes.
    pub fn dims(&self) -> FieldDims {
        FieldDims::new(self.width, self.height, self.depth, self.resolution)
    }

    /// Checks the plane and grid are non-empty and addressable.
    pub fn validate(&self) -> Result<(), FieldError> {
        if self.width == 0 || self.height == 0 {
            return Err(FieldError::InvalidDimensions);
        }
        self.width
            .checked_mul(self.height)
            .ok_or(FieldError::InvalidDimensions)?;
        self.dims().grid_size().map(|_| ())
    }
}
