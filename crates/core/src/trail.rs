//! Scalar accumulation grid recording where particles have been.
//!
//! A `Trail` stores one non-negative density per world-unit pixel in
//! row-major order. The simulation deposits into it every tick and the
//! renderer reads it back normalized to [0, 1].

use crate::error::FieldError;
use crate::vector::Vector;

/// Per-pixel accumulation of particle visits.
///
/// Densities are stored row-major as `f64`; decay floors them at 0.
#[derive(Debug, Clone)]
pub struct Trail {
    width: usize,
    height: usize,
    data: Vec<f64>,
}

impl Trail {
    /// Creates an empty trail. Zero or overflowing dimensions are rejected.
    pub fn new(width: usize, height: usize) -> Result<Self, FieldError> {
        if width == 0 || height == 0 {
            return Err(FieldError::InvalidDimensions);
        }
        let len = width
            .checked_mul(height)
            .ok_or(FieldError::InvalidDimensions)?;
        Ok(Self {
            width,
            height,
            data: vec![0.0; len],
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Raw densities, row-major.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Density of pixel `(x, y)`, or `None` outside the grid.
    pub fn get(&self, x: usize, y: usize) -> Option<f64> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.data[y * self.width + x])
    }

    /// Adds `amount` to the pixel under `position`. Positions outside
    /// `[0, width) × [0, height)` and non-finite positions are ignored.
    pub fn deposit(&mut self, position: &Vector, amount: f64) {
        let (x, y) = (position.x(), position.y());
        if !(x >= 0.0 && y >= 0.0 && x < self.width as f64 && y < self.height as f64) {
            return;
        }
        let idx = y as usize * self.width + x as usize;
        self.data[idx] += amount;
    }

    /// Multiplies every density by `factor`, flooring at 0.
    pub fn decay(&mut self, factor: f64) {
        self.data
            .iter_mut()
            .for_each(|v| *v = (*v * factor).max(0.0));
    }

    /// Highest density, 0 for an untouched trail.
    pub fn max(&self) -> f64 {
        self.data.iter().copied().fold(0.0, f64::max)
    }

    /// Densities divided by the current maximum, so the brightest pixel is 1.
    /// An untouched trail stays all zeros.
    pub fn normalized(&self) -> Vec<f64> {
        let max = self.max();
        if max <= 0.0 {
            return vec![0.0; self.data.len()];
        }
        self.data.iter().map(|v| (v / max).clamp(0.0, 1.0)).collect()
    }
}
