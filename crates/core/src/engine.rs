//! The `Engine` trait implemented by flow simulations.
//!
//! Object-safe, so drivers can hold `Box<dyn Engine>`.

use serde_json::Value;

use crate::error::FieldError;
use crate::trail::Trail;

/// A step-based simulation whose visible output is a [`Trail`].
pub trait Engine {
    /// Advances the simulation by one tick.
    fn step(&mut self) -> Result<(), FieldError>;

    /// Accumulated particle density.
    fn trail(&self) -> &Trail;

    /// Current parameter values as a JSON object.
    fn params(&self) -> Value;

    /// Types, ranges and defaults of every parameter.
    fn param_schema(&self) -> Value;
}
