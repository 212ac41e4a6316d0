//! Two-dimensional vector value type with Cartesian and polar views.
//!
//! Cartesian `(x, y)` is the stored representation. Polar accessors derive
//! `length` and `angle` on demand, and the polar mutators rewrite both
//! components from the unchanged polar half plus the new value.

use std::ops::{AddAssign, Mul};

use glam::DVec2;

/// A 2D vector. `Copy`, so every copy is independent of its source.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vector(DVec2);

impl Vector {
    /// Creates a vector from Cartesian components.
    pub fn new(x: f64, y: f64) -> Self {
        Self(DVec2::new(x, y))
    }

    /// Creates a vector with the given length pointing at `angle` radians.
    pub fn from_polar(length: f64, angle: f64) -> Self {
        Self::new(length * angle.cos(), length * angle.sin())
    }

    /// Horizontal component.
    pub fn x(&self) -> f64 {
        self.0.x
    }

    /// Vertical component; y grows downward on screen.
    pub fn y(&self) -> f64 {
        self.0.y
    }

    /// Direction in radians, `atan2(y, x)`. A zero vector reports 0.
    pub fn angle(&self) -> f64 {
        self.0.y.atan2(self.0.x)
    }

    /// Euclidean norm.
    pub fn length(&self) -> f64 {
        self.0.length()
    }

    /// Rotates to `angle` radians, keeping the current length.
    pub fn set_angle(&mut self, angle: f64) {
        *self = Self::from_polar(self.length(), angle);
    }

    /// Rescales to `length`, keeping the current angle.
    ///
    /// A zero vector has angle 0, so it ends up pointing along +x.
    pub fn set_length(&mut self, length: f64) {
        *self = Self::from_polar(length, self.angle());
    }

    /// Returns `self + other` as a new vector.
    #[allow(clippy::should_implement_trait)]
    pub fn add(&self, other: &Vector) -> Vector {
        Self(self.0 + other.0)
    }

    /// Adds `other` into `self` componentwise.
    pub fn add_to(&mut self, other: &Vector) {
        self.0 += other.0;
    }
}

impl AddAssign for Vector {
    fn add_assign(&mut self, rhs: Vector) {
        self.add_to(&rhs);
    }
}

impl Mul<f64> for Vector {
    type Output = Vector;

    fn mul(self, rhs: f64) -> Vector {
        Vector(self.0 * rhs)
    }
}
