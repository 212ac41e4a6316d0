//! Point-mass particle with a fixed-order kinematic step.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::params::{param_f64, param_nonzero_f64};
use crate::vector::Vector;

const DEFAULT_X: f64 = 100.0;
const DEFAULT_Y: f64 = 100.0;

/// Initial state of a particle: Cartesian position, polar velocity, and a
/// downward gravity magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleConfig {
    /// Spawn x in world units.
    pub x: f64,
    /// Spawn y in world units; y grows downward.
    pub y: f64,
    /// Initial velocity length, world units per tick.
    pub speed: f64,
    /// Radians.
    pub direction: f64,
    /// Downward acceleration added after each move.
    pub gravity: f64,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            x: DEFAULT_X,
            y: DEFAULT_Y,
            speed: 0.0,
            direction: 0.0,
            gravity: 0.0,
        }
    }
}

impl ParticleConfig {
    /// Reads a config from JSON, defaulting each missing key.
    ///
    /// A spawn coordinate of 0 (or NaN) counts as unset and falls back to
    /// 100, the same rule `NoiseConfig::from_json` applies to noise steps.
    pub fn from_json(params: &Value) -> Self {
        Self {
            x: param_nonzero_f64(params, "x", DEFAULT_X),
            y: param_nonzero_f64(params, "y", DEFAULT_Y),
            speed: param_f64(params, "speed", 0.0),
            direction: param_f64(params, "direction", 0.0),
            gravity: param_f64(params, "gravity", 0.0),
        }
    }
}

/// A particle moved by its own velocity plus constant gravity.
///
/// Gravity only has a y component; y grows downward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    /// Current location in world units.
    pub position: Vector,
    /// Displacement applied on the next [`update`](Self::update).
    pub velocity: Vector,
    /// Constant `(0, g)` added to the velocity after each move.
    pub gravity: Vector,
}

impl Particle {
    /// Creates a particle at `(x, y)` heading along `direction`.
    ///
    /// The velocity is built by stretching a zero vector to `speed` and then
    /// turning it to `direction`, so its angle is always `direction` and its
    /// length is `|speed|`, even for a negative speed.
    pub fn new(config: &ParticleConfig) -> Self {
        let mut velocity = Vector::default();
        velocity.set_length(config.speed);
        velocity.set_angle(config.direction);
        Self {
            position: Vector::new(config.x, config.y),
            velocity,
            gravity: Vector::new(0.0, config.gravity),
        }
    }

    /// Adds `force` to the velocity.
    pub fn accelerate(&mut self, force: &Vector) {
        self.velocity.add_to(force);
    }

    /// Advances one tick: move by the current velocity, then apply gravity.
    ///
    /// Gravity reaches the position one tick late. Swapping the two steps
    /// changes every trajectory with non-zero gravity.
    pub fn update(&mut self) {
        self.position.add_to(&self.velocity);
        let gravity = self.gravity;
        self.accelerate(&gravity);
    }
}

impl Default for Particle {
    fn default() -> Self {
        Self::new(&ParticleConfig::default())
    }
}
