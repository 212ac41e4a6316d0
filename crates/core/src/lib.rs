#![deny(unsafe_code)]
//! Core types for flowfield: grids of direction vectors that steer particles.
//!
//! Provides the `Vector` value type, the layered `VectorField` (noise or
//! image sourced, nearest-cell lookup), the `Particle` integrator, the
//! `NoiseSource` and `ImageLoader` collaborator interfaces, the `Trail`
//! density map, the `Engine` trait, and the `RunSpec` run descriptor.

pub mod engine;
pub mod error;
pub mod field;
pub mod image_source;
pub mod noise_source;
pub mod params;
pub mod particle;
pub mod prng;
pub mod run_spec;
pub mod source;
pub mod trail;
pub mod vector;

pub use engine::Engine;
pub use error::FieldError;
pub use field::{FieldDims, VectorField};
pub use image_source::{ImageLoader, NoImageLoader, PixelBuffer};
pub use noise_source::{NoiseKind, NoiseSource, PerlinNoise, SimplexNoise};
pub use particle::{Particle, ParticleConfig};
pub use prng::Xorshift64;
pub use run_spec::RunSpec;
pub use source::{FieldSource, NoiseConfig, NoiseResolution};
pub use trail::Trail;
pub use vector::Vector;
