//! Field source descriptors: where a vector field's directions come from.
//!
//! A source is either an opaque image reference (JSON string) or a noise
//! configuration (JSON object), matching the construction-time config:
//!
//! ```json
//! { "seed": 42, "res": { "x": 0.02, "y": 0.02, "z": 0.02 }, "kind": "perlin" }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FieldError;
use crate::noise_source::NoiseKind;
use crate::params::{param_nonzero_f64, param_string};

/// Default noise-space step per column, row and layer.
pub const DEFAULT_NOISE_STEP: f64 = 0.02;

/// Noise-space offsets added per column (`x`), per row (`y`) and per layer (`z`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseResolution {
    /// Offset added per column.
    pub x: f64,
    /// Offset added per row; restarts at 0 for every column.
    pub y: f64,
    /// Offset added per layer.
    pub z: f64,
}

impl Default for NoiseResolution {
    fn default() -> Self {
        Self {
            x: DEFAULT_NOISE_STEP,
            y: DEFAULT_NOISE_STEP,
            z: DEFAULT_NOISE_STEP,
        }
    }
}

/// Configuration for a noise-sourced field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NoiseConfig {
    /// Seed passed to [`NoiseSource::seed`](crate::noise_source::NoiseSource::seed).
    pub seed: u32,
    /// Noise-space steps between neighbouring cells.
    #[serde(default)]
    pub res: NoiseResolution,
    /// Which noise generator to use.
    #[serde(default)]
    pub kind: NoiseKind,
}

impl NoiseConfig {
    /// Reads a noise config from JSON. Missing or zero steps fall back to
    /// [`DEFAULT_NOISE_STEP`]; an unknown `kind` falls back to Perlin.
    pub fn from_json(config: &Value) -> Self {
        let res = config.get("res").unwrap_or(&Value::Null);
        let kind = param_string(config, "kind", "perlin");
        Self {
            seed: seed_from_json(config.get("seed").unwrap_or(&Value::Null)),
            res: NoiseResolution {
                x: param_nonzero_f64(res, "x", DEFAULT_NOISE_STEP),
                y: param_nonzero_f64(res, "y", DEFAULT_NOISE_STEP),
                z: param_nonzero_f64(res, "z", DEFAULT_NOISE_STEP),
            },
            kind: NoiseKind::from_name(&kind).unwrap_or_else(|| {
                log::warn!("unknown noise kind '{kind}', using perlin");
                NoiseKind::Perlin
            }),
        }
    }
}

/// Folds an arbitrary JSON seed into the 32-bit seed the noise generators take.
///
/// Unsigned integers are truncated, other numbers fold their bit pattern,
/// strings hash with FNV-1a, booleans map to 0/1, and anything else is 0.
pub fn seed_from_json(seed: &Value) -> u32 {
    match seed {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                u as u32
            } else if let Some(i) = n.as_i64() {
                fold_u64(i as u64)
            } else {
                fold_u64(n.as_f64().unwrap_or(0.0).to_bits())
            }
        }
        Value::String(s) => fnv1a(s.as_bytes()),
        Value::Bool(b) => u32::from(*b),
        _ => 0,
    }
}

fn fold_u64(bits: u64) -> u32 {
    (bits as u32).wrapping_add((bits >> 32) as u32)
}

fn fnv1a(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0x811c_9dc5_u32, |hash, &b| {
        (hash ^ u32::from(b)).wrapping_mul(0x0100_0193)
    })
}

/// Where a field's cell directions come from.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSource {
    /// Opaque image reference resolved by an [`ImageLoader`](crate::image_source::ImageLoader).
    Image(String),
    /// Procedural noise.
    Noise(NoiseConfig),
}

impl FieldSource {
    /// Interprets a JSON source descriptor.
    ///
    /// Strings select the image path, objects (and `null`, an empty config)
    /// select the noise path. Any other JSON type is `InvalidSource`.
    pub fn from_json(source: &Value) -> Result<Self, FieldError> {
        match source {
            Value::String(reference) => Ok(FieldSource::Image(reference.clone())),
            Value::Object(_) | Value::Null => Ok(FieldSource::Noise(NoiseConfig::from_json(source))),
            other => Err(FieldError::InvalidSource(json_type_name(other).into())),
        }
    }

    /// Converts back into the JSON descriptor form.
    pub fn to_json(&self) -> Value {
        match self {
            FieldSource::Image(reference) => Value::String(reference.clone()),
            FieldSource::Noise(config) => serde_json::to_value(config).unwrap_or(Value::Null),
        }
    }
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
