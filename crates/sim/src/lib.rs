#![deny(unsafe_code)]
//! Particle flow simulation over a [`VectorField`].
//!
//! Each tick the simulation optionally advances the field to its next
//! layer, then for every particle looks up the cell under it, rescales that
//! unit direction to the steering strength, accelerates the particle by it
//! and integrates one step. Particles wrap around the plane's edges and
//! leave density in a [`Trail`] that the renderer turns into an image.

use flowfield_core::error::FieldError;
use flowfield_core::params::{param_f64, param_usize};
use flowfield_core::{
    Engine, ImageLoader, Particle, ParticleConfig, RunSpec, Trail, Vector, VectorField, Xorshift64,
};
use serde_json::{json, Value};

const DEFAULT_PARTICLES: usize = 500;
/// Initial speed of every spawned particle.
const DEFAULT_SPEED: f64 = 1.0;
/// Length the looked-up direction is scaled to before accelerating.
const DEFAULT_STEER: f64 = 0.1;
const DEFAULT_MAX_SPEED: f64 = 2.0;
const DEFAULT_GRAVITY: f64 = 0.0;
/// Ticks between layer advances.
const DEFAULT_LAYER_INTERVAL: usize = 1;
const DEFAULT_DEPOSIT: f64 = 1.0;
/// Per-tick trail multiplier; 1.0 keeps everything.
const DEFAULT_DECAY: f64 = 1.0;

/// Tunable constants of a flow simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowParams {
    /// Number of particles spawned.
    pub particles: usize,
    /// Initial particle speed.
    pub speed: f64,
    /// Length the looked-up cell direction is scaled to each tick.
    pub steer: f64,
    /// Velocity length cap applied after each update. Non-positive disables it.
    pub max_speed: f64,
    /// Downward acceleration applied after each move.
    pub gravity: f64,
    /// Advance the field layer every this many ticks. 0 never advances.
    pub layer_interval: usize,
    /// Trail density added per particle per tick.
    pub deposit: f64,
    /// Trail multiplier applied at the start of every tick.
    pub decay: f64,
}

impl Default for FlowParams {
    fn default() -> Self {
        Self {
            particles: DEFAULT_PARTICLES,
            speed: DEFAULT_SPEED,
            steer: DEFAULT_STEER,
            max_speed: DEFAULT_MAX_SPEED,
            gravity: DEFAULT_GRAVITY,
            layer_interval: DEFAULT_LAYER_INTERVAL,
            deposit: DEFAULT_DEPOSIT,
            decay: DEFAULT_DECAY,
        }
    }
}

impl FlowParams {
    /// Reads parameters from a JSON object, defaulting missing keys.
    pub fn from_json(params: &Value) -> Self {
        Self {
            particles: param_usize(params, "particles", DEFAULT_PARTICLES),
            speed: param_f64(params, "speed", DEFAULT_SPEED),
            steer: param_f64(params, "steer", DEFAULT_STEER),
            max_speed: param_f64(params, "max_speed", DEFAULT_MAX_SPEED),
            gravity: param_f64(params, "gravity", DEFAULT_GRAVITY),
            layer_interval: param_usize(params, "layer_interval", DEFAULT_LAYER_INTERVAL),
            deposit: param_f64(params, "deposit", DEFAULT_DEPOSIT),
            decay: param_f64(params, "decay", DEFAULT_DECAY),
        }
    }
}

/// A particle swarm flowing through a vector field.
pub struct FlowSim {
    field: VectorField,
    particles: Vec<Particle>,
    trail: Trail,
    params: FlowParams,
    tick: usize,
}

impl FlowSim {
    /// Creates a simulation over `field`, blocking until the field is ready.
    ///
    /// Particles spawn uniformly over the plane with random directions drawn
    /// from `seed`. Fails if the field cannot become ready.
    pub fn new(mut field: VectorField, seed: u64, params: FlowParams) -> Result<Self, FieldError> {
        field.wait_ready()?;
        let trail = Trail::new(field.width(), field.height())?;
        let particles = spawn_particles(&field, seed, &params);
        log::info!(
            "flow simulation: {} particles on {}x{} ({} rows x {} cols x {} layers)",
            particles.len(),
            field.width(),
            field.height(),
            field.rows(),
            field.cols(),
            field.depth()
        );
        Ok(Self {
            field,
            particles,
            trail,
            params,
            tick: 0,
        })
    }

    /// Builds the field described by `spec` and a simulation over it.
    pub fn from_spec<L: ImageLoader>(spec: &RunSpec, loader: L) -> Result<Self, FieldError> {
        spec.validate()?;
        let field = VectorField::from_json(spec.dims(), &spec.source, loader)?;
        Self::new(field, spec.seed, FlowParams::from_json(&spec.params))
    }

    /// The field the particles flow through.
    pub fn field(&self) -> &VectorField {
        &self.field
    }

    /// Mutable field access, for renderers that clear the dirty flag.
    pub fn field_mut(&mut self) -> &mut VectorField {
        &mut self.field
    }

    /// Current particle states, in spawn order.
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Ticks completed so far.
    pub fn tick(&self) -> usize {
        self.tick
    }
}

fn spawn_particles(field: &VectorField, seed: u64, params: &FlowParams) -> Vec<Particle> {
    let mut rng = Xorshift64::new(seed);
    let (w, h) = (field.width() as f64, field.height() as f64);
    (0..params.particles)
        .map(|_| {
            let x = rng.next_range(0.0, w);
            let y = rng.next_range(0.0, h);
            Particle::new(&ParticleConfig {
                x,
                y,
                speed: params.speed,
                direction: rng.next_angle(),
                gravity: params.gravity,
            })
        })
        .collect()
}

/// Wraps a coordinate into `[0, size)`.
fn wrap(coord: f64, size: f64) -> f64 {
    let wrapped = coord.rem_euclid(size);
    // rem_euclid can round tiny negatives up to `size`.
    if wrapped >= size {
        0.0
    } else {
        wrapped
    }
}

fn limit_speed(velocity: &mut Vector, max_speed: f64) {
    if max_speed > 0.0 && velocity.length() > max_speed {
        velocity.set_length(max_speed);
    }
}

impl Engine for FlowSim {
    fn step(&mut self) -> Result<(), FieldError> {
        let interval = self.params.layer_interval;
        if interval > 0 && self.tick > 0 && self.tick % interval == 0 {
            self.field.push_layer();
        }
        if self.params.decay != 1.0 {
            self.trail.decay(self.params.decay);
        }

        let (w, h) = (self.field.width() as f64, self.field.height() as f64);
        for particle in &mut self.particles {
            let mut steer = self.field.lookup(&particle.position)?;
            steer.set_length(self.params.steer);
            particle.accelerate(&steer);
            particle.update();
            limit_speed(&mut particle.velocity, self.params.max_speed);
            particle.position = Vector::new(
                wrap(particle.position.x(), w),
                wrap(particle.position.y(), h),
            );
            self.trail.deposit(&particle.position, self.params.deposit);
        }

        self.tick += 1;
        Ok(())
    }

    fn trail(&self) -> &Trail {
        &self.trail
    }

    fn params(&self) -> Value {
        json!({
            "particles": self.params.particles,
            "speed": self.params.speed,
            "steer": self.params.steer,
            "max_speed": self.params.max_speed,
            "gravity": self.params.gravity,
            "layer_interval": self.params.layer_interval,
            "deposit": self.params.deposit,
            "decay": self.params.decay,
        })
    }

    fn param_schema(&self) -> Value {
        json!({
            "particles": {
                "type": "integer",
                "default": DEFAULT_PARTICLES,
                "min": 0,
                "max": 100_000,
                "description": "Number of particles spawned"
            },
            "speed": {
                "type": "number",
                "default": DEFAULT_SPEED,
                "min": 0.0,
                "max": 10.0,
                "description": "Initial particle speed, world units per tick"
            },
            "steer": {
                "type": "number",
                "default": DEFAULT_STEER,
                "min": 0.0,
                "max": 2.0,
                "description": "Length of the field direction added to velocity each tick"
            },
            "max_speed": {
                "type": "number",
                "default": DEFAULT_MAX_SPEED,
                "min": 0.0,
                "max": 20.0,
                "description": "Velocity cap after each tick; 0 disables"
            },
            "gravity": {
                "type": "number",
                "default": DEFAULT_GRAVITY,
                "min": -1.0,
                "max": 1.0,
                "description": "Downward acceleration applied after each move"
            },
            "layer_interval": {
                "type": "integer",
                "default": DEFAULT_LAYER_INTERVAL,
                "min": 0,
                "max": 1000,
                "description": "Ticks between field layer advances; 0 freezes the layer"
            },
            "deposit": {
                "type": "number",
                "default": DEFAULT_DEPOSIT,
                "min": 0.0,
                "max": 10.0,
                "description": "Trail density left per particle per tick"
            },
            "decay": {
                "type": "number",
                "default": DEFAULT_DECAY,
                "min": 0.0,
                "max": 1.0,
                "description": "Trail multiplier applied every tick"
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowfield_core::{FieldDims, NoImageLoader, NoiseConfig, NoiseSource, PixelBuffer};

    /// Every sample is 0.5, so every cell points along +x.
    struct Flat;

    impl NoiseSource for Flat {
        fn seed(&mut self, _seed: u32) {}

        fn noise(&self, _x: f64, _y: f64, _z: f64) -> f64 {
            0.5
        }
    }

    fn flat_field(width: usize, height: usize) -> VectorField {
        VectorField::from_noise_source(
            FieldDims::new(width, height, 1, 10),
            &NoiseConfig::default(),
            &mut Flat,
        )
        .unwrap()
    }

    fn noise_sim(seed: u64, params: FlowParams) -> FlowSim {
        let field =
            VectorField::from_noise(FieldDims::new(120, 80, 4, 10), &NoiseConfig::default())
                .unwrap();
        FlowSim::new(field, seed, params).unwrap()
    }

    // ---- Construction tests ----

    #[test]
    fn spawns_requested_particle_count_inside_plane() {
        let sim = noise_sim(
            42,
            FlowParams {
                particles: 64,
                ..FlowParams::default()
            },
        );
        assert_eq!(sim.particles().len(), 64);
        for p in sim.particles() {
            assert!((0.0..120.0).contains(&p.position.x()));
            assert!((0.0..80.0).contains(&p.position.y()));
            assert!((p.velocity.length() - DEFAULT_SPEED).abs() < 1e-9);
        }
    }

    #[test]
    fn trail_matches_plane_size() {
        let sim = noise_sim(1, FlowParams::default());
        assert_eq!(sim.trail().width(), 120);
        assert_eq!(sim.trail().height(), 80);
    }

    #[test]
    fn params_from_json_uses_defaults_for_empty_object() {
        assert_eq!(FlowParams::from_json(&json!({})), FlowParams::default());
    }

    #[test]
    fn params_from_json_reads_custom_values() {
        let params = FlowParams::from_json(&json!({
            "particles": 10,
            "speed": 0.5,
            "steer": 0.3,
            "max_speed": 0,
            "gravity": 0.05,
            "layer_interval": 4,
            "deposit": 2.0,
            "decay": 0.9,
        }));
        assert_eq!(params.particles, 10);
        assert!((params.speed - 0.5).abs() < f64::EPSILON);
        assert!((params.steer - 0.3).abs() < f64::EPSILON);
        assert_eq!(params.max_speed, 0.0);
        assert!((params.gravity - 0.05).abs() < f64::EPSILON);
        assert_eq!(params.layer_interval, 4);
        assert!((params.deposit - 2.0).abs() < f64::EPSILON);
        assert!((params.decay - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn from_spec_builds_noise_simulation() {
        let mut spec = RunSpec::new(100, 100, 10, 5);
        spec.depth = 2;
        spec.params = json!({"particles": 12});
        let sim = FlowSim::from_spec(&spec, NoImageLoader).unwrap();
        assert_eq!(sim.particles().len(), 12);
        assert_eq!(sim.field().depth(), 2);
    }

    #[test]
    fn from_spec_builds_image_simulation() {
        let mut spec = RunSpec::new(40, 40, 10, 5);
        spec.source = json!("grey");
        spec.params = json!({"particles": 3});
        let loader = |_: &str, w: usize, h: usize| PixelBuffer::filled(w, h, [128; 4]);
        let sim = FlowSim::from_spec(&spec, loader).unwrap();
        assert!(sim.field().is_ready());
        assert_eq!(sim.particles().len(), 3);
    }

    #[test]
    fn from_spec_rejects_invalid_source() {
        let mut spec = RunSpec::new(100, 100, 10, 5);
        spec.source = json!(17);
        assert!(matches!(
            FlowSim::from_spec(&spec, NoImageLoader),
            Err(FieldError::InvalidSource(_))
        ));
    }

    #[test]
    fn from_spec_rejects_failed_image() {
        let mut spec = RunSpec::new(100, 100, 10, 5);
        spec.source = json!("missing.png");
        assert!(matches!(
            FlowSim::from_spec(&spec, NoImageLoader),
            Err(FieldError::Image(_))
        ));
    }

    #[test]
    fn from_spec_rejects_bad_dimensions() {
        let spec = RunSpec::new(100, 100, 0, 5);
        assert!(matches!(
            FlowSim::from_spec(&spec, NoImageLoader),
            Err(FieldError::InvalidDimensions)
        ));
    }

    // ---- Stepping tests ----

    #[test]
    fn resting_particles_accelerate_along_the_field() {
        let params = FlowParams {
            particles: 8,
            speed: 0.0,
            steer: 0.1,
            max_speed: 0.0,
            ..FlowParams::default()
        };
        let mut sim = FlowSim::new(flat_field(100, 100), 3, params).unwrap();
        let before: Vec<f64> = sim.particles().iter().map(|p| p.position.x()).collect();
        sim.step().unwrap();
        for (p, x0) in sim.particles().iter().zip(before) {
            assert!((p.velocity.x() - 0.1).abs() < 1e-12);
            assert!(p.velocity.y().abs() < 1e-12);
            let expected = wrap(x0 + 0.1, 100.0);
            assert!((p.position.x() - expected).abs() < 1e-9);
        }
        sim.step().unwrap();
        for p in sim.particles() {
            assert!((p.velocity.x() - 0.2).abs() < 1e-12);
        }
    }

    #[test]
    fn gravity_is_added_after_the_move() {
        let params = FlowParams {
            particles: 4,
            speed: 0.0,
            steer: 0.0,
            gravity: 0.5,
            max_speed: 0.0,
            ..FlowParams::default()
        };
        let mut sim = FlowSim::new(flat_field(100, 100), 9, params).unwrap();
        let before: Vec<f64> = sim.particles().iter().map(|p| p.position.y()).collect();
        sim.step().unwrap();
        for (p, y0) in sim.particles().iter().zip(before) {
            assert!((p.position.y() - y0).abs() < 1e-12);
            assert!((p.velocity.y() - 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn max_speed_caps_velocity() {
        let params = FlowParams {
            particles: 16,
            steer: 1.0,
            max_speed: 0.5,
            ..FlowParams::default()
        };
        let mut sim = noise_sim(11, params);
        for _ in 0..10 {
            sim.step().unwrap();
        }
        for p in sim.particles() {
            assert!(p.velocity.length() <= 0.5 + 1e-9);
        }
    }

    #[test]
    fn layers_advance_on_interval() {
        let mut sim = noise_sim(
            2,
            FlowParams {
                particles: 1,
                layer_interval: 2,
                ..FlowParams::default()
            },
        );
        let layers: Vec<usize> = (0..7)
            .map(|_| {
                sim.step().unwrap();
                sim.field().active_layer()
            })
            .collect();
        assert_eq!(layers, vec![0, 0, 1, 1, 2, 2, 3]);
        assert_eq!(sim.tick(), 7);
    }

    #[test]
    fn zero_interval_freezes_layer() {
        let mut sim = noise_sim(
            2,
            FlowParams {
                particles: 1,
                layer_interval: 0,
                ..FlowParams::default()
            },
        );
        for _ in 0..5 {
            sim.step().unwrap();
        }
        assert_eq!(sim.field().active_layer(), 0);
    }

    #[test]
    fn each_step_deposits_once_per_particle() {
        let params = FlowParams {
            particles: 20,
            deposit: 1.0,
            ..FlowParams::default()
        };
        let mut sim = noise_sim(5, params);
        for _ in 0..3 {
            sim.step().unwrap();
        }
        let total: f64 = sim.trail().data().iter().sum();
        assert!((total - 60.0).abs() < 1e-9, "total {total}");
    }

    #[test]
    fn decay_fades_old_deposits() {
        let params = FlowParams {
            particles: 1,
            deposit: 1.0,
            decay: 0.5,
            ..FlowParams::default()
        };
        let mut sim = noise_sim(5, params);
        sim.step().unwrap();
        sim.step().unwrap();
        let total: f64 = sim.trail().data().iter().sum();
        assert!((total - 1.5).abs() < 1e-9, "total {total}");
    }

    #[test]
    fn determinism_same_seed() {
        let mut a = noise_sim(99, FlowParams::default());
        let mut b = noise_sim(99, FlowParams::default());
        for _ in 0..20 {
            a.step().unwrap();
            b.step().unwrap();
        }
        assert!(a
            .trail()
            .data()
            .iter()
            .zip(b.trail().data())
            .all(|(x, y)| x.to_bits() == y.to_bits()));
    }

    #[test]
    fn different_seeds_spawn_differently() {
        let a = noise_sim(1, FlowParams::default());
        let b = noise_sim(2, FlowParams::default());
        assert_ne!(a.particles()[0].position, b.particles()[0].position);
    }

    #[test]
    fn params_and_schema_agree_on_keys() {
        let sim = noise_sim(1, FlowParams::default());
        let params = sim.params();
        let schema = sim.param_schema();
        for key in schema.as_object().unwrap().keys() {
            assert!(params.get(key).is_some(), "params missing {key}");
        }
        assert_eq!(params["particles"], DEFAULT_PARTICLES);
    }

    #[test]
    fn works_as_dyn_engine() {
        let sim = noise_sim(1, FlowParams::default());
        let mut engine: Box<dyn Engine> = Box::new(sim);
        engine.step().unwrap();
        assert!(engine.trail().max() > 0.0);
    }

    #[test]
    fn wrap_keeps_coordinates_in_range() {
        assert_eq!(wrap(105.0, 100.0), 5.0);
        assert_eq!(wrap(-5.0, 100.0), 95.0);
        assert_eq!(wrap(-1e-20, 100.0), 0.0);
    }

    // ---- Property-based tests ----

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(16))]

            #[test]
            fn particles_stay_on_the_plane(seed: u64, steps in 1_usize..30) {
                let mut sim = noise_sim(seed, FlowParams { particles: 32, ..FlowParams::default() });
                for _ in 0..steps {
                    sim.step().unwrap();
                }
                for p in sim.particles() {
                    prop_assert!((0.0..120.0).contains(&p.position.x()));
                    prop_assert!((0.0..80.0).contains(&p.position.y()));
                }
            }
        }
    }
}
