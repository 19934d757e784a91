//! Genome model: the heritable blueprint for a creature's morphology and
//! motor controller.
//!
//! A genome describes body segments (an arena of parts addressed by index,
//! with parent edges forming a tree), spring joints with sinusoidal motor
//! patterns, sensors, and a sensor-by-joint weight matrix that couples
//! sensor activations into motor modulation. All genetic operators take an
//! injected RNG so generation is deterministic under a fixed seed, and none
//! of them mutates its input.

use ndarray::Array2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Maximum number of segments a genome can grow to through branch mutation.
pub const MAX_SEGMENTS: usize = 8;
/// Maximum number of sensors a genome can grow to through sensor mutation.
pub const MAX_SENSORS: usize = 5;

const GENERATED_SEGMENTS: (usize, usize) = (2, 5);
const CIRCLE_RADIUS: (f32, f32) = (5.0, 30.0);
const RECT_LENGTH: (f32, f32) = (15.0, 70.0);
const RECT_WIDTH: (f32, f32) = (5.0, 25.0);
const SEGMENT_MASS: (f32, f32) = (0.3, 3.0);
const REST_LENGTH: (f32, f32) = (5.0, 60.0);
const STIFFNESS: (f32, f32) = (0.1, 0.9);
const MOTOR_AMPLITUDE_MAX: f32 = 15.0;
const MOTOR_FREQUENCY: (f32, f32) = (0.1, 4.0);
const SENSOR_RANGE: (f32, f32) = (60.0, 300.0);
const EYE_FOV: (f32, f32) = (0.3, 2.5);
const WEIGHT_MOD: (f32, f32) = (-2.0, 2.0);
const PHASE_MOD: (f32, f32) = (-1.0, 1.0);

/// Shape of a body segment, with shape-specific dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SegmentShape {
    /// A circular segment.
    Circle {
        /// Radius of the circle.
        radius: f32,
    },
    /// A rectangular segment.
    Rect {
        /// Length along the segment's local x axis.
        length: f32,
        /// Width along the segment's local y axis.
        width: f32,
    },
}

impl SegmentShape {
    /// Half-extent along the local x axis, used when chaining segments.
    pub fn half_extent(&self) -> f32 {
        match *self {
            SegmentShape::Circle { radius } => radius,
            SegmentShape::Rect { length, .. } => length / 2.0,
        }
    }
}

/// One rigid body part of a creature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentGene {
    /// Stable index of this segment within the genome.
    pub id: usize,
    /// Parent segment index; `None` for the root.
    pub parent: Option<usize>,
    /// Angle of attachment relative to the parent's outward direction.
    pub attach_angle: f32,
    /// Shape and dimensions.
    pub shape: SegmentShape,
    /// Mass of the segment body.
    pub mass: f32,
    /// RGB color, each channel in 0..=255.
    pub color: [f32; 3],
    /// Combat target: the creature dies when this segment is "eaten".
    pub is_heart: bool,
    /// Combat weapon: touching an enemy heart with this segment kills it.
    pub is_mouth: bool,
    /// Gripper segments are pulled toward nearby creatures.
    pub is_gripper: bool,
}

/// Sinusoidal oscillator driving a joint's target length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotorPattern {
    /// Oscillation amplitude added to the rest length.
    pub amplitude: f32,
    /// Oscillation frequency in Hz.
    pub frequency: f32,
    /// Phase offset in radians.
    pub phase: f32,
}

/// A spring joint between two segments, plus its motor pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointGene {
    /// Index of the first (parent-side) segment.
    pub seg_a: usize,
    /// Index of the second (child-side) segment.
    pub seg_b: usize,
    /// Anchor point in the first segment's local frame.
    pub attach_a: [f32; 2],
    /// Anchor point in the second segment's local frame.
    pub attach_b: [f32; 2],
    /// Rest length of the spring.
    pub rest_length: f32,
    /// Shortest length the motor may target.
    pub min_length: f32,
    /// Longest length the motor may target.
    pub max_length: f32,
    /// Spring stiffness in 0.1..=0.9 (scaled into the physics world).
    pub stiffness: f32,
    /// Baseline oscillator for this joint.
    pub motor: MotorPattern,
}

/// Sensor modality.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SensorKind {
    /// Directional sensor gated by a field of view.
    Eye {
        /// Total field-of-view angle in radians.
        fov: f32,
    },
    /// Omnidirectional contact/proximity sensor.
    Feeler,
}

/// A sensor mounted on one body segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorGene {
    /// Stable index of this sensor within the genome.
    pub id: usize,
    /// Modality.
    pub kind: SensorKind,
    /// Index of the segment the sensor is mounted on.
    pub segment: usize,
    /// Mounting angle relative to the segment's orientation.
    pub angle: f32,
    /// Maximum detection distance.
    pub range: f32,
}

/// How strongly one sensor modulates one joint's motor pattern.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotorWeights {
    /// Added to the joint's amplitude, scaled by sensor activation.
    pub amplitude: f32,
    /// Added to the joint's frequency, scaled by sensor activation.
    pub frequency: f32,
    /// Added to the joint's phase, scaled by sensor activation.
    pub phase: f32,
}

impl MotorWeights {
    fn random(rng: &mut impl Rng) -> Self {
        Self {
            amplitude: rng.random_range(WEIGHT_MOD.0..WEIGHT_MOD.1),
            frequency: rng.random_range(WEIGHT_MOD.0..WEIGHT_MOD.1),
            phase: rng.random_range(PHASE_MOD.0..PHASE_MOD.1),
        }
    }
}

/// The heritable blueprint for one creature.
///
/// Value-copied on every genetic operation; operators never mutate their
/// inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    /// Body parts, parents always preceding children.
    pub segments: Vec<SegmentGene>,
    /// Spring joints connecting the segments into a tree.
    pub joints: Vec<JointGene>,
    /// Sensors mounted on segments.
    pub sensors: Vec<SensorGene>,
    /// Weight matrix with one row per sensor and one column per joint.
    pub sensor_motor_weights: Array2<MotorWeights>,
    /// Generation this genome belongs to.
    pub generation: u32,
    /// Fitness written back by the evolution manager.
    pub fitness: f32,
    /// Family color hue in 0..360.
    pub base_hue: f32,
    /// Mate-attraction trait in 0..=1; amplifies how strongly others
    /// sense this creature.
    pub beauty: f32,
    /// Number of memory cells the creature carries.
    pub memory_size: usize,
}

impl Genome {
    /// Generates a random genome: a linear chain of 2-5 segments with the
    /// root flagged as heart and the tail as mouth, 1-3 sensors, and a
    /// fully random sensor-by-joint weight matrix.
    pub fn random(rng: &mut impl Rng, memory_size: usize) -> Self {
        let base_hue = rng.random_range(0.0..360.0);
        let beauty = rng.random_range(0.0..1.0);
        let n_segments = rng.random_range(GENERATED_SEGMENTS.0..=GENERATED_SEGMENTS.1);

        let mut segments = Vec::with_capacity(n_segments);
        for i in 0..n_segments {
            segments.push(SegmentGene {
                id: i,
                parent: if i == 0 { None } else { Some(i - 1) },
                attach_angle: if i == 0 {
                    0.0
                } else {
                    rng.random_range(-0.6..0.6)
                },
                shape: random_shape(rng),
                mass: rng.random_range(SEGMENT_MASS.0..SEGMENT_MASS.1),
                color: family_color(rng, base_hue, beauty),
                is_heart: i == 0,
                is_mouth: i == n_segments - 1,
                is_gripper: rng.random::<f32>() < 0.1,
            });
        }

        let joints: Vec<JointGene> = (1..n_segments)
            .map(|i| random_joint(rng, &segments, i - 1, i))
            .collect();

        let n_sensors = rng.random_range(1..=3);
        let sensors: Vec<SensorGene> = (0..n_sensors)
            .map(|id| random_sensor(rng, id, n_segments))
            .collect();

        let sensor_motor_weights =
            Array2::from_shape_fn((n_sensors, joints.len()), |_| MotorWeights::random(rng));

        Self {
            segments,
            joints,
            sensors,
            sensor_motor_weights,
            generation: 0,
            fitness: 0.0,
            base_hue,
            beauty,
            memory_size,
        }
    }

    /// Index of the heart segment: the first heart-flagged segment, falling
    /// back to the first segment when none is flagged.
    pub fn heart_index(&self) -> usize {
        self.segments
            .iter()
            .position(|s| s.is_heart)
            .unwrap_or(0)
    }

    /// Index of the mouth segment: the last mouth-flagged segment, falling
    /// back to the last segment when none is flagged.
    pub fn mouth_index(&self) -> usize {
        self.segments
            .iter()
            .rposition(|s| s.is_mouth)
            .unwrap_or(self.segments.len().saturating_sub(1))
    }

    /// Returns a mutated copy; `self` is left untouched.
    ///
    /// Numeric fields mutate under independent Bernoulli trials at `rate`
    /// (or a fixed multiple for more or less sensitive fields), each
    /// perturbation clamped to its documented range. Structural mutations
    /// (gripper toggle, added sensor, added branch) are much rarer and keep
    /// the weight matrix dimensions consistent.
    pub fn mutated(&self, rng: &mut impl Rng, rate: f32) -> Self {
        let mut child = self.clone();
        let beauty = child.beauty;

        for segment in &mut child.segments {
            if chance(rng, rate) {
                segment.shape = match segment.shape {
                    SegmentShape::Circle { radius } => SegmentShape::Circle {
                        radius: jitter(rng, radius, 10.0, CIRCLE_RADIUS.0, CIRCLE_RADIUS.1),
                    },
                    SegmentShape::Rect { length, width } => SegmentShape::Rect {
                        length: jitter(rng, length, 15.0, RECT_LENGTH.0, RECT_LENGTH.1),
                        width: jitter(rng, width, 6.0, RECT_WIDTH.0, RECT_WIDTH.1),
                    },
                };
            }
            if chance(rng, rate) {
                segment.mass = jitter(rng, segment.mass, 0.5, SEGMENT_MASS.0, SEGMENT_MASS.1);
            }
            if chance(rng, rate * 0.5) {
                // Brighter creatures tend to stay bright: beauty skews the
                // color walk toward white.
                for channel in &mut segment.color {
                    let delta = rng.random_range(-20.0..20.0) + beauty * 8.0;
                    *channel = (*channel + delta).clamp(0.0, 255.0);
                }
            }
            if chance(rng, rate * 0.1) {
                segment.is_gripper = !segment.is_gripper;
            }
        }

        if chance(rng, rate) {
            child.beauty = jitter(rng, child.beauty, 0.1, 0.0, 1.0);
        }

        for joint in &mut child.joints {
            if chance(rng, rate) {
                joint.rest_length =
                    jitter(rng, joint.rest_length, 5.0, REST_LENGTH.0, REST_LENGTH.1);
                joint.min_length = joint.min_length.min(joint.rest_length);
                joint.max_length = joint.max_length.max(joint.rest_length);
            }
            if chance(rng, rate) {
                joint.stiffness = jitter(rng, joint.stiffness, 0.1, STIFFNESS.0, STIFFNESS.1);
            }
            if chance(rng, rate * 1.5) {
                joint.motor.amplitude =
                    jitter(rng, joint.motor.amplitude, 2.0, 0.0, MOTOR_AMPLITUDE_MAX);
            }
            if chance(rng, rate * 1.5) {
                joint.motor.frequency = jitter(
                    rng,
                    joint.motor.frequency,
                    0.5,
                    MOTOR_FREQUENCY.0,
                    MOTOR_FREQUENCY.1,
                );
            }
            if chance(rng, rate * 1.5) {
                joint.motor.phase =
                    (joint.motor.phase + rng.random_range(-PI / 4.0..PI / 4.0)).rem_euclid(2.0 * PI);
            }
        }

        for sensor in &mut child.sensors {
            if chance(rng, rate) {
                sensor.angle = (sensor.angle + rng.random_range(-0.3..0.3)).rem_euclid(2.0 * PI);
            }
            if chance(rng, rate) {
                sensor.range = jitter(rng, sensor.range, 15.0, SENSOR_RANGE.0, SENSOR_RANGE.1);
            }
            if let SensorKind::Eye { fov } = &mut sensor.kind {
                if chance(rng, rate) {
                    *fov = jitter(rng, *fov, 0.2, EYE_FOV.0, EYE_FOV.1);
                }
            }
        }

        for weights in &mut child.sensor_motor_weights {
            if chance(rng, rate * 2.0) {
                weights.amplitude = jitter(
                    rng,
                    weights.amplitude,
                    0.3,
                    WEIGHT_MOD.0,
                    WEIGHT_MOD.1,
                );
            }
            if chance(rng, rate * 2.0) {
                weights.frequency = jitter(
                    rng,
                    weights.frequency,
                    0.3,
                    WEIGHT_MOD.0,
                    WEIGHT_MOD.1,
                );
            }
            if chance(rng, rate * 2.0) {
                weights.phase = jitter(rng, weights.phase, 0.2, PHASE_MOD.0, PHASE_MOD.1);
            }
        }

        if chance(rng, rate * 0.05) && child.sensors.len() < MAX_SENSORS {
            let id = child.sensors.len();
            child
                .sensors
                .push(random_sensor(rng, id, child.segments.len()));
            child.sensor_motor_weights = grown_weights(
                rng,
                &child.sensor_motor_weights,
                child.sensors.len(),
                child.joints.len(),
            );
        }

        if chance(rng, rate * 0.08) && child.segments.len() < MAX_SEGMENTS {
            add_branch(rng, &mut child);
        }

        child
    }

    /// Crosses two genomes, returning a child; neither input is mutated.
    ///
    /// Morphology is inherited wholesale from one randomly chosen parent
    /// (blending mismatched trees would produce invalid topologies); only
    /// joint motor patterns are mixed, each copied from a randomly chosen
    /// parent for the joint indices both parents have. The base hue blends
    /// to the midpoint plus a small jitter.
    pub fn crossover(&self, other: &Genome, rng: &mut impl Rng) -> Genome {
        let base = if rng.random::<f32>() < 0.5 { self } else { other };
        let mut child = base.clone();

        let shared = child
            .joints
            .len()
            .min(self.joints.len())
            .min(other.joints.len());
        for j in 0..shared {
            let donor = if rng.random::<f32>() < 0.5 { self } else { other };
            child.joints[j].motor = donor.joints[j].motor;
        }

        let midpoint = hue_midpoint(self.base_hue, other.base_hue);
        child.base_hue = (midpoint + rng.random_range(-10.0..10.0)).rem_euclid(360.0);
        child.generation = self.generation.max(other.generation);
        child.fitness = 0.0;
        child
    }

    /// Checks the structural invariants an imported genome must satisfy.
    pub fn validate(&self) -> Result<(), String> {
        if self.segments.is_empty() {
            return Err("genome has no segments".into());
        }
        let shape = self.sensor_motor_weights.dim();
        if shape != (self.sensors.len(), self.joints.len()) {
            return Err(format!(
                "weight matrix is {}x{}, expected {}x{}",
                shape.0,
                shape.1,
                self.sensors.len(),
                self.joints.len()
            ));
        }
        for joint in &self.joints {
            if joint.seg_a >= self.segments.len() || joint.seg_b >= self.segments.len() {
                return Err(format!(
                    "joint references segment {} outside 0..{}",
                    joint.seg_a.max(joint.seg_b),
                    self.segments.len()
                ));
            }
        }
        for sensor in &self.sensors {
            if sensor.segment >= self.segments.len() {
                return Err(format!(
                    "sensor {} mounted on missing segment {}",
                    sensor.id, sensor.segment
                ));
            }
        }
        Ok(())
    }
}

fn chance(rng: &mut impl Rng, probability: f32) -> bool {
    rng.random::<f32>() < probability
}

fn jitter(rng: &mut impl Rng, value: f32, delta: f32, min: f32, max: f32) -> f32 {
    (value + rng.random_range(-delta..delta)).clamp(min, max)
}

fn random_shape(rng: &mut impl Rng) -> SegmentShape {
    if rng.random::<f32>() < 0.5 {
        SegmentShape::Circle {
            radius: rng.random_range(CIRCLE_RADIUS.0..CIRCLE_RADIUS.1),
        }
    } else {
        SegmentShape::Rect {
            length: rng.random_range(RECT_LENGTH.0..RECT_LENGTH.1),
            width: rng.random_range(RECT_WIDTH.0..RECT_WIDTH.1),
        }
    }
}

fn random_joint(rng: &mut impl Rng, segments: &[SegmentGene], a: usize, b: usize) -> JointGene {
    let rest_length = rng.random_range(REST_LENGTH.0..REST_LENGTH.1);
    JointGene {
        seg_a: a,
        seg_b: b,
        attach_a: [segments[a].shape.half_extent(), 0.0],
        attach_b: [-segments[b].shape.half_extent(), 0.0],
        rest_length,
        min_length: (rest_length - rng.random_range(3.0..12.0)).max(2.0),
        max_length: rest_length + rng.random_range(5.0..20.0),
        stiffness: rng.random_range(STIFFNESS.0..STIFFNESS.1),
        motor: MotorPattern {
            amplitude: rng.random_range(0.0..8.0),
            frequency: rng.random_range(MOTOR_FREQUENCY.0..2.0),
            phase: rng.random_range(0.0..2.0 * PI),
        },
    }
}

fn random_sensor(rng: &mut impl Rng, id: usize, n_segments: usize) -> SensorGene {
    let kind = if rng.random::<f32>() < 0.5 {
        SensorKind::Eye {
            fov: rng.random_range(EYE_FOV.0..EYE_FOV.1),
        }
    } else {
        SensorKind::Feeler
    };
    SensorGene {
        id,
        kind,
        segment: rng.random_range(0..n_segments),
        angle: rng.random_range(0.0..2.0 * PI),
        range: rng.random_range(SENSOR_RANGE.0..SENSOR_RANGE.1),
    }
}

/// Appends a branch segment to a random parent, plus its joint and the
/// matching weight-matrix column.
fn add_branch(rng: &mut impl Rng, genome: &mut Genome) {
    let parent = rng.random_range(0..genome.segments.len());
    let id = genome.segments.len();
    genome.segments.push(SegmentGene {
        id,
        parent: Some(parent),
        attach_angle: rng.random_range(-PI / 2.0..PI / 2.0),
        shape: random_shape(rng),
        mass: rng.random_range(SEGMENT_MASS.0..SEGMENT_MASS.1),
        color: family_color(rng, genome.base_hue, genome.beauty),
        is_heart: false,
        is_mouth: rng.random::<f32>() < 0.25,
        is_gripper: rng.random::<f32>() < 0.15,
    });
    genome
        .joints
        .push(random_joint(rng, &genome.segments, parent, id));
    genome.sensor_motor_weights = grown_weights(
        rng,
        &genome.sensor_motor_weights,
        genome.sensors.len(),
        genome.joints.len(),
    );
}

/// Copies an existing weight matrix into a larger one, filling new cells
/// with random weights.
fn grown_weights(
    rng: &mut impl Rng,
    old: &Array2<MotorWeights>,
    rows: usize,
    cols: usize,
) -> Array2<MotorWeights> {
    Array2::from_shape_fn((rows, cols), |(r, c)| {
        if r < old.nrows() && c < old.ncols() {
            old[[r, c]]
        } else {
            MotorWeights::random(rng)
        }
    })
}

/// Perturbs the family hue into an RGB color, with beauty lifting lightness.
fn family_color(rng: &mut impl Rng, base_hue: f32, beauty: f32) -> [f32; 3] {
    let hue = (base_hue + rng.random_range(-20.0..20.0)).rem_euclid(360.0);
    let lightness = 0.35 + rng.random_range(0.0..0.15) + beauty * 0.2;
    hsl_to_rgb(hue, 0.65, lightness.min(0.85))
}

/// Circular midpoint of two hues in degrees.
fn hue_midpoint(a: f32, b: f32) -> f32 {
    let diff = (b - a).rem_euclid(360.0);
    if diff <= 180.0 {
        (a + diff / 2.0).rem_euclid(360.0)
    } else {
        (a + (diff - 360.0) / 2.0).rem_euclid(360.0)
    }
}

/// Converts an HSL color to RGB channels in 0..=255.
fn hsl_to_rgb(hue: f32, saturation: f32, lightness: f32) -> [f32; 3] {
    let c = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let h = hue / 60.0;
    let x = c * (1.0 - (h.rem_euclid(2.0) - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = lightness - c / 2.0;
    [(r + m) * 255.0, (g + m) * 255.0, (b + m) * 255.0]
}
