//! Sensor evaluation over a per-frame visibility snapshot.
//!
//! Sensing never touches the physics world or other creatures directly: it
//! reads an immutable snapshot of living-creature centroids built once per
//! frame, which keeps the sense phase safe to run in parallel.

use std::f32::consts::PI;

use crate::simulation::genome::{SensorGene, SensorKind};
use crate::simulation::spatial::{self, Tree2D};

/// What one creature looks like to everyone else's sensors.
#[derive(Debug, Clone)]
pub struct CreatureObservation {
    /// Id of the observed creature.
    pub id: u64,
    /// Mass-weighted centroid of its body.
    pub centroid: [f32; 2],
    /// Its beauty trait; amplifies sensor activation toward it.
    pub beauty: f32,
}

/// Immutable per-frame snapshot of all living creatures, indexed for
/// radius queries.
pub struct VisibilitySnapshot {
    observations: Vec<CreatureObservation>,
    tree: Tree2D,
}

impl VisibilitySnapshot {
    /// Builds a snapshot (and its spatial index) from observations of the
    /// living population.
    pub fn build(observations: Vec<CreatureObservation>) -> Self {
        let tree = spatial::build_tree(&observations, |obs| obs.centroid.to_vec())
            .unwrap_or_else(|_| Tree2D::new(2));
        Self { observations, tree }
    }

    /// All observations in the snapshot.
    pub fn observations(&self) -> &[CreatureObservation] {
        &self.observations
    }

    /// Observations within `radius` of `pos`, as `(distance, observation)`
    /// pairs.
    pub fn within(&self, pos: [f32; 2], radius: f32) -> Vec<(f32, &CreatureObservation)> {
        spatial::within(&self.tree, pos, radius)
            .into_iter()
            .map(|(dist_sq, idx)| (dist_sq.sqrt(), &self.observations[idx]))
            .collect()
    }
}

/// Computes one sensor's activation.
///
/// Among all other living creatures within range (and within the field of
/// view, for eyes), the closest drives the signal:
/// `(1 - distance/range) * (1 + beauty * 0.3)`, clamped to 1. No detection
/// yields 0.
pub fn activation(
    sensor: &SensorGene,
    sensor_pos: [f32; 2],
    optic_axis: f32,
    self_id: u64,
    snapshot: &VisibilitySnapshot,
) -> f32 {
    let mut closest: Option<(f32, f32)> = None;

    for (distance, obs) in snapshot.within(sensor_pos, sensor.range) {
        if obs.id == self_id || distance > sensor.range {
            continue;
        }
        if let SensorKind::Eye { fov } = sensor.kind {
            let to_target = (obs.centroid[1] - sensor_pos[1])
                .atan2(obs.centroid[0] - sensor_pos[0]);
            if wrap_angle(to_target - optic_axis).abs() > fov / 2.0 {
                continue;
            }
        }
        if closest.is_none_or(|(best, _)| distance < best) {
            closest = Some((distance, obs.beauty));
        }
    }

    match closest {
        Some((distance, beauty)) => {
            ((1.0 - distance / sensor.range) * (1.0 + beauty * 0.3)).clamp(0.0, 1.0)
        }
        None => 0.0,
    }
}

/// Wraps an angle difference into -PI..=PI.
fn wrap_angle(angle: f32) -> f32 {
    (angle + PI).rem_euclid(2.0 * PI) - PI
}
