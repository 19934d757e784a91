//! Bundled rapier2d world state.
//!
//! The physics engine is consumed as a black box: rigid bodies, spring
//! joints, and collision-start events. This module owns the engine
//! plumbing, steps it with collision-event collection, and provides the
//! single consolidated consistency pass that prunes dangling references
//! before every step. The engine does not tolerate integrating joints whose
//! bodies were removed out of band, so pruning happens proactively and an
//! engine panic is contained rather than propagated.

use std::panic::{self, AssertUnwindSafe};

use rapier2d::crossbeam;
use rapier2d::prelude::*;

/// A collision-start event between two colliders, with the relative speed
/// of their parent bodies at the moment of contact.
#[derive(Debug, Clone, Copy)]
pub struct ContactStart {
    /// First collider involved.
    pub collider_a: ColliderHandle,
    /// Second collider involved.
    pub collider_b: ColliderHandle,
    /// Magnitude of the relative linear velocity of the parent bodies.
    pub relative_speed: f32,
}

/// All engine state needed to step a rapier2d world.
pub struct PhysicsState {
    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    islands: IslandManager,
    broad_phase: BroadPhase,
    narrow_phase: NarrowPhase,
    /// All rigid bodies in the world.
    pub bodies: RigidBodySet,
    /// All colliders in the world.
    pub colliders: ColliderSet,
    /// All impulse joints (creature springs) in the world.
    pub impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
}

impl Default for PhysicsState {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsState {
    /// Creates an empty, gravity-free world.
    pub fn new() -> Self {
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: vector![0.0, 0.0],
            integration_parameters: IntegrationParameters::default(),
            islands: IslandManager::new(),
            broad_phase: BroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
        }
    }

    /// Removes every joint that still references a missing body.
    ///
    /// Called once per tick before stepping; any other code that removes
    /// bodies can rely on this pass instead of cleaning up joints itself.
    pub fn consistency_pass(&mut self) -> usize {
        let stale: Vec<ImpulseJointHandle> = self
            .impulse_joints
            .iter()
            .filter(|(_, joint)| {
                !self.bodies.contains(joint.body1) || !self.bodies.contains(joint.body2)
            })
            .map(|(handle, _)| handle)
            .collect();
        let count = stale.len();
        for handle in stale {
            self.impulse_joints.remove(handle, true);
        }
        if count > 0 {
            log::warn!("pruned {count} dangling joints before stepping");
        }
        count
    }

    /// Advances the world by `dt` seconds and returns the collision-start
    /// events produced during the step.
    ///
    /// An engine panic is caught and returned as `Err`; the caller is
    /// expected to run a recovery purge rather than continue blindly.
    pub fn step(&mut self, dt: f32) -> Result<Vec<ContactStart>, String> {
        self.integration_parameters.dt = dt;

        let (collision_send, collision_recv) = crossbeam::channel::unbounded();
        let (contact_force_send, _contact_force_recv) = crossbeam::channel::unbounded();
        let event_handler = ChannelEventCollector::new(collision_send, contact_force_send);

        let step_result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.pipeline.step(
                &self.gravity,
                &self.integration_parameters,
                &mut self.islands,
                &mut self.broad_phase,
                &mut self.narrow_phase,
                &mut self.bodies,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                &mut self.ccd_solver,
                Some(&mut self.query_pipeline),
                &(),
                &event_handler,
            );
        }));

        if let Err(payload) = step_result {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown engine panic".to_string());
            return Err(message);
        }

        let mut contacts = Vec::new();
        while let Ok(event) = collision_recv.try_recv() {
            if let CollisionEvent::Started(a, b, _) = event {
                contacts.push(ContactStart {
                    collider_a: a,
                    collider_b: b,
                    relative_speed: self.relative_speed(a, b),
                });
            }
        }
        Ok(contacts)
    }

    /// Removes a body along with its colliders and attached joints.
    pub fn remove_body(&mut self, handle: RigidBodyHandle) {
        self.bodies.remove(
            handle,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    /// Relative speed of the parent bodies of two colliders.
    fn relative_speed(&self, a: ColliderHandle, b: ColliderHandle) -> f32 {
        let velocity = |handle: ColliderHandle| {
            self.colliders
                .get(handle)
                .and_then(|collider| collider.parent())
                .and_then(|body| self.bodies.get(body))
                .map_or_else(|| vector![0.0, 0.0], |body| *body.linvel())
        };
        (velocity(a) - velocity(b)).norm()
    }

    /// Owner tag of a collider (see [`crate::simulation::arena`] for the
    /// tagging scheme), or 0 when the collider is gone.
    pub fn collider_tag(&self, handle: ColliderHandle) -> u128 {
        self.colliders.get(handle).map_or(0, |c| c.user_data)
    }
}
