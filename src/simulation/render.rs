//! Pure-data views consumed by an external rendering collaborator.
//!
//! Nothing here draws; the structs carry exactly the state a renderer
//! needs per creature.

use super::arena::Arena;
use super::genome::SegmentShape;

/// One body segment's drawable state.
#[derive(Debug, Clone)]
pub struct SegmentView {
    /// World position of the segment body.
    pub position: [f32; 2],
    /// World rotation in radians.
    pub rotation: f32,
    /// Shape and dimensions.
    pub shape: SegmentShape,
    /// RGB color, channels in 0..=255.
    pub color: [f32; 3],
    /// Heart marker.
    pub is_heart: bool,
    /// Mouth marker.
    pub is_mouth: bool,
    /// Gripper marker.
    pub is_gripper: bool,
}

/// One creature's drawable state.
#[derive(Debug, Clone)]
pub struct CreatureView {
    /// Creature id.
    pub id: u64,
    /// Per-segment transforms and styling.
    pub segments: Vec<SegmentView>,
    /// Food pool.
    pub food: f32,
    /// Health pool.
    pub health: f32,
    /// Death-fade opacity in 0..=1.
    pub fade_alpha: f32,
    /// Whether the creature is alive.
    pub alive: bool,
    /// Last sensor activations, for sensor visualization.
    pub sensor_activations: Vec<f32>,
    /// Beauty trait, for cosmetic glow.
    pub beauty: f32,
}

/// Snapshots every tracked creature (fading corpses included) for drawing.
pub fn creature_views(arena: &Arena) -> Vec<CreatureView> {
    arena
        .creatures
        .iter()
        .map(|creature| {
            let transforms = creature.body_transforms(&arena.physics);
            let segments = creature
                .genome
                .segments
                .iter()
                .zip(transforms)
                .map(|(gene, (position, rotation))| SegmentView {
                    position,
                    rotation,
                    shape: gene.shape,
                    color: gene.color,
                    is_heart: gene.is_heart,
                    is_mouth: gene.is_mouth,
                    is_gripper: gene.is_gripper,
                })
                .collect();
            CreatureView {
                id: creature.id,
                segments,
                food: creature.food,
                health: creature.health,
                fade_alpha: creature.fade_alpha,
                alive: creature.is_alive(),
                sensor_activations: creature.sensor_activations.clone(),
                beauty: creature.genome.beauty,
            }
        })
        .collect()
}
