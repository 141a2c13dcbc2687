//! Immutable draw-state snapshot
//!
//! Built at the end of a step and handed to renderers, which poll it on
//! their own schedule. Nothing in here points back into the world.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::body::{BodyId, Material, Shape, ShapeKind};
use super::input::Tool;
use super::state::{Location, World};

/// One body as a renderer needs it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyDraw {
    pub id: BodyId,
    pub kind: ShapeKind,
    pub pos: Vec2,
    pub angle: f32,
    /// Box half extents or circle radius (x = y)
    pub half_extents: Vec2,
    /// Local visual ring (polygons only)
    pub vertices: Vec<Vec2>,
    /// Local reduced collision ring, when it differs from the visual ring
    pub collision: Option<Vec<Vec2>>,
    pub material: Material,
    pub selected: bool,
    pub wheel: bool,
    pub dragged: bool,
    /// Glass damage (0 when not glass)
    pub damage: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DropletDraw {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub opacity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShardDraw {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub angle: f32,
    pub variant: u8,
    pub opacity: f32,
}

/// Tool overlays drawn over the scene
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    pub tool: Tool,
    pub cursor: Option<Vec2>,
    /// Centre of the body waiting for a weld partner
    pub pending_weld: Option<Vec2>,
    /// World positions of weld anchors
    pub weld_anchors: Vec<Vec2>,
    pub selection_rect: Option<(Vec2, Vec2)>,
    /// Outline of a shape being drawn
    pub draw_preview: Vec<Vec2>,
}

/// Everything needed to draw one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub step: u64,
    pub size: Vec2,
    pub location: Location,
    pub ground_top: f32,
    pub water_baseline: f32,
    pub wave_spacing: f32,
    /// Wave displacements (positive = below baseline)
    pub wave: Vec<f32>,
    /// Bodies in id order
    pub bodies: Vec<BodyDraw>,
    pub droplets: Vec<DropletDraw>,
    pub shards: Vec<ShardDraw>,
    pub overlay: Overlay,
    pub frozen: bool,
    pub time_scale: f32,
}

impl Snapshot {
    /// Capture the world; clock state is filled in by the controller
    pub fn capture(world: &World) -> Self {
        let bodies = world
            .bodies
            .iter()
            .map(|b| {
                let (half_extents, vertices, collision) = match &b.shape {
                    Shape::Box { half } => (*half, Vec::new(), None),
                    Shape::Circle { radius } => (Vec2::splat(*radius), Vec::new(), None),
                    Shape::Polygon { vertices, collision } => {
                        (b.shape.local_half_extents(), vertices.clone(), collision.clone())
                    }
                };
                BodyDraw {
                    id: b.id,
                    kind: b.kind(),
                    pos: b.pos,
                    angle: b.angle,
                    half_extents,
                    vertices,
                    collision,
                    material: b.material,
                    selected: b.selected,
                    wheel: world.wheels.contains(&b.id),
                    dragged: b.dragged,
                    damage: if b.material.glass { b.damage } else { 0.0 },
                }
            })
            .collect();

        let weld_anchors = world
            .welds
            .iter()
            .filter_map(|w| world.body(w.a).map(|a| a.to_world(w.anchor_a)))
            .collect();

        Self {
            step: world.steps,
            size: world.size,
            location: world.location,
            ground_top: world.ground_top(),
            water_baseline: world.wave.baseline,
            wave_spacing: world.wave.spacing(),
            wave: world.wave.heights().to_vec(),
            bodies,
            droplets: world
                .particles
                .droplets
                .iter()
                .map(|d| DropletDraw {
                    pos: d.pos,
                    vel: d.vel,
                    radius: d.radius,
                    opacity: d.opacity(),
                })
                .collect(),
            shards: world
                .particles
                .shards
                .iter()
                .map(|s| ShardDraw {
                    pos: s.pos,
                    vel: s.vel,
                    radius: s.radius,
                    angle: s.angle,
                    variant: s.variant,
                    opacity: s.opacity(),
                })
                .collect(),
            overlay: Overlay {
                tool: world.interaction.tool,
                cursor: world.interaction.pointer,
                pending_weld: world.pending_weld.and_then(|id| world.body(id)).map(|b| b.pos),
                weld_anchors,
                selection_rect: world.interaction.selection_rect(),
                draw_preview: world.interaction.preview(),
            },
            frozen: false,
            time_scale: 1.0,
        }
    }

    /// Serialize for external tooling
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
