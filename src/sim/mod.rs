//! Deterministic simulation module
//!
//! All physics lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by body ID)
//! - No rendering or platform dependencies

pub mod body;
pub mod collision;
pub mod drag;
pub mod fluid;
pub mod fracture;
pub mod geometry;
pub mod input;
pub mod integrate;
pub mod particles;
pub mod snapshot;
pub mod solver;
pub mod state;
pub mod tick;
pub mod wave;
pub mod weld;

pub use body::{BodyId, Material, MaterialFlag, RigidBody, Shape, ShapeKind};
pub use input::{Button, DrawTool, KeyCommand, PointerEvent, Tool};
pub use snapshot::Snapshot;
pub use state::{Location, WeldOutcome, World};
pub use tick::step;
pub use wave::WaveField;
pub use weld::WeldConstraint;
