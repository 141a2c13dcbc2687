//! Semantic input: pointer events, key commands and tool routing
//!
//! The host maps raw OS input to these events; the world turns them into
//! edits between steps. Clock commands (freeze, time scale) are left to the
//! controller.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::body::MaterialFlag;
use super::drag::DragState;
use super::state::{Location, ROTATE_STEP_DEG, SNAP_STEP_DEG, World};

/// Minimum spacing between recorded freeform points (px)
const STROKE_MIN_SPACING: f32 = 5.0;
/// Spray energy of a pointer press in water
const PRESS_SPRAY_ENERGY: f32 = 0.35;
/// Spray energy while the pointer is held in water
const HOLD_SPRAY_ENERGY: f32 = 0.28;
/// Spray energy when a body is deleted in water
const DELETE_SPRAY_ENERGY: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Button {
    Left,
    Right,
    Middle,
}

/// Shape drawn by a drag gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrawTool {
    Quad,
    Circle,
    Triangle,
    Freeform,
}

/// Active pointer tool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tool {
    /// Select, drag and throw
    #[default]
    Cursor,
    Draw(DrawTool),
    Weld,
    Wheel,
    Material(MaterialFlag),
}

/// Pointer event in screen space; `time` is in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { pos: Vec2, button: Button, shift: bool, time: f64 },
    /// `pos` is `None` when the pointer left the viewport
    Move { pos: Option<Vec2>, shift: bool, time: f64 },
    Up { pos: Vec2, button: Button, shift: bool, time: f64 },
}

/// Discrete key commands, already mapped from physical keys
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum KeyCommand {
    SpawnBox,
    SpawnCircle,
    SpawnTriangle,
    SelectTool(Tool),
    ToggleFreeze,
    SetTimeScale(f32),
    /// 0.5x -> 1x -> 2x
    CycleTimeScale,
    Undo,
    /// Positive angles turn clockwise on screen (y points down)
    Rotate { clockwise: bool, shift: bool },
    SnapRotation,
    SetLocation(Location),
    ToggleLocation,
    DeleteSelection,
    ResetScene,
}

/// Gesture in progress between pointer down and up
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Gesture {
    #[default]
    Idle,
    /// Bodies held by the pointer (see `World::drag`)
    Dragging,
    /// Rubber-band selection rectangle
    Selecting { start: Vec2, current: Vec2 },
    /// Rectangle for quad/circle/triangle tools
    Drawing { start: Vec2, current: Vec2, perfect: bool },
    /// Freeform stroke points
    Stroke(Vec<Vec2>),
    /// Pointer held in the water
    Stirring,
}

/// Tool and pointer state
#[derive(Debug, Clone, Default)]
pub struct Interaction {
    pub tool: Tool,
    pub pointer: Option<Vec2>,
    pub gesture: Gesture,
}

impl Interaction {
    pub fn cancel_gesture(&mut self) {
        self.gesture = Gesture::Idle;
    }

    /// Outline of the gesture in progress (rectangle corners or stroke points)
    pub fn preview(&self) -> Vec<Vec2> {
        match &self.gesture {
            Gesture::Selecting { start, current } | Gesture::Drawing { start, current, .. } => {
                let (lo, hi) = (start.min(*current), start.max(*current));
                vec![lo, Vec2::new(hi.x, lo.y), hi, Vec2::new(lo.x, hi.y)]
            }
            Gesture::Stroke(points) => points.clone(),
            _ => Vec::new(),
        }
    }

    /// Rubber-band rectangle, if one is being dragged
    pub fn selection_rect(&self) -> Option<(Vec2, Vec2)> {
        match self.gesture {
            Gesture::Selecting { start, current } => Some((start.min(current), start.max(current))),
            _ => None,
        }
    }
}

impl World {
    /// Route a pointer event to the active tool
    pub fn handle_pointer(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Down { pos, button, shift, time } => {
                self.interaction.pointer = Some(pos);
                if self.interaction.gesture != Gesture::Idle {
                    self.finish_gesture(pos, shift, time);
                }
                match button {
                    Button::Left => self.press(pos, shift, time),
                    Button::Right => self.delete_at(pos),
                    Button::Middle => {}
                }
            }
            PointerEvent::Move { pos, time, .. } => {
                self.interaction.pointer = pos;
                if let Some(pos) = pos {
                    self.pointer_moved(pos, time);
                }
            }
            PointerEvent::Up { pos, button, shift, time } => {
                self.interaction.pointer = Some(pos);
                if button == Button::Left {
                    self.finish_gesture(pos, shift, time);
                }
            }
        }
    }

    fn press(&mut self, pos: Vec2, shift: bool, time: f64) {
        match self.interaction.tool {
            Tool::Cursor => self.cursor_press(pos, shift, time),
            Tool::Draw(DrawTool::Freeform) => self.interaction.gesture = Gesture::Stroke(vec![pos]),
            Tool::Draw(_) => {
                self.interaction.gesture = Gesture::Drawing {
                    start: pos,
                    current: pos,
                    perfect: shift,
                }
            }
            Tool::Weld => {
                let outcome = self.weld_click(pos);
                log::debug!("Weld tool: {outcome:?}");
            }
            Tool::Wheel => {
                if let Some(id) = self.pick(pos) {
                    self.toggle_wheel(id);
                }
            }
            Tool::Material(flag) => {
                if let Some(id) = self.pick(pos) {
                    self.toggle_material(id, flag);
                }
            }
        }
    }

    fn cursor_press(&mut self, pos: Vec2, shift: bool, time: f64) {
        if let Some(id) = self.pick(pos) {
            if !self.body(id).is_some_and(|b| b.selected) {
                if !shift {
                    self.clear_selection();
                }
                if let Some(body) = self.body_mut(id) {
                    body.selected = true;
                }
            }
            let members = self.selected_ids();
            if let Some(drag) = DragState::begin(&mut self.bodies, id, &members, pos, time) {
                self.drag = Some(drag);
                self.interaction.gesture = Gesture::Dragging;
            }
        } else if self.is_water() && !shift {
            self.disturb_water(pos.x, self.tuning.pointer_impulse, PRESS_SPRAY_ENERGY);
            self.interaction.gesture = Gesture::Stirring;
        } else {
            if !shift {
                self.clear_selection();
            }
            self.interaction.gesture = Gesture::Selecting { start: pos, current: pos };
        }
    }

    fn delete_at(&mut self, pos: Vec2) {
        let Some(id) = self.pick(pos) else {
            return;
        };
        let x = self.body(id).map_or(pos.x, |b| b.pos.x);
        if self.delete_body(id) {
            self.disturb_water(x, self.tuning.pointer_impulse * 0.5, DELETE_SPRAY_ENERGY);
        }
    }

    fn pointer_moved(&mut self, pos: Vec2, time: f64) {
        let window = self.tuning.drag_history_window;
        match &mut self.interaction.gesture {
            Gesture::Dragging => {
                if let Some(drag) = self.drag.as_mut() {
                    drag.track(pos, time, window);
                    drag.follow(&mut self.bodies, pos);
                }
            }
            Gesture::Selecting { current, .. } | Gesture::Drawing { current, .. } => *current = pos,
            Gesture::Stroke(points) => {
                if points.last().is_none_or(|last| last.distance(pos) >= STROKE_MIN_SPACING) {
                    points.push(pos);
                }
            }
            Gesture::Idle | Gesture::Stirring => {}
        }
    }

    fn finish_gesture(&mut self, pos: Vec2, shift: bool, time: f64) {
        match std::mem::take(&mut self.interaction.gesture) {
            Gesture::Idle | Gesture::Stirring => {}
            Gesture::Dragging => {
                if let Some(mut drag) = self.drag.take() {
                    drag.track(pos, time, self.tuning.drag_history_window);
                    drag.follow(&mut self.bodies, pos);
                    drag.release(&mut self.bodies, &self.tuning);
                }
            }
            Gesture::Selecting { start, .. } => {
                self.select_in_rect(start, pos, shift);
            }
            Gesture::Drawing { start, perfect, .. } => {
                let spawned = match self.interaction.tool {
                    Tool::Draw(DrawTool::Quad) => self.spawn_quad_from_rect(start, pos),
                    Tool::Draw(DrawTool::Circle) => self.spawn_circle_from_rect(start, pos, perfect || shift),
                    Tool::Draw(DrawTool::Triangle) => self.spawn_triangle_from_rect(start, pos),
                    _ => None,
                };
                log::debug!("Drawn body: {spawned:?}");
            }
            Gesture::Stroke(mut points) => {
                if points.last().is_none_or(|last| last.distance(pos) >= STROKE_MIN_SPACING) {
                    points.push(pos);
                }
                let spawned = self.spawn_freeform(&points);
                log::debug!("Freeform body: {spawned:?}");
            }
        }
    }

    /// Continuous effects of a held pointer; called once per step
    pub fn apply_held_input(&mut self) {
        if self.interaction.gesture != Gesture::Stirring {
            return;
        }
        if let Some(pos) = self.interaction.pointer {
            self.disturb_water(pos.x, self.tuning.pointer_hold_impulse, HOLD_SPRAY_ENERGY);
        }
    }

    /// Where key-spawned bodies appear
    fn spawn_point(&self) -> Vec2 {
        self.interaction
            .pointer
            .unwrap_or(Vec2::new(self.size.x * 0.5, self.size.y * 0.2))
    }

    /// Apply a key command; returns false for commands the world does not own
    pub fn handle_key(&mut self, command: KeyCommand) -> bool {
        if self.is_water() && self.tuning.keyboard_impulse > 0.0 {
            let x = self.spawn_point().x;
            let k = self.tuning.keyboard_impulse;
            let kick = self.rng.random_range(-k..=k);
            self.wave.add_drop_impulse(x, kick, self.tuning.pointer_impulse_radius);
        }

        match command {
            KeyCommand::SpawnBox => {
                self.spawn_box(self.spawn_point());
            }
            KeyCommand::SpawnCircle => {
                self.spawn_circle(self.spawn_point());
            }
            KeyCommand::SpawnTriangle => {
                self.spawn_triangle(self.spawn_point());
            }
            KeyCommand::SelectTool(tool) => {
                self.interaction.cancel_gesture();
                if tool != Tool::Weld {
                    self.pending_weld = None;
                }
                self.interaction.tool = tool;
            }
            KeyCommand::Undo => {
                self.undo_last_spawn();
            }
            KeyCommand::Rotate { clockwise, shift } => {
                let step = if shift { SNAP_STEP_DEG } else { ROTATE_STEP_DEG };
                self.rotate_selection(if clockwise { step } else { -step }, shift);
            }
            KeyCommand::SnapRotation => {
                self.snap_selection();
            }
            KeyCommand::SetLocation(location) => self.set_location(location),
            KeyCommand::ToggleLocation => {
                let next = match self.location {
                    Location::Land => Location::Water,
                    Location::Water => Location::Land,
                };
                self.set_location(next);
            }
            KeyCommand::DeleteSelection => {
                for id in self.selected_ids() {
                    self.delete_body(id);
                }
            }
            KeyCommand::ResetScene => self.reset_scene(),
            KeyCommand::ToggleFreeze | KeyCommand::SetTimeScale(_) | KeyCommand::CycleTimeScale => return false,
        }
        true
    }
}
