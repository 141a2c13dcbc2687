//! Simulation controller: fixed-step clock, input routing, snapshot publishing
//!
//! The host calls [`Sandbox::tick`] from its frame timer with a wall-clock
//! timestamp in seconds and polls [`Sandbox::snapshot`] whenever it redraws.

use std::sync::Arc;

use glam::Vec2;

use crate::consts::{MAX_STEPS_PER_TICK, MAX_TICK_ELAPSED, SIM_DT};
use crate::sim::{self, KeyCommand, PointerEvent, Snapshot, World};
use crate::tuning::Tuning;

/// Time scales visited by the cycle command
const TIME_SCALE_PRESETS: [f32; 3] = [0.5, 1.0, 2.0];
const MIN_TIME_SCALE: f32 = 0.1;
const MAX_TIME_SCALE: f32 = 4.0;

/// Owns one world and drives it at a fixed step
#[derive(Debug)]
pub struct Sandbox {
    world: World,
    running: bool,
    frozen: bool,
    time_scale: f32,
    /// Unconsumed scaled time (seconds)
    accumulator: f32,
    last_time: Option<f64>,
    snapshot: Arc<Snapshot>,
}

impl Sandbox {
    pub fn new(size: Vec2, tuning: Tuning) -> Self {
        let tuning = tuning.sanitized();
        let time_scale = tuning.time_scale;
        let world = World::new(size, tuning);
        let mut sandbox = Self {
            world,
            running: false,
            frozen: false,
            time_scale,
            accumulator: 0.0,
            last_time: None,
            snapshot: Arc::new(Snapshot::default()),
        };
        sandbox.publish();
        sandbox
    }

    /// Begin accepting clock ticks; `now` is the current wall-clock time in seconds
    pub fn start(&mut self, now: f64) {
        if self.running {
            return;
        }
        self.running = true;
        self.last_time = Some(now);
        self.accumulator = 0.0;
        log::info!("Sandbox started ({} bodies, {:?})", self.world.bodies.len(), self.world.location);
    }

    /// Stop the clock; time not yet simulated is dropped
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.last_time = None;
        self.accumulator = 0.0;
        log::info!("Sandbox stopped after {} steps", self.world.steps);
    }

    /// Clear the scene back to an empty world at the current location
    pub fn reset(&mut self) {
        self.world.reset_scene();
        self.accumulator = 0.0;
        self.publish();
        log::info!("Sandbox reset");
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Advance the clock to `now` (seconds); returns the number of steps run
    pub fn tick(&mut self, now: f64) -> u32 {
        if !self.running {
            return 0;
        }
        let elapsed = self
            .last_time
            .map(|last| (now - last) as f32)
            .unwrap_or(0.0)
            .clamp(0.0, MAX_TICK_ELAPSED);
        self.last_time = Some(now);
        if self.frozen {
            return 0;
        }

        self.accumulator += elapsed * self.time_scale;
        let mut steps = 0;
        while self.accumulator >= SIM_DT && steps < MAX_STEPS_PER_TICK {
            sim::step(&mut self.world);
            self.accumulator -= SIM_DT;
            steps += 1;
        }

        if steps > 0 {
            self.publish();
        }
        steps
    }

    /// Run exactly one step regardless of the clock or freeze state
    pub fn step_once(&mut self) {
        sim::step(&mut self.world);
        self.publish();
    }

    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.clamp(MIN_TIME_SCALE, MAX_TIME_SCALE);
        self.publish();
    }

    /// Next preset above the current scale, wrapping to the slowest
    pub fn cycle_time_scale(&mut self) {
        let next = TIME_SCALE_PRESETS
            .iter()
            .copied()
            .find(|s| *s > self.time_scale + 1e-3)
            .unwrap_or(TIME_SCALE_PRESETS[0]);
        self.set_time_scale(next);
    }

    pub fn toggle_freeze(&mut self) -> bool {
        self.frozen = !self.frozen;
        log::debug!("Freeze {}", if self.frozen { "on" } else { "off" });
        self.publish();
        self.frozen
    }

    pub fn resize(&mut self, size: Vec2) {
        self.world.resize(size);
        self.publish();
    }

    pub fn set_tuning(&mut self, tuning: Tuning) {
        let tuning = tuning.sanitized();
        self.time_scale = tuning.time_scale;
        self.world.set_tuning(tuning);
        self.publish();
    }

    pub fn handle_pointer(&mut self, event: PointerEvent) {
        self.world.handle_pointer(event);
        self.publish();
    }

    /// Route a key command; clock commands are handled here, the rest by the world
    pub fn handle_key(&mut self, command: KeyCommand) -> bool {
        match command {
            KeyCommand::ToggleFreeze => {
                self.toggle_freeze();
            }
            KeyCommand::SetTimeScale(scale) => self.set_time_scale(scale),
            KeyCommand::CycleTimeScale => self.cycle_time_scale(),
            other => {
                let handled = self.world.handle_key(other);
                self.publish();
                return handled;
            }
        }
        true
    }

    /// Latest immutable draw state
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot)
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Direct world access for scripted scenes; call [`Sandbox::refresh`] after edits
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Republish the snapshot after direct world edits
    pub fn refresh(&mut self) {
        self.publish();
    }

    /// Preferred host frame interval (seconds)
    pub fn frame_interval(&self) -> f32 {
        self.world.tuning.frame_interval()
    }

    fn publish(&mut self) {
        let mut snapshot = Snapshot::capture(&self.world);
        snapshot.frozen = self.frozen;
        snapshot.time_scale = self.time_scale;
        self.snapshot = Arc::new(snapshot);
    }
}
