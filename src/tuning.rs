//! Engine tuning knobs
//!
//! A flat set of named numeric/boolean parameters. Units follow the engine:
//! lengths in px, body velocities in px/step, wave quantities per step.
//! Every knob documents its default and valid range; `sanitized()` clamps
//! out-of-range values back into range.

use serde::{Deserialize, Serialize};

/// Engine tuning parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Wave field ===
    /// Spring coupling between neighbouring samples. Default 0.18, range [0.0, 0.45]
    pub wave_stiffness: f32,
    /// Velocity diffusion between neighbouring samples. Default 0.03, range [0.0, 0.25]
    pub wave_viscosity: f32,
    /// Per-step velocity damping factor. Default 0.988, range [0.8, 1.0]
    pub wave_damping: f32,
    /// Sample velocity clamp (px/step). Default 14, range [1, 60]
    pub wave_max_velocity: f32,
    /// Upward excursion where compression starts (px). Default 60, range [5, 300]
    pub wave_soft_limit_up: f32,
    /// Absolute upward ceiling (px). Default 110, range [soft, 400]
    pub wave_hard_limit_up: f32,
    /// Downward excursion where compression starts (px). Default 45, range [5, 300]
    pub wave_soft_limit_down: f32,
    /// Absolute downward floor (px). Default 80, range [soft, 400]
    pub wave_hard_limit_down: f32,
    /// Fraction of overflow kept beyond the soft limit. Default 0.35, range [0, 1]
    pub wave_overflow_ratio: f32,
    /// Distance between wave samples (px). Default 8, range [2, 64]
    pub wave_sample_spacing: f32,
    /// Per-step decay of the surface in land mode. Default 0.9, range [0, 1]
    pub wave_land_decay: f32,
    /// Gaussian width `k` of reaction impulses `exp(-offset²/k)`. Default 4, range [0.5, 64]
    pub wave_reaction_width: f32,

    // === Pointer / keyboard impulses ===
    /// Impulse injected on pointer press in water (px/step). Default 3.2, range [0, 20]
    pub pointer_impulse: f32,
    /// Impulse per step while the pointer is held (px/step). Default 0.25, range [0, 5]
    pub pointer_hold_impulse: f32,
    /// Impulse spread radius in samples. Default 3, range [1, 16]
    pub pointer_impulse_radius: u32,
    /// Maximum magnitude of the random keyboard kick (px/step). Default 0.35, range [0, 5]
    pub keyboard_impulse: f32,
    /// Drop impulses above this magnitude throw spray. Default 1.2, range [0, 20]
    pub spray_impulse_threshold: f32,

    // === Bodies ===
    /// Mass of a reference-size square. Default 1.0, range [0.01, 100]
    pub base_mass: f32,
    /// Multiplier on geometric moments of inertia. Default 1.0, range [0.05, 20]
    pub base_inertia_scale: f32,
    /// Mass ratio of boxes. Default 1.0, range [0.05, 10]
    pub box_mass_ratio: f32,
    /// Mass ratio of circles. Default 0.9, range [0.05, 10]
    pub circle_mass_ratio: f32,
    /// Mass ratio of polygons. Default 1.0, range [0.05, 10]
    pub polygon_mass_ratio: f32,
    /// Downward gravity (px/step²). Default 0.45, range [0, 5]
    pub gravity: f32,
    /// Scale on gravity for falling bodies. Default 1.0, range [0, 4]
    pub fall_acceleration_scale: f32,
    /// Horizontal velocity limit (px/step). Default 38, range [1, 200]
    pub max_velocity_x: f32,
    /// Vertical velocity limit (px/step). Default 42, range [1, 200]
    pub max_velocity_y: f32,
    /// Angular velocity limit (rad/step). Default 0.6, range [0.01, 3]
    pub max_angular_velocity: f32,
    /// Multiplier on the velocity limits while a throw grace window is active. Default 1.6, range [1, 5]
    pub throw_limit_multiplier: f32,
    /// Length of the throw grace window (steps). Default 45, range [0, 600]
    pub throw_grace_steps: u32,
    /// Linear throw inertia multiplier. Default 1.0, range [0, 4]
    pub throw_linear_inertia: f32,
    /// Angular throw inertia multiplier. Default 0.6, range [0, 4]
    pub throw_angular_inertia: f32,
    /// Extra throw boost at high release speed. Default 0.35, range [0, 2]
    pub throw_speed_boost: f32,
    /// Release speed at which the full boost applies (px/step). Default 30, range [1, 200]
    pub throw_boost_reference: f32,
    /// Rolling drag history window (seconds). Default 0.12, range [0.02, 1]
    pub drag_history_window: f32,
    /// Velocity multiplier on wall contact (negative = reflect). Default -0.35, range [-1, 0]
    pub wall_bounce: f32,
    /// Angular velocity multiplier on wall contact. Default 0.85, range [0, 1]
    pub wall_angular_damping: f32,
    /// Per-step linear damping factor in air. Default 0.999, range [0.9, 1]
    pub air_damping: f32,
    /// Per-step angular damping factor in air. Default 0.995, range [0.9, 1]
    pub air_angular_damping: f32,
    /// Maximum live bodies. Default 160, range [1, 2000]
    pub max_bodies: usize,

    // === Buoyancy / drag ===
    /// Buoyancy at shallow submersion relative to gravity. Default 1.25, range [0, 5]
    pub buoyancy_base: f32,
    /// Additional buoyancy at full submersion. Default 0.65, range [0, 5]
    pub buoyancy_submersion: f32,
    /// Horizontal drag coefficient. Default 0.06, range [0, 1]
    pub drag_x: f32,
    /// Vertical drag coefficient. Default 0.09, range [0, 1]
    pub drag_y: f32,
    /// Angular drag per step while submerged. Default 0.04, range [0, 1]
    pub drag_angular: f32,
    /// Horizontal flow induced by surface slope. Default 1.5, range [0, 10]
    pub slope_flow: f32,
    /// Scale of the reaction impulse injected into the wave. Default 0.06, range [0, 1]
    pub fluid_reaction_scale: f32,
    /// Target immersion as a fraction of body height. Default 0.45, range [0, 1]
    pub flotation_target: f32,
    /// Flotation spring (per px of immersion error, relative to gravity). Default 0.02, range [0, 1]
    pub flotation_spring: f32,
    /// Flotation damper on vertical velocity. Default 0.08, range [0, 1]
    pub flotation_damper: f32,
    /// Band around the target (fraction of height) where the spring is active. Default 0.25, range [0, 1]
    pub flotation_band: f32,
    /// Sample grid density for arbitrary polygons (samples per reference edge). Default 4, range [1, 12]
    pub polygon_sample_density: f32,

    // === Collision ===
    /// Global restitution. Default 0.1, range [0, 1]
    pub restitution: f32,
    /// Restitution of bouncy bodies. Default 0.78, range [0, 1]
    pub bouncy_restitution: f32,
    /// Restitution forced on glass pairs. Default 0.02, range [0, 0.2]
    pub glass_restitution: f32,
    /// Approach speed below which restitution is zeroed (px/step). Default 1.2, range [0, 10]
    pub resting_speed_threshold: f32,
    /// Dynamic friction coefficient. Default 0.55, range [0, 3]
    pub friction_dynamic: f32,
    /// Static friction coefficient. Default 0.7, range [0, 3]
    pub friction_static: f32,
    /// Tangential speed below which static friction applies (px/step). Default 0.4, range [0, 5]
    pub static_friction_speed: f32,
    /// Friction multiplier for sticky bodies. Default 3.0, range [1, 10]
    pub sticky_friction_scale: f32,
    /// Friction coefficient cap for slippery bodies. Default 0.02, range [0, 0.5]
    pub slippery_friction: f32,
    /// Separation speed below which sticky bodies adhere (px/step). Default 1.5, range [0, 10]
    pub sticky_release_speed: f32,
    /// Fraction of slow separation removed by adhesion. Default 0.6, range [0, 1]
    pub sticky_adhesion: f32,
    /// Penetration-based support estimate gain. Default 0.05, range [0, 1]
    pub support_estimate_gain: f32,
    /// Allowed penetration before correction (px). Default 0.5, range [0, 5]
    pub collision_slop: f32,
    /// Fraction of penetration corrected per pass. Default 0.6, range [0, 0.8]
    pub correction_fraction: f32,
    /// Baumgarte velocity bias factor. Default 0.15, range [0, 1]
    pub baumgarte_bias: f32,
    /// Maximum bias velocity (px/step). Default 6, range [0, 50]
    pub max_bias_velocity: f32,
    /// Base solver iterations. Default 6, range [1, 40]
    pub collision_iterations: u32,
    /// Extra solver iterations when wheels are present. Default 4, range [0, 40]
    pub wheel_extra_iterations: u32,

    // === Weld ===
    /// Projection passes per substep. Default 2, range [1, 16]
    pub weld_iterations: u32,
    /// Blend toward the projected pose (1 = rigid). Default 1.0, range [0.05, 1]
    pub weld_stiffness: f32,
    /// Blend toward the synchronized velocity (1 = rigid). Default 1.0, range [0, 1]
    pub weld_damping: f32,

    // === Glass ===
    /// Impulse threshold for a unit-strength body. Default 6, range [0.1, 200]
    pub glass_impulse_threshold: f32,
    /// Closing speed threshold for a unit-strength body (px/step). Default 7, range [0.1, 100]
    pub glass_speed_threshold: f32,
    /// Damage gained per unit of impact input. Default 0.35, range [0, 10]
    pub glass_impact_damage: f32,
    /// Single-impact input that breaks outright. Default 2.2, range [0.1, 50]
    pub glass_single_break: f32,
    /// Load capacity in multiples of own mass (scaled by strength). Default 2.2, range [0.1, 50]
    pub glass_capacity_ratio: f32,
    /// Damage gained per unit of overload ratio excess per step. Default 0.05, range [0, 5]
    pub glass_overload_damage: f32,
    /// Damage that breaks an overloaded body. Default 0.6, range [0, 10]
    pub glass_overload_break: f32,
    /// Damage that breaks a body by fatigue alone. Default 1.6, range [0.1, 20]
    pub glass_fatigue_break: f32,
    /// Damage decay per idle step. Default 0.01, range [0, 1]
    pub glass_decay: f32,

    // === Spray / shards ===
    /// Enable water droplets. Default true
    pub spray_enabled: bool,
    /// Maximum live droplets (oldest evicted). Default 600, range [0, 10000]
    pub max_droplets: usize,
    /// Droplet gravity (px/step²). Default 0.27, range [0, 5]
    pub droplet_gravity: f32,
    /// Droplet per-step velocity damping. Default 0.985, range [0.5, 1]
    pub droplet_damping: f32,
    /// Wave impulse per unit droplet momentum on reabsorption. Default 0.04, range [0, 1]
    pub droplet_reabsorb_gain: f32,
    /// Body entry vertical speed that throws spray (px/step). Default 3, range [0, 50]
    pub entry_splash_speed: f32,
    /// Maximum live shards (further shards are refused). Default 900, range [0, 10000]
    pub max_shards: usize,
    /// Shard gravity (px/step²). Default 0.47, range [0, 5]
    pub shard_gravity: f32,
    /// Shard per-step velocity damping. Default 0.95, range [0.5, 1]
    pub shard_damping: f32,

    // === Land ===
    /// Ground restitution. Default 0.05, range [0, 1]
    pub ground_restitution: f32,
    /// Ground friction coefficient. Default 0.9, range [0, 3]
    pub ground_friction: f32,
    /// Angular velocity multiplier per ground contact step. Default 0.92, range [0, 1]
    pub ground_angular_damping: f32,
    /// Speed under which a grounded body is settled (px/step). Default 0.12, range [0, 5]
    pub settle_speed: f32,
    /// Angular speed under which a grounded body is settled (rad/step). Default 0.01, range [0, 1]
    pub settle_angular_speed: f32,
    /// Support width (fraction of body width) below which a box is snapped flat. Default 0.35, range [0, 1]
    pub settle_support_fraction: f32,

    // === Clock ===
    /// Host frame rate limit. Default 60, range [15, 240]
    pub fps_limit: u32,
    /// Simulation time scale. Default 1.0, range [0.1, 4]
    pub time_scale: f32,
    /// Seed for every stochastic effect. Default 0x5EED
    pub seed: u64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            wave_stiffness: 0.18,
            wave_viscosity: 0.03,
            wave_damping: 0.988,
            wave_max_velocity: 14.0,
            wave_soft_limit_up: 60.0,
            wave_hard_limit_up: 110.0,
            wave_soft_limit_down: 45.0,
            wave_hard_limit_down: 80.0,
            wave_overflow_ratio: 0.35,
            wave_sample_spacing: 8.0,
            wave_land_decay: 0.9,
            wave_reaction_width: 4.0,

            pointer_impulse: 3.2,
            pointer_hold_impulse: 0.25,
            pointer_impulse_radius: 3,
            keyboard_impulse: 0.35,
            spray_impulse_threshold: 1.2,

            base_mass: 1.0,
            base_inertia_scale: 1.0,
            box_mass_ratio: 1.0,
            circle_mass_ratio: 0.9,
            polygon_mass_ratio: 1.0,
            gravity: 0.45,
            fall_acceleration_scale: 1.0,
            max_velocity_x: 38.0,
            max_velocity_y: 42.0,
            max_angular_velocity: 0.6,
            throw_limit_multiplier: 1.6,
            throw_grace_steps: 45,
            throw_linear_inertia: 1.0,
            throw_angular_inertia: 0.6,
            throw_speed_boost: 0.35,
            throw_boost_reference: 30.0,
            drag_history_window: 0.12,
            wall_bounce: -0.35,
            wall_angular_damping: 0.85,
            air_damping: 0.999,
            air_angular_damping: 0.995,
            max_bodies: 160,

            buoyancy_base: 1.25,
            buoyancy_submersion: 0.65,
            drag_x: 0.06,
            drag_y: 0.09,
            drag_angular: 0.04,
            slope_flow: 1.5,
            fluid_reaction_scale: 0.06,
            flotation_target: 0.45,
            flotation_spring: 0.02,
            flotation_damper: 0.08,
            flotation_band: 0.25,
            polygon_sample_density: 4.0,

            restitution: 0.1,
            bouncy_restitution: 0.78,
            glass_restitution: 0.02,
            resting_speed_threshold: 1.2,
            friction_dynamic: 0.55,
            friction_static: 0.7,
            static_friction_speed: 0.4,
            sticky_friction_scale: 3.0,
            slippery_friction: 0.02,
            sticky_release_speed: 1.5,
            sticky_adhesion: 0.6,
            support_estimate_gain: 0.05,
            collision_slop: 0.5,
            correction_fraction: 0.6,
            baumgarte_bias: 0.15,
            max_bias_velocity: 6.0,
            collision_iterations: 6,
            wheel_extra_iterations: 4,

            weld_iterations: 2,
            weld_stiffness: 1.0,
            weld_damping: 1.0,

            glass_impulse_threshold: 6.0,
            glass_speed_threshold: 7.0,
            glass_impact_damage: 0.35,
            glass_single_break: 2.2,
            glass_capacity_ratio: 2.2,
            glass_overload_damage: 0.05,
            glass_overload_break: 0.6,
            glass_fatigue_break: 1.6,
            glass_decay: 0.01,

            spray_enabled: true,
            max_droplets: 600,
            droplet_gravity: 0.27,
            droplet_damping: 0.985,
            droplet_reabsorb_gain: 0.04,
            entry_splash_speed: 3.0,
            max_shards: 900,
            shard_gravity: 0.47,
            shard_damping: 0.95,

            ground_restitution: 0.05,
            ground_friction: 0.9,
            ground_angular_damping: 0.92,
            settle_speed: 0.12,
            settle_angular_speed: 0.01,
            settle_support_fraction: 0.35,

            fps_limit: 60,
            time_scale: 1.0,
            seed: 0x5EED,
        }
    }
}

impl Tuning {
    /// Clamp every knob into its documented range
    pub fn sanitized(mut self) -> Self {
        self.wave_stiffness = self.wave_stiffness.clamp(0.0, 0.45);
        self.wave_viscosity = self.wave_viscosity.clamp(0.0, 0.25);
        self.wave_damping = self.wave_damping.clamp(0.8, 1.0);
        self.wave_max_velocity = self.wave_max_velocity.clamp(1.0, 60.0);
        self.wave_soft_limit_up = self.wave_soft_limit_up.clamp(5.0, 300.0);
        self.wave_hard_limit_up = self.wave_hard_limit_up.clamp(self.wave_soft_limit_up, 400.0);
        self.wave_soft_limit_down = self.wave_soft_limit_down.clamp(5.0, 300.0);
        self.wave_hard_limit_down = self
            .wave_hard_limit_down
            .clamp(self.wave_soft_limit_down, 400.0);
        self.wave_overflow_ratio = self.wave_overflow_ratio.clamp(0.0, 1.0);
        self.wave_sample_spacing = self.wave_sample_spacing.clamp(2.0, 64.0);
        self.wave_land_decay = self.wave_land_decay.clamp(0.0, 1.0);
        self.wave_reaction_width = self.wave_reaction_width.clamp(0.5, 64.0);

        self.pointer_impulse = self.pointer_impulse.clamp(0.0, 20.0);
        self.pointer_hold_impulse = self.pointer_hold_impulse.clamp(0.0, 5.0);
        self.pointer_impulse_radius = self.pointer_impulse_radius.clamp(1, 16);
        self.keyboard_impulse = self.keyboard_impulse.clamp(0.0, 5.0);
        self.spray_impulse_threshold = self.spray_impulse_threshold.clamp(0.0, 20.0);

        self.base_mass = self.base_mass.clamp(0.01, 100.0);
        self.base_inertia_scale = self.base_inertia_scale.clamp(0.05, 20.0);
        self.box_mass_ratio = self.box_mass_ratio.clamp(0.05, 10.0);
        self.circle_mass_ratio = self.circle_mass_ratio.clamp(0.05, 10.0);
        self.polygon_mass_ratio = self.polygon_mass_ratio.clamp(0.05, 10.0);
        self.gravity = self.gravity.clamp(0.0, 5.0);
        self.fall_acceleration_scale = self.fall_acceleration_scale.clamp(0.0, 4.0);
        self.max_velocity_x = self.max_velocity_x.clamp(1.0, 200.0);
        self.max_velocity_y = self.max_velocity_y.clamp(1.0, 200.0);
        self.max_angular_velocity = self.max_angular_velocity.clamp(0.01, 3.0);
        self.throw_limit_multiplier = self.throw_limit_multiplier.clamp(1.0, 5.0);
        self.throw_grace_steps = self.throw_grace_steps.min(600);
        self.throw_linear_inertia = self.throw_linear_inertia.clamp(0.0, 4.0);
        self.throw_angular_inertia = self.throw_angular_inertia.clamp(0.0, 4.0);
        self.throw_speed_boost = self.throw_speed_boost.clamp(0.0, 2.0);
        self.throw_boost_reference = self.throw_boost_reference.clamp(1.0, 200.0);
        self.drag_history_window = self.drag_history_window.clamp(0.02, 1.0);
        self.wall_bounce = self.wall_bounce.clamp(-1.0, 0.0);
        self.wall_angular_damping = self.wall_angular_damping.clamp(0.0, 1.0);
        self.air_damping = self.air_damping.clamp(0.9, 1.0);
        self.air_angular_damping = self.air_angular_damping.clamp(0.9, 1.0);
        self.max_bodies = self.max_bodies.clamp(1, 2000);

        self.buoyancy_base = self.buoyancy_base.clamp(0.0, 5.0);
        self.buoyancy_submersion = self.buoyancy_submersion.clamp(0.0, 5.0);
        self.drag_x = self.drag_x.clamp(0.0, 1.0);
        self.drag_y = self.drag_y.clamp(0.0, 1.0);
        self.drag_angular = self.drag_angular.clamp(0.0, 1.0);
        self.slope_flow = self.slope_flow.clamp(0.0, 10.0);
        self.fluid_reaction_scale = self.fluid_reaction_scale.clamp(0.0, 1.0);
        self.flotation_target = self.flotation_target.clamp(0.0, 1.0);
        self.flotation_spring = self.flotation_spring.clamp(0.0, 1.0);
        self.flotation_damper = self.flotation_damper.clamp(0.0, 1.0);
        self.flotation_band = self.flotation_band.clamp(0.0, 1.0);
        self.polygon_sample_density = self.polygon_sample_density.clamp(1.0, 12.0);

        self.restitution = self.restitution.clamp(0.0, 1.0);
        self.bouncy_restitution = self.bouncy_restitution.clamp(0.0, 1.0);
        self.glass_restitution = self.glass_restitution.clamp(0.0, 0.2);
        self.resting_speed_threshold = self.resting_speed_threshold.clamp(0.0, 10.0);
        self.friction_dynamic = self.friction_dynamic.clamp(0.0, 3.0);
        self.friction_static = self.friction_static.clamp(0.0, 3.0);
        self.static_friction_speed = self.static_friction_speed.clamp(0.0, 5.0);
        self.sticky_friction_scale = self.sticky_friction_scale.clamp(1.0, 10.0);
        self.slippery_friction = self.slippery_friction.clamp(0.0, 0.5);
        self.sticky_release_speed = self.sticky_release_speed.clamp(0.0, 10.0);
        self.sticky_adhesion = self.sticky_adhesion.clamp(0.0, 1.0);
        self.support_estimate_gain = self.support_estimate_gain.clamp(0.0, 1.0);
        self.collision_slop = self.collision_slop.clamp(0.0, 5.0);
        self.correction_fraction = self.correction_fraction.clamp(0.0, 0.8);
        self.baumgarte_bias = self.baumgarte_bias.clamp(0.0, 1.0);
        self.max_bias_velocity = self.max_bias_velocity.clamp(0.0, 50.0);
        self.collision_iterations = self.collision_iterations.clamp(1, 40);
        self.wheel_extra_iterations = self.wheel_extra_iterations.min(40);

        self.weld_iterations = self.weld_iterations.clamp(1, 16);
        self.weld_stiffness = self.weld_stiffness.clamp(0.05, 1.0);
        self.weld_damping = self.weld_damping.clamp(0.0, 1.0);

        self.glass_impulse_threshold = self.glass_impulse_threshold.clamp(0.1, 200.0);
        self.glass_speed_threshold = self.glass_speed_threshold.clamp(0.1, 100.0);
        self.glass_impact_damage = self.glass_impact_damage.clamp(0.0, 10.0);
        self.glass_single_break = self.glass_single_break.clamp(0.1, 50.0);
        self.glass_capacity_ratio = self.glass_capacity_ratio.clamp(0.1, 50.0);
        self.glass_overload_damage = self.glass_overload_damage.clamp(0.0, 5.0);
        self.glass_overload_break = self.glass_overload_break.clamp(0.0, 10.0);
        self.glass_fatigue_break = self.glass_fatigue_break.clamp(0.1, 20.0);
        self.glass_decay = self.glass_decay.clamp(0.0, 1.0);

        self.max_droplets = self.max_droplets.min(10_000);
        self.droplet_gravity = self.droplet_gravity.clamp(0.0, 5.0);
        self.droplet_damping = self.droplet_damping.clamp(0.5, 1.0);
        self.droplet_reabsorb_gain = self.droplet_reabsorb_gain.clamp(0.0, 1.0);
        self.entry_splash_speed = self.entry_splash_speed.clamp(0.0, 50.0);
        self.max_shards = self.max_shards.min(10_000);
        self.shard_gravity = self.shard_gravity.clamp(0.0, 5.0);
        self.shard_damping = self.shard_damping.clamp(0.5, 1.0);

        self.ground_restitution = self.ground_restitution.clamp(0.0, 1.0);
        self.ground_friction = self.ground_friction.clamp(0.0, 3.0);
        self.ground_angular_damping = self.ground_angular_damping.clamp(0.0, 1.0);
        self.settle_speed = self.settle_speed.clamp(0.0, 5.0);
        self.settle_angular_speed = self.settle_angular_speed.clamp(0.0, 1.0);
        self.settle_support_fraction = self.settle_support_fraction.clamp(0.0, 1.0);

        self.fps_limit = self.fps_limit.clamp(15, 240);
        self.time_scale = self.time_scale.clamp(0.1, 4.0);
        self
    }

    /// Effective gravity acting on a falling body (px/step²)
    #[inline]
    pub fn fall_gravity(&self) -> f32 {
        self.gravity * self.fall_acceleration_scale
    }

    /// Host frame interval implied by the fps limit (seconds)
    pub fn frame_interval(&self) -> f32 {
        1.0 / self.fps_limit.max(1) as f32
    }

    /// Parse tuning from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Tuning>(json).map(Tuning::sanitized)
    }

    /// Parse tuning from JSON, falling back to defaults on malformed input
    pub fn from_json_or_default(json: &str) -> Self {
        match Self::from_json(json) {
            Ok(tuning) => {
                log::info!("Loaded tuning overrides");
                tuning
            }
            Err(e) => {
                log::warn!("Rejected tuning JSON ({e}); using defaults");
                Self::default()
            }
        }
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_in_range() {
        let tuning = Tuning::default();
        assert_eq!(tuning.clone().sanitized(), tuning);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let tuning = Tuning::from_json(r#"{ "gravity": 0.8, "collision_iterations": 10 }"#)
            .expect("valid json");
        assert_eq!(tuning.gravity, 0.8);
        assert_eq!(tuning.collision_iterations, 10);
        assert_eq!(tuning.wave_stiffness, Tuning::default().wave_stiffness);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let tuning = Tuning::from_json(r#"{ "correction_fraction": 3.0, "wave_stiffness": -1 }"#)
            .expect("valid json");
        assert_eq!(tuning.correction_fraction, 0.8);
        assert_eq!(tuning.wave_stiffness, 0.0);
    }

    #[test]
    fn test_malformed_json_falls_back() {
        let tuning = Tuning::from_json_or_default("{ not json");
        assert_eq!(tuning, Tuning::default());
    }

    #[test]
    fn test_exported_json_is_accepted() {
        let tuning = Tuning {
            seed: 42,
            max_bodies: 12,
            ..Default::default()
        };
        let back = Tuning::from_json(&tuning.to_json()).expect("valid json");
        assert_eq!(back.seed, 42);
        assert_eq!(back.max_bodies, 12);
    }
}
