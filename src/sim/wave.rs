//! 1D damped wave field standing in for the water surface
//!
//! Sample `i` sits at `x = i * spacing`. Displacement is positive downward
//! (screen space), so negative values are crests. Index 0 and N-1 are the
//! domain boundary and stay pinned at zero.

use serde::{Deserialize, Serialize};

use crate::tuning::Tuning;

/// The water surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaveField {
    heights: Vec<f32>,
    velocities: Vec<f32>,
    /// Distance between samples (px)
    spacing: f32,
    /// Rest line of the surface (screen y)
    pub baseline: f32,
    #[serde(skip)]
    scratch: Vec<f32>,
}

impl WaveField {
    /// Create a field covering `width` px with the given sample spacing
    pub fn new(width: f32, spacing: f32, baseline: f32) -> Self {
        let spacing = spacing.max(1.0);
        let count = ((width / spacing).ceil() as usize + 1).max(8);
        Self {
            heights: vec![0.0; count],
            velocities: vec![0.0; count],
            spacing,
            baseline,
            scratch: vec![0.0; count],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.heights.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }

    #[inline]
    pub fn spacing(&self) -> f32 {
        self.spacing
    }

    /// Sample displacements (positive = below baseline)
    #[inline]
    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    #[inline]
    pub fn velocities(&self) -> &[f32] {
        &self.velocities
    }

    /// Stretch the field over a new viewport width without changing the sample count
    pub fn rescale(&mut self, width: f32, baseline: f32) {
        let n = self.len().max(2);
        self.spacing = (width / (n - 1) as f32).max(1.0);
        self.baseline = baseline;
    }

    /// Zero the whole surface
    pub fn clear(&mut self) {
        self.heights.iter_mut().for_each(|h| *h = 0.0);
        self.velocities.iter_mut().for_each(|v| *v = 0.0);
    }

    /// Nearest sample index for a screen x, clamped into range
    pub fn index_for_x(&self, x: f32) -> usize {
        let idx = (x / self.spacing).round();
        if idx.is_nan() || idx < 0.0 {
            0
        } else {
            (idx as usize).min(self.len() - 1)
        }
    }

    fn lerp_samples(&self, values: &[f32], x: f32) -> f32 {
        let last = self.len() - 1;
        let fx = (x / self.spacing).clamp(0.0, last as f32);
        let i0 = (fx.floor() as usize).min(last);
        let i1 = (i0 + 1).min(last);
        let t = fx - i0 as f32;
        values[i0] + (values[i1] - values[i0]) * t
    }

    /// Interpolated displacement at x
    pub fn displacement_at(&self, x: f32) -> f32 {
        self.lerp_samples(&self.heights, x)
    }

    /// Interpolated surface y at x (screen space)
    pub fn surface_y(&self, x: f32) -> f32 {
        self.baseline + self.displacement_at(x)
    }

    /// Interpolated vertical surface velocity at x (px/step, positive downward)
    pub fn velocity_at(&self, x: f32) -> f32 {
        self.lerp_samples(&self.velocities, x)
    }

    /// Centered finite-difference slope dy/dx of the surface at x
    pub fn slope_at(&self, x: f32) -> f32 {
        let h = self.spacing;
        (self.displacement_at(x + h) - self.displacement_at(x - h)) / (2.0 * h)
    }

    /// Cosine-weighted bump of velocity around the sample nearest `x`
    pub fn add_drop_impulse(&mut self, x: f32, strength: f32, radius: u32) {
        let center = self.index_for_x(x) as i64;
        let r = radius.max(1) as i64;
        let last = self.len() as i64 - 1;
        for k in -r..=r {
            let i = center + k;
            if i <= 0 || i >= last {
                continue;
            }
            let w = 0.5 * (1.0 + (std::f32::consts::PI * k as f32 / (r + 1) as f32).cos());
            self.velocities[i as usize] += strength * w;
        }
    }

    /// Gaussian-weighted reaction impulse `exp(-offset²/k)` from body coupling
    pub fn apply_reaction_impulse(&mut self, x: f32, amount: f32, width: f32) {
        let center = self.index_for_x(x) as i64;
        let k = width.max(0.5);
        let reach = (3.0 * k.sqrt()).ceil() as i64;
        let last = self.len() as i64 - 1;
        for off in -reach..=reach {
            let i = center + off;
            if i <= 0 || i >= last {
                continue;
            }
            let w = (-((off * off) as f32) / k).exp();
            self.velocities[i as usize] += amount * w;
        }
    }

    /// Advance the PDE by one step (water mode)
    pub fn step(&mut self, tuning: &Tuning) {
        let n = self.len();
        if n < 3 {
            return;
        }
        self.scratch.clone_from(&self.velocities);
        let max_v = tuning.wave_max_velocity;
        for i in 1..n - 1 {
            let lap_s = self.heights[i - 1] + self.heights[i + 1] - 2.0 * self.heights[i];
            let lap_v = self.scratch[i - 1] + self.scratch[i + 1] - 2.0 * self.scratch[i];
            let mut v = self.scratch[i] + lap_s * tuning.wave_stiffness + lap_v * tuning.wave_viscosity;
            v *= tuning.wave_damping;
            self.velocities[i] = v.clamp(-max_v, max_v);
        }
        for i in 1..n - 1 {
            self.heights[i] = limited_displacement(self.heights[i] + self.velocities[i], tuning);
        }
        self.pin_boundaries();
    }

    /// Decay the surface toward rest (land mode)
    pub fn decay(&mut self, tuning: &Tuning) {
        let f = tuning.wave_land_decay;
        for (h, v) in self.heights.iter_mut().zip(self.velocities.iter_mut()) {
            *h *= f;
            *v = 0.0;
        }
        self.pin_boundaries();
    }

    fn pin_boundaries(&mut self) {
        let last = self.len() - 1;
        self.heights[0] = 0.0;
        self.heights[last] = 0.0;
        self.velocities[0] = 0.0;
        self.velocities[last] = 0.0;
    }
}

/// Asymmetric splash ceiling: overflow beyond the soft limit is compressed,
/// then clipped at the hard limit. Negative values are upward excursions.
pub fn limited_displacement(value: f32, tuning: &Tuning) -> f32 {
    let (soft, hard) = if value < 0.0 {
        (tuning.wave_soft_limit_up, tuning.wave_hard_limit_up)
    } else {
        (tuning.wave_soft_limit_down, tuning.wave_hard_limit_down)
    };
    let mag = value.abs();
    let limited = if mag > soft {
        (soft + (mag - soft) * tuning.wave_overflow_ratio).min(hard)
    } else {
        mag
    };
    limited.copysign(value)
}
