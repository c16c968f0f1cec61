use glam::Vec3;

use crate::config::ForcesConfig;

/// Accumulates external impulses and the vertical fall term into one
/// per-step displacement contribution.
///
/// States read [`movement`](ForceIntegrator::movement) and add it to their own
/// motion before moving the controller. States that fully own the body's
/// motion (surface traversal, swinging) disable the integrator on entry and
/// re-enable it on exit; disabling only pauses [`step`](ForceIntegrator::step),
/// it never clears queued impulses.
#[derive(Debug, Clone)]
pub struct ForceIntegrator {
    impact: Vec3,
    damping_velocity: Vec3,
    vertical_velocity: f32,
    gravity: f32,
    drag: f32,
    ground_stick: f32,
    enabled: bool,
}

impl ForceIntegrator {
    pub fn new(config: &ForcesConfig) -> Self {
        Self {
            impact: Vec3::ZERO,
            damping_velocity: Vec3::ZERO,
            vertical_velocity: 0.0,
            gravity: config.gravity,
            drag: config.drag,
            ground_stick: config.ground_stick,
            enabled: true,
        }
    }

    /// Combined displacement rate: queued impulse plus vertical velocity.
    pub fn movement(&self) -> Vec3 {
        self.impact + Vec3::Y * self.vertical_velocity
    }

    pub fn impact(&self) -> Vec3 {
        self.impact
    }

    pub fn vertical_velocity(&self) -> f32 {
        self.vertical_velocity
    }

    pub fn gravity(&self) -> f32 {
        self.gravity
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Idempotent. Queued impulses survive a disable/enable cycle.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            log::debug!("[forces] integrator {}", if enabled { "enabled" } else { "disabled" });
        }
        self.enabled = enabled;
    }

    /// Advance one simulation step. No-op while disabled.
    pub fn step(&mut self, dt: f32, grounded: bool) {
        if !self.enabled {
            return;
        }
        if self.vertical_velocity < 0.0 && grounded {
            self.vertical_velocity = self.ground_stick;
        } else {
            self.vertical_velocity += self.gravity * dt;
        }
        self.impact = smooth_damp(self.impact, Vec3::ZERO, &mut self.damping_velocity, self.drag, dt);
    }

    pub fn add_force(&mut self, force: Vec3) {
        self.impact += force;
    }

    pub fn jump(&mut self, force: f32) {
        self.vertical_velocity = force;
    }

    /// Clears upward velocity only. Called when the controller hits a ceiling.
    pub fn reset_vertical_velocity(&mut self) {
        if self.vertical_velocity > 0.0 {
            self.vertical_velocity = 0.0;
        }
    }

    /// Clears vertical velocity in both directions (hover thrust).
    pub fn clear_vertical_velocity(&mut self) {
        self.vertical_velocity = 0.0;
    }
}

/// Critically damped spring toward `target` (the game-engine "SmoothDamp").
///
/// `velocity` is the caller-held spring state; it must be passed back in on
/// every call.
pub fn smooth_damp(current: Vec3, target: Vec3, velocity: &mut Vec3, smooth_time: f32, dt: f32) -> Vec3 {
    if dt <= 0.0 {
        return current;
    }
    let smooth_time = smooth_time.max(1e-4);
    let omega = 2.0 / smooth_time;
    let x = omega * dt;
    let exp = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);

    let change = current - target;
    let temp = (*velocity + omega * change) * dt;
    *velocity = (*velocity - omega * temp) * exp;
    let mut output = target + (change + temp) * exp;

    // Never overshoot the target.
    if (target - current).dot(output - target) > 0.0 {
        output = target;
        *velocity = Vec3::ZERO;
    }
    output
}
