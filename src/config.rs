//! Tuning constants for every ability.
//!
//! Loaded once when the player is created and never mutated afterwards. All
//! sections use `#[serde(default)]`, so a JSON file only needs the values it
//! overrides.

use std::fmt;
use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "failed to read config: {}", e),
            ConfigError::Parse(e) => write!(f, "failed to parse config: {}", e),
            ConfigError::Invalid(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbilityConfig {
    pub movement: MovementConfig,
    pub forces: ForcesConfig,
    pub aim: AimConfig,
    pub hover: HoverConfig,
    pub swim: SwimConfig,
    pub grapple: GrappleConfig,
    pub whip: WhipConfig,
    pub vacuum: VacuumConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    pub speed: f32,
    pub rotation_speed: f32,
    /// Seconds to reach full speed.
    pub acceleration_time: f32,
    /// Seconds to come to rest.
    pub deceleration_time: f32,
    pub jump_force: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            speed: 6.0,
            rotation_speed: 10.0,
            acceleration_time: 0.1,
            deceleration_time: 0.2,
            jump_force: 6.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForcesConfig {
    /// Downward acceleration (negative).
    pub gravity: f32,
    /// Smoothing time for queued impulses, in seconds.
    pub drag: f32,
    /// Vertical velocity held while grounded so the controller keeps contact.
    pub ground_stick: f32,
}

impl Default for ForcesConfig {
    fn default() -> Self {
        Self {
            gravity: -9.81,
            drag: 0.4,
            ground_stick: -2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AimConfig {
    pub speed_multiplier: f32,
    pub fire_cooldown: f32,
    pub flight_time: f32,
    pub max_distance: f32,
    pub sphere_radius: f32,
    pub reticle_offset: f32,
    pub reticle_size_at_1m: f32,
    pub projectile_damage: f32,
    pub projectile_radius: f32,
    /// Muzzle position relative to the body (body-local axes).
    pub fire_point: Vec3,
}

impl Default for AimConfig {
    fn default() -> Self {
        Self {
            speed_multiplier: 0.5,
            fire_cooldown: 0.15,
            flight_time: 0.6,
            max_distance: 80.0,
            sphere_radius: 0.08,
            reticle_offset: 0.02,
            reticle_size_at_1m: 0.08,
            projectile_damage: 5.0,
            projectile_radius: 0.1,
            fire_point: Vec3::new(0.3, 1.4, 0.5),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoverConfig {
    pub force: f32,
    pub aerial_speed: f32,
}

impl Default for HoverConfig {
    fn default() -> Self {
        Self {
            force: 15.0,
            aerial_speed: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwimConfig {
    pub speed: f32,
    pub acceleration: f32,
    pub deceleration: f32,
    pub stick_force: f32,
    /// Seconds without a detected surface before traversal ends.
    pub surface_grace: f32,
    pub detect_radius: f32,
    pub probe_length: f32,
    pub height: f32,
    pub jump_multiplier: f32,
    /// Push along the last normal when the surface is lost.
    pub exit_push: f32,
}

impl Default for SwimConfig {
    fn default() -> Self {
        Self {
            speed: 12.0,
            acceleration: 60.0,
            deceleration: 40.0,
            stick_force: 5.0,
            surface_grace: 0.15,
            detect_radius: 0.7,
            probe_length: 1.5,
            height: 0.5,
            jump_multiplier: 1.5,
            exit_push: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrappleConfig {
    pub max_distance: f32,
    pub swing_radius: f32,
    /// Angular speed forced on entry when the player arrives too slowly.
    pub min_swing_speed: f32,
    /// Floor on |angular velocity| while swinging.
    pub min_angular_velocity: f32,
    /// Constant angular acceleration along the current direction of motion.
    pub energy_boost: f32,
    /// Per-step multiplier on angular velocity. 1.0 means no damping.
    pub damping: f32,
    pub input_force: f32,
    pub launch_up_force: f32,
    pub rope_extend_time: f32,
    /// Rope breaks beyond `max_distance * break_factor`.
    pub break_factor: f32,
    pub rope_origin_height: f32,
    /// Entry speed above which the swing follows the player's heading
    /// instead of the camera's.
    pub heading_speed_threshold: f32,
}

impl Default for GrappleConfig {
    fn default() -> Self {
        Self {
            max_distance: 20.0,
            swing_radius: 5.0,
            min_swing_speed: 1.0,
            min_angular_velocity: 1.5,
            energy_boost: 0.2,
            damping: 1.0,
            input_force: 2.0,
            launch_up_force: 5.0,
            rope_extend_time: 0.12,
            break_factor: 1.2,
            rope_origin_height: 1.5,
            heading_speed_threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhipConfig {
    pub range: f32,
    /// Full view cone, degrees.
    pub view_angle: f32,
    pub hold_height: f32,
    pub hold_radius: f32,
    pub capture_speed: f32,
    pub capture_threshold: f32,
    /// Degrees per second.
    pub start_spin_speed: f32,
    pub max_spin_speed: f32,
    pub spin_acceleration: f32,
    pub min_throw_force: f32,
    pub max_throw_force: f32,
}

impl Default for WhipConfig {
    fn default() -> Self {
        Self {
            range: 15.0,
            view_angle: 120.0,
            hold_height: 2.0,
            hold_radius: 2.0,
            capture_speed: 8.0,
            capture_threshold: 0.3,
            start_spin_speed: 180.0,
            max_spin_speed: 720.0,
            spin_acceleration: 360.0,
            min_throw_force: 10.0,
            max_throw_force: 30.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VacuumConfig {
    pub range: f32,
    /// Full absorption cone, degrees.
    pub cone_angle: f32,
    pub max_simultaneous: usize,
    pub absorb_speed: f32,
    pub capacity: usize,
    pub completion_threshold: f32,
    pub hold_height: f32,
    pub hold_distance: f32,
    pub projectile_speed_multiplier: f32,
    pub enemy_projectile_damage: f32,
    pub large_move_multiplier: f32,
}

impl Default for VacuumConfig {
    fn default() -> Self {
        Self {
            range: 6.0,
            cone_angle: 60.0,
            max_simultaneous: 3,
            absorb_speed: 8.0,
            capacity: 5,
            completion_threshold: 0.3,
            hold_height: 1.5,
            hold_distance: 2.0,
            projectile_speed_multiplier: 1.0,
            enemy_projectile_damage: 30.0,
            large_move_multiplier: 0.6,
        }
    }
}

impl AbilityConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: AbilityConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&text)?;
        log::info!("[config] loaded {}", path.as_ref().display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(name: &str, value: f32) -> Result<(), ConfigError> {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!("{} must be positive, got {}", name, value)))
            }
        }

        positive("movement.speed", self.movement.speed)?;
        positive("movement.acceleration_time", self.movement.acceleration_time)?;
        positive("movement.deceleration_time", self.movement.deceleration_time)?;
        positive("forces.drag", self.forces.drag)?;
        if self.forces.gravity >= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "forces.gravity must be negative, got {}",
                self.forces.gravity
            )));
        }
        if self.aim.flight_time < 0.05 {
            return Err(ConfigError::Invalid(format!(
                "aim.flight_time must be at least 0.05s, got {}",
                self.aim.flight_time
            )));
        }
        positive("aim.max_distance", self.aim.max_distance)?;
        positive("swim.detect_radius", self.swim.detect_radius)?;
        positive("swim.height", self.swim.height)?;
        positive("grapple.max_distance", self.grapple.max_distance)?;
        positive("grapple.swing_radius", self.grapple.swing_radius)?;
        positive("whip.range", self.whip.range)?;
        positive("whip.hold_radius", self.whip.hold_radius)?;
        if self.whip.max_spin_speed <= self.whip.start_spin_speed {
            return Err(ConfigError::Invalid(
                "whip.max_spin_speed must exceed whip.start_spin_speed".into(),
            ));
        }
        if self.whip.max_throw_force < self.whip.min_throw_force {
            return Err(ConfigError::Invalid(
                "whip.max_throw_force must not be below whip.min_throw_force".into(),
            ));
        }
        positive("vacuum.range", self.vacuum.range)?;
        if self.vacuum.capacity == 0 {
            return Err(ConfigError::Invalid("vacuum.capacity must be at least 1".into()));
        }
        if self.vacuum.max_simultaneous == 0 {
            return Err(ConfigError::Invalid(
                "vacuum.max_simultaneous must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        AbilityConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = AbilityConfig::from_json_str(
            r#"{ "grapple": { "swing_radius": 7.5 }, "vacuum": { "capacity": 3 } }"#,
        )
        .unwrap();
        assert_eq!(config.grapple.swing_radius, 7.5);
        assert_eq!(config.grapple.max_distance, 20.0);
        assert_eq!(config.vacuum.capacity, 3);
        assert_eq!(config.movement, MovementConfig::default());
    }

    #[test]
    fn rejects_zero_capacity() {
        let err = AbilityConfig::from_json_str(r#"{ "vacuum": { "capacity": 0 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_tiny_flight_time() {
        let err = AbilityConfig::from_json_str(r#"{ "aim": { "flight_time": 0.01 } }"#).unwrap_err();
        assert!(err.to_string().contains("aim.flight_time"));
    }

    #[test]
    fn rejects_inverted_spin_range() {
        let mut config = AbilityConfig::default();
        config.whip.max_spin_speed = 90.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = AbilityConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = AbilityConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
