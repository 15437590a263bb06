//! Simulation configuration.
//!
//! Tuning is expressed in seconds and whole units for readability; the
//! helpers here convert it into tick counts and fixed-point values.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::math::{Fixed, MAX_WHOLE};

/// Ticks per second used when no config overrides it.
pub const DEFAULT_TICK_RATE: u32 = 20;

/// City behaviour tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CityTuning {
    /// Health a city is left with right after being captured.
    pub captured_health: u32,
    /// Health regained per second while regeneration runs.
    pub regeneration_rate: u32,
    /// Seconds without damage before regeneration resumes.
    pub regeneration_delay_secs: u32,
    /// Magnitude of the knockback impulse.
    pub push_force: u32,
    /// Radius of the knockback scan.
    pub push_radius: u32,
    /// Seconds between knockback pulses.
    pub push_cooldown_secs: u32,
    /// Lowest allowed income level.
    pub min_income_level: u8,
    /// Highest allowed income level.
    pub max_income_level: u8,
    /// Lower bound of contact damage taken from enemy units.
    pub collision_damage_min: u32,
    /// Upper bound (exclusive) of contact damage taken from enemy units.
    pub collision_damage_max: u32,
}

impl Default for CityTuning {
    fn default() -> Self {
        Self {
            captured_health: 50,
            regeneration_rate: 10,
            regeneration_delay_secs: 2,
            push_force: 400,
            push_radius: 50,
            push_cooldown_secs: 2,
            min_income_level: 1,
            max_income_level: 8,
            collision_damage_min: 10,
            collision_damage_max: 20,
        }
    }
}

/// Top-level simulation configuration.
///
/// # Example RON
///
/// ```ron
/// SimConfig(
///     tick_rate: 30,
///     seed: 7,
///     city: CityTuning(push_force: 250),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Simulation ticks per second.
    pub tick_rate: u32,
    /// Seed for the world's random number generator.
    pub seed: u64,
    /// City tuning.
    pub city: CityTuning,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_rate: DEFAULT_TICK_RATE,
            seed: 0,
            city: CityTuning::default(),
        }
    }
}

impl SimConfig {
    /// Parse a config from RON text.
    pub fn from_ron_str(source: &str) -> Result<Self> {
        ron::from_str(source).map_err(|e| CoreError::DataParseError {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })
    }

    /// Load a config from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        ron::from_str(&contents).map_err(|e| CoreError::DataParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Check invariants the simulation relies on.
    ///
    /// `city_max_health` comes from the unit catalog; captured health must
    /// fit inside it so a freshly captured city is alive.
    pub fn validate(&self, city_max_health: u32) -> Result<()> {
        let city = &self.city;
        if self.tick_rate == 0 {
            return Err(CoreError::InvalidConfig("tick_rate must be positive".into()));
        }
        if city.captured_health == 0 || city.captured_health > city_max_health {
            return Err(CoreError::InvalidConfig(format!(
                "captured_health must be in 1..={city_max_health}, got {}",
                city.captured_health
            )));
        }
        if city.min_income_level == 0 || city.min_income_level > city.max_income_level {
            return Err(CoreError::InvalidConfig(format!(
                "income levels must satisfy 1 <= min <= max, got {}..={}",
                city.min_income_level, city.max_income_level
            )));
        }
        if city.collision_damage_min >= city.collision_damage_max {
            return Err(CoreError::InvalidConfig(
                "collision_damage_min must be below collision_damage_max".into(),
            ));
        }
        if city.push_cooldown_secs == 0 {
            return Err(CoreError::InvalidConfig(
                "push_cooldown_secs must be positive".into(),
            ));
        }
        for (name, value) in [
            ("tick_rate", self.tick_rate),
            ("captured_health", city.captured_health),
            ("regeneration_rate", city.regeneration_rate),
            ("push_force", city.push_force),
            ("push_radius", city.push_radius),
            ("collision_damage_max", city.collision_damage_max),
        ] {
            check_whole(name, value)?;
        }
        for (name, secs) in [
            ("regeneration_delay_secs", city.regeneration_delay_secs),
            ("push_cooldown_secs", city.push_cooldown_secs),
        ] {
            if secs.checked_mul(self.tick_rate).is_none() {
                return Err(CoreError::InvalidConfig(format!(
                    "{name} of {secs} overflows the tick counter at {} ticks per second",
                    self.tick_rate
                )));
            }
        }
        Ok(())
    }

    /// Elapsed simulated time per tick, in seconds.
    #[must_use]
    pub fn tick_duration(&self) -> Fixed {
        Fixed::ONE / Fixed::from_num(self.tick_rate)
    }

    /// Health regained by a regenerating city in one tick (rate × tick duration).
    #[must_use]
    pub fn regeneration_per_tick(&self) -> Fixed {
        // Divide once instead of multiplying by the rounded tick duration.
        Fixed::from_num(self.city.regeneration_rate) / Fixed::from_num(self.tick_rate)
    }

    /// Ticks a damaged city waits before regenerating.
    #[must_use]
    pub const fn regeneration_delay_ticks(&self) -> u32 {
        self.city.regeneration_delay_secs.saturating_mul(self.tick_rate)
    }

    /// Ticks between knockback pulses.
    #[must_use]
    pub const fn push_cooldown_ticks(&self) -> u32 {
        self.city.push_cooldown_secs.saturating_mul(self.tick_rate)
    }
}

/// Reject whole-number settings that do not fit the integer part of [`Fixed`].
pub(crate) fn check_whole(name: &str, value: u32) -> Result<()> {
    if value > MAX_WHOLE {
        return Err(CoreError::InvalidConfig(format!(
            "{name} must be at most {MAX_WHOLE}, got {value}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = SimConfig::default();
        assert!(config.validate(500).is_ok());
        assert_eq!(config.regeneration_delay_ticks(), 40);
        assert_eq!(config.push_cooldown_ticks(), 40);
    }

    #[test]
    fn test_regeneration_per_tick_scales_with_rate() {
        let config = SimConfig {
            tick_rate: 10,
            ..Default::default()
        };
        assert_eq!(config.regeneration_per_tick(), Fixed::ONE);
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let config = SimConfig::from_ron_str("(seed: 42, city: (push_force: 250))").unwrap();
        assert_eq!(config.seed, 42);
        assert_eq!(config.tick_rate, DEFAULT_TICK_RATE);
        assert_eq!(config.city.push_force, 250);
        assert_eq!(config.city.captured_health, 50);
    }

    #[test]
    fn test_captured_health_above_max_rejected() {
        let mut config = SimConfig::default();
        config.city.captured_health = 600;
        assert!(matches!(
            config.validate(500),
            Err(CoreError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_zero_tick_rate_rejected() {
        let config = SimConfig {
            tick_rate: 0,
            ..Default::default()
        };
        assert!(config.validate(500).is_err());
    }

    #[test]
    fn test_tick_products_that_overflow_are_rejected() {
        let mut config = SimConfig {
            tick_rate: 100_000,
            ..Default::default()
        };
        config.city.regeneration_delay_secs = 100_000;
        let err = config.validate(500).unwrap_err();
        assert!(err.to_string().contains("regeneration_delay_secs"));

        config.city.regeneration_delay_secs = 2;
        config.city.push_cooldown_secs = 50_000;
        assert!(config.validate(500).is_err());

        config.city.push_cooldown_secs = 2;
        assert!(config.validate(500).is_ok());
        assert_eq!(config.regeneration_delay_ticks(), 200_000);
    }

    #[test]
    fn test_values_beyond_fixed_range_are_rejected() {
        let mut config = SimConfig::default();
        config.city.push_radius = 3_000_000_000;
        let err = config.validate(500).unwrap_err();
        assert!(err.to_string().contains("push_radius"));

        let mut config = SimConfig::default();
        config.city.collision_damage_max = u32::MAX;
        assert!(config.validate(500).is_err());

        let mut config = SimConfig::default();
        config.city.regeneration_rate = MAX_WHOLE;
        assert!(config.validate(500).is_ok());
    }

    #[test]
    fn test_inverted_collision_range_rejected() {
        let mut config = SimConfig::default();
        config.city.collision_damage_min = 30;
        assert!(config.validate(500).is_err());
    }
}
