//! Data-driven default statistics for each unit kind.
//!
//! A [`UnitCatalog`] can be built from the built-in defaults or loaded from a
//! RON file. Kinds missing from the file keep their built-in values.
//!
//! # Example RON
//!
//! ```ron
//! UnitCatalog(
//!     infantry: KindStats(
//!         max_health: 100,
//!         damage: 10,
//!         range: 25,
//!         cost: 100,
//!         armor_type: Medium,
//!         damage_type: Bullet,
//!     ),
//! )
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::check_whole;
use crate::error::{CoreError, Result};
use crate::stats::{ArmorType, DamageType};
use crate::unit_kind::UnitKind;

/// Default statistics for one unit kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindStats {
    /// Maximum health points.
    pub max_health: u32,

    /// Health on activation; `None` means full health.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_health: Option<u32>,

    /// Damage per attack.
    #[serde(default)]
    pub damage: u32,

    /// Attack range in world units.
    #[serde(default)]
    pub range: u32,

    /// Spawn price.
    pub cost: u32,

    /// Armor classification.
    #[serde(default)]
    pub armor_type: ArmorType,

    /// Damage classification.
    #[serde(default)]
    pub damage_type: DamageType,

    /// Starting income level (cities only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub income_level: Option<u8>,
}

/// Per-kind defaults used at spawn and pool-reset time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitCatalog {
    /// Infantry defaults.
    pub infantry: KindStats,
    /// Twirl defaults.
    pub twirl: KindStats,
    /// Boomy defaults.
    pub boomy: KindStats,
    /// City defaults.
    pub city: KindStats,
}

impl Default for UnitCatalog {
    fn default() -> Self {
        Self {
            infantry: KindStats {
                max_health: 100,
                initial_health: None,
                damage: 10,
                range: 25,
                cost: 100,
                armor_type: ArmorType::Medium,
                damage_type: DamageType::Bullet,
                income_level: None,
            },
            twirl: KindStats {
                max_health: 60,
                initial_health: None,
                damage: 8,
                range: 20,
                cost: 75,
                armor_type: ArmorType::Light,
                damage_type: DamageType::Bullet,
                income_level: None,
            },
            boomy: KindStats {
                max_health: 150,
                initial_health: None,
                damage: 30,
                range: 40,
                cost: 200,
                armor_type: ArmorType::Heavy,
                damage_type: DamageType::Explosive,
                income_level: None,
            },
            city: KindStats {
                max_health: 500,
                initial_health: None,
                damage: 0,
                range: 0,
                cost: 500,
                armor_type: ArmorType::Heavy,
                damage_type: DamageType::Bullet,
                income_level: Some(8),
            },
        }
    }
}

impl UnitCatalog {
    /// Get the defaults for a kind.
    #[must_use]
    pub const fn get(&self, kind: UnitKind) -> &KindStats {
        match kind {
            UnitKind::Infantry => &self.infantry,
            UnitKind::Twirl => &self.twirl,
            UnitKind::Boomy => &self.boomy,
            UnitKind::City => &self.city,
        }
    }

    /// Parse a catalog from RON text.
    pub fn from_ron_str(source: &str) -> Result<Self> {
        ron::from_str(source).map_err(|e| CoreError::DataParseError {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })
    }

    /// Load a catalog from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        ron::from_str(&contents).map_err(|e| CoreError::DataParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Check every kind for values the simulation cannot run with.
    pub fn validate(&self) -> Result<()> {
        for kind in UnitKind::ALL {
            let stats = self.get(kind);
            if stats.max_health == 0 {
                return Err(CoreError::InvalidConfig(format!(
                    "{kind} must have positive max_health"
                )));
            }
            for (field, value) in [
                ("max_health", Some(stats.max_health)),
                ("initial_health", stats.initial_health),
                ("damage", Some(stats.damage)),
                ("range", Some(stats.range)),
            ] {
                if let Some(value) = value {
                    check_whole(&format!("{kind} {field}"), value)?;
                }
            }
            if kind.is_capturable() && stats.income_level.is_none() {
                return Err(CoreError::InvalidConfig(format!(
                    "{kind} is capturable but has no income_level"
                )));
            }
        }
        Ok(())
    }
}
