//! Per-instance unit statistics.
//!
//! [`UnitStats`] holds the descriptor values a unit is spawned with plus the
//! runtime state that changes during play (current health, owning team).
//! Health is only ever changed through [`UnitStats::apply_damage`], which
//! keeps it inside `[0, max_health]`.

use serde::{Deserialize, Serialize};

use crate::catalog::KindStats;
use crate::math::{fixed_serde, Fixed};
use crate::team::TeamId;

/// Armor classification for units and cities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ArmorType {
    /// Heavy armor (cities, siege units).
    Heavy,
    /// Medium armor (standard infantry).
    #[default]
    Medium,
    /// Light armor (fast skirmishers).
    Light,
}

/// Damage classification for attacks.
///
/// No effectiveness table exists between damage and armor types; damage is
/// applied one to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DamageType {
    /// Explosive damage (shells, grenades).
    Explosive,
    /// Bullet damage (small arms).
    #[default]
    Bullet,
}

/// Result of one health mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthChange {
    /// Health before the mutation.
    pub previous: Fixed,
    /// Health after the mutation (already clamped).
    pub current: Fixed,
}

impl HealthChange {
    /// True when this mutation took a living unit to zero health.
    #[must_use]
    pub fn is_lethal(&self) -> bool {
        self.previous > Fixed::ZERO && self.current <= Fixed::ZERO
    }

    /// Signed health difference (`current - previous`).
    #[must_use]
    pub fn delta(&self) -> Fixed {
        self.current - self.previous
    }
}

/// Statistics and runtime state of a single unit instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStats {
    team: Option<TeamId>,
    armor_type: ArmorType,
    damage_type: DamageType,
    #[serde(with = "fixed_serde")]
    max_health: Fixed,
    #[serde(with = "fixed_serde")]
    health: Fixed,
    #[serde(with = "fixed_serde")]
    damage: Fixed,
    #[serde(with = "fixed_serde")]
    range: Fixed,
    cost: u32,
}

impl UnitStats {
    /// Build stats from a kind's catalog defaults, with no owning team.
    ///
    /// Health starts at the kind's initial health, clamped to max health.
    /// Values past the range of [`Fixed`] saturate.
    #[must_use]
    pub fn from_defaults(defaults: &KindStats) -> Self {
        let max_health = Fixed::saturating_from_num(defaults.max_health);
        let initial = defaults
            .initial_health
            .map_or(max_health, Fixed::saturating_from_num)
            .clamp(Fixed::ZERO, max_health);

        Self {
            team: None,
            armor_type: defaults.armor_type,
            damage_type: defaults.damage_type,
            max_health,
            health: initial,
            damage: Fixed::saturating_from_num(defaults.damage),
            range: Fixed::saturating_from_num(defaults.range),
            cost: defaults.cost,
        }
    }

    /// Apply `amount` of damage; negative amounts heal.
    ///
    /// The resulting health is clamped to `[0, max_health]` in the same step,
    /// so no caller ever observes an out-of-range value.
    pub fn apply_damage(&mut self, amount: Fixed) -> HealthChange {
        let previous = self.health;
        self.health = previous
            .saturating_sub(amount)
            .clamp(Fixed::ZERO, self.max_health);

        debug_assert!(self.health >= Fixed::ZERO && self.health <= self.max_health);

        HealthChange {
            previous,
            current: self.health,
        }
    }

    /// Team that currently owns the unit.
    #[must_use]
    pub const fn team(&self) -> Option<TeamId> {
        self.team
    }

    pub(crate) fn set_team(&mut self, team: Option<TeamId>) {
        self.team = team;
    }

    /// Armor classification.
    #[must_use]
    pub const fn armor_type(&self) -> ArmorType {
        self.armor_type
    }

    /// Damage classification.
    #[must_use]
    pub const fn damage_type(&self) -> DamageType {
        self.damage_type
    }

    /// Maximum health.
    #[must_use]
    pub const fn max_health(&self) -> Fixed {
        self.max_health
    }

    /// Current health.
    #[must_use]
    pub const fn health(&self) -> Fixed {
        self.health
    }

    /// Damage dealt per attack.
    #[must_use]
    pub const fn damage(&self) -> Fixed {
        self.damage
    }

    /// Attack range in world units.
    #[must_use]
    pub const fn range(&self) -> Fixed {
        self.range
    }

    /// Spawn price in the abstract resource currency.
    #[must_use]
    pub const fn cost(&self) -> u32 {
        self.cost
    }

    /// Check if the unit still has health left.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.health > Fixed::ZERO
    }

    /// Get health as a percentage (0-100).
    #[must_use]
    pub fn percentage(&self) -> u32 {
        if self.max_health == Fixed::ZERO {
            0
        } else {
            let hundred = Fixed::from_num(100);
            let percent = match self.health.checked_mul(hundred) {
                Some(scaled) => scaled / self.max_health,
                None => self.health / self.max_health * hundred,
            };
            percent.to_num::<u32>()
        }
    }
}
