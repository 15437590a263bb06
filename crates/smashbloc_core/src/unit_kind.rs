//! Unit identity and capability classification.
//!
//! Every unit is one of a closed set of [`UnitKind`]s. Behaviour differences
//! are expressed through [`Capabilities`] instead of a class hierarchy:
//!
//! - **COMBAT**: can attack other units, destroyed on death
//! - **CAPTURABLE**: changes owner instead of dying
//! - **ECONOMY**: contributes income to its owning team

use serde::{Deserialize, Serialize};

/// The closed set of unit kinds known to the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitKind {
    /// Standard hovering infantry.
    Infantry,
    /// Fast, lightly armored skirmisher.
    Twirl,
    /// Slow, heavily armored explosive unit.
    Boomy,
    /// Capturable city producing income and spawning units.
    City,
}

impl UnitKind {
    /// All kinds, in declaration order.
    pub const ALL: [Self; 4] = [Self::Infantry, Self::Twirl, Self::Boomy, Self::City];

    /// Stable identity tag used for spawning and UI disambiguation.
    ///
    /// Independent of any display name a player assigns.
    #[must_use]
    pub const fn identity(self) -> &'static str {
        match self {
            Self::Infantry => "INFANTRY",
            Self::Twirl => "TWIRL",
            Self::Boomy => "BOOMY",
            Self::City => "CITY",
        }
    }

    /// Look a kind up by its identity tag.
    #[must_use]
    pub fn from_identity(identity: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.identity() == identity)
    }

    /// Capability set for this kind.
    #[must_use]
    pub const fn capabilities(self) -> Capabilities {
        match self {
            Self::Infantry | Self::Twirl | Self::Boomy => Capabilities::COMBAT,
            Self::City => Capabilities::CAPTURABLE.union(Capabilities::ECONOMY),
        }
    }

    /// Check if this kind is a capturable asset.
    #[must_use]
    pub const fn is_capturable(self) -> bool {
        self.capabilities().contains(Capabilities::CAPTURABLE)
    }

    /// Check if this kind is a mobile combat unit.
    #[must_use]
    pub const fn is_mobile(self) -> bool {
        self.capabilities().contains(Capabilities::COMBAT)
    }
}

impl std::fmt::Display for UnitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.identity())
    }
}

/// Bitflags for capability queries.
///
/// # Example
///
/// ```
/// use smashbloc_core::unit_kind::{Capabilities, UnitKind};
///
/// let caps = UnitKind::City.capabilities();
/// assert!(caps.contains(Capabilities::CAPTURABLE));
/// assert!(!caps.contains(Capabilities::COMBAT));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Capabilities(u8);

impl Capabilities {
    /// Can attack other units; removed from play on death.
    pub const COMBAT: Self = Self(1 << 0);
    /// Ownership transfers to the attacker on death.
    pub const CAPTURABLE: Self = Self(1 << 1);
    /// Produces passive income for the owning team.
    pub const ECONOMY: Self = Self(1 << 2);

    /// Empty capability set.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Combine two capability sets.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Check if all flags in `other` are set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Check if any flag in `other` is set.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }
}
