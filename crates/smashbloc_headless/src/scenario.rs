//! Scenario loading and configuration.
//!
//! Scenarios describe the starting state of a match (teams, their cities
//! and mobile units) and a script of actions to replay against it.
//! Coordinates and damage are whole numbers; the runner converts them to
//! fixed-point when it builds the world.

use std::path::Path;

use serde::{Deserialize, Serialize};
use smashbloc_core::config::SimConfig;
use smashbloc_core::error::CoreError;
use smashbloc_core::unit_kind::UnitKind;
use thiserror::Error;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The core rejected the setup.
    #[error("Scenario setup failed: {0}")]
    Setup(#[from] CoreError),
    /// A scripted action names a team or unit the scenario never declares.
    #[error("Scripted action at tick {tick} references missing {what}")]
    BadReference {
        /// Tick of the offending action.
        tick: u64,
        /// Description of the missing reference.
        what: String,
    },
}

/// A complete scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Simulation tuning; omitted fields keep their defaults.
    #[serde(default)]
    pub config: SimConfig,
    /// Number of ticks to run.
    pub ticks: u64,
    /// Distance at which a mobile body counts as touching a city.
    /// Zero disables automatic contact damage.
    #[serde(default = "default_contact_radius")]
    pub contact_radius: u32,
    /// Teams in registration order. Every pair is at war.
    pub teams: Vec<TeamSetup>,
    /// Scripted actions, applied at the start of their tick.
    #[serde(default)]
    pub events: Vec<ScriptedEvent>,
}

fn default_contact_radius() -> u32 {
    30
}

/// Starting state of one team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamSetup {
    /// Team name.
    pub name: String,
    /// Uniform color as (r, g, b).
    pub color: (u8, u8, u8),
    /// Player names.
    #[serde(default)]
    pub players: Vec<String>,
    /// Cities owned at the start.
    #[serde(default)]
    pub cities: Vec<CityPlacement>,
    /// Mobile units owned at the start.
    #[serde(default)]
    pub units: Vec<UnitPlacement>,
}

/// A starting city.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityPlacement {
    /// X coordinate.
    pub x: i32,
    /// Y coordinate.
    pub y: i32,
    /// Income level override.
    #[serde(default)]
    pub income: Option<u8>,
}

impl CityPlacement {
    /// Create a city placement with the default income level.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y, income: None }
    }
}

/// A starting mobile unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitPlacement {
    /// Unit kind.
    pub kind: UnitKind,
    /// X coordinate of its physics body.
    pub x: i32,
    /// Y coordinate of its physics body.
    pub y: i32,
}

impl UnitPlacement {
    /// Create a unit placement.
    #[must_use]
    pub const fn new(kind: UnitKind, x: i32, y: i32) -> Self {
        Self { kind, x, y }
    }
}

/// Reference to a unit declared in the scenario, by team index and
/// position in that team's list.
///
/// Cities keep their reference after changing hands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitRef {
    /// `teams[team].cities[index]`.
    City(usize, usize),
    /// `teams[team].units[index]`.
    Mobile(usize, usize),
}

/// An action applied at a given tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptedEvent {
    /// Tick the action runs on (0 runs before the first tick).
    pub at_tick: u64,
    /// What to do.
    pub action: ScriptedAction,
}

/// Scriptable operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScriptedAction {
    /// Damage (or heal, if negative) a unit.
    Damage {
        /// Unit hit.
        target: UnitRef,
        /// Whole-number amount.
        amount: i32,
        /// Unit credited with the hit.
        #[serde(default)]
        source: Option<UnitRef>,
    },
    /// Report a physical contact with a city.
    Collide {
        /// City touched.
        city: UnitRef,
        /// Unit that touched it.
        other: Option<UnitRef>,
    },
    /// Order one unit to attack another.
    Attack {
        /// Attacking unit.
        attacker: UnitRef,
        /// Target unit.
        target: UnitRef,
    },
    /// Open a unit's menu.
    OpenMenu(UnitRef),
    /// Change a city's income level.
    SetIncome {
        /// City to change.
        city: UnitRef,
        /// Requested level, clamped by the core.
        level: u8,
    },
    /// Take a team out of the match.
    DeactivateTeam(usize),
    /// Tear the whole match down.
    ResetMatch,
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let scenario: Scenario = ron::from_str(&contents)?;
        Ok(scenario)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// Copy of this scenario with a different RNG seed.
    #[must_use]
    pub fn with_seed(&self, seed: u64) -> Self {
        let mut scenario = self.clone();
        scenario.config.seed = seed;
        scenario
    }

    /// A small two-team skirmish: each side holds two cities and sends
    /// raiders at the other's front city.
    #[must_use]
    pub fn skirmish() -> Self {
        Self {
            name: "Skirmish".to_string(),
            description: "Two teams trading a pair of border cities".to_string(),
            config: SimConfig::default(),
            ticks: 600,
            contact_radius: default_contact_radius(),
            teams: vec![
                TeamSetup {
                    name: "Red".to_string(),
                    color: (220, 40, 40),
                    players: vec!["Alice".to_string()],
                    cities: vec![CityPlacement::new(0, 0), CityPlacement::new(200, 0)],
                    units: vec![
                        UnitPlacement::new(UnitKind::Infantry, 420, 10),
                        UnitPlacement::new(UnitKind::Twirl, 380, -10),
                    ],
                },
                TeamSetup {
                    name: "Blue".to_string(),
                    color: (40, 80, 220),
                    players: vec!["Bob".to_string()],
                    cities: vec![CityPlacement::new(400, 0), CityPlacement::new(600, 0)],
                    units: vec![
                        UnitPlacement::new(UnitKind::Infantry, 210, 10),
                        UnitPlacement::new(UnitKind::Boomy, 190, -10),
                    ],
                },
            ],
            events: vec![ScriptedEvent {
                at_tick: 100,
                action: ScriptedAction::Damage {
                    target: UnitRef::City(0, 1),
                    amount: 300,
                    source: Some(UnitRef::Mobile(1, 1)),
                },
            }],
        }
    }
}

impl Default for Scenario {
    fn default() -> Self {
        Self::skirmish()
    }
}
