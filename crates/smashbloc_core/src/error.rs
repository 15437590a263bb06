//! Error types for the simulation core.

use thiserror::Error;

use crate::team::{PlayerId, TeamId};
use crate::unit::UnitId;

/// Result type alias using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;

/// Top-level error type for setup and loading operations.
///
/// Runtime operations driven by UI or physics timing (damage, collisions,
/// selection) never return these; a missing reference there is a no-op.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Team handle does not refer to a registered team.
    #[error("Unknown team: {0}")]
    UnknownTeam(TeamId),

    /// Player handle does not refer to a registered player.
    #[error("Unknown player: {0}")]
    UnknownPlayer(PlayerId),

    /// Unit handle does not refer to a live unit.
    #[error("Unknown unit: {0}")]
    UnknownUnit(UnitId),

    /// A team with the same name and color already exists.
    #[error("Team '{name}' with this color is already registered")]
    DuplicateTeam {
        /// Name of the conflicting team.
        name: String,
    },

    /// The team is deactivated and cannot receive new units.
    #[error("Team {0} is inactive")]
    TeamInactive(TeamId),

    /// Configuration values break a simulation invariant.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Reading a data file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
