//! Teams, players and rosters.
//!
//! A [`Team`] owns ordered collections of players, mobile units and
//! capturable assets. Only the [`World`](crate::world::World) mutates the
//! unit collections, which keeps them in step with each unit's own `team`
//! field.
//!
//! Two teams are the same team when their name and color match, regardless
//! of which handle they were registered under. [`Team::key`] is the single
//! source of that identity and is what hashing and lookup go through.

use serde::{Deserialize, Serialize};

use crate::unit::UnitId;

/// Handle for a registered team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TeamId(pub u16);

impl std::fmt::Display for TeamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "team#{}", self.0)
    }
}

/// Handle for a registered player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u16);

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "player#{}", self.0)
    }
}

/// Team "uniform" color, 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Color {
    /// Create an opaque color.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Opaque red.
    pub const RED: Self = Self::rgb(220, 40, 40);
    /// Opaque blue.
    pub const BLUE: Self = Self::rgb(40, 80, 220);
    /// Opaque green.
    pub const GREEN: Self = Self::rgb(40, 180, 60);
}

/// Value identity of a team: name plus color.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeamKey {
    /// Team name.
    pub name: String,
    /// Team color.
    pub color: Color,
}

impl TeamKey {
    /// Build a key from its parts.
    #[must_use]
    pub fn new(name: impl Into<String>, color: Color) -> Self {
        Self {
            name: name.into(),
            color,
        }
    }
}

/// A faction taking part in a match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    id: TeamId,
    name: String,
    color: Color,
    members: Vec<PlayerId>,
    mobile_units: Vec<UnitId>,
    capturable_assets: Vec<UnitId>,
    enemy_teams: Vec<TeamId>,
    active: bool,
}

impl Team {
    /// Create an active team with empty rosters.
    #[must_use]
    pub fn new(id: TeamId, name: impl Into<String>, color: Color) -> Self {
        Self {
            id,
            name: name.into(),
            color,
            members: Vec::new(),
            mobile_units: Vec::new(),
            capturable_assets: Vec::new(),
            enemy_teams: Vec::new(),
            active: true,
        }
    }

    /// Handle this team was registered under.
    #[must_use]
    pub const fn id(&self) -> TeamId {
        self.id
    }

    /// Team name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Team color.
    #[must_use]
    pub const fn color(&self) -> Color {
        self.color
    }

    /// Identity key used for equality and hashing.
    #[must_use]
    pub fn key(&self) -> TeamKey {
        TeamKey::new(self.name.clone(), self.color)
    }

    /// Value equality: same name and same color.
    #[must_use]
    pub fn is_same_team(&self, other: &Self) -> bool {
        self.name == other.name && self.color == other.color
    }

    /// Check whether this team matches a key.
    #[must_use]
    pub fn matches(&self, key: &TeamKey) -> bool {
        self.name == key.name && self.color == key.color
    }

    /// Players in join order.
    #[must_use]
    pub fn members(&self) -> &[PlayerId] {
        &self.members
    }

    /// Owned mobile units in spawn order.
    #[must_use]
    pub fn mobile_units(&self) -> &[UnitId] {
        &self.mobile_units
    }

    /// Owned cities in acquisition order.
    #[must_use]
    pub fn capturable_assets(&self) -> &[UnitId] {
        &self.capturable_assets
    }

    /// Teams this team is at war with.
    #[must_use]
    pub fn enemy_teams(&self) -> &[TeamId] {
        &self.enemy_teams
    }

    /// Check whether `other` is listed as an enemy.
    #[must_use]
    pub fn is_enemy_of(&self, other: TeamId) -> bool {
        self.enemy_teams.contains(&other)
    }

    /// Whether the team is currently taking part in the match.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Check whether a unit is in either ownership collection.
    #[must_use]
    pub fn owns(&self, unit: UnitId) -> bool {
        self.mobile_units.contains(&unit) || self.capturable_assets.contains(&unit)
    }

    /// Append a player; joining twice is ignored.
    pub fn add_member(&mut self, player: PlayerId) {
        if !self.members.contains(&player) {
            self.members.push(player);
        }
    }

    /// Record `other` as an enemy; repeated calls are ignored.
    pub fn add_enemy(&mut self, other: TeamId) {
        if other != self.id && !self.enemy_teams.contains(&other) {
            self.enemy_teams.push(other);
        }
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub(crate) fn insert_mobile(&mut self, unit: UnitId) {
        if !self.mobile_units.contains(&unit) {
            self.mobile_units.push(unit);
        }
    }

    pub(crate) fn insert_asset(&mut self, unit: UnitId) {
        if !self.capturable_assets.contains(&unit) {
            self.capturable_assets.push(unit);
        }
    }

    /// Remove a unit from whichever collection holds it.
    pub(crate) fn remove_unit(&mut self, unit: UnitId) -> bool {
        let before = self.mobile_units.len() + self.capturable_assets.len();
        self.mobile_units.retain(|&id| id != unit);
        self.capturable_assets.retain(|&id| id != unit);
        before != self.mobile_units.len() + self.capturable_assets.len()
    }
}

/// A human or AI participant belonging to one team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    id: PlayerId,
    name: String,
    team: TeamId,
    active: bool,
}

impl Player {
    /// Create an active player on `team`.
    #[must_use]
    pub fn new(id: PlayerId, name: impl Into<String>, team: TeamId) -> Self {
        Self {
            id,
            name: name.into(),
            team,
            active: true,
        }
    }

    /// Player handle.
    #[must_use]
    pub const fn id(&self) -> PlayerId {
        self.id
    }

    /// Player name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Team the player belongs to.
    #[must_use]
    pub const fn team(&self) -> TeamId {
        self.team
    }

    /// Whether the player is currently playing.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Turn the player on.
    pub fn activate(&mut self) {
        self.active = true;
    }

    /// Turn the player off.
    pub fn deactivate(&mut self) {
        self.active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_equality_ignores_handle() {
        let a = Team::new(TeamId(0), "Red", Color::RED);
        let b = Team::new(TeamId(7), "Red", Color::RED);
        assert!(a.is_same_team(&b));
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn test_different_color_is_different_team() {
        let a = Team::new(TeamId(0), "Red", Color::RED);
        let b = Team::new(TeamId(1), "Red", Color::BLUE);
        assert!(!a.is_same_team(&b));
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn test_key_hash_consistent_with_equality() {
        let mut keys = HashSet::new();
        keys.insert(Team::new(TeamId(0), "Red", Color::RED).key());
        assert!(keys.contains(&Team::new(TeamId(3), "Red", Color::RED).key()));
        assert!(Team::new(TeamId(3), "Red", Color::RED).matches(&TeamKey::new("Red", Color::RED)));
    }

    #[test]
    fn test_members_keep_join_order() {
        let mut team = Team::new(TeamId(0), "Red", Color::RED);
        team.add_member(PlayerId(3));
        team.add_member(PlayerId(1));
        team.add_member(PlayerId(3));
        assert_eq!(team.members(), &[PlayerId(3), PlayerId(1)]);
    }

    #[test]
    fn test_enemy_relation_skips_self_and_duplicates() {
        let mut team = Team::new(TeamId(0), "Red", Color::RED);
        team.add_enemy(TeamId(0));
        team.add_enemy(TeamId(1));
        team.add_enemy(TeamId(1));
        assert_eq!(team.enemy_teams(), &[TeamId(1)]);
        assert!(team.is_enemy_of(TeamId(1)));
        assert!(!team.is_enemy_of(TeamId(0)));
    }

    #[test]
    fn test_remove_unit_reports_membership() {
        let mut team = Team::new(TeamId(0), "Red", Color::RED);
        team.insert_mobile(4);
        team.insert_asset(9);
        assert!(team.owns(4) && team.owns(9));
        assert!(team.remove_unit(9));
        assert!(!team.remove_unit(9));
        assert_eq!(team.mobile_units(), &[4]);
        assert!(team.capturable_assets().is_empty());
    }

    #[test]
    fn test_player_toggles() {
        let mut player = Player::new(PlayerId(0), "Ada", TeamId(0));
        assert!(player.is_active());
        player.deactivate();
        assert!(!player.is_active());
        player.activate();
        assert!(player.is_active());
    }
}
