//! Units: the polymorphic entity every team owns.
//!
//! A [`Unit`] embeds its [`UnitStats`] and carries a [`UnitVariant`] for the
//! kind-specific state. Mobile combat units and cities share the same health
//! contract; they differ in what happens on death, which the
//! [`World`](crate::world::World) dispatches on the variant.

use serde::{Deserialize, Serialize};

use crate::catalog::{KindStats, UnitCatalog};
use crate::math::{Fixed, Vec2Fixed};
use crate::pool::Poolable;
use crate::stats::{HealthChange, UnitStats};
use crate::team::TeamId;
use crate::unit_kind::UnitKind;

/// Unique identifier for live units.
///
/// A pooled city receives a fresh id on every checkout, so ids held from a
/// previous tenancy never resolve to the recycled instance.
pub type UnitId = u64;

/// Whether a unit currently takes part in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Lifecycle {
    /// Constructed or pooled, not bound to a team.
    #[default]
    Inactive,
    /// Bound to a team and receiving damage and ticks.
    Active,
}

/// Where a unit is placed when activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Placement {
    /// Center of the unit.
    pub position: Vec2Fixed,
    /// Location where units produced by a city appear.
    pub spawn_anchor: Vec2Fixed,
}

impl Placement {
    /// Place at `position`, producing units at the same spot.
    #[must_use]
    pub const fn at(position: Vec2Fixed) -> Self {
        Self {
            position,
            spawn_anchor: position,
        }
    }

    /// Override the spawn anchor.
    #[must_use]
    pub const fn with_spawn_anchor(mut self, anchor: Vec2Fixed) -> Self {
        self.spawn_anchor = anchor;
        self
    }
}

/// State specific to mobile combat units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MobileState {
    attack_target: Option<UnitId>,
}

impl MobileState {
    /// Unit most recently attacked.
    #[must_use]
    pub const fn attack_target(&self) -> Option<UnitId> {
        self.attack_target
    }

    pub(crate) fn set_attack_target(&mut self, target: Option<UnitId>) {
        self.attack_target = target;
    }
}

/// State specific to capturable cities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityState {
    income_level: u8,
    regeneration_suppressed: bool,
    damage_pending: bool,
    position: Vec2Fixed,
    spawn_anchor: Vec2Fixed,
}

impl CityState {
    /// Fresh city state with the given starting income.
    ///
    /// Regeneration starts suppressed, so a newly placed city waits one
    /// full delay before healing.
    #[must_use]
    pub const fn new(income_level: u8) -> Self {
        Self {
            income_level,
            regeneration_suppressed: true,
            damage_pending: true,
            position: Vec2Fixed::ZERO,
            spawn_anchor: Vec2Fixed::ZERO,
        }
    }

    /// Current income level.
    #[must_use]
    pub const fn income_level(&self) -> u8 {
        self.income_level
    }

    /// Whether recent damage is holding regeneration back.
    ///
    /// Stays set for the whole delay and clears on the tick healing resumes.
    #[must_use]
    pub const fn regeneration_suppressed(&self) -> bool {
        self.regeneration_suppressed
    }

    /// City center.
    #[must_use]
    pub const fn position(&self) -> Vec2Fixed {
        self.position
    }

    /// Where produced units appear.
    #[must_use]
    pub const fn spawn_anchor(&self) -> Vec2Fixed {
        self.spawn_anchor
    }

    pub(crate) fn set_income_level(&mut self, level: u8, min: u8, max: u8) -> u8 {
        self.income_level = level.clamp(min, max);
        self.income_level
    }

    /// Damage not yet seen by the regeneration task.
    pub(crate) const fn damage_pending(&self) -> bool {
        self.damage_pending
    }

    pub(crate) fn suppress_regeneration(&mut self) {
        self.regeneration_suppressed = true;
        self.damage_pending = true;
    }

    /// Read and clear the pending-damage marker. Suppression stays set.
    pub(crate) fn take_pending_damage(&mut self) -> bool {
        std::mem::replace(&mut self.damage_pending, false)
    }

    pub(crate) fn resume_regeneration(&mut self) {
        self.regeneration_suppressed = false;
    }

    pub(crate) fn place(&mut self, placement: Placement) {
        self.position = placement.position;
        self.spawn_anchor = placement.spawn_anchor;
    }
}

/// Kind-specific unit state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitVariant {
    /// Attacks other units; destroyed on death.
    Mobile(MobileState),
    /// Captured instead of destroyed; regenerates and pushes.
    City(CityState),
}

/// What a damage request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Target missing, inactive, or request filtered out.
    Ignored,
    /// Health changed and the unit is still standing.
    Applied(HealthChange),
    /// Health reached zero and the death handler ran.
    Lethal(HealthChange),
}

impl DamageOutcome {
    /// True if the request triggered a death (or capture).
    #[must_use]
    pub const fn is_lethal(&self) -> bool {
        matches!(self, Self::Lethal(_))
    }

    /// Health change, if any was applied.
    #[must_use]
    pub const fn change(&self) -> Option<HealthChange> {
        match self {
            Self::Ignored => None,
            Self::Applied(change) | Self::Lethal(change) => Some(*change),
        }
    }
}

/// A simulated unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    id: UnitId,
    kind: UnitKind,
    stats: UnitStats,
    lifecycle: Lifecycle,
    selected: bool,
    display_name: Option<String>,
    variant: UnitVariant,
}

impl Unit {
    /// Construct an inactive unit from kind defaults.
    #[must_use]
    pub fn new(kind: UnitKind, defaults: &KindStats) -> Self {
        let variant = if kind.is_capturable() {
            UnitVariant::City(CityState::new(defaults.income_level.unwrap_or(1)))
        } else {
            UnitVariant::Mobile(MobileState::default())
        };

        Self {
            id: 0,
            kind,
            stats: UnitStats::from_defaults(defaults),
            lifecycle: Lifecycle::Inactive,
            selected: false,
            display_name: None,
            variant,
        }
    }

    /// Unit id (0 while pooled).
    #[must_use]
    pub const fn id(&self) -> UnitId {
        self.id
    }

    /// Kind of this unit.
    #[must_use]
    pub const fn kind(&self) -> UnitKind {
        self.kind
    }

    /// Stable kind tag, independent of the display name.
    #[must_use]
    pub const fn identity(&self) -> &'static str {
        self.kind.identity()
    }

    /// Spawn price.
    #[must_use]
    pub const fn cost(&self) -> u32 {
        self.stats.cost()
    }

    /// Name shown in menus; defaults to the identity tag.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(self.kind.identity())
    }

    /// Statistics and runtime health.
    #[must_use]
    pub const fn stats(&self) -> &UnitStats {
        &self.stats
    }

    /// Owning team.
    #[must_use]
    pub const fn team(&self) -> Option<TeamId> {
        self.stats.team()
    }

    /// Current health.
    #[must_use]
    pub const fn health(&self) -> Fixed {
        self.stats.health()
    }

    /// Maximum health.
    #[must_use]
    pub const fn max_health(&self) -> Fixed {
        self.stats.max_health()
    }

    /// Lifecycle state.
    #[must_use]
    pub const fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Whether the unit is active.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Active)
    }

    /// Whether the unit is highlighted.
    #[must_use]
    pub const fn is_selected(&self) -> bool {
        self.selected
    }

    /// Kind-specific state.
    #[must_use]
    pub const fn variant(&self) -> &UnitVariant {
        &self.variant
    }

    /// City state, if this unit is a city.
    #[must_use]
    pub const fn as_city(&self) -> Option<&CityState> {
        match &self.variant {
            UnitVariant::City(city) => Some(city),
            UnitVariant::Mobile(_) => None,
        }
    }

    /// Mobile state, if this unit is a mobile combat unit.
    #[must_use]
    pub const fn as_mobile(&self) -> Option<&MobileState> {
        match &self.variant {
            UnitVariant::Mobile(mobile) => Some(mobile),
            UnitVariant::City(_) => None,
        }
    }

    /// Income level, for cities.
    #[must_use]
    pub fn income_level(&self) -> Option<u8> {
        self.as_city().map(CityState::income_level)
    }

    /// Highlight the unit. Idempotent.
    pub fn select(&mut self) {
        self.selected = true;
    }

    /// Remove the highlight. Idempotent.
    pub fn deselect(&mut self) {
        self.selected = false;
    }

    /// Assign a custom display name; an empty name restores the default.
    pub fn rename(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.display_name = if name.trim().is_empty() {
            None
        } else {
            Some(name)
        };
    }

    pub(crate) fn city_mut(&mut self) -> Option<&mut CityState> {
        match &mut self.variant {
            UnitVariant::City(city) => Some(city),
            UnitVariant::Mobile(_) => None,
        }
    }

    pub(crate) fn mobile_mut(&mut self) -> Option<&mut MobileState> {
        match &mut self.variant {
            UnitVariant::Mobile(mobile) => Some(mobile),
            UnitVariant::City(_) => None,
        }
    }

    pub(crate) fn set_id(&mut self, id: UnitId) {
        self.id = id;
    }

    pub(crate) fn set_team(&mut self, team: Option<TeamId>) {
        self.stats.set_team(team);
    }

    pub(crate) fn set_lifecycle(&mut self, lifecycle: Lifecycle) {
        self.lifecycle = lifecycle;
    }

    /// Damage path used by combat, collisions and capture.
    ///
    /// Positive amounts on a city flag regeneration as suppressed before the
    /// health update, so any hit interrupts healing immediately. Heals do not.
    pub(crate) fn take_damage(&mut self, amount: Fixed) -> HealthChange {
        if amount > Fixed::ZERO {
            if let Some(city) = self.city_mut() {
                city.suppress_regeneration();
            }
        }
        self.stats.apply_damage(amount)
    }

    /// Healing path used by regeneration; leaves suppression untouched.
    pub(crate) fn regenerate(&mut self, amount: Fixed) -> HealthChange {
        self.stats.apply_damage(-amount)
    }
}

impl Poolable for Unit {
    type Kind = UnitKind;
    type Defaults = UnitCatalog;

    fn create(kind: UnitKind, defaults: &UnitCatalog) -> Self {
        Self::new(kind, defaults.get(kind))
    }

    fn kind(&self) -> UnitKind {
        self.kind
    }

    fn reset(&mut self, defaults: &UnitCatalog) {
        let kind_defaults = defaults.get(self.kind);
        self.id = 0;
        self.stats = UnitStats::from_defaults(kind_defaults);
        self.lifecycle = Lifecycle::Inactive;
        self.selected = false;
        self.display_name = None;
        match &mut self.variant {
            UnitVariant::City(city) => *city = CityState::new(kind_defaults.income_level.unwrap_or(1)),
            UnitVariant::Mobile(mobile) => *mobile = MobileState::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn city() -> Unit {
        Unit::create(UnitKind::City, &UnitCatalog::default())
    }

    #[test]
    fn test_new_city_defaults() {
        let unit = city();
        assert_eq!(unit.identity(), "CITY");
        assert_eq!(unit.cost(), 500);
        assert_eq!(unit.income_level(), Some(8));
        assert!(!unit.is_active());
        assert!(unit.as_city().unwrap().regeneration_suppressed());
        assert!(unit.as_mobile().is_none());
    }

    fn settled_city() -> Unit {
        let mut unit = city();
        let state = unit.city_mut().unwrap();
        state.take_pending_damage();
        state.resume_regeneration();
        unit
    }

    #[test]
    fn test_city_damage_suppresses_regeneration() {
        let mut unit = settled_city();
        unit.take_damage(Fixed::from_num(5));
        let state = unit.as_city().unwrap();
        assert!(state.regeneration_suppressed());
        assert!(state.damage_pending());
    }

    #[test]
    fn test_pending_damage_is_taken_once() {
        let mut unit = settled_city();
        unit.take_damage(Fixed::from_num(5));
        let state = unit.city_mut().unwrap();
        assert!(state.take_pending_damage());
        assert!(!state.take_pending_damage());
        assert!(state.regeneration_suppressed());
    }

    #[test]
    fn test_healing_damage_does_not_suppress() {
        let mut unit = settled_city();
        unit.take_damage(Fixed::from_num(100));
        unit.city_mut().unwrap().take_pending_damage();
        unit.city_mut().unwrap().resume_regeneration();

        let change = unit.take_damage(Fixed::from_num(-10));
        assert_eq!(change.delta(), Fixed::from_num(10));
        unit.take_damage(Fixed::ZERO);

        let state = unit.as_city().unwrap();
        assert!(!state.regeneration_suppressed());
        assert!(!state.damage_pending());
    }

    #[test]
    fn test_regenerate_does_not_suppress() {
        let mut unit = settled_city();
        unit.take_damage(Fixed::from_num(100));
        unit.city_mut().unwrap().take_pending_damage();
        unit.city_mut().unwrap().resume_regeneration();
        let change = unit.regenerate(Fixed::from_num(10));
        assert_eq!(change.delta(), Fixed::from_num(10));
        assert!(!unit.as_city().unwrap().regeneration_suppressed());
    }

    #[test]
    fn test_select_is_idempotent() {
        let mut unit = city();
        unit.select();
        unit.select();
        assert!(unit.is_selected());
        unit.deselect();
        unit.deselect();
        assert!(!unit.is_selected());
    }

    #[test]
    fn test_rename_keeps_identity() {
        let mut unit = city();
        assert_eq!(unit.display_name(), "CITY");
        unit.rename("Dylanto");
        assert_eq!(unit.display_name(), "Dylanto");
        assert_eq!(unit.identity(), "CITY");
        unit.rename("  ");
        assert_eq!(unit.display_name(), "CITY");
    }

    #[test]
    fn test_income_level_is_clamped() {
        let mut unit = city();
        let city = unit.city_mut().unwrap();
        assert_eq!(city.set_income_level(0, 1, 8), 1);
        assert_eq!(city.set_income_level(12, 1, 8), 8);
        assert_eq!(city.set_income_level(3, 1, 8), 3);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let catalog = UnitCatalog::default();
        let mut unit = city();
        unit.set_id(42);
        unit.set_team(Some(TeamId(1)));
        unit.set_lifecycle(Lifecycle::Active);
        unit.take_damage(Fixed::from_num(300));
        unit.rename("Dylanto");
        unit.select();
        unit.city_mut().unwrap().set_income_level(2, 1, 8);

        unit.reset(&catalog);

        assert_eq!(unit, Unit::create(UnitKind::City, &catalog));
    }

    #[test]
    fn test_damage_outcome_accessors() {
        let change = HealthChange {
            previous: Fixed::from_num(10),
            current: Fixed::ZERO,
        };
        assert!(DamageOutcome::Lethal(change).is_lethal());
        assert_eq!(DamageOutcome::Applied(change).change(), Some(change));
        assert_eq!(DamageOutcome::Ignored.change(), None);
    }
}
