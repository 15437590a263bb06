//! The simulation world.
//!
//! [`World`] owns every unit, team, player, the city pool, the periodic task
//! scheduler and the notification bus, and is the only place any of them is
//! mutated. Keeping all mutation here is what lets ownership stay
//! bidirectionally consistent: a unit's `team` field and its team's
//! collections are always updated in the same call.
//!
//! # Operation classes
//!
//! Setup operations (teams, players, spawning) return [`Result`] and fail on
//! unknown handles. Runtime operations that arrive from UI or physics timing
//! (damage, collisions, selection, menus) treat missing or inactive targets
//! as no-ops and report what happened through their return value.
//!
//! # Tick order
//!
//! [`World::tick`] advances periodic tasks in the order they were started.
//! Damage and capture triggered between ticks complete inside the call that
//! caused them, so a tick never observes a half-applied capture.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace, warn};

use crate::catalog::UnitCatalog;
use crate::config::SimConfig;
use crate::error::{CoreError, Result};
use crate::math::Fixed;
use crate::notify::{GameEvent, NotificationBus, Observer, Publisher, SubscriptionId};
use crate::physics::{ImpulseRequest, PhysicsBackend};
use crate::pool::EntityPool;
use crate::scheduler::{Scheduler, TaskState};
use crate::stats::HealthChange;
use crate::team::{Color, Player, PlayerId, Team, TeamId, TeamKey};
use crate::unit::{CityState, DamageOutcome, Lifecycle, Placement, Unit, UnitId, UnitVariant};
use crate::unit_kind::{Capabilities, UnitKind};

/// Storage for live units, keyed by id.
#[derive(Debug, Clone)]
pub struct UnitStorage {
    units: HashMap<UnitId, Unit>,
    next_id: UnitId,
}

impl Default for UnitStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitStorage {
    /// Create empty storage. Ids start at 1; 0 marks a pooled instance.
    #[must_use]
    pub fn new() -> Self {
        Self {
            units: HashMap::new(),
            next_id: 1,
        }
    }

    /// Insert a unit under a fresh id and return the id.
    pub fn insert(&mut self, mut unit: Unit) -> UnitId {
        let id = self.next_id;
        self.next_id += 1;
        unit.set_id(id);
        self.units.insert(id, unit);
        id
    }

    /// Remove a unit by id.
    pub fn remove(&mut self, id: UnitId) -> Option<Unit> {
        self.units.remove(&id)
    }

    /// Get a unit by id.
    #[must_use]
    pub fn get(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    /// Get a mutable reference to a unit by id.
    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    /// Check if a unit exists.
    #[must_use]
    pub fn contains(&self, id: UnitId) -> bool {
        self.units.contains_key(&id)
    }

    /// Number of live units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Check if storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Get sorted unit ids for deterministic iteration.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<UnitId> {
        let mut ids: Vec<_> = self.units.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Iterate over all units (not in deterministic order).
    pub fn iter(&self) -> impl Iterator<Item = (&UnitId, &Unit)> {
        self.units.iter()
    }
}

/// What happened during one tick.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Tick number after advancing.
    pub tick: u64,
    /// Cities that regenerated, with their health change.
    pub healed: Vec<(UnitId, HealthChange)>,
    /// Knockback impulses handed to the physics backend.
    pub impulses: Vec<ImpulseRequest>,
}

/// Owner of all simulation state.
///
/// The world holds its notification bus behind `Rc`, so it stays on the
/// thread that built it.
#[derive(Debug)]
pub struct World {
    tick: u64,
    config: SimConfig,
    catalog: UnitCatalog,
    units: UnitStorage,
    teams: Vec<Team>,
    players: Vec<Player>,
    city_pool: EntityPool<Unit>,
    scheduler: Scheduler,
    bus: NotificationBus<GameEvent>,
    rng: ChaCha8Rng,
    displayed: Option<UnitId>,
}

impl World {
    /// Create a world with the built-in unit catalog.
    pub fn new(config: SimConfig) -> Result<Self> {
        Self::with_catalog(config, UnitCatalog::default())
    }

    /// Create a world with a custom unit catalog.
    ///
    /// Both the catalog and the config are validated here, once.
    pub fn with_catalog(config: SimConfig, catalog: UnitCatalog) -> Result<Self> {
        catalog.validate()?;
        config.validate(catalog.city.max_health)?;
        let (min, max) = (config.city.min_income_level, config.city.max_income_level);
        if let Some(level) = catalog.city.income_level {
            if !(min..=max).contains(&level) {
                return Err(CoreError::InvalidConfig(format!(
                    "city income_level {level} is outside {min}..={max}"
                )));
            }
        }

        debug!(seed = config.seed, tick_rate = config.tick_rate, "Creating world");

        Ok(Self {
            tick: 0,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            catalog,
            units: UnitStorage::new(),
            teams: Vec::new(),
            players: Vec::new(),
            city_pool: EntityPool::new(),
            scheduler: Scheduler::new(),
            bus: NotificationBus::new(),
            displayed: None,
        })
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Current tick.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Unit catalog used for spawning and pool resets.
    #[must_use]
    pub const fn catalog(&self) -> &UnitCatalog {
        &self.catalog
    }

    /// Look up a live unit.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(id)
    }

    /// Live unit storage.
    #[must_use]
    pub const fn units(&self) -> &UnitStorage {
        &self.units
    }

    /// Registered teams, indexed by [`TeamId`].
    #[must_use]
    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    /// Look up a team.
    #[must_use]
    pub fn team(&self, id: TeamId) -> Option<&Team> {
        self.teams.get(usize::from(id.0))
    }

    /// Registered players, indexed by [`PlayerId`].
    #[must_use]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Look up a player.
    #[must_use]
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(usize::from(id.0))
    }

    /// City pool.
    #[must_use]
    pub const fn city_pool(&self) -> &EntityPool<Unit> {
        &self.city_pool
    }

    /// Periodic task scheduler.
    #[must_use]
    pub const fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Notification bus.
    #[must_use]
    pub const fn bus(&self) -> &NotificationBus<GameEvent> {
        &self.bus
    }

    /// Unit whose menu is currently open.
    #[must_use]
    pub const fn displayed(&self) -> Option<UnitId> {
        self.displayed
    }

    fn team_mut(&mut self, id: TeamId) -> Option<&mut Team> {
        self.teams.get_mut(usize::from(id.0))
    }

    // ------------------------------------------------------------------
    // Teams and players
    // ------------------------------------------------------------------

    /// Register a new active team.
    ///
    /// # Errors
    ///
    /// [`CoreError::DuplicateTeam`] if a team with the same name and color
    /// already exists.
    pub fn add_team(&mut self, name: impl Into<String>, color: Color) -> Result<TeamId> {
        let key = TeamKey::new(name, color);
        if self.find_team(&key).is_some() {
            return Err(CoreError::DuplicateTeam { name: key.name });
        }

        let id = u16::try_from(self.teams.len())
            .map(TeamId)
            .map_err(|_| CoreError::InvalidConfig("too many teams".into()))?;
        debug!(%id, name = %key.name, "Team registered");
        self.teams.push(Team::new(id, key.name, key.color));
        Ok(id)
    }

    /// Find a team by value identity.
    #[must_use]
    pub fn find_team(&self, key: &TeamKey) -> Option<TeamId> {
        self.teams.iter().find(|t| t.matches(key)).map(Team::id)
    }

    /// Put two teams at war with each other.
    pub fn declare_enemies(&mut self, a: TeamId, b: TeamId) -> Result<()> {
        self.team(a).ok_or(CoreError::UnknownTeam(a))?;
        self.team(b).ok_or(CoreError::UnknownTeam(b))?;

        if let Some(team) = self.team_mut(a) {
            team.add_enemy(b);
        }
        if let Some(team) = self.team_mut(b) {
            team.add_enemy(a);
        }
        Ok(())
    }

    /// Register a player and append them to `team`'s members.
    ///
    /// The player starts active only if the team is.
    pub fn add_player(&mut self, name: impl Into<String>, team: TeamId) -> Result<PlayerId> {
        let team_active = self.team(team).ok_or(CoreError::UnknownTeam(team))?.is_active();

        let id = u16::try_from(self.players.len())
            .map(PlayerId)
            .map_err(|_| CoreError::InvalidConfig("too many players".into()))?;
        let mut player = Player::new(id, name, team);
        if !team_active {
            player.deactivate();
        }
        self.players.push(player);

        if let Some(team) = self.team_mut(team) {
            team.add_member(id);
        }
        Ok(id)
    }

    /// Re-enable a team and its members.
    ///
    /// Units and cities lost at deactivation are not recreated; the team
    /// repopulates only through [`World::spawn`].
    pub fn activate_team(&mut self, id: TeamId) -> Result<()> {
        let team = self.team_mut(id).ok_or(CoreError::UnknownTeam(id))?;
        team.set_active(true);
        let members = team.members().to_vec();

        for member in members {
            if let Some(player) = self.players.get_mut(usize::from(member.0)) {
                player.activate();
            }
        }
        debug!(%id, "Team activated");
        Ok(())
    }

    /// Deactivate a team and everything it owns.
    ///
    /// Mobile units are drained first, then cities, always taking the first
    /// remaining entry since each deactivation removes itself from the
    /// collection. Members are deactivated last.
    pub fn deactivate_team(&mut self, id: TeamId) -> Result<()> {
        self.team(id).ok_or(CoreError::UnknownTeam(id))?;
        self.drain_team(id);
        Ok(())
    }

    fn drain_team(&mut self, id: TeamId) {
        let mut drained = 0usize;
        loop {
            let next = self.team(id).and_then(|team| {
                team.mobile_units()
                    .first()
                    .or_else(|| team.capturable_assets().first())
                    .copied()
            });
            let Some(unit) = next else { break };

            if !self.deactivate_unit(unit) {
                // Listed but not live; unlink so the drain terminates.
                if let Some(team) = self.team_mut(id) {
                    team.remove_unit(unit);
                }
            }
            drained += 1;
        }

        let members = self
            .team(id)
            .map(|team| team.members().to_vec())
            .unwrap_or_default();
        for member in members {
            if let Some(player) = self.players.get_mut(usize::from(member.0)) {
                player.deactivate();
            }
        }

        if let Some(team) = self.team_mut(id) {
            team.set_active(false);
        }
        debug!(%id, drained, "Team deactivated");
    }

    /// Sum of income levels of the team's cities.
    #[must_use]
    pub fn team_income(&self, id: TeamId) -> u32 {
        self.team(id).map_or(0, |team| {
            team.capturable_assets()
                .iter()
                .filter_map(|&city| self.units.get(city))
                .filter(|unit| unit.kind().capabilities().contains(Capabilities::ECONOMY))
                .filter_map(Unit::income_level)
                .map(u32::from)
                .sum()
        })
    }

    // ------------------------------------------------------------------
    // Unit lifecycle
    // ------------------------------------------------------------------

    /// Activate a new unit of `kind` for `team`.
    ///
    /// Cities are checked out of the pool and start their regeneration and
    /// knockback tasks; mobile units are constructed fresh. The placement is
    /// recorded for cities and ignored for mobile units, whose movement is
    /// owned by the host.
    ///
    /// # Errors
    ///
    /// [`CoreError::UnknownTeam`] or [`CoreError::TeamInactive`].
    pub fn spawn(&mut self, team: TeamId, kind: UnitKind, placement: Placement) -> Result<UnitId> {
        let target = self.team(team).ok_or(CoreError::UnknownTeam(team))?;
        if !target.is_active() {
            return Err(CoreError::TeamInactive(team));
        }

        let mut unit = if kind.is_capturable() {
            self.city_pool.checkout(kind, &self.catalog)
        } else {
            Unit::new(kind, self.catalog.get(kind))
        };
        unit.set_team(Some(team));
        unit.set_lifecycle(Lifecycle::Active);
        if let Some(city) = unit.city_mut() {
            city.place(placement);
        }

        let id = self.units.insert(unit);

        if let Some(owner) = self.team_mut(team) {
            if kind.is_capturable() {
                owner.insert_asset(id);
            } else {
                owner.insert_mobile(id);
            }
        }

        if kind.is_capturable() {
            self.scheduler
                .register(id, TaskState::Regeneration { delay_remaining: 0 });
            self.scheduler.register(
                id,
                TaskState::Knockback {
                    cooldown_remaining: self.config.push_cooldown_ticks(),
                },
            );
        }

        debug!(id, %kind, %team, "Unit spawned");
        Ok(id)
    }

    /// Deactivate a unit: stop its tasks, unlink it from its team, and
    /// either return it to the pool (cities) or discard it.
    ///
    /// Returns false if the unit is not live.
    pub fn deactivate_unit(&mut self, id: UnitId) -> bool {
        let Some(mut unit) = self.units.remove(id) else {
            return false;
        };

        let cancelled = self.scheduler.cancel_owned_by(id);
        if let Some(team) = unit.team().and_then(|team| self.team_mut(team)) {
            team.remove_unit(id);
        }
        if self.displayed == Some(id) {
            self.displayed = None;
        }

        unit.set_lifecycle(Lifecycle::Inactive);
        let kind = unit.kind();
        if kind.is_capturable() {
            self.city_pool.release(unit, &self.catalog);
        }

        debug!(id, %kind, cancelled, "Unit deactivated");
        true
    }

    // ------------------------------------------------------------------
    // Combat
    // ------------------------------------------------------------------

    /// Apply damage to a unit; negative amounts heal.
    ///
    /// Health is clamped in the same step as the mutation. On the transition
    /// to zero health the death handler runs exactly once: mobile units are
    /// destroyed, cities are captured by `source`'s team.
    ///
    /// Missing or inactive targets are ignored.
    pub fn take_damage(
        &mut self,
        target: UnitId,
        amount: Fixed,
        source: Option<UnitId>,
    ) -> DamageOutcome {
        let Some(unit) = self.units.get_mut(target) else {
            warn!(unit = target, "Damage to unknown unit ignored");
            return DamageOutcome::Ignored;
        };
        if !unit.is_active() {
            warn!(unit = target, "Damage to inactive unit ignored");
            return DamageOutcome::Ignored;
        }

        let change = unit.take_damage(amount);
        trace!(
            unit = target,
            ?source,
            previous = %change.previous,
            current = %change.current,
            "Damage applied"
        );

        if change.is_lethal() {
            self.on_death(target, source);
            DamageOutcome::Lethal(change)
        } else {
            DamageOutcome::Applied(change)
        }
    }

    fn on_death(&mut self, id: UnitId, source: Option<UnitId>) {
        let Some((is_city, team)) = self
            .units
            .get(id)
            .map(|unit| (unit.as_city().is_some(), unit.team()))
        else {
            return;
        };

        if is_city {
            self.capture_city(id, source);
        } else {
            self.bus.publish(
                Publisher::Unit(id),
                GameEvent::UnitDestroyed {
                    unit: id,
                    team,
                    killer: source,
                },
            );
            self.deactivate_unit(id);
        }
    }

    /// Move a fallen city to the team of the unit that took it.
    ///
    /// The capture event goes out before any ownership field moves. Health
    /// is then brought to the captured value through the damage path and the
    /// regeneration delay is re-armed.
    fn capture_city(&mut self, city: UnitId, source: Option<UnitId>) {
        let new_owner = source
            .and_then(|unit| self.units.get(unit))
            .and_then(Unit::team)
            .filter(|&team| self.team(team).is_some());
        let Some(new_owner) = new_owner else {
            warn!(city, ?source, "City fell without a capturing team");
            return;
        };
        let previous_owner = self.units.get(city).and_then(Unit::team);

        self.bus.publish(
            Publisher::Unit(city),
            GameEvent::CityCaptured {
                city,
                previous_owner,
                new_owner,
            },
        );

        if let Some(team) = previous_owner.and_then(|team| self.team_mut(team)) {
            team.remove_unit(city);
        }
        if let Some(team) = self.team_mut(new_owner) {
            team.insert_asset(city);
        }

        let captured_health = Fixed::from_num(self.config.city.captured_health);
        if let Some(unit) = self.units.get_mut(city) {
            unit.set_team(Some(new_owner));
            if let Some(state) = unit.city_mut() {
                state.suppress_regeneration();
            }
            let amount = unit.health() - captured_health;
            unit.take_damage(amount);
        }

        debug!(city, ?previous_owner, %new_owner, "City captured");
    }

    /// Have a mobile unit strike `target` for its damage stat.
    ///
    /// Range and line of sight are the host's concern. Non-combat
    /// attackers, friendly targets and self-targeting are ignored.
    pub fn attack(&mut self, attacker: UnitId, target: UnitId) -> DamageOutcome {
        let Some((damage, attacker_team)) = self
            .units
            .get(attacker)
            .filter(|unit| unit.is_active())
            .filter(|unit| unit.kind().capabilities().contains(Capabilities::COMBAT))
            .map(|unit| (unit.stats().damage(), unit.team()))
        else {
            return DamageOutcome::Ignored;
        };

        let Some(target_team) = self.units.get(target).map(Unit::team) else {
            return DamageOutcome::Ignored;
        };
        if target == attacker || (target_team.is_some() && target_team == attacker_team) {
            return DamageOutcome::Ignored;
        }

        if let Some(mobile) = self.units.get_mut(attacker).and_then(Unit::mobile_mut) {
            mobile.set_attack_target(Some(target));
        }
        self.take_damage(target, damage, Some(attacker))
    }

    /// Collision reported by the host between `unit` and `other`.
    ///
    /// A city touched by a unit of another team takes a random amount of
    /// contact damage credited to that unit. Everything else is ignored.
    pub fn on_collision(&mut self, unit: UnitId, other: Option<UnitId>) -> DamageOutcome {
        let Some(other) = other else {
            return DamageOutcome::Ignored;
        };
        let Some(city_team) = self
            .units
            .get(unit)
            .filter(|u| u.as_city().is_some())
            .map(Unit::team)
        else {
            return DamageOutcome::Ignored;
        };
        let Some(other_team) = self.units.get(other).map(Unit::team) else {
            return DamageOutcome::Ignored;
        };
        if other_team == city_team {
            return DamageOutcome::Ignored;
        }

        let amount = self.roll_collision_damage();
        self.take_damage(unit, amount, Some(other))
    }

    fn roll_collision_damage(&mut self) -> Fixed {
        let min = Fixed::from_num(self.config.city.collision_damage_min);
        let max = Fixed::from_num(self.config.city.collision_damage_max);
        Fixed::from_bits(self.rng.gen_range(min.to_bits()..max.to_bits()))
    }

    // ------------------------------------------------------------------
    // Presentation hooks
    // ------------------------------------------------------------------

    /// Highlight a unit. Returns false if it is not live.
    pub fn select(&mut self, id: UnitId) -> bool {
        self.units.get_mut(id).map(Unit::select).is_some()
    }

    /// Remove a unit's highlight. Returns false if it is not live.
    pub fn deselect(&mut self, id: UnitId) -> bool {
        self.units.get_mut(id).map(Unit::deselect).is_some()
    }

    /// Open the menu for a unit or city.
    ///
    /// Only one unit is highlighted by an open menu at a time: the
    /// previously displayed unit loses its highlight.
    pub fn open_menu(&mut self, id: UnitId) -> bool {
        let Some(is_city) = self.units.get(id).map(|unit| unit.as_city().is_some()) else {
            return false;
        };

        if let Some(previous) = self.displayed.filter(|&previous| previous != id) {
            self.deselect(previous);
        }
        self.select(id);
        self.displayed = Some(id);

        let event = if is_city {
            GameEvent::CityMenuOpened { city: id }
        } else {
            GameEvent::UnitMenuOpened { unit: id }
        };
        self.bus.publish(Publisher::Presentation, event);
        true
    }

    /// Close the open menu, if any, and drop its highlight.
    pub fn close_menu(&mut self) {
        if let Some(id) = self.displayed.take() {
            self.deselect(id);
        }
    }

    /// Give a unit a custom display name. Blank names restore the default.
    pub fn rename(&mut self, id: UnitId, name: impl Into<String>) -> bool {
        self.units.get_mut(id).map(|unit| unit.rename(name)).is_some()
    }

    /// Set a city's income level, clamped to the configured range.
    ///
    /// Returns the stored level, or `None` if `id` is not a live city.
    pub fn set_income_level(&mut self, id: UnitId, level: u8) -> Option<u8> {
        let (min, max) = (self.config.city.min_income_level, self.config.city.max_income_level);
        self.units
            .get_mut(id)
            .and_then(Unit::city_mut)
            .map(|city| city.set_income_level(level, min, max))
    }

    // ------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------

    /// Register an observer on the world's bus.
    pub fn subscribe(&self, observer: Rc<dyn Observer<GameEvent>>) -> SubscriptionId {
        self.bus.subscribe(observer)
    }

    /// Remove an observer from the world's bus.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// Publish an event on behalf of a presentation or host component.
    pub fn notify(&self, publisher: Publisher, event: GameEvent) -> usize {
        self.bus.publish(publisher, event)
    }

    /// Tear the match down: every team is deactivated (cities return to
    /// the pool) and a reset event is published.
    ///
    /// Teams and players stay registered; call [`World::activate_team`] to
    /// start again.
    pub fn reset_match(&mut self) {
        let ids: Vec<TeamId> = self.teams.iter().map(Team::id).collect();
        for id in ids {
            self.drain_team(id);
        }
        self.displayed = None;
        debug!(teams = self.teams.len(), "Match reset");
        self.bus.publish(Publisher::World, GameEvent::MatchReset);
    }

    // ------------------------------------------------------------------
    // Ticking
    // ------------------------------------------------------------------

    /// Advance the simulation by one tick.
    pub fn tick(&mut self, physics: &mut dyn PhysicsBackend) -> TickReport {
        self.tick += 1;
        let mut report = TickReport {
            tick: self.tick,
            ..TickReport::default()
        };

        for task_id in self.scheduler.task_ids() {
            let Some(task) = self.scheduler.get(task_id).copied() else {
                continue;
            };

            let next = match task.state {
                TaskState::Regeneration { delay_remaining } => TaskState::Regeneration {
                    delay_remaining: self.step_regeneration(task.owner, delay_remaining, &mut report),
                },
                TaskState::Knockback { cooldown_remaining } => TaskState::Knockback {
                    cooldown_remaining: self.step_knockback(
                        task.owner,
                        cooldown_remaining,
                        physics,
                        &mut report,
                    ),
                },
            };

            if let Some(task) = self.scheduler.get_mut(task_id) {
                task.state = next;
            }
        }

        trace!(
            tick = self.tick,
            healed = report.healed.len(),
            impulses = report.impulses.len(),
            "Tick complete"
        );
        report
    }

    /// One regeneration step. Returns the remaining delay.
    ///
    /// Damage seen since the last step re-arms the full delay. While the
    /// delay runs nothing heals; afterwards the city heals by the per-tick
    /// rate until full.
    fn step_regeneration(
        &mut self,
        owner: UnitId,
        delay_remaining: u32,
        report: &mut TickReport,
    ) -> u32 {
        let delay_ticks = self.config.regeneration_delay_ticks();
        let per_tick = self.config.regeneration_per_tick();
        let Some(unit) = self.units.get_mut(owner) else {
            return delay_remaining;
        };
        let Some(city) = unit.city_mut() else {
            return delay_remaining;
        };

        if city.take_pending_damage() {
            trace!(owner, delay_ticks, "Regeneration delayed");
            return delay_ticks;
        }
        if delay_remaining > 0 {
            return delay_remaining - 1;
        }
        city.resume_regeneration();
        if unit.health() < unit.max_health() {
            let change = unit.regenerate(per_tick);
            report.healed.push((owner, change));
        }
        0
    }

    /// One knockback step. Returns the remaining cooldown.
    fn step_knockback(
        &mut self,
        owner: UnitId,
        cooldown_remaining: u32,
        physics: &mut dyn PhysicsBackend,
        report: &mut TickReport,
    ) -> u32 {
        let remaining = cooldown_remaining.saturating_sub(1);
        if remaining > 0 {
            return remaining;
        }

        let cooldown = self.config.push_cooldown_ticks();
        let Some(center) = self
            .units
            .get(owner)
            .and_then(Unit::as_city)
            .map(CityState::position)
        else {
            return cooldown;
        };

        let radius = Fixed::from_num(self.config.city.push_radius);
        let force = Fixed::from_num(self.config.city.push_force);

        for overlap in physics.overlap_circle(center, radius) {
            if overlap.is_terrain || overlap.unit == Some(owner) {
                continue;
            }
            let Some(body) = overlap.body else {
                continue;
            };

            let direction = (overlap.position - center).normalize();
            if direction.is_zero() {
                continue;
            }

            let impulse = direction.scale(force);
            physics.apply_impulse(body, impulse);
            report.impulses.push(ImpulseRequest {
                source: owner,
                body,
                impulse,
                force,
            });
        }

        cooldown
    }

    // ------------------------------------------------------------------
    // Determinism
    // ------------------------------------------------------------------

    /// Hash of the full simulation state.
    ///
    /// Two worlds built from the same config and fed the same operations
    /// produce the same hash.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);

        let ids = self.units.sorted_ids();
        ids.len().hash(&mut hasher);
        for id in ids {
            if let Some(unit) = self.units.get(id) {
                id.hash(&mut hasher);
                unit.kind().hash(&mut hasher);
                unit.team().hash(&mut hasher);
                unit.health().to_bits().hash(&mut hasher);
                unit.max_health().to_bits().hash(&mut hasher);
                unit.lifecycle().hash(&mut hasher);
                unit.is_selected().hash(&mut hasher);
                unit.display_name().hash(&mut hasher);

                match unit.variant() {
                    UnitVariant::City(city) => {
                        city.income_level().hash(&mut hasher);
                        city.regeneration_suppressed().hash(&mut hasher);
                        city.damage_pending().hash(&mut hasher);
                        city.position().x.to_bits().hash(&mut hasher);
                        city.position().y.to_bits().hash(&mut hasher);
                    }
                    UnitVariant::Mobile(mobile) => {
                        mobile.attack_target().hash(&mut hasher);
                    }
                }
            }
        }

        for team in &self.teams {
            team.id().hash(&mut hasher);
            team.is_active().hash(&mut hasher);
            team.mobile_units().hash(&mut hasher);
            team.capturable_assets().hash(&mut hasher);
        }

        for id in self.scheduler.task_ids() {
            if let Some(task) = self.scheduler.get(id) {
                task.id.hash(&mut hasher);
                task.owner.hash(&mut hasher);
                task.state.hash(&mut hasher);
            }
        }

        self.city_pool.available().hash(&mut hasher);
        self.rng.get_word_pos().hash(&mut hasher);

        hasher.finish()
    }
}
