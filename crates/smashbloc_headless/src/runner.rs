//! Scenario runner.
//!
//! Builds a [`World`] from a [`Scenario`], drives it tick by tick against
//! an in-memory physics arena and summarizes the outcome as a
//! serializable [`RunReport`].
//!
//! Each tick the runner:
//! 1. Applies scripted actions due this tick
//! 2. Drops bodies whose unit no longer exists
//! 3. Reports contacts between bodies and cities
//! 4. Advances the world (regeneration and knockback)
//! 5. Drains the event log into the report

use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use smashbloc_core::error::CoreError;
use smashbloc_core::math::{Fixed, Vec2Fixed, MAX_WHOLE};
use smashbloc_core::notify::{EventLog, GameEvent};
use smashbloc_core::physics::{BodyId, Overlap, PhysicsBackend};
use smashbloc_core::team::{Color, TeamId};
use smashbloc_core::unit::{Placement, UnitId};
use smashbloc_core::unit_kind::UnitKind;
use smashbloc_core::world::World;
use tracing::{debug, info, warn};

use crate::scenario::{Scenario, ScenarioError, ScriptedAction, ScriptedEvent, UnitRef};

/// Mass of every arena body; displacement is `impulse / mass`.
const ARENA_BODY_MASS: i32 = 20;

/// A mobile unit's body in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaBody {
    /// Body handle.
    pub id: BodyId,
    /// Unit the body belongs to.
    pub unit: UnitId,
    /// Current position.
    pub position: Vec2Fixed,
}

/// Minimal physics for headless runs: point bodies that move by
/// `impulse / mass` when pushed.
#[derive(Debug, Clone, Default)]
pub struct ArenaPhysics {
    bodies: Vec<ArenaBody>,
    next_body: u64,
    impulses_applied: usize,
}

impl ArenaPhysics {
    /// Create an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a body for `unit`.
    pub fn add_body(&mut self, unit: UnitId, position: Vec2Fixed) -> BodyId {
        let id = BodyId(self.next_body);
        self.next_body += 1;
        self.bodies.push(ArenaBody { id, unit, position });
        id
    }

    /// Remove bodies for which `keep` returns false.
    pub fn retain_units(&mut self, mut keep: impl FnMut(UnitId) -> bool) {
        self.bodies.retain(|body| keep(body.unit));
    }

    /// All bodies.
    #[must_use]
    pub fn bodies(&self) -> &[ArenaBody] {
        &self.bodies
    }

    /// Position of the body owned by `unit`.
    #[must_use]
    pub fn position_of(&self, unit: UnitId) -> Option<Vec2Fixed> {
        self.bodies
            .iter()
            .find(|body| body.unit == unit)
            .map(|body| body.position)
    }

    /// Number of impulses received so far.
    #[must_use]
    pub const fn impulses_applied(&self) -> usize {
        self.impulses_applied
    }
}

impl PhysicsBackend for ArenaPhysics {
    fn overlap_circle(&mut self, center: Vec2Fixed, radius: Fixed) -> Vec<Overlap> {
        let radius_sq = radius.saturating_mul(radius);
        self.bodies
            .iter()
            .filter(|body| body.position.distance_squared(center) <= radius_sq)
            .map(|body| Overlap::unit_body(body.unit, body.id, body.position))
            .collect()
    }

    fn apply_impulse(&mut self, body: BodyId, impulse: Vec2Fixed) {
        self.impulses_applied += 1;
        if let Some(target) = self.bodies.iter_mut().find(|b| b.id == body) {
            let mass = Fixed::from_num(ARENA_BODY_MASS);
            target.position = target.position + Vec2Fixed::new(impulse.x / mass, impulse.y / mass);
        }
    }
}

/// A city changing hands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRecord {
    /// Tick the capture happened on.
    pub tick: u64,
    /// City captured.
    pub city: UnitId,
    /// Name of the team that lost it.
    pub previous_owner: Option<String>,
    /// Name of the team that took it.
    pub new_owner: String,
}

/// End-of-run state of one team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamReport {
    /// Team name.
    pub name: String,
    /// Whether the team is still in the match.
    pub active: bool,
    /// Cities held.
    pub cities: usize,
    /// Mobile units alive.
    pub mobile_units: usize,
    /// Sum of city income levels.
    pub income: u32,
}

/// End-of-run state of one scenario city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityReport {
    /// Scenario reference.
    pub reference: UnitRef,
    /// Unit id.
    pub id: UnitId,
    /// Owning team name.
    pub owner: Option<String>,
    /// Current health.
    pub health: f64,
    /// Income level.
    pub income_level: Option<u8>,
}

/// Summary of one scenario run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Scenario name.
    pub scenario: String,
    /// RNG seed used.
    pub seed: u64,
    /// Ticks simulated.
    pub ticks: u64,
    /// Final world state hash.
    pub state_hash: u64,
    /// Captures in the order they happened.
    pub captures: Vec<CaptureRecord>,
    /// Mobile units destroyed.
    pub units_destroyed: u32,
    /// Knockback impulses issued.
    pub impulses: usize,
    /// City-ticks spent regenerating.
    pub heal_steps: usize,
    /// Teams in registration order.
    pub teams: Vec<TeamReport>,
    /// Scenario cities still in play.
    pub cities: Vec<CityReport>,
}

impl RunReport {
    /// Team holding the most cities, if exactly one does.
    #[must_use]
    pub fn leader(&self) -> Option<&str> {
        let most = self.teams.iter().map(|t| t.cities).max()?;
        let mut leaders = self.teams.iter().filter(|t| t.cities == most);
        let first = leaders.next()?;
        if leaders.next().is_some() || most == 0 {
            return None;
        }
        Some(&first.name)
    }
}

/// Drives one scenario.
#[derive(Debug)]
pub struct ScenarioRunner {
    scenario: Scenario,
    world: World,
    physics: ArenaPhysics,
    team_ids: Vec<TeamId>,
    refs: HashMap<UnitRef, UnitId>,
    log: Rc<EventLog<GameEvent>>,
    pending: Vec<ScriptedEvent>,
    captures: Vec<CaptureRecord>,
    units_destroyed: u32,
    impulses: usize,
    heal_steps: usize,
}

impl ScenarioRunner {
    /// Build the world described by `scenario`.
    pub fn new(scenario: &Scenario) -> Result<Self, ScenarioError> {
        if scenario.contact_radius > MAX_WHOLE {
            return Err(CoreError::InvalidConfig(format!(
                "contact_radius must be at most {MAX_WHOLE}, got {}",
                scenario.contact_radius
            ))
            .into());
        }
        let mut world = World::new(scenario.config.clone())?;
        let mut physics = ArenaPhysics::new();
        let mut team_ids = Vec::with_capacity(scenario.teams.len());
        let mut refs = HashMap::new();

        for setup in &scenario.teams {
            let (r, g, b) = setup.color;
            let team = world.add_team(setup.name.as_str(), Color::rgb(r, g, b))?;
            for player in &setup.players {
                world.add_player(player.as_str(), team)?;
            }
            team_ids.push(team);
        }

        for (i, &a) in team_ids.iter().enumerate() {
            for &b in &team_ids[i + 1..] {
                world.declare_enemies(a, b)?;
            }
        }

        for (team_index, setup) in scenario.teams.iter().enumerate() {
            let team = team_ids[team_index];
            for (index, city) in setup.cities.iter().enumerate() {
                let position = Vec2Fixed::from_ints(city.x, city.y);
                let id = world.spawn(team, UnitKind::City, Placement::at(position))?;
                if let Some(level) = city.income {
                    world.set_income_level(id, level);
                }
                refs.insert(UnitRef::City(team_index, index), id);
            }
            for (index, unit) in setup.units.iter().enumerate() {
                let position = Vec2Fixed::from_ints(unit.x, unit.y);
                let id = world.spawn(team, unit.kind, Placement::at(position))?;
                physics.add_body(id, position);
                refs.insert(UnitRef::Mobile(team_index, index), id);
            }
        }

        let mut pending = scenario.events.clone();
        for event in &pending {
            check_references(event, &refs, team_ids.len())?;
        }
        // Stable sort keeps same-tick actions in file order.
        pending.sort_by_key(|event| event.at_tick);
        pending.reverse();

        let log = Rc::new(EventLog::<GameEvent>::new());
        world.subscribe(log.clone());

        debug!(
            scenario = %scenario.name,
            teams = team_ids.len(),
            units = world.units().len(),
            "Scenario world built"
        );

        Ok(Self {
            scenario: scenario.clone(),
            world,
            physics,
            team_ids,
            refs,
            log,
            pending,
            captures: Vec::new(),
            units_destroyed: 0,
            impulses: 0,
            heal_steps: 0,
        })
    }

    /// The world being driven.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// The physics arena.
    #[must_use]
    pub const fn physics(&self) -> &ArenaPhysics {
        &self.physics
    }

    /// Unit id for a scenario reference.
    #[must_use]
    pub fn resolve(&self, reference: UnitRef) -> Option<UnitId> {
        self.refs.get(&reference).copied()
    }

    /// Advance one tick.
    pub fn step(&mut self) {
        let tick = self.world.tick_count();

        while self.pending.last().is_some_and(|event| event.at_tick <= tick) {
            if let Some(event) = self.pending.pop() {
                self.apply(&event.action);
            }
        }

        let world = &self.world;
        self.physics.retain_units(|unit| world.unit(unit).is_some());

        self.report_contacts();

        let report = self.world.tick(&mut self.physics);
        self.impulses += report.impulses.len();
        self.heal_steps += report.healed.len();

        self.drain_events(tick);
    }

    /// Run every remaining tick of the scenario.
    pub fn run_to_end(&mut self) {
        while self.world.tick_count() < self.scenario.ticks {
            self.step();
        }
    }

    /// Summarize the current state.
    #[must_use]
    pub fn report(&self) -> RunReport {
        let teams = self
            .team_ids
            .iter()
            .filter_map(|&id| self.world.team(id).map(|team| (id, team)))
            .map(|(id, team)| TeamReport {
                name: team.name().to_string(),
                active: team.is_active(),
                cities: team.capturable_assets().len(),
                mobile_units: team.mobile_units().len(),
                income: self.world.team_income(id),
            })
            .collect();

        let mut cities: Vec<CityReport> = self
            .refs
            .iter()
            .filter(|(reference, _)| matches!(reference, UnitRef::City(..)))
            .filter_map(|(&reference, &id)| {
                let unit = self.world.unit(id)?;
                Some(CityReport {
                    reference,
                    id,
                    owner: unit.team().and_then(|team| self.team_name(team)),
                    health: unit.health().to_num::<f64>(),
                    income_level: unit.income_level(),
                })
            })
            .collect();
        cities.sort_by_key(|city| city.id);

        RunReport {
            scenario: self.scenario.name.clone(),
            seed: self.scenario.config.seed,
            ticks: self.world.tick_count(),
            state_hash: self.world.state_hash(),
            captures: self.captures.clone(),
            units_destroyed: self.units_destroyed,
            impulses: self.impulses,
            heal_steps: self.heal_steps,
            teams,
            cities,
        }
    }

    fn apply(&mut self, action: &ScriptedAction) {
        debug!(tick = self.world.tick_count(), ?action, "Applying scripted action");
        match action {
            ScriptedAction::Damage {
                target,
                amount,
                source,
            } => {
                if let Some(target) = self.resolve(*target) {
                    let source = source.and_then(|s| self.resolve(s));
                    self.world
                        .take_damage(target, Fixed::from_num(*amount), source);
                }
            }
            ScriptedAction::Collide { city, other } => {
                if let Some(city) = self.resolve(*city) {
                    let other = other.and_then(|o| self.resolve(o));
                    self.world.on_collision(city, other);
                }
            }
            ScriptedAction::Attack { attacker, target } => {
                if let (Some(attacker), Some(target)) =
                    (self.resolve(*attacker), self.resolve(*target))
                {
                    self.world.attack(attacker, target);
                }
            }
            ScriptedAction::OpenMenu(unit) => {
                if let Some(unit) = self.resolve(*unit) {
                    self.world.open_menu(unit);
                }
            }
            ScriptedAction::SetIncome { city, level } => {
                if let Some(city) = self.resolve(*city) {
                    self.world.set_income_level(city, *level);
                }
            }
            ScriptedAction::DeactivateTeam(index) => {
                if let Some(&team) = self.team_ids.get(*index) {
                    if let Err(e) = self.world.deactivate_team(team) {
                        warn!(team = %team, "Failed to deactivate team: {}", e);
                    }
                }
            }
            ScriptedAction::ResetMatch => self.world.reset_match(),
        }
    }

    /// Report every body touching a city as a collision with it.
    fn report_contacts(&mut self) {
        if self.scenario.contact_radius == 0 {
            return;
        }
        let radius = Fixed::from_num(self.scenario.contact_radius);

        let cities: Vec<(UnitId, Vec2Fixed)> = self
            .world
            .units()
            .sorted_ids()
            .into_iter()
            .filter_map(|id| {
                let city = self.world.unit(id)?.as_city()?;
                Some((id, city.position()))
            })
            .collect();

        for (city, position) in cities {
            for overlap in self.physics.overlap_circle(position, radius) {
                if let Some(unit) = overlap.unit {
                    self.world.on_collision(city, Some(unit));
                }
            }
        }
    }

    fn drain_events(&mut self, tick: u64) {
        for event in self.log.events() {
            match event {
                GameEvent::CityCaptured {
                    city,
                    previous_owner,
                    new_owner,
                } => {
                    let record = CaptureRecord {
                        tick,
                        city,
                        previous_owner: previous_owner.and_then(|team| self.team_name(team)),
                        new_owner: self.team_name(new_owner).unwrap_or_default(),
                    };
                    info!(
                        tick,
                        city,
                        new_owner = %record.new_owner,
                        "City captured"
                    );
                    self.captures.push(record);
                }
                GameEvent::UnitDestroyed { .. } => self.units_destroyed += 1,
                _ => {}
            }
        }
        self.log.clear();
    }

    fn team_name(&self, id: TeamId) -> Option<String> {
        self.world.team(id).map(|team| team.name().to_string())
    }
}

fn check_references(
    event: &ScriptedEvent,
    refs: &HashMap<UnitRef, UnitId>,
    team_count: usize,
) -> Result<(), ScenarioError> {
    let missing = |what: String| ScenarioError::BadReference {
        tick: event.at_tick,
        what,
    };
    let unit = |reference: UnitRef| {
        if refs.contains_key(&reference) {
            Ok(())
        } else {
            Err(missing(format!("{reference:?}")))
        }
    };

    match &event.action {
        ScriptedAction::Damage { target, source, .. } => {
            unit(*target)?;
            source.map_or(Ok(()), unit)
        }
        ScriptedAction::Collide { city, other } => {
            unit(*city)?;
            other.map_or(Ok(()), unit)
        }
        ScriptedAction::Attack { attacker, target } => {
            unit(*attacker)?;
            unit(*target)
        }
        ScriptedAction::OpenMenu(reference) => unit(*reference),
        ScriptedAction::SetIncome { city, .. } => unit(*city),
        ScriptedAction::DeactivateTeam(index) => {
            if *index < team_count {
                Ok(())
            } else {
                Err(missing(format!("team {index}")))
            }
        }
        ScriptedAction::ResetMatch => Ok(()),
    }
}

/// Build, run and summarize a scenario.
pub fn run_scenario(scenario: &Scenario) -> Result<RunReport, ScenarioError> {
    let mut runner = ScenarioRunner::new(scenario)?;
    runner.run_to_end();
    let report = runner.report();
    info!(
        scenario = %report.scenario,
        seed = report.seed,
        ticks = report.ticks,
        captures = report.captures.len(),
        "Scenario finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{CityPlacement, TeamSetup, UnitPlacement};
    use smashbloc_core::config::SimConfig;

    fn duel(events: Vec<ScriptedEvent>, ticks: u64) -> Scenario {
        Scenario {
            name: "Duel".to_string(),
            description: String::new(),
            config: SimConfig::default(),
            ticks,
            contact_radius: 0,
            teams: vec![
                TeamSetup {
                    name: "Red".to_string(),
                    color: (255, 0, 0),
                    players: vec!["Ann".to_string()],
                    cities: vec![CityPlacement::new(0, 0)],
                    units: vec![],
                },
                TeamSetup {
                    name: "Blue".to_string(),
                    color: (0, 0, 255),
                    players: vec![],
                    cities: vec![],
                    units: vec![UnitPlacement::new(UnitKind::Infantry, 500, 500)],
                },
            ],
            events,
        }
    }

    #[test]
    fn test_scripted_capture_is_reported() {
        let scenario = duel(
            vec![ScriptedEvent {
                at_tick: 5,
                action: ScriptedAction::Damage {
                    target: UnitRef::City(0, 0),
                    amount: 520,
                    source: Some(UnitRef::Mobile(1, 0)),
                },
            }],
            10,
        );

        let report = run_scenario(&scenario).unwrap();

        assert_eq!(report.ticks, 10);
        assert_eq!(report.captures.len(), 1);
        assert_eq!(report.captures[0].tick, 5);
        assert_eq!(report.captures[0].previous_owner.as_deref(), Some("Red"));
        assert_eq!(report.captures[0].new_owner, "Blue");
        assert_eq!(report.cities[0].owner.as_deref(), Some("Blue"));
        assert!((report.cities[0].health - 50.0).abs() < f64::EPSILON);
        assert_eq!(report.leader(), Some("Blue"));
    }

    #[test]
    fn test_bad_reference_is_rejected() {
        let scenario = duel(
            vec![ScriptedEvent {
                at_tick: 1,
                action: ScriptedAction::OpenMenu(UnitRef::City(1, 3)),
            }],
            5,
        );
        let err = ScenarioRunner::new(&scenario).unwrap_err();
        assert!(matches!(err, ScenarioError::BadReference { tick: 1, .. }));
    }

    #[test]
    fn test_contact_damage_wears_city_down() {
        let mut scenario = duel(vec![], 20);
        scenario.contact_radius = 30;
        scenario.teams[1].units[0] = UnitPlacement::new(UnitKind::Infantry, 10, 0);

        let mut runner = ScenarioRunner::new(&scenario).unwrap();
        let city = runner.resolve(UnitRef::City(0, 0)).unwrap();
        runner.step();

        let health = runner.world().unit(city).unwrap().health();
        assert!(health <= Fixed::from_num(490));
        assert!(health > Fixed::from_num(480));
    }

    #[test]
    fn test_knockback_moves_arena_bodies() {
        let mut scenario = duel(vec![], 40);
        scenario.teams[1].units[0] = UnitPlacement::new(UnitKind::Infantry, 20, 0);

        let mut runner = ScenarioRunner::new(&scenario).unwrap();
        let raider = runner.resolve(UnitRef::Mobile(1, 0)).unwrap();
        runner.run_to_end();

        let position = runner.physics().position_of(raider).unwrap();
        assert!(position.x > Fixed::from_num(39) && position.x <= Fixed::from_num(40));
        assert_eq!(position.y, Fixed::ZERO);
        assert_eq!(runner.physics().impulses_applied(), 1);
        assert_eq!(runner.report().impulses, 1);
    }

    #[test]
    fn test_destroyed_unit_loses_its_body() {
        let scenario = duel(
            vec![ScriptedEvent {
                at_tick: 0,
                action: ScriptedAction::Damage {
                    target: UnitRef::Mobile(1, 0),
                    amount: 1000,
                    source: None,
                },
            }],
            2,
        );

        let mut runner = ScenarioRunner::new(&scenario).unwrap();
        runner.run_to_end();

        assert!(runner.physics().bodies().is_empty());
        let report = runner.report();
        assert_eq!(report.units_destroyed, 1);
        assert_eq!(report.teams[1].mobile_units, 0);
    }

    #[test]
    fn test_reset_clears_every_team() {
        let scenario = duel(
            vec![ScriptedEvent {
                at_tick: 3,
                action: ScriptedAction::ResetMatch,
            }],
            6,
        );

        let report = run_scenario(&scenario).unwrap();

        assert!(report.cities.is_empty());
        assert!(report.teams.iter().all(|team| !team.active));
        assert_eq!(report.leader(), None);
    }

    #[test]
    fn test_scripted_deactivation_takes_team_out() {
        let scenario = duel(
            vec![
                ScriptedEvent {
                    at_tick: 2,
                    action: ScriptedAction::DeactivateTeam(1),
                },
                ScriptedEvent {
                    at_tick: 4,
                    action: ScriptedAction::DeactivateTeam(1),
                },
            ],
            6,
        );

        let report = run_scenario(&scenario).unwrap();

        assert!(report.teams[0].active);
        assert_eq!(report.teams[0].cities, 1);
        assert!(!report.teams[1].active);
        assert_eq!(report.teams[1].mobile_units, 0);
    }

    #[test]
    fn test_oversized_contact_radius_is_rejected() {
        let mut scenario = duel(vec![], 1);
        scenario.contact_radius = 3_000_000_000;

        let err = run_scenario(&scenario).unwrap_err();

        assert!(matches!(
            err,
            ScenarioError::Setup(CoreError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_same_seed_same_report() {
        let scenario = Scenario::skirmish().with_seed(3);
        let first = run_scenario(&scenario).unwrap();
        let second = run_scenario(&scenario).unwrap();
        assert_eq!(first, second);
    }
}
