//! Test fixtures and helpers.
//!
//! Pre-built matches and recording collaborators for consistent testing.

use std::rc::Rc;

use fixed::types::I32F32;
use smashbloc_core::config::SimConfig;
use smashbloc_core::math::{Fixed, Vec2Fixed};
use smashbloc_core::notify::{EventLog, GameEvent};
use smashbloc_core::physics::{BodyId, Overlap, PhysicsBackend};
use smashbloc_core::team::{Color, TeamId};
use smashbloc_core::unit::{Placement, UnitId};
use smashbloc_core::unit_kind::UnitKind;
use smashbloc_core::world::World;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a vector from whole-number coordinates.
#[must_use]
pub fn vec2(x: i32, y: i32) -> Vec2Fixed {
    Vec2Fixed::from_ints(x, y)
}

/// A world with two active teams at war, "Red" and "Blue".
#[derive(Debug)]
pub struct TwoTeamMatch {
    /// The world.
    pub world: World,
    /// Red team.
    pub red: TeamId,
    /// Blue team.
    pub blue: TeamId,
}

impl TwoTeamMatch {
    /// Build the match with the default config.
    ///
    /// # Panics
    ///
    /// Panics if the default config fails validation.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SimConfig::default())
    }

    /// Build the match with a custom config.
    ///
    /// # Panics
    ///
    /// Panics if `config` fails validation.
    #[must_use]
    pub fn with_config(config: SimConfig) -> Self {
        let mut world = World::new(config).expect("test config must validate");
        let red = world.add_team("Red", Color::RED).expect("fresh world");
        let blue = world.add_team("Blue", Color::BLUE).expect("fresh world");
        world.declare_enemies(red, blue).expect("teams exist");
        Self { world, red, blue }
    }

    /// Place a city for `team` at whole-number coordinates.
    ///
    /// # Panics
    ///
    /// Panics if the team is unknown or inactive.
    pub fn city(&mut self, team: TeamId, x: i32, y: i32) -> UnitId {
        self.world
            .spawn(team, UnitKind::City, Placement::at(vec2(x, y)))
            .expect("team accepts spawns")
    }

    /// Spawn a mobile unit for `team`.
    ///
    /// # Panics
    ///
    /// Panics if the team is unknown or inactive.
    pub fn mobile(&mut self, team: TeamId, kind: UnitKind) -> UnitId {
        self.world
            .spawn(team, kind, Placement::default())
            .expect("team accepts spawns")
    }

    /// Subscribe a fresh event log to the world's bus.
    pub fn record_events(&self) -> Rc<EventLog<GameEvent>> {
        let log = Rc::new(EventLog::<GameEvent>::new());
        self.world.subscribe(log.clone());
        log
    }

    /// Tick `n` times with no physics bodies.
    pub fn run(&mut self, n: u32) {
        for _ in 0..n {
            self.world.tick(&mut smashbloc_core::physics::NoPhysics);
        }
    }
}

impl Default for TwoTeamMatch {
    fn default() -> Self {
        Self::new()
    }
}

/// A body tracked by [`RecordingPhysics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackedBody {
    /// Body handle.
    pub id: BodyId,
    /// Unit the body belongs to, if any.
    pub unit: Option<UnitId>,
    /// Current position.
    pub position: Vec2Fixed,
    /// Whether the collider is static terrain.
    pub is_terrain: bool,
    /// Whether the collider has a rigid body.
    pub movable: bool,
}

/// In-memory physics backend that answers overlap queries by distance and
/// records every impulse it receives.
#[derive(Debug, Clone, Default)]
pub struct RecordingPhysics {
    bodies: Vec<TrackedBody>,
    impulses: Vec<(BodyId, Vec2Fixed)>,
    next_body: u64,
}

impl RecordingPhysics {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a movable body for `unit`.
    pub fn add_unit_body(&mut self, unit: UnitId, position: Vec2Fixed) -> BodyId {
        self.push(Some(unit), position, false, true)
    }

    /// Add a static terrain collider.
    pub fn add_terrain(&mut self, position: Vec2Fixed) -> BodyId {
        self.push(None, position, true, false)
    }

    /// Add a collider that has no rigid body attached.
    pub fn add_static_collider(&mut self, position: Vec2Fixed) -> BodyId {
        self.push(None, position, false, false)
    }

    fn push(&mut self, unit: Option<UnitId>, position: Vec2Fixed, is_terrain: bool, movable: bool) -> BodyId {
        let id = BodyId(self.next_body);
        self.next_body += 1;
        self.bodies.push(TrackedBody {
            id,
            unit,
            position,
            is_terrain,
            movable,
        });
        id
    }

    /// Every impulse applied so far, in order.
    #[must_use]
    pub fn impulses(&self) -> &[(BodyId, Vec2Fixed)] {
        &self.impulses
    }

    /// Impulses applied to one body.
    #[must_use]
    pub fn impulses_for(&self, body: BodyId) -> Vec<Vec2Fixed> {
        self.impulses
            .iter()
            .filter(|(id, _)| *id == body)
            .map(|(_, impulse)| *impulse)
            .collect()
    }

    /// Forget recorded impulses.
    pub fn clear_impulses(&mut self) {
        self.impulses.clear();
    }
}

impl PhysicsBackend for RecordingPhysics {
    fn overlap_circle(&mut self, center: Vec2Fixed, radius: Fixed) -> Vec<Overlap> {
        let radius_sq = radius.saturating_mul(radius);
        self.bodies
            .iter()
            .filter(|body| body.position.distance_squared(center) <= radius_sq)
            .map(|body| Overlap {
                position: body.position,
                body: body.movable.then_some(body.id),
                unit: body.unit,
                is_terrain: body.is_terrain,
            })
            .collect()
    }

    fn apply_impulse(&mut self, body: BodyId, impulse: Vec2Fixed) {
        tracing::trace!(?body, "Recorded impulse");
        self.impulses.push((body, impulse));
    }
}
