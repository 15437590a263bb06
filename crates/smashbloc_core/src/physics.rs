//! Boundary to the host physics engine.
//!
//! The simulation never integrates motion itself. Knockback asks the host
//! for bodies inside a circle and hands impulses back through
//! [`PhysicsBackend`]; collisions are reported to the world by the host via
//! [`World::on_collision`](crate::world::World::on_collision).

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::unit::UnitId;

/// Handle of a rigid body owned by the host engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId(pub u64);

/// One collider found by an overlap query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overlap {
    /// Collider center.
    pub position: Vec2Fixed,
    /// Rigid body attached to the collider, if any.
    pub body: Option<BodyId>,
    /// Simulation unit the collider belongs to, if any.
    pub unit: Option<UnitId>,
    /// Whether the collider is static terrain.
    pub is_terrain: bool,
}

impl Overlap {
    /// A pushable body belonging to `unit`.
    #[must_use]
    pub const fn unit_body(unit: UnitId, body: BodyId, position: Vec2Fixed) -> Self {
        Self {
            position,
            body: Some(body),
            unit: Some(unit),
            is_terrain: false,
        }
    }

    /// A static terrain collider.
    #[must_use]
    pub const fn terrain(position: Vec2Fixed) -> Self {
        Self {
            position,
            body: None,
            unit: None,
            is_terrain: true,
        }
    }
}

/// Impulse the simulation asked the host to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpulseRequest {
    /// City that produced the impulse.
    pub source: UnitId,
    /// Body receiving the impulse.
    pub body: BodyId,
    /// Impulse vector (direction times force).
    pub impulse: Vec2Fixed,
    /// Magnitude used, kept for reporting.
    #[serde(with = "fixed_serde")]
    pub force: Fixed,
}

/// Queries and commands the simulation needs from a physics engine.
pub trait PhysicsBackend {
    /// Colliders whose shape intersects the circle.
    fn overlap_circle(&mut self, center: Vec2Fixed, radius: Fixed) -> Vec<Overlap>;

    /// Apply an instantaneous impulse to a body.
    fn apply_impulse(&mut self, body: BodyId, impulse: Vec2Fixed);
}

/// Backend with no bodies at all. Knockback pulses find nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPhysics;

impl PhysicsBackend for NoPhysics {
    fn overlap_circle(&mut self, _center: Vec2Fixed, _radius: Fixed) -> Vec<Overlap> {
        Vec::new()
    }

    fn apply_impulse(&mut self, _body: BodyId, _impulse: Vec2Fixed) {}
}
