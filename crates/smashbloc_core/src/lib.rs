//! # SmashBloc Core
//!
//! Deterministic unit, ownership and capture simulation for SmashBloc.
//!
//! This crate contains **only** simulation rules:
//! - No rendering, menus or input
//! - No physics integration (collisions come in, impulses go out)
//! - No wall-clock time (periodic behaviour runs on ticks)
//! - No floating-point math (uses fixed-point)
//!
//! The host engine drives a [`world::World`]: it spawns units, reports
//! collisions, calls [`world::World::tick`] once per frame with its physics
//! backend, and subscribes to the notification bus to redraw when cities
//! change hands.
//!
//! ## Crate Structure
//!
//! - [`stats`] - Unit statistics and the clamped health path
//! - [`unit`] / [`unit_kind`] - Units, kinds and capabilities
//! - [`team`] - Teams, players and rosters
//! - [`pool`] - Reusable city instances
//! - [`notify`] - Publish/subscribe notifications
//! - [`scheduler`] - Per-unit periodic tasks
//! - [`world`] - The simulation state and every mutating operation
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod catalog;
pub mod config;
pub mod error;
pub mod math;
pub mod notify;
pub mod physics;
pub mod pool;
pub mod scheduler;
pub mod stats;
pub mod team;
pub mod unit;
pub mod unit_kind;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::catalog::{KindStats, UnitCatalog};
    pub use crate::config::{CityTuning, SimConfig};
    pub use crate::error::{CoreError, Result};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::notify::{
        EventLog, EventTag, GameEvent, Notification, NotificationBus, Observer, Publisher,
        SubscriptionId,
    };
    pub use crate::physics::{BodyId, ImpulseRequest, NoPhysics, Overlap, PhysicsBackend};
    pub use crate::stats::{ArmorType, DamageType, HealthChange, UnitStats};
    pub use crate::team::{Color, Player, PlayerId, Team, TeamId, TeamKey};
    pub use crate::unit::{DamageOutcome, Placement, Unit, UnitId};
    pub use crate::unit_kind::{Capabilities, UnitKind};
    pub use crate::world::{TickReport, World};
}
