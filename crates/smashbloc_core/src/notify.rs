//! Synchronous publish/subscribe notifications.
//!
//! Simulation mutators publish [`GameEvent`]s on a [`NotificationBus`]; UI
//! and other presentation layers subscribe [`Observer`]s and react. Delivery
//! is synchronous: `publish` returns after every observer registered at the
//! time of the call has seen the event, in registration order.
//!
//! Observers receive the bus itself and may publish or subscribe from inside
//! their handler. Each publish iterates a snapshot of the observer list, so
//! nested calls never skip or double-deliver to observers that were
//! registered before the outer call began.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::team::TeamId;
use crate::unit::UnitId;

/// An event type with a fixed catalog of tags.
pub trait Notification {
    /// Tag enumeration identifying the event kind.
    type Tag: Copy + Eq + fmt::Debug;

    /// Tag of this event.
    fn tag(&self) -> Self::Tag;
}

/// Who published an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Publisher {
    /// The world itself (match-level events).
    World,
    /// A specific unit.
    Unit(UnitId),
    /// The presentation layer (menus, animations).
    Presentation,
}

/// Receiver of notifications.
pub trait Observer<E> {
    /// Handle one event.
    fn on_notify(&self, bus: &NotificationBus<E>, publisher: Publisher, event: &E);
}

impl<E, F> Observer<E> for F
where
    F: Fn(&NotificationBus<E>, Publisher, &E),
{
    fn on_notify(&self, bus: &NotificationBus<E>, publisher: Publisher, event: &E) {
        self(bus, publisher, event);
    }
}

/// Handle returned by [`NotificationBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Single-threaded synchronous event bus.
pub struct NotificationBus<E> {
    observers: RefCell<Vec<(SubscriptionId, Rc<dyn Observer<E>>)>>,
    next_id: Cell<u64>,
    published: Cell<u64>,
}

impl<E> Default for NotificationBus<E> {
    fn default() -> Self {
        Self {
            observers: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
            published: Cell::new(0),
        }
    }
}

impl<E> fmt::Debug for NotificationBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationBus")
            .field("observers", &self.observers.borrow().len())
            .field("published", &self.published.get())
            .finish()
    }
}

impl<E: Notification> NotificationBus<E> {
    /// Create a bus with no observers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer; it sees every event published from now on.
    pub fn subscribe(&self, observer: Rc<dyn Observer<E>>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.observers.borrow_mut().push((id, observer));
        id
    }

    /// Remove an observer. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.borrow_mut();
        let before = observers.len();
        observers.retain(|(sub, _)| *sub != id);
        before != observers.len()
    }

    /// Deliver `event` to every registered observer.
    ///
    /// Returns the number of observers the event was delivered to.
    pub fn publish(&self, publisher: Publisher, event: E) -> usize {
        let snapshot: Vec<Rc<dyn Observer<E>>> = self
            .observers
            .borrow()
            .iter()
            .map(|(_, observer)| Rc::clone(observer))
            .collect();

        self.published.set(self.published.get() + 1);
        tracing::trace!(
            tag = ?event.tag(),
            ?publisher,
            observers = snapshot.len(),
            "Publishing notification"
        );

        for observer in &snapshot {
            observer.on_notify(self, publisher, &event);
        }

        snapshot.len()
    }

    /// Number of registered observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.borrow().len()
    }

    /// Total number of publish calls made on this bus.
    #[must_use]
    pub fn published_count(&self) -> u64 {
        self.published.get()
    }
}

/// Tags of the game event catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTag {
    /// A city changed owner.
    CityCaptured,
    /// The player opened a city's menu.
    CityMenuOpened,
    /// The player opened a unit's menu.
    UnitMenuOpened,
    /// A mobile unit was destroyed.
    UnitDestroyed,
    /// The match was reset.
    MatchReset,
    /// A presentation animation finished playing.
    AnimationFinished,
}

/// Events published by the simulation and the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// A city was captured. Published before ownership fields move.
    CityCaptured {
        /// The captured city.
        city: UnitId,
        /// Owner before the capture.
        previous_owner: Option<TeamId>,
        /// Owner after the capture.
        new_owner: TeamId,
    },
    /// A city menu was opened.
    CityMenuOpened {
        /// City shown in the menu.
        city: UnitId,
    },
    /// A unit menu was opened.
    UnitMenuOpened {
        /// Unit shown in the menu.
        unit: UnitId,
    },
    /// A mobile unit died and was removed from its team.
    UnitDestroyed {
        /// The destroyed unit.
        unit: UnitId,
        /// Team that owned it.
        team: Option<TeamId>,
        /// Unit credited with the kill.
        killer: Option<UnitId>,
    },
    /// The match was reset.
    MatchReset,
    /// A presentation animation finished.
    AnimationFinished,
}

impl Notification for GameEvent {
    type Tag = EventTag;

    fn tag(&self) -> EventTag {
        match self {
            Self::CityCaptured { .. } => EventTag::CityCaptured,
            Self::CityMenuOpened { .. } => EventTag::CityMenuOpened,
            Self::UnitMenuOpened { .. } => EventTag::UnitMenuOpened,
            Self::UnitDestroyed { .. } => EventTag::UnitDestroyed,
            Self::MatchReset => EventTag::MatchReset,
            Self::AnimationFinished => EventTag::AnimationFinished,
        }
    }
}

/// Observer that records every event it sees.
#[derive(Debug)]
pub struct EventLog<E> {
    entries: RefCell<Vec<(Publisher, E)>>,
}

impl<E> Default for EventLog<E> {
    fn default() -> Self {
        Self {
            entries: RefCell::new(Vec::new()),
        }
    }
}

impl<E: Clone + Notification> EventLog<E> {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every recorded (publisher, event) pair, in delivery order.
    #[must_use]
    pub fn entries(&self) -> Vec<(Publisher, E)> {
        self.entries.borrow().clone()
    }

    /// Recorded events without publishers.
    #[must_use]
    pub fn events(&self) -> Vec<E> {
        self.entries.borrow().iter().map(|(_, e)| e.clone()).collect()
    }

    /// Recorded tags, in delivery order.
    #[must_use]
    pub fn tags(&self) -> Vec<E::Tag> {
        self.entries.borrow().iter().map(|(_, e)| e.tag()).collect()
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Check if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl<E: Clone> Observer<E> for EventLog<E> {
    fn on_notify(&self, _bus: &NotificationBus<E>, publisher: Publisher, event: &E) {
        self.entries.borrow_mut().push((publisher, event.clone()));
    }
}
