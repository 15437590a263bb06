//! End-to-end match scenarios.
//!
//! Each test drives a two-team world through the public API only, the way
//! a host engine would.

use smashbloc_core::config::SimConfig;
use smashbloc_core::notify::{EventTag, GameEvent, Publisher};
use smashbloc_core::team::{Color, Team, TeamId, TeamKey};
use smashbloc_core::unit_kind::UnitKind;
use smashbloc_test_utils::fixtures::{fixed, vec2, RecordingPhysics, TwoTeamMatch};

// =============================================================================
// Capture
// =============================================================================

#[test]
fn overkill_damage_hands_city_to_attacker() {
    let mut game = TwoTeamMatch::new();
    let log = game.record_events();
    let city = game.city(game.red, 0, 0);
    let raider = game.mobile(game.blue, UnitKind::Infantry);

    let outcome = game.world.take_damage(city, fixed(520), Some(raider));

    assert!(outcome.is_lethal());
    let captured = game.world.unit(city).unwrap();
    assert_eq!(captured.team(), Some(game.blue));
    assert_eq!(captured.health(), fixed(50));
    assert_eq!(game.world.team(game.blue).unwrap().capturable_assets(), &[city]);
    assert!(game.world.team(game.red).unwrap().capturable_assets().is_empty());
    assert_eq!(
        log.events(),
        vec![GameEvent::CityCaptured {
            city,
            previous_owner: Some(game.red),
            new_owner: game.blue,
        }]
    );
}

#[test]
fn captured_city_can_be_retaken() {
    let mut game = TwoTeamMatch::new();
    let log = game.record_events();
    let city = game.city(game.red, 0, 0);
    let raider = game.mobile(game.blue, UnitKind::Twirl);
    let defender = game.mobile(game.red, UnitKind::Boomy);

    game.world.take_damage(city, fixed(500), Some(raider));
    game.world.take_damage(city, fixed(50), Some(defender));

    assert_eq!(game.world.unit(city).unwrap().team(), Some(game.red));
    assert_eq!(game.world.unit(city).unwrap().health(), fixed(50));
    assert_eq!(log.tags(), vec![EventTag::CityCaptured, EventTag::CityCaptured]);
}

#[test]
fn contact_damage_eventually_captures() {
    let mut game = TwoTeamMatch::new();
    let city = game.city(game.red, 0, 0);
    let raider = game.mobile(game.blue, UnitKind::Infantry);

    let mut hits = 0;
    while game.world.unit(city).unwrap().team() == Some(game.red) {
        game.world.on_collision(city, Some(raider));
        hits += 1;
        assert!(hits <= 50, "500 health falls to 10..20 per hit within 50 hits");
    }

    assert!(hits >= 25);
    assert!(game.world.team(game.blue).unwrap().owns(city));
}

// =============================================================================
// Regeneration
// =============================================================================

#[test]
fn damaged_city_regenerates_after_delay() {
    let mut game = TwoTeamMatch::new();
    let city = game.city(game.red, 0, 0);
    game.world.take_damage(city, fixed(420), None);

    let delay = game.world.config().regeneration_delay_ticks();
    let per_tick = game.world.config().regeneration_per_tick();

    let mut previous = game.world.unit(city).unwrap().health();
    for _ in 0..=delay {
        game.run(1);
        assert_eq!(game.world.unit(city).unwrap().health(), previous);
    }

    // Strictly increasing by the per-tick rate until full.
    loop {
        game.run(1);
        let health = game.world.unit(city).unwrap().health();
        if health == fixed(500) {
            break;
        }
        assert_eq!(health, previous + per_tick);
        previous = health;
    }

    game.run(100);
    assert_eq!(game.world.unit(city).unwrap().health(), fixed(500));
}

#[test]
fn freshly_captured_city_waits_before_healing() {
    let mut game = TwoTeamMatch::new();
    let city = game.city(game.red, 0, 0);
    let raider = game.mobile(game.blue, UnitKind::Infantry);
    game.run(200);

    game.world.take_damage(city, fixed(600), Some(raider));
    let delay = game.world.config().regeneration_delay_ticks();
    game.run(delay + 1);
    assert_eq!(game.world.unit(city).unwrap().health(), fixed(50));

    game.run(1);
    assert!(game.world.unit(city).unwrap().health() > fixed(50));
}

#[test]
fn faster_tick_rate_heals_less_per_tick() {
    let mut game = TwoTeamMatch::with_config(SimConfig {
        tick_rate: 50,
        ..SimConfig::default()
    });
    let city = game.city(game.red, 0, 0);
    game.world.take_damage(city, fixed(100), None);

    let delay = game.world.config().regeneration_delay_ticks();
    assert_eq!(delay, 100);
    game.run(delay + 2);

    let per_second = fixed(10);
    let healed = game.world.unit(city).unwrap().health() - fixed(400);
    assert_eq!(healed, per_second / fixed(50));
}

// =============================================================================
// Knockback
// =============================================================================

#[test]
fn knockback_pushes_friend_and_foe_alike() {
    let mut game = TwoTeamMatch::new();
    let city = game.city(game.red, 100, 100);
    let friend = game.mobile(game.red, UnitKind::Infantry);
    let foe = game.mobile(game.blue, UnitKind::Infantry);

    let mut physics = RecordingPhysics::new();
    let friend_body = physics.add_unit_body(friend, vec2(100, 130));
    let foe_body = physics.add_unit_body(foe, vec2(70, 100));
    let far_body = physics.add_unit_body(foe, vec2(300, 300));
    physics.add_terrain(vec2(110, 100));
    physics.add_static_collider(vec2(100, 90));
    physics.add_unit_body(city, vec2(100, 100));

    for _ in 0..game.world.config().push_cooldown_ticks() {
        game.world.tick(&mut physics);
    }

    let pushed_up = physics.impulses_for(friend_body);
    let pushed_left = physics.impulses_for(foe_body);
    assert_eq!(pushed_up.len(), 1);
    assert_eq!(pushed_left.len(), 1);
    assert!(physics.impulses_for(far_body).is_empty());
    assert_eq!(physics.impulses().len(), 2);

    assert_eq!(pushed_up[0].x, fixed(0));
    assert!(pushed_up[0].y > fixed(399));
    assert!(pushed_left[0].x < fixed(-399));
    assert_eq!(pushed_left[0].y, fixed(0));
}

#[test]
fn deactivated_city_no_longer_pushes() {
    let mut game = TwoTeamMatch::new();
    let city = game.city(game.red, 0, 0);
    let foe = game.mobile(game.blue, UnitKind::Infantry);
    let mut physics = RecordingPhysics::new();
    physics.add_unit_body(foe, vec2(10, 10));

    let cooldown = game.world.config().push_cooldown_ticks();
    for _ in 0..cooldown {
        game.world.tick(&mut physics);
    }
    assert_eq!(physics.impulses().len(), 1);

    game.world.deactivate_team(game.red).unwrap();
    for _ in 0..cooldown * 3 {
        game.world.tick(&mut physics);
    }
    assert_eq!(physics.impulses().len(), 1);
    assert!(game.world.unit(city).is_none());
}

// =============================================================================
// Pool
// =============================================================================

#[test]
fn pool_reuse_never_leaks_previous_tenancy() {
    let mut game = TwoTeamMatch::new();
    let raider = game.mobile(game.blue, UnitKind::Infantry);

    let first = game.city(game.red, 0, 0);
    game.world.set_income_level(first, 3);
    game.world.take_damage(first, fixed(999), Some(raider));
    game.world.deactivate_unit(first);

    let second = game.city(game.red, 0, 0);
    game.world.set_income_level(second, 5);
    game.world.take_damage(second, fixed(123), None);
    game.world.deactivate_unit(second);

    let third = game.city(game.red, 40, 40);
    let city = game.world.unit(third).unwrap();

    assert_ne!(first, second);
    assert_ne!(second, third);
    assert_eq!(city.income_level(), Some(8));
    assert_eq!(city.health(), city.max_health());
    assert_eq!(city.team(), Some(game.red));
    assert_eq!(city.as_city().unwrap().position(), vec2(40, 40));
    assert!(game.world.unit(first).is_none());
    assert!(!game.world.team(game.blue).unwrap().owns(first));
    assert_eq!(game.world.city_pool().stats().reused, 2);
    assert_eq!(game.world.city_pool().stats().created, 1);
}

// =============================================================================
// Teams
// =============================================================================

#[test]
fn teams_compare_by_name_and_color() {
    let a = Team::new(TeamId(0), "Red", Color::RED);
    let b = Team::new(TeamId(5), "Red", Color::RED);
    assert!(a.is_same_team(&b));
    assert_eq!(a.key(), TeamKey::new("Red", Color::RED));

    let game = TwoTeamMatch::new();
    assert_eq!(
        game.world.find_team(&TeamKey::new("Blue", Color::BLUE)),
        Some(game.blue)
    );
}

#[test]
fn deactivating_team_empties_collections() {
    let mut game = TwoTeamMatch::new();
    let captain = game.world.add_player("Captain", game.red).unwrap();
    for x in 0..3 {
        game.city(game.red, x * 200, 0);
        game.mobile(game.red, UnitKind::Infantry);
    }
    game.mobile(game.blue, UnitKind::Boomy);

    game.world.deactivate_team(game.red).unwrap();

    let red = game.world.team(game.red).unwrap();
    assert!(red.mobile_units().is_empty());
    assert!(red.capturable_assets().is_empty());
    assert!(!red.is_active());
    assert!(!game.world.player(captain).unwrap().is_active());
    assert_eq!(game.world.units().len(), 1);
    assert_eq!(game.world.team_income(game.red), 0);
}

#[test]
fn reset_publishes_once_after_teardown() {
    let mut game = TwoTeamMatch::new();
    let log = game.record_events();
    game.city(game.red, 0, 0);
    game.mobile(game.blue, UnitKind::Infantry);

    game.world.reset_match();

    assert_eq!(log.entries(), vec![(Publisher::World, GameEvent::MatchReset)]);
    assert!(game.world.units().is_empty());

    game.world.activate_team(game.red).unwrap();
    assert!(game.world.team(game.red).unwrap().is_active());
    assert!(game.world.team(game.red).unwrap().capturable_assets().is_empty());
}
