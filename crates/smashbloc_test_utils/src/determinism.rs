//! Determinism testing utilities.
//!
//! Provides a harness for verifying that two worlds built the same way and
//! fed the same operations end in identical states.
//!
//! # Sources of non-determinism
//!
//! - **Floating-point math**: health, damage and impulses use
//!   [`smashbloc_core::math::Fixed`].
//! - **HashMap iteration order**: the world hashes units in sorted id order.
//! - **Randomness**: contact damage comes from a ChaCha RNG seeded by
//!   [`SimConfig::seed`](smashbloc_core::config::SimConfig::seed).
//!
//! The world keeps its notification bus behind `Rc`, so parallel runs build
//! each world inside its own thread.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use smashbloc_core::physics::PhysicsBackend;
use smashbloc_core::world::World;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic world).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that every run matched, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "World is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a state machine multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `ticks` - Number of steps per run
/// * `setup` - Function to create the initial state
/// * `step` - Function to advance the state by one step
/// * `hash` - Function to compute a state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// A world paired with the physics backend that drives it.
#[derive(Debug)]
pub struct Harness<P> {
    /// The world under test.
    pub world: World,
    /// Physics backend passed to every tick.
    pub physics: P,
}

impl<P: PhysicsBackend> Harness<P> {
    /// Advance one tick.
    pub fn step(&mut self) {
        self.world.tick(&mut self.physics);
    }
}

/// Run a world setup twice and compare final state hashes.
pub fn verify_world_determinism<P, F>(setup_fn: F, num_ticks: u64) -> bool
where
    P: PhysicsBackend,
    F: Fn() -> Harness<P>,
{
    verify_determinism(2, num_ticks, &setup_fn, Harness::step, |h| {
        h.world.state_hash()
    })
    .is_deterministic
}

/// Result of parallel runs.
#[derive(Debug, Clone)]
pub struct ParallelSimResult {
    /// Final state hash from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks each run lasted.
    pub ticks: u64,
    /// Number of runs.
    pub num_sims: usize,
}

impl ParallelSimResult {
    /// Check if all runs produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all runs matched.
    ///
    /// # Panics
    ///
    /// Panics if runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel worlds diverged!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_sims,
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run N worlds on scoped threads and collect final hashes.
///
/// Each thread builds its own world from `setup_fn`.
///
/// # Panics
///
/// Panics if a worker thread panics.
pub fn run_parallel_worlds_scoped<P, F>(
    setup_fn: F,
    num_sims: usize,
    num_ticks: u64,
) -> ParallelSimResult
where
    P: PhysicsBackend,
    F: Fn() -> Harness<P> + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut harness = setup_fn();
                    for _ in 0..num_ticks {
                        harness.step();
                    }
                    harness.world.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("world thread panicked"))
            .collect()
    });

    ParallelSimResult {
        hashes,
        ticks: num_ticks,
        num_sims,
    }
}

/// Compare two runs tick-by-tick, finding the first divergence.
///
/// # Returns
///
/// `None` if the runs agree throughout, `Some(tick)` at the first tick
/// whose hashes differ (0 means the initial states already differ).
pub fn find_first_divergence<P, F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    P: PhysicsBackend,
    F: Fn() -> Harness<P>,
{
    let mut first = setup_fn();
    let mut second = setup_fn();

    if first.world.state_hash() != second.world.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        first.step();
        second.step();

        if first.world.state_hash() != second.world.state_hash() {
            return Some(tick);
        }
    }

    None
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for world operations.
pub mod strategies {
    use proptest::prelude::*;
    use smashbloc_core::math::{Fixed, Vec2Fixed};

    /// Generate a fixed-point coordinate in a typical map range.
    pub fn arb_fixed_position() -> impl Strategy<Value = Fixed> {
        (-2000i32..2000i32).prop_map(Fixed::from_num)
    }

    /// Generate a 2D position.
    pub fn arb_vec2_position() -> impl Strategy<Value = Vec2Fixed> {
        (arb_fixed_position(), arb_fixed_position()).prop_map(|(x, y)| Vec2Fixed::new(x, y))
    }

    /// Generate a signed damage amount, including heals and overkill.
    ///
    /// Amounts carry a fractional part so clamping is exercised off the
    /// integer grid.
    pub fn arb_damage_amount() -> impl Strategy<Value = Fixed> {
        (-1_000i64..2_000i64, 0u32..4u32)
            .prop_map(|(whole, quarter)| Fixed::from_num(whole) + Fixed::from_num(quarter) / Fixed::from_num(4))
    }

    /// Generate a sequence of damage amounts.
    pub fn arb_damage_sequence(max_len: usize) -> impl Strategy<Value = Vec<Fixed>> {
        proptest::collection::vec(arb_damage_amount(), 1..max_len)
    }

    /// Generate an income level request, including out-of-range values.
    pub fn arb_income_request() -> impl Strategy<Value = u8> {
        any::<u8>()
    }

    /// One step of a scripted match.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum MatchOp {
        /// Damage the watched city, credited to the enemy unit.
        DamageCity(Fixed),
        /// Enemy unit bumps into the watched city.
        Collide,
        /// Advance the world by this many ticks.
        Tick(u32),
    }

    /// Generate one scripted step.
    pub fn arb_match_op() -> impl Strategy<Value = MatchOp> {
        prop_oneof![
            arb_damage_amount().prop_map(MatchOp::DamageCity),
            Just(MatchOp::Collide),
            (1u32..60u32).prop_map(MatchOp::Tick),
        ]
    }

    /// Generate a script of match steps.
    pub fn arb_match_script(max_len: usize) -> impl Strategy<Value = Vec<MatchOp>> {
        proptest::collection::vec(arb_match_op(), 1..max_len)
    }
}
