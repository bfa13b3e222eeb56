//! # Jungle Arcade Server Core
//!
//! This library is the authoritative simulation behind the jungle arcade
//! server. It advances the game at a fixed rate, resolves player physics and
//! player/enemy/fruit interactions, and hands consistent state to whatever
//! transport sits in front of it.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Every decision about positions, hits, pickups and wins is made here.
//! Clients only send button presses and render what the server reports.
//!
//! ### Two Independent Clocks
//! The game itself ticks at 20 Hz while the crocodile engine runs its own,
//! slower loop. The two share data only through the engine's command queue
//! and the immutable snapshots it produces, so neither loop ever blocks on
//! the other's physics.
//!
//! ### Event Stream
//! Hits, pickups, eliminations and wins are raised as [`shared::GameEvent`]s
//! and pushed to subscribed observers after every tick, followed by a signal
//! to pull the full [`shared::GameStateView`].
//!
//! ## Architecture Design
//!
//! ### Command Queue and Snapshots
//! Enemy creation and removal are queued from any thread and applied only by
//! the engine's own tick. Readers get deep copies, never references, so
//! there are no torn reads and no per-field locking.
//!
//! ### Buffered Input
//! Network readers write one-shot flags into a per-player buffer. The game
//! tick drains each buffer once, so a flood of identical messages inside a
//! tick window collapses into a single action.
//!
//! ### Fault Isolation
//! Both loops run every tick under `catch_unwind`. A tick that fails or
//! panics is logged and skipped; the schedule carries on.
//!
//! ## Module Organization
//!
//! ### Engine Module (`engine`)
//! The crocodile engine and its tick pipeline:
//! - Deferred creation of patrolling and falling enemies
//! - Deferred, idempotent removal
//! - Compounding difficulty multiplier
//! - Snapshots and a synchronous `force_tick` for tests
//!
//! ### Player Module (`player`)
//! Per-player physics and the input buffer:
//! - Ground, rope, jump, dead and celebrating states
//! - Acceleration and friction on the horizontal axis, gravity on the vertical
//! - Lane switching with a cooldown and a buffered mid-air grab
//!
//! ### Game Module (`game`)
//! The coordinator that owns players, fruit, lanes and the engine:
//! - The per-tick collision, pickup, hazard and objective pipeline
//! - The win celebration and the map-wide reset that follows it
//! - Administrative operations with operator-readable errors
//!
//! ### Scheduler Module (`scheduler`)
//! The fixed-rate loop shared by the game and the engine, with bounded,
//! cooperative shutdown.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::GameConfig;
//! use server::game::GameCoordinator;
//! use server::scheduler::TickScheduler;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GameConfig::default();
//!     let game = Arc::new(GameCoordinator::new(config.clone())?);
//!     game.seed_world();
//!     game.add_player(1)?;
//!
//!     // The enemy engine runs on its own clock
//!     game.engine().start()?;
//!
//!     let scheduler = TickScheduler::new(
//!         Arc::clone(&game),
//!         config.tick_duration(),
//!         config.stop_grace,
//!     );
//!     scheduler.start()?;
//!
//!     game.register_input(1, "JUMP");
//!     tokio::time::sleep(std::time::Duration::from_secs(1)).await;
//!
//!     scheduler.stop().await;
//!     game.engine().stop().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod enemy;
pub mod engine;
pub mod entity;
pub mod game;
pub mod observer;
pub mod player;
pub mod scheduler;
pub mod telemetry;
pub mod utils;
