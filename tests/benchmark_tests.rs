//! Performance benchmarks for the hot paths of both simulation loops

use server::config::GameConfig;
use server::engine::EnemyEngine;
use server::game::GameCoordinator;
use server::player::InputBuffer;
use shared::{Direction, Lane};
use std::time::{Duration, Instant};

fn crowded_engine(enemies: usize) -> EnemyEngine {
    let engine = EnemyEngine::new(Duration::from_millis(100), Duration::from_secs(1));
    for lane in 0..8 {
        engine.register_lane(Lane::new(lane, 0.0, 500.0).unwrap());
    }
    for i in 0..enemies {
        let lane = i % 8;
        let y = (i % 500) as f32;
        if i % 2 == 0 {
            engine
                .create_patrol(lane, y, 60.0, Direction::Up)
                .unwrap();
        } else {
            engine
                .create_faller_with_threshold(lane, y, 0.0, 500.0)
                .unwrap();
        }
    }
    engine.force_tick(0.0);
    engine
}

#[test]
fn benchmark_engine_tick() {
    let engine = crowded_engine(1000);

    let iterations = 1_000;
    let start = Instant::now();
    for _ in 0..iterations {
        engine.force_tick(0.1);
    }
    let duration = start.elapsed();

    println!(
        "Engine tick (1000 enemies): {} iterations in {:?} ({:.2} µs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert_eq!(engine.snapshot().tick, iterations + 1);
    assert!(duration.as_millis() < 5_000);
}

#[test]
fn benchmark_engine_snapshot() {
    let engine = crowded_engine(1000);

    let iterations = 1_000;
    let start = Instant::now();
    let mut total = 0;
    for _ in 0..iterations {
        total += engine.snapshot().enemies.len();
    }
    let duration = start.elapsed();

    println!(
        "Engine snapshot (1000 enemies): {} iterations in {:?} ({:.2} µs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert_eq!(total, 1000 * iterations);
    assert!(duration.as_millis() < 5_000);
}

#[test]
fn benchmark_coordinator_tick() {
    let game = GameCoordinator::with_seed(GameConfig::default(), 11).unwrap();
    game.add_player(1).unwrap();
    game.add_player(2).unwrap();
    for i in 0..200 {
        // Keep the crowd away from the spawn point
        let lane = 3 + i % 5;
        game.engine()
            .create_patrol(lane, (i % 400) as f32, 60.0, Direction::Down)
            .unwrap();
    }
    for lane in 3..8 {
        for step in 0..10 {
            game.add_fruit(lane, step as f32 * 20.0, 10).unwrap();
        }
    }
    game.engine().force_tick(0.0);

    let iterations = 2_000;
    let start = Instant::now();
    for i in 0..iterations {
        let action = if i % 2 == 0 { "LEFT" } else { "RIGHT" };
        game.register_input(1, action);
        game.register_input(2, action);
        game.tick(0.05);
    }
    let duration = start.elapsed();

    println!(
        "Coordinator tick (2 players, 200 enemies, 50 fruit): {} iterations in {:?} ({:.2} µs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert_eq!(game.tick_count(), iterations);
    assert!(duration.as_millis() < 5_000);
}

#[test]
fn benchmark_input_buffer() {
    let buffer = InputBuffer::new();
    let actions = ["LEFT", "RIGHT", "UP", "DOWN", "JUMP", "GRAB"];

    let iterations = 100_000;
    let start = Instant::now();
    let mut consumed = 0;
    for i in 0..iterations {
        buffer.register_str(actions[i % actions.len()]);
        if i % 4 == 0 && !buffer.consume().is_empty() {
            consumed += 1;
        }
    }
    let duration = start.elapsed();

    println!(
        "Input register/consume: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert_eq!(consumed, iterations / 4);
    assert!(duration.as_millis() < 2_000);
}

#[test]
fn benchmark_game_state_serialization() {
    let game = GameCoordinator::with_seed(GameConfig::default(), 17).unwrap();
    game.add_player(1).unwrap();
    game.seed_world();
    game.engine().force_tick(0.0);
    game.tick(0.05);

    let iterations = 10_000;
    let start = Instant::now();
    let mut bytes = 0;
    for _ in 0..iterations {
        let json = serde_json::to_string(&game.game_state()).unwrap();
        bytes += json.len();
    }
    let duration = start.elapsed();

    println!(
        "Game state view + JSON: {} iterations in {:?} ({:.2} µs/iter, {} bytes each)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64,
        bytes / iterations
    );

    assert!(bytes > 0);
    assert!(duration.as_millis() < 5_000);
}
