use clap::Parser;
use log::info;
use server::config::GameConfig;
use server::game::GameCoordinator;
use server::observer::Observer;
use server::scheduler::TickScheduler;
use shared::GameEvent;
use std::sync::Arc;
use std::time::Duration;

/// Logs every discrete game event.
struct EventLogger;

impl Observer for EventLogger {
    fn on_update(&self, event: Option<&GameEvent>) {
        if let Some(event) = event {
            info!("player {}: {:?}", event.player_id(), event);
        }
    }
}

/// Main-method of the application.
/// Parses command-line arguments, seeds the world, then runs the game and enemy loops until Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Game tick rate (updates per second)
        #[clap(short, long, default_value_t = shared::TICK_RATE)]
        tick_rate: u32,
        /// Enemy engine tick period in milliseconds
        #[clap(short, long, default_value_t = shared::ENEMY_TICK_MS)]
        enemy_tick_ms: u64,
        /// Maximum number of players
        #[clap(short, long, default_value_t = shared::MAX_PLAYERS)]
        max_players: usize,
        /// Seed for world generation and enemy directions
        #[clap(short, long)]
        seed: Option<u64>,
    }

    let args = Args::parse();

    let config = GameConfig {
        tick_rate: args.tick_rate,
        enemy_tick: Duration::from_millis(args.enemy_tick_ms.max(1)),
        max_players: args.max_players,
        ..GameConfig::default()
    };

    let game = Arc::new(match args.seed {
        Some(seed) => GameCoordinator::with_seed(config.clone(), seed)?,
        None => GameCoordinator::new(config.clone())?,
    });
    game.subscribe(Arc::new(EventLogger));
    game.seed_world();

    game.engine().start()?;
    let scheduler = TickScheduler::new(Arc::clone(&game), config.tick_duration(), config.stop_grace);
    scheduler.start()?;

    info!(
        "Simulation running at {} Hz (enemies every {} ms, up to {} players)",
        config.tick_rate,
        config.enemy_tick.as_millis(),
        config.max_players
    );

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C, shutting down gracefully...");

    let game_stop = scheduler.stop().await;
    let engine_stop = game.engine().stop().await;
    info!("Game loop: {:?}, enemy loop: {:?}", game_stop, engine_stop);
    info!("{}", game.engine().telemetry().report());

    Ok(())
}
