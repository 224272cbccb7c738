mod bots;
mod config;
mod rules;
mod server;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use glam::Vec2;

use config::ServerConfig;
use kaze::net::LagConfig;
use server::GameServer;

#[derive(Parser)]
#[command(name = "kaze-server")]
#[command(about = "Headless kaze simulation with bots and an observer client")]
struct Args {
    #[arg(short, long, help = "Map JSON file; an empty 20x20 arena if omitted")]
    map: Option<PathBuf>,

    #[arg(short, long, default_value_t = kaze::net::DEFAULT_TICK_RATE)]
    tick_rate: u32,

    #[arg(short, long, default_value_t = 4)]
    bots: usize,

    #[arg(short, long, default_value_t = 60.0, help = "Simulated seconds, 0 runs forever")]
    duration: f32,

    #[arg(long, default_value_t = 1337)]
    seed: u64,

    #[arg(long, help = "Pace ticks against the wall clock")]
    realtime: bool,

    #[arg(long, help = "Simulate lag between relay and observer")]
    simulate_lag: bool,

    #[arg(long, default_value_t = 60.0, help = "Average deliveries per second")]
    lag_fps: f32,

    #[arg(long, default_value_t = 0.0, help = "Fixed delay in ms")]
    lag_delay: f32,

    #[arg(long, default_value_t = 10)]
    lag_queue: usize,

    #[arg(long, default_value_t = 800.0)]
    viewport_width: f32,

    #[arg(long, default_value_t = 600.0)]
    viewport_height: f32,

    #[arg(long, default_value_t = 600, help = "Ticks between stats lines, 0 disables")]
    stats_interval: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let lag = args.simulate_lag.then(|| LagConfig {
        average_fps: args.lag_fps,
        fixed_delay_ms: args.lag_delay,
        queue_max_len: args.lag_queue,
    });

    let config = ServerConfig {
        tick_rate: args.tick_rate,
        bots: args.bots,
        duration_secs: (args.duration > 0.0).then_some(args.duration),
        seed: args.seed,
        realtime: args.realtime,
        map: args.map,
        viewport: Vec2::new(args.viewport_width, args.viewport_height),
        lag,
        stats_interval_ticks: args.stats_interval,
        ..Default::default()
    };

    let mut server = GameServer::new(config)?;
    log::info!("simulation started at {} Hz", args.tick_rate);
    server.run()?;
    let stats = server.stats();
    log::info!(
        "simulation finished after {:.1}s ({} ticks, {} frames relayed)",
        server.scene().elapsed() / 1000.0,
        stats.ticks,
        stats.frames_sent
    );

    Ok(())
}
