use std::path::PathBuf;

use glam::Vec2;
use kaze::net::LagConfig;
use kaze::scene::SceneConfig;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub tick_rate: u32,
    pub bots: usize,
    /// Simulated seconds to run; `None` runs until interrupted.
    pub duration_secs: Option<f32>,
    pub seed: u64,
    /// Pace ticks against the wall clock instead of running flat out.
    pub realtime: bool,
    pub map: Option<PathBuf>,
    pub scene: SceneConfig,
    pub viewport: Vec2,
    /// Lag applied between the relay and the observer.
    pub lag: Option<LagConfig>,
    /// Bots only respawn inside this square, measured from the map origin.
    pub spawn_area: f32,
    pub stats_interval_ticks: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_rate: kaze::net::DEFAULT_TICK_RATE,
            bots: 4,
            duration_secs: Some(60.0),
            seed: 1337,
            realtime: false,
            map: None,
            scene: SceneConfig {
                block_width: Some(20),
                block_height: Some(20),
                ..SceneConfig::default()
            },
            viewport: Vec2::new(800.0, 600.0),
            lag: None,
            spawn_area: 400.0,
            stats_interval_ticks: 600,
        }
    }
}
