use std::fs;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use kaze::net::{LagConfig, LagMaker, Receiver, Relay};
use kaze::scene::{
    Armory, Character, CharacterConfig, MapFile, NoHooks, Scene, SceneConfig, SceneEvent,
    StandardLoadout, WeaponId, standard_armory,
};
use kaze::simulation::FixedTimestep;
use kaze::spatial::EntityId;

use crate::bots::BotDriver;
use crate::config::ServerConfig;
use crate::rules::DuelRules;

#[derive(Debug, Clone, Copy, Default)]
pub struct ServerStats {
    pub ticks: u64,
    pub frames_sent: u64,
    pub bytes_sent: u64,
    pub frames_delivered: u64,
    pub bullets_alive: usize,
    pub bullets_fired: u64,
    pub explosions: u64,
    pub teleports: u64,
}

impl ServerStats {
    fn record(&mut self, event: &SceneEvent) {
        match event {
            SceneEvent::BulletSpawned { id, owner, weapon } => {
                self.bullets_fired += 1;
                log::trace!("{owner} fired {weapon} as {id}");
            }
            SceneEvent::BulletRemoved { id, reason, .. } => {
                log::trace!("bullet {id} gone: {reason:?}");
            }
            SceneEvent::ExplosionSpawned {
                id,
                owner,
                explosion_type,
            } => {
                self.explosions += 1;
                log::debug!("{owner} set off {explosion_type} as {id}");
            }
            SceneEvent::ExplosionRemoved { .. } | SceneEvent::PrefireChanged { .. } => {}
            SceneEvent::Teleported { id, from, to } => {
                self.teleports += 1;
                log::debug!("{id} teleported {from} -> {to}");
            }
        }
    }
}

/// Client mirror fed through the lag simulator, standing in for a remote
/// player's view of the first bot.
struct Observer {
    scene: Scene,
    receiver: Receiver,
    link: LagMaker<Vec<u8>>,
    watching: EntityId,
}

pub struct GameServer {
    config: ServerConfig,
    scene: Scene,
    rules: DuelRules,
    bots: BotDriver,
    relay: Relay,
    observer: Option<Observer>,
    timestep: FixedTimestep,
    stats: ServerStats,
}

impl GameServer {
    pub fn new(config: ServerConfig) -> Result<Self> {
        let (armory, loadout) = standard_armory().context("building the standard armory")?;
        let map = match &config.map {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("reading map {}", path.display()))?;
                Some(MapFile::from_json(&text).with_context(|| format!("parsing map {}", path.display()))?)
            }
            None => None,
        };
        let mut scene = build_scene(&config.scene, armory.clone(), map.as_ref())?;

        let mut rules = DuelRules::new(config.seed, config.spawn_area);
        let mut bots = BotDriver::new(config.seed.wrapping_add(1));
        let character_config = CharacterConfig::default();
        for i in 0..config.bots {
            let name = format!("bot-{i}");
            let position = rules.random_position(character_config.size);
            let weapons = weapons(&loadout);
            let slots = weapons.len() as u8;
            let entity = scene
                .spawn_character(
                    Character::new(name.clone(), (i % 4) as u8, character_config.clone(), weapons),
                    position,
                )
                .with_context(|| format!("spawning {name}"))?;
            log::info!("{name} joined as {entity}");
            bots.add(entity, name, slots);
        }

        let mut relay = Relay::new(config.viewport);
        let observer = match bots.bots().first() {
            Some(bot) => {
                relay.add_client(bot.entity);
                let mut mirror = build_scene(&config.scene, armory, map.as_ref())?;
                let mut receiver = Receiver::new(character_config);
                let state = Relay::game_state(&scene, bot.entity)
                    .to_json()
                    .context("encoding game state")?;
                receiver
                    .apply_admin_json(&mut mirror, &state)
                    .context("observer rejected game state")?;
                Some(Observer {
                    scene: mirror,
                    receiver,
                    link: LagMaker::new(config.lag.clone().unwrap_or(LagConfig {
                        average_fps: 1000.0,
                        ..LagConfig::default()
                    }), config.seed),
                    watching: bot.entity,
                })
            }
            None => None,
        };

        Ok(Self {
            timestep: FixedTimestep::new(config.tick_rate),
            scene,
            rules,
            bots,
            relay,
            observer,
            stats: ServerStats::default(),
            config,
        })
    }

    pub fn stats(&self) -> ServerStats {
        self.stats
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn run(&mut self) -> Result<()> {
        let dt = self.timestep.dt_ms();
        log::info!(
            "running at {} Hz ({}), {} bots",
            self.timestep.tick_rate(),
            if self.config.realtime { "realtime" } else { "headless" },
            self.bots.bots().len(),
        );
        let mut last = Instant::now();
        while !self.done() {
            if self.config.realtime {
                let now = Instant::now();
                self.timestep.accumulate((now - last).as_secs_f32() * 1000.0);
                last = now;
                while self.timestep.consume_tick() && !self.done() {
                    self.tick(dt)?;
                }
                std::thread::sleep(Duration::from_millis(1));
            } else {
                self.tick(dt)?;
            }
        }
        self.log_stats();
        Ok(())
    }

    fn done(&self) -> bool {
        self.scene.is_finished()
            || self
                .config
                .duration_secs
                .is_some_and(|secs| self.scene.elapsed() >= secs * 1000.0)
    }

    pub fn tick(&mut self, dt: f32) -> Result<()> {
        for (entity, frame) in self.bots.frames(dt)? {
            self.relay.receive_controls(&mut self.scene, entity, &frame)?;
        }
        self.scene.update(&mut self.rules, dt)?;
        for event in self.scene.drain_events() {
            self.stats.record(&event);
        }

        let mut outbound = self.relay.collect(&self.scene, dt)?;
        if let Some(observer) = &mut self.observer {
            for frame in outbound.remove(&observer.watching).unwrap_or_default() {
                self.stats.frames_sent += 1;
                self.stats.bytes_sent += frame.len() as u64;
                observer.link.send(frame);
            }
            for frame in observer.link.advance(dt) {
                observer.receiver.apply_frame(&mut observer.scene, &frame)?;
                self.stats.frames_delivered += 1;
            }
            observer.scene.update(&mut NoHooks, dt)?;
            // The mirror only replays; its events duplicate the server's.
            observer.scene.drain_events();
        }

        self.stats.ticks += 1;
        self.stats.bullets_alive = self.scene.bullets().count();
        if self.config.stats_interval_ticks > 0 && self.stats.ticks % self.config.stats_interval_ticks == 0 {
            self.log_stats();
        }
        Ok(())
    }

    fn log_stats(&self) {
        let stats = &self.stats;
        log::info!(
            "t={:.1}s ticks={} bullets={}/{} explosions={} hits={} frames sent={} delivered={} ({} bytes)",
            self.scene.elapsed() / 1000.0,
            stats.ticks,
            stats.bullets_alive,
            stats.bullets_fired,
            stats.explosions,
            self.rules.hits(),
            stats.frames_sent,
            stats.frames_delivered,
            stats.bytes_sent,
        );
        for bot in self.bots.bots() {
            let tally = self.rules.tally(bot.entity);
            log::info!("  {} {}-{}", bot.name, tally.kills, tally.deaths);
        }
        if let Some(observer) = &self.observer {
            let drift = observer
                .receiver
                .local_id(observer.watching.0)
                .and_then(|local| observer.scene.rect_of(local).ok())
                .zip(self.scene.rect_of(observer.watching).ok())
                .map(|(mirror, truth)| mirror.position.distance(truth.position));
            if let Some(drift) = drift {
                log::info!("  observer drift {drift:.2}px, {} frames in flight", observer.link.pending());
            }
        }
    }
}

fn weapons(loadout: &StandardLoadout) -> Vec<WeaponId> {
    vec![loadout.burst, loadout.auto, loadout.launcher]
}

fn build_scene(config: &SceneConfig, armory: Armory, map: Option<&MapFile>) -> Result<Scene> {
    let scene = match map {
        Some(map) => {
            let (scene, markers) = Scene::from_map(config.clone(), armory, map)
                .with_context(|| format!("building scene for map `{}`", map.map_content.name))?;
            log::debug!("{} teleporters placed", markers.len());
            scene
        }
        None => Scene::new(config.clone(), armory).context("building empty scene")?,
    };
    Ok(scene)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_run_replicates_to_observer() {
        let config = ServerConfig {
            bots: 3,
            duration_secs: Some(5.0),
            stats_interval_ticks: 0,
            ..ServerConfig::default()
        };
        let mut server = GameServer::new(config).unwrap();
        server.run().unwrap();

        let stats = server.stats();
        assert!((299..=301).contains(&stats.ticks));
        assert!(stats.frames_sent >= stats.ticks);
        assert!(stats.frames_delivered > 0);
        assert_eq!(server.scene().characters().count(), 3);
    }

    #[test]
    fn scene_events_are_tallied() {
        let mut stats = ServerStats::default();
        let events = [
            SceneEvent::BulletSpawned {
                id: EntityId(5),
                owner: EntityId(1),
                weapon: WeaponId(2),
            },
            SceneEvent::ExplosionSpawned {
                id: EntityId(6),
                owner: EntityId(1),
                explosion_type: kaze::scene::ExplosionTypeId(0),
            },
            SceneEvent::ExplosionRemoved { id: EntityId(6) },
            SceneEvent::Teleported {
                id: EntityId(1),
                from: EntityId(3),
                to: EntityId(4),
            },
        ];
        for event in &events {
            stats.record(event);
        }
        assert_eq!((stats.bullets_fired, stats.explosions, stats.teleports), (1, 1, 1));
    }
}
