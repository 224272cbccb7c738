use glam::Vec2;

use kaze::net::{ControlInput, Direction, LagConfig, LagMaker, Receiver, Relay};
use kaze::scene::{Character, CharacterConfig, NoHooks, Scene, SceneConfig, standard_armory};
use kaze::spatial::EntityId;

const DT: f32 = 16.0;

struct World {
    server: Scene,
    client: Scene,
    relay: Relay,
    receiver: Receiver,
    link: LagMaker<Vec<u8>>,
    player: EntityId,
    runner: EntityId,
}

impl World {
    fn new(lag: LagConfig) -> Self {
        let config = SceneConfig {
            block_width: Some(20),
            block_height: Some(20),
            ..SceneConfig::default()
        };
        let (armory, loadout) = standard_armory().unwrap();
        let mut server = Scene::new(config.clone(), armory.clone()).unwrap();
        let player = server
            .spawn_character(
                Character::new("watcher", 0, CharacterConfig::default(), vec![loadout.auto]),
                Vec2::new(300.0, 300.0),
            )
            .unwrap();
        let runner = server
            .spawn_character(
                Character::new("runner", 1, CharacterConfig::default(), vec![loadout.auto]),
                Vec2::new(250.0, 300.0),
            )
            .unwrap();

        let mut relay = Relay::new(Vec2::new(800.0, 600.0));
        relay.add_client(player);

        let mut client = Scene::new(config, armory).unwrap();
        let mut receiver = Receiver::new(CharacterConfig::default());
        let state = Relay::game_state(&server, player).to_json().unwrap();
        let reply = receiver.apply_admin_json(&mut client, &state).unwrap();
        assert!(reply.is_some());

        Self {
            server,
            client,
            relay,
            receiver,
            link: LagMaker::new(lag, 5),
            player,
            runner,
        }
    }

    fn tick(&mut self) {
        self.server.update(&mut NoHooks, DT).unwrap();
        let mut frames = self.relay.collect(&self.server, DT).unwrap();
        for frame in frames.remove(&self.player).unwrap_or_default() {
            self.link.send(frame);
        }
        for frame in self.link.advance(DT) {
            self.receiver.apply_frame(&mut self.client, &frame).unwrap();
        }
        self.client.update(&mut NoHooks, DT).unwrap();
    }

    fn mirrored(&self, id: EntityId) -> Vec2 {
        let local = self.receiver.local_id(id.0).unwrap();
        self.client.rect_of(local).unwrap().position
    }
}

#[test]
fn client_converges_once_the_runner_stops() {
    let mut world = World::new(LagConfig {
        average_fps: 60.0,
        fixed_delay_ms: 50.0,
        queue_max_len: 10,
    });

    if let Some(runner) = world.server.character_mut(world.runner) {
        runner.aim = Vec2::Y;
    }
    for _ in 0..90 {
        world.server.queue_input(
            world.runner,
            ControlInput {
                vertical: Direction::Positive,
                aim: Vec2::Y,
                ..ControlInput::default()
            },
        );
        world.tick();
    }
    world.server.queue_input(
        world.runner,
        ControlInput {
            aim: Vec2::Y,
            ..ControlInput::default()
        },
    );
    for _ in 0..240 {
        world.tick();
    }

    let server = world.server.rect_of(world.runner).unwrap().position;
    assert!(server.y > 320.0, "runner never moved: {server}");
    let client = world.mirrored(world.runner);
    assert!(
        (client - server).length() < 0.5,
        "client {client} server {server}"
    );
    let watcher = world.mirrored(world.player);
    let expected = world.server.rect_of(world.player).unwrap().position;
    assert!((watcher - expected).length() < 1e-3);
}

#[test]
fn bullets_are_replayed_without_chaining() {
    let mut world = World::new(LagConfig {
        fixed_delay_ms: 0.0,
        ..LagConfig::default()
    });
    world.server.queue_input(
        world.player,
        ControlInput {
            fire: true,
            aim: Vec2::new(0.0, 1.0),
            ..ControlInput::default()
        },
    );
    for _ in 0..10 {
        world.tick();
    }

    assert!(world.server.bullets().count() > 0);
    assert!(world.client.bullets().count() > 0);
    assert!(world.client.bullets().all(|(_, b)| b.replicated));
    let owner = world.receiver.local_id(world.player.0).unwrap();
    assert!(world.client.bullets().all(|(_, b)| b.owner == owner));
}

#[test]
fn runner_leaving_view_is_unsynced() {
    let mut world = World::new(LagConfig {
        fixed_delay_ms: 0.0,
        ..LagConfig::default()
    });
    for _ in 0..5 {
        world.tick();
    }
    let local = world.receiver.local_id(world.runner.0).unwrap();
    assert!(!world.client.networked(local).unwrap().off);

    world.server.place_rect(world.runner, Vec2::new(960.0, 960.0)).unwrap();
    for _ in 0..10 {
        world.tick();
    }
    assert!(world.client.networked(local).unwrap().off);
}
