//! Integration tests for the authority, its replicas and the wire between them
//!
//! These tests validate cross-component interactions and real network behavior.

use client::game::ReplicaGame;
use server::game::{GameCommand, ServerGame};
use server::network::{Server, ServerMessage};
use shared::protocol::{decode_packet, read_frame, write_packet};
use shared::{apply_diff, Direction, Engine, GameConfig, Packet, Point, Snake, SnakeChange};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::timeout;

fn arena_config() -> GameConfig {
    GameConfig {
        width: 40,
        height: 30,
        desired_apples: 6,
        obstacle_count: 3,
        min_snakes: 4,
        start_size: 4,
        growth_bonus: 3,
        tick_duration_ms: 20,
        bot_straight_probability: 0.1,
    }
}

fn open_config() -> GameConfig {
    GameConfig {
        width: 20,
        height: 20,
        desired_apples: 0,
        obstacle_count: 0,
        min_snakes: 0,
        growth_bonus: 3,
        ..GameConfig::default()
    }
}

/// Compares everything a replica is expected to reproduce exactly.
fn assert_same_world(authority: &Engine, replica: &Engine) {
    assert_eq!(authority.turn(), replica.turn());
    assert_eq!(authority.board().matrix(), replica.board().matrix());
    assert_eq!(authority.snakes().len(), replica.snakes().len());
    for (a, r) in authority.snakes().iter().zip(replica.snakes()) {
        assert_eq!(a.id, r.id);
        assert_eq!(a.articulations, r.articulations);
        assert_eq!(a.length, r.length);
        assert_eq!(a.target_length, r.target_length);
    }
    // Placement order too: bots break distance ties by it.
    assert_eq!(authority.apples(), replica.apples());
}

/// Steps the authority once and replays the turn on the replica.
fn step_both(authority: &mut Engine, replica: &mut Engine) -> Vec<u32> {
    let mut casualties = authority.step();
    let diff = authority.take_diff();
    let mut replayed = apply_diff(replica, &diff);
    casualties.sort_unstable();
    replayed.sort_unstable();
    assert_eq!(casualties, replayed);
    casualties
}

fn with_replica(snakes: Vec<Snake>, apples: &[Point]) -> (Engine, Engine) {
    let mut authority = Engine::new(open_config()).unwrap();
    for snake in snakes {
        authority.add_snake(snake).unwrap();
    }
    for &apple in apples {
        authority.place_apple(apple).unwrap();
    }
    authority.take_diff();
    let replica = Engine::from_snapshot(authority.snapshot()).unwrap();
    (authority, replica)
}

/// DETERMINISTIC REPLICATION TESTS
mod replication_tests {
    use super::*;

    /// A replica fed only snapshots and diffs tracks a busy bot-driven world
    #[test]
    fn replica_follows_authority() {
        let mut game = ServerGame::new(arena_config(), Some(42)).unwrap();
        let mut replica = ReplicaGame::new();
        replica.apply_setup(game.snapshot()).unwrap();

        let mut player_snake = None;
        let mut total_deaths = 0;

        for tick in 1..=400u32 {
            let mut commands = Vec::new();
            if tick % 50 == 10 {
                commands.push(GameCommand::Spawn { client_id: 1 });
            }
            if tick % 50 == 40 {
                if let Some(snake_id) = player_snake.take() {
                    commands.push(GameCommand::Despawn { snake_id });
                }
            }
            if let Some(snake_id) = player_snake {
                let direction = [Direction::Up, Direction::Left, Direction::Down, Direction::Right]
                    [(tick % 4) as usize];
                game.queue_intent(snake_id, direction);
            }

            let report = game.tick(commands);
            if let Some(&(_, snake_id)) = report.spawned.first() {
                player_snake = Some(snake_id);
            }

            let mut replayed = replica.apply_update(report.turn, &report.diff).unwrap();
            let mut casualties = report.casualties.clone();
            casualties.sort_unstable();
            replayed.sort_unstable();
            assert_eq!(casualties, replayed, "casualties differ on turn {}", tick);
            total_deaths += casualties.len();

            if player_snake.is_some_and(|id| casualties.contains(&id)) {
                player_snake = None;
            }

            assert_same_world(game.engine(), replica.engine().unwrap());
        }

        // Bots on a small board do die; make sure the run exercised that.
        assert!(total_deaths > 0);
    }

    /// Every live snake's polyline covers exactly its length after every turn
    #[test]
    fn polyline_matches_length_every_turn() {
        let mut game = ServerGame::new(arena_config(), Some(7)).unwrap();

        for _ in 0..300 {
            game.tick(Vec::new());
            let engine = game.engine();
            for snake in engine.snakes() {
                let cells = snake.cells().unwrap();
                assert_eq!(cells.len(), snake.length, "snake {}", snake.id);
                snake.validate(engine.config().width, engine.config().height).unwrap();
                for cell in cells {
                    assert_eq!(engine.board().get(cell).owner(), Some(snake.id));
                }
            }
        }
    }

    /// A participant joining mid-game from a snapshot stays in sync
    #[test]
    fn late_joiner_stays_in_sync() {
        let mut game = ServerGame::new(arena_config(), Some(99)).unwrap();
        for _ in 0..150 {
            game.tick(Vec::new());
        }

        let mut late = ReplicaGame::new();
        late.apply_setup(game.snapshot()).unwrap();
        assert_same_world(game.engine(), late.engine().unwrap());

        for _ in 0..150 {
            let report = game.tick(Vec::new());
            late.apply_update(report.turn, &report.diff).unwrap();
            assert_same_world(game.engine(), late.engine().unwrap());
        }
    }

    /// Joins in one tick are replayed in the order the authority applied them
    #[test]
    fn spawns_replay_in_order() {
        let config = GameConfig {
            min_snakes: 0,
            ..arena_config()
        };
        let mut game = ServerGame::new(config, Some(5)).unwrap();
        let mut replica = ReplicaGame::new();
        replica.apply_setup(game.snapshot()).unwrap();

        let commands = (1..=3).map(|client_id| GameCommand::Spawn { client_id }).collect();
        let report = game.tick(commands);

        let added: Vec<u32> = report
            .diff
            .snake_changes
            .iter()
            .filter_map(|change| match change {
                SnakeChange::Added(snake) => Some(snake.id),
                SnakeChange::Removed(_) => None,
            })
            .collect();
        let spawned: Vec<u32> = report.spawned.iter().map(|&(_, id)| id).collect();
        assert_eq!(added, spawned);

        replica.apply_update(report.turn, &report.diff).unwrap();
        let replica_order: Vec<u32> = replica
            .engine()
            .unwrap()
            .snakes()
            .iter()
            .map(|s| s.id)
            .collect();
        let authority_order: Vec<u32> = game.engine().snakes().iter().map(|s| s.id).collect();
        assert_eq!(replica_order, authority_order);
    }
}

/// GAME RULE SCENARIOS, CHECKED ON BOTH SIDES
mod scenario_tests {
    use super::*;

    #[test]
    fn eating_grows_on_both_sides() {
        let snake = Snake::new(1, Point::new(5, 5), Point::new(2, 5), "#abc");
        let (mut authority, mut replica) = with_replica(vec![snake], &[Point::new(6, 5)]);

        step_both(&mut authority, &mut replica);
        assert_eq!(authority.snake(1).unwrap().target_length, 7);
        assert_eq!(authority.snake(1).unwrap().length, 5);

        for _ in 0..4 {
            step_both(&mut authority, &mut replica);
        }
        assert_eq!(authority.snake(1).unwrap().length, 7);
        assert!(authority.apples().is_empty());
        assert_same_world(&authority, &replica);
    }

    #[test]
    fn heads_meeting_kill_both() {
        let left = Snake::new(1, Point::new(5, 5), Point::new(2, 5), "#abc");
        let right = Snake::new(2, Point::new(7, 5), Point::new(10, 5), "#cde");
        let (mut authority, mut replica) = with_replica(vec![left, right], &[]);

        let casualties = step_both(&mut authority, &mut replica);
        assert_eq!(casualties, vec![1, 2]);
        assert!(authority.snakes().is_empty());
        assert!(authority.board().get(Point::new(6, 5)).is_empty());
        assert_same_world(&authority, &replica);
    }

    #[test]
    fn heads_swapping_kill_both_in_either_order() {
        for order in [[1, 2], [2, 1]] {
            let mut snakes = vec![
                Snake::new(1, Point::new(5, 5), Point::new(2, 5), "#abc"),
                Snake::new(2, Point::new(6, 5), Point::new(9, 5), "#cde"),
            ];
            if order[0] == 2 {
                snakes.reverse();
            }
            let (mut authority, mut replica) = with_replica(snakes, &[]);

            let casualties = step_both(&mut authority, &mut replica);
            assert_eq!(casualties, vec![1, 2], "order {:?}", order);
            assert_same_world(&authority, &replica);
        }
    }

    #[test]
    fn leaving_the_board_kills() {
        let snake = Snake::new(1, Point::new(19, 3), Point::new(16, 3), "#abc");
        let (mut authority, mut replica) = with_replica(vec![snake], &[]);

        let casualties = step_both(&mut authority, &mut replica);
        assert_eq!(casualties, vec![1]);
        assert!(authority.board().matrix().cells.iter().all(|c| c.is_empty()));
        assert_same_world(&authority, &replica);
    }

    #[test]
    fn turns_replay_from_resolved_intents() {
        let snake = Snake::new(1, Point::new(5, 5), Point::new(2, 5), "#abc");
        let (mut authority, mut replica) = with_replica(vec![snake], &[]);

        authority.queue_intent(1, Direction::Down);
        step_both(&mut authority, &mut replica);
        authority.queue_intent(1, Direction::Left);
        step_both(&mut authority, &mut replica);

        assert_eq!(
            replica.snake(1).unwrap().articulations,
            [Point::new(4, 6), Point::new(5, 6), Point::new(5, 5), Point::new(4, 5)]
        );
        assert_same_world(&authority, &replica);
    }
}

/// NETWORK PROTOCOL TESTS
mod protocol_tests {
    use super::*;

    /// Tests length-prefixed frames over a real TCP socket
    #[tokio::test]
    async fn tcp_frame_echo() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // Echo server
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            while let Ok(Some(payload)) = read_frame(&mut stream).await {
                let packet = decode_packet(&payload).unwrap();
                write_packet(&mut stream, &packet).await.unwrap();
            }
        });

        let mut stream = TcpStream::connect(addr).await.unwrap();
        let mut game = ServerGame::new(arena_config(), Some(1)).unwrap();
        let report = game.tick(vec![GameCommand::Spawn { client_id: 1 }]);

        let packets = vec![
            Packet::Join,
            Packet::Setup {
                snapshot: game.snapshot(),
            },
            Packet::Update {
                turn: report.turn,
                diff: report.diff,
            },
            Packet::Disconnected {
                reason: "Test".to_string(),
            },
        ];

        for packet in packets {
            write_packet(&mut stream, &packet).await.unwrap();
            let payload = timeout(Duration::from_secs(1), read_frame(&mut stream))
                .await
                .expect("echo timed out")
                .unwrap()
                .expect("connection closed");
            assert_eq!(decode_packet(&payload).unwrap(), packet);
        }
    }
}

/// END-TO-END SERVER TESTS
mod server_tests {
    use super::*;

    async fn next_packet(stream: &mut TcpStream) -> Packet {
        let payload = timeout(Duration::from_secs(3), read_frame(stream))
            .await
            .expect("no packet within 3s")
            .unwrap()
            .expect("server closed the connection");
        decode_packet(&payload).unwrap()
    }

    async fn start_server(max_clients: usize) -> (SocketAddr, UnboundedSender<ServerMessage>) {
        let game = ServerGame::new(arena_config(), Some(11)).unwrap();
        let mut server = Server::new("127.0.0.1:0", game, max_clients, false)
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        let control = server.control();
        tokio::spawn(async move {
            let _ = server.run().await;
        });
        (addr, control)
    }

    /// A raw participant gets the world, joins, and replays updates in sync
    #[tokio::test]
    async fn participant_joins_and_replays() {
        let (addr, control) = start_server(4).await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        let Packet::Setup { snapshot } = next_packet(&mut stream).await else {
            panic!("first packet must be the setup");
        };
        let mut replica = ReplicaGame::new();
        replica.apply_setup(snapshot).unwrap();

        write_packet(
            &mut stream,
            &Packet::SetProfile {
                display_name: "tester".to_string(),
            },
        )
        .await
        .unwrap();
        write_packet(&mut stream, &Packet::Join).await.unwrap();

        let my_snake = loop {
            match next_packet(&mut stream).await {
                Packet::Update { turn, diff } => {
                    replica.apply_update(turn, &diff).unwrap();
                }
                Packet::Joined { snake_id } => break snake_id,
                _ => {}
            }
        };
        // The update that added our snake arrived before the confirmation.
        assert!(replica.engine().unwrap().snake(my_snake).is_some());

        let mut saw_roster = false;
        for _ in 0..200 {
            match next_packet(&mut stream).await {
                Packet::Update { turn, diff } => {
                    replica.apply_update(turn, &diff).unwrap();
                }
                Packet::Roster { players } => {
                    let alive = replica.engine().unwrap().snake(my_snake).is_some();
                    let listed = players
                        .iter()
                        .any(|p| p.snake_id == my_snake && p.name == "tester" && !p.is_bot);
                    assert_eq!(alive, listed);
                    saw_roster = true;
                    break;
                }
                _ => {}
            }
        }
        assert!(saw_roster);

        let _ = control.send(ServerMessage::Shutdown);
    }

    /// A frame that does not decode is dropped and the connection keeps working
    #[tokio::test]
    async fn bad_frame_keeps_connection_open() {
        let (addr, control) = start_server(4).await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        let Packet::Setup { snapshot } = next_packet(&mut stream).await else {
            panic!("first packet must be the setup");
        };
        let mut replica = ReplicaGame::new();
        replica.apply_setup(snapshot).unwrap();

        // Well framed, but no packet has discriminant 0xffffffff.
        let mut frame = 4u32.to_be_bytes().to_vec();
        frame.extend_from_slice(&[0xff; 4]);
        stream.write_all(&frame).await.unwrap();
        write_packet(&mut stream, &Packet::Join).await.unwrap();

        let mut added = Vec::new();
        let joined = loop {
            match next_packet(&mut stream).await {
                Packet::Update { turn, diff } => {
                    added.extend(diff.added().map(|snake| snake.id));
                    replica.apply_update(turn, &diff).unwrap();
                }
                Packet::Joined { snake_id } => break snake_id,
                _ => {}
            }
        };
        assert!(added.contains(&joined));

        let _ = control.send(ServerMessage::Shutdown);
    }

    /// Connections beyond the limit are told why and closed
    #[tokio::test]
    async fn full_server_rejects() {
        let (addr, control) = start_server(1).await;

        let mut first = TcpStream::connect(addr).await.unwrap();
        assert!(matches!(next_packet(&mut first).await, Packet::Setup { .. }));

        let mut second = TcpStream::connect(addr).await.unwrap();
        assert_eq!(
            next_packet(&mut second).await,
            Packet::Disconnected {
                reason: "Server full".to_string()
            }
        );

        let _ = control.send(ServerMessage::Shutdown);
    }
}
