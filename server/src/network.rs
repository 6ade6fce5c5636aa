//! Server network layer handling TCP connections and game loop coordination

use crate::client_manager::{ClientManager, Frame, OUTBOUND_QUEUE_LEN};
use crate::game::{GameCommand, ServerGame, TickReport};
use log::{debug, error, info, warn};
use shared::protocol::{decode_packet, encode_frame, read_frame, write_packet};
use shared::Packet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

pub const ROSTER_INTERVAL: Duration = Duration::from_secs(1);

/// Messages sent from connection tasks and the operator console to the main
/// server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { client_id: u32, packet: Packet },
    ClientDisconnected { client_id: u32 },
    TogglePause,
    Shutdown,
}

/// Main server coordinating networking and game simulation
pub struct Server {
    listener: TcpListener,
    clients: ClientManager,
    game: ServerGame,
    paused: bool,
    /// Joins and departures waiting for the next tick
    pending_commands: Vec<GameCommand>,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        game: ServerGame,
        max_clients: usize,
        paused: bool,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener,
            clients: ClientManager::new(max_clients),
            game,
            paused,
            pending_commands: Vec::new(),
            server_tx,
            server_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// A handle for sending control messages (pause, shutdown) into the loop.
    pub fn control(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    pub fn game(&self) -> &ServerGame {
        &self.game
    }

    /// Registers a new connection, sends it the current world and starts its
    /// reader and writer tasks.
    fn handle_connection(&mut self, stream: TcpStream, addr: SocketAddr) {
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Could not disable Nagle for {}: {}", addr, e);
        }
        let (reader, writer) = stream.into_split();
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE_LEN);

        let Some(client_id) = self.clients.add_client(addr, outbound_tx) else {
            info!("Rejecting {}: server full", addr);
            Self::spawn_rejection(writer);
            return;
        };

        Self::spawn_writer(client_id, writer, outbound_rx);
        Self::spawn_reader(client_id, reader, self.server_tx.clone());

        let setup = Packet::Setup {
            snapshot: self.game.snapshot(),
        };
        self.send_packet(client_id, &setup);
    }

    fn spawn_rejection(mut writer: OwnedWriteHalf) {
        tokio::spawn(async move {
            let packet = Packet::Disconnected {
                reason: "Server full".to_string(),
            };
            if let Err(e) = write_packet(&mut writer, &packet).await {
                debug!("Failed to notify rejected client: {}", e);
            }
            let _ = writer.shutdown().await;
        });
    }

    /// Spawns task that forwards decoded packets from one connection
    fn spawn_reader(
        client_id: u32,
        mut reader: OwnedReadHalf,
        server_tx: mpsc::UnboundedSender<ServerMessage>,
    ) {
        tokio::spawn(async move {
            loop {
                match read_frame(&mut reader).await {
                    Ok(Some(payload)) => match decode_packet(&payload) {
                        Ok(packet) => {
                            if server_tx
                                .send(ServerMessage::PacketReceived { client_id, packet })
                                .is_err()
                            {
                                break;
                            }
                        }
                        Err(e) => warn!("Dropping bad frame from client {}: {}", client_id, e),
                    },
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Read from client {} failed: {}", client_id, e);
                        break;
                    }
                }
            }
            let _ = server_tx.send(ServerMessage::ClientDisconnected { client_id });
        });
    }

    /// Spawns task that drains one client's outbound queue onto its socket
    fn spawn_writer(client_id: u32, mut writer: OwnedWriteHalf, mut outbound: mpsc::Receiver<Frame>) {
        tokio::spawn(async move {
            while let Some(frame) = outbound.recv().await {
                if let Err(e) = writer.write_all(&frame).await {
                    error!("Failed to send to client {}: {}", client_id, e);
                    break;
                }
            }
            let _ = writer.shutdown().await;
        });
    }

    fn encode(packet: &Packet) -> Option<Frame> {
        match encode_frame(packet) {
            Ok(frame) => Some(Arc::new(frame)),
            Err(e) => {
                error!("Failed to encode packet: {}", e);
                None
            }
        }
    }

    fn send_packet(&mut self, client_id: u32, packet: &Packet) {
        let Some(frame) = Self::encode(packet) else {
            return;
        };
        if !self.clients.send(client_id, frame) {
            warn!("Client {} is not keeping up, disconnecting", client_id);
            self.disconnect_client(client_id);
        }
    }

    fn broadcast_packet(&mut self, packet: &Packet) {
        let Some(frame) = Self::encode(packet) else {
            return;
        };
        for client_id in self.clients.broadcast(&frame) {
            warn!("Client {} is not keeping up, disconnecting", client_id);
            self.disconnect_client(client_id);
        }
    }

    /// Drops a client and schedules its snake for removal on the next tick.
    fn disconnect_client(&mut self, client_id: u32) {
        if let Some(client) = self.clients.remove_client(&client_id) {
            if let Some(snake_id) = client.snake_id {
                self.pending_commands.push(GameCommand::Despawn { snake_id });
            }
        }
    }

    /// Processes incoming packets. Membership changes are buffered for the
    /// next tick; intents go straight into the snake's queue.
    fn handle_packet(&mut self, client_id: u32, packet: Packet) {
        let Some(client) = self.clients.get_mut(client_id) else {
            debug!("Ignoring packet from departed client {}", client_id);
            return;
        };

        match packet {
            Packet::Join => {
                if client.snake_id.is_some() || client.join_pending {
                    debug!("Client {} already has a snake", client_id);
                    return;
                }
                client.join_pending = true;
                self.pending_commands
                    .push(GameCommand::Spawn { client_id });
            }

            Packet::SetProfile { display_name } => {
                let name: String = display_name.trim().chars().take(32).collect();
                if !name.is_empty() {
                    info!("Client {} is now known as {}", client_id, name);
                    client.display_name = name;
                }
            }

            Packet::RequestMove { direction } => {
                if let Some(snake_id) = client.snake_id {
                    self.game.queue_intent(snake_id, direction);
                }
            }

            Packet::Leave => {
                if let Some(snake_id) = client.snake_id.take() {
                    info!("Client {} left snake {}", client_id, snake_id);
                    self.pending_commands.push(GameCommand::Despawn { snake_id });
                }
            }

            _ => {
                warn!("Unexpected packet type from client {}", client_id);
            }
        }
    }

    /// Steps the game once and ships the result to every client.
    fn run_tick(&mut self) {
        let commands = std::mem::take(&mut self.pending_commands);
        let TickReport {
            turn,
            diff,
            spawned,
            casualties,
        } = self.game.tick(commands);

        for &(client_id, snake_id) in &spawned {
            match self.clients.get_mut(client_id) {
                Some(client) => {
                    client.join_pending = false;
                    client.snake_id = Some(snake_id);
                }
                // Left before its join was applied.
                None => self
                    .pending_commands
                    .push(GameCommand::Despawn { snake_id }),
            }
        }
        // Every queued join was consumed by this tick; any still flagged failed.
        for client_id in self.clients.take_pending_joins() {
            warn!("No room for client {}'s snake, it may try again", client_id);
        }

        self.broadcast_packet(&Packet::Update { turn, diff });

        for (client_id, snake_id) in spawned {
            self.send_packet(client_id, &Packet::Joined { snake_id });
        }
        for snake_id in casualties {
            if let Some(client_id) = self.clients.find_client_by_snake(snake_id) {
                if let Some(client) = self.clients.get_mut(client_id) {
                    client.snake_id = None;
                }
                self.send_packet(client_id, &Packet::SnakeRemoved { snake_id });
            }
        }

        if turn % 40 == 0 {
            debug!(
                "Turn {}: {} clients, {} snakes",
                turn,
                self.clients.len(),
                self.game.engine().snakes().len()
            );
        }
    }

    fn broadcast_roster(&mut self) {
        if self.clients.is_empty() {
            return;
        }
        let players = self.game.roster(&self.clients.player_names());
        self.broadcast_packet(&Packet::Roster { players });
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let mut tick_interval = interval(self.game.engine().config().tick_duration());
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut roster_interval = interval(ROSTER_INTERVAL);
        roster_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Server started{}",
            if self.paused { " (paused)" } else { "" }
        );

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => self.handle_connection(stream, addr),
                        Err(e) => error!("Failed to accept connection: {}", e),
                    }
                },

                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { client_id, packet }) => {
                            self.handle_packet(client_id, packet);
                        },
                        Some(ServerMessage::ClientDisconnected { client_id }) => {
                            self.disconnect_client(client_id);
                        },
                        Some(ServerMessage::TogglePause) => {
                            self.paused = !self.paused;
                            info!("Game {}", if self.paused { "paused" } else { "resumed" });
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = tick_interval.tick() => {
                    if !self.paused {
                        self.run_tick();
                    }
                },

                _ = roster_interval.tick() => {
                    self.broadcast_roster();
                },
            }
        }

        Ok(())
    }
}
