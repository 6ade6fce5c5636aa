use crate::autopilot::Autopilot;
use crate::game::ReplicaGame;
use crate::input::{spawn_stdin_reader, Command};
use crate::observer::LoggingObserver;
use log::{debug, error, info, warn};
use shared::protocol::{decode_packet, read_frame, write_packet};
use shared::{EngineError, Packet, RosterEntry};
use std::time::Duration;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::sleep;

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub name: String,
    /// Steer our snake with the bot policy instead of terminal input
    pub autopilot: bool,
    /// Ask for a new snake whenever ours dies
    pub rejoin: bool,
    /// Simulated round-trip latency in milliseconds
    pub fake_ping_ms: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            name: "player".to_string(),
            autopilot: false,
            rejoin: false,
            fake_ping_ms: 0,
        }
    }
}

/// What the connection loop should do after a packet was handled.
#[derive(Debug, Default, PartialEq)]
pub struct Reaction {
    pub replies: Vec<Packet>,
    pub disconnect: bool,
}

/// Protocol state of one participant, independent of the socket.
pub struct Session {
    game: ReplicaGame,
    autopilot: Option<Autopilot>,
    rejoin: bool,
    roster: Vec<RosterEntry>,
}

impl Session {
    pub fn new(game: ReplicaGame, autopilot: Option<Autopilot>, rejoin: bool) -> Self {
        Self {
            game,
            autopilot,
            rejoin,
            roster: Vec::new(),
        }
    }

    pub fn game(&self) -> &ReplicaGame {
        &self.game
    }

    pub fn roster(&self) -> &[RosterEntry] {
        &self.roster
    }

    /// The packets to send right after connecting.
    pub fn greeting(name: &str) -> Vec<Packet> {
        vec![
            Packet::SetProfile {
                display_name: name.to_string(),
            },
            Packet::Join,
        ]
    }

    /// Applies one server packet. An update that does not line up with the
    /// replica is an error: the connection cannot recover from it.
    pub fn handle_packet(&mut self, packet: Packet) -> Result<Reaction, EngineError> {
        let mut reaction = Reaction::default();

        match packet {
            Packet::Setup { snapshot } => {
                self.game.apply_setup(snapshot)?;
            }

            Packet::Joined { snake_id } => {
                info!("Playing as snake {}", snake_id);
                self.game.set_my_snake(Some(snake_id));
            }

            Packet::Update { turn, diff } => {
                let casualties = self.game.apply_update(turn, &diff)?;
                if !casualties.is_empty() {
                    debug!("Turn {}: snakes {:?} died", turn, casualties);
                }
                if let Some(autopilot) = self.autopilot.as_mut() {
                    if let Some(direction) = autopilot.next_move(&self.game) {
                        reaction.replies.push(Packet::RequestMove { direction });
                    }
                }
            }

            Packet::SnakeRemoved { snake_id } => {
                info!("Snake {} died", snake_id);
                if self.game.my_snake() == Some(snake_id) {
                    self.game.set_my_snake(None);
                }
                if self.rejoin {
                    reaction.replies.push(Packet::Join);
                }
            }

            Packet::Roster { players } => {
                if let Some(leader) = players.iter().max_by_key(|p| p.length) {
                    debug!(
                        "{} players, {} leads at length {}",
                        players.len(),
                        leader.name,
                        leader.length
                    );
                }
                self.roster = players;
            }

            Packet::Disconnected { reason } => {
                warn!("Disconnected: {}", reason);
                reaction.disconnect = true;
            }

            _ => {
                warn!("Unexpected packet type from server");
            }
        }

        Ok(reaction)
    }

    /// Turns a terminal command into the packets it implies.
    pub fn handle_command(&mut self, command: Command) -> Reaction {
        let mut reaction = Reaction::default();
        match command {
            Command::Move(direction) => {
                if self.game.my_snake().is_some() {
                    reaction.replies.push(Packet::RequestMove { direction });
                }
            }
            Command::Join => reaction.replies.push(Packet::Join),
            Command::Leave => {
                self.game.set_my_snake(None);
                reaction.replies.push(Packet::Leave);
            }
            Command::Quit => {
                reaction.replies.push(Packet::Leave);
                reaction.disconnect = true;
            }
        }
        reaction
    }
}

pub struct Client {
    writer: OwnedWriteHalf,
    incoming: mpsc::Receiver<Packet>,
    session: Session,
    options: ClientOptions,
}

impl Client {
    pub async fn new(
        server_addr: &str,
        options: ClientOptions,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let stream = TcpStream::connect(server_addr).await?;
        stream.set_nodelay(true)?;
        info!("Connected to {}", server_addr);

        let (reader, writer) = stream.into_split();
        let incoming = Self::spawn_receiver(reader);

        let game = ReplicaGame::with_observer(Box::new(LoggingObserver::new()));
        let autopilot = options.autopilot.then(|| Autopilot::new(None));
        let session = Session::new(game, autopilot, options.rejoin);

        Ok(Client {
            writer,
            incoming,
            session,
            options,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Spawns task that decodes server frames into packets
    fn spawn_receiver(mut reader: OwnedReadHalf) -> mpsc::Receiver<Packet> {
        let (tx, rx) = mpsc::channel(1024);
        tokio::spawn(async move {
            loop {
                match read_frame(&mut reader).await {
                    Ok(Some(payload)) => match decode_packet(&payload) {
                        Ok(packet) => {
                            if tx.send(packet).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("Dropping bad frame from server: {}", e),
                    },
                    Ok(None) => {
                        info!("Server closed the connection");
                        break;
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        break;
                    }
                }
            }
        });
        rx
    }

    async fn send_packet(&mut self, packet: &Packet) -> Result<(), Box<dyn std::error::Error>> {
        if self.options.fake_ping_ms > 0 {
            sleep(Duration::from_millis(self.options.fake_ping_ms / 2)).await;
        }
        write_packet(&mut self.writer, packet).await?;
        Ok(())
    }

    /// Sends the reaction's replies. Returns false when the loop should stop.
    async fn react(&mut self, reaction: Reaction) -> Result<bool, Box<dyn std::error::Error>> {
        for packet in &reaction.replies {
            self.send_packet(packet).await?;
        }
        Ok(!reaction.disconnect)
    }

    /// Runs until the server goes away, disconnects us, or the user quits.
    /// Terminal input is only read when the autopilot is off.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        for packet in Session::greeting(&self.options.name) {
            self.send_packet(&packet).await?;
        }

        let mut commands = if self.options.autopilot {
            None
        } else {
            Some(spawn_stdin_reader())
        };

        loop {
            let reaction = tokio::select! {
                packet = self.incoming.recv() => {
                    let Some(packet) = packet else {
                        break;
                    };
                    if self.options.fake_ping_ms > 0 {
                        sleep(Duration::from_millis(self.options.fake_ping_ms / 2)).await;
                    }
                    self.session.handle_packet(packet)?
                },

                command = recv_command(&mut commands) => {
                    match command {
                        Some(command) => self.session.handle_command(command),
                        None => {
                            commands = None;
                            continue;
                        }
                    }
                },
            };

            if !self.react(reaction).await? {
                break;
            }
        }

        Ok(())
    }
}

/// Waits for the next terminal command, or forever if there is no terminal.
async fn recv_command(commands: &mut Option<mpsc::Receiver<Command>>) -> Option<Command> {
    match commands {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
