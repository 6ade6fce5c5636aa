//! Connected participants and their outbound frame queues
//!
//! Each connection gets a client id on accept, and later a snake once a join
//! has been applied by the game loop. Every client owns a bounded queue of
//! encoded frames drained by its writer task. A replica cannot skip a diff,
//! so a client whose queue is full is reported as lagging and dropped.

use log::info;
use shared::SnakeId;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;

/// An encoded frame shared between every recipient of a broadcast.
pub type Frame = Arc<Vec<u8>>;

/// Frames buffered per client before it counts as lagging.
pub const OUTBOUND_QUEUE_LEN: usize = 256;

#[derive(Debug)]
pub struct Client {
    /// Unique client identifier assigned by the server
    pub id: u32,
    pub addr: SocketAddr,
    pub display_name: String,
    /// The snake this client controls, once its join has been applied
    pub snake_id: Option<SnakeId>,
    /// A join is waiting for the next tick
    pub join_pending: bool,
    outbound: mpsc::Sender<Frame>,
}

impl Client {
    pub fn new(id: u32, addr: SocketAddr, outbound: mpsc::Sender<Frame>) -> Self {
        Self {
            id,
            addr,
            display_name: format!("player-{}", id),
            snake_id: None,
            join_pending: false,
            outbound,
        }
    }

    /// Queues a frame without waiting. Returns false if the queue is full or
    /// the writer task is gone.
    pub fn send(&self, frame: Frame) -> bool {
        self.outbound.try_send(frame).is_ok()
    }
}

pub struct ClientManager {
    clients: HashMap<u32, Client>,
    next_client_id: u32,
    max_clients: usize,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    /// Returns `None` when the server is full.
    pub fn add_client(&mut self, addr: SocketAddr, outbound: mpsc::Sender<Frame>) -> Option<u32> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Client {} connected from {}", client_id, addr);
        self.clients
            .insert(client_id, Client::new(client_id, addr, outbound));
        Some(client_id)
    }

    /// Removes a client, handing it back so its snake can be despawned.
    pub fn remove_client(&mut self, client_id: &u32) -> Option<Client> {
        let client = self.clients.remove(client_id)?;
        info!("Client {} disconnected", client.id);
        Some(client)
    }

    pub fn get(&self, client_id: u32) -> Option<&Client> {
        self.clients.get(&client_id)
    }

    pub fn get_mut(&mut self, client_id: u32) -> Option<&mut Client> {
        self.clients.get_mut(&client_id)
    }

    pub fn find_client_by_snake(&self, snake_id: SnakeId) -> Option<u32> {
        self.clients
            .values()
            .find(|client| client.snake_id == Some(snake_id))
            .map(|client| client.id)
    }

    /// Sends to one client. Returns false if it is unknown or lagging.
    pub fn send(&self, client_id: u32, frame: Frame) -> bool {
        self.clients
            .get(&client_id)
            .map_or(false, |client| client.send(frame))
    }

    /// Sends to every client and returns the ids that could not keep up.
    pub fn broadcast(&self, frame: &Frame) -> Vec<u32> {
        self.clients
            .values()
            .filter(|client| !client.send(Arc::clone(frame)))
            .map(|client| client.id)
            .collect()
    }

    /// Clears every outstanding join flag and returns the clients that had one.
    pub fn take_pending_joins(&mut self) -> Vec<u32> {
        self.clients
            .values_mut()
            .filter(|client| client.join_pending)
            .map(|client| {
                client.join_pending = false;
                client.id
            })
            .collect()
    }

    /// Display names of every human-controlled snake.
    pub fn player_names(&self) -> HashMap<SnakeId, String> {
        self.clients
            .values()
            .filter_map(|client| Some((client.snake_id?, client.display_name.clone())))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
