//! Client connection management: socket writers and receiver task handles

use std::collections::HashMap;
use std::time::Instant;

use log::{info, warn};
use shared::protocol::Message;
use tokio::io::AsyncWriteExt;
use tokio::net::unix::OwnedWriteHalf;
use tokio::task::JoinHandle;

/// A connected client: the write half of its socket plus the receiver task
/// that reads the other half.
#[derive(Debug)]
pub struct Client {
    pub id: u32,
    pub joined: Instant,
    writer: OwnedWriteHalf,
    receiver: JoinHandle<()>,
}

/// Thread-safe (behind the server's lock) table of connected clients.
///
/// All socket writes go through this table, so a given socket only ever has
/// one producer. Removal closes the socket before joining the receiver task,
/// which is what unblocks a receiver waiting in a read.
#[derive(Debug)]
pub struct ClientManager {
    clients: HashMap<u32, Client>,
    next_player_id: u32,
    max_clients: usize,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        ClientManager {
            clients: HashMap::new(),
            next_player_id: 1,
            max_clients,
        }
    }

    /// Hands out stable, monotonic player ids. Ids are never reused for the
    /// lifetime of the server; the socket itself is only a transport handle.
    pub fn allocate_id(&mut self) -> u32 {
        let id = self.next_player_id;
        self.next_player_id += 1;
        id
    }

    /// Registers a freshly accepted client. Returns false when the table is
    /// full; the caller drops the socket halves, closing the connection.
    pub fn register(&mut self, id: u32, writer: OwnedWriteHalf, receiver: JoinHandle<()>) -> bool {
        if self.clients.len() >= self.max_clients {
            warn!("registry full, rejecting player {}", id);
            receiver.abort();
            return false;
        }
        info!("player {} registered", id);
        self.clients.insert(
            id,
            Client {
                id,
                joined: Instant::now(),
                writer,
                receiver,
            },
        );
        true
    }

    /// Removes a client: closes its socket, then joins its receiver task.
    /// A second call for an id that is already gone is a no-op.
    pub async fn remove(&mut self, id: u32) -> bool {
        match self.clients.remove(&id) {
            Some(client) => {
                // closing the socket first unblocks a receiver stuck in read
                drop(client.writer);
                client.receiver.abort();
                let _ = client.receiver.await;
                info!(
                    "player {} unregistered ({:?} after joining)",
                    id,
                    client.joined.elapsed()
                );
                true
            }
            None => false,
        }
    }

    /// Sends one message to one client. Failures are logged; cleanup is left
    /// to the disconnect path driven by that client's receiver.
    pub async fn send(&mut self, id: u32, message: &Message) -> bool {
        let frame = match message.encode() {
            Ok(frame) => frame,
            Err(e) => {
                warn!("could not encode message for player {}: {}", id, e);
                return false;
            }
        };
        match self.clients.get_mut(&id) {
            Some(client) => match client.writer.write_all(&frame).await {
                Ok(()) => true,
                Err(e) => {
                    warn!("send to player {} failed: {}", id, e);
                    false
                }
            },
            None => false,
        }
    }

    /// Sends one message to every registered client, holding the table for
    /// the whole iteration so membership cannot change mid-broadcast.
    pub async fn broadcast(&mut self, message: &Message) {
        let frame = match message.encode() {
            Ok(frame) => frame,
            Err(e) => {
                warn!("could not encode broadcast: {}", e);
                return;
            }
        };
        for client in self.clients.values_mut() {
            if let Err(e) = client.writer.write_all(&frame).await {
                warn!("broadcast to player {} failed: {}", client.id, e);
            }
        }
    }

    /// Closes every socket and joins every receiver task.
    pub async fn destroy(&mut self) {
        let ids: Vec<u32> = self.clients.keys().copied().collect();
        for id in ids {
            self.remove(id).await;
        }
    }

    pub fn contains(&self, id: u32) -> bool {
        self.clients.contains_key(&id)
    }

    pub fn ids(&self) -> Vec<u32> {
        self.clients.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
