//! Registry of connected participants
//!
//! This module handles the server-side bookkeeping of connected clients:
//! - Client connection lifecycle (connect, disconnect, timeout)
//! - Player status the vote subsystem reads (ingame, spectator, team)
//! - Per-player anti-spam timestamps the vote subsystem writes
//! - Client capacity management and address tracking
//!
//! The registry is the single owner of participants. Other systems refer to
//! players only by their id and must tolerate that id disappearing.

use crate::game::Team;
use log::info;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// One connected participant
#[derive(Debug)]
pub struct Client {
    /// Stable id, never reused while the server runs
    pub id: u32,
    pub addr: SocketAddr,
    pub name: String,
    /// Any datagram counts as a sign of life
    pub last_seen: Instant,
    /// Set once the client has loaded the level and joined the session
    pub ingame: bool,
    pub spectator: bool,
    pub team: Option<Team>,
    /// Tic at which a vote this player called last failed
    pub last_callvote_tic: Option<u32>,
    /// Tic at which this player last changed their ballot
    pub last_vote_tic: Option<u32>,
    /// Time of the last accepted chat line, for flood protection
    pub last_chat: Option<Instant>,
}

impl Client {
    /// A fresh connection: not in game yet, not spectating, no vote history.
    pub fn new(id: u32, addr: SocketAddr, name: &str) -> Self {
        Self {
            id,
            addr,
            name: name.to_string(),
            last_seen: Instant::now(),
            ingame: false,
            spectator: false,
            team: None,
            last_callvote_tic: None,
            last_vote_tic: None,
            last_chat: None,
        }
    }

    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    /// Silent for longer than `timeout`.
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }

    /// In game and not spectating
    pub fn is_playing(&self) -> bool {
        self.ingame && !self.spectator
    }
}

/// Capacity-limited set of participants keyed by id.
pub struct ClientManager {
    clients: HashMap<u32, Client>,
    next_client_id: u32,
    max_clients: usize,
}

impl ClientManager {
    /// Ids start at 1.
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    /// Registers a connection, or returns `None` when the server is full.
    pub fn add_client(&mut self, addr: SocketAddr, name: &str) -> Option<u32> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        let client = Client::new(client_id, addr, name);
        info!("Client {} ({}) connected from {}", client_id, name, addr);
        self.clients.insert(client_id, client);

        Some(client_id)
    }

    pub fn remove_client(&mut self, client_id: u32) -> Option<Client> {
        let client = self.clients.remove(&client_id)?;
        info!("Client {} ({}) disconnected", client.id, client.name);
        Some(client)
    }

    /// Maps a datagram's source address to a participant.
    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<u32> {
        self.clients
            .iter()
            .find(|(_, client)| client.addr == addr)
            .map(|(id, _)| *id)
    }

    pub fn get(&self, client_id: u32) -> Option<&Client> {
        self.clients.get(&client_id)
    }

    pub fn get_mut(&mut self, client_id: u32) -> Option<&mut Client> {
        self.clients.get_mut(&client_id)
    }

    /// All clients, ordered by id so iteration is deterministic
    pub fn iter(&self) -> impl Iterator<Item = &Client> {
        let mut clients: Vec<&Client> = self.clients.values().collect();
        clients.sort_by_key(|client| client.id);
        clients.into_iter()
    }

    pub fn ids(&self) -> Vec<u32> {
        self.iter().map(|client| client.id).collect()
    }

    /// Number of clients that have finished joining
    pub fn ingame_count(&self) -> usize {
        self.clients.values().filter(|client| client.ingame).count()
    }

    /// Ids of silent clients, in id order.
    ///
    /// The caller is responsible for dropping them so every other system gets
    /// to clean up too.
    pub fn check_timeouts(&self, timeout: Duration) -> Vec<u32> {
        let mut timed_out: Vec<u32> = self
            .clients
            .iter()
            .filter(|(_, client)| client.is_timed_out(timeout))
            .map(|(id, _)| *id)
            .collect();
        timed_out.sort_unstable();
        timed_out
    }

    pub fn addr_of(&self, client_id: u32) -> Option<SocketAddr> {
        self.clients.get(&client_id).map(|client| client.addr)
    }

    /// Broadcast targets, in id order.
    pub fn get_client_addrs(&self) -> Vec<(u32, SocketAddr)> {
        self.iter().map(|client| (client.id, client.addr)).collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
