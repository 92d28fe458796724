//! Everything the server knows, and the single place it changes.
//!
//! The network layer feeds raw datagrams, console lines and tics into the
//! [`World`] and sends out whatever [`World::take_messages`] returns. Nothing
//! in here is async or shared, so every handler runs to completion before the
//! next event is looked at.

use crate::client_manager::ClientManager;
use crate::config::ServerConfig;
use crate::decode::decode;
use crate::game::{GameState, LevelEvent};
use crate::maplist::{Maplist, MaplistEntry};
use crate::outbox::{Outbound, Outbox};
use crate::vote::{VoteContext, Voting};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{Packet, VoteKind, PROTOCOL_VERSION, TICRATE};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

pub struct World {
    pub(crate) config: ServerConfig,
    pub(crate) clients: ClientManager,
    pub(crate) game: GameState,
    pub(crate) maplist: Maplist,
    pub(crate) voting: Voting,
    pub(crate) outbox: Outbox,
    pub(crate) rng: StdRng,
}

impl World {
    pub fn new(config: ServerConfig, max_clients: usize) -> Self {
        Self::with_rng(config, max_clients, StdRng::from_entropy())
    }

    /// Deterministic world for tests and replays.
    pub fn with_seed(config: ServerConfig, max_clients: usize, seed: u64) -> Self {
        Self::with_rng(config, max_clients, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: ServerConfig, max_clients: usize, rng: StdRng) -> Self {
        let max_clients = max_clients.min(shared::MAXPLAYERS);
        Self {
            clients: ClientManager::new(max_clients),
            game: GameState::new(&config.game),
            maplist: Maplist::new(config.game.maps.clone()),
            voting: Voting::new(config.vote.clone()),
            outbox: Outbox::new(),
            rng,
            config,
        }
    }

    pub fn clients(&self) -> &ClientManager {
        &self.clients
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    pub fn maplist(&self) -> &Maplist {
        &self.maplist
    }

    pub fn voting(&self) -> &Voting {
        &self.voting
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Splits the world into the vote subsystem and the state it works on.
    pub(crate) fn split(&mut self) -> (&mut Voting, VoteContext<'_>) {
        (
            &mut self.voting,
            VoteContext {
                clients: &mut self.clients,
                game: &mut self.game,
                maplist: &mut self.maplist,
                outbox: &mut self.outbox,
                rng: &mut self.rng,
            },
        )
    }

    /// Entry point for every datagram the socket receives.
    pub fn handle_datagram(&mut self, data: &[u8], addr: SocketAddr) {
        let sender = self.clients.find_client_by_addr(addr);

        let packet = match decode(data) {
            Ok(packet) => packet,
            Err(err) => {
                match sender {
                    Some(client_id) => {
                        warn!("Protocol error from client {} ({}): {}", client_id, addr, err);
                        self.drop_client(client_id, &err.to_string());
                    }
                    None => warn!("Ignoring bad datagram from {}: {}", addr, err),
                }
                return;
            }
        };

        if let Some(client) = sender.and_then(|id| self.clients.get_mut(id)) {
            client.touch();
        }

        if let Packet::Connect {
            client_version,
            ref name,
        } = packet
        {
            self.handle_connect(addr, client_version, name);
            return;
        }

        let Some(client_id) = sender else {
            debug!("Ignoring {} from unknown address {}", packet.name(), addr);
            return;
        };

        match packet {
            Packet::Loaded => self.handle_loaded(client_id),
            Packet::Heartbeat => {}
            Packet::Say { message } => self.handle_say(client_id, &message),
            Packet::Spectate { spectate } => self.handle_spectate(client_id, spectate),
            Packet::CallVote { kind, args } => self.handle_callvote(client_id, kind, &args),
            Packet::Vote { ballot } => self.handle_vote(client_id, ballot),
            Packet::Disconnect => self.remove_client(client_id, "disconnected", false),
            other => warn!("Unexpected {} from client {}", other.name(), client_id),
        }
    }

    fn handle_connect(&mut self, addr: SocketAddr, client_version: u32, name: &str) {
        info!(
            "Client connecting from {} (version: {}, name: {})",
            addr, client_version, name
        );

        if client_version != PROTOCOL_VERSION {
            self.outbox.reply(
                addr,
                Packet::Disconnected {
                    reason: format!(
                        "Protocol version mismatch, server runs version {}.",
                        PROTOCOL_VERSION
                    ),
                },
            );
            return;
        }

        // Reconnecting from the same address replaces the old connection
        if let Some(existing_id) = self.clients.find_client_by_addr(addr) {
            info!("Removing existing client {} from {}", existing_id, addr);
            self.remove_client(existing_id, "reconnected", false);
        }

        match self.clients.add_client(addr, name) {
            Some(client_id) => {
                self.outbox.send(client_id, Packet::Connected { client_id });
                self.outbox
                    .broadcast_print(format!("{} has connected.", name));
                self.voting.sync(client_id, &mut self.outbox);
            }
            None => {
                warn!("Server full, refusing {}", addr);
                self.outbox.reply(
                    addr,
                    Packet::Disconnected {
                        reason: "Server is full.".to_string(),
                    },
                );
            }
        }
    }

    fn handle_loaded(&mut self, client_id: u32) {
        let Some(client) = self.clients.get_mut(client_id) else {
            return;
        };
        if client.ingame {
            return;
        }
        client.ingame = true;
        let name = client.name.clone();
        self.outbox
            .broadcast_print(format!("{} entered the game.", name));
    }

    fn handle_say(&mut self, client_id: u32, message: &str) {
        let flood = Duration::from_millis(self.config.game.chat_flood_ms);
        let Some(client) = self.clients.get_mut(client_id) else {
            return;
        };

        if client.last_chat.is_some_and(|last| last.elapsed() < flood) {
            self.outbox
                .print(client_id, "Please wait before sending another message.");
            return;
        }
        client.last_chat = Some(Instant::now());

        let line = format!("{}: {}", client.name, message);
        self.outbox.broadcast(Packet::Print { message: line.clone() }, None);
        info!("{}", line);
    }

    fn handle_spectate(&mut self, client_id: u32, spectate: bool) {
        let Some(client) = self.clients.get_mut(client_id) else {
            return;
        };
        if !client.ingame || client.spectator == spectate {
            return;
        }

        client.spectator = spectate;
        if spectate {
            client.team = None;
        }
        let message = if spectate {
            format!("{} is now spectating.", client.name)
        } else {
            format!("{} joined the game.", client.name)
        };
        self.outbox.broadcast_print(message);
    }

    fn handle_callvote(&mut self, client_id: u32, kind: VoteKind, args: &[String]) {
        let (voting, mut ctx) = self.split();
        if let Err(err) = voting.propose(client_id, kind, args, &mut ctx) {
            info!("Client {} could not call {}: {}", client_id, kind, err);
            ctx.outbox.print(client_id, err.to_string());
        }
    }

    fn handle_vote(&mut self, client_id: u32, ballot: bool) {
        let (voting, mut ctx) = self.split();
        if let Err(err) = voting.cast(client_id, ballot, &mut ctx) {
            debug!("Ballot from client {} rejected: {}", client_id, err);
            ctx.outbox.print(client_id, err.to_string());
        }
    }

    /// Throws a client off the server, telling them why.
    pub fn drop_client(&mut self, client_id: u32, reason: &str) {
        self.remove_client(client_id, reason, true);
    }

    /// Removes a client from every system that knows about them.
    fn remove_client(&mut self, client_id: u32, reason: &str, notify: bool) {
        let Some(client) = self.clients.remove_client(client_id) else {
            return;
        };
        self.voting.disconnect(client_id);

        if notify {
            self.outbox.reply(
                client.addr,
                Packet::Disconnected {
                    reason: reason.to_string(),
                },
            );
        }
        self.outbox
            .broadcast_print(format!("{} left the server ({}).", client.name, reason));
    }

    /// Advances the server by one tic.
    pub fn run_tic(&mut self) {
        if let Some(event) = self.game.tick() {
            self.handle_level_event(event);
        }

        let (voting, mut ctx) = self.split();
        voting.tick(&mut ctx);

        if self.game.tic % TICRATE == 0 {
            let timeout = Duration::from_secs(self.config.game.client_timeout_secs);
            for client_id in self.clients.check_timeouts(timeout) {
                info!("Client {} timed out", client_id);
                self.drop_client(client_id, "timed out");
            }
        }
    }

    fn handle_level_event(&mut self, event: LevelEvent) {
        let entry = match event {
            LevelEvent::IntermissionOver => self.maplist.advance(),
            LevelEvent::Reload => None,
        };
        let entry = entry.unwrap_or_else(|| MaplistEntry::new(&self.game.map, ""));
        self.game.change_map(&entry);
        self.outbox
            .broadcast_print(format!("Now playing {}.", entry.map));
    }

    /// Drains the outbox into addressed packets.
    ///
    /// Disconnects queued by vote execution are carried out here, in order,
    /// so a kicked player still gets everything queued before the kick.
    pub fn take_messages(&mut self) -> Vec<(SocketAddr, Packet)> {
        let mut messages = Vec::new();

        loop {
            let batch = self.outbox.drain();
            if batch.is_empty() {
                break;
            }

            for outbound in batch {
                match outbound {
                    Outbound::Unicast { client_id, packet } => {
                        match self.clients.addr_of(client_id) {
                            Some(addr) => messages.push((addr, packet)),
                            None => debug!("Client {} gone, dropping {}", client_id, packet.name()),
                        }
                    }
                    Outbound::Broadcast { packet, exclude } => {
                        for (client_id, addr) in self.clients.get_client_addrs() {
                            if Some(client_id) != exclude {
                                messages.push((addr, packet.clone()));
                            }
                        }
                    }
                    Outbound::Reply { addr, packet } => messages.push((addr, packet)),
                    Outbound::Drop { client_id, reason } => self.drop_client(client_id, &reason),
                }
            }
        }

        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bincode::serialize;

    fn addr(port: u16) -> SocketAddr {
        format!("127.0.0.1:{}", port).parse().unwrap()
    }

    fn send(world: &mut World, port: u16, packet: Packet) {
        world.handle_datagram(&serialize(&packet).unwrap(), addr(port));
    }

    fn connect(world: &mut World, port: u16, name: &str) -> u32 {
        send(
            world,
            port,
            Packet::Connect {
                client_version: PROTOCOL_VERSION,
                name: name.to_string(),
            },
        );
        send(world, port, Packet::Loaded);
        world.clients.find_client_by_addr(addr(port)).unwrap()
    }

    #[test]
    fn test_connect_and_load() {
        let mut world = World::with_seed(ServerConfig::default(), 8, 1);
        let id = connect(&mut world, 5000, "Alice");

        let client = world.clients.get(id).unwrap();
        assert_eq!(client.name, "Alice");
        assert!(client.ingame);

        let messages = world.take_messages();
        assert!(messages.contains(&(addr(5000), Packet::Connected { client_id: id })));
    }

    #[test]
    fn test_version_mismatch() {
        let mut world = World::with_seed(ServerConfig::default(), 8, 1);
        send(
            &mut world,
            5000,
            Packet::Connect {
                client_version: PROTOCOL_VERSION + 1,
                name: "Old".to_string(),
            },
        );
        assert!(world.clients.is_empty());
        let messages = world.take_messages();
        assert!(matches!(
            messages.as_slice(),
            [(_, Packet::Disconnected { .. })]
        ));
    }

    #[test]
    fn test_server_full() {
        let mut world = World::with_seed(ServerConfig::default(), 1, 1);
        connect(&mut world, 5000, "Alice");
        world.take_messages();

        send(
            &mut world,
            5001,
            Packet::Connect {
                client_version: PROTOCOL_VERSION,
                name: "Bob".to_string(),
            },
        );
        assert_eq!(world.clients.len(), 1);
        assert_eq!(
            world.take_messages(),
            vec![(
                addr(5001),
                Packet::Disconnected {
                    reason: "Server is full.".to_string()
                }
            )]
        );
    }

    #[test]
    fn test_garbage_from_client_drops_them() {
        let mut world = World::with_seed(ServerConfig::default(), 8, 1);
        let id = connect(&mut world, 5000, "Alice");
        world.take_messages();

        world.handle_datagram(&[0xde, 0xad, 0xbe, 0xef, 0x00], addr(5000));
        assert!(world.clients.get(id).is_none());
        let messages = world.take_messages();
        assert!(messages.contains(&(
            addr(5000),
            Packet::Disconnected {
                reason: "Could not decode message".to_string()
            }
        )));
    }

    #[test]
    fn test_garbage_from_stranger_ignored() {
        let mut world = World::with_seed(ServerConfig::default(), 8, 1);
        world.handle_datagram(&[1, 2, 3], addr(6000));
        assert!(world.take_messages().is_empty());
    }

    #[test]
    fn test_chat_flood_protection() {
        let mut world = World::with_seed(ServerConfig::default(), 8, 1);
        let id = connect(&mut world, 5000, "Alice");
        world.take_messages();

        send(&mut world, 5000, Packet::Say { message: "hi".to_string() });
        send(&mut world, 5000, Packet::Say { message: "hi again".to_string() });

        let messages = world.take_messages();
        assert_eq!(
            messages,
            vec![
                (
                    addr(5000),
                    Packet::Print {
                        message: "Alice: hi".to_string()
                    }
                ),
                (
                    addr(5000),
                    Packet::Print {
                        message: "Please wait before sending another message.".to_string()
                    }
                ),
            ]
        );
        assert!(world.clients.get(id).is_some());
    }

    #[test]
    fn test_spectate_toggle() {
        let mut world = World::with_seed(ServerConfig::default(), 8, 1);
        let id = connect(&mut world, 5000, "Alice");

        send(&mut world, 5000, Packet::Spectate { spectate: true });
        assert!(world.clients.get(id).unwrap().spectator);
        send(&mut world, 5000, Packet::Spectate { spectate: false });
        assert!(!world.clients.get(id).unwrap().spectator);
    }

    #[test]
    fn test_intermission_advances_maplist() {
        let mut config = ServerConfig::default();
        config.game.maps = vec![
            MaplistEntry::new("MAP01", "doom2.wad"),
            MaplistEntry::new("MAP02", "doom2.wad"),
        ];
        let mut world = World::with_seed(config, 8, 1);
        world.game.exit_level();

        for _ in 0..crate::game::INTERMISSION_TICS {
            world.run_tic();
        }
        assert_eq!(world.game.map, "MAP02");
        assert!(!world.game.in_intermission());
    }
}
