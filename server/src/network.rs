//! Server network layer handling UDP communications and the main loop

use crate::config::ServerConfig;
use crate::world::World;
use bincode::serialize;
use log::{debug, error, info};
use shared::{Packet, TICRATE};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

/// Wall-clock length of one tic. Every duration in the game and vote code is
/// counted in tics, so the server always ticks at `TICRATE`.
pub const TIC_DURATION: Duration = Duration::from_nanos(1_000_000_000 / TICRATE as u64);

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    DatagramReceived { data: Vec<u8>, addr: SocketAddr },
    ConsoleLine(String),
    #[allow(dead_code)]
    Shutdown,
}

/// Messages sent from the main loop to the sender task
#[derive(Debug)]
pub enum GameMessage {
    SendPacket { packet: Packet, addr: SocketAddr },
}

/// Main server coordinating networking and the world
pub struct Server {
    socket: Arc<UdpSocket>,
    world: World,
    console: bool,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        max_clients: usize,
        config: ServerConfig,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", addr);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            world: World::new(config, max_clients),
            console: true,
            server_tx,
            server_rx,
            game_tx,
            game_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Stops `run` from reading operator commands on stdin. A pending stdin
    /// read can't be cancelled and holds up runtime shutdown.
    pub fn disable_console(&mut self) {
        self.console = false;
    }

    /// Spawns task that continuously listens for incoming datagrams
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        let data = buffer[..len].to_vec();
                        if let Err(e) = server_tx.send(ServerMessage::DatagramReceived { data, addr })
                        {
                            error!("Failed to send datagram to main loop: {}", e);
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes outgoing packet queue
    fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                }
            }
        });
    }

    /// Spawns task that forwards operator commands from stdin
    fn spawn_console_reader(&self) {
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if server_tx.send(ServerMessage::ConsoleLine(line)).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        debug!("Console input closed");
                        break;
                    }
                    Err(e) => {
                        error!("Error reading console: {}", e);
                        break;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    /// Hands everything the world queued to the sender task
    fn flush(&mut self) {
        for (addr, packet) in self.world.take_messages() {
            if let Err(e) = self.game_tx.send(GameMessage::SendPacket { packet, addr }) {
                error!("Failed to queue packet for sending: {}", e);
            }
        }
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        // Initialize concurrent tasks
        self.spawn_network_receiver();
        self.spawn_network_sender();
        if self.console {
            self.spawn_console_reader();
        }

        let mut tick_interval = interval(TIC_DURATION);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Burst);

        info!("Server started successfully");

        loop {
            tokio::select! {
                // Handle network and console events
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::DatagramReceived { data, addr }) => {
                            self.world.handle_datagram(&data, addr);
                        },
                        Some(ServerMessage::ConsoleLine(line)) => {
                            for output in self.world.console(&line) {
                                info!("{}", output);
                            }
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                // Advance the world one tic
                _ = tick_interval.tick() => {
                    self.world.run_tic();

                    // Periodic status
                    let tic = self.world.game().tic;
                    if tic % (60 * TICRATE) == 0 && !self.world.clients().is_empty() {
                        debug!(
                            "Tic {}: {} clients, vote active: {}",
                            tic,
                            self.world.clients().len(),
                            self.world.voting().is_active()
                        );
                    }
                },
            }

            self.flush();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use bincode::deserialize;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn test_server_message_creation() {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8080);
        let data = serialize(&Packet::Heartbeat).unwrap();

        let msg = ServerMessage::DatagramReceived {
            data: data.clone(),
            addr,
        };

        match msg {
            ServerMessage::DatagramReceived { data: d, addr: a } => {
                assert_eq!(a, addr);
                assert_eq!(deserialize::<Packet>(&d).unwrap(), Packet::Heartbeat);
            }
            _ => panic!("Unexpected message type"),
        }
    }

    #[test]
    fn test_channel_communication() {
        let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

        assert!(tx.send(ServerMessage::ConsoleLine("status".to_string())).is_ok());

        match rx.try_recv() {
            Ok(ServerMessage::ConsoleLine(line)) => assert_eq!(line, "status"),
            other => panic!("Unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_largest_vote_packet_fits_buffer() {
        let packet = Packet::CallVote {
            kind: shared::VoteKind::Kick,
            args: vec!["x".repeat(shared::MAX_ARG_LEN); shared::MAX_CALLVOTE_ARGS],
        };
        assert!(serialize(&packet).unwrap().len() < 2048);
    }

    #[test]
    fn test_tic_duration_matches_ticrate() {
        assert_approx_eq!((TIC_DURATION * TICRATE).as_secs_f64(), 1.0, 1e-6);
    }

    #[tokio::test]
    async fn test_server_binds_ephemeral_port() {
        let server = Server::new(
            "127.0.0.1:0",
            8,
            ServerConfig::default(),
        )
        .await;
        assert!(server.is_ok());
    }

    #[tokio::test]
    async fn test_flush_queues_world_output() {
        let mut server = Server::new(
            "127.0.0.1:0",
            8,
            ServerConfig::default(),
        )
        .await
        .unwrap();

        let addr: SocketAddr = "127.0.0.1:9999".parse().unwrap();
        let connect = Packet::Connect {
            client_version: shared::PROTOCOL_VERSION,
            name: "Alice".to_string(),
        };
        server
            .world
            .handle_datagram(&serialize(&connect).unwrap(), addr);
        server.flush();

        match server.game_rx.try_recv() {
            Ok(GameMessage::SendPacket { packet, addr: a }) => {
                assert_eq!(a, addr);
                assert_eq!(packet, Packet::Connected { client_id: 1 });
            }
            other => panic!("Unexpected message {:?}", other),
        }
    }
}
