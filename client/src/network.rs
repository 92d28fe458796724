use crate::command::{self, Command, HELP};
use crate::vote_state::{format_state, VoteTracker};
use bincode::{deserialize, serialize};
use log::{error, info, warn};
use shared::{Packet, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UdpSocket;
use tokio::time::interval;

/// How often the client proves it is still there.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

pub struct Client {
    socket: UdpSocket,
    server_addr: SocketAddr,
    name: String,
    client_id: Option<u32>,
    connected: bool,
    votes: VoteTracker,
}

impl Client {
    pub async fn new(server_addr: &str, name: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        let server_addr = server_addr.parse()?;

        Ok(Client {
            socket,
            server_addr,
            name: name.to_string(),
            client_id: None,
            connected: false,
            votes: VoteTracker::new(),
        })
    }

    pub fn client_id(&self) -> Option<u32> {
        self.client_id
    }

    pub fn votes(&self) -> &VoteTracker {
        &self.votes
    }

    async fn connect(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Connecting to server as {}...", self.name);

        let packet = Packet::Connect {
            client_version: PROTOCOL_VERSION,
            name: self.name.clone(),
        };
        self.send_packet(&packet).await?;

        Ok(())
    }

    async fn send_packet(&self, packet: &Packet) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        self.socket.send_to(&data, self.server_addr).await?;
        Ok(())
    }

    async fn handle_packet(&mut self, packet: Packet) -> Result<(), Box<dyn std::error::Error>> {
        match packet {
            Packet::Connected { client_id } => {
                info!("Connected! Client ID: {}", client_id);
                self.client_id = Some(client_id);
                self.connected = true;
                // There is no level to load, so join right away
                self.send_packet(&Packet::Loaded).await?;
            }

            Packet::Print { message } => {
                println!("{}", message);
            }

            Packet::VoteUpdate(state) => {
                if state.result.is_terminal() || !self.votes.is_active() {
                    println!("{}", format_state(&state));
                }
                self.votes.apply(state);
            }

            Packet::Disconnected { reason } => {
                warn!("Disconnected: {}", reason);
                println!("Disconnected: {}", reason);
                self.connected = false;
                self.client_id = None;
            }

            other => {
                warn!("Unexpected {} packet from server", other.name());
            }
        }

        Ok(())
    }

    /// Returns false once the player wants to leave.
    async fn handle_line(&mut self, line: &str) -> Result<bool, Box<dyn std::error::Error>> {
        match command::parse(line) {
            Ok(Some(Command::Send(packet))) => {
                if self.connected {
                    self.send_packet(&packet).await?;
                } else {
                    println!("Not connected.");
                }
            }
            Ok(Some(Command::Status)) => println!("{}", self.votes.summary()),
            Ok(Some(Command::Help)) => println!("{}", HELP),
            Ok(Some(Command::Quit)) => return Ok(false),
            Ok(None) => {}
            Err(e) => println!("{}", e),
        }
        Ok(true)
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.connect().await?;

        let mut heartbeat_interval = interval(HEARTBEAT_INTERVAL);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut buffer = [0u8; 2048];

        loop {
            tokio::select! {
                result = self.socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((len, _)) => {
                            match deserialize::<Packet>(&buffer[0..len]) {
                                Ok(packet) => self.handle_packet(packet).await?,
                                Err(e) => warn!("Failed to deserialize packet: {}", e),
                            }
                        },
                        Err(e) => error!("Error receiving packet: {}", e),
                    }
                },

                line = lines.next_line() => {
                    match line? {
                        Some(line) => {
                            if !self.handle_line(&line).await? {
                                break;
                            }
                        }
                        None => break,
                    }
                },

                _ = heartbeat_interval.tick() => {
                    if self.connected {
                        self.send_packet(&Packet::Heartbeat).await?;
                    }
                },
            }
        }

        if self.connected {
            let _ = self.send_packet(&Packet::Disconnect).await;
        }

        Ok(())
    }
}
