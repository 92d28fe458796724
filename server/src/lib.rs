//! # Callvote Server Library
//!
//! This library provides the authoritative server for the multiplayer game's
//! session and voting layer. It tracks who is connected, validates everything
//! clients send, and runs the callvote system that lets players change the
//! game by majority decision.
//!
//! ## Core Responsibilities
//!
//! ### Protocol Validation
//! Every datagram is decoded and checked before any game code sees it. A
//! client that sends something malformed is disconnected rather than trusted.
//!
//! ### Client Management
//! Handles the complete lifecycle of client connections including:
//! - Connection establishment and player id assignment
//! - Joining the game, spectating and chat flood protection
//! - Disconnection and timeout handling, with cleanup in every subsystem
//!
//! ### Voting
//! Players can call a vote to kick someone, change the map, adjust limits and
//! more. Everyone in game gets a ballot; the vote passes or fails as soon as
//! the outcome is certain, or when its countdown runs out.
//!
//! ## Architecture Design
//!
//! ### Single-Threaded Event Loop
//! All state lives in one [`world::World`] that is only touched from the main
//! loop. Network tasks move bytes in and out over channels, so handlers never
//! race and a vote always sees a consistent view of the server.
//!
//! ### Tic Based Timing
//! The world advances at `TICRATE` tics per second. Vote countdowns and anti
//! spam cooldowns are measured in tics, never in wall clock time.
//!
//! ### Outbox
//! Game and vote code only say who should receive what. The world drains the
//! [`outbox::Outbox`] after every event and resolves player ids to addresses.
//!
//! ## Module Organization
//!
//! - `decode`: datagram decoding and validation
//! - `client_manager`: connected players and their per-player vote state
//! - `game`, `maplist`: the level state votes read and change
//! - `vote`: ballots and quorum math, vote kinds, the running vote
//! - `world`: packet dispatch and the per-tic update
//! - `console`: operator commands
//! - `network`: UDP socket tasks and the main loop
//! - `config`, `error`: configuration file and error types
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new(
//!         "127.0.0.1:10666",
//!         32,
//!         ServerConfig::default(),
//!     )
//!     .await?;
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod config;
pub mod console;
pub mod decode;
pub mod error;
pub mod game;
pub mod maplist;
pub mod network;
pub mod outbox;
pub mod vote;
pub mod world;
