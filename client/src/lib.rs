//! # Callvote Client Library
//!
//! This library provides a console client for the callvote server. It turns
//! typed lines into protocol packets, keeps the connection alive and shows
//! the state of the running vote as the server reports it.
//!
//! ## Architecture Overview
//!
//! The server is authoritative for everything. The client never decides
//! whether a vote is valid or who may vote; it forwards what the player typed
//! and prints what comes back. Argument mistakes such as a negative frag
//! limit are reported by the server, so client and server can't disagree.
//!
//! ## Module Organization
//!
//! ### Command Module (`command`)
//! Parses console input:
//! - `callvote <vote> [args]` with the vote name checked locally
//! - `vote yes|no`, and the `yes` / `no` shortcuts
//! - chat, spectating and leaving
//!
//! ### Vote State Module (`vote_state`)
//! Tracks the running vote from `VoteUpdate` packets and formats it for the
//! terminal.
//!
//! ### Network Module (`network`)
//! Manages all client-server communication:
//! - UDP socket management and connection handling
//! - Packet serialization and deserialization
//! - Heartbeats so the server doesn't time the client out
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = Client::new("127.0.0.1:10666", "Player").await?;
//!     client.run().await?;
//!     Ok(())
//! }
//! ```

pub mod command;
pub mod network;
pub mod vote_state;
