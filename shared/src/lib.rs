use serde::{Deserialize, Serialize};
use std::fmt;

/// Simulation tics per second.
pub const TICRATE: u32 = 35;
pub const PROTOCOL_VERSION: u32 = 1;
pub const MAXPLAYERS: usize = 255;

pub const MAX_NAME_LEN: usize = 32;
pub const MAX_CHAT_LEN: usize = 128;
pub const MAX_CALLVOTE_ARGS: usize = 8;
pub const MAX_ARG_LEN: usize = 64;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    // Client -> server
    Connect {
        client_version: u32,
        name: String,
    },
    Loaded,
    Heartbeat,
    Say {
        message: String,
    },
    Spectate {
        spectate: bool,
    },
    CallVote {
        kind: VoteKind,
        args: Vec<String>,
    },
    Vote {
        ballot: bool,
    },
    Disconnect,

    // Server -> client
    Connected {
        client_id: u32,
    },
    Print {
        message: String,
    },
    VoteUpdate(VoteState),
    Disconnected {
        reason: String,
    },
}

impl Packet {
    /// True for packets a client is allowed to send.
    pub fn is_client_packet(&self) -> bool {
        matches!(
            self,
            Packet::Connect { .. }
                | Packet::Loaded
                | Packet::Heartbeat
                | Packet::Say { .. }
                | Packet::Spectate { .. }
                | Packet::CallVote { .. }
                | Packet::Vote { .. }
                | Packet::Disconnect
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Packet::Connect { .. } => "connect",
            Packet::Loaded => "loaded",
            Packet::Heartbeat => "heartbeat",
            Packet::Say { .. } => "say",
            Packet::Spectate { .. } => "spectate",
            Packet::CallVote { .. } => "callvote",
            Packet::Vote { .. } => "vote",
            Packet::Disconnect => "disconnect",
            Packet::Connected { .. } => "connected",
            Packet::Print { .. } => "print",
            Packet::VoteUpdate(_) => "vote_update",
            Packet::Disconnected { .. } => "disconnected",
        }
    }
}

/// Every kind of vote a client can call.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoteKind {
    Kick,
    ForceSpec,
    ForceStart,
    Map,
    NextMap,
    RandMap,
    RandCaps,
    RandPickup,
    Restart,
    FragLimit,
    ScoreLimit,
    TimeLimit,
    Coinflip,
}

impl VoteKind {
    pub const ALL: [VoteKind; 13] = [
        VoteKind::Coinflip,
        VoteKind::ForceSpec,
        VoteKind::ForceStart,
        VoteKind::FragLimit,
        VoteKind::Kick,
        VoteKind::Map,
        VoteKind::NextMap,
        VoteKind::RandCaps,
        VoteKind::RandMap,
        VoteKind::RandPickup,
        VoteKind::Restart,
        VoteKind::ScoreLimit,
        VoteKind::TimeLimit,
    ];

    /// Console name of the vote, as typed after `callvote`.
    pub fn command(&self) -> &'static str {
        match self {
            VoteKind::Kick => "kick",
            VoteKind::ForceSpec => "forcespec",
            VoteKind::ForceStart => "forcestart",
            VoteKind::Map => "map",
            VoteKind::NextMap => "nextmap",
            VoteKind::RandMap => "randmap",
            VoteKind::RandCaps => "randcaps",
            VoteKind::RandPickup => "randpickup",
            VoteKind::Restart => "restart",
            VoteKind::FragLimit => "fraglimit",
            VoteKind::ScoreLimit => "scorelimit",
            VoteKind::TimeLimit => "timelimit",
            VoteKind::Coinflip => "coinflip",
        }
    }

    pub fn from_command(command: &str) -> Option<VoteKind> {
        let command = command.to_ascii_lowercase();
        VoteKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.command() == command)
    }

    /// Comma separated list of every vote name, for help output.
    pub fn valid_commands() -> String {
        VoteKind::ALL
            .iter()
            .map(|kind| kind.command())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for VoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum VoteResult {
    Undecided,
    Yes,
    No,
    Interrupted,
    Abandoned,
}

impl VoteResult {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, VoteResult::Undecided)
    }
}

/// Snapshot of the running vote as shown to clients.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct VoteState {
    pub result: VoteResult,
    pub description: String,
    /// Remaining tics before the vote is forced to a verdict.
    pub countdown: u32,
    pub yes: u32,
    pub yes_needed: u32,
    pub no: u32,
    pub no_needed: u32,
    pub abstain: u32,
}

impl VoteState {
    pub fn seconds_left(&self) -> u32 {
        self.countdown.div_ceil(TICRATE)
    }
}

/// Printable ASCII only, the character set names, chat and vote arguments
/// are restricted to.
pub fn is_valid_string(s: &str) -> bool {
    s.bytes().all(|b| (0x20..0x7f).contains(&b))
}
