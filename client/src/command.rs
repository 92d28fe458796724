//! Parsing of the lines a player types into packets for the server.

use shared::{Packet, VoteKind};
use thiserror::Error;

/// Something the player asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Goes straight to the server.
    Send(Packet),
    /// Shows the running vote.
    Status,
    Help,
    Quit,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Usage: callvote <vote> [arguments]. Votes: {0}")]
    MissingVote(String),

    #[error("Unknown vote \"{0}\". Votes: {1}")]
    UnknownVote(String, String),

    #[error("Usage: vote <yes|no>")]
    BadBallot,

    #[error("Unknown command \"{0}\", type help for a list")]
    Unknown(String),
}

pub const HELP: &str = "Commands: callvote <vote> [args], vote <yes|no>, yes, no, \
                        say <message>, spectate, join, status, quit";

/// Parses one input line. Returns `Ok(None)` for blank lines.
pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    let mut words = line.split_whitespace();
    let Some(first) = words.next() else {
        return Ok(None);
    };

    let command = match first.to_ascii_lowercase().as_str() {
        "callvote" => {
            let name = words
                .next()
                .ok_or_else(|| CommandError::MissingVote(VoteKind::valid_commands()))?;
            let kind = VoteKind::from_command(name).ok_or_else(|| {
                CommandError::UnknownVote(name.to_string(), VoteKind::valid_commands())
            })?;
            let args = words.map(str::to_string).collect();
            Command::Send(Packet::CallVote { kind, args })
        }
        "vote" => {
            let ballot = words.next().ok_or(CommandError::BadBallot)?;
            Command::Send(Packet::Vote {
                ballot: parse_ballot(ballot)?,
            })
        }
        "yes" | "f1" => Command::Send(Packet::Vote { ballot: true }),
        "no" | "f2" => Command::Send(Packet::Vote { ballot: false }),
        "say" => {
            let message = line[first.len()..].trim().to_string();
            Command::Send(Packet::Say { message })
        }
        "spectate" => Command::Send(Packet::Spectate { spectate: true }),
        "join" => Command::Send(Packet::Spectate { spectate: false }),
        "status" => Command::Status,
        "help" => Command::Help,
        "quit" | "disconnect" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };

    Ok(Some(command))
}

fn parse_ballot(word: &str) -> Result<bool, CommandError> {
    match word.to_ascii_lowercase().as_str() {
        "yes" | "y" | "1" => Ok(true),
        "no" | "n" | "0" => Ok(false),
        _ => Err(CommandError::BadBallot),
    }
}
