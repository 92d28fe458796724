//! Error types for the server.
//!
//! The `Display` text of [`VoteError`] is exactly what players read, so
//! messages are written as full sentences.

use thiserror::Error;

/// A client sent something that can't be trusted. Fatal to the connection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Could not decode message")]
    Decode,

    #[error("Unexpected {0} message from client")]
    UnexpectedPacket(&'static str),

    #[error("Name is empty or too long")]
    InvalidName,

    #[error("{0} contains invalid characters")]
    InvalidCharacters(&'static str),

    #[error("Chat message is too long")]
    ChatTooLong,

    #[error("Too many callvote arguments ({0})")]
    TooManyArguments(usize),

    #[error("Callvote argument is too long")]
    ArgumentTooLong,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MaplistError {
    #[error("Map list is empty.")]
    Empty,

    #[error("Map or maplist position does not exist.")]
    NotFound,

    #[error("Map is ambiguous.")]
    Ambiguous,
}

fn plural(count: &u32) -> &'static str {
    if *count == 1 {
        ""
    } else {
        "s"
    }
}

/// Why a vote could not be called, cast, kept alive or executed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum VoteError {
    // Proposal
    #[error("Another vote is already in progress.")]
    AlreadyInProgress,

    #[error("You must be in the game to call a vote.")]
    NotInGame,

    #[error("Spectators are not allowed to call votes.")]
    SpectatorCall,

    #[error("Please wait another {seconds} second{} to call a vote.", plural(.seconds))]
    CallCooldown { seconds: u32 },

    #[error("{0} vote has been disabled by the server.")]
    Disabled(&'static str),

    // Argument validation
    #[error("Usage: callvote {0}")]
    Usage(&'static str),

    #[error("{0} must be a number.")]
    NotANumber(&'static str),

    #[error("{0} must be a non-negative number.")]
    Negative(&'static str),

    #[error("timelimit must be 0 or at least 1 minute.")]
    FractionalTimelimit,

    #[error("scorelimit has no effect in {0}.")]
    ScorelimitUnused(&'static str),

    #[error("{0} is not a valid player id.")]
    NoSuchPlayer(String),

    #[error("You can't votekick yourself! Try 'disconnect' instead.")]
    KickSelf,

    #[error("You can't force yourself to spectate! Try 'spectate' instead.")]
    ForceSpecSelf,

    #[error("{0} is already spectating.")]
    AlreadySpectating(String),

    #[error("The match is not in warmup.")]
    NotInWarmup,

    #[error("{0} is only available in team games.")]
    NotTeamGame(&'static str),

    #[error("randpickup needs an even number of at least 4 players.")]
    PickupSize,

    #[error("Not enough players, {needed} needed but only {available} in game.")]
    NotEnoughPlayers { needed: usize, available: usize },

    #[error(transparent)]
    Maplist(#[from] MaplistError),

    // Recheck
    #[error("{0} left the server.")]
    TargetLeft(String),

    #[error("Map list was modified.")]
    MaplistChanged,

    // Ballots
    #[error("There is no vote in progress.")]
    NoVoteInProgress,

    #[error("You are not eligible to vote on this ballot.")]
    NotEligible,

    #[error("You already voted that way.")]
    UnchangedBallot,

    #[error("Please wait another {seconds} second{} to change your vote.", plural(.seconds))]
    BallotCooldown { seconds: u32 },

    // Execution
    #[error("Vote kick dodged, please alert a server administrator.")]
    KickDodged,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value: {0}")]
    Invalid(String),
}
