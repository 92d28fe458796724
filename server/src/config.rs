//! Server configuration loaded from an optional TOML file.
//!
//! Every key has a default, so an empty file (or no file at all) yields a
//! working deathmatch server with voting enabled for the common kinds.

use crate::error::ConfigError;
use crate::game::GameMode;
use crate::maplist::MaplistEntry;
use serde::Deserialize;
use shared::VoteKind;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub game: GameConfig,
    pub vote: VoteConfig,
}

impl ServerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: ServerConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let majority = self.vote.majority;
        if !(majority > 0.0 && majority <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "vote.majority must be in (0, 1], got {majority}"
            )));
        }
        if self.game.timelimit < 0.0 {
            return Err(ConfigError::Invalid(
                "game.timelimit must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub mode: GameMode,
    pub fraglimit: u32,
    pub scorelimit: u32,
    /// Minutes, 0 for no limit.
    pub timelimit: f32,
    pub warmup: bool,
    pub maps: Vec<MaplistEntry>,
    /// Minimum delay between two chat lines from the same client.
    pub chat_flood_ms: u64,
    pub client_timeout_secs: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            mode: GameMode::Deathmatch,
            fraglimit: 20,
            scorelimit: 5,
            timelimit: 0.0,
            warmup: false,
            maps: Vec::new(),
            chat_flood_ms: 1000,
            client_timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VoteConfig {
    /// Fraction of the electorate needed to pass a vote.
    pub majority: f32,
    /// Count absentees as "no" when the countdown runs out.
    pub count_absent: bool,
    pub spectator_call: bool,
    pub spectator_vote: bool,
    /// How long a vote runs before it is forced to a verdict.
    pub timelimit_secs: u32,
    /// Cooldown before a player whose vote failed may call another one.
    pub timeout_secs: u32,
    /// Minimum delay between two ballot changes of the same player.
    pub ballot_cooldown_secs: u32,
    pub callvote: CallvoteFlags,
}

impl Default for VoteConfig {
    fn default() -> Self {
        Self {
            majority: 0.5,
            count_absent: true,
            spectator_call: false,
            spectator_vote: false,
            timelimit_secs: 30,
            timeout_secs: 60,
            ballot_cooldown_secs: 2,
            callvote: CallvoteFlags::default(),
        }
    }
}

/// Per-kind switches for client initiated votes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CallvoteFlags {
    pub kick: bool,
    pub forcespec: bool,
    pub forcestart: bool,
    pub map: bool,
    pub nextmap: bool,
    pub randmap: bool,
    pub randcaps: bool,
    pub randpickup: bool,
    pub restart: bool,
    pub fraglimit: bool,
    pub scorelimit: bool,
    pub timelimit: bool,
    pub coinflip: bool,
}

impl Default for CallvoteFlags {
    fn default() -> Self {
        Self {
            kick: true,
            forcespec: false,
            forcestart: false,
            map: true,
            nextmap: true,
            randmap: true,
            randcaps: false,
            randpickup: false,
            restart: true,
            fraglimit: true,
            scorelimit: true,
            timelimit: true,
            coinflip: true,
        }
    }
}

impl CallvoteFlags {
    pub fn allows(&self, kind: VoteKind) -> bool {
        match kind {
            VoteKind::Kick => self.kick,
            VoteKind::ForceSpec => self.forcespec,
            VoteKind::ForceStart => self.forcestart,
            VoteKind::Map => self.map,
            VoteKind::NextMap => self.nextmap,
            VoteKind::RandMap => self.randmap,
            VoteKind::RandCaps => self.randcaps,
            VoteKind::RandPickup => self.randpickup,
            VoteKind::Restart => self.restart,
            VoteKind::FragLimit => self.fraglimit,
            VoteKind::ScoreLimit => self.scorelimit,
            VoteKind::TimeLimit => self.timelimit,
            VoteKind::Coinflip => self.coinflip,
        }
    }

    /// Turns every kind on, handy for tests and private servers.
    pub fn all_enabled() -> Self {
        Self {
            kick: true,
            forcespec: true,
            forcestart: true,
            map: true,
            nextmap: true,
            randmap: true,
            randcaps: true,
            randpickup: true,
            restart: true,
            fraglimit: true,
            scorelimit: true,
            timelimit: true,
            coinflip: true,
        }
    }
}
