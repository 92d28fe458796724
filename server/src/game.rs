//! Level and match state that votes read and change.
//!
//! The simulation itself lives elsewhere; this is only the bookkeeping the
//! server needs to answer "which map, which limits, which phase".

use crate::config::GameConfig;
use crate::maplist::MaplistEntry;
use log::info;
use serde::Deserialize;
use shared::TICRATE;

/// Length of the results screen after a level ends.
pub const INTERMISSION_TICS: u32 = 10 * TICRATE;
/// Length of the "match starts in..." countdown.
pub const COUNTDOWN_TICS: u32 = 5 * TICRATE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum GameMode {
    #[serde(rename = "coop")]
    Cooperative,
    #[serde(rename = "dm")]
    Deathmatch,
    #[serde(rename = "duel")]
    Duel,
    #[serde(rename = "teamdm")]
    TeamDeathmatch,
    #[serde(rename = "ctf")]
    CaptureTheFlag,
}

impl GameMode {
    pub fn name(&self) -> &'static str {
        match self {
            GameMode::Cooperative => "cooperative",
            GameMode::Deathmatch => "deathmatch",
            GameMode::Duel => "duel",
            GameMode::TeamDeathmatch => "team deathmatch",
            GameMode::CaptureTheFlag => "capture the flag",
        }
    }

    /// Only flag captures count as score.
    pub fn uses_scorelimit(&self) -> bool {
        matches!(self, GameMode::CaptureTheFlag)
    }

    pub fn is_team_game(&self) -> bool {
        matches!(self, GameMode::TeamDeathmatch | GameMode::CaptureTheFlag)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Team {
    Blue,
    Red,
}

impl Team {
    pub fn name(&self) -> &'static str {
        match self {
            Team::Blue => "Blue",
            Team::Red => "Red",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarmupStatus {
    Disabled,
    Warmup,
    Countdown,
    /// Countdown that ends in a level reload and can't be cancelled.
    ForceCountdown,
    Ingame,
}

/// Something the world must act on after a game tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelEvent {
    IntermissionOver,
    Reload,
}

#[derive(Debug, Clone)]
pub struct GameState {
    /// Monotonic tic counter, never reset by a map change.
    pub tic: u32,
    pub mode: GameMode,
    pub fraglimit: u32,
    pub scorelimit: u32,
    pub timelimit: f32,
    pub map: String,
    warmup_enabled: bool,
    warmup: WarmupStatus,
    countdown: u32,
    intermission: Option<u32>,
    /// Bumped by every level load.
    level: u32,
}

impl GameState {
    pub fn new(config: &GameConfig) -> Self {
        let map = config
            .maps
            .first()
            .map(|entry| entry.map.clone())
            .unwrap_or_else(|| "MAP01".to_string());

        Self {
            tic: 0,
            mode: config.mode,
            fraglimit: config.fraglimit,
            scorelimit: config.scorelimit,
            timelimit: config.timelimit,
            map,
            warmup_enabled: config.warmup,
            warmup: if config.warmup {
                WarmupStatus::Warmup
            } else {
                WarmupStatus::Disabled
            },
            countdown: 0,
            intermission: None,
            level: 0,
        }
    }

    pub fn change_map(&mut self, entry: &MaplistEntry) {
        info!("Changing map to {} ({})", entry.map, entry.wads);
        self.map = entry.map.clone();
        self.intermission = None;
        self.countdown = 0;
        self.warmup = if self.warmup_enabled {
            WarmupStatus::Warmup
        } else {
            WarmupStatus::Disabled
        };
        self.level = self.level.wrapping_add(1);
    }

    /// Ends the level and shows the results screen.
    pub fn exit_level(&mut self) {
        if self.intermission.is_none() {
            info!("Level {} ended", self.map);
            self.intermission = Some(INTERMISSION_TICS);
        }
    }

    pub fn restart(&mut self) {
        self.warmup = WarmupStatus::ForceCountdown;
        self.countdown = COUNTDOWN_TICS;
    }

    /// Skips the rest of warmup. Does nothing outside of warmup.
    pub fn force_start(&mut self) {
        if self.warmup == WarmupStatus::Warmup {
            self.warmup = WarmupStatus::Countdown;
            self.countdown = COUNTDOWN_TICS;
        }
    }

    pub fn warmup_status(&self) -> WarmupStatus {
        self.warmup
    }

    pub fn in_intermission(&self) -> bool {
        self.intermission.is_some()
    }

    /// Generation of the loaded level. Anything that remembers it can tell
    /// whether the map changed since, however many tics passed.
    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn tick(&mut self) -> Option<LevelEvent> {
        self.tic = self.tic.wrapping_add(1);

        if let Some(remaining) = self.intermission.as_mut() {
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                return Some(LevelEvent::IntermissionOver);
            }
            return None;
        }

        match self.warmup {
            WarmupStatus::Countdown | WarmupStatus::ForceCountdown => {
                self.countdown = self.countdown.saturating_sub(1);
                if self.countdown > 0 {
                    return None;
                }
                let forced = self.warmup == WarmupStatus::ForceCountdown;
                self.warmup = WarmupStatus::Ingame;
                if forced {
                    return Some(LevelEvent::Reload);
                }
                info!("Match started on {}", self.map);
                None
            }
            _ => None,
        }
    }
}
