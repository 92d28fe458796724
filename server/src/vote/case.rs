//! The things players can vote on.
//!
//! A [`VoteCase`] is built once when a vote is called, after its arguments
//! have been checked against the current server state. While the vote runs it
//! is rechecked every tic, and if the vote passes it is executed exactly once.
//! The operator console builds cases the same way and executes them directly.

use super::VoteContext;
use crate::config::CallvoteFlags;
use crate::error::{MaplistError, VoteError};
use log::{info, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use shared::VoteKind;

use crate::game::{Team, WarmupStatus};

/// Kind specific state captured when the vote was called.
#[derive(Debug, Clone, PartialEq)]
pub enum Motion {
    Kick {
        target: u32,
        name: String,
        reason: Option<String>,
    },
    ForceSpec {
        target: u32,
        name: String,
    },
    ForceStart,
    Map {
        index: usize,
        /// Maplist version the index was resolved against.
        version: u64,
    },
    NextMap,
    RandMap,
    RandCaps,
    RandPickup {
        size: usize,
    },
    Restart,
    FragLimit(u32),
    ScoreLimit(u32),
    TimeLimit(f32),
    Coinflip,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoteCase {
    description: String,
    motion: Motion,
}

impl VoteCase {
    /// Builds a case for a player's callvote, honouring the server's
    /// per-kind switches.
    pub fn validate(
        kind: VoteKind,
        args: &[String],
        caller: Option<u32>,
        flags: &CallvoteFlags,
        ctx: &VoteContext,
    ) -> Result<VoteCase, VoteError> {
        if !flags.allows(kind) {
            return Err(VoteError::Disabled(kind.command()));
        }
        Self::setup(kind, args, caller, ctx)
    }

    /// Parses and checks the arguments of a vote kind.
    ///
    /// `caller` is the player proposing it, or `None` for the operator.
    pub fn setup(
        kind: VoteKind,
        args: &[String],
        caller: Option<u32>,
        ctx: &VoteContext,
    ) -> Result<VoteCase, VoteError> {
        let motion = match kind {
            VoteKind::Kick => {
                let (target, name) = find_target(args, "kick <player id> [reason]", ctx)?;
                if caller == Some(target) {
                    return Err(VoteError::KickSelf);
                }
                let reason = if args.len() > 1 {
                    Some(args[1..].join(" "))
                } else {
                    None
                };
                Motion::Kick {
                    target,
                    name,
                    reason,
                }
            }
            VoteKind::ForceSpec => {
                let (target, name) = find_target(args, "forcespec <player id>", ctx)?;
                if caller == Some(target) {
                    return Err(VoteError::ForceSpecSelf);
                }
                if ctx.clients.get(target).is_some_and(|c| c.spectator) {
                    return Err(VoteError::AlreadySpectating(name));
                }
                Motion::ForceSpec { target, name }
            }
            VoteKind::ForceStart => {
                if ctx.game.warmup_status() != WarmupStatus::Warmup {
                    return Err(VoteError::NotInWarmup);
                }
                Motion::ForceStart
            }
            VoteKind::Map => {
                if args.is_empty() {
                    return Err(VoteError::Usage("map <map name or maplist position>"));
                }
                let index = ctx.maplist.gotomap_check(args)?;
                Motion::Map {
                    index,
                    version: ctx.maplist.version(),
                }
            }
            VoteKind::NextMap => {
                ctx.maplist.randmap_check()?;
                Motion::NextMap
            }
            VoteKind::RandMap => {
                ctx.maplist.randmap_check()?;
                Motion::RandMap
            }
            VoteKind::RandCaps => {
                if !ctx.game.mode.is_team_game() {
                    return Err(VoteError::NotTeamGame("randcaps"));
                }
                let available = ctx.clients.ingame_count();
                if available < 2 {
                    return Err(VoteError::NotEnoughPlayers {
                        needed: 2,
                        available,
                    });
                }
                Motion::RandCaps
            }
            VoteKind::RandPickup => {
                let arg = args
                    .first()
                    .ok_or(VoteError::Usage("randpickup <number of players>"))?;
                let size = parse_count("randpickup", arg)? as usize;
                if size < 4 || size % 2 != 0 {
                    return Err(VoteError::PickupSize);
                }
                let available = ctx.clients.ingame_count();
                if size > available {
                    return Err(VoteError::NotEnoughPlayers {
                        needed: size,
                        available,
                    });
                }
                Motion::RandPickup { size }
            }
            VoteKind::Restart => Motion::Restart,
            VoteKind::FragLimit => {
                let arg = args.first().ok_or(VoteError::Usage("fraglimit <frags>"))?;
                Motion::FragLimit(parse_count("fraglimit", arg)?)
            }
            VoteKind::ScoreLimit => {
                if !ctx.game.mode.uses_scorelimit() {
                    return Err(VoteError::ScorelimitUnused(ctx.game.mode.name()));
                }
                let arg = args.first().ok_or(VoteError::Usage("scorelimit <score>"))?;
                Motion::ScoreLimit(parse_count("scorelimit", arg)?)
            }
            VoteKind::TimeLimit => {
                let arg = args.first().ok_or(VoteError::Usage("timelimit <minutes>"))?;
                Motion::TimeLimit(parse_minutes(arg)?)
            }
            VoteKind::Coinflip => Motion::Coinflip,
        };

        let description = describe(&motion, ctx);
        Ok(VoteCase {
            description,
            motion,
        })
    }

    pub fn kind(&self) -> VoteKind {
        match self.motion {
            Motion::Kick { .. } => VoteKind::Kick,
            Motion::ForceSpec { .. } => VoteKind::ForceSpec,
            Motion::ForceStart => VoteKind::ForceStart,
            Motion::Map { .. } => VoteKind::Map,
            Motion::NextMap => VoteKind::NextMap,
            Motion::RandMap => VoteKind::RandMap,
            Motion::RandCaps => VoteKind::RandCaps,
            Motion::RandPickup { .. } => VoteKind::RandPickup,
            Motion::Restart => VoteKind::Restart,
            Motion::FragLimit(_) => VoteKind::FragLimit,
            Motion::ScoreLimit(_) => VoteKind::ScoreLimit,
            Motion::TimeLimit(_) => VoteKind::TimeLimit,
            Motion::Coinflip => VoteKind::Coinflip,
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn motion(&self) -> &Motion {
        &self.motion
    }

    /// Checks that the vote still makes sense. Called every tic.
    pub fn recheck(&self, ctx: &VoteContext) -> Result<(), VoteError> {
        match &self.motion {
            Motion::Kick { target, name, .. } => {
                if ctx.clients.get(*target).is_none() {
                    return Err(VoteError::TargetLeft(name.clone()));
                }
                Ok(())
            }
            Motion::ForceSpec { target, name } => match ctx.clients.get(*target) {
                None => Err(VoteError::TargetLeft(name.clone())),
                Some(client) if client.spectator => {
                    Err(VoteError::AlreadySpectating(name.clone()))
                }
                Some(_) => Ok(()),
            },
            Motion::ForceStart => {
                if ctx.game.warmup_status() != WarmupStatus::Warmup {
                    return Err(VoteError::NotInWarmup);
                }
                Ok(())
            }
            Motion::Map { version, .. } => {
                if *version != ctx.maplist.version() {
                    return Err(VoteError::MaplistChanged);
                }
                Ok(())
            }
            Motion::NextMap | Motion::RandMap => Ok(ctx.maplist.randmap_check()?),
            _ => Ok(()),
        }
    }

    /// Carries out the vote.
    pub fn execute(&self, ctx: &mut VoteContext) -> Result<(), VoteError> {
        match &self.motion {
            Motion::Kick { target, reason, .. } => {
                if ctx.clients.get(*target).is_none() {
                    return Err(VoteError::KickDodged);
                }
                let reason = match reason {
                    Some(reason) => format!("Vote kick: {}", reason),
                    None => "Vote kick.".to_string(),
                };
                ctx.outbox.drop_client(*target, reason);
            }
            Motion::ForceSpec { target, name } => {
                let client = ctx
                    .clients
                    .get_mut(*target)
                    .ok_or_else(|| VoteError::TargetLeft(name.clone()))?;
                client.spectator = true;
                client.team = None;
                ctx.outbox
                    .broadcast_print(format!("{} was forced to spectate.", name));
            }
            Motion::ForceStart => {
                if ctx.game.warmup_status() != WarmupStatus::Warmup {
                    return Err(VoteError::NotInWarmup);
                }
                ctx.game.force_start();
                ctx.outbox.broadcast_print("Forcing the match to start.");
            }
            Motion::Map { index, .. } => {
                let entry = ctx.maplist.goto(*index).ok_or(MaplistError::NotFound)?;
                ctx.game.change_map(&entry);
            }
            Motion::NextMap => {
                ctx.maplist.randmap_check()?;
                ctx.game.exit_level();
            }
            Motion::RandMap => {
                let index = ctx
                    .maplist
                    .random_index(&mut *ctx.rng)
                    .ok_or(MaplistError::Empty)?;
                let entry = ctx.maplist.goto(index).ok_or(MaplistError::NotFound)?;
                ctx.game.change_map(&entry);
            }
            Motion::RandCaps => {
                let captains = pick_players(2, ctx)?;
                let blue = name_of(captains[0], ctx);
                let red = name_of(captains[1], ctx);
                ctx.outbox.broadcast_print(format!(
                    "Captains are {} ({}) and {} ({}).",
                    blue,
                    Team::Blue.name(),
                    red,
                    Team::Red.name()
                ));
            }
            Motion::RandPickup { size } => {
                let picked = pick_players(*size, ctx)?;
                let names: Vec<String> = picked.iter().map(|&id| name_of(id, ctx)).collect();
                let (blue, red) = names.split_at(size / 2);
                if ctx.game.mode.is_team_game() {
                    ctx.outbox.broadcast_print(format!(
                        "{}: {}. {}: {}.",
                        Team::Blue.name(),
                        blue.join(", "),
                        Team::Red.name(),
                        red.join(", ")
                    ));
                } else {
                    ctx.outbox
                        .broadcast_print(format!("Picked players: {}.", names.join(", ")));
                }
            }
            Motion::Restart => {
                ctx.game.restart();
                ctx.outbox.broadcast_print("Restarting the level...");
            }
            Motion::FragLimit(limit) => {
                ctx.game.fraglimit = *limit;
                ctx.outbox
                    .broadcast_print(format!("fraglimit changed to {}.", limit));
            }
            Motion::ScoreLimit(limit) => {
                ctx.game.scorelimit = *limit;
                ctx.outbox
                    .broadcast_print(format!("scorelimit changed to {}.", limit));
            }
            Motion::TimeLimit(minutes) => {
                ctx.game.timelimit = *minutes;
                ctx.outbox
                    .broadcast_print(format!("timelimit changed to {}.", minutes));
            }
            Motion::Coinflip => {
                let side = if ctx.rng.gen_bool(0.5) {
                    "heads"
                } else {
                    "tails"
                };
                ctx.outbox
                    .broadcast_print(format!("Coinflip: the coin landed on {}.", side));
            }
        }

        info!("Executed vote {}", self.description);
        Ok(())
    }
}

fn describe(motion: &Motion, ctx: &VoteContext) -> String {
    match motion {
        Motion::Kick {
            target,
            name,
            reason,
        } => match reason {
            Some(reason) => format!("kick {} (id:{}): {}", name, target, reason),
            None => format!("kick {} (id:{})", name, target),
        },
        Motion::ForceSpec { target, name } => format!("forcespec {} (id:{})", name, target),
        Motion::Map { index, .. } => match ctx.maplist.get(*index) {
            Some(entry) => format!("map {}", entry.describe()),
            None => "map".to_string(),
        },
        Motion::RandPickup { size } => format!("randpickup {}v{}", size / 2, size / 2),
        Motion::FragLimit(limit) => format!("fraglimit {}", limit),
        Motion::ScoreLimit(limit) => format!("scorelimit {}", limit),
        Motion::TimeLimit(minutes) => format!("timelimit {}", minutes),
        Motion::ForceStart => "forcestart".to_string(),
        Motion::NextMap => "nextmap".to_string(),
        Motion::RandMap => "randmap".to_string(),
        Motion::RandCaps => "randcaps".to_string(),
        Motion::Restart => "restart".to_string(),
        Motion::Coinflip => "coinflip".to_string(),
    }
}

fn find_target(
    args: &[String],
    usage: &'static str,
    ctx: &VoteContext,
) -> Result<(u32, String), VoteError> {
    let arg = args.first().ok_or(VoteError::Usage(usage))?;
    let client = arg
        .trim()
        .parse::<u32>()
        .ok()
        .and_then(|id| ctx.clients.get(id))
        .ok_or_else(|| VoteError::NoSuchPlayer(arg.clone()))?;
    Ok((client.id, client.name.clone()))
}

/// Non-negative integer argument. The sign is checked on the raw text so
/// "-0" is refused as well.
fn parse_count(name: &'static str, arg: &str) -> Result<u32, VoteError> {
    let arg = arg.trim();
    if arg.starts_with('-') {
        return Err(VoteError::Negative(name));
    }
    arg.parse::<u32>().map_err(|_| VoteError::NotANumber(name))
}

/// Timelimit in minutes: 0 for none, otherwise at least one minute.
fn parse_minutes(arg: &str) -> Result<f32, VoteError> {
    let arg = arg.trim();
    if arg.starts_with('-') {
        return Err(VoteError::Negative("timelimit"));
    }
    let minutes = arg
        .parse::<f32>()
        .ok()
        .filter(|m| m.is_finite())
        .ok_or(VoteError::NotANumber("timelimit"))?;
    if minutes > 0.0 && minutes < 1.0 {
        return Err(VoteError::FractionalTimelimit);
    }
    Ok(minutes)
}

fn name_of(id: u32, ctx: &VoteContext) -> String {
    ctx.clients
        .get(id)
        .map(|client| client.name.clone())
        .unwrap_or_default()
}

/// Puts `count` random in-game players into the match and everyone else on
/// the sidelines. In team games the picks are split evenly, first half blue.
fn pick_players(count: usize, ctx: &mut VoteContext) -> Result<Vec<u32>, VoteError> {
    let mut pool: Vec<u32> = ctx
        .clients
        .iter()
        .filter(|client| client.ingame)
        .map(|client| client.id)
        .collect();

    if pool.len() < count {
        warn!(
            "Could not pick {} players, only {} in game",
            count,
            pool.len()
        );
        return Err(VoteError::NotEnoughPlayers {
            needed: count,
            available: pool.len(),
        });
    }

    pool.shuffle(&mut *ctx.rng);
    let picked: Vec<u32> = pool[..count].to_vec();
    let team_game = ctx.game.mode.is_team_game();

    for id in ctx.clients.ids() {
        let Some(client) = ctx.clients.get_mut(id) else {
            continue;
        };
        match picked.iter().position(|&p| p == id) {
            Some(slot) => {
                client.spectator = false;
                client.team = if !team_game {
                    None
                } else if slot < count / 2 {
                    Some(Team::Blue)
                } else {
                    Some(Team::Red)
                };
            }
            None => {
                client.spectator = true;
                client.team = None;
            }
        }
    }

    Ok(picked)
}
