//! The running vote.
//!
//! At most one vote exists at a time. It is created by [`Voting::propose`],
//! advanced once per tic by [`Voting::tick`] and destroyed as soon as it
//! reaches a verdict. Clients learn about every change through
//! `VoteUpdate` broadcasts queued in the outbox.

use super::case::VoteCase;
use super::tally::{Ballot, BallotTally, Decision, QuorumPolicy};
use super::VoteContext;
use crate::config::VoteConfig;
use crate::error::VoteError;
use crate::outbox::Outbox;
use log::{debug, info, warn};
use shared::{VoteKind, VoteResult, VoteState, TICRATE};

/// Call cooldown when the proposer is alone on the server.
pub const SOLO_CALL_COOLDOWN_SECS: u32 = 10;
/// Interval of the "seconds left to vote" reminder.
const REMINDER_TICS: u32 = 5 * TICRATE;

/// How a session ended.
#[derive(Debug, Clone, PartialEq)]
enum Verdict {
    Passed,
    Failed,
    Interrupted(String),
    Abandoned,
}

impl Verdict {
    fn result(&self) -> VoteResult {
        match self {
            Verdict::Passed => VoteResult::Yes,
            Verdict::Failed => VoteResult::No,
            Verdict::Interrupted(_) => VoteResult::Interrupted,
            Verdict::Abandoned => VoteResult::Abandoned,
        }
    }
}

#[derive(Debug)]
pub struct VoteSession {
    case: VoteCase,
    tally: BallotTally,
    /// Tics left before the vote is forced to a verdict.
    countdown: u32,
    caller: u32,
    /// Level the vote was called on.
    level: u32,
    result: VoteResult,
}

impl VoteSession {
    pub fn case(&self) -> &VoteCase {
        &self.case
    }

    pub fn tally(&self) -> &BallotTally {
        &self.tally
    }

    pub fn countdown(&self) -> u32 {
        self.countdown
    }

    pub fn caller(&self) -> u32 {
        self.caller
    }

    pub fn result(&self) -> VoteResult {
        self.result
    }

    pub fn state(&self, policy: &QuorumPolicy) -> VoteState {
        let counts = self.tally.counts();
        VoteState {
            result: self.result,
            description: self.case.description().to_string(),
            countdown: self.countdown,
            yes: counts.yes as u32,
            yes_needed: self.tally.yes_threshold(policy, false) as u32,
            no: counts.no as u32,
            no_needed: self.tally.no_threshold(policy) as u32,
            abstain: counts.undecided as u32,
        }
    }
}

pub struct Voting {
    config: VoteConfig,
    current: Option<VoteSession>,
}

impl Voting {
    pub fn new(config: VoteConfig) -> Self {
        Self {
            config,
            current: None,
        }
    }

    pub fn config(&self) -> &VoteConfig {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    pub fn current(&self) -> Option<&VoteSession> {
        self.current.as_ref()
    }

    pub fn state(&self) -> Option<VoteState> {
        let policy = self.policy();
        self.current.as_ref().map(|session| session.state(&policy))
    }

    fn policy(&self) -> QuorumPolicy {
        QuorumPolicy {
            majority: self.config.majority,
            count_absent: self.config.count_absent,
        }
    }

    /// Starts a vote on behalf of `caller`.
    ///
    /// The caller is told nothing here; the error is theirs to display.
    pub fn propose(
        &mut self,
        caller: u32,
        kind: VoteKind,
        args: &[String],
        ctx: &mut VoteContext,
    ) -> Result<(), VoteError> {
        if self.current.is_some() {
            return Err(VoteError::AlreadyInProgress);
        }

        let client = ctx.clients.get(caller).ok_or(VoteError::NotInGame)?;
        if !client.ingame {
            return Err(VoteError::NotInGame);
        }
        if client.spectator && !self.config.spectator_call {
            return Err(VoteError::SpectatorCall);
        }
        if let Some(last) = client.last_callvote_tic {
            let secs = if ctx.clients.ingame_count() == 1 {
                SOLO_CALL_COOLDOWN_SECS
            } else {
                self.config.timeout_secs
            };
            let cooldown = secs * TICRATE;
            let elapsed = ctx.game.tic.saturating_sub(last);
            if elapsed < cooldown {
                return Err(VoteError::CallCooldown {
                    seconds: (cooldown - elapsed).div_ceil(TICRATE),
                });
            }
        }
        let name = client.name.clone();

        let case = VoteCase::validate(kind, args, Some(caller), &self.config.callvote, ctx)?;

        let spectator_vote = self.config.spectator_vote;
        let eligible: Vec<u32> = ctx
            .clients
            .iter()
            .filter(|c| c.is_playing() || (spectator_vote && c.ingame))
            .map(|c| c.id)
            .collect();

        let session = VoteSession {
            case,
            tally: BallotTally::seed(eligible, caller),
            countdown: self.config.timelimit_secs * TICRATE,
            caller,
            level: ctx.game.level(),
            result: VoteResult::Undecided,
        };

        info!(
            "Client {} ({}) called a vote for {} with {} eligible voters",
            caller,
            name,
            session.case.description(),
            session.tally.len()
        );
        ctx.outbox.broadcast_print(format!(
            "{} has called a vote for {}.",
            name,
            session.case.description()
        ));
        ctx.outbox.vote_update(session.state(&self.policy()));
        self.current = Some(session);
        Ok(())
    }

    /// Records a ballot. `ballot` is true for yes.
    pub fn cast(&mut self, voter: u32, ballot: bool, ctx: &mut VoteContext) -> Result<(), VoteError> {
        let policy = self.policy();
        let cooldown = self.config.ballot_cooldown_secs * TICRATE;
        let session = self.current.as_mut().ok_or(VoteError::NoVoteInProgress)?;
        let client = ctx.clients.get_mut(voter).ok_or(VoteError::NotEligible)?;

        session.tally.cast(
            voter,
            Ballot::from(ballot),
            ctx.game.tic,
            cooldown,
            client.last_vote_tic,
        )?;
        client.last_vote_tic = Some(ctx.game.tic);

        let choice = if ballot { "Yes" } else { "No" };
        let name = client.name.clone();
        ctx.outbox
            .broadcast_print(format!("{} voted {}.", name, choice));
        ctx.outbox.vote_update(session.state(&policy));
        Ok(())
    }

    /// Forgets a departed player's ballot. The running vote, if any, notices
    /// on its next tic.
    pub fn disconnect(&mut self, client_id: u32) {
        if let Some(session) = self.current.as_mut() {
            if session.tally.remove(client_id).is_some() {
                debug!("Removed ballot of client {}", client_id);
            }
        }
    }

    /// Sends the running vote to one client, for players who just joined.
    pub fn sync(&self, client_id: u32, outbox: &mut Outbox) {
        if let Some(state) = self.state() {
            outbox.send(client_id, shared::Packet::VoteUpdate(state));
        }
    }

    /// Advances the running vote by one tic.
    pub fn tick(&mut self, ctx: &mut VoteContext) {
        let policy = self.policy();
        let Some(session) = self.current.as_mut() else {
            return;
        };

        let verdict = if session.tally.is_empty() {
            Some(Verdict::Abandoned)
        } else if let Err(err) = session.case.recheck(ctx) {
            Some(Verdict::Interrupted(err.to_string()))
        } else if ctx.game.in_intermission() {
            Some(Verdict::Interrupted("The level has ended.".to_string()))
        } else if ctx.game.level() != session.level {
            Some(Verdict::Interrupted("The map has changed.".to_string()))
        } else {
            let decision = if session.countdown == 0 {
                session.tally.decide_at_deadline(&policy)
            } else {
                session.tally.decide(&policy)
            };
            match decision {
                Decision::Yes => Some(Verdict::Passed),
                Decision::No => Some(Verdict::Failed),
                Decision::Undecided => None,
            }
        };

        match verdict {
            Some(verdict) => self.resolve(verdict, ctx),
            None => {
                session.countdown -= 1;
                if session.countdown > 0 && session.countdown % REMINDER_TICS == 0 {
                    let seconds = session.countdown / TICRATE;
                    ctx.outbox
                        .broadcast_print(format!("{} seconds left to vote.", seconds));
                    ctx.outbox.vote_update(session.state(&policy));
                }
            }
        }
    }

    fn resolve(&mut self, verdict: Verdict, ctx: &mut VoteContext) {
        let policy = self.policy();
        let Some(mut session) = self.current.take() else {
            return;
        };
        session.result = verdict.result();

        let counts = session.tally.counts();
        let description = session.case.description().to_string();
        let summary = format!(
            "(Yes: {}, No: {}, Abs: {})",
            counts.yes, counts.no, counts.undecided
        );

        info!(
            "{} vote called by client {} resolved as {:?} {}",
            session.case.kind(),
            session.caller,
            session.result,
            summary
        );
        ctx.outbox.vote_update(session.state(&policy));
        match &verdict {
            Verdict::Passed => ctx
                .outbox
                .broadcast_print(format!("Vote {} passed! {}", description, summary)),
            Verdict::Failed => ctx
                .outbox
                .broadcast_print(format!("Vote {} failed! {}", description, summary)),
            Verdict::Interrupted(reason) => ctx.outbox.broadcast_print(format!(
                "Vote {} interrupted! {} {}",
                description, reason, summary
            )),
            Verdict::Abandoned => ctx
                .outbox
                .broadcast_print(format!("Vote {} abandoned, everyone left.", description)),
        }

        if verdict == Verdict::Passed {
            if let Err(err) = session.case.execute(ctx) {
                warn!("Vote {} could not be carried out: {}", description, err);
                ctx.outbox.broadcast_print(err.to_string());
            }
        } else if let Some(client) = ctx.clients.get_mut(session.caller) {
            client.last_callvote_tic = Some(ctx.game.tic);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::GameMode;
    use crate::maplist::MaplistEntry;
    use crate::outbox::Outbound;
    use crate::vote::testing::Fixture;
    use shared::Packet;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn voting(fixture: &Fixture) -> Voting {
        Voting::new(fixture.config.vote.clone())
    }

    fn printed(fixture: &mut Fixture) -> Vec<String> {
        fixture
            .outbox
            .drain()
            .into_iter()
            .filter_map(|out| match out {
                Outbound::Broadcast {
                    packet: Packet::Print { message },
                    ..
                } => Some(message),
                _ => None,
            })
            .collect()
    }

    fn last_update(fixture: &Fixture) -> Option<VoteState> {
        fixture
            .outbox
            .pending()
            .iter()
            .rev()
            .find_map(|out| match out {
                Outbound::Broadcast {
                    packet: Packet::VoteUpdate(state),
                    ..
                } => Some(state.clone()),
                _ => None,
            })
    }

    /// Runs the vote for `tics` tics, advancing the game clock alongside.
    fn run(voting: &mut Voting, fixture: &mut Fixture, tics: u32) {
        for _ in 0..tics {
            fixture.game.tick();
            voting.tick(&mut fixture.ctx());
        }
    }

    #[test]
    fn test_propose_starts_session() {
        let mut fixture = Fixture::with_players(3);
        let mut voting = voting(&fixture);

        voting
            .propose(1, VoteKind::FragLimit, &args(&["30"]), &mut fixture.ctx())
            .unwrap();

        assert!(voting.is_active());
        let state = last_update(&fixture).unwrap();
        assert_eq!(state.result, VoteResult::Undecided);
        assert_eq!(state.description, "fraglimit 30");
        assert_eq!(state.countdown, 30 * TICRATE);
        assert_eq!(state.yes, 1);
        assert_eq!(state.abstain, 2);
        assert_eq!(state.yes_needed, 2);
        assert_eq!(
            printed(&mut fixture),
            vec!["Player1 has called a vote for fraglimit 30.".to_string()]
        );
    }

    #[test]
    fn test_propose_rejections() {
        let mut fixture = Fixture::with_players(3);
        let mut voting = voting(&fixture);

        fixture.clients.get_mut(2).unwrap().spectator = true;
        assert_eq!(
            voting.propose(2, VoteKind::Coinflip, &[], &mut fixture.ctx()),
            Err(VoteError::SpectatorCall)
        );

        fixture.clients.get_mut(3).unwrap().ingame = false;
        assert_eq!(
            voting.propose(3, VoteKind::Coinflip, &[], &mut fixture.ctx()),
            Err(VoteError::NotInGame)
        );
        assert_eq!(
            voting.propose(99, VoteKind::Coinflip, &[], &mut fixture.ctx()),
            Err(VoteError::NotInGame)
        );

        // Validation errors leave no session behind.
        assert_eq!(
            voting.propose(1, VoteKind::FragLimit, &args(&["-5"]), &mut fixture.ctx()),
            Err(VoteError::Negative("fraglimit"))
        );
        assert!(!voting.is_active());

        voting
            .propose(1, VoteKind::Coinflip, &[], &mut fixture.ctx())
            .unwrap();
        assert_eq!(
            voting.propose(1, VoteKind::Restart, &[], &mut fixture.ctx()),
            Err(VoteError::AlreadyInProgress)
        );
    }

    #[test]
    fn test_spectator_call_allowed_by_config() {
        let mut fixture = Fixture::with_config(3, |config| config.vote.spectator_call = true);
        let mut voting = voting(&fixture);
        fixture.clients.get_mut(2).unwrap().spectator = true;

        voting
            .propose(2, VoteKind::Coinflip, &[], &mut fixture.ctx())
            .unwrap();
        // The proposer is seeded even though spectators don't get a ballot.
        let tally = voting.current().unwrap().tally();
        assert_eq!(tally.get(2), Some(Ballot::Yes));
        assert_eq!(tally.len(), 3);
    }

    #[test]
    fn test_spectators_excluded_from_tally() {
        let mut fixture = Fixture::with_players(4);
        let mut voting = voting(&fixture);
        fixture.clients.get_mut(4).unwrap().spectator = true;
        fixture.clients.get_mut(3).unwrap().ingame = false;

        voting
            .propose(1, VoteKind::Coinflip, &[], &mut fixture.ctx())
            .unwrap();
        let tally = voting.current().unwrap().tally();
        assert_eq!(tally.len(), 2);
        assert!(!tally.contains(3));
        assert!(!tally.contains(4));

        assert_eq!(
            voting.cast(4, true, &mut fixture.ctx()),
            Err(VoteError::NotEligible)
        );
    }

    #[test]
    fn test_tie_fails() {
        let mut fixture = Fixture::with_players(4);
        let mut voting = voting(&fixture);

        voting
            .propose(1, VoteKind::FragLimit, &args(&["30"]), &mut fixture.ctx())
            .unwrap();
        voting.cast(2, true, &mut fixture.ctx()).unwrap();
        voting.cast(3, false, &mut fixture.ctx()).unwrap();
        voting.cast(4, false, &mut fixture.ctx()).unwrap();
        fixture.outbox.drain();

        run(&mut voting, &mut fixture, 1);

        assert!(!voting.is_active());
        assert_eq!(last_update(&fixture).unwrap().result, VoteResult::No);
        assert_eq!(
            printed(&mut fixture),
            vec!["Vote fraglimit 30 failed! (Yes: 2, No: 2, Abs: 0)".to_string()]
        );
        assert_eq!(fixture.game.fraglimit, 20);
        assert_eq!(
            fixture.clients.get(1).unwrap().last_callvote_tic,
            Some(fixture.game.tic)
        );
    }

    #[test]
    fn test_majority_passes_and_executes() {
        let mut fixture = Fixture::with_players(3);
        let mut voting = voting(&fixture);

        voting
            .propose(1, VoteKind::FragLimit, &args(&["30"]), &mut fixture.ctx())
            .unwrap();
        run(&mut voting, &mut fixture, 1);
        assert!(voting.is_active());

        voting.cast(2, true, &mut fixture.ctx()).unwrap();
        fixture.outbox.drain();
        run(&mut voting, &mut fixture, 1);

        assert!(!voting.is_active());
        assert_eq!(fixture.game.fraglimit, 30);
        assert_eq!(
            printed(&mut fixture),
            vec![
                "Vote fraglimit 30 passed! (Yes: 2, No: 0, Abs: 1)".to_string(),
                "fraglimit changed to 30.".to_string()
            ]
        );
        // Passing votes don't put the caller on cooldown.
        assert_eq!(fixture.clients.get(1).unwrap().last_callvote_tic, None);
    }

    #[test]
    fn test_lone_player_passes_immediately() {
        let mut fixture = Fixture::with_players(1);
        let mut voting = voting(&fixture);

        voting
            .propose(1, VoteKind::Restart, &[], &mut fixture.ctx())
            .unwrap();
        run(&mut voting, &mut fixture, 1);
        assert!(!voting.is_active());
        assert_eq!(
            fixture.game.warmup_status(),
            crate::game::WarmupStatus::ForceCountdown
        );
    }

    #[test]
    fn test_timeout_counts_absentees() {
        let mut fixture = Fixture::with_players(5);
        let mut voting = voting(&fixture);

        voting
            .propose(1, VoteKind::Coinflip, &[], &mut fixture.ctx())
            .unwrap();

        run(&mut voting, &mut fixture, 30 * TICRATE);
        assert!(voting.is_active());
        assert_eq!(voting.current().unwrap().countdown(), 0);

        fixture.outbox.drain();
        run(&mut voting, &mut fixture, 1);
        assert!(!voting.is_active());
        assert_eq!(
            printed(&mut fixture),
            vec!["Vote coinflip failed! (Yes: 1, No: 0, Abs: 4)".to_string()]
        );
    }

    #[test]
    fn test_ignoring_absentees_passes_on_cast_ballots() {
        let mut fixture = Fixture::with_config(5, |config| config.vote.count_absent = false);
        let mut voting = voting(&fixture);

        voting
            .propose(1, VoteKind::FragLimit, &args(&["40"]), &mut fixture.ctx())
            .unwrap();
        voting.cast(2, true, &mut fixture.ctx()).unwrap();
        voting.cast(3, false, &mut fixture.ctx()).unwrap();

        // 2 yes of 3 cast, two players never voted.
        run(&mut voting, &mut fixture, 1);
        assert!(!voting.is_active());
        assert_eq!(fixture.game.fraglimit, 40);
    }

    #[test]
    fn test_ignoring_absentees_tie_fails_at_deadline() {
        let mut fixture = Fixture::with_config(5, |config| config.vote.count_absent = false);
        let mut voting = voting(&fixture);

        voting
            .propose(1, VoteKind::FragLimit, &args(&["40"]), &mut fixture.ctx())
            .unwrap();
        voting.cast(2, false, &mut fixture.ctx()).unwrap();

        run(&mut voting, &mut fixture, 30 * TICRATE);
        assert!(voting.is_active());

        fixture.outbox.drain();
        run(&mut voting, &mut fixture, 1);
        assert!(!voting.is_active());
        assert_eq!(
            printed(&mut fixture),
            vec!["Vote fraglimit 40 failed! (Yes: 1, No: 1, Abs: 3)".to_string()]
        );
        assert_eq!(fixture.game.fraglimit, 20);
    }

    #[test]
    fn test_reminder_every_five_seconds() {
        let mut fixture = Fixture::with_players(3);
        let mut voting = voting(&fixture);
        voting
            .propose(1, VoteKind::Coinflip, &[], &mut fixture.ctx())
            .unwrap();
        fixture.outbox.drain();

        run(&mut voting, &mut fixture, 5 * TICRATE - 1);
        assert!(printed(&mut fixture).is_empty());

        run(&mut voting, &mut fixture, 1);
        let state = last_update(&fixture).unwrap();
        assert_eq!(state.seconds_left(), 25);
        assert_eq!(
            printed(&mut fixture),
            vec!["25 seconds left to vote.".to_string()]
        );
    }

    #[test]
    fn test_ballot_change_and_cooldown() {
        let mut fixture = Fixture::with_players(4);
        let mut voting = voting(&fixture);
        voting
            .propose(1, VoteKind::Coinflip, &[], &mut fixture.ctx())
            .unwrap();

        voting.cast(2, true, &mut fixture.ctx()).unwrap();
        assert_eq!(
            voting.cast(2, true, &mut fixture.ctx()),
            Err(VoteError::UnchangedBallot)
        );
        assert_eq!(
            voting.cast(2, false, &mut fixture.ctx()),
            Err(VoteError::BallotCooldown { seconds: 2 })
        );

        run(&mut voting, &mut fixture, 2 * TICRATE);
        voting.cast(2, false, &mut fixture.ctx()).unwrap();
        let tally = voting.current().unwrap().tally();
        assert_eq!(tally.get(2), Some(Ballot::No));
    }

    #[test]
    fn test_cast_without_vote() {
        let mut fixture = Fixture::with_players(2);
        let mut voting = voting(&fixture);
        assert_eq!(
            voting.cast(1, true, &mut fixture.ctx()),
            Err(VoteError::NoVoteInProgress)
        );
    }

    #[test]
    fn test_call_cooldown_after_failure() {
        let mut fixture = Fixture::with_players(3);
        let mut voting = voting(&fixture);

        voting
            .propose(1, VoteKind::Coinflip, &[], &mut fixture.ctx())
            .unwrap();
        voting.cast(2, false, &mut fixture.ctx()).unwrap();
        voting.cast(3, false, &mut fixture.ctx()).unwrap();
        run(&mut voting, &mut fixture, 1);
        assert!(!voting.is_active());

        assert_eq!(
            voting.propose(1, VoteKind::Coinflip, &[], &mut fixture.ctx()),
            Err(VoteError::CallCooldown { seconds: 60 })
        );
        // Someone else may still call.
        assert!(voting
            .propose(2, VoteKind::Coinflip, &[], &mut fixture.ctx())
            .is_ok());
    }

    #[test]
    fn test_call_cooldown_expires() {
        let mut fixture = Fixture::with_players(2);
        let mut voting = voting(&fixture);
        fixture.clients.get_mut(1).unwrap().last_callvote_tic = Some(fixture.game.tic);

        fixture.advance(60 * TICRATE - 1);
        assert_eq!(
            voting.propose(1, VoteKind::Coinflip, &[], &mut fixture.ctx()),
            Err(VoteError::CallCooldown { seconds: 1 })
        );
        fixture.advance(1);
        assert!(voting
            .propose(1, VoteKind::Coinflip, &[], &mut fixture.ctx())
            .is_ok());
    }

    #[test]
    fn test_solo_call_cooldown_is_short() {
        let mut fixture = Fixture::with_players(1);
        let mut voting = voting(&fixture);
        fixture.clients.get_mut(1).unwrap().last_callvote_tic = Some(fixture.game.tic);

        assert_eq!(
            voting.propose(1, VoteKind::Coinflip, &[], &mut fixture.ctx()),
            Err(VoteError::CallCooldown {
                seconds: SOLO_CALL_COOLDOWN_SECS
            })
        );
    }

    #[test]
    fn test_kick_target_leaving_interrupts() {
        let mut fixture = Fixture::with_players(4);
        let mut voting = voting(&fixture);

        voting
            .propose(1, VoteKind::Kick, &args(&["2"]), &mut fixture.ctx())
            .unwrap();
        fixture.clients.remove_client(2);
        voting.disconnect(2);
        fixture.outbox.drain();

        run(&mut voting, &mut fixture, 1);
        assert!(!voting.is_active());
        assert_eq!(last_update(&fixture).unwrap().result, VoteResult::Interrupted);
        assert_eq!(
            printed(&mut fixture),
            vec![
                "Vote kick Player2 (id:2) interrupted! Player2 left the server. (Yes: 1, No: 0, Abs: 2)"
                    .to_string()
            ]
        );
        assert!(fixture.clients.get(1).unwrap().last_callvote_tic.is_some());
    }

    #[test]
    fn test_disconnect_shrinks_electorate() {
        let mut fixture = Fixture::with_players(4);
        let mut voting = voting(&fixture);

        voting
            .propose(1, VoteKind::Coinflip, &[], &mut fixture.ctx())
            .unwrap();
        voting.cast(2, true, &mut fixture.ctx()).unwrap();
        run(&mut voting, &mut fixture, 1);
        assert!(voting.is_active());

        // 2 of 3 carries where 2 of 4 did not.
        fixture.clients.remove_client(4);
        voting.disconnect(4);
        run(&mut voting, &mut fixture, 1);
        assert!(!voting.is_active());
    }

    #[test]
    fn test_everyone_leaving_abandons() {
        let mut fixture = Fixture::with_players(2);
        let mut voting = voting(&fixture);

        voting
            .propose(1, VoteKind::Coinflip, &[], &mut fixture.ctx())
            .unwrap();
        for id in [1, 2] {
            fixture.clients.remove_client(id);
            voting.disconnect(id);
        }
        fixture.outbox.drain();

        run(&mut voting, &mut fixture, 1);
        assert!(!voting.is_active());
        assert_eq!(last_update(&fixture).unwrap().result, VoteResult::Abandoned);
        assert_eq!(
            printed(&mut fixture),
            vec!["Vote coinflip abandoned, everyone left.".to_string()]
        );
    }

    #[test]
    fn test_map_change_interrupts() {
        let mut fixture = Fixture::with_players(3);
        let mut voting = voting(&fixture);

        voting
            .propose(1, VoteKind::FragLimit, &args(&["30"]), &mut fixture.ctx())
            .unwrap();
        fixture
            .game
            .change_map(&MaplistEntry::new("MAP02", "doom2.wad"));
        voting.tick(&mut fixture.ctx());

        assert!(!voting.is_active());
        assert_eq!(last_update(&fixture).unwrap().result, VoteResult::Interrupted);
    }

    #[test]
    fn test_map_change_before_call_does_not_interrupt() {
        let mut fixture = Fixture::with_players(3);
        let mut voting = voting(&fixture);

        // An operator map change lands between two tics.
        fixture
            .game
            .change_map(&MaplistEntry::new("MAP02", "doom2.wad"));
        voting
            .propose(1, VoteKind::FragLimit, &args(&["30"]), &mut fixture.ctx())
            .unwrap();

        run(&mut voting, &mut fixture, TICRATE);
        assert!(voting.is_active());
        assert_eq!(fixture.clients.get(1).unwrap().last_callvote_tic, None);
    }

    #[test]
    fn test_intermission_interrupts() {
        let mut fixture = Fixture::with_players(3);
        let mut voting = voting(&fixture);

        voting
            .propose(1, VoteKind::Coinflip, &[], &mut fixture.ctx())
            .unwrap();
        fixture.game.exit_level();
        run(&mut voting, &mut fixture, 1);
        assert!(!voting.is_active());
    }

    #[test]
    fn test_maplist_edit_interrupts_map_vote() {
        let mut fixture = Fixture::with_players(3);
        let mut voting = voting(&fixture);

        voting
            .propose(1, VoteKind::Map, &args(&["map02"]), &mut fixture.ctx())
            .unwrap();
        fixture.maplist.add(MaplistEntry::new("MAP03", "doom2.wad"));
        fixture.outbox.drain();
        run(&mut voting, &mut fixture, 1);

        assert!(!voting.is_active());
        assert!(printed(&mut fixture)[0].contains("Map list was modified."));
    }

    #[test]
    fn test_failed_execution_is_reported() {
        let mut fixture = Fixture::with_config(4, |config| {
            config.game.mode = GameMode::TeamDeathmatch;
            config.vote.majority = 0.25;
        });
        let mut voting = voting(&fixture);

        voting
            .propose(1, VoteKind::RandPickup, &args(&["4"]), &mut fixture.ctx())
            .unwrap();
        voting.cast(2, true, &mut fixture.ctx()).unwrap();
        // Player 3 drops out of the game without disconnecting.
        fixture.clients.get_mut(3).unwrap().ingame = false;
        fixture.outbox.drain();
        run(&mut voting, &mut fixture, 1);

        assert!(!voting.is_active());
        let messages = printed(&mut fixture);
        assert_eq!(
            messages.last().unwrap(),
            "Not enough players, 4 needed but only 3 in game."
        );
    }

    #[test]
    fn test_sync_late_joiner() {
        let mut fixture = Fixture::with_players(2);
        let mut voting = voting(&fixture);
        voting
            .propose(1, VoteKind::Coinflip, &[], &mut fixture.ctx())
            .unwrap();
        fixture.outbox.drain();

        let late = fixture.join();
        voting.sync(late, &mut fixture.outbox);
        assert!(matches!(
            fixture.outbox.drain().as_slice(),
            [Outbound::Unicast {
                packet: Packet::VoteUpdate(_),
                ..
            }]
        ));
        assert_eq!(
            voting.cast(late, true, &mut fixture.ctx()),
            Err(VoteError::NotEligible)
        );
    }
}
