//! Ballot bookkeeping and quorum arithmetic.
//!
//! The tally is keyed by player id and only ever holds players that are still
//! connected. Counts are recomputed on demand; tallies are bounded by
//! `MAXPLAYERS`, so a scan is cheaper than keeping counters in sync.

use crate::error::VoteError;
use shared::{MAXPLAYERS, TICRATE};
use std::collections::HashMap;

/// Tolerance used to detect a threshold landing exactly on a whole vote.
const THRESHOLD_EPSILON: f32 = 1.0 / (MAXPLAYERS as f32 * 2.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ballot {
    Undecided,
    Yes,
    No,
}

impl From<bool> for Ballot {
    fn from(yes: bool) -> Self {
        if yes {
            Ballot::Yes
        } else {
            Ballot::No
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Counts {
    pub yes: usize,
    pub no: usize,
    pub undecided: usize,
}

/// How a verdict is reached from the counts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuorumPolicy {
    /// Fraction of the electorate in (0, 1] needed to pass.
    pub majority: f32,
    /// Whether absentees still count towards the electorate at the deadline.
    pub count_absent: bool,
}

/// Verdict derivable from the ballots alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Undecided,
    Yes,
    No,
}

/// Votes needed out of `population` for the given fraction.
///
/// Landing exactly on a whole number of votes is not enough: a tie must not
/// carry, so one more vote is required.
pub fn threshold(population: usize, fraction: f32) -> usize {
    let f_calc = population as f32 * fraction;
    let i_calc = (f_calc + 0.5).floor();

    if (f_calc - i_calc).abs() < THRESHOLD_EPSILON {
        i_calc as usize + 1
    } else {
        f_calc.ceil() as usize
    }
}

#[derive(Debug, Clone, Default)]
pub struct BallotTally {
    ballots: HashMap<u32, Ballot>,
}

impl BallotTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everyone eligible starts undecided, except the proposer.
    pub fn seed<I>(eligible: I, proposer: u32) -> Self
    where
        I: IntoIterator<Item = u32>,
    {
        let mut ballots: HashMap<u32, Ballot> = eligible
            .into_iter()
            .map(|id| (id, Ballot::Undecided))
            .collect();
        ballots.insert(proposer, Ballot::Yes);
        Self { ballots }
    }

    /// Records a ballot change.
    ///
    /// `last_change` is the tic of the voter's previous successful change; the
    /// caller stamps the voter with `now` when this returns `Ok`.
    pub fn cast(
        &mut self,
        id: u32,
        ballot: Ballot,
        now: u32,
        cooldown: u32,
        last_change: Option<u32>,
    ) -> Result<(), VoteError> {
        let current = self.ballots.get_mut(&id).ok_or(VoteError::NotEligible)?;

        if *current == ballot {
            return Err(VoteError::UnchangedBallot);
        }

        if let Some(last) = last_change {
            let elapsed = now.saturating_sub(last);
            if elapsed < cooldown {
                let remaining = cooldown - elapsed;
                return Err(VoteError::BallotCooldown {
                    seconds: remaining.div_ceil(TICRATE),
                });
            }
        }

        *current = ballot;
        Ok(())
    }

    pub fn remove(&mut self, id: u32) -> Option<Ballot> {
        self.ballots.remove(&id)
    }

    pub fn get(&self, id: u32) -> Option<Ballot> {
        self.ballots.get(&id).copied()
    }

    pub fn contains(&self, id: u32) -> bool {
        self.ballots.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.ballots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ballots.is_empty()
    }

    pub fn counts(&self) -> Counts {
        let mut counts = Counts::default();
        for ballot in self.ballots.values() {
            match ballot {
                Ballot::Yes => counts.yes += 1,
                Ballot::No => counts.no += 1,
                Ballot::Undecided => counts.undecided += 1,
            }
        }
        counts
    }

    /// Yes votes needed to pass.
    ///
    /// When absentees count as "no", everyone in the tally is the electorate.
    /// Otherwise, or when `no_absentees` is set, only cast ballots count.
    pub fn yes_threshold(&self, policy: &QuorumPolicy, no_absentees: bool) -> usize {
        let population = if policy.count_absent && !no_absentees {
            self.ballots.len()
        } else {
            let counts = self.counts();
            counts.yes + counts.no
        };
        threshold(population, policy.majority)
    }

    /// No votes needed to fail.
    pub fn no_threshold(&self, policy: &QuorumPolicy) -> usize {
        threshold(self.ballots.len(), 1.0 - policy.majority)
    }

    pub fn decide(&self, policy: &QuorumPolicy) -> Decision {
        let counts = self.counts();

        if counts.yes >= self.yes_threshold(policy, false) {
            Decision::Yes
        } else if counts.no >= self.no_threshold(policy) {
            Decision::No
        } else if counts.undecided == 0 {
            Decision::No
        } else {
            Decision::Undecided
        }
    }

    /// Verdict when the countdown has run out.
    ///
    /// Absentees are "no" votes if the policy says so. Otherwise the cast
    /// ballots alone settle it, and anything short of a majority fails.
    pub fn decide_at_deadline(&self, policy: &QuorumPolicy) -> Decision {
        match self.decide(policy) {
            Decision::Undecided if policy.count_absent => Decision::No,
            Decision::Undecided => {
                if self.counts().yes >= self.yes_threshold(policy, true) {
                    Decision::Yes
                } else {
                    Decision::No
                }
            }
            decided => decided,
        }
    }
}
