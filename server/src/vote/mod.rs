//! Callvote subsystem.
//!
//! - [`tally`]: ballots and quorum arithmetic
//! - [`case`]: what can be voted on, with argument checks and execution
//! - [`session`]: the single running vote and its per-tic lifecycle
//!
//! Vote code never owns server state. Everything it reads or changes is
//! borrowed for the duration of one call through a [`VoteContext`].

pub mod case;
pub mod session;
pub mod tally;

pub use case::{Motion, VoteCase};
pub use session::{VoteSession, Voting};
pub use tally::{threshold, Ballot, BallotTally, Counts, Decision, QuorumPolicy};

use crate::client_manager::ClientManager;
use crate::game::GameState;
use crate::maplist::Maplist;
use crate::outbox::Outbox;
use rand::rngs::StdRng;

/// Server state a vote may touch.
pub struct VoteContext<'a> {
    pub clients: &'a mut ClientManager,
    pub game: &'a mut GameState,
    pub maplist: &'a mut Maplist,
    pub outbox: &'a mut Outbox,
    pub rng: &'a mut StdRng,
}
