//! Operator commands read from the server's stdin.
//!
//! Vote kinds can be run directly from here, with the same argument checks
//! players get but without the ballot stage or the per-kind switches.

use crate::maplist::MaplistEntry;
use crate::vote::VoteCase;
use crate::world::World;
use log::info;
use shared::VoteKind;

const HELP: &str = "Commands: status, maplist, addmap <map> [wads...], clearmaplist, \
                    say <message>, help, or any vote name followed by its arguments";

impl World {
    /// Runs one console line and returns the text to show the operator.
    pub fn console(&mut self, line: &str) -> Vec<String> {
        let words: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        let Some((command, args)) = words.split_first() else {
            return Vec::new();
        };

        info!("Console: {}", line.trim());
        match command.to_ascii_lowercase().as_str() {
            "help" => vec![HELP.to_string(), format!("Votes: {}", VoteKind::valid_commands())],
            "status" => self.status(),
            "maplist" => self.maplist.lines(),
            "addmap" => self.add_map(args),
            "clearmaplist" => {
                self.maplist.clear();
                vec!["Maplist cleared.".to_string()]
            }
            "say" => {
                self.outbox
                    .broadcast_print(format!("<server>: {}", args.join(" ")));
                Vec::new()
            }
            other => match VoteKind::from_command(other) {
                Some(kind) => self.run_vote_kind(kind, args),
                None => vec![format!("Unknown command \"{}\". {}", other, HELP)],
            },
        }
    }

    fn run_vote_kind(&mut self, kind: VoteKind, args: &[String]) -> Vec<String> {
        let (_, mut ctx) = self.split();
        let result =
            VoteCase::setup(kind, args, None, &ctx).and_then(|case| case.execute(&mut ctx));
        match result {
            Ok(()) => Vec::new(),
            Err(err) => vec![err.to_string()],
        }
    }

    fn add_map(&mut self, args: &[String]) -> Vec<String> {
        let Some((map, wads)) = args.split_first() else {
            return vec!["Usage: addmap <map> [wads...]".to_string()];
        };
        let entry = MaplistEntry::new(map, &wads.join(" "));
        let line = format!("Added {} to the maplist.", entry.describe());
        self.maplist.add(entry);
        vec![line]
    }

    fn status(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "map: {}  mode: {}  fraglimit: {}  scorelimit: {}  timelimit: {}",
            self.game.map,
            self.game.mode.name(),
            self.game.fraglimit,
            self.game.scorelimit,
            self.game.timelimit
        )];

        for client in self.clients.iter() {
            let status = if !client.ingame {
                "connecting"
            } else if client.spectator {
                "spectating"
            } else {
                client.team.map(|team| team.name()).unwrap_or("playing")
            };
            lines.push(format!(
                "{:>3} {:<32} {:<21} {}",
                client.id, client.name, client.addr, status
            ));
        }

        if let Some(state) = self.voting.state() {
            lines.push(format!(
                "Vote {}: Yes {}/{}, No {}/{}, {} undecided, {}s left",
                state.description,
                state.yes,
                state.yes_needed,
                state.no,
                state.no_needed,
                state.abstain,
                state.seconds_left()
            ));
        }
        lines
    }
}
