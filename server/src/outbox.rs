//! Queue of everything the simulation wants to tell clients.
//!
//! Game and vote code only decide what to send and to whom; the network layer
//! drains the queue once per event and turns ids into addresses.

use log::info;
use shared::{Packet, VoteState};
use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Unicast { client_id: u32, packet: Packet },
    Broadcast { packet: Packet, exclude: Option<u32> },
    /// Answer to an address that has no client id (yet or anymore).
    Reply { addr: SocketAddr, packet: Packet },
    /// Disconnect a client. Handled by the world, not the network layer.
    Drop { client_id: u32, reason: String },
}

#[derive(Debug, Default)]
pub struct Outbox {
    queue: Vec<Outbound>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send(&mut self, client_id: u32, packet: Packet) {
        self.queue.push(Outbound::Unicast { client_id, packet });
    }

    pub fn broadcast(&mut self, packet: Packet, exclude: Option<u32>) {
        self.queue.push(Outbound::Broadcast { packet, exclude });
    }

    pub fn reply(&mut self, addr: SocketAddr, packet: Packet) {
        self.queue.push(Outbound::Reply { addr, packet });
    }

    /// Text for one player only.
    pub fn print(&mut self, client_id: u32, message: impl Into<String>) {
        self.send(
            client_id,
            Packet::Print {
                message: message.into(),
            },
        );
    }

    /// Text for everyone, echoed to the server log.
    pub fn broadcast_print(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!("{}", message);
        self.broadcast(Packet::Print { message }, None);
    }

    pub fn vote_update(&mut self, state: VoteState) {
        self.broadcast(Packet::VoteUpdate(state), None);
    }

    pub fn drop_client(&mut self, client_id: u32, reason: impl Into<String>) {
        self.queue.push(Outbound::Drop {
            client_id,
            reason: reason.into(),
        });
    }

    pub fn drain(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.queue)
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Queued messages, for inspection in tests and logs.
    pub fn pending(&self) -> &[Outbound] {
        &self.queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_empties_queue() {
        let mut outbox = Outbox::new();
        outbox.print(1, "hello");
        outbox.broadcast_print("everyone");
        outbox.drop_client(2, "bye");
        assert_eq!(outbox.len(), 3);

        let drained = outbox.drain();
        assert_eq!(drained.len(), 3);
        assert!(outbox.is_empty());

        assert_eq!(
            drained[0],
            Outbound::Unicast {
                client_id: 1,
                packet: Packet::Print {
                    message: "hello".to_string()
                }
            }
        );
        assert!(matches!(
            drained[1],
            Outbound::Broadcast { exclude: None, .. }
        ));
        assert!(matches!(drained[2], Outbound::Drop { client_id: 2, .. }));
    }
}
