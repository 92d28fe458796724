//! Decoding and validation of client datagrams.
//!
//! Anything that fails here is a protocol violation. The world answers it by
//! dropping the sender, so the checks only cover what a well-behaved client
//! can never produce. Vote arguments are checked again, with friendlier
//! errors, when the vote is set up.

use crate::error::ProtocolError;
use bincode::deserialize;
use shared::{
    is_valid_string, Packet, MAX_ARG_LEN, MAX_CALLVOTE_ARGS, MAX_CHAT_LEN, MAX_NAME_LEN,
};

pub fn decode(bytes: &[u8]) -> Result<Packet, ProtocolError> {
    let packet: Packet = deserialize(bytes).map_err(|_| ProtocolError::Decode)?;
    validate(&packet)?;
    Ok(packet)
}

pub fn validate(packet: &Packet) -> Result<(), ProtocolError> {
    if !packet.is_client_packet() {
        return Err(ProtocolError::UnexpectedPacket(packet.name()));
    }

    match packet {
        Packet::Connect { name, .. } => {
            if name.trim().is_empty() || name.len() > MAX_NAME_LEN {
                return Err(ProtocolError::InvalidName);
            }
            if !is_valid_string(name) {
                return Err(ProtocolError::InvalidCharacters("Name"));
            }
        }
        Packet::Say { message } => {
            if message.len() > MAX_CHAT_LEN {
                return Err(ProtocolError::ChatTooLong);
            }
            if !is_valid_string(message) {
                return Err(ProtocolError::InvalidCharacters("Chat message"));
            }
        }
        Packet::CallVote { args, .. } => {
            if args.len() > MAX_CALLVOTE_ARGS {
                return Err(ProtocolError::TooManyArguments(args.len()));
            }
            for arg in args {
                if arg.len() > MAX_ARG_LEN {
                    return Err(ProtocolError::ArgumentTooLong);
                }
                if !is_valid_string(arg) {
                    return Err(ProtocolError::InvalidCharacters("Callvote argument"));
                }
            }
        }
        _ => {}
    }

    Ok(())
}
