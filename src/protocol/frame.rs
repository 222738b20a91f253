//! Decoded UNER frames.

use heapless::Vec;

use super::Command;
use crate::consts::UNER_MAX_PAYLOAD_LEN;
use crate::error::Error;

/// One validated UNER frame as seen by the dispatcher.
///
/// For [`Command::UserText`] and [`Command::SysError`] the explicit length byte is not
/// part of `payload`; the encoder adds it and the decoder strips it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Command id.
    pub command: Command,
    /// Bytes following the command id.
    pub payload: Vec<u8, UNER_MAX_PAYLOAD_LEN>,
}

impl Frame {
    /// Builds a frame, failing if `payload` cannot be sent in one frame.
    pub fn new(command: Command, payload: &[u8]) -> Result<Self, Error> {
        if payload.len() + usize::from(command.needs_length_byte()) > UNER_MAX_PAYLOAD_LEN {
            return Err(Error::PayloadTooLong(payload.len()));
        }
        let payload =
            Vec::from_slice(payload).map_err(|_| Error::PayloadTooLong(payload.len()))?;
        Ok(Self { command, payload })
    }

    /// Frame with no payload.
    pub fn empty(command: Command) -> Self {
        Self {
            command,
            payload: Vec::new(),
        }
    }
}
