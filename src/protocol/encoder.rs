//! UNER frame encoder.
//!
//! Frames are assembled in a fixed scratch buffer and only copied into the transmit ring
//! once complete, so a frame is queued whole or not at all:
//!
//! ```text
//! 'U' 'N' 'E' 'R' <len> ':' <cmd> [<n>] <payload...> <xor>
//! ```
//!
//! `<len>` counts `<cmd>` through the last payload byte. `[<n>]` is only present for
//! commands that carry an explicit length byte.

use heapless::Vec;

use super::checksum::xor_all;
use super::Command;
use crate::consts::{UNER_HEADER, UNER_MAX_PAYLOAD_LEN, UNER_SCRATCH_LEN, UNER_TOKEN};
use crate::error::Error;
use crate::ring::RingBuffer;

/// Number of bytes [`encode_into`] queues for `command` with a payload of `payload_len`.
pub const fn encoded_len(command: Command, payload_len: usize) -> usize {
    UNER_HEADER.len() + 4 + command.needs_length_byte() as usize + payload_len
}

/// Encodes one frame and appends it to `tx`.
///
/// # Arguments
/// * `tx` - transmit ring of the channel
/// * `command` - command id
/// * `payload` - bytes after the command id, without the explicit length byte
///
/// # Returns
/// * `Ok(n)` with the number of bytes queued
/// * `Err(Error::PayloadTooLong)` if the payload does not fit in one frame
/// * `Err(Error::TxFull)` if `tx` cannot take the whole frame; nothing is queued
pub fn encode_into<const N: usize>(
    tx: &mut RingBuffer<N>,
    command: Command,
    payload: &[u8],
) -> Result<usize, Error> {
    let with_len_byte = command.needs_length_byte();
    if payload.len() + usize::from(with_len_byte) > UNER_MAX_PAYLOAD_LEN {
        return Err(Error::PayloadTooLong(payload.len()));
    }

    let total = encoded_len(command, payload.len());
    if tx.free() < total {
        return Err(Error::TxFull(total));
    }

    // Sized for the largest frame checked above.
    let mut scratch: Vec<u8, UNER_SCRATCH_LEN> = Vec::new();
    let _ = scratch.extend_from_slice(&UNER_HEADER);
    let len_index = scratch.len();
    let _ = scratch.push(0);
    let _ = scratch.push(UNER_TOKEN);
    let _ = scratch.push(command.id());
    if with_len_byte {
        let _ = scratch.push(payload.len() as u8);
    }
    let _ = scratch.extend_from_slice(payload);
    scratch[len_index] = (scratch.len() - len_index - 2) as u8;

    let checksum = xor_all(&scratch);
    tx.extend_from_slice(&scratch);
    tx.push(checksum);
    Ok(total)
}
