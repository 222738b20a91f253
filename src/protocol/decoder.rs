//! UNER frame decoder.
//!
//! A byte-at-a-time state machine that turns an untrusted stream into validated
//! [`Frame`]s. It never looks ahead: each call to [`Decoder::step`] sees one byte and
//! reports whether that byte was consumed or has to be offered again.
//!
//! ```text
//! AwaitStart -'U'-> Header1 -'N'-> Header2 -'E'-> Header3 -'R'-> ReadLength
//!     ^                                                              |
//!     |                                                          1..=24
//!     +--- checksum byte <- ReadPayload (len bytes) <-':'- ReadToken <+
//! ```
//!
//! A mismatch in a header or token position returns to `AwaitStart` and asks for the same
//! byte again, so a `'U'` inside garbage can still start the next frame. The checksum is
//! the XOR of every byte from `'U'` through the last payload byte, command id included.

use heapless::Vec;

use super::checksum::xor_update;
use super::{Command, Frame};
use crate::consts::{UNER_HEADER, UNER_MAX_DATA_LEN, UNER_TOKEN};

/// Position of the decoder inside a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum DecoderState {
    /// Hunting for `'U'`.
    #[default]
    AwaitStart,
    /// Expecting `'N'`.
    Header1,
    /// Expecting `'E'`.
    Header2,
    /// Expecting `'R'`.
    Header3,
    /// Next byte is the length.
    ReadLength,
    /// Expecting `':'`.
    ReadToken,
    /// Reading the command id, the payload and finally the checksum.
    ReadPayload,
}

/// Outcome of feeding one byte to the decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// The byte was used; advance the read cursor.
    Consumed,
    /// The byte broke the current frame; offer it again without advancing.
    Retry,
    /// The byte completed a frame with a valid checksum.
    Frame(Frame),
}

/// Decoder for one channel.
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    state: DecoderState,
    remaining: u8,
    checksum: u8,
    data: Vec<u8, UNER_MAX_DATA_LEN>,
    /// Frames that passed the checksum.
    pub rx_good: u16,
    /// Frames dropped on a checksum mismatch.
    pub rx_bad: u16,
}

impl Decoder {
    /// Creates a decoder waiting for a start marker.
    pub const fn new() -> Self {
        Self {
            state: DecoderState::AwaitStart,
            remaining: 0,
            checksum: 0,
            data: Vec::new(),
            rx_good: 0,
            rx_bad: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Drops any partial frame.
    pub fn reset(&mut self) {
        self.state = DecoderState::AwaitStart;
        self.data.clear();
    }

    /// Feeds one byte.
    ///
    /// # Returns
    /// - [`Step::Retry`] only from the header, length and token states, after which the
    ///   decoder is back in `AwaitStart`. `AwaitStart` itself never asks for a retry, so
    ///   offering the same byte again always makes progress.
    pub fn step(&mut self, byte: u8) -> Step {
        match self.state {
            DecoderState::AwaitStart => {
                if byte == UNER_HEADER[0] {
                    self.checksum = byte;
                    self.state = DecoderState::Header1;
                }
                Step::Consumed
            }
            DecoderState::Header1 => self.expect(byte, UNER_HEADER[1], DecoderState::Header2),
            DecoderState::Header2 => self.expect(byte, UNER_HEADER[2], DecoderState::Header3),
            DecoderState::Header3 => self.expect(byte, UNER_HEADER[3], DecoderState::ReadLength),
            DecoderState::ReadLength => {
                if byte == 0 || usize::from(byte) > UNER_MAX_DATA_LEN {
                    debug!("uner: bad length {}, resync", byte);
                    self.state = DecoderState::AwaitStart;
                    return Step::Retry;
                }
                self.remaining = byte;
                self.checksum = xor_update(self.checksum, &byte);
                self.state = DecoderState::ReadToken;
                Step::Consumed
            }
            DecoderState::ReadToken => {
                let step = self.expect(byte, UNER_TOKEN, DecoderState::ReadPayload);
                self.data.clear();
                step
            }
            DecoderState::ReadPayload => {
                if self.remaining > 0 {
                    self.checksum = xor_update(self.checksum, &byte);
                    // Capacity equals the largest accepted length.
                    let _ = self.data.push(byte);
                    self.remaining -= 1;
                    return Step::Consumed;
                }
                self.state = DecoderState::AwaitStart;
                if byte != self.checksum {
                    self.rx_bad = self.rx_bad.wrapping_add(1);
                    debug!("uner: checksum {} expected {}, dropped", byte, self.checksum);
                    return Step::Consumed;
                }
                self.rx_good = self.rx_good.wrapping_add(1);
                Step::Frame(self.take_frame())
            }
        }
    }

    fn expect(&mut self, byte: u8, wanted: u8, next: DecoderState) -> Step {
        if byte == wanted {
            self.checksum = xor_update(self.checksum, &byte);
            self.state = next;
            Step::Consumed
        } else {
            debug!("uner: unexpected {} in header, resync", byte);
            self.state = DecoderState::AwaitStart;
            Step::Retry
        }
    }

    fn take_frame(&mut self) -> Frame {
        let command = Command::from_id(self.data[0]);
        let mut rest = &self.data[1..];
        if command.needs_length_byte() {
            if let Some((&len, tail)) = rest.split_first() {
                rest = &tail[..usize::from(len).min(tail.len())];
            }
        }
        let frame = Frame {
            command,
            payload: Vec::from_slice(rest).unwrap_or_default(),
        };
        self.data.clear();
        frame
    }
}
