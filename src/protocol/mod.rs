//! UNER framed protocol.
//!
//! The host link and the Wi-Fi link speak the same framing:
//!
//! ```text
//! 55 4E 45 52 <len> 3A <cmd> <payload: len - 1 bytes> <xor>
//! ```
//!
//! - [`Decoder`] turns received bytes into [`Frame`]s, resynchronising on garbage and
//!   silently dropping frames with a bad checksum.
//! - [`encode_into`] queues a frame on a transmit ring.
//! - [`Link`] ties both rings and a decoder together and drives them from a cooperative
//!   task, handing frames to a [`Dispatcher`] and bytes to a [`Transport`].

mod checksum;
mod command;
mod decoder;
mod encoder;
mod frame;
mod link;

pub use command::Command;
pub use decoder::{Decoder, DecoderState, Step};
pub use encoder::{encode_into, encoded_len};
pub use frame::Frame;
pub use link::{Dispatcher, Link, Replier, SerialTransport, Transport};
