//! A framed channel: receive ring, transmit ring and decoder.
//!
//! The firmware runs two of these, one for the host serial port and one carried over
//! the Wi-Fi modem. Both are driven the same way: interrupt handlers call
//! [`Link::receive`], the super-loop calls [`Link::task`] with the application's
//! [`Dispatcher`] and the channel's [`Transport`].

use embedded_hal_nb::serial;

use super::{Command, Decoder, Frame, Step, encode_into};
use crate::consts::LINK_BUF_LEN;
use crate::error::Error;
use crate::ring::RingBuffer;

/// Handle given to a [`Dispatcher`] to queue replies on the channel a frame came from.
#[derive(Debug)]
pub struct Replier<'a, const N: usize> {
    tx: &'a mut RingBuffer<N>,
}

impl<const N: usize> Replier<'_, N> {
    /// Encodes and queues a reply frame, see [`encode_into`].
    pub fn send(&mut self, command: Command, payload: &[u8]) -> Result<usize, Error> {
        encode_into(self.tx, command, payload)
    }
}

/// Application side of a channel: receives every frame that passed the checksum.
pub trait Dispatcher<const N: usize> {
    /// Handles one frame. Replies go through `reply`.
    fn dispatch(&mut self, frame: &Frame, reply: &mut Replier<'_, N>);
}

impl<const N: usize, F> Dispatcher<N> for F
where
    F: FnMut(&Frame, &mut Replier<'_, N>),
{
    fn dispatch(&mut self, frame: &Frame, reply: &mut Replier<'_, N>) {
        self(frame, reply)
    }
}

/// Hardware side of a channel: moves queued bytes out.
///
/// Called at most once per [`Link::task`], and only when `tx` is not empty. An
/// implementation consumes what it managed to send and leaves the rest for the next call;
/// it must not block.
pub trait Transport<const N: usize> {
    /// Writes as much of `tx` as the hardware accepts right now.
    fn write_pending(&mut self, tx: &mut RingBuffer<N>);
}

/// [`Transport`] over any non-blocking serial writer.
///
/// Writes byte by byte until the peripheral reports `WouldBlock`.
#[derive(Debug)]
pub struct SerialTransport<S> {
    /// The serial port.
    pub serial: S,
}

impl<S> SerialTransport<S> {
    /// Wraps a serial writer.
    pub const fn new(serial: S) -> Self {
        Self { serial }
    }
}

impl<S, const N: usize> Transport<N> for SerialTransport<S>
where
    S: serial::Write<u8>,
{
    fn write_pending(&mut self, tx: &mut RingBuffer<N>) {
        while let Some(byte) = tx.peek() {
            match self.serial.write(byte) {
                Ok(()) => tx.skip(1),
                Err(nb::Error::WouldBlock) => break,
                Err(nb::Error::Other(_)) => {
                    warn!("link: serial write failed, {} bytes kept", tx.len());
                    break;
                }
            }
        }
    }
}

/// One framed channel.
#[derive(Debug, Clone)]
pub struct Link<const N: usize = LINK_BUF_LEN> {
    /// Bytes received and not yet decoded.
    pub rx: RingBuffer<N>,
    /// Encoded frames waiting for the transport.
    pub tx: RingBuffer<N>,
    decoder: Decoder,
}

impl<const N: usize> Default for Link<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Link<N> {
    /// Creates an idle channel.
    pub const fn new() -> Self {
        Self {
            rx: RingBuffer::new(),
            tx: RingBuffer::new(),
            decoder: Decoder::new(),
        }
    }

    /// Queues one received byte. Meant for the receive interrupt.
    pub fn receive(&mut self, byte: u8) {
        self.rx.push(byte);
    }

    /// Queues a frame for transmission, see [`encode_into`].
    pub fn send(&mut self, command: Command, payload: &[u8]) -> Result<usize, Error> {
        encode_into(&mut self.tx, command, payload)
    }

    /// The channel's decoder, for its counters and state.
    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    /// Runs one cooperative pass.
    ///
    /// Decodes the bytes that were in `rx` when the call started, handing each valid
    /// frame to `dispatcher`, then gives `transport` one chance to drain `tx`. Bytes that
    /// arrive during the pass are left for the next call.
    pub fn task<D, T>(&mut self, dispatcher: &mut D, transport: &mut T)
    where
        D: Dispatcher<N>,
        T: Transport<N>,
    {
        if !self.rx.is_empty() {
            self.decode(dispatcher);
        }
        if !self.tx.is_empty() {
            transport.write_pending(&mut self.tx);
        }
    }

    fn decode<D: Dispatcher<N>>(&mut self, dispatcher: &mut D) {
        let end = self.rx.write_index();
        while self.rx.read_index() != end {
            let Some(byte) = self.rx.peek() else {
                break;
            };
            match self.decoder.step(byte) {
                Step::Retry => {}
                Step::Consumed => self.rx.skip(1),
                Step::Frame(frame) => {
                    self.rx.skip(1);
                    debug!("link: frame {}", frame.command.id());
                    dispatcher.dispatch(&frame, &mut Replier { tx: &mut self.tx });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeSerial;

    type HostLink = Link<64>;

    fn keep_alive(frame: &Frame, reply: &mut Replier<'_, 64>) {
        if frame.command == Command::GetAlive {
            let _ = reply.send(Command::Ack, &[]).unwrap();
        } else {
            let _ = reply.send(Command::NoCmd, &[frame.command.id()]).unwrap();
        }
    }

    fn inbound(command: Command, payload: &[u8]) -> std::vec::Vec<u8> {
        let mut ring: RingBuffer<64> = RingBuffer::new();
        let _ = encode_into(&mut ring, command, payload).unwrap();
        ring.iter().collect()
    }

    #[test]
    fn test_link_initialization() {
        let link = HostLink::new();
        assert!(link.rx.is_empty());
        assert!(link.tx.is_empty());
        assert_eq!(link.decoder().rx_good, 0);
    }

    #[test]
    fn test_dispatches_once_and_replies() {
        let mut link = HostLink::new();
        for byte in inbound(Command::GetAlive, &[]) {
            link.receive(byte);
        }
        let mut calls = 0;
        let mut dispatcher = |frame: &Frame, reply: &mut Replier<'_, 64>| {
            calls += 1;
            keep_alive(frame, reply);
        };
        let mut transport = SerialTransport::new(FakeSerial::default());
        link.task(&mut dispatcher, &mut transport);
        assert_eq!(calls, 1);
        assert_eq!(transport.serial.written, inbound(Command::Ack, &[]));
        assert!(link.tx.is_empty());
    }

    #[test]
    fn test_unknown_command_gets_nocmd() {
        let mut link = HostLink::new();
        for byte in inbound(Command::Other(0x42), &[]) {
            link.receive(byte);
        }
        let mut transport = SerialTransport::new(FakeSerial::default());
        link.task(&mut keep_alive, &mut transport);
        assert_eq!(transport.serial.written, inbound(Command::NoCmd, &[0x42]));
    }

    #[test]
    fn test_transport_keeps_unsent_bytes() {
        let mut link = HostLink::new();
        let queued = link.send(Command::Firmware, &[1, 0, 3]).unwrap();
        let mut transport = SerialTransport::new(FakeSerial::with_budget(4));
        link.task(&mut keep_alive, &mut transport);
        assert_eq!(transport.serial.written.len(), 4);
        assert_eq!(link.tx.len(), queued - 4);

        transport.serial.budget = None;
        link.task(&mut keep_alive, &mut transport);
        assert_eq!(transport.serial.written, inbound(Command::Firmware, &[1, 0, 3]));
    }

    #[test]
    fn test_garbage_then_frame() {
        let mut link = HostLink::new();
        for &byte in b"xxUNEUN" {
            link.receive(byte);
        }
        for byte in inbound(Command::GetAlive, &[]) {
            link.receive(byte);
        }
        let mut transport = SerialTransport::new(FakeSerial::default());
        link.task(&mut keep_alive, &mut transport);
        assert_eq!(link.decoder().rx_good, 1);
        assert!(link.rx.is_empty());
    }
}
