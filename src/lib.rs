//! # roverlink
//!
//! A portable, no_std communication core for a small rover controller, built on
//! `embedded-hal` 1.0. It carries two pieces that manage timing-sensitive traffic over
//! unreliable byte streams without ever blocking:
//!
//! - the **UNER framed protocol** ([`protocol`]): `"UNER" <len> ':' <cmd> <payload> <xor>`
//!   frames between the rover and a host, with a resynchronising decoder, an encoder and a
//!   [`Link`](protocol::Link) that runs one channel (USB serial or Wi-Fi) from a cooperative
//!   task;
//! - an **ESP-01 Wi-Fi modem driver** ([`esp01`]): AT-command reply matcher, connection
//!   sequencer with a retry ladder and hard reset, transmit multiplexer with the
//!   `AT+CIPSEND` prompt handshake, and a captive portal for provisioning credentials.
//!
//! Supporting pieces: a byte [`RingBuffer`](ring::RingBuffer) with an overrun counter,
//! moving-average [`filter`]s for the ADC and IMU, a pin [`debounce`]r, and [`timer`]
//! helpers for driving everything from interrupts or a blocking loop.
//!
//! ## Crate features
//! | Feature               | Description |
//! |-----------------------|-------------|
//! | `std`                 | Builds against `std` for host tests, with `std` in the dependencies |
//! | `delay-loop`          | Blocking super-loop over `embedded_hal::delay::DelayNs` |
//! | `timer-isr` (default) | `critical_section` global driver slot and interrupt helpers |
//! | `defmt-0-3`           | Logs through `defmt` and derives `defmt::Format` on public enums |
//! | `log`                 | Logs through the `log` facade |
//!
//! ## Usage
//!
//! ```rust
//! use roverlink::esp01::{Esp01, Mode};
//! use roverlink::protocol::{Command, Frame, Link, Replier};
//! use roverlink::ring::RingBuffer;
//! # use embedded_hal_mock::eh1::digital::Mock as Pin;
//! # use embedded_hal_mock::eh1::serial::Mock as Serial;
//!
//! # let (serial, reset): (Serial<u8>, Pin) = (Serial::new(&[]), Pin::new(&[]));
//! // Modem whose `+IPD` data lands in a ring read by the Wi-Fi link.
//! let mut modem = Esp01::new(serial, reset, RingBuffer::<256>::new());
//! modem.set_mode(Mode::SoftAp);
//!
//! let mut wifi: Link = Link::new();
//! let mut dispatch = |frame: &Frame, reply: &mut Replier<'_, 256>| {
//!     if frame.command == Command::GetAlive {
//!         let _ = reply.send(Command::Ack, &[]);
//!     }
//! };
//!
//! // Super-loop body; `modem.timeout_10ms()` runs from a 10 ms timer.
//! modem.task();
//! while let Some(byte) = modem.listener.pop() {
//!     wifi.receive(byte);
//! }
//! wifi.task(&mut dispatch, &mut modem);
//! # modem.serial.done();
//! # modem.reset.done();
//! ```
//!
//! ## Integration Notes
//!
//! - All timeouts are counted in 10 ms ticks; call `Esp01::timeout_10ms` at a stable rate.
//! - `Esp01::receive` and `Link::receive` are the only entry points meant for interrupt
//!   context; wrap the driver in the [`timer`] helpers when they share it with the main loop.
//!
//! --
//! Designed for `#![no_std]` use in resource-constrained embedded environments.

#![deny(
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_results
)]
#![cfg_attr(not(feature = "std"), no_std)]

#[macro_use]
mod fmt;

#[cfg(feature = "timer-isr")]
pub use critical_section;

pub use heapless;

pub mod consts;
pub mod debounce;
pub mod error;
pub mod esp01;
pub mod filter;
pub mod protocol;
pub mod ring;
pub mod timer;

#[cfg(test)]
mod testing;
