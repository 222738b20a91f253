//! Errors surfaced to callers.
//!
//! Only failures a caller can act on are reported here. Framing resyncs, checksum drops
//! and AT command timeouts are recovered internally and never returned.

use thiserror::Error;

/// Errors returned by the framed protocol encoder and the ESP-01 driver.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Error {
    /// The payload does not fit in a single frame.
    #[error("payload of {0} bytes does not fit in a frame")]
    PayloadTooLong(usize),
    /// The transmit ring buffer does not have room for the whole message.
    #[error("transmit buffer has no room for {0} bytes")]
    TxFull(usize),
    /// No SSID has been configured with `set_wifi`.
    #[error("wifi credentials are not set")]
    WifiNotSet,
    /// The modem is not associated with an access point.
    #[error("wifi is disconnected")]
    WifiDisconnected,
    /// No UDP/TCP session is open.
    #[error("udp/tcp session is disconnected")]
    UdpTcpDisconnected,
    /// A previous `AT+CIPSEND` has not completed yet.
    #[error("a send is already in progress")]
    SendBusy,
    /// The requested send length cannot be expressed in an `AT+CIPSEND` command.
    #[error("invalid send length {0}")]
    InvalidSendLength(usize),
}
