//! Constants used across the protocol codec and the modem driver.
//!
//! ## Key Concepts
//!
//! - **Frame header**: every UNER frame starts with the ASCII bytes `"UNER"`, followed by
//!   a length byte and the `':'` token.
//! - **Length**: counts the command byte plus every payload byte, never the checksum.
//! - **Scratch**: frames are assembled in a bounded scratch buffer before being queued, so
//!   a frame is either queued whole or not at all.
//! - **Ticks**: every modem timeout is counted in 10 ms ticks, see [`crate::timer`].

use crate::timer::ms_to_ticks;

/// The four start-of-frame bytes, `"UNER"`.
pub const UNER_HEADER: [u8; 4] = *b"UNER";

/// Separator between the length byte and the command byte.
pub const UNER_TOKEN: u8 = b':';

/// Bytes before the command id: header, length and token.
pub const UNER_PREFIX_LEN: usize = UNER_HEADER.len() + 2;

/// Size of the scratch buffer a frame is built in (everything except the checksum).
pub const UNER_SCRATCH_LEN: usize = 30;

/// Maximum bytes following the command id on the wire (explicit length byte included).
pub const UNER_MAX_PAYLOAD_LEN: usize = UNER_SCRATCH_LEN - UNER_PREFIX_LEN - 1;

/// Maximum value of the length byte: command id plus payload.
pub const UNER_MAX_DATA_LEN: usize = UNER_MAX_PAYLOAD_LEN + 1;

/// Capacity of each framed-link ring buffer.
pub const LINK_BUF_LEN: usize = 256;

/// Capacity of the modem receive ring buffer.
pub const ESP01_RX_BUF_LEN: usize = 256;

/// Capacity of the modem transmit ring buffer.
pub const ESP01_TX_BUF_LEN: usize = 256;

/// Longest SSID the driver stores.
pub const ESP01_SSID_LEN: usize = 64;

/// Longest password the driver stores, the WPA-PSK maximum.
pub const ESP01_PASSWORD_LEN: usize = 63;

/// Longest dotted-quad remote address the driver stores.
pub const ESP01_REMOTE_IP_LEN: usize = 15;

/// Longest local address accepted from `AT+CIFSR`.
pub const ESP01_LOCAL_IP_LEN: usize = 16;

/// Longest captive-portal SSID field; a longer submission is rejected.
pub const PORTAL_SSID_LEN: usize = 32;

/// Longest captive-portal password field; a longer submission is rejected.
pub const PORTAL_PASS_LEN: usize = 63;

/// Longest captive-portal IP field; a longer submission is rejected.
pub const PORTAL_IP_LEN: usize = 15;

/// Local port used when a caller passes `0`.
pub const DEFAULT_LOCAL_PORT: u16 = 30000;

/// Remote port the rover reports to after captive-portal provisioning.
pub const PORTAL_REMOTE_PORT: u16 = 30010;

/// `AT` attempts before the modem is hard reset.
pub const AT_RETRIES: u8 = 4;

/// `AT+CIFSR` attempts before falling back to `AT`.
pub const CIFSR_RETRIES: u8 = 4;

/// Delay before the first connection step after power-up.
pub const TIMEOUT_STARTUP: u16 = ms_to_ticks(5_000);

/// Default wait for the answer to any AT command.
pub const TIMEOUT_DEFAULT: u16 = ms_to_ticks(1_000);

/// Settle time after releasing the reset line.
pub const TIMEOUT_HARD_RESET: u16 = ms_to_ticks(5_000);

/// Wait for `WIFI GOT IP` after `AT+CWJAP`.
pub const TIMEOUT_CWJAP: u16 = ms_to_ticks(5_000);

/// Wait for `CONNECT` after `AT+CIPSTART`.
pub const TIMEOUT_CIPSTART: u16 = ms_to_ticks(5_000);

/// Wait after `AT+CWQAP`.
pub const TIMEOUT_CWQAP: u16 = ms_to_ticks(200);

/// Wait after opening the configuration server.
pub const TIMEOUT_CIPSERVER: u16 = ms_to_ticks(3_000);

/// Wait after queueing the configuration page.
pub const TIMEOUT_CONFIG_PAGE: u16 = ms_to_ticks(2_000);

/// Delay after `set_wifi` before the sequence restarts.
pub const TIMEOUT_SET_WIFI: u16 = ms_to_ticks(500);

/// Delay before re-sending `AT` after a lost `'>'` prompt.
pub const TIMEOUT_PROMPT_LOST: u16 = ms_to_ticks(100);

/// Wait for the modem's `'>'` prompt after `AT+CIPSEND`.
pub const TIMEOUT_TX_PROMPT: u8 = 5;

/// Gap allowed between bytes of a single reply.
pub const TIMEOUT_RX_GAP: u8 = 2;

/// Analog channels sampled per ADC scan.
pub const ADC_CHANNELS: usize = 9;

/// Samples averaged per ADC channel. Must be a power of two.
pub const ADC_WINDOW: usize = 32;

/// Accelerometer plus gyroscope axes.
pub const IMU_AXES: usize = 6;

/// Samples averaged per IMU axis. Must be a power of two.
pub const IMU_WINDOW: usize = 8;
