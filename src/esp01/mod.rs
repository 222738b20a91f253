//! ESP-01 Wi-Fi modem driver.
//!
//! This module provides [`Esp01`], a non-blocking driver for the ESP8266 AT firmware on
//! an ESP-01 board. It owns the modem's UART transmit side and its CH_PD/reset line and
//! runs three cooperating pieces from [`Esp01::task`]:
//!
//! - a reply matcher that recognises the modem's text replies byte by byte, extracts the
//!   station IP address, forwards `+IPD` data and harvests the captive-portal form;
//! - a connection sequencer ([`AtState`]) that sends one AT command at a time, each with a
//!   timeout, and climbs a retry ladder up to a hard reset when the modem stops answering;
//! - a transmit multiplexer that drains AT text and user data through one ring buffer and
//!   handles the `AT+CIPSEND` `'>'` prompt handshake.
//!
//! Nothing here blocks. Timeouts are counted in 10 ms ticks by [`Esp01::timeout_10ms`],
//! which the integrator calls from a timer (see [`crate::timer`]).
//!
//! ## Modes
//!
//! - [`Mode::Client`]: join the configured access point, read the assigned address and
//!   open a UDP or TCP session to the configured endpoint.
//! - [`Mode::SoftAp`]: become the access point `ROVER-SETUP`, serve a configuration page
//!   on port 80 and wait for a valid SSID/password/IP submission. A valid submission
//!   switches to client mode, reporting to `<ip>:30010`, and hard resets the modem.
//!
//! ## Example
//!
//! ```rust
//! # use embedded_hal_mock::eh1::digital::Mock as Pin;
//! # use embedded_hal_mock::eh1::serial::Mock as Serial;
//! use roverlink::esp01::{Esp01, Mode};
//!
//! # let serial: Serial<u8> = Serial::new(&[]);
//! # let reset = Pin::new(&[]);
//! let mut modem = Esp01::new(serial, reset, ());
//! modem.set_mode(Mode::Client);
//! modem.set_wifi("MyNet", "12345678");
//! loop {
//!     modem.task(); // from the super-loop; timeout_10ms() from a 10 ms timer
//!     # break;
//! }
//! # modem.serial.done();
//! # modem.reset.done();
//! ```

mod commands;
mod connection;
mod credentials;
mod matcher;
mod responses;

pub use connection::AtState;
pub use credentials::{CredentialError, is_valid_ipv4, validate_credentials};

use core::fmt::Write as _;

use embedded_hal::digital::OutputPin;
use embedded_hal_nb::serial;
use heapless::String;

use self::commands::{AT_CIPSEND, CIPSEND_MAX, CIPSEND_OVERHEAD, CIPSEND_PROMPT};
use self::matcher::{FormField, Matcher, Token};
use self::responses::Reply;
use crate::consts::{
    DEFAULT_LOCAL_PORT, ESP01_LOCAL_IP_LEN, ESP01_PASSWORD_LEN, ESP01_REMOTE_IP_LEN,
    ESP01_RX_BUF_LEN, ESP01_SSID_LEN, ESP01_TX_BUF_LEN, TIMEOUT_PROMPT_LOST, TIMEOUT_RX_GAP,
    TIMEOUT_SET_WIFI, TIMEOUT_TX_PROMPT,
};
use crate::error::Error;
use crate::protocol::Transport;
use crate::ring::RingBuffer;

/// Which side of the Wi-Fi link the modem plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Mode {
    /// Join an access point and talk to a remote endpoint.
    Client,
    /// Serve the configuration portal as an access point.
    #[default]
    SoftAp,
}

/// Transport of the client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Protocol {
    /// `AT+CIPSTART="UDP",...`
    #[default]
    Udp,
    /// `AT+CIPSTART="TCP",...`
    Tcp,
}

impl Protocol {
    /// Name used in `AT+CIPSTART`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Udp => "UDP",
            Self::Tcp => "TCP",
        }
    }
}

/// Connected or not, for [`Esp01::wifi_state`] and [`Esp01::udp_tcp_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum ConnectionState {
    /// Up.
    Connected,
    /// Down.
    Disconnected,
}

impl From<bool> for ConnectionState {
    fn from(up: bool) -> Self {
        if up {
            Self::Connected
        } else {
            Self::Disconnected
        }
    }
}

/// Status changes reported to [`Esp01Listener::on_event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Event {
    /// `WIFI GOT IP` was received.
    WifiConnected,
    /// The modem dropped the access point.
    WifiDisconnected,
    /// `AT+CIFSR` answered; see [`Esp01::local_ip`].
    WifiNewIp,
    /// The UDP/TCP session opened.
    UdpTcpConnected,
    /// The modem confirmed the last send.
    SendOk,
}

/// Callbacks from the driver. Every method defaults to doing nothing.
pub trait Esp01Listener {
    /// A status change.
    fn on_event(&mut self, _event: Event) {}
    /// A human-readable trace line, usually forwarded to the host as user text.
    fn on_debug(&mut self, _msg: &str) {}
    /// One byte of `+IPD` data received from the remote end.
    fn on_data(&mut self, _byte: u8) {}
}

impl Esp01Listener for () {}

/// Queues `+IPD` data, e.g. for the receive side of a Wi-Fi [`Link`](crate::protocol::Link).
impl<const N: usize> Esp01Listener for RingBuffer<N> {
    fn on_data(&mut self, byte: u8) {
        self.push(byte);
    }
}

/// Connection flags and configuration.
///
/// Invariants kept by the driver: `udp_tcp_connected` implies `wifi_connected`, and
/// `sending_data` stays set from `AT+CIPSEND` until `SEND OK` or `ERROR`.
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Associated with the access point and holding an address.
    pub wifi_connected: bool,
    /// The UDP/TCP session is open.
    pub udp_tcp_connected: bool,
    /// A send is in flight.
    pub sending_data: bool,
    /// Paused until the modem prints its `'>'` prompt.
    pub waiting_prompt: bool,
    /// The next `'>'` in the transmit ring is the prompt marker.
    pub tx_cipsend: bool,
    /// The awaited answer to the current AT step arrived.
    pub at_response_ok: bool,
    /// Access point name.
    pub ssid: String<ESP01_SSID_LEN>,
    /// Access point password.
    pub password: String<ESP01_PASSWORD_LEN>,
    /// Remote endpoint address.
    pub remote_ip: String<ESP01_REMOTE_IP_LEN>,
    /// Remote endpoint port.
    pub remote_port: u16,
    /// Local port of the session.
    pub local_port: u16,
    /// Station address reported by `AT+CIFSR`.
    pub local_ip: String<ESP01_LOCAL_IP_LEN>,
    /// Session transport.
    pub protocol: Protocol,
}

impl Session {
    fn clear_flags(&mut self) {
        self.wifi_connected = false;
        self.udp_tcp_connected = false;
        self.sending_data = false;
        self.waiting_prompt = false;
        self.tx_cipsend = false;
        self.at_response_ok = false;
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Timeouts {
    /// Until the next connection step.
    task: u16,
    /// Until a partial reply is abandoned.
    rx_gap: u8,
    /// Until the `'>'` prompt is given up on.
    tx_prompt: u8,
}

/// Driver for an ESP-01 modem.
///
/// ## Type Parameters
///
/// - `S`: UART transmit side, [`embedded_hal_nb::serial::Write<u8>`]
/// - `RST`: CH_PD/reset line, [`embedded_hal::digital::OutputPin`]
/// - `L`: [`Esp01Listener`] receiving events, traces and `+IPD` data
///
/// Received bytes are queued with [`receive`](Esp01::receive), normally from the UART
/// interrupt, and processed by [`task`](Esp01::task).
#[derive(Debug)]
pub struct Esp01<S, RST, L = ()> {
    /// UART transmit side.
    pub serial: S,
    /// Reset line, low holds the modem in reset.
    pub reset: RST,
    /// Callback sink.
    pub listener: L,
    rx: RingBuffer<ESP01_RX_BUF_LEN>,
    tx: RingBuffer<ESP01_TX_BUF_LEN>,
    matcher: Matcher,
    session: Session,
    state: AtState,
    mode: Mode,
    timeouts: Timeouts,
    at_retries: u8,
    cifsr_retries: u8,
    user_connected: bool,
    link: Option<u8>,
    credentials_valid: bool,
}

impl<S, RST, L> Esp01<S, RST, L>
where
    S: serial::Write<u8>,
    RST: OutputPin,
    L: Esp01Listener,
{
    /// Creates a driver in [`AtState::Idle`] and [`Mode::SoftAp`].
    ///
    /// The first [`task`](Esp01::task) call starts a 5 s grace period in which a modem
    /// that reconnects by itself can report `WIFI GOT IP`; after that the modem is hard
    /// reset and configured for the current mode.
    pub fn new(serial: S, reset: RST, listener: L) -> Self {
        Self {
            serial,
            reset,
            listener,
            rx: RingBuffer::new(),
            tx: RingBuffer::new(),
            matcher: Matcher::new(),
            session: Session::default(),
            state: AtState::Idle,
            mode: Mode::default(),
            timeouts: Timeouts::default(),
            at_retries: 0,
            cifsr_retries: 0,
            user_connected: false,
            link: None,
            credentials_valid: false,
        }
    }

    /// Queues one byte received from the modem. Meant for the UART receive interrupt.
    pub fn receive(&mut self, byte: u8) {
        self.rx.push(byte);
    }

    /// Runs one cooperative pass: matches received bytes, advances the connection
    /// sequence when its timeout has expired, and writes at most one byte to the modem.
    pub fn task(&mut self) {
        if !self.rx.is_empty() {
            self.decode();
        }
        if self.timeouts.task == 0 {
            self.do_connection();
        }
        self.send_data();
    }

    /// Advances every timeout by one 10 ms tick.
    pub fn timeout_10ms(&mut self) {
        self.timeouts.task = self.timeouts.task.saturating_sub(1);
        if self.timeouts.rx_gap > 0 {
            self.timeouts.rx_gap -= 1;
            if self.timeouts.rx_gap == 0 {
                self.matcher.reset();
            }
        }
        self.timeouts.tx_prompt = self.timeouts.tx_prompt.saturating_sub(1);
    }

    /// Stores the access point credentials and restarts the connection sequence.
    ///
    /// Longer values are truncated to 64 and 63 bytes. All connection flags are cleared.
    pub fn set_wifi(&mut self, ssid: &str, password: &str) {
        self.state = AtState::Idle;
        self.session.clear_flags();
        copy_truncated(&mut self.session.ssid, ssid);
        copy_truncated(&mut self.session.password, password);
        self.timeouts.task = TIMEOUT_SET_WIFI;
        self.at_retries = 0;
    }

    /// Configures a UDP session to `remote_ip:remote_port`; see [`start_tcp`](Self::start_tcp).
    pub fn start_udp(
        &mut self,
        remote_ip: &str,
        remote_port: u16,
        local_port: u16,
    ) -> Result<(), Error> {
        self.start(Protocol::Udp, remote_ip, remote_port, local_port)
    }

    /// Configures a TCP session to `remote_ip:remote_port`.
    ///
    /// A `local_port` of `0` means `30000`. The endpoint is stored even when an error is
    /// returned and is used the next time the sequence reaches `AT+CIPSTART`.
    ///
    /// # Returns
    /// * `Ok(())` when Wi-Fi is up; the session is (re)opened right away
    /// * `Err(Error::WifiNotSet)` if no SSID was configured
    /// * `Err(Error::WifiDisconnected)` if the modem is not associated yet
    pub fn start_tcp(
        &mut self,
        remote_ip: &str,
        remote_port: u16,
        local_port: u16,
    ) -> Result<(), Error> {
        self.start(Protocol::Tcp, remote_ip, remote_port, local_port)
    }

    fn start(
        &mut self,
        protocol: Protocol,
        remote_ip: &str,
        remote_port: u16,
        local_port: u16,
    ) -> Result<(), Error> {
        self.store_endpoint(protocol, remote_ip, remote_port, local_port);
        if self.session.ssid.is_empty() {
            return Err(Error::WifiNotSet);
        }
        if !self.session.wifi_connected {
            return Err(Error::WifiDisconnected);
        }
        self.enter(AtState::CipClose);
        Ok(())
    }

    fn store_endpoint(
        &mut self,
        protocol: Protocol,
        remote_ip: &str,
        remote_port: u16,
        local_port: u16,
    ) {
        self.session.protocol = protocol;
        copy_truncated(&mut self.session.remote_ip, remote_ip);
        self.session.remote_port = remote_port;
        self.session.local_port = if local_port == 0 {
            DEFAULT_LOCAL_PORT
        } else {
            local_port
        };
    }

    /// Closes the session with `AT+CIPCLOSE`; the sequence then reopens it to the stored
    /// endpoint.
    pub fn close_udp_tcp(&mut self) {
        self.enter(AtState::CipClose);
    }

    /// Queues `data` for the open session.
    ///
    /// # Returns
    /// * `Ok(n)` with the number of bytes queued behind an `AT+CIPSEND=n`
    /// * `Err(Error::UdpTcpDisconnected)` if no session is open
    /// * `Err(Error::SendBusy)` while a previous send awaits `SEND OK`; nothing is queued
    /// * `Err(Error::InvalidSendLength)` for an empty or over-long message
    /// * `Err(Error::TxFull)` if the transmit ring cannot take the whole command
    pub fn send(&mut self, data: &[u8]) -> Result<usize, Error> {
        self.send_iter(data.iter().copied())
    }

    /// [`send`](Self::send) over any sized iterator, e.g. a ring buffer's unread bytes.
    pub fn send_iter<I>(&mut self, data: I) -> Result<usize, Error>
    where
        I: IntoIterator<Item = u8>,
        I::IntoIter: ExactSizeIterator,
    {
        if !self.session.udp_tcp_connected {
            return Err(Error::UdpTcpDisconnected);
        }
        if self.session.sending_data {
            self.trace("send busy");
            return Err(Error::SendBusy);
        }
        let data = data.into_iter();
        let len = data.len();
        if len == 0 || len > CIPSEND_MAX {
            return Err(Error::InvalidSendLength(len));
        }
        let total = AT_CIPSEND.len() + decimal_len(len) + CIPSEND_PROMPT.len() + len;
        if self.tx.free() < total {
            return Err(Error::TxFull(total));
        }

        self.tx.extend_from_slice(AT_CIPSEND.as_bytes());
        push_decimal(&mut self.tx, len);
        self.tx.extend_from_slice(CIPSEND_PROMPT.as_bytes());
        for byte in data {
            self.tx.push(byte);
        }
        self.session.tx_cipsend = true;
        self.session.sending_data = true;
        debug!("esp01: sending {} bytes", len);
        self.listener.on_debug("sending data");
        Ok(len)
    }

    /// Whether the modem is associated with an access point.
    pub fn wifi_state(&self) -> ConnectionState {
        self.session.wifi_connected.into()
    }

    /// Whether the UDP/TCP session is open.
    pub fn udp_tcp_state(&self) -> ConnectionState {
        self.session.udp_tcp_connected.into()
    }

    /// Station address, while Wi-Fi is up and `AT+CIFSR` has reported one.
    pub fn local_ip(&self) -> Option<&str> {
        if self.session.wifi_connected && !self.session.local_ip.is_empty() {
            Some(self.session.local_ip.as_str())
        } else {
            None
        }
    }

    /// `true` while the reset line is being cycled; received bytes are discarded.
    pub fn is_hard_resetting(&self) -> bool {
        self.state.is_hard_reset()
    }

    /// Current mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Selects the mode used the next time the sequence passes `AT+CWMODE`.
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    /// Current step of the connection sequence.
    pub fn at_state(&self) -> AtState {
        self.state
    }

    /// Flags and configuration.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Received bytes lost because [`task`](Self::task) was not called often enough.
    pub fn rx_overruns(&self) -> u16 {
        self.rx.overruns()
    }

    fn trace(&mut self, msg: &str) {
        debug!("esp01: {}", msg);
        self.listener.on_debug(msg);
    }

    fn event(&mut self, event: Event) {
        self.listener.on_event(event);
    }

    fn decode(&mut self) {
        if self.state.is_hard_reset() {
            self.rx.clear();
            return;
        }
        let end = self.rx.write_index();
        self.timeouts.rx_gap = TIMEOUT_RX_GAP;
        while self.rx.read_index() != end {
            let Some(byte) = self.rx.peek() else {
                break;
            };
            let token = self.matcher.step(byte);
            if !matches!(token, Token::Retry | Token::FieldDone(_)) {
                self.rx.skip(1);
            }
            self.apply(token);
        }
    }

    fn apply(&mut self, token: Token) {
        match token {
            Token::Pending | Token::Retry => {}
            Token::Unmatched(byte) => {
                self.timeouts.rx_gap = 0;
                if self.session.waiting_prompt && byte == b'>' {
                    self.session.waiting_prompt = false;
                    self.timeouts.tx_prompt = 0;
                }
            }
            Token::Reply(reply) => self.on_reply(reply),
            Token::GotIp => {
                self.timeouts.task = 0;
                if self.state == AtState::CwjapResponse {
                    self.session.at_response_ok = true;
                }
                self.session.wifi_connected = true;
                info!("esp01: wifi got ip");
                self.event(Event::WifiConnected);
                self.trace("got ip");
            }
            Token::LocalIp(Some(ip)) => {
                self.session.local_ip = ip;
                self.session.at_response_ok = true;
                self.timeouts.task = 0;
                info!("esp01: local ip {}", self.session.local_ip.as_str());
                self.event(Event::WifiNewIp);
            }
            Token::LocalIp(None) => {
                self.session.local_ip.clear();
                warn!("esp01: local ip too long");
                self.event(Event::WifiNewIp);
            }
            Token::Data { byte, last } => {
                self.listener.on_data(byte);
                if last {
                    self.trace("ipd received");
                }
            }
            Token::ClientLinked(link) => {
                if matches!(
                    self.state,
                    AtState::WaitingConnection | AtState::WaitServerData
                ) {
                    self.user_connected = true;
                    self.link = link;
                    self.trace("portal client linked");
                    // A refresh while waiting for the form serves the page again.
                    self.state = AtState::WaitingConnection;
                }
            }
            Token::FieldDone(field) => self.on_field(field),
        }
    }

    fn on_reply(&mut self, reply: Reply) {
        match reply {
            Reply::Ok => {
                if self.state == AtState::AtResponse {
                    self.timeouts.task = 0;
                    self.session.at_response_ok = true;
                }
            }
            Reply::Error => {
                if self.session.sending_data {
                    self.session.sending_data = false;
                    self.session.udp_tcp_connected = false;
                    self.tx.clear();
                    warn!("esp01: send failed");
                }
            }
            Reply::WifiDisconnect | Reply::WifiDisconnected => {
                self.session.udp_tcp_connected = false;
                self.session.wifi_connected = false;
                warn!("esp01: wifi disconnected");
                self.event(Event::WifiDisconnected);
                if self.state != AtState::CwjapResponse {
                    self.state = AtState::HardResetStop;
                }
            }
            Reply::Disconnected | Reply::Closed => {
                self.session.udp_tcp_connected = false;
            }
            Reply::SendOk => {
                self.session.sending_data = false;
                self.event(Event::SendOk);
            }
            Reply::Connect => {
                if self.mode == Mode::Client {
                    self.timeouts.task = 0;
                    self.session.at_response_ok = true;
                    self.session.udp_tcp_connected = true;
                    info!("esp01: {} session open", self.session.protocol.as_str());
                    self.event(Event::UdpTcpConnected);
                    self.trace("udp/tcp connected");
                }
            }
            Reply::BusyDot => {
                self.session.udp_tcp_connected = false;
                self.session.wifi_connected = false;
            }
            Reply::Ready => {
                self.session.udp_tcp_connected = false;
                self.session.wifi_connected = false;
                warn!("esp01: modem restarted");
                self.state = AtState::HardResetStop;
            }
            Reply::At
            | Reply::AtPlus
            | Reply::WifiGotIp
            | Reply::WifiConnected
            | Reply::CifsrStaIp
            | Reply::Ipd
            | Reply::BusyP
            | Reply::BusyS
            | Reply::Ssid
            | Reply::Pass
            | Reply::Ip
            | Reply::GetRequest => {}
        }
    }

    fn on_field(&mut self, field: FormField) {
        match field {
            FormField::Ssid => {
                debug!("esp01: portal ssid {}", self.matcher.ssid.as_str());
                self.listener.on_debug("portal ssid:");
                self.listener.on_debug(self.matcher.ssid.as_str());
            }
            FormField::Pass => {
                debug!("esp01: portal password, {} bytes", self.matcher.pass.len());
                self.listener.on_debug("portal password received");
            }
            FormField::Ip => {
                debug!("esp01: portal ip {}", self.matcher.ip.as_str());
                self.listener.on_debug("portal ip:");
                self.listener.on_debug(self.matcher.ip.as_str());
                let verdict = match self.matcher.form_overflow() {
                    Some((FormField::Ssid, len)) => Err(CredentialError::SsidLength(len)),
                    Some((FormField::Pass, len)) => Err(CredentialError::PasswordLength(len)),
                    Some((FormField::Ip, _)) => Err(CredentialError::InvalidIp),
                    None => validate_credentials(
                        self.matcher.ssid.as_str(),
                        self.matcher.pass.as_str(),
                        self.matcher.ip.as_str(),
                    ),
                };
                match verdict {
                    Ok(()) => {
                        self.credentials_valid = true;
                        info!("esp01: portal credentials accepted");
                        self.listener.on_debug("credentials valid");
                    }
                    Err(e) => {
                        self.credentials_valid = false;
                        warn!("esp01: portal credentials rejected: {}", e);
                        self.listener.on_debug("credentials not valid");
                    }
                }
            }
        }
    }

    fn send_data(&mut self) {
        if self.session.waiting_prompt {
            if self.timeouts.tx_prompt == 0 {
                warn!("esp01: no '>' prompt, dropping {} bytes", self.tx.len());
                self.tx.clear();
                self.session.waiting_prompt = false;
                self.session.sending_data = false;
                self.state = AtState::At;
                self.timeouts.task = TIMEOUT_PROMPT_LOST;
            }
            return;
        }
        let Some(byte) = self.tx.peek() else {
            return;
        };
        let prompt = self.session.tx_cipsend && byte == b'>';
        let out = if prompt { b'\n' } else { byte };
        match self.serial.write(out) {
            Ok(()) => {
                if prompt {
                    self.session.tx_cipsend = false;
                    self.session.waiting_prompt = true;
                    self.timeouts.tx_prompt = TIMEOUT_TX_PROMPT;
                }
                self.tx.skip(1);
            }
            Err(nb::Error::WouldBlock) => {}
            Err(nb::Error::Other(_)) => {
                warn!("esp01: uart write failed");
            }
        }
    }
}

/// Sends the bytes of a link's transmit ring as one `AT+CIPSEND`.
///
/// Bytes are only consumed from `tx` once the driver has queued them.
impl<S, RST, L, const N: usize> Transport<N> for Esp01<S, RST, L>
where
    S: serial::Write<u8>,
    RST: OutputPin,
    L: Esp01Listener,
{
    fn write_pending(&mut self, tx: &mut RingBuffer<N>) {
        let room = self.tx.free().saturating_sub(CIPSEND_OVERHEAD);
        let n = tx.len().min(room).min(CIPSEND_MAX);
        if n == 0 {
            return;
        }
        if let Ok(sent) = self.send_iter(tx.iter().take(n)) {
            tx.skip(sent);
        }
    }
}

fn copy_truncated<const N: usize>(dst: &mut String<N>, src: &str) {
    dst.clear();
    for c in src.chars() {
        if dst.push(c).is_err() {
            break;
        }
    }
}

fn decimal_len(mut n: usize) -> usize {
    let mut digits = 1;
    while n >= 10 {
        n /= 10;
        digits += 1;
    }
    digits
}

fn push_decimal<const N: usize>(tx: &mut RingBuffer<N>, n: usize) {
    let mut text: String<20> = String::new();
    let _ = write!(text, "{}", n);
    tx.extend_from_slice(text.as_bytes());
}

fn push_quoted<const N: usize>(tx: &mut RingBuffer<N>, text: &str) {
    tx.push(b'"');
    tx.extend_from_slice(text.as_bytes());
    tx.push(b'"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{CIFSR_RETRIES, PORTAL_REMOTE_PORT, TIMEOUT_CWJAP};
    use crate::protocol::{Command, Frame, Link, Replier};
    use crate::testing::FakeSerial;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };

    #[derive(Debug, Default)]
    struct Recorder {
        events: Vec<Event>,
        debug: Vec<std::string::String>,
        data: Vec<u8>,
    }

    impl Esp01Listener for Recorder {
        fn on_event(&mut self, event: Event) {
            self.events.push(event);
        }

        fn on_debug(&mut self, msg: &str) {
            self.debug.push(msg.into());
        }

        fn on_data(&mut self, byte: u8) {
            self.data.push(byte);
        }
    }

    type TestModem = Esp01<FakeSerial, PinMock, Recorder>;

    fn modem(reset: &[PinTransaction]) -> TestModem {
        Esp01::new(FakeSerial::default(), PinMock::new(reset), Recorder::default())
    }

    fn feed(modem: &mut TestModem, bytes: &[u8]) {
        for &b in bytes {
            modem.receive(b);
        }
    }

    /// One task pass and one tick, `passes` times.
    fn run(modem: &mut TestModem, passes: usize) {
        for _ in 0..passes {
            modem.task();
            modem.timeout_10ms();
        }
    }

    fn run_until(modem: &mut TestModem, limit: usize, done: impl Fn(&TestModem) -> bool) {
        for _ in 0..limit {
            if done(modem) {
                return;
            }
            modem.task();
            modem.timeout_10ms();
        }
        assert!(done(modem), "condition not reached in {limit} passes");
    }

    fn online(modem: &mut TestModem) {
        modem.mode = Mode::Client;
        modem.state = AtState::Connected;
        modem.session.wifi_connected = true;
        modem.session.udp_tcp_connected = true;
    }

    #[test]
    fn test_ok_advances_at_response() {
        let mut modem = modem(&[]);
        modem.state = AtState::AtResponse;
        modem.timeouts.task = 100;
        feed(&mut modem, b"AT\r\r\n\r\nOK\r\n");
        modem.task();
        assert!(modem.session.at_response_ok);
        assert_eq!(modem.at_state(), AtState::CwMode);
        modem.reset.done();
    }

    #[test]
    fn test_silence_retries_then_hard_resets() {
        let mut modem = modem(&[
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
        ]);
        modem.state = AtState::At;
        for _ in 0..3 {
            modem.do_connection();
            assert_eq!(modem.at_state(), AtState::AtResponse);
            modem.do_connection();
            assert_eq!(modem.at_state(), AtState::At);
        }
        modem.do_connection();
        assert_eq!(modem.at_state(), AtState::AtResponse);
        modem.do_connection();
        modem.do_connection();
        assert_eq!(modem.at_state(), AtState::HardReset0);
        modem.do_connection();
        assert!(modem.is_hard_resetting());
        modem.do_connection();
        assert_eq!(modem.at_state(), AtState::HardResetStop);
        modem.reset.done();
    }

    #[test]
    fn test_startup_resets_into_soft_ap() {
        let mut modem = modem(&[
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
        ]);
        run_until(&mut modem, 2_000, |m| m.at_state() == AtState::At);
        assert_eq!(modem.mode(), Mode::SoftAp);
        modem.reset.done();
    }

    #[test]
    fn test_bytes_dropped_during_hard_reset() {
        let mut modem = modem(&[]);
        modem.state = AtState::HardResetStop;
        modem.timeouts.task = 10;
        feed(&mut modem, b"ready\r\n");
        modem.task();
        assert!(modem.rx.is_empty());
        assert_eq!(modem.at_state(), AtState::HardResetStop);
        modem.reset.done();
    }

    #[test]
    fn test_cifsr_sets_local_ip() {
        let mut modem = modem(&[]);
        modem.mode = Mode::Client;
        modem.state = AtState::CifsrResponse;
        modem.session.wifi_connected = true;
        modem.timeouts.task = 100;
        feed(
            &mut modem,
            b"AT+CIFSR\r\r\n+CIFSR:STAIP,\"192.168.4.1\"\r\n\r\nOK\r\n",
        );
        modem.task();
        assert_eq!(modem.local_ip(), Some("192.168.4.1"));
        assert_eq!(modem.listener.events, vec![Event::WifiNewIp]);
        assert_eq!(modem.at_state(), AtState::CipClose);
        modem.reset.done();
    }

    #[test]
    fn test_local_ip_hidden_without_wifi() {
        let mut modem = modem(&[]);
        modem.session.local_ip = String::try_from("10.0.0.9").unwrap();
        assert_eq!(modem.local_ip(), None);
        modem.session.wifi_connected = true;
        assert_eq!(modem.local_ip(), Some("10.0.0.9"));
        modem.reset.done();
    }

    #[test]
    fn test_got_ip_completes_cwjap() {
        let mut modem = modem(&[]);
        modem.mode = Mode::Client;
        modem.state = AtState::CwjapResponse;
        modem.timeouts.task = 500;
        feed(&mut modem, b"WIFI CONNECTED\r\nWIFI GOT IP\r\n\r\nOK\r\n");
        modem.task();
        assert_eq!(modem.wifi_state(), ConnectionState::Connected);
        assert_eq!(modem.listener.events, vec![Event::WifiConnected]);
        assert_eq!(modem.at_state(), AtState::Cifsr);
        modem.reset.done();
    }

    #[test]
    fn test_start_udp_requires_wifi() {
        let mut modem = modem(&[]);
        assert_eq!(modem.start_udp("10.0.0.5", 30010, 0), Err(Error::WifiNotSet));
        modem.set_wifi("MyNet", "12345678");
        assert_eq!(modem.start_udp("10.0.0.5", 30010, 0), Err(Error::WifiDisconnected));
        assert_eq!(modem.session().local_port, DEFAULT_LOCAL_PORT);
        assert_eq!(modem.session().remote_ip.as_str(), "10.0.0.5");

        modem.session.wifi_connected = true;
        assert_eq!(modem.start_tcp("10.0.0.6", 8080, 4000), Ok(()));
        assert_eq!(modem.at_state(), AtState::CipClose);
        assert_eq!(modem.session().protocol, Protocol::Tcp);
        modem.reset.done();
    }

    #[test]
    fn test_cipstart_command_text() {
        let mut modem = modem(&[]);
        modem.set_wifi("MyNet", "12345678");
        modem.session.wifi_connected = true;
        modem.mode = Mode::Client;
        assert_eq!(modem.start_udp("10.0.0.5", 30010, 0), Ok(()));
        modem.do_connection();
        modem.do_connection();
        assert_eq!(modem.at_state(), AtState::CipStartResponse);
        run(&mut modem, 80);
        assert_eq!(
            modem.serial.text(),
            "AT+CIPCLOSE\r\nAT+CIPSTART=\"UDP\",\"10.0.0.5\",30010,30000,0\r\n"
        );

        feed(&mut modem, b"CONNECT\r\n\r\nOK\r\n");
        modem.task();
        assert_eq!(modem.udp_tcp_state(), ConnectionState::Connected);
        assert_eq!(modem.at_state(), AtState::Connected);
        assert_eq!(modem.listener.events, vec![Event::UdpTcpConnected]);
        modem.reset.done();
    }

    #[test]
    fn test_set_wifi_truncates_and_restarts() {
        let mut modem = modem(&[]);
        online(&mut modem);
        let long = "n".repeat(80);
        modem.set_wifi(&long, "12345678");
        assert_eq!(modem.session().ssid.len(), ESP01_SSID_LEN);
        assert_eq!(modem.at_state(), AtState::Idle);
        assert_eq!(modem.wifi_state(), ConnectionState::Disconnected);
        assert_eq!(modem.udp_tcp_state(), ConnectionState::Disconnected);
        modem.reset.done();
    }

    #[test]
    fn test_send_stages_cipsend() {
        let mut modem = modem(&[]);
        assert_eq!(modem.send(b"hello"), Err(Error::UdpTcpDisconnected));
        online(&mut modem);
        assert_eq!(modem.send(b""), Err(Error::InvalidSendLength(0)));
        assert_eq!(modem.send(b"hello"), Ok(5));
        assert_eq!(modem.tx.len(), "AT+CIPSEND=5\r>hello".len());
        assert!(modem.session().sending_data);
        modem.reset.done();
    }

    #[test]
    fn test_send_while_busy_leaves_tx_alone() {
        let mut modem = modem(&[]);
        online(&mut modem);
        assert_eq!(modem.send(b"hello"), Ok(5));
        let before = modem.tx.len();
        assert_eq!(modem.send(b"again"), Err(Error::SendBusy));
        assert_eq!(modem.tx.len(), before);
        assert!(modem.listener.debug.iter().any(|m| m == "send busy"));
        modem.reset.done();
    }

    #[test]
    fn test_send_rejects_what_does_not_fit() {
        let mut modem = modem(&[]);
        online(&mut modem);
        let big = [0u8; ESP01_TX_BUF_LEN];
        assert!(matches!(modem.send(&big), Err(Error::TxFull(_))));
        assert!(modem.tx.is_empty());
        assert!(!modem.session().sending_data);
        modem.reset.done();
    }

    #[test]
    fn test_prompt_handshake() {
        let mut modem = modem(&[]);
        online(&mut modem);
        assert_eq!(modem.send(b"hi>"), Ok(3));
        run_until(&mut modem, 50, |m| m.session().waiting_prompt);
        assert_eq!(modem.serial.text(), "AT+CIPSEND=3\r\n");

        feed(&mut modem, b"\r\nOK\r\n> ");
        run(&mut modem, 10);
        assert_eq!(modem.serial.text(), "AT+CIPSEND=3\r\nhi>");
        assert!(modem.session().sending_data);

        feed(&mut modem, b"\r\nRecv 3 bytes\r\n\r\nSEND OK\r\n");
        modem.task();
        assert!(!modem.session().sending_data);
        assert_eq!(modem.listener.events, vec![Event::SendOk]);
        modem.reset.done();
    }

    #[test]
    fn test_lost_prompt_drops_pending_data() {
        let mut modem = modem(&[]);
        online(&mut modem);
        assert_eq!(modem.send(b"hello"), Ok(5));
        run_until(&mut modem, 50, |m| m.session().waiting_prompt);
        run(&mut modem, TIMEOUT_TX_PROMPT as usize + 1);
        assert!(modem.tx.is_empty());
        assert!(!modem.session().waiting_prompt);
        assert!(!modem.session().sending_data);
        assert_eq!(modem.at_state(), AtState::At);
        modem.reset.done();
    }

    #[test]
    fn test_send_error_closes_session() {
        let mut modem = modem(&[]);
        online(&mut modem);
        assert_eq!(modem.send(b"hello"), Ok(5));
        feed(&mut modem, b"ERROR\r\n");
        modem.task();
        assert!(modem.tx.is_empty());
        assert_eq!(modem.udp_tcp_state(), ConnectionState::Disconnected);
        assert!(!modem.session().sending_data);
        modem.reset.done();
    }

    #[test]
    fn test_ipd_data_reaches_listener() {
        let mut modem = modem(&[]);
        online(&mut modem);
        feed(&mut modem, b"\r\n+IPD,4:UER\x01\r\n");
        modem.task();
        assert_eq!(modem.listener.data, b"UER\x01");
        modem.reset.done();
    }

    #[test]
    fn test_wifi_disconnect_forces_reset() {
        let mut modem = modem(&[]);
        online(&mut modem);
        modem.timeouts.task = 100;
        feed(&mut modem, b"WIFI DISCONNECT\r\n");
        modem.task();
        assert_eq!(modem.wifi_state(), ConnectionState::Disconnected);
        assert_eq!(modem.udp_tcp_state(), ConnectionState::Disconnected);
        assert_eq!(modem.listener.events, vec![Event::WifiDisconnected]);
        assert_eq!(modem.at_state(), AtState::HardResetStop);
        modem.reset.done();
    }

    #[test]
    fn test_ready_forces_hard_reset_stop() {
        let mut modem = modem(&[]);
        online(&mut modem);
        modem.timeouts.task = 100;
        feed(&mut modem, b"\r\nready\r\n");
        modem.task();
        assert_eq!(modem.at_state(), AtState::HardResetStop);
        assert_eq!(modem.wifi_state(), ConnectionState::Disconnected);
        assert_eq!(modem.udp_tcp_state(), ConnectionState::Disconnected);
        modem.reset.done();
    }

    #[test]
    fn test_closed_session_is_reopened() {
        for reply in [&b"CLOSED\r\n"[..], &b"DISCONNECTED\r\n"[..]] {
            let mut modem = modem(&[]);
            online(&mut modem);
            modem.timeouts.task = 100;
            feed(&mut modem, reply);
            modem.task();
            assert_eq!(modem.udp_tcp_state(), ConnectionState::Disconnected);
            assert_eq!(modem.wifi_state(), ConnectionState::Connected);
            assert_eq!(modem.at_state(), AtState::Connected);

            modem.do_connection();
            assert_eq!(modem.at_state(), AtState::CipClose);
            modem.reset.done();
        }
    }

    #[test]
    fn test_busy_dot_drops_wifi_and_restarts_at() {
        let mut modem = modem(&[]);
        online(&mut modem);
        modem.timeouts.task = 100;
        feed(&mut modem, b"busy s...\r\n");
        modem.task();
        assert_eq!(modem.wifi_state(), ConnectionState::Connected);

        feed(&mut modem, b"busy ...\r\n");
        modem.task();
        assert_eq!(modem.wifi_state(), ConnectionState::Disconnected);
        assert_eq!(modem.at_state(), AtState::Connected);

        modem.do_connection();
        assert_eq!(modem.at_state(), AtState::At);
        modem.reset.done();
    }

    #[test]
    fn test_cwjap_timeout_falls_back_to_at() {
        let mut modem = modem(&[]);
        modem.mode = Mode::Client;
        modem.state = AtState::Cwjap;
        modem.session.ssid = String::try_from("MyNet").unwrap();
        modem.do_connection();
        assert_eq!(modem.at_state(), AtState::CwjapResponse);

        run(&mut modem, usize::from(TIMEOUT_CWJAP) - 1);
        assert_eq!(modem.at_state(), AtState::CwjapResponse);
        run(&mut modem, 2);
        assert_eq!(modem.at_state(), AtState::At);
        assert!(modem.serial.text().starts_with("AT+CWJAP=\"MyNet\",\"\"\r\n"));
        modem.reset.done();
    }

    #[test]
    fn test_cifsr_retried_when_wifi_already_up() {
        let mut modem = modem(&[]);
        modem.mode = Mode::Client;
        modem.state = AtState::Cwjap;
        modem.session.wifi_connected = true;
        modem.do_connection();
        assert_eq!(modem.at_state(), AtState::Cifsr);

        for _ in 1..CIFSR_RETRIES {
            modem.do_connection();
            assert_eq!(modem.at_state(), AtState::CifsrResponse);
            modem.do_connection();
            assert_eq!(modem.at_state(), AtState::Cifsr);
        }
        modem.do_connection();
        assert_eq!(modem.at_state(), AtState::CifsrResponse);
        modem.do_connection();
        assert_eq!(modem.at_state(), AtState::At);
        assert_eq!(
            modem.tx.len(),
            usize::from(CIFSR_RETRIES) * commands::AT_CIFSR.len()
        );
        modem.reset.done();
    }

    #[test]
    fn test_cifsr_retries_survive_at_success() {
        let mut modem = modem(&[]);
        modem.mode = Mode::Client;
        modem.state = AtState::AtResponse;
        modem.session.at_response_ok = true;
        modem.session.wifi_connected = true;
        modem.do_connection();
        assert_eq!(modem.at_state(), AtState::CwMode);
        for _ in 0..5 {
            modem.do_connection();
        }
        assert_eq!(modem.at_state(), AtState::CifsrResponse);

        modem.do_connection();
        assert_eq!(modem.at_state(), AtState::Cifsr);
        modem.reset.done();
    }

    #[test]
    fn test_partial_reply_abandoned_after_gap() {
        let mut modem = modem(&[]);
        online(&mut modem);
        feed(&mut modem, b"SEND O");
        modem.task();
        run(&mut modem, TIMEOUT_RX_GAP as usize);
        modem.session.sending_data = true;
        feed(&mut modem, b"K\r\n");
        modem.task();
        assert!(modem.session().sending_data);
        modem.reset.done();
    }

    fn portal(submission: &[u8]) -> TestModem {
        let mut modem = modem(&[]);
        modem.state = AtState::WaitingConnection;
        feed(&mut modem, b"0,CONNECT\r\n\r\n+IPD,0,350:GET / HTTP/1.1\r\n");
        run_until(&mut modem, 200, |m| m.at_state() == AtState::ConfigServerResponse);
        run_until(&mut modem, 50, |m| m.session().waiting_prompt);
        assert_eq!(
            modem.serial.text(),
            format!("AT+CIPSEND=0,{}\r\n", commands::CONFIG_PAGE.len())
        );
        feed(&mut modem, b"\r\nOK\r\n> ");
        run_until(&mut modem, 200, |m| m.at_state() == AtState::WaitServerData);
        run_until(&mut modem, 400, |m| m.tx.is_empty());
        assert!(modem.serial.text().ends_with(commands::CONFIG_PAGE));

        feed(&mut modem, b"\r\nSEND OK\r\n");
        feed(&mut modem, submission);
        modem
    }

    #[test]
    fn test_portal_accepts_valid_credentials() {
        let mut modem =
            portal(b"+IPD,0,400:GET /?ssid=MyNet&pass=12345678&ip=10.0.0.5 HTTP/1.1\r\n");
        run_until(&mut modem, 300, |m| m.mode() == Mode::Client);
        assert_eq!(modem.session().ssid.as_str(), "MyNet");
        assert_eq!(modem.session().password.as_str(), "12345678");
        assert_eq!(modem.session().remote_ip.as_str(), "10.0.0.5");
        assert_eq!(modem.session().remote_port, PORTAL_REMOTE_PORT);
        assert_eq!(modem.session().local_port, DEFAULT_LOCAL_PORT);
        assert_eq!(modem.session().protocol, Protocol::Udp);
        assert_eq!(modem.at_state(), AtState::HardReset0);
        modem.reset.done();
    }

    #[test]
    fn test_portal_rejects_short_password() {
        let mut modem = portal(b"+IPD,0,400:GET /?ssid=MyNet&pass=short&ip=10.0.0.5 HTTP/1.1\r\n");
        run(&mut modem, 300);
        assert_eq!(modem.mode(), Mode::SoftAp);
        assert_eq!(modem.at_state(), AtState::WaitServerData);
        assert!(modem.session().ssid.is_empty());
        assert!(modem.listener.debug.iter().any(|m| m == "credentials not valid"));
        modem.reset.done();
    }

    #[test]
    fn test_portal_rejects_overlong_fields() {
        let long_ssid = format!(
            "+IPD,0,400:GET /?ssid={}&pass=12345678&ip=10.0.0.5 HTTP/1.1\r\n",
            "s".repeat(40)
        );
        let long_ip = "+IPD,0,400:GET /?ssid=MyNet&pass=12345678&ip=192.168.100.1009 HTTP/1.1\r\n";
        for submission in [long_ssid.as_str(), long_ip] {
            let mut modem = portal(submission.as_bytes());
            run(&mut modem, 300);
            assert_eq!(modem.mode(), Mode::SoftAp);
            assert_eq!(modem.at_state(), AtState::WaitServerData);
            assert!(modem.session().ssid.is_empty());
            assert!(modem.listener.debug.iter().any(|m| m == "credentials not valid"));
            modem.reset.done();
        }
    }

    #[test]
    fn test_portal_keeps_long_password() {
        let password = "p".repeat(40);
        let submission = format!(
            "+IPD,0,400:GET /?ssid=MyNet&pass={password}&ip=10.0.0.5 HTTP/1.1\r\n"
        );
        let mut modem = portal(submission.as_bytes());
        run_until(&mut modem, 300, |m| m.mode() == Mode::Client);
        assert_eq!(modem.session().ssid.as_str(), "MyNet");
        assert_eq!(modem.session().password.as_str(), password);
        modem.reset.done();
    }

    #[test]
    fn test_link_frames_go_out_as_one_send() {
        let mut modem = modem(&[]);
        online(&mut modem);
        let mut link: Link = Link::new();
        let mut ignore = |_: &Frame, _: &mut Replier<'_, 256>| {};

        let n = link.send(Command::Ack, &[]).unwrap();
        link.task(&mut ignore, &mut modem);
        assert!(link.tx.is_empty());
        assert_eq!(
            modem.tx.len(),
            AT_CIPSEND.len() + 1 + CIPSEND_PROMPT.len() + n
        );

        assert_eq!(link.send(Command::Ack, &[]), Ok(n));
        link.task(&mut ignore, &mut modem);
        assert_eq!(link.tx.len(), n);
        modem.reset.done();
    }

    #[test]
    fn test_ring_listener_collects_data() {
        let mut modem = Esp01::new(
            FakeSerial::default(),
            PinMock::new(&[]),
            RingBuffer::<16>::new(),
        );
        modem.session.wifi_connected = true;
        modem.session.udp_tcp_connected = true;
        modem.state = AtState::Connected;
        for &b in b"+IPD,2:ok\r\n" {
            modem.receive(b);
        }
        modem.task();
        assert_eq!(modem.listener.pop(), Some(b'o'));
        assert_eq!(modem.listener.pop(), Some(b'k'));
        modem.reset.done();
    }
}
