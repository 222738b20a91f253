//! Connection sequencer.
//!
//! Each step queues one AT command and arms a timeout. Replies recognised by the matcher
//! set `at_response_ok` and zero the timeout, so a prompt answer advances the sequence on
//! the next task pass while silence re-enters the same step. `AT` is retried four times
//! before the modem is hard reset through its reset line.
//!
//! ```text
//! Idle -> WaitingIp -+-> Connected                       (modem rejoined by itself)
//!                    +-> HardReset0 -> HardReset1 -> HardResetStop -> At -> AtResponse
//!                        -> CwMode -> CipCloseServer -> CipMux
//!   client:  -> Cwjap -> CwjapResponse -> Cifsr -> CifsrResponse
//!            -> CipClose -> CipStart -> CipStartResponse -> Connected
//!   soft-AP: -> Cwqap -> Cwsap -> Cwdhcp -> CipServer -> WaitingConnection
//!            -> ConfigServer -> ConfigServerResponse -> WaitServerData
//! ```

use embedded_hal::digital::OutputPin;
use embedded_hal_nb::serial;

use super::commands::{
    AT, AT_CIFSR, AT_CIPCLOSE, AT_CIPMUX, AT_CIPSEND, AT_CIPSERVER_CLOSE, AT_CIPSERVER_OPEN,
    AT_CIPSTART, AT_CWDHCP, AT_CWJAP, AT_CWMODE_STATION_AP, AT_CWQAP, AT_CWSAP, CIPSEND_PROMPT,
    CONFIG_PAGE,
};
use super::{Esp01, Esp01Listener, Mode, Protocol, push_decimal, push_quoted};
use crate::consts::{
    AT_RETRIES, CIFSR_RETRIES, DEFAULT_LOCAL_PORT, PORTAL_REMOTE_PORT, TIMEOUT_CIPSERVER,
    TIMEOUT_CIPSTART, TIMEOUT_CONFIG_PAGE, TIMEOUT_CWJAP, TIMEOUT_CWQAP, TIMEOUT_DEFAULT,
    TIMEOUT_HARD_RESET, TIMEOUT_STARTUP,
};

/// Step of the connection sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum AtState {
    /// Just created or reconfigured.
    #[default]
    Idle,
    /// Grace period for a modem that rejoins by itself.
    WaitingIp,
    /// Pull the reset line low.
    HardReset0,
    /// Release the reset line.
    HardReset1,
    /// Wait for the modem to boot.
    HardResetStop,
    /// Send `AT`.
    At,
    /// Wait for `OK`.
    AtResponse,
    /// Send `AT+CWMODE=3`.
    CwMode,
    /// Send `AT+CIPSERVER=0`.
    CipCloseServer,
    /// Send `AT+CIPMUX`.
    CipMux,
    /// Send `AT+CWJAP`.
    Cwjap,
    /// Wait for `WIFI GOT IP`.
    CwjapResponse,
    /// Send `AT+CIFSR`.
    Cifsr,
    /// Wait for the station address.
    CifsrResponse,
    /// Send `AT+CIPCLOSE`.
    CipClose,
    /// Send `AT+CIPSTART`.
    CipStart,
    /// Wait for `CONNECT`.
    CipStartResponse,
    /// Session open, watching for it to drop.
    Connected,
    /// Send `AT+CWQAP`.
    Cwqap,
    /// Send `AT+CWSAP`.
    Cwsap,
    /// Send `AT+CWDHCP_CUR`.
    Cwdhcp,
    /// Send `AT+CIPSERVER=1,80`.
    CipServer,
    /// Wait for a browser.
    WaitingConnection,
    /// Announce the configuration page with `AT+CIPSEND`.
    ConfigServer,
    /// Send the page once the prompt arrived.
    ConfigServerResponse,
    /// Wait for the submitted form.
    WaitServerData,
}

impl AtState {
    pub(crate) const fn is_hard_reset(self) -> bool {
        matches!(self, Self::HardReset0 | Self::HardReset1 | Self::HardResetStop)
    }
}

impl<S, RST, L> Esp01<S, RST, L>
where
    S: serial::Write<u8>,
    RST: OutputPin,
    L: Esp01Listener,
{
    pub(super) fn enter(&mut self, next: AtState) {
        debug!("esp01: state {:?}", next);
        self.state = next;
    }

    fn stage(&mut self, text: &str) {
        self.tx.extend_from_slice(text.as_bytes());
    }

    /// Runs the step for the current state. Called when the task timeout has expired.
    pub(super) fn do_connection(&mut self) {
        self.timeouts.task = TIMEOUT_DEFAULT;
        match self.state {
            AtState::Idle => {
                self.timeouts.task = TIMEOUT_STARTUP;
                self.enter(AtState::WaitingIp);
            }
            AtState::WaitingIp => {
                if self.session.wifi_connected {
                    self.mode = Mode::Client;
                    self.trace("wifi already up");
                    self.enter(AtState::Connected);
                } else {
                    if self.session.ssid.is_empty() {
                        self.mode = Mode::SoftAp;
                    }
                    self.enter(AtState::HardReset0);
                }
            }
            AtState::HardReset0 => {
                if self.reset.set_low().is_err() {
                    warn!("esp01: reset line failed");
                    return;
                }
                self.session.clear_flags();
                self.tx.clear();
                warn!("esp01: hard reset");
                self.trace("hard reset");
                self.enter(AtState::HardReset1);
            }
            AtState::HardReset1 => {
                if self.reset.set_high().is_err() {
                    warn!("esp01: reset line failed");
                    return;
                }
                self.timeouts.task = TIMEOUT_HARD_RESET;
                self.enter(AtState::HardResetStop);
            }
            AtState::HardResetStop => {
                self.at_retries = 0;
                self.enter(AtState::At);
            }
            AtState::At => {
                if self.at_retries == 0 {
                    self.at_retries = AT_RETRIES;
                } else {
                    self.at_retries -= 1;
                    if self.at_retries == 0 {
                        warn!("esp01: no answer to AT");
                        self.enter(AtState::HardReset0);
                        return;
                    }
                }
                self.session.at_response_ok = false;
                self.stage(AT);
                self.enter(AtState::AtResponse);
            }
            AtState::AtResponse => {
                if self.session.at_response_ok {
                    self.at_retries = 0;
                    self.enter(AtState::CwMode);
                } else {
                    self.enter(AtState::At);
                }
            }
            AtState::CwMode => {
                self.stage(AT_CWMODE_STATION_AP);
                match self.mode {
                    Mode::Client => self.enter(AtState::CipCloseServer),
                    Mode::SoftAp => self.enter(AtState::CipMux),
                }
            }
            AtState::CipCloseServer => {
                self.stage(AT_CIPSERVER_CLOSE);
                self.enter(AtState::CipMux);
            }
            AtState::CipMux => {
                self.stage(AT_CIPMUX);
                match self.mode {
                    Mode::Client => {
                        self.stage("0\r\n");
                        self.enter(AtState::Cwjap);
                    }
                    Mode::SoftAp => {
                        self.stage("1\r\n");
                        self.enter(AtState::Cwqap);
                    }
                }
            }
            AtState::Cwjap => {
                if self.session.wifi_connected {
                    self.cifsr_retries = CIFSR_RETRIES;
                    self.enter(AtState::Cifsr);
                    return;
                }
                if self.session.ssid.is_empty() {
                    return;
                }
                self.session.at_response_ok = false;
                self.stage(AT_CWJAP);
                push_quoted(&mut self.tx, self.session.ssid.as_str());
                self.tx.push(b',');
                push_quoted(&mut self.tx, self.session.password.as_str());
                self.stage("\r\n");
                self.timeouts.task = TIMEOUT_CWJAP;
                self.trace("joining access point");
                self.enter(AtState::CwjapResponse);
            }
            AtState::CwjapResponse => {
                if self.session.at_response_ok {
                    self.cifsr_retries = CIFSR_RETRIES;
                    self.enter(AtState::Cifsr);
                } else {
                    self.enter(AtState::At);
                }
            }
            AtState::Cifsr => {
                self.session.local_ip.clear();
                self.session.at_response_ok = false;
                self.stage(AT_CIFSR);
                self.enter(AtState::CifsrResponse);
            }
            AtState::CifsrResponse => {
                if self.session.at_response_ok {
                    self.enter(AtState::CipClose);
                } else {
                    self.cifsr_retries = self.cifsr_retries.saturating_sub(1);
                    if self.cifsr_retries == 0 {
                        self.enter(AtState::At);
                    } else {
                        self.enter(AtState::Cifsr);
                    }
                }
            }
            AtState::CipClose => {
                if self.session.remote_ip.is_empty() {
                    return;
                }
                self.stage(AT_CIPCLOSE);
                self.enter(AtState::CipStart);
            }
            AtState::CipStart => {
                if self.session.local_port == 0 {
                    self.session.local_port = DEFAULT_LOCAL_PORT;
                }
                self.session.at_response_ok = false;
                self.session.udp_tcp_connected = false;
                self.stage(AT_CIPSTART);
                push_quoted(&mut self.tx, self.session.protocol.as_str());
                self.tx.push(b',');
                push_quoted(&mut self.tx, self.session.remote_ip.as_str());
                self.tx.push(b',');
                push_decimal(&mut self.tx, usize::from(self.session.remote_port));
                self.tx.push(b',');
                push_decimal(&mut self.tx, usize::from(self.session.local_port));
                self.stage(",0\r\n");
                self.timeouts.task = TIMEOUT_CIPSTART;
                self.enter(AtState::CipStartResponse);
            }
            AtState::CipStartResponse => {
                if self.session.at_response_ok {
                    self.trace("udp/tcp session open");
                    self.enter(AtState::Connected);
                } else {
                    self.enter(AtState::At);
                }
            }
            AtState::Connected => {
                if !self.session.wifi_connected {
                    self.trace("wifi lost");
                    self.enter(AtState::At);
                } else if !self.session.udp_tcp_connected {
                    self.enter(AtState::CipClose);
                } else {
                    self.timeouts.task = 0;
                }
            }
            AtState::Cwqap => {
                self.stage(AT_CWQAP);
                self.timeouts.task = TIMEOUT_CWQAP;
                self.enter(AtState::Cwsap);
            }
            AtState::Cwsap => {
                self.stage(AT_CWSAP);
                self.user_connected = false;
                self.session.at_response_ok = false;
                self.enter(AtState::Cwdhcp);
            }
            AtState::Cwdhcp => {
                self.stage(AT_CWDHCP);
                self.enter(AtState::CipServer);
            }
            AtState::CipServer => {
                self.stage(AT_CIPSERVER_OPEN);
                self.timeouts.task = TIMEOUT_CIPSERVER;
                self.session.at_response_ok = false;
                self.trace("configuration portal up");
                self.enter(AtState::WaitingConnection);
            }
            AtState::WaitingConnection => {
                if self.user_connected {
                    self.user_connected = false;
                    self.enter(AtState::ConfigServer);
                }
            }
            AtState::ConfigServer => {
                self.stage(AT_CIPSEND);
                self.tx.push(self.link.unwrap_or(b'0'));
                self.tx.push(b',');
                push_decimal(&mut self.tx, CONFIG_PAGE.len());
                self.stage(CIPSEND_PROMPT);
                self.session.tx_cipsend = true;
                self.session.sending_data = true;
                self.session.at_response_ok = false;
                self.enter(AtState::ConfigServerResponse);
            }
            AtState::ConfigServerResponse => {
                if !self.session.waiting_prompt {
                    self.stage(CONFIG_PAGE);
                    self.timeouts.task = TIMEOUT_CONFIG_PAGE;
                    self.enter(AtState::WaitServerData);
                }
                self.apply_portal_credentials();
            }
            AtState::WaitServerData => self.apply_portal_credentials(),
        }
    }

    fn apply_portal_credentials(&mut self) {
        if !self.credentials_valid {
            return;
        }
        self.credentials_valid = false;
        let ssid = self.matcher.ssid.clone();
        let pass = self.matcher.pass.clone();
        let ip = self.matcher.ip.clone();
        self.set_wifi(ssid.as_str(), pass.as_str());
        self.store_endpoint(Protocol::Udp, ip.as_str(), PORTAL_REMOTE_PORT, DEFAULT_LOCAL_PORT);
        self.mode = Mode::Client;
        info!("esp01: joining {} from portal", ssid.as_str());
        self.enter(AtState::HardReset0);
    }
}
