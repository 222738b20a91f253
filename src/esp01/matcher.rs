//! Byte-at-a-time recogniser for modem replies.
//!
//! The matcher has no side effects on the session: every byte yields a [`Token`] and the
//! driver decides what it means for the connection. It works in three stages:
//!
//! 1. `Header`: the first table entry starting with the byte is chosen.
//! 2. `Body`: following bytes are checked against that entry. On a mismatch every entry
//!    is asked whether it has the failed byte at the same position (so `"busy ."` can turn
//!    into `"busy p"`). If none has, matching starts over and the byte is offered again.
//! 3. Continuation phases chosen by the entry: wait for `'\n'`, read the quoted address
//!    of `+CIFSR:STAIP`, forward the data of `+IPD,<n>:` or collect a captive-portal
//!    form field.

use heapless::String;

use super::responses::{RESPONSES, Reply};
use crate::consts::{ESP01_LOCAL_IP_LEN, PORTAL_IP_LEN, PORTAL_PASS_LEN, PORTAL_SSID_LEN};

/// Where the matcher is inside a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub(crate) enum Phase {
    #[default]
    Header,
    Body,
    AwaitNewline,
    CifsrComma,
    CifsrQuote,
    CifsrAddress,
    CifsrNewline,
    IpdComma,
    IpdLength,
    IpdData,
    ClientLinked,
    GotIp,
    FormSsid,
    FormPass,
    FormIp,
}

/// Captive-portal form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub(crate) enum FormField {
    Ssid,
    Pass,
    Ip,
}

/// What one byte meant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    /// Part of something still being matched.
    Pending,
    /// The byte ended the current match without belonging to it; offer it again.
    Retry,
    /// Not the start of any known reply.
    Unmatched(u8),
    /// A reply line completed.
    Reply(Reply),
    /// `+CIFSR:STAIP,"<ip>"` completed; `None` if the address was too long.
    LocalIp(Option<String<ESP01_LOCAL_IP_LEN>>),
    /// `WIFI GOT IP` completed.
    GotIp,
    /// One byte of `+IPD` data; `last` on the final one.
    Data { byte: u8, last: bool },
    /// A browser requested the configuration page, on the ASCII link id if one was seen.
    ClientLinked(Option<u8>),
    /// A form field was collected. The byte that ended it is offered again.
    FieldDone(FormField),
}

#[derive(Debug, Default)]
pub(crate) struct Matcher {
    phase: Phase,
    entry: usize,
    pos: usize,
    remaining: usize,
    ipd_len: u16,
    ipd_digits: u8,
    link: Option<u8>,
    local_ip: String<ESP01_LOCAL_IP_LEN>,
    ip_overflow: bool,
    field_len: usize,
    form_overflow: Option<(FormField, usize)>,
    pub(crate) ssid: String<PORTAL_SSID_LEN>,
    pub(crate) pass: String<PORTAL_PASS_LEN>,
    pub(crate) ip: String<PORTAL_IP_LEN>,
}

impl Matcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Abandons a partial reply.
    pub(crate) fn reset(&mut self) {
        self.phase = Phase::Header;
    }

    pub(crate) fn step(&mut self, byte: u8) -> Token {
        match self.phase {
            Phase::Header => self.header(byte),
            Phase::Body => self.body(byte),
            Phase::AwaitNewline => {
                if byte == b'\n' {
                    self.phase = Phase::Header;
                    Token::Reply(RESPONSES[self.entry].reply)
                } else {
                    Token::Pending
                }
            }
            Phase::CifsrComma => {
                if byte == b',' {
                    self.phase = Phase::CifsrQuote;
                    Token::Pending
                } else {
                    self.restart()
                }
            }
            Phase::CifsrQuote => {
                if byte == b'"' {
                    self.local_ip.clear();
                    self.ip_overflow = false;
                    self.phase = Phase::CifsrAddress;
                }
                Token::Pending
            }
            Phase::CifsrAddress => {
                if byte == b'"' {
                    self.phase = Phase::CifsrNewline;
                } else if self.local_ip.push(char::from(byte)).is_err() {
                    self.ip_overflow = true;
                    self.phase = Phase::CifsrNewline;
                }
                Token::Pending
            }
            Phase::CifsrNewline => {
                if byte != b'\n' {
                    return Token::Pending;
                }
                self.phase = Phase::Header;
                if self.ip_overflow || self.local_ip.len() == ESP01_LOCAL_IP_LEN {
                    Token::LocalIp(None)
                } else {
                    Token::LocalIp(Some(self.local_ip.clone()))
                }
            }
            Phase::IpdComma => {
                if byte == b',' {
                    self.ipd_len = 0;
                    self.ipd_digits = 0;
                    self.phase = Phase::IpdLength;
                    Token::Pending
                } else {
                    self.restart()
                }
            }
            Phase::IpdLength => self.ipd_length(byte),
            Phase::IpdData => {
                self.ipd_len -= 1;
                let last = self.ipd_len == 0;
                if last {
                    self.phase = Phase::Header;
                }
                Token::Data { byte, last }
            }
            Phase::ClientLinked => {
                self.phase = Phase::Header;
                Token::ClientLinked(self.link)
            }
            Phase::GotIp => {
                self.phase = Phase::Header;
                Token::GotIp
            }
            Phase::FormSsid => self.collect_field(FormField::Ssid, byte),
            Phase::FormPass => self.collect_field(FormField::Pass, byte),
            Phase::FormIp => self.collect_field(FormField::Ip, byte),
        }
    }

    fn header(&mut self, byte: u8) -> Token {
        let Some(entry) = RESPONSES.iter().position(|r| r.text[0] == byte) else {
            return Token::Unmatched(byte);
        };
        self.entry = entry;
        self.pos = 1;
        self.remaining = RESPONSES[entry].text.len() - 1;
        if self.remaining == 0 {
            self.finish_entry();
        } else {
            self.phase = Phase::Body;
        }
        Token::Pending
    }

    fn body(&mut self, byte: u8) -> Token {
        let text = RESPONSES[self.entry].text;
        if text.get(self.pos) == Some(&byte) {
            self.remaining -= 1;
            if self.remaining == 0 || byte == b'\r' {
                self.finish_entry();
            } else {
                self.pos += 1;
            }
            return Token::Pending;
        }

        let pos = self.pos;
        let Some(entry) = RESPONSES.iter().position(|r| r.text.get(pos) == Some(&byte)) else {
            return self.restart();
        };
        self.entry = entry;
        self.remaining = RESPONSES[entry].text.len() - (pos + 1);
        if self.remaining == 0 {
            self.finish_entry();
        } else {
            self.pos += 1;
        }
        Token::Pending
    }

    /// The first form field that was longer than its capacity since `ssid=` was last seen,
    /// with the length submitted.
    pub(crate) fn form_overflow(&self) -> Option<(FormField, usize)> {
        self.form_overflow
    }

    fn finish_entry(&mut self) {
        let next = RESPONSES[self.entry].next;
        match next {
            Phase::FormSsid => {
                self.ssid.clear();
                self.form_overflow = None;
            }
            Phase::FormPass => self.pass.clear(),
            Phase::FormIp => self.ip.clear(),
            _ => {}
        }
        self.field_len = 0;
        self.phase = next;
    }

    /// Collects one form field byte. Bytes past the capacity are counted, not stored.
    fn collect_field(&mut self, field: FormField, byte: u8) -> Token {
        let end = match field {
            FormField::Ip => matches!(byte, b'&' | b'\r' | b' '),
            FormField::Ssid | FormField::Pass => matches!(byte, b'&' | b'\r'),
        };
        if end {
            let stored = match field {
                FormField::Ssid => self.ssid.len(),
                FormField::Pass => self.pass.len(),
                FormField::Ip => self.ip.len(),
            };
            if self.field_len > stored && self.form_overflow.is_none() {
                self.form_overflow = Some((field, self.field_len));
            }
            self.phase = Phase::Header;
            return Token::FieldDone(field);
        }
        self.field_len = self.field_len.saturating_add(1);
        let c = char::from(byte);
        let _ = match field {
            FormField::Ssid => self.ssid.push(c),
            FormField::Pass => self.pass.push(c),
            FormField::Ip => self.ip.push(c),
        };
        Token::Pending
    }

    fn ipd_length(&mut self, byte: u8) -> Token {
        match byte {
            b':' if self.ipd_len == 0 => {
                self.phase = Phase::Header;
                Token::Pending
            }
            b':' => {
                self.phase = Phase::IpdData;
                Token::Pending
            }
            b'0'..=b'9' => {
                self.ipd_digits = self.ipd_digits.saturating_add(1);
                self.ipd_len = self
                    .ipd_len
                    .saturating_mul(10)
                    .saturating_add(u16::from(byte - b'0'));
                Token::Pending
            }
            b',' if self.ipd_digits == 1 => {
                // Multi-connection form `+IPD,<link>,<n>:`, the data is matched in place.
                self.link = Some(b'0' + self.ipd_len as u8);
                self.restart()
            }
            _ => self.restart(),
        }
    }

    fn restart(&mut self) -> Token {
        self.phase = Phase::Header;
        Token::Retry
    }
}
