//! Reply vocabulary of the ESP-01 AT firmware.
//!
//! Order matters: the matcher takes the first entry whose text can explain a byte, and
//! falls back to later entries when a shared prefix diverges (`"busy ."`, `"busy p"`,
//! `"busy s"`; `"+CIFSR:STAIP"` and `"+IPD"`).

use super::matcher::Phase;

/// Which table entry matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub(crate) enum Reply {
    At,
    AtPlus,
    Ok,
    Error,
    WifiGotIp,
    WifiConnected,
    WifiDisconnect,
    WifiDisconnected,
    Disconnected,
    SendOk,
    Connect,
    Closed,
    CifsrStaIp,
    BusyDot,
    Ipd,
    Ready,
    BusyP,
    BusyS,
    Ssid,
    Pass,
    Ip,
    GetRequest,
}

/// One entry of the table: the text to match and where matching continues afterwards.
#[derive(Debug)]
pub(crate) struct Response {
    pub(crate) text: &'static [u8],
    pub(crate) reply: Reply,
    pub(crate) next: Phase,
}

const fn entry(text: &'static [u8], reply: Reply, next: Phase) -> Response {
    Response { text, reply, next }
}

pub(crate) static RESPONSES: [Response; 22] = [
    entry(b"AT\r", Reply::At, Phase::AwaitNewline),
    entry(b"AT+", Reply::AtPlus, Phase::AwaitNewline),
    entry(b"OK\r\n", Reply::Ok, Phase::AwaitNewline),
    entry(b"ERROR\r\n", Reply::Error, Phase::AwaitNewline),
    entry(b"WIFI GOT IP\r\n", Reply::WifiGotIp, Phase::GotIp),
    entry(b"WIFI CONNECTED\r\n", Reply::WifiConnected, Phase::AwaitNewline),
    entry(b"WIFI DISCONNECT\r\n", Reply::WifiDisconnect, Phase::AwaitNewline),
    entry(b"WIFI DISCONNECTED\r\n", Reply::WifiDisconnected, Phase::AwaitNewline),
    entry(b"DISCONNECTED\r\n", Reply::Disconnected, Phase::AwaitNewline),
    entry(b"SEND OK\r\n", Reply::SendOk, Phase::AwaitNewline),
    entry(b"CONNECT\r\n", Reply::Connect, Phase::AwaitNewline),
    entry(b"CLOSED\r\n", Reply::Closed, Phase::AwaitNewline),
    entry(b"+CIFSR:STAIP", Reply::CifsrStaIp, Phase::CifsrComma),
    entry(b"busy .", Reply::BusyDot, Phase::AwaitNewline),
    entry(b"+IPD", Reply::Ipd, Phase::IpdComma),
    entry(b"ready\r\n", Reply::Ready, Phase::AwaitNewline),
    entry(b"busy p", Reply::BusyP, Phase::AwaitNewline),
    entry(b"busy s", Reply::BusyS, Phase::AwaitNewline),
    entry(b"ssid=", Reply::Ssid, Phase::FormSsid),
    entry(b"pass=", Reply::Pass, Phase::FormPass),
    entry(b"ip=", Reply::Ip, Phase::FormIp),
    entry(b":GET / HTTP", Reply::GetRequest, Phase::ClientLinked),
];
