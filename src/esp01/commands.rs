//! AT command text sent to the modem.

use crate::consts::ESP01_TX_BUF_LEN;

pub(crate) const AT: &str = "AT\r\n";
pub(crate) const AT_CWMODE_STATION_AP: &str = "AT+CWMODE=3\r\n";
pub(crate) const AT_CIPSERVER_CLOSE: &str = "AT+CIPSERVER=0\r\n";
pub(crate) const AT_CIPMUX: &str = "AT+CIPMUX=";
pub(crate) const AT_CWJAP: &str = "AT+CWJAP=";
pub(crate) const AT_CIFSR: &str = "AT+CIFSR\r\n";
pub(crate) const AT_CIPCLOSE: &str = "AT+CIPCLOSE\r\n";
pub(crate) const AT_CIPSTART: &str = "AT+CIPSTART=";
pub(crate) const AT_CIPSEND: &str = "AT+CIPSEND=";
pub(crate) const AT_CWQAP: &str = "AT+CWQAP\r\n";
pub(crate) const AT_CWSAP: &str = "AT+CWSAP=\"ROVER-SETUP\",\"\",5,0\r\n";
pub(crate) const AT_CWDHCP: &str = "AT+CWDHCP_CUR=2,1\r\n";
pub(crate) const AT_CIPSERVER_OPEN: &str = "AT+CIPSERVER=1,80\r\n";

/// Ends the `AT+CIPSEND` line. The `'>'` is sent as `'\n'` and marks where the driver
/// waits for the modem's own prompt before sending the data.
pub(crate) const CIPSEND_PROMPT: &str = "\r>";

/// `AT+CIPSEND=` plus four digits plus the prompt marker.
pub(crate) const CIPSEND_OVERHEAD: usize = AT_CIPSEND.len() + 4 + CIPSEND_PROMPT.len();

/// Largest length `AT+CIPSEND` accepts from this driver.
pub(crate) const CIPSEND_MAX: usize = 9999;

/// Configuration page served in soft-AP mode. The form submits `ssid`, `pass` and `ip`.
pub(crate) const CONFIG_PAGE: &str = concat!(
    "<html><body><h3>Rover setup</h3><form>",
    "SSID:<br><input name=\"ssid\"><br>",
    "Password:<br><input name=\"pass\" type=\"password\"><br>",
    "IPv4:<br><input name=\"ip\"><br>",
    "<input type=\"submit\" value=\"Save\">",
    "</form></body></html>",
);

const _: () = assert!(CONFIG_PAGE.len() < ESP01_TX_BUF_LEN - 1);
