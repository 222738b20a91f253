//! Captive-portal credential checks.

use thiserror::Error;

/// Why submitted credentials were rejected.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum CredentialError {
    /// SSID must be 1 to 32 bytes.
    #[error("ssid must be 1 to 32 bytes, got {0}")]
    SsidLength(usize),
    /// Password must be empty (open network) or 8 to 63 bytes.
    #[error("password must be empty or 8 to 63 bytes, got {0}")]
    PasswordLength(usize),
    /// Address is not a dotted quad.
    #[error("invalid ipv4 address")]
    InvalidIp,
}

/// Checks what a user typed into the configuration page.
///
/// # Rules
/// - `ssid`: 1 to 32 bytes
/// - `password`: empty, or 8 to 63 bytes (WPA-PSK)
/// - `ip`: exactly four dot-separated decimal octets, each `0..=255`, no leading zeros
pub fn validate_credentials(ssid: &str, password: &str, ip: &str) -> Result<(), CredentialError> {
    if !(1..=32).contains(&ssid.len()) {
        return Err(CredentialError::SsidLength(ssid.len()));
    }
    if !password.is_empty() && !(8..=63).contains(&password.len()) {
        return Err(CredentialError::PasswordLength(password.len()));
    }
    if !is_valid_ipv4(ip) {
        return Err(CredentialError::InvalidIp);
    }
    Ok(())
}

/// `true` for a dotted quad such as `10.0.0.5`.
pub fn is_valid_ipv4(ip: &str) -> bool {
    let mut octets = 0;
    for part in ip.split('.') {
        octets += 1;
        if octets > 4 || part.is_empty() || part.len() > 3 {
            return false;
        }
        if !part.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        if part.len() > 1 && part.starts_with('0') {
            return false;
        }
        match part.parse::<u16>() {
            Ok(value) if value <= 255 => {}
            _ => return false,
        }
    }
    octets == 4
}
