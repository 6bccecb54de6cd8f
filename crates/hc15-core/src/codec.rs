//! Parameter encoding and decoding
//!
//! Pure functions translating between typed configuration values and the
//! module's ASCII wire fields. Nothing in here touches the transport.

use serde::{Deserialize, Serialize};

use crate::error::Hc15Error;

/// Lowest selectable RF channel
pub const MIN_CHANNEL: u8 = 1;
/// Highest selectable RF channel
pub const MAX_CHANNEL: u8 = 50;
/// Lowest air data rate setting
pub const MIN_AIR_SPEED: u8 = 1;
/// Highest air data rate setting
pub const MAX_AIR_SPEED: u8 = 8;

/// Bare acknowledgement reply
pub const REPLY_OK: &str = "OK";
/// Reply prefix after a factory reset
pub const REPLY_DEFAULT: &str = "OK+DEFAULT";
/// Reply prefix carrying the baud rate
pub const REPLY_BAUD: &str = "OK+B:";
/// Reply prefix carrying the RF channel
pub const REPLY_CHANNEL: &str = "OK+C:";
/// Reply prefix carrying the air data rate
pub const REPLY_AIR_SPEED: &str = "OK+S:";
/// Reply prefix carrying the transmit power
pub const REPLY_TX_POWER: &str = "OK+P:";
/// Reply prefix carrying the parity setting
pub const REPLY_PARITY: &str = "OK+PARITYBIT";
/// Reply prefix carrying the stop-bit setting
pub const REPLY_STOP_BITS: &str = "OK+STOPBIT";
/// Prefix shared by every parameterized reply
pub const REPLY_ANY_PARAM: &str = "OK+";

/// UART parity setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Parity {
    /// No parity bit (wire digit 0)
    None,
    /// Odd parity (wire digit 1)
    Odd,
    /// Even parity (wire digit 2)
    Even,
}

impl Parity {
    /// Digit used in AT commands and replies
    pub fn wire_digit(self) -> char {
        match self {
            Parity::None => '0',
            Parity::Odd => '1',
            Parity::Even => '2',
        }
    }
}

impl TryFrom<u8> for Parity {
    type Error = Hc15Error;

    fn try_from(value: u8) -> Result<Self, Hc15Error> {
        match value {
            0 => Ok(Parity::None),
            1 => Ok(Parity::Odd),
            2 => Ok(Parity::Even),
            other => Err(Hc15Error::InvalidParameter(format!(
                "parity {} not in {{0, 1, 2}}",
                other
            ))),
        }
    }
}

/// UART stop-bit setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopBits {
    /// One stop bit (wire digit 1)
    One,
    /// One and a half stop bits (wire digit 2)
    OnePointFive,
    /// Two stop bits (wire digit 3)
    Two,
}

impl StopBits {
    /// Digit used in AT commands and replies
    pub fn wire_digit(self) -> char {
        match self {
            StopBits::One => '1',
            StopBits::OnePointFive => '2',
            StopBits::Two => '3',
        }
    }
}

impl TryFrom<u8> for StopBits {
    type Error = Hc15Error;

    fn try_from(value: u8) -> Result<Self, Hc15Error> {
        match value {
            1 => Ok(StopBits::One),
            2 => Ok(StopBits::OnePointFive),
            3 => Ok(StopBits::Two),
            other => Err(Hc15Error::InvalidParameter(format!(
                "stop bits {} not in {{1, 2, 3}}",
                other
            ))),
        }
    }
}

/// Snapshot of the module's main settings
///
/// `complete` is false when one or more fields were not reported before the
/// composite read's deadline; unreported fields stay at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicParams {
    /// UART baud rate
    pub baud_rate: u32,
    /// RF channel
    pub channel: u8,
    /// Air data rate setting
    pub air_speed: u8,
    /// Transmit power in dBm
    pub tx_power_dbm: i8,
    /// Whether all four fields were reported
    pub complete: bool,
}

/// Encode an RF channel as the fixed three-digit wire field
pub fn encode_channel(channel: u8) -> Result<String, Hc15Error> {
    if !(MIN_CHANNEL..=MAX_CHANNEL).contains(&channel) {
        return Err(Hc15Error::InvalidParameter(format!(
            "channel {} outside {}..={}",
            channel, MIN_CHANNEL, MAX_CHANNEL
        )));
    }
    Ok(format!("{:03}", channel))
}

/// Encode an air data rate as the fixed three-digit wire field
pub fn encode_air_speed(speed: u8) -> Result<String, Hc15Error> {
    if !(MIN_AIR_SPEED..=MAX_AIR_SPEED).contains(&speed) {
        return Err(Hc15Error::InvalidParameter(format!(
            "air speed {} outside {}..={}",
            speed, MIN_AIR_SPEED, MAX_AIR_SPEED
        )));
    }
    Ok(format!("{:03}", speed))
}

/// Strip a reply prefix and its optional ':' separator from a line
///
/// The module writes some replies as `OK+NAME:value` and others as
/// `OK+NAMEvalue`; both forms are accepted.
pub fn strip_reply<'a>(line: &'a str, prefix: &str) -> Result<&'a str, Hc15Error> {
    let rest = line
        .strip_prefix(prefix)
        .ok_or_else(|| Hc15Error::UnexpectedResponse(line.to_string()))?;
    Ok(rest.strip_prefix(':').unwrap_or(rest))
}

fn parse_decimal<N: std::str::FromStr>(field: &str, line: &str) -> Result<N, Hc15Error> {
    field
        .trim()
        .parse()
        .map_err(|_| Hc15Error::UnexpectedResponse(line.to_string()))
}

/// Decode the baud rate from an `OK+B:` reply line
pub fn decode_baud_rate(line: &str) -> Result<u32, Hc15Error> {
    parse_decimal(strip_reply(line, REPLY_BAUD)?, line)
}

/// Decode the RF channel from an `OK+C:` reply line
pub fn decode_channel(line: &str) -> Result<u8, Hc15Error> {
    parse_decimal(strip_reply(line, REPLY_CHANNEL)?, line)
}

/// Decode the air data rate from an `OK+S:` reply line
pub fn decode_air_speed(line: &str) -> Result<u8, Hc15Error> {
    parse_decimal(strip_reply(line, REPLY_AIR_SPEED)?, line)
}

/// Decode the transmit power in dBm from an `OK+P:` reply line
pub fn decode_tx_power(line: &str) -> Result<i8, Hc15Error> {
    let field = strip_reply(line, REPLY_TX_POWER)?.trim();
    parse_decimal(field.trim_end_matches("dBm"), line)
}

/// Decode the parity setting from an `OK+PARITYBIT` reply line
pub fn decode_parity(line: &str) -> Result<Parity, Hc15Error> {
    match strip_reply(line, REPLY_PARITY)?.trim() {
        "0" => Ok(Parity::None),
        "1" => Ok(Parity::Odd),
        "2" => Ok(Parity::Even),
        _ => Err(Hc15Error::UnexpectedResponse(line.to_string())),
    }
}

/// Decode the stop-bit setting from an `OK+STOPBIT` reply line
pub fn decode_stop_bits(line: &str) -> Result<StopBits, Hc15Error> {
    match strip_reply(line, REPLY_STOP_BITS)?.trim() {
        "1" => Ok(StopBits::One),
        "2" => Ok(StopBits::OnePointFive),
        "3" => Ok(StopBits::Two),
        _ => Err(Hc15Error::UnexpectedResponse(line.to_string())),
    }
}
