//! AT command construction
//!
//! Each constructor validates its parameter before anything reaches the
//! transport, so an out-of-range value fails without taking the token.

use std::time::Duration;

use crate::codec::{self, Parity, StopBits};
use crate::error::Hc15Error;

/// Default deadline for a matching response line
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

/// How a response line is matched against a command's expected reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMatch {
    /// The line must equal the text exactly
    Exact(&'static str),
    /// The line must start with the text
    Prefix(&'static str),
}

impl ResponseMatch {
    /// Test a candidate line
    pub fn matches(&self, line: &str) -> bool {
        match self {
            ResponseMatch::Exact(expected) => line == *expected,
            ResponseMatch::Prefix(expected) => line.starts_with(expected),
        }
    }

    /// The expected reply text
    pub fn expected(&self) -> &'static str {
        match self {
            ResponseMatch::Exact(expected) | ResponseMatch::Prefix(expected) => expected,
        }
    }
}

/// A single AT exchange: request bytes, reply to expect, response deadline
#[derive(Debug, Clone)]
pub struct Command {
    wire: Vec<u8>,
    expect: ResponseMatch,
    timeout: Duration,
}

impl Command {
    fn new(request: &str, expect: ResponseMatch) -> Self {
        let mut wire = request.as_bytes().to_vec();
        wire.extend_from_slice(b"\r\n");
        Self {
            wire,
            expect,
            timeout: DEFAULT_RESPONSE_TIMEOUT,
        }
    }

    /// Bare `AT` self-test, acknowledged with `OK`
    pub fn probe() -> Self {
        Self::new("AT", ResponseMatch::Exact(codec::REPLY_OK))
    }

    /// Restore the factory configuration
    pub fn reset_default() -> Self {
        Self::new("AT+DEFAULT", ResponseMatch::Prefix(codec::REPLY_DEFAULT))
    }

    /// Query the UART baud rate
    pub fn query_baud_rate() -> Self {
        Self::new("AT+B?", ResponseMatch::Prefix(codec::REPLY_BAUD))
    }

    /// Query the parity setting
    pub fn query_parity() -> Self {
        Self::new("AT+PARITYBIT?", ResponseMatch::Prefix(codec::REPLY_PARITY))
    }

    /// Select a parity setting
    pub fn set_parity(parity: Parity) -> Self {
        Self::new(
            &format!("AT+PARITYBIT{}", parity.wire_digit()),
            ResponseMatch::Prefix(codec::REPLY_PARITY),
        )
    }

    /// Query the stop-bit setting
    pub fn query_stop_bits() -> Self {
        Self::new("AT+STOPBIT?", ResponseMatch::Prefix(codec::REPLY_STOP_BITS))
    }

    /// Select a stop-bit setting
    pub fn set_stop_bits(bits: StopBits) -> Self {
        Self::new(
            &format!("AT+STOPBIT{}", bits.wire_digit()),
            ResponseMatch::Prefix(codec::REPLY_STOP_BITS),
        )
    }

    /// Query the RF channel
    pub fn query_channel() -> Self {
        Self::new("AT+C?", ResponseMatch::Prefix(codec::REPLY_CHANNEL))
    }

    /// Select an RF channel, rejecting values outside 1..=50
    pub fn set_channel(channel: u8) -> Result<Self, Hc15Error> {
        Ok(Self::new(
            &format!("AT+C{}", codec::encode_channel(channel)?),
            ResponseMatch::Prefix(codec::REPLY_CHANNEL),
        ))
    }

    /// Query the air data rate
    pub fn query_air_speed() -> Self {
        Self::new("AT+S?", ResponseMatch::Prefix(codec::REPLY_AIR_SPEED))
    }

    /// Select an air data rate, rejecting values outside 1..=8
    pub fn set_air_speed(speed: u8) -> Result<Self, Hc15Error> {
        Ok(Self::new(
            &format!("AT+S{}", codec::encode_air_speed(speed)?),
            ResponseMatch::Prefix(codec::REPLY_AIR_SPEED),
        ))
    }

    /// Request every basic parameter in one exchange
    pub fn read_all_params() -> Self {
        Self::new("AT+RX", ResponseMatch::Prefix(codec::REPLY_ANY_PARAM))
    }

    /// Replace the response deadline for this exchange
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Full request bytes including the CR LF terminator
    pub fn wire_bytes(&self) -> &[u8] {
        &self.wire
    }

    /// Reply matcher for this exchange
    pub fn expect(&self) -> &ResponseMatch {
        &self.expect
    }

    /// Response deadline for this exchange
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
