//! Serial port transport
//!
//! Host-side implementation over a `serialport` handle and two GPIO lines.

use std::io::{self, Read, Write};
use std::time::Duration;

use serialport::SerialPort;
use tracing::{error, warn};

use super::{InputPin, OutputPin, Transport};
use crate::error::Hc15Error;

/// UART transport with busy-sense and mode-select lines
///
/// The busy-sense line reads low while the module is mid-transmission; the
/// mode-select line is driven low to enter command mode and high for
/// transparent data mode.
pub struct SerialTransport<B, M> {
    port: Box<dyn SerialPort>,
    busy_pin: B,
    mode_pin: M,
}

impl<B, M> std::fmt::Debug for SerialTransport<B, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport").finish_non_exhaustive()
    }
}

impl<B: InputPin, M: OutputPin> SerialTransport<B, M> {
    /// Open a port by name with 8 data bits, no flow control and a short
    /// built-in timeout, then attach the control lines
    pub fn open(
        port_name: &str,
        baud_rate: u32,
        busy_pin: B,
        mode_pin: M,
    ) -> Result<Self, Hc15Error> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(Duration::from_millis(100))
            .data_bits(serialport::DataBits::Eight)
            .flow_control(serialport::FlowControl::None)
            .open()
            .map_err(|e| Hc15Error::TransportUnavailable(e.to_string()))?;
        Ok(Self::new(port, busy_pin, mode_pin))
    }

    /// Wrap an already configured port handle
    pub fn new(port: Box<dyn SerialPort>, busy_pin: B, mode_pin: M) -> Self {
        Self {
            port,
            busy_pin,
            mode_pin,
        }
    }
}

impl<B: InputPin, M: OutputPin> Transport for SerialTransport<B, M> {
    fn write_bytes(&mut self, bytes: &[u8]) -> usize {
        match self.port.write(bytes) {
            Ok(written) => written,
            Err(e) => {
                error!(error = %e, "serial write failed");
                0
            }
        }
    }

    fn read_byte(&mut self) -> Option<u8> {
        if self.bytes_available() == 0 {
            return None;
        }
        let mut byte = [0u8; 1];
        match self.port.read(&mut byte) {
            Ok(n) if n > 0 => Some(byte[0]),
            Ok(_) => None,
            Err(ref e)
                if e.kind() == io::ErrorKind::TimedOut
                    || e.kind() == io::ErrorKind::WouldBlock =>
            {
                None
            }
            Err(e) => {
                warn!(error = %e, "serial read failed");
                None
            }
        }
    }

    fn bytes_available(&self) -> usize {
        self.port.bytes_to_read().map(|n| n as usize).unwrap_or(0)
    }

    fn set_command_mode(&mut self, enabled: bool) {
        if enabled {
            self.mode_pin.set_low();
        } else {
            self.mode_pin.set_high();
        }
    }

    fn is_busy(&self) -> bool {
        !self.busy_pin.is_high()
    }
}
