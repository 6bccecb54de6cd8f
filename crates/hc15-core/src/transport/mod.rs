//! Transport abstraction
//!
//! Byte-level access to the module: the UART plus the busy-sense input and
//! the mode-select output. Implementations are infallible at this level; a
//! dead UART reads as "nothing written, nothing available" and the driver
//! turns short writes into errors.

mod mock;
mod serial;

pub use mock::MockTransport;
pub use serial::SerialTransport;

/// Raw byte and control-line access to one module
pub trait Transport: Send {
    /// Write raw bytes, returning how many were accepted
    fn write_bytes(&mut self, bytes: &[u8]) -> usize;

    /// Read one byte if the receive path has one ready
    fn read_byte(&mut self) -> Option<u8>;

    /// Number of bytes ready to read without blocking
    fn bytes_available(&self) -> usize;

    /// Drive the mode-select line; `true` selects command mode
    fn set_command_mode(&mut self, enabled: bool);

    /// Sample the busy-sense line
    fn is_busy(&self) -> bool;
}

/// Digital input line, sampled by polling
pub trait InputPin: Send {
    /// Whether the line currently reads high
    fn is_high(&self) -> bool;
}

/// Digital output line
pub trait OutputPin: Send {
    /// Drive the line high
    fn set_high(&mut self);

    /// Drive the line low
    fn set_low(&mut self);
}
