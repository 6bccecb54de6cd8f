//! # HC-15 Core Library
//!
//! Driver core for HC-15 class serial radio transceiver modules.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - AT command encoding and response decoding for the HC-15 configuration surface
//! - A deadline-bounded transport token that serializes one UART across tasks
//! - A background drain task feeding a reusable line buffer
//! - Busy-line gating and mode-select control over pluggable pin traits
//! - A scriptable mock transport for exercising the full stack without hardware
//!
//! ## Supported hardware
//!
//! - HC-15 serial radio modules
//! - Anything else reachable through a [`transport::Transport`] implementation
//!
//! ## Example
//!
//! ```rust,ignore
//! use hc15_core::prelude::*;
//! use hc15_core::transport::SerialTransport;
//!
//! let transport = SerialTransport::open("/dev/ttyUSB0", 9600, busy_pin, mode_pin)?;
//! let driver = Hc15Driver::new(transport);
//!
//! // Keep over-the-air traffic flowing while commands run.
//! let drain = driver.spawn_drain(DrainConfig::default());
//!
//! driver.set_channel(7).await?;
//! let params = driver.basic_params().await?;
//! println!("channel {} at {} dBm", params.channel, params.tx_power_dbm);
//!
//! while let Some(line) = driver.read_line() {
//!     println!("received: {line}");
//! }
//! drain.shutdown().await;
//! ```

pub mod busy;
pub mod codec;
pub mod command;
pub mod drain;
pub mod driver;
pub mod error;
pub mod line_buffer;
pub mod lock;
pub mod transport;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::codec::{BasicParams, Parity, StopBits};
    pub use crate::command::{Command, ResponseMatch};
    pub use crate::drain::{DrainConfig, DrainHandle};
    pub use crate::driver::{DriverConfig, Hc15Driver};
    pub use crate::error::Hc15Error;
    pub use crate::transport::{MockTransport, SerialTransport, Transport};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
