//! Driver and command state machine
//!
//! One driver value multiplexes a single UART between synchronous AT
//! exchanges and the background receive drain. Handles are cheap to clone
//! and share the transport token, the line buffer and the configuration.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::busy::BusyGate;
use crate::codec::{self, BasicParams, Parity, StopBits};
use crate::command::{Command, DEFAULT_RESPONSE_TIMEOUT};
use crate::drain::{self, DrainConfig, DrainHandle};
use crate::error::Hc15Error;
use crate::line_buffer::LineBuffer;
use crate::lock::{TransportGuard, TransportLock};
use crate::transport::Transport;

/// Timing and behavior settings for the driver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Longest wait for the transport token in configuration commands
    pub lock_wait: Duration,
    /// Shorter token wait used by the plain self-test
    pub probe_lock_wait: Duration,
    /// Deadline for a matching response line
    pub response_timeout: Duration,
    /// Longest wait for the busy line to clear before writing
    pub busy_wait: Duration,
    /// Settle delay after the mode-select line changes state
    pub mode_settle: Duration,
    /// Cooperative pause between receive and busy-line polls
    pub poll_interval: Duration,
    /// Append unmatched response lines and timeout residue to the line buffer
    pub spill_unmatched: bool,
    /// Overall deadline for the composite parameter read
    pub composite_timeout: Duration,
    /// Per-line deadline within the composite parameter read
    pub composite_line_timeout: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            lock_wait: Duration::from_secs(10),
            probe_lock_wait: Duration::from_secs(5),
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            busy_wait: Duration::from_secs(5),
            mode_settle: Duration::from_millis(100),
            poll_interval: Duration::from_millis(1),
            spill_unmatched: false,
            composite_timeout: Duration::from_secs(3),
            composite_line_timeout: Duration::from_millis(500),
        }
    }
}

/// State shared between driver handles and the drain task
pub(crate) struct DriverShared<T> {
    pub(crate) transport: TransportLock<T>,
    rx: Mutex<LineBuffer>,
    config: DriverConfig,
}

impl<T> DriverShared<T> {
    pub(crate) fn new(transport: T, config: DriverConfig) -> Self {
        Self {
            transport: TransportLock::new(transport),
            rx: Mutex::new(LineBuffer::new()),
            config,
        }
    }

    /// Buffer access; the guard is never held across an await
    pub(crate) fn buffer(&self) -> MutexGuard<'_, LineBuffer> {
        self.rx.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Scoped command-mode entry
///
/// Dropping the session restores transparent mode before the transport
/// token is released, on every exit path.
struct CommandMode<'a, T: Transport> {
    guard: TransportGuard<'a, T>,
}

impl<'a, T: Transport> CommandMode<'a, T> {
    fn enter(mut guard: TransportGuard<'a, T>) -> Self {
        guard.set_command_mode(true);
        Self { guard }
    }
}

impl<T: Transport> Drop for CommandMode<'_, T> {
    fn drop(&mut self) {
        self.guard.set_command_mode(false);
    }
}

impl<T: Transport> Deref for CommandMode<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T: Transport> DerefMut for CommandMode<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

/// Handle to one HC-15 module
///
/// Configuration commands are serialized against the background drain by the
/// transport token; the line buffer read side needs no token at all.
pub struct Hc15Driver<T> {
    shared: Arc<DriverShared<T>>,
}

impl<T> Clone for Hc15Driver<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Transport> Hc15Driver<T> {
    /// Driver with default configuration
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, DriverConfig::default())
    }

    /// Driver with explicit configuration
    ///
    /// Transparent mode is asserted and any bytes already pending on the
    /// receive path are discarded.
    pub fn with_config(mut transport: T, config: DriverConfig) -> Self {
        transport.set_command_mode(false);
        let stale = transport.bytes_available();
        for _ in 0..stale {
            if transport.read_byte().is_none() {
                break;
            }
        }
        if stale > 0 {
            debug!(bytes = stale, "discarded stale receive bytes");
        }
        Self {
            shared: Arc::new(DriverShared::new(transport, config)),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &DriverConfig {
        &self.shared.config
    }

    /// Bare `AT` self-test
    pub async fn probe(&self) -> Result<(), Hc15Error> {
        let command = Command::probe().with_timeout(self.shared.config.response_timeout);
        self.exchange(&command, self.shared.config.probe_lock_wait)
            .await?;
        Ok(())
    }

    /// Restore the factory configuration
    pub async fn reset_default(&self) -> Result<(), Hc15Error> {
        self.send_command(Command::reset_default()).await?;
        Ok(())
    }

    /// Read the UART baud rate; the module offers no setter for it
    pub async fn baud_rate(&self) -> Result<u32, Hc15Error> {
        let line = self.send_command(Command::query_baud_rate()).await?;
        codec::decode_baud_rate(&line)
    }

    /// Read the parity setting
    pub async fn parity(&self) -> Result<Parity, Hc15Error> {
        let line = self.send_command(Command::query_parity()).await?;
        codec::decode_parity(&line)
    }

    /// Select a parity setting
    pub async fn set_parity(&self, parity: Parity) -> Result<(), Hc15Error> {
        self.send_command(Command::set_parity(parity)).await?;
        Ok(())
    }

    /// Read the stop-bit setting
    pub async fn stop_bits(&self) -> Result<StopBits, Hc15Error> {
        let line = self.send_command(Command::query_stop_bits()).await?;
        codec::decode_stop_bits(&line)
    }

    /// Select a stop-bit setting
    pub async fn set_stop_bits(&self, bits: StopBits) -> Result<(), Hc15Error> {
        self.send_command(Command::set_stop_bits(bits)).await?;
        Ok(())
    }

    /// Read the RF channel
    pub async fn channel(&self) -> Result<u8, Hc15Error> {
        let line = self.send_command(Command::query_channel()).await?;
        codec::decode_channel(&line)
    }

    /// Select an RF channel and return the value the module echoed
    ///
    /// Values outside 1..=50 are rejected before any transport I/O.
    pub async fn set_channel(&self, channel: u8) -> Result<u8, Hc15Error> {
        let line = self.send_command(Command::set_channel(channel)?).await?;
        codec::decode_channel(&line)
    }

    /// Read the air data rate
    pub async fn air_speed(&self) -> Result<u8, Hc15Error> {
        let line = self.send_command(Command::query_air_speed()).await?;
        codec::decode_air_speed(&line)
    }

    /// Select an air data rate and return the value the module echoed
    ///
    /// Values outside 1..=8 are rejected before any transport I/O.
    pub async fn set_air_speed(&self, speed: u8) -> Result<u8, Hc15Error> {
        let line = self.send_command(Command::set_air_speed(speed)?).await?;
        codec::decode_air_speed(&line)
    }

    /// Read baud rate, channel, air speed and transmit power in one exchange
    ///
    /// Reply lines are dispatched on their own prefixes, so arrival order
    /// does not matter and unrecognized lines are skipped. Fields missing at
    /// the deadline stay zero and `complete` turns false; that is a partial
    /// result, not an error.
    pub async fn basic_params(&self) -> Result<BasicParams, Hc15Error> {
        let config = &self.shared.config;
        let command = Command::read_all_params();
        let mut session = self.begin_exchange(&command, config.lock_wait).await?;

        let mut params = BasicParams::default();
        let mut seen = [false; 4];
        let mut candidate = Vec::new();
        let deadline = Instant::now() + config.composite_timeout;

        while !seen.iter().all(|&s| s) && Instant::now() < deadline {
            let window = (Instant::now() + config.composite_line_timeout).min(deadline);
            let line = match self
                .read_line_within(&mut session, &mut candidate, window)
                .await
            {
                Some(line) => line,
                None => continue,
            };

            if let Ok(value) = codec::decode_baud_rate(&line) {
                params.baud_rate = value;
                seen[0] = true;
            } else if let Ok(value) = codec::decode_channel(&line) {
                params.channel = value;
                seen[1] = true;
            } else if let Ok(value) = codec::decode_air_speed(&line) {
                params.air_speed = value;
                seen[2] = true;
            } else if let Ok(value) = codec::decode_tx_power(&line) {
                params.tx_power_dbm = value;
                seen[3] = true;
            } else {
                debug!(line = %line, "ignoring unrecognized parameter line");
            }
        }

        params.complete = seen.iter().all(|&s| s);
        if params.complete {
            debug!(?params, "parameter read complete");
        } else {
            warn!(?params, "parameter read incomplete");
        }
        Ok(params)
    }

    /// Run one prepared exchange and return the matched line
    ///
    /// Uses the command's own response deadline, so this is the hook for
    /// per-call timeouts.
    pub async fn execute(&self, command: Command) -> Result<String, Hc15Error> {
        self.exchange(&command, self.shared.config.lock_wait).await
    }

    /// Bytes currently held in the line buffer
    ///
    /// Never touches the transport token.
    pub fn available(&self) -> usize {
        self.shared.buffer().available()
    }

    /// Extract the next buffered line, if any
    ///
    /// Operates only on bytes the drain has already committed; never touches
    /// the transport token.
    pub fn read_line(&self) -> Option<String> {
        self.shared.buffer().read_line()
    }

    /// Start the background drain task
    ///
    /// The returned handle stops the task on `shutdown`. Dropping the handle
    /// without shutting down detaches the task; it keeps draining for as
    /// long as its clone of the driver internals lives.
    pub fn spawn_drain(&self, config: DrainConfig) -> DrainHandle
    where
        T: 'static,
    {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(drain::run(
            Arc::clone(&self.shared),
            config,
            cancel.clone(),
        ));
        DrainHandle::new(cancel, task)
    }

    async fn send_command(&self, command: Command) -> Result<String, Hc15Error> {
        let command = command.with_timeout(self.shared.config.response_timeout);
        self.exchange(&command, self.shared.config.lock_wait).await
    }

    async fn exchange(&self, command: &Command, lock_wait: Duration) -> Result<String, Hc15Error> {
        let mut session = self.begin_exchange(command, lock_wait).await?;
        self.read_matching_line(&mut session, command).await
    }

    /// Acquire the token, enter command mode, gate on busy and write the
    /// request; every error exit leaves mode and token restored via drop
    async fn begin_exchange(
        &self,
        command: &Command,
        lock_wait: Duration,
    ) -> Result<CommandMode<'_, T>, Hc15Error> {
        let config = &self.shared.config;
        let guard = self.shared.transport.acquire(lock_wait).await?;
        let mut session = CommandMode::enter(guard);
        sleep(config.mode_settle).await;

        let gate = BusyGate::new(config.poll_interval);
        if !gate.await_idle(&*session, config.busy_wait).await {
            warn!("module stayed busy, aborting command");
            return Err(Hc15Error::ModuleBusy);
        }

        let wire = command.wire_bytes();
        let written = session.write_bytes(wire);
        if written != wire.len() {
            error!(written, expected = wire.len(), "command write came up short");
            return Err(Hc15Error::Serial {
                written,
                expected: wire.len(),
            });
        }
        debug!(command = %String::from_utf8_lossy(wire).trim_end(), "command written");
        Ok(session)
    }

    async fn read_matching_line(
        &self,
        session: &mut CommandMode<'_, T>,
        command: &Command,
    ) -> Result<String, Hc15Error> {
        let config = &self.shared.config;
        let deadline = Instant::now() + command.timeout();
        let mut candidate: Vec<u8> = Vec::new();

        loop {
            if Instant::now() >= deadline {
                if config.spill_unmatched && !candidate.is_empty() {
                    self.shared.buffer().push_bytes(&candidate);
                }
                warn!(
                    expected = command.expect().expected(),
                    "response deadline elapsed"
                );
                return Err(Hc15Error::ResponseTimeout(command.timeout()));
            }

            match session.read_byte() {
                Some(b'\r') | Some(b'\n') => {
                    if candidate.is_empty() {
                        continue;
                    }
                    let line = String::from_utf8_lossy(&candidate).into_owned();
                    candidate.clear();
                    if command.expect().matches(&line) {
                        debug!(line = %line, "response matched");
                        return Ok(line);
                    }
                    warn!(
                        line = %line,
                        expected = command.expect().expected(),
                        "unexpected response line"
                    );
                    if config.spill_unmatched {
                        self.shared.buffer().push_line(&line);
                    }
                    return Err(Hc15Error::UnexpectedResponse(line));
                }
                Some(byte) => candidate.push(byte),
                None => sleep(config.poll_interval).await,
            }
        }
    }

    async fn read_line_within(
        &self,
        session: &mut CommandMode<'_, T>,
        candidate: &mut Vec<u8>,
        deadline: Instant,
    ) -> Option<String> {
        while Instant::now() < deadline {
            match session.read_byte() {
                Some(b'\r') | Some(b'\n') => {
                    if candidate.is_empty() {
                        continue;
                    }
                    let bytes = std::mem::take(candidate);
                    return Some(String::from_utf8_lossy(&bytes).into_owned());
                }
                Some(byte) => candidate.push(byte),
                None => sleep(self.shared.config.poll_interval).await,
            }
        }
        None
    }
}
