//! Scripted transport for tests
//!
//! Shared-state mock: clones hand out the same rx/tx buffers and control
//! lines, so a test keeps one handle while the driver owns another.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use super::Transport;

#[derive(Debug, Default)]
struct MockState {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    replies: VecDeque<Vec<u8>>,
    busy: bool,
    command_mode: bool,
    mode_changes: Vec<bool>,
}

/// In-memory transport with scripted input and captured output
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Idle mock with empty buffers
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make bytes immediately readable
    pub fn push_rx(&self, bytes: &[u8]) {
        self.state().rx.extend(bytes.iter().copied());
    }

    /// Queue a reply that becomes readable after the next write
    ///
    /// Replies release one per write call, in the order queued.
    pub fn respond_with(&self, reply: &[u8]) {
        self.state().replies.push_back(reply.to_vec());
    }

    /// Everything written so far
    pub fn written(&self) -> Vec<u8> {
        self.state().tx.clone()
    }

    /// Drain and return everything written so far
    pub fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut self.state().tx)
    }

    /// Drive the busy-sense line; `true` reads as module busy
    pub fn set_busy(&self, busy: bool) {
        self.state().busy = busy;
    }

    /// Current mode-select state; `true` means command mode asserted
    pub fn command_mode(&self) -> bool {
        self.state().command_mode
    }

    /// Every mode-select transition observed, in order
    pub fn mode_changes(&self) -> Vec<bool> {
        self.state().mode_changes.clone()
    }
}

impl Transport for MockTransport {
    fn write_bytes(&mut self, bytes: &[u8]) -> usize {
        let mut state = self.state();
        state.tx.extend_from_slice(bytes);
        if let Some(reply) = state.replies.pop_front() {
            state.rx.extend(reply);
        }
        bytes.len()
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.state().rx.pop_front()
    }

    fn bytes_available(&self) -> usize {
        self.state().rx.len()
    }

    fn set_command_mode(&mut self, enabled: bool) {
        let mut state = self.state();
        state.command_mode = enabled;
        state.mode_changes.push(enabled);
    }

    fn is_busy(&self) -> bool {
        self.state().busy
    }
}
