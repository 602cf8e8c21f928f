//! Scripted transport for exercising the façade without hardware.
//!
//! Expectations are consumed in order: each write must match the next
//! expected request, and the paired reply is then handed out by `read()`.
//! The test keeps a [`MockHandle`] to inspect what was sent after the
//! transport has been moved into a `HandControl`.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::Transport;

#[derive(Debug, Clone)]
struct Expectation {
    request: Vec<u8>,
    reply: Vec<u8>,
}

#[derive(Debug, Default)]
struct MockState {
    expectations: VecDeque<Expectation>,
    pending: VecDeque<u8>,
    sent: Vec<Vec<u8>>,
    dropped: bool,
}

#[derive(Debug, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

/// Shared view of a [`MockTransport`]'s state.
#[derive(Debug, Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

fn lock(state: &Arc<Mutex<MockState>>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// When `request` is written, answer with `reply`.
    pub fn expect(&mut self, request: &[u8], reply: &[u8]) -> &mut Self {
        lock(&self.state).expectations.push_back(Expectation {
            request: request.to_vec(),
            reply: reply.to_vec(),
        });
        self
    }

    pub fn handle(&self) -> MockHandle {
        MockHandle {
            state: Arc::clone(&self.state),
        }
    }
}

impl MockHandle {
    /// Every write, in order.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        lock(&self.state).sent.clone()
    }

    pub fn remaining_expectations(&self) -> usize {
        lock(&self.state).expectations.len()
    }

    /// Whether the transport has been dropped by its owner.
    pub fn dropped(&self) -> bool {
        lock(&self.state).dropped
    }
}

impl Transport for MockTransport {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        let mut state = lock(&self.state);
        state.sent.push(buf.to_vec());
        let Some(expectation) = state.expectations.pop_front() else {
            return Err(io::Error::other("no more expectations in mock transport"));
        };
        if buf != expectation.request.as_slice() {
            return Err(io::Error::other(format!(
                "unexpected write: expected {:02X?}, got {:02X?}",
                expectation.request, buf
            )));
        }
        state.pending.extend(expectation.reply);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = lock(&self.state);
        let n = state.pending.len().min(buf.len());
        for (slot, byte) in buf.iter_mut().zip(state.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn set_read_timeout(&mut self, _timeout: Duration) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for MockTransport {
    fn drop(&mut self) {
        lock(&self.state).dropped = true;
    }
}
