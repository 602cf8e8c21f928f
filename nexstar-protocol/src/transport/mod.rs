use std::io;
use std::time::Duration;

#[cfg(any(test, feature = "mock"))]
pub mod mock;
#[cfg(feature = "serial")]
pub mod serial;

/// A blocking byte transport to a hand control.
///
/// The façade owns exactly one transport and drives it synchronously: one
/// write, then reads until the reply terminator or the deadline.
pub trait Transport: Send {
    /// Write all bytes to the transport.
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()>;

    /// Read available bytes into `buf`, returning how many were read.
    /// Must return `Ok(0)` or `Err(TimedOut)` when nothing arrives in time.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Set the read timeout for subsequent `read()` calls.
    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()>;

    /// Discard anything waiting in the input buffer.
    fn clear_input(&mut self) -> io::Result<()> {
        Ok(())
    }
}
