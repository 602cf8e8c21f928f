use std::time::Duration;

use crate::command::Reply;

/// Every reply ends with this byte.
pub const TERMINATOR: u8 = b'#';

/// Hand control serial line speed (8N1).
pub const BAUD_RATE: u32 = 9600;

/// Time allowed for a complete reply.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(3500);

/// Locate the terminator of a complete reply in `buf`.
///
/// Returns the index of the terminator, so the payload is `buf[..index]`.
/// Returns `None` while the reply is still incomplete.
///
/// Fixed-length binary replies can contain the terminator value as data, so
/// for those a `#` only counts once the full payload has arrived.
pub fn find_terminator(buf: &[u8], reply: Reply) -> Option<usize> {
    let skip = match reply {
        Reply::Empty | Reply::Ascii => 0,
        Reply::Binary(len) => len,
    };
    buf.iter()
        .skip(skip)
        .position(|&b| b == TERMINATOR)
        .map(|pos| pos + skip)
}
