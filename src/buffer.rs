//! Fixed-capacity byte buffer.
//!
//! This module provides the [`Buffer`] type, a byte container whose storage is
//! allocated once and never grows. Appends truncate at capacity, reads consume
//! from an offset, and a successful [`Buffer::write_to`] rewinds the buffer so it
//! is immediately reusable.

use std::fmt;
use std::io::{self, Read, Write};

use crate::error::TransferError;

/// A fixed-capacity, reusable byte buffer.
///
/// A buffer tracks a logical length `L` (bytes written so far) and a read
/// offset `O` (bytes already consumed), with `0 <= O <= L <= capacity`.
/// Writes append at `L` and stop at capacity; reads consume from `O`.
///
/// Buffers are usually checked out of a [`BufferPool`](crate::BufferPool), but
/// can also be created directly with [`Buffer::new`] and owned by the caller.
///
/// # Example
///
/// ```rust
/// use ruapc_pools::Buffer;
///
/// let mut buffer = Buffer::new(4);
/// assert_eq!(buffer.append(b"hello"), 4); // truncated at capacity
/// assert_eq!(buffer.as_slice(), b"hell");
///
/// let mut sink = Vec::new();
/// buffer.write_to(&mut sink).unwrap();
/// assert_eq!(sink, b"hell");
/// assert!(buffer.is_empty()); // rewound after a complete write
/// ```
pub struct Buffer {
    /// Backing storage, allocated once.
    data: Box<[u8]>,

    /// Logical length: bytes written so far.
    len: usize,

    /// Read offset: bytes already consumed.
    off: usize,
}

impl Buffer {
    /// Creates an empty buffer with exactly `capacity` bytes of storage.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity].into_boxed_slice(),
            len: 0,
            off: 0,
        }
    }

    /// Returns the logical length `L` in bytes.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if nothing has been written since the last reset.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the fixed capacity `C` in bytes.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Returns how many more bytes can be appended (`C - L`).
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.len
    }

    /// Returns the unread bytes (`O..L`).
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[self.off..self.len]
    }

    /// Rewinds the buffer: `O = 0`, `L = 0`.
    ///
    /// Storage is not zeroed; prior contents must not be relied upon.
    #[inline]
    pub const fn reset(&mut self) {
        self.off = 0;
        self.len = 0;
    }

    /// Appends as many bytes of `src` as fit and returns how many were copied.
    ///
    /// Never grows the storage. A return value smaller than `src.len()` means
    /// the input was truncated at capacity; this is not an error.
    pub fn append(&mut self, src: &[u8]) -> usize {
        let n = src.len().min(self.remaining());
        self.data[self.len..self.len + n].copy_from_slice(&src[..n]);
        self.len += n;
        n
    }

    /// Appends the UTF-8 bytes of `s`, truncating at capacity.
    ///
    /// Truncation may split a multi-byte character.
    #[inline]
    pub fn write_str(&mut self, s: &str) -> usize {
        self.append(s.as_bytes())
    }

    /// Reads from `reader` into the free space until the reader reports end of
    /// data or the buffer is full.
    ///
    /// End of data is success. Once the buffer is full no further read is
    /// attempted, so a reader with more data is left positioned after the
    /// bytes that fit.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Io`] if the reader fails. Bytes read before the
    /// failure stay in the buffer and are counted in the error.
    pub fn read_from<R: Read + ?Sized>(&mut self, reader: &mut R) -> Result<usize, TransferError> {
        let mut total = 0;
        while self.len < self.data.len() {
            match reader.read(&mut self.data[self.len..]) {
                Ok(0) => break,
                Ok(n) => {
                    self.len += n;
                    total += n;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(source) => {
                    return Err(TransferError::Io {
                        transferred: total,
                        source,
                    });
                }
            }
        }
        Ok(total)
    }

    /// Writes every unread byte to `writer`.
    ///
    /// After a complete write the buffer is rewound (`O = L = 0`). After a
    /// failure the offset is advanced past whatever the writer accepted, so
    /// the remaining bytes can be retried.
    ///
    /// # Errors
    ///
    /// - [`TransferError::ShortWrite`] if the writer stops accepting bytes
    ///   (returns `Ok(0)`) before everything was written.
    /// - [`TransferError::Io`] if the writer returns an error.
    pub fn write_to<W: Write + ?Sized>(&mut self, writer: &mut W) -> Result<usize, TransferError> {
        let mut total = 0;
        while self.off < self.len {
            match writer.write(&self.data[self.off..self.len]) {
                Ok(0) => return Err(TransferError::ShortWrite { transferred: total }),
                Ok(n) => {
                    self.off += n;
                    total += n;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(source) => {
                    return Err(TransferError::Io {
                        transferred: total,
                        source,
                    });
                }
            }
        }
        self.reset();
        Ok(total)
    }
}

impl Read for Buffer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.len - self.off);
        buf[..n].copy_from_slice(&self.data[self.off..self.off + n]);
        self.off += n;
        Ok(n)
    }
}

impl Write for Buffer {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.append(buf))
    }

    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl AsRef<[u8]> for Buffer {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("len", &self.len)
            .field("off", &self.off)
            .field("capacity", &self.capacity())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fills the whole first read, then returns a short tail and end of data.
    struct SlowReader {
        calls: usize,
    }

    impl Read for SlowReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.calls += 1;
            if self.calls == 1 {
                buf.fill(b'F');
                Ok(buf.len())
            } else {
                let n = buf.len().min(4);
                buf[..n].copy_from_slice(&b"asdf"[..n]);
                Ok(n)
            }
        }
    }

    /// Accepts at most `limit` bytes in total, then returns `Ok(0)`.
    struct LimitedSink {
        data: Vec<u8>,
        limit: usize,
    }

    impl Write for LimitedSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = buf.len().min(self.limit - self.data.len());
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
        }
    }

    #[test]
    fn test_append_truncates_at_capacity() {
        let mut buffer = Buffer::new(5);
        assert_eq!(buffer.append(b"abc"), 3);
        assert_eq!(buffer.append(b"defg"), 2);
        assert_eq!(buffer.append(b"h"), 0);
        assert_eq!(buffer.len(), 5);
        assert_eq!(buffer.capacity(), 5);
        assert_eq!(buffer.remaining(), 0);
        assert_eq!(buffer.as_slice(), b"abcde");
    }

    #[test]
    fn test_write_str() {
        let mut buffer = Buffer::new(16);
        assert_eq!(buffer.write_str("testing"), 7);
        assert_eq!(buffer.as_slice(), b"testing");
    }

    #[test]
    fn test_fill_to_capacity_from_reader() {
        let mut buffer = Buffer::new(512);
        let src = vec![b'F'; 513];

        let n = buffer.read_from(&mut src.as_slice()).unwrap();
        assert_eq!(n, 512);
        assert_eq!(buffer.len(), 512);
        assert_eq!(buffer.capacity(), 512);
    }

    #[test]
    fn test_read_from_stops_when_full() {
        let mut buffer = Buffer::new(512);
        let mut reader = SlowReader { calls: 0 };

        let n = buffer.read_from(&mut reader).unwrap();
        assert_eq!(reader.calls, 1);
        assert_eq!(n, 512);
        assert_eq!(buffer.len(), 512);
    }

    #[test]
    fn test_read_from_eof_is_success() {
        let mut buffer = Buffer::new(64);
        let n = buffer.read_from(&mut &b"short"[..]).unwrap();
        assert_eq!(n, 5);
        assert_eq!(buffer.as_slice(), b"short");
    }

    #[test]
    fn test_read_from_error_keeps_bytes() {
        let mut buffer = Buffer::new(64);
        let mut reader = (&b"kept"[..]).chain(FailingReader);

        let err = buffer.read_from(&mut reader).unwrap_err();
        assert_eq!(err.transferred(), 4);
        assert!(matches!(err, TransferError::Io { .. }));
        assert_eq!(buffer.as_slice(), b"kept");
    }

    #[test]
    fn test_write_to_resets_on_success() {
        let mut buffer = Buffer::new(32);
        buffer.append(b"payload");

        let mut sink = Vec::new();
        assert_eq!(buffer.write_to(&mut sink).unwrap(), 7);
        assert_eq!(sink, b"payload");
        assert_eq!(buffer.len(), 0);
        assert!(buffer.as_slice().is_empty());

        // Reusable straight away.
        buffer.append(b"again");
        assert_eq!(buffer.as_slice(), b"again");
    }

    #[test]
    fn test_write_to_short_write() {
        let mut buffer = Buffer::new(32);
        buffer.append(b"0123456789");

        let mut sink = LimitedSink {
            data: Vec::new(),
            limit: 4,
        };
        let err = buffer.write_to(&mut sink).unwrap_err();
        assert!(matches!(err, TransferError::ShortWrite { transferred: 4 }));
        assert_eq!(sink.data, b"0123");
        assert_eq!(buffer.as_slice(), b"456789");

        sink.limit = 10;
        assert_eq!(buffer.write_to(&mut sink).unwrap(), 6);
        assert_eq!(sink.data, b"0123456789");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut buffer = Buffer::new(8);
        buffer.reset();
        assert_eq!(buffer.len(), 0);
        buffer.append(b"x");
        buffer.reset();
        buffer.reset();
        assert_eq!(buffer.len(), 0);
        assert_eq!(buffer.remaining(), 8);
    }

    #[test]
    fn test_io_traits() {
        let mut buffer = Buffer::new(6);
        buffer.write_all(b"abcdef").unwrap();
        assert_eq!(
            buffer.write_all(b"g").unwrap_err().kind(),
            io::ErrorKind::WriteZero
        );

        let mut head = [0u8; 2];
        buffer.read_exact(&mut head).unwrap();
        assert_eq!(&head, b"ab");
        assert_eq!(buffer.as_slice(), b"cdef");
        assert_eq!(buffer.len(), 6);

        let mut rest = Vec::new();
        buffer.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"cdef");
    }

    #[test]
    fn test_buffer_debug() {
        let buffer = Buffer::new(16);
        let debug_str = format!("{buffer:?}");
        assert!(debug_str.contains("Buffer"));
        assert!(debug_str.contains("capacity"));
    }
}
