use std::fmt;
use std::io::{self, ErrorKind, Read};
use std::time::{Duration, Instant};

use crate::error::Result;

/// A timed, byte-oriented input such as a meter's serial link.
///
/// Both operations give up when the source times out and return whatever
/// was read so far. Callers decide whether a short result is an error.
pub trait ByteSource {
    /// Read until `pattern` has been consumed, the source times out, or
    /// `limit` bytes have been read, whichever happens first.
    ///
    /// The returned bytes end with `pattern` only if it was found.
    fn read_until(&mut self, pattern: &[u8], limit: usize) -> Result<Vec<u8>>;

    /// Read `n` bytes. A timeout yields fewer than `n` bytes.
    fn read_exact(&mut self, n: usize) -> Result<Vec<u8>>;
}

impl<T: ByteSource + ?Sized> ByteSource for &mut T {
    fn read_until(&mut self, pattern: &[u8], limit: usize) -> Result<Vec<u8>> {
        (**self).read_until(pattern, limit)
    }

    fn read_exact(&mut self, n: usize) -> Result<Vec<u8>> {
        (**self).read_exact(n)
    }
}

impl<T: ByteSource + ?Sized> ByteSource for Box<T> {
    fn read_until(&mut self, pattern: &[u8], limit: usize) -> Result<Vec<u8>> {
        (**self).read_until(pattern, limit)
    }

    fn read_exact(&mut self, n: usize) -> Result<Vec<u8>> {
        (**self).read_exact(n)
    }
}

/// Sets how long the next blocking read of a stream may wait.
pub type SetReadTimeout<R> = fn(&mut R, Duration) -> io::Result<()>;

/// Adapts any `Read` stream into a [`ByteSource`].
///
/// A read returning `Ok(0)`, `TimedOut` or `WouldBlock` is treated as the
/// source timing out. An optional overall timeout bounds each call even when
/// the stream keeps delivering bytes.
pub struct StreamSource<R> {
    inner: R,
    timeout: Option<Duration>,
    set_read_timeout: Option<SetReadTimeout<R>>,
}

impl<R: Read> StreamSource<R> {
    /// Wrap a stream without an overall per-call timeout.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            timeout: None,
            set_read_timeout: None,
        }
    }

    /// Wrap a stream and bound every call by `timeout`.
    ///
    /// The deadline is checked between reads, so a single blocking read of
    /// `inner` can still run past it. Use [`with_read_timeout`] for streams
    /// whose reads block.
    ///
    /// [`with_read_timeout`]: StreamSource::with_read_timeout
    pub fn with_timeout(inner: R, timeout: Duration) -> Self {
        Self {
            inner,
            timeout: Some(timeout),
            set_read_timeout: None,
        }
    }

    /// Wrap a blocking stream and bound every call by `timeout`.
    ///
    /// Before each read, `set_read_timeout` is handed the time left until the
    /// call's deadline, so the call as a whole never waits longer than
    /// `timeout`.
    pub fn with_read_timeout(inner: R, timeout: Duration, set_read_timeout: SetReadTimeout<R>) -> Self {
        Self {
            inner,
            timeout: Some(timeout),
            set_read_timeout: Some(set_read_timeout),
        }
    }

    /// Overall per-call timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Consume the source and return the inner stream.
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn deadline(&self) -> Option<Instant> {
        self.timeout.map(|t| Instant::now() + t)
    }

    /// Fill `buf` from the stream. Returns the number of bytes read before
    /// the first timeout.
    fn fill(&mut self, buf: &mut [u8], deadline: Option<Instant>) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            if let Some(deadline) = deadline {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }
                if let Some(set_read_timeout) = self.set_read_timeout {
                    set_read_timeout(&mut self.inner, remaining)?;
                }
            }
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if is_timeout(&err) => break,
                Err(err) => return Err(err.into()),
            }
        }
        Ok(filled)
    }
}

impl<R: fmt::Debug> fmt::Debug for StreamSource<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamSource")
            .field("inner", &self.inner)
            .field("timeout", &self.timeout)
            .field("set_read_timeout", &self.set_read_timeout.is_some())
            .finish()
    }
}

impl<R: Read> ByteSource for StreamSource<R> {
    fn read_until(&mut self, pattern: &[u8], limit: usize) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        if pattern.is_empty() {
            return Ok(out);
        }

        let deadline = self.deadline();
        let mut byte = [0u8; 1];
        // Byte at a time: bytes past the pattern belong to the next caller.
        while out.len() < limit {
            if self.fill(&mut byte, deadline)? == 0 {
                break;
            }
            out.push(byte[0]);
            if out.ends_with(pattern) {
                break;
            }
        }
        Ok(out)
    }

    fn read_exact(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut out = vec![0u8; n];
        let deadline = self.deadline();
        let read = self.fill(&mut out, deadline)?;
        out.truncate(read);
        Ok(out)
    }
}

fn is_timeout(err: &io::Error) -> bool {
    matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock)
}
