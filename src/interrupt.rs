//! Cancellable blocking I/O.
//!
//! Threads cannot be interrupted in Rust, so long transfers are cancelled
//! cooperatively instead. Every thread has a current [`CancelToken`]; streams
//! opened on that thread capture it, and [`InterruptibleReader`] /
//! [`InterruptibleWriter`] check it before each bounded chunk. Cancelling the
//! token from any other thread stops the transfer within one chunk.
//!
//! A cancelled transfer fails with an [`io::Error`] of kind
//! [`io::ErrorKind::Other`] carrying "transfer cancelled". The kind is not
//! `Interrupted` because `std::io` helpers silently retry those.
//!
//! ```rust
//! use std::io::Read;
//! use anyfile::{CancelToken, InterruptibleReader};
//!
//! let token = CancelToken::new();
//! let mut reader = token.scope(|| InterruptibleReader::new(&b"abc"[..]));
//! token.cancel();
//! let mut buf = [0u8; 3];
//! assert!(reader.read(&mut buf).is_err());
//! ```

use std::cell::RefCell;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use crate::BufferPool;

/// Largest chunk read or written between two cancellation checks.
pub const CHUNK_SIZE: usize = 64 * 1024;

const CANCELLED_MESSAGE: &str = "transfer cancelled";

thread_local! {
    static CURRENT: RefCell<CancelToken> = RefCell::new(CancelToken::new());
}

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// A fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// The calling thread's current token.
    pub fn current() -> CancelToken {
        CURRENT.with(|current| current.borrow().clone())
    }

    /// Run `f` with `self` installed as the calling thread's current token,
    /// restoring the previous one afterwards.
    pub fn scope<R>(&self, f: impl FnOnce() -> R) -> R {
        struct Restore(Option<CancelToken>);

        impl Drop for Restore {
            fn drop(&mut self) {
                if let Some(previous) = self.0.take() {
                    CURRENT.with(|current| *current.borrow_mut() = previous);
                }
            }
        }

        let previous = CURRENT.with(|current| current.replace(self.clone()));
        let _restore = Restore(Some(previous));
        f()
    }

    /// Request cancellation. Visible to every clone.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Clear a previous cancellation so the token can be reused.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// `Err` once cancelled.
    pub fn check(&self) -> io::Result<()> {
        if self.is_cancelled() {
            Err(cancelled_error())
        } else {
            Ok(())
        }
    }
}

/// The error a cancelled transfer fails with.
pub fn cancelled_error() -> io::Error {
    io::Error::other(CANCELLED_MESSAGE)
}

/// Returns `true` if `error` came from a cancelled transfer.
pub fn is_cancelled_error(error: &io::Error) -> bool {
    error.kind() == io::ErrorKind::Other && error.to_string() == CANCELLED_MESSAGE
}

/// Reader that stops once its token is cancelled.
#[derive(Debug)]
pub struct InterruptibleReader<R> {
    inner: R,
    token: CancelToken,
}

impl<R> InterruptibleReader<R> {
    /// Wrap `inner`, binding it to the calling thread's current token.
    pub fn new(inner: R) -> Self {
        Self::with_token(inner, CancelToken::current())
    }

    /// Wrap `inner` with an explicit token.
    pub fn with_token(inner: R, token: CancelToken) -> Self {
        Self { inner, token }
    }

    /// The bound token.
    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Borrow the inner reader.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Unwrap the inner reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for InterruptibleReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.token.check()?;
        let len = buf.len().min(CHUNK_SIZE);
        self.inner.read(&mut buf[..len])
    }
}

impl<R: Seek> Seek for InterruptibleReader<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.token.check()?;
        self.inner.seek(pos)
    }
}

/// Writer that stops once its token is cancelled.
#[derive(Debug)]
pub struct InterruptibleWriter<W> {
    inner: W,
    token: CancelToken,
}

impl<W> InterruptibleWriter<W> {
    /// Wrap `inner`, binding it to the calling thread's current token.
    pub fn new(inner: W) -> Self {
        Self::with_token(inner, CancelToken::current())
    }

    /// Wrap `inner` with an explicit token.
    pub fn with_token(inner: W, token: CancelToken) -> Self {
        Self { inner, token }
    }

    /// The bound token.
    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Borrow the inner writer.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Mutably borrow the inner writer.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }
}

impl<W: Write> Write for InterruptibleWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.token.check()?;
        let len = buf.len().min(CHUNK_SIZE);
        self.inner.write(&buf[..len])
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: Seek> Seek for InterruptibleWriter<W> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.token.check()?;
        self.inner.seek(pos)
    }
}

/// Copy `reader` into `writer` through a pooled buffer, checking the calling
/// thread's token before every chunk. Returns the number of bytes copied.
pub fn copy_stream(reader: &mut dyn Read, writer: &mut dyn Write, pool: &BufferPool) -> io::Result<u64> {
    let token = CancelToken::current();
    let mut buffer = pool.get_bytes(CHUNK_SIZE);
    let result = copy_chunks(reader, writer, &mut buffer, &token);
    pool.release(buffer);
    if let Err(error) = &result {
        if is_cancelled_error(error) {
            debug!("stream copy cancelled");
        }
    }
    result
}

fn copy_chunks(
    reader: &mut dyn Read,
    writer: &mut dyn Write,
    buffer: &mut [u8],
    token: &CancelToken,
) -> io::Result<u64> {
    let mut total = 0u64;
    loop {
        token.check()?;
        let read = match reader.read(buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(error),
        };
        writer.write_all(&buffer[..read])?;
        total += read as u64;
    }
    writer.flush()?;
    Ok(total)
}
