//! Reusable I/O buffers.
//!
//! [`BufferPool`] is a small cache of large transient buffers keyed by
//! (kind, length). [`get`](BufferPool::get) hands out a pooled buffer on an
//! exact match and allocates otherwise; [`release`](BufferPool::release)
//! puts one back unless the same allocation is already pooled or the pool
//! would grow past its byte cap, in which case the buffer is simply dropped.
//!
//! All mutation goes through one mutex and a linear scan; the pool is meant
//! to hold a handful of buffers, not to be an allocator.
//!
//! ```rust
//! use anyfile::BufferPool;
//!
//! let pool = BufferPool::new(1 << 20);
//! let buf: Vec<u8> = pool.get(1024);
//! let ptr = buf.as_ptr();
//! pool.release(buf);
//! let again: Vec<u8> = pool.get(1024);
//! assert_eq!(again.as_ptr(), ptr);
//! ```

use std::sync::OnceLock;

use parking_lot::Mutex;
use tracing::trace;

/// Default byte cap of the global pool.
pub const DEFAULT_MAX_POOL_BYTES: usize = 4 * 1024 * 1024;

/// Buffer classes the pool distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// `Vec<u8>`.
    Bytes,
    /// `Vec<char>`.
    Chars,
}

/// A buffer type the pool can hold.
pub trait PoolableBuffer: Sized + Send + 'static {
    /// The class of this buffer type.
    const KIND: BufferKind;

    /// Allocate a zeroed buffer of exactly `len` elements.
    fn allocate(len: usize) -> Self;

    /// Length in elements.
    fn element_len(&self) -> usize;

    /// Size in bytes, counted against the pool cap.
    fn byte_size(&self) -> usize;

    /// Address of the allocation, used to detect duplicates.
    fn address(&self) -> usize;

    /// Wrap into the type-erased container.
    fn into_stored(self) -> StoredBuffer;

    /// Unwrap from the type-erased container.
    fn from_stored(stored: StoredBuffer) -> Option<Self>;
}

/// Type-erased pooled buffer.
#[derive(Debug)]
pub enum StoredBuffer {
    /// Byte buffer.
    Bytes(Vec<u8>),
    /// Char buffer.
    Chars(Vec<char>),
}

impl PoolableBuffer for Vec<u8> {
    const KIND: BufferKind = BufferKind::Bytes;

    fn allocate(len: usize) -> Self {
        vec![0; len]
    }

    fn element_len(&self) -> usize {
        self.len()
    }

    fn byte_size(&self) -> usize {
        self.len()
    }

    fn address(&self) -> usize {
        self.as_ptr() as usize
    }

    fn into_stored(self) -> StoredBuffer {
        StoredBuffer::Bytes(self)
    }

    fn from_stored(stored: StoredBuffer) -> Option<Self> {
        match stored {
            StoredBuffer::Bytes(buf) => Some(buf),
            StoredBuffer::Chars(_) => None,
        }
    }
}

impl PoolableBuffer for Vec<char> {
    const KIND: BufferKind = BufferKind::Chars;

    fn allocate(len: usize) -> Self {
        vec!['\0'; len]
    }

    fn element_len(&self) -> usize {
        self.len()
    }

    fn byte_size(&self) -> usize {
        self.len() * std::mem::size_of::<char>()
    }

    fn address(&self) -> usize {
        self.as_ptr() as usize
    }

    fn into_stored(self) -> StoredBuffer {
        StoredBuffer::Chars(self)
    }

    fn from_stored(stored: StoredBuffer) -> Option<Self> {
        match stored {
            StoredBuffer::Chars(buf) => Some(buf),
            StoredBuffer::Bytes(_) => None,
        }
    }
}

struct BufferContainer {
    kind: BufferKind,
    len: usize,
    bytes: usize,
    address: usize,
    buffer: StoredBuffer,
}

struct PoolState {
    containers: Vec<BufferContainer>,
    pooled_bytes: usize,
    max_bytes: usize,
}

/// Size- and class-keyed buffer cache.
pub struct BufferPool {
    state: Mutex<PoolState>,
}

static GLOBAL_POOL: OnceLock<BufferPool> = OnceLock::new();

impl BufferPool {
    /// Create a pool holding at most `max_bytes` of buffers.
    pub fn new(max_bytes: usize) -> Self {
        Self {
            state: Mutex::new(PoolState {
                containers: Vec::new(),
                pooled_bytes: 0,
                max_bytes,
            }),
        }
    }

    /// The process-wide pool, created with [`DEFAULT_MAX_POOL_BYTES`] on first
    /// use unless [`configure_global`](Self::configure_global) ran first.
    pub fn global() -> &'static BufferPool {
        GLOBAL_POOL.get_or_init(|| BufferPool::new(DEFAULT_MAX_POOL_BYTES))
    }

    /// Set the global pool's byte cap. Returns `false` if the global pool
    /// already existed, in which case only the cap is updated.
    pub fn configure_global(max_bytes: usize) -> bool {
        let mut created = false;
        let pool = GLOBAL_POOL.get_or_init(|| {
            created = true;
            BufferPool::new(max_bytes)
        });
        if !created {
            pool.set_max_bytes(max_bytes);
        }
        created
    }

    /// Change the byte cap. Already pooled buffers are kept.
    pub fn set_max_bytes(&self, max_bytes: usize) {
        self.state.lock().max_bytes = max_bytes;
    }

    /// A buffer of exactly `len` elements, pooled if one matches.
    pub fn get<B: PoolableBuffer>(&self, len: usize) -> B {
        {
            let mut state = self.state.lock();
            let found = state
                .containers
                .iter()
                .position(|c| c.kind == B::KIND && c.len == len);
            if let Some(idx) = found {
                let container = state.containers.swap_remove(idx);
                state.pooled_bytes -= container.bytes;
                if let Some(buffer) = B::from_stored(container.buffer) {
                    trace!(kind = ?B::KIND, len, "buffer reused");
                    return buffer;
                }
            }
        }
        trace!(kind = ?B::KIND, len, "buffer allocated");
        B::allocate(len)
    }

    /// Shorthand for a byte buffer.
    pub fn get_bytes(&self, len: usize) -> Vec<u8> {
        self.get(len)
    }

    /// Shorthand for a char buffer.
    pub fn get_chars(&self, len: usize) -> Vec<char> {
        self.get(len)
    }

    /// Return a buffer to the pool.
    ///
    /// Silently dropped when the same allocation is already pooled or the
    /// cap would be exceeded. Returns whether the buffer was pooled.
    pub fn release<B: PoolableBuffer>(&self, buffer: B) -> bool {
        let len = buffer.element_len();
        let bytes = buffer.byte_size();
        let address = buffer.address();
        let mut state = self.state.lock();
        if state
            .containers
            .iter()
            .any(|c| c.kind == B::KIND && c.address == address && bytes > 0)
        {
            return false;
        }
        if state.pooled_bytes + bytes > state.max_bytes {
            trace!(kind = ?B::KIND, len, "pool full, buffer dropped");
            return false;
        }
        state.pooled_bytes += bytes;
        state.containers.push(BufferContainer {
            kind: B::KIND,
            len,
            bytes,
            address,
            buffer: buffer.into_stored(),
        });
        true
    }

    /// Combined size of pooled buffers.
    pub fn pooled_bytes(&self) -> usize {
        self.state.lock().pooled_bytes
    }

    /// Number of pooled buffers.
    pub fn len(&self) -> usize {
        self.state.lock().containers.len()
    }

    /// Returns `true` if nothing is pooled.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every pooled buffer.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.containers.clear();
        state.pooled_bytes = 0;
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_POOL_BYTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuses_same_instance() {
        let pool = BufferPool::new(1 << 20);
        let buf: Vec<u8> = pool.get(1024);
        let ptr = buf.as_ptr();
        assert!(pool.release(buf));
        let again: Vec<u8> = pool.get(1024);
        assert_eq!(again.as_ptr(), ptr);
        assert_eq!(again.len(), 1024);
        assert!(pool.is_empty());
    }

    #[test]
    fn different_size_is_fresh() {
        let pool = BufferPool::new(1 << 20);
        let buf: Vec<u8> = pool.get(1024);
        pool.release(buf);
        let other: Vec<u8> = pool.get(2048);
        assert_eq!(other.len(), 2048);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn different_kind_is_fresh() {
        let pool = BufferPool::new(1 << 20);
        pool.release(pool.get_bytes(256));
        let chars = pool.get_chars(256);
        assert_eq!(chars.len(), 256);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn cap_rejects_release() {
        let pool = BufferPool::new(1500);
        let a = pool.get_bytes(1024);
        let b = pool.get_bytes(1024);
        let b_ptr = b.as_ptr();
        assert!(pool.release(a));
        assert!(!pool.release(b));
        assert_eq!(pool.pooled_bytes(), 1024);
        // the rejected buffer was not pooled; the pooled one comes back
        let c = pool.get_bytes(1024);
        assert_ne!(c.as_ptr(), b_ptr);
    }

    #[test]
    fn char_buffers_count_four_bytes_each() {
        let pool = BufferPool::new(1 << 20);
        pool.release(pool.get_chars(100));
        assert_eq!(pool.pooled_bytes(), 400);
    }

    #[test]
    fn clear_empties_pool() {
        let pool = BufferPool::new(1 << 20);
        pool.release(pool.get_bytes(10));
        pool.release(pool.get_bytes(20));
        assert_eq!(pool.len(), 2);
        pool.clear();
        assert!(pool.is_empty());
        assert_eq!(pool.pooled_bytes(), 0);
    }

    #[test]
    fn global_pool_is_shared() {
        let a = BufferPool::global() as *const BufferPool;
        let b = BufferPool::global() as *const BufferPool;
        assert_eq!(a, b);
    }
}
