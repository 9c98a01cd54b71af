//! Content streams.

use crate::traits::EntityCore;
use crate::{FileError, InputStream, OutputStream, RandomAccessInput, RandomAccessOutput};

/// Content access.
///
/// Streams are "cold path" trait objects. Local streams honour
/// [`CancelToken`](crate::CancelToken) cancellation between chunks.
pub trait EntityContent: EntityCore {
    /// Open for sequential reading.
    ///
    /// # Errors
    ///
    /// - [`FileError::NotFound`] if the entity does not exist
    /// - [`FileError::Unsupported`] if the backend cannot read content
    fn input_stream(&self) -> Result<InputStream, FileError>;

    /// Open for writing, truncating existing content.
    ///
    /// # Errors
    ///
    /// [`FileError::Unsupported`] if the backend is read-only.
    fn output_stream(&self) -> Result<OutputStream, FileError>;

    /// Open for writing at the end of existing content.
    ///
    /// # Errors
    ///
    /// [`FileError::Unsupported`] if the backend cannot append.
    fn append_stream(&self) -> Result<OutputStream, FileError>;

    /// Open for seekable reading.
    ///
    /// # Errors
    ///
    /// [`FileError::Unsupported`] if the backend cannot seek.
    fn random_access_input(&self) -> Result<Box<dyn RandomAccessInput>, FileError>;

    /// Open for seekable writing.
    ///
    /// # Errors
    ///
    /// [`FileError::Unsupported`] if the backend cannot seek.
    fn random_access_output(&self) -> Result<Box<dyn RandomAccessOutput>, FileError>;
}
