//! # Extension Traits
//!
//! Convenience methods for file entities.
//!
//! ## Overview
//!
//! [`EntityExt`] provides commonly-needed helpers built only from the
//! capability contract, so every entity (backends and decorators alike) gets
//! them for free.
//!
//! ## Available Methods
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`is_file`](EntityExt::is_file) | Exists and is not a directory |
//! | [`read_all`](EntityExt::read_all) | Read the whole content |
//! | [`read_string`](EntityExt::read_string) | Read the whole content as UTF-8 |
//! | [`write_all`](EntityExt::write_all) | Replace the content |
//! | [`child`](EntityExt::child) | Find a child by name |
//! | [`ancestors`](EntityExt::ancestors) | Parent chain up to the topmost ancestor |
//! | [`copy_stream_to`](EntityExt::copy_stream_to) | Stream the content into another entity |
//!
//! ## JSON Support (Feature-Gated)
//!
//! With the `serde` feature enabled, [`EntityExtJson`] adds `read_json` and
//! `write_json`.

use std::io::{Read, Write};

use crate::interrupt::copy_stream;
use crate::{BufferPool, EntityRef, FileEntity, FileError};

/// Extension methods for any file entity.
///
/// # Example
///
/// ```rust
/// use anyfile::{EntityExt, FileEntity, FileError};
///
/// fn describe(entity: &dyn FileEntity) -> Result<String, FileError> {
///     if entity.is_file() {
///         Ok(format!("{} bytes", entity.read_all()?.len()))
///     } else {
///         Ok(format!("{} children", entity.ls()?.len()))
///     }
/// }
/// ```
pub trait EntityExt: FileEntity {
    /// Returns `true` if the entity exists and is not a directory.
    fn is_file(&self) -> bool {
        self.exists() && !self.is_directory()
    }

    /// Read the whole content.
    fn read_all(&self) -> Result<Vec<u8>, FileError> {
        let mut data = Vec::new();
        self.input_stream()?
            .read_to_end(&mut data)
            .map_err(|e| FileError::from_io("read", self.location(), e))?;
        Ok(data)
    }

    /// Read the whole content as UTF-8.
    fn read_string(&self) -> Result<String, FileError> {
        String::from_utf8(self.read_all()?)
            .map_err(|e| FileError::protocol("read", self.location(), e.to_string()))
    }

    /// Replace the content with `data`.
    fn write_all(&self, data: &[u8]) -> Result<(), FileError> {
        let mut out = self.output_stream()?;
        out.write_all(data)
            .and_then(|()| out.flush())
            .map_err(|e| FileError::from_io("write", self.location(), e))
    }

    /// The child named `name`, found by listing.
    ///
    /// Fails with [`FileError::NotFound`] when no child has that name.
    fn child(&self, name: &str) -> Result<EntityRef, FileError> {
        self.ls()?
            .into_iter()
            .find(|child| child.location().file_name() == Some(name))
            .ok_or_else(|| FileError::not_found(self.location().child(name)))
    }

    /// Parent, grandparent, ... up to the topmost ancestor.
    fn ancestors(&self) -> Vec<EntityRef> {
        let mut chain = Vec::new();
        let mut next = self.parent();
        while let Some(parent) = next {
            next = parent.parent();
            chain.push(parent);
        }
        chain
    }

    /// Stream this entity's content into `destination`, replacing its
    /// content. Uses the global buffer pool and honours the calling
    /// thread's [`CancelToken`](crate::CancelToken).
    fn copy_stream_to(&self, destination: &dyn FileEntity) -> Result<u64, FileError> {
        let mut input = self.input_stream()?;
        let mut output = destination.output_stream()?;
        copy_stream(&mut input, &mut output, BufferPool::global())
            .map_err(|e| FileError::from_io("copy", self.location(), e))
    }
}

// Blanket implementation - any entity gets EntityExt for free
impl<T: FileEntity + ?Sized> EntityExt for T {}

#[cfg(feature = "serde")]
mod json {
    use super::*;
    use serde::{Serialize, de::DeserializeOwned};

    /// JSON helpers for any file entity.
    pub trait EntityExtJson: FileEntity {
        /// Read and deserialize the content.
        fn read_json<T: DeserializeOwned>(&self) -> Result<T, FileError> {
            let data = self.read_all()?;
            serde_json::from_slice(&data)
                .map_err(|e| FileError::protocol("read_json", self.location(), e.to_string()))
        }

        /// Serialize `value` and replace the content with it.
        fn write_json<T: Serialize>(&self, value: &T) -> Result<(), FileError> {
            let json = serde_json::to_vec_pretty(value)
                .map_err(|e| FileError::protocol("write_json", self.location(), e.to_string()))?;
            self.write_all(&json)
        }
    }

    impl<E: FileEntity + ?Sized> EntityExtJson for E {}
}

#[cfg(feature = "serde")]
pub use json::EntityExtJson;
