//! Error types for file-entity operations.

use crate::{FileOperation, Realm};

/// File-entity error type.
///
/// Every variant carries the context a caller needs to react: the location
/// for path-level failures, the [`Realm`] for authentication failures (so the
/// caller can re-prompt for credentials and retry), and the
/// [`FileOperation`] for unsupported operations.
///
/// Backend SDK errors are translated into these variants at the entity or
/// connection-handler boundary; nothing backend-specific leaks out.
///
/// # Examples
///
/// ```rust
/// use anyfile::{FileError, FileOperation};
///
/// let err = FileError::unsupported(FileOperation::AppendFile);
/// assert_eq!(err.to_string(), "operation not supported: append_file");
/// assert!(err.is_unsupported());
/// ```
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    /// The entity does not exist.
    #[error("not found: {location}")]
    NotFound {
        /// The location that was not found.
        location: String,
    },

    /// The entity already exists when it shouldn't.
    #[error("already exists: {location}")]
    AlreadyExists {
        /// The location that already exists.
        location: String,
    },

    /// Expected a directory but found something else.
    #[error("not a directory: {location}")]
    NotADirectory {
        /// The location that is not a directory.
        location: String,
    },

    /// The backend refused access.
    #[error("access denied: {location}")]
    AccessDenied {
        /// The location where access was denied.
        location: String,
    },

    /// Credentials are missing or were rejected.
    ///
    /// Always user-recoverable: re-prompt for credentials for `realm` and
    /// retry the operation.
    #[error("authentication required for {realm}")]
    AuthenticationRequired {
        /// The realm needing credentials.
        realm: Realm,
    },

    /// The backend does not implement the operation.
    ///
    /// Reaching a caller means the caller skipped
    /// [`supports`](crate::EntityCore::supports).
    #[error("operation not supported: {operation}")]
    Unsupported {
        /// The unsupported operation.
        operation: FileOperation,
    },

    /// Source and destination live on different volumes.
    #[error("cannot move {from} to {to}: different volumes")]
    VolumeMismatch {
        /// The source location.
        from: String,
        /// The destination location.
        to: String,
    },

    /// A string could not be parsed as a location.
    #[error("invalid location {input:?}: {reason}")]
    InvalidLocation {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Transport or protocol failure.
    #[error("{operation} failed for {location}: {source}")]
    Io {
        /// The operation that failed.
        operation: &'static str,
        /// The location involved.
        location: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl FileError {
    /// Shorthand for [`FileError::Unsupported`].
    pub fn unsupported(operation: FileOperation) -> Self {
        FileError::Unsupported { operation }
    }

    /// Shorthand for [`FileError::NotFound`].
    pub fn not_found(location: impl ToString) -> Self {
        FileError::NotFound {
            location: location.to_string(),
        }
    }

    /// Shorthand for [`FileError::AccessDenied`].
    pub fn access_denied(location: impl ToString) -> Self {
        FileError::AccessDenied {
            location: location.to_string(),
        }
    }

    /// Wrap an I/O error with operation and location context.
    pub fn io(operation: &'static str, location: impl ToString, source: std::io::Error) -> Self {
        FileError::Io {
            operation,
            location: location.to_string(),
            source,
        }
    }

    /// A protocol-level failure (malformed response, unparseable listing).
    pub fn protocol(
        operation: &'static str,
        location: impl ToString,
        message: impl Into<String>,
    ) -> Self {
        FileError::Io {
            operation,
            location: location.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, message.into()),
        }
    }

    /// Map a `std::io::Error` onto the taxonomy, keeping the location.
    pub fn from_io(operation: &'static str, location: impl ToString, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => FileError::not_found(location),
            std::io::ErrorKind::PermissionDenied => FileError::access_denied(location),
            std::io::ErrorKind::AlreadyExists => FileError::AlreadyExists {
                location: location.to_string(),
            },
            _ => FileError::io(operation, location, error),
        }
    }

    /// Returns `true` if re-prompting the user can fix this error.
    pub fn is_user_recoverable(&self) -> bool {
        matches!(self, FileError::AuthenticationRequired { .. })
    }

    /// Returns `true` for [`FileError::Unsupported`].
    pub fn is_unsupported(&self) -> bool {
        matches!(self, FileError::Unsupported { .. })
    }

    /// The realm to re-authenticate against, for auth errors.
    pub fn realm(&self) -> Option<&Realm> {
        match self {
            FileError::AuthenticationRequired { realm } => Some(realm),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FileError {
    fn from(error: std::io::Error) -> Self {
        FileError::from_io("io", "", error)
    }
}
