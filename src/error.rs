//! Error type and status-code mapping for the storage core and the bridge.
//!
//! Every fallible operation in this crate returns [`Result<T>`]. The bridge
//! layer (`c_api`) flattens [`ErrorKind`] onto the stable `status` integers
//! documented in the ABI contract, and wraps the error message into a JSON
//! error blob.

use std::borrow::Cow;
use std::fmt;

/// Error category. Mirrors the ABI `status` codes one-to-one (see
/// [`ErrorKind::to_status`]); success is represented by `Result::Ok` rather
/// than a variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Unclassified internal failure.
    Internal,
    /// A lookup (verifier type, block) found nothing.
    NotFound,
    /// Null/unregistered handle, oversized payload, malformed JSON, wrong
    /// transaction mode, empty path.
    InvalidArgument,
    /// Allocation failure.
    OutOfMemory,
    /// Recognized but unimplemented operation.
    NotImplemented,
    /// Operation attempted on a transaction that is not active.
    TxnNotActive,
    /// Operation attempted on a transaction already past commit/abort.
    TxnAlreadyCommitted,
    /// Short read/write, fsync failure, or other OS-level I/O failure.
    Io,
    /// CRC mismatch, bad magic/version, or otherwise structurally invalid
    /// on-disk data.
    Corruption,
    /// Reserved for higher-level collaborators (optimistic-concurrency
    /// conflicts); unused by the core itself.
    Conflict,
    /// A registration or creation collided with an existing entry.
    AlreadyExists,
}

impl ErrorKind {
    /// Maps onto the stable ABI status code (§6 of the specification).
    pub const fn to_status(self) -> i32 {
        match self {
            ErrorKind::Internal => 1,
            ErrorKind::NotFound => 2,
            ErrorKind::InvalidArgument => 3,
            ErrorKind::OutOfMemory => 4,
            ErrorKind::NotImplemented => 5,
            ErrorKind::TxnNotActive => 6,
            ErrorKind::TxnAlreadyCommitted => 7,
            ErrorKind::Io => 8,
            ErrorKind::Corruption => 9,
            ErrorKind::Conflict => 10,
            ErrorKind::AlreadyExists => 11,
        }
    }
}

/// An error produced by the storage core or bridge.
///
/// Unlike a `no_std` core's `Error`, the message here is owned
/// (`Cow<'static, str>`) because the bridge routinely needs to render
/// dynamic detail — block ids, sizes, proof types — into the error blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FdbError {
    kind: ErrorKind,
    message: Cow<'static, str>,
}

impl FdbError {
    /// Creates an error from a `'static` message (no allocation).
    pub const fn new(kind: ErrorKind, message: &'static str) -> Self {
        Self {
            kind,
            message: Cow::Borrowed(message),
        }
    }

    /// Creates an error from an owned, dynamically built message.
    pub fn with_message(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: Cow::Owned(message.into()),
        }
    }

    /// The error category.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The stable ABI status code for this error.
    pub fn status(&self) -> i32 {
        self.kind.to_status()
    }
}

impl fmt::Display for FdbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for FdbError {}

impl From<std::io::Error> for FdbError {
    fn from(err: std::io::Error) -> Self {
        FdbError::with_message(ErrorKind::Io, err.to_string())
    }
}

impl From<serde_json::Error> for FdbError {
    fn from(err: serde_json::Error) -> Self {
        FdbError::with_message(ErrorKind::InvalidArgument, format!("malformed JSON: {err}"))
    }
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FdbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_abi_contract() {
        assert_eq!(ErrorKind::Internal.to_status(), 1);
        assert_eq!(ErrorKind::NotFound.to_status(), 2);
        assert_eq!(ErrorKind::InvalidArgument.to_status(), 3);
        assert_eq!(ErrorKind::OutOfMemory.to_status(), 4);
        assert_eq!(ErrorKind::NotImplemented.to_status(), 5);
        assert_eq!(ErrorKind::TxnNotActive.to_status(), 6);
        assert_eq!(ErrorKind::TxnAlreadyCommitted.to_status(), 7);
        assert_eq!(ErrorKind::Io.to_status(), 8);
        assert_eq!(ErrorKind::Corruption.to_status(), 9);
        assert_eq!(ErrorKind::Conflict.to_status(), 10);
        assert_eq!(ErrorKind::AlreadyExists.to_status(), 11);
    }

    #[test]
    fn display_includes_kind_and_message() {
        let err = FdbError::new(ErrorKind::NotFound, "no such verifier");
        assert_eq!(err.to_string(), "NotFound: no such verifier");
    }
}
