//! Error Types for Ingestion and Storage Failures
//!
//! ## Error Categories
//!
//! Errors in the core crate fall into two groups with very different
//! operational consequences:
//!
//! ### Payload Problems (`ParseError`)
//! - `MissingKey`: a required field never appeared in the payload
//! - `MalformedPair`: a segment had no `": "` separator
//! - `InvalidNumber`: a numeric field's leading token is not a finite number
//! - `InvalidValue`: the rain flag or valve state is outside its vocabulary
//! - `InvalidEncoding`: the payload bytes are not UTF-8
//!
//! A parse error is a property of one message. The ingestion loop logs it,
//! drops the message and keeps going; the store is never touched.
//!
//! ### Medium Problems (`StorageError`)
//! - `Io`: the backing file could not be opened, written or synced
//! - `Encode`: the record could not be serialized
//! - `Unavailable`: the store refused the write (e.g. marked offline)
//!
//! A storage error loses the message it was writing. Delivery is
//! at-most-once; nothing is queued for later.
//!
//! ## Error Handling Strategy
//!
//! ```rust
//! use tirair_core::{parse_payload, ParseError};
//!
//! match parse_payload("Temperature: 21 C, Humidity: 40 %") {
//!     Ok(reading) => { /* stamp and store */ }
//!     Err(ParseError::MissingKey { key }) => {
//!         // Sender firmware dropped a field
//!         assert_eq!(key, "raining");
//!     }
//!     Err(_) => { /* log and drop */ }
//! }
//! ```

use thiserror::Error;

/// Result type for payload parsing
pub type ParseResult<T> = Result<T, ParseError>;

/// Result type for record store operations
pub type StoreResult<T> = Result<T, StorageError>;

/// Reasons a bus payload could not be normalized into a reading
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A required key was absent
    #[error("missing required key `{key}`")]
    MissingKey {
        /// Lower-cased name of the missing key
        key: &'static str,
    },

    /// A comma-separated segment had no `": "` separator
    #[error("malformed pair `{pair}`: expected `Key: Value`")]
    MalformedPair {
        /// The offending segment, verbatim
        pair: String,
    },

    /// Numeric field whose leading token is not a finite number
    #[error("field `{field}` is not a number: `{value}`")]
    InvalidNumber {
        /// Field that failed numeric parsing
        field: &'static str,
        /// Raw value as received
        value: String,
    },

    /// Flag or enum field outside its accepted vocabulary
    #[error("field `{field}` has unrecognized value `{value}`")]
    InvalidValue {
        /// Field that failed
        field: &'static str,
        /// Raw value as received
        value: String,
    },

    /// Payload bytes were not valid UTF-8
    #[error("payload is not valid UTF-8")]
    InvalidEncoding,
}

impl ParseError {
    /// Name of the field this error is about, if any
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::MissingKey { key } => Some(key),
            Self::InvalidNumber { field, .. } | Self::InvalidValue { field, .. } => Some(field),
            Self::MalformedPair { .. } | Self::InvalidEncoding => None,
        }
    }
}

/// Failures of the durable record store
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backing medium could not be read or written
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Record could not be encoded for persistence
    #[error("record encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    /// Store is not accepting writes
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
