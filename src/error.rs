//! Error types for `gdtrans`

use thiserror::Error;

/// The error type for `gdtrans` operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error from file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ==================== Container Errors ====================
    /// A read ran past the end of the available bytes.
    #[error("unexpected end of input")]
    TruncatedInput,

    /// The file starts with neither the plain nor the compressed magic,
    /// and does not look like a headless container either.
    #[error("invalid resource magic: expected RSRC or RSCC, found {0:?}")]
    InvalidMagic([u8; 4]),

    /// A name reference points outside the string intern table.
    #[error("invalid string table index: {0}")]
    InvalidStringIndex(u32),

    /// No internal resource is eligible as the main resource.
    #[error("container has no main resource")]
    MissingMainResource,

    // ==================== Compression Errors ====================
    /// The compression mode is unknown, has no open implementation, or
    /// the required codec was not compiled in.
    #[error("unsupported compression mode: {mode}")]
    UnsupportedCompressionMode {
        /// The mode code from the compressed-container header.
        mode: u32,
    },

    /// A compressed block failed to decompress, or the output did not
    /// match the declared total size.
    #[error("decompression failed: {message}")]
    DecompressionFailed {
        /// Description of the failure.
        message: String,
    },

    /// A bucket-element string failed to decompress.
    #[error("string decompression failed: {0}")]
    StringDecompression(String),

    // ==================== Translation Table Errors ====================
    /// The main resource is not a recognized localization class.
    #[error("{class_name} is not a translation resource class")]
    UnsupportedClass {
        /// The class name found in the container.
        class_name: String,
    },

    /// A required translation-table property is absent or has the wrong type.
    #[error("missing or mistyped property: {name}")]
    MissingProperty {
        /// The property name.
        name: &'static str,
    },

    /// The hash table, bucket table, and strings blob disagree.
    #[error("malformed phash table: {message}")]
    MalformedHashTable {
        /// Description of the inconsistency.
        message: String,
    },

    /// The replacement message sequence does not match the decoded count.
    #[error("replacement length mismatch: expected {expected} messages, got {actual}")]
    LengthMismatch {
        /// Number of messages in the decoded table.
        expected: usize,
        /// Number of messages supplied.
        actual: usize,
    },

    // ==================== External Tool Errors ====================
    /// The archive tool is missing or exited with a non-zero status.
    #[error("archive tool failure: {message}")]
    ArchiveToolFailure {
        /// Description of what went wrong.
        message: String,
    },

    // ==================== Parsing Errors ====================
    /// CSV parsing or serialization error.
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

/// A specialized Result type for `gdtrans` operations.
pub type Result<T> = std::result::Result<T, Error>;
