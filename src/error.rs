// In: src/error.rs

//! This module defines the single, unified error type for the entire
//! columnar-marshal library. It uses the `thiserror` crate to provide
//! ergonomic, context-aware error handling.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarshalError {
    // =========================================================================
    // === High-Level, Semantic Errors (Specific to our library's logic)
    // =========================================================================
    /// A series name was looked up that no mapper or dataframe knows about.
    #[error("Unknown series: '{0}'")]
    ColumnNotFound(String),

    /// A series' data was accessed through the wrong scalar type.
    #[error("Series type mismatch: {0}")]
    TypeMismatch(String),

    /// An enum-valued series was updated with a string matching no case.
    #[error("Invalid value for enum series '{series}': '{value}'")]
    InvalidEnumValue { series: String, value: String },

    /// An identity value in an updating dataframe matched no item.
    #[error("No item found for key: {0}")]
    ItemNotFound(String),

    /// Two series were registered under the same name.
    #[error("Duplicate series name: '{0}'")]
    DuplicateKey(String),

    /// An update column's declared type has no corresponding updater branch.
    #[error("Unsupported series type for update: {0}")]
    UnsupportedSeriesType(String),

    /// A supplied column does not match the dataframe's row count.
    #[error("Column length mismatch: expected {0} rows, got {1}")]
    LengthMismatch(usize, usize),

    /// A string value could not be encoded for the native boundary.
    #[error("Invalid string encoding: {0}")]
    InvalidStringEncoding(String),

    #[error("Internal logic error (this is a bug): {0}")]
    InternalError(String),

    // =========================================================================
    // === External Error Wrappers (Using #[from] for automatic conversion)
    // =========================================================================
    /// An error from the Serde JSON library, typically during schema serialization.
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
}

// =============================================================================
// === Manual `From` Implementations ===
// =============================================================================

impl From<std::ffi::NulError> for MarshalError {
    fn from(err: std::ffi::NulError) -> Self {
        // String cells crossing the native boundary are null-terminated, so an
        // interior NUL byte cannot be represented.
        MarshalError::InvalidStringEncoding(format!("interior NUL byte: {err}"))
    }
}
