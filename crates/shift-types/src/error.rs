//! Error types for the type layer
//!
//! Provides error handling for:
//! - Schema search (field or type not present)
//! - Schema construction (undefined names)
//! - Running conversions over decoded data

use shift_dynamic::{DecodeError, EncodeError};

/// Why a field or type could not be located
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FieldNotFound {
    /// Nothing matching was found below this node
    #[error("no match for {0}")]
    NotFound(String),

    /// A field with the right name exists but holds another type
    #[error("field '{name}' has type {found}, expected {expected}")]
    WrongType {
        /// Field name
        name: String,
        /// Type the matcher asked for
        expected: String,
        /// Type actually declared
        found: String,
    },

    /// The tagged choice has no alternative with this key
    #[error("tagged choice '{choice}' has no alternative '{key}'")]
    NoAlternative {
        /// Name of the key field
        choice: String,
        /// Requested key
        key: String,
    },
}

/// Errors while assembling a schema
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// Lookup of a name the schema does not define
    #[error("unknown type '{name}' in schema {version}")]
    UnknownType {
        /// Requested name
        name: String,
        /// Schema version key
        version: u32,
    },

    /// A forward reference was never given a definition
    #[error("type '{name}' is referenced but never defined in schema {version}")]
    UndefinedReference {
        /// Referenced name
        name: String,
        /// Schema version key
        version: u32,
    },

    /// Two schemas registered under one version key
    #[error("schema version {0} registered twice")]
    DuplicateVersion(u32),
}

/// Errors while running a conversion over decoded data
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConversionError {
    /// A path step met data of another shape
    #[error("step {step} cannot focus into {found}")]
    StepMismatch {
        /// Step being applied
        step: String,
        /// Shape of the data found
        found: &'static str,
    },

    /// A recursion placeholder ran outside of its fold
    #[error("recursion point {0} used outside of a fold")]
    UnboundRecursion(usize),

    /// Re-reading an intermediate value failed
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),

    /// Writing an intermediate value failed
    #[error("encode failed: {0}")]
    Encode(#[from] EncodeError),

    /// Data did not have the expected leaf type
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        /// Expected data kind
        expected: &'static str,
        /// Data kind found
        found: &'static str,
    },

    /// A field lookup on typed data failed
    #[error(transparent)]
    Field(#[from] FieldNotFound),

    /// User transform failure
    #[error("{0}")]
    Failed(String),
}

/// Result alias for conversions
pub type ConversionResult<T> = std::result::Result<T, ConversionError>;
