//! Decode and encode errors shared by every adapter

/// Errors while reading an opaque value against an expected shape
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    /// Value has the wrong kind
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        /// Expected kind
        expected: String,
        /// Kind actually present
        found: String,
    },

    /// Required map key is absent
    #[error("missing field '{0}'")]
    MissingField(String),

    /// Number does not fit the target width
    #[error("number {value} out of range for {target}")]
    OutOfRange {
        /// Offending number, rendered
        value: String,
        /// Target primitive
        target: &'static str,
    },

    /// Tagged choice key with no registered alternative
    #[error("unknown key '{key}' for tagged choice '{choice}'")]
    UnknownTag {
        /// Name of the key field
        choice: String,
        /// Key found in the input
        key: String,
        /// Whether decoding must abort instead of dropping the element
        fatal: bool,
    },

    /// Structural version guard rejected the value
    #[error("check '{name}' failed: index {index} is not {expected}")]
    CheckFailed {
        /// Check name
        name: String,
        /// Index the type was resolved at
        index: usize,
        /// Index the check expects
        expected: usize,
    },

    /// Free-form failure
    #[error("{0}")]
    Message(String),
}

impl DecodeError {
    /// Create a kind mismatch error
    pub fn mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Whether the error must abort the whole decode
    ///
    /// Non-fatal errors let containers keep the elements that did decode.
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::UnknownTag { fatal: true, .. })
    }

    /// Whether the error only drops the element it occurred in
    ///
    /// Lenient unknown tags are the one failure a container may skip over
    /// without losing data the caller expects to keep.
    #[inline]
    #[must_use]
    pub fn is_skippable(&self) -> bool {
        matches!(self, Self::UnknownTag { fatal: false, .. })
    }

    /// The more serious of two errors, `self` on ties
    #[must_use]
    pub fn or_worse(self, other: Self) -> Self {
        if self.is_skippable() && !other.is_skippable() {
            other
        } else {
            self
        }
    }
}

/// Errors while writing decoded data back to an opaque value
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EncodeError {
    /// Data does not have the shape the type describes
    #[error("cannot encode {found} as {expected}")]
    TypeMismatch {
        /// Shape the type expects
        expected: String,
        /// Data actually supplied
        found: String,
    },

    /// Target for a keyed write is not a map
    #[error("cannot merge key '{key}' into non-map {found}")]
    NotAMap {
        /// Key being written
        key: String,
        /// Kind of the target
        found: String,
    },

    /// A leaf was written over a non-empty prefix
    #[error("cannot write {kind} over non-empty prefix")]
    NonEmptyPrefix {
        /// Leaf kind
        kind: &'static str,
    },

    /// Free-form failure
    #[error("{0}")]
    Message(String),
}

impl EncodeError {
    /// Create a shape mismatch error
    pub fn mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_display() {
        let err = DecodeError::MissingField("name".to_string());
        assert_eq!(err.to_string(), "missing field 'name'");
    }

    #[test]
    fn only_strict_unknown_tags_are_fatal() {
        let strict = DecodeError::UnknownTag {
            choice: "type".to_string(),
            key: "hexagon".to_string(),
            fatal: true,
        };
        let lenient = DecodeError::UnknownTag {
            choice: "type".to_string(),
            key: "hexagon".to_string(),
            fatal: false,
        };
        assert!(strict.is_fatal());
        assert!(!lenient.is_fatal());
        assert!(!DecodeError::mismatch("int", "string").is_fatal());
        assert!(lenient.is_skippable());
        assert!(!strict.is_skippable());
    }

    #[test]
    fn missing_data_outranks_a_skipped_tag() {
        let skipped = DecodeError::UnknownTag {
            choice: "type".to_string(),
            key: "hexagon".to_string(),
            fatal: false,
        };
        let missing = DecodeError::MissingField("count".to_string());
        assert_eq!(skipped.clone().or_worse(missing.clone()), missing);
        assert_eq!(missing.clone().or_worse(skipped), missing);
    }
}
