//! Three-way recoverable results
//!
//! [`Recoverable`] is the one result shape used for both schema search and
//! decoding: a success, a soft miss that tells the caller to keep looking, or
//! an error that may still carry a partial result.

/// Success, soft miss, or error with an optional partial result
#[derive(Debug, Clone, PartialEq)]
pub enum Recoverable<T, E> {
    /// Success
    Ok(T),

    /// Not found here, try elsewhere
    Miss(E),

    /// Definite failure, possibly with whatever could be salvaged
    Err {
        /// Why it failed
        error: E,
        /// Salvaged result
        partial: Option<T>,
    },
}

impl<T, E> Recoverable<T, E> {
    /// Failure with no partial result
    #[inline]
    pub fn fail(error: E) -> Self {
        Self::Err {
            error,
            partial: None,
        }
    }

    /// Failure carrying a partial result
    #[inline]
    pub fn fail_with(error: E, partial: T) -> Self {
        Self::Err {
            error,
            partial: Some(partial),
        }
    }

    /// Check for success
    #[inline]
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// Check for a soft miss
    #[inline]
    #[must_use]
    pub fn is_miss(&self) -> bool {
        matches!(self, Self::Miss(_))
    }

    /// Check for a hard error
    #[inline]
    #[must_use]
    pub fn is_err(&self) -> bool {
        matches!(self, Self::Err { .. })
    }

    /// Success value, discarding errors and partials
    #[inline]
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Ok(value) => Some(value),
            _ => None,
        }
    }

    /// Success value or the partial result of an error
    #[inline]
    pub fn ok_or_partial(self) -> Option<T> {
        match self {
            Self::Ok(value) => Some(value),
            Self::Err { partial, .. } => partial,
            Self::Miss(_) => None,
        }
    }

    /// Borrow the error of a miss or failure
    #[inline]
    pub fn error(&self) -> Option<&E> {
        match self {
            Self::Ok(_) => None,
            Self::Miss(error) | Self::Err { error, .. } => Some(error),
        }
    }

    /// Collapse into a plain `Result`, treating a miss as an error
    #[inline]
    pub fn into_result(self) -> Result<T, E> {
        match self {
            Self::Ok(value) => Ok(value),
            Self::Miss(error) | Self::Err { error, .. } => Err(error),
        }
    }

    /// Map the success and partial values
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Recoverable<U, E> {
        match self {
            Self::Ok(value) => Recoverable::Ok(f(value)),
            Self::Miss(error) => Recoverable::Miss(error),
            Self::Err { error, partial } => Recoverable::Err {
                error,
                partial: partial.map(f),
            },
        }
    }

    /// Map the error
    pub fn map_err<F>(self, f: impl FnOnce(E) -> F) -> Recoverable<T, F> {
        match self {
            Self::Ok(value) => Recoverable::Ok(value),
            Self::Miss(error) => Recoverable::Miss(f(error)),
            Self::Err { error, partial } => Recoverable::Err {
                error: f(error),
                partial,
            },
        }
    }

    /// On a soft miss, try `f`; successes and hard errors pass through
    pub fn or_else_miss(self, f: impl FnOnce() -> Self) -> Self {
        match self {
            Self::Miss(_) => f(),
            other => other,
        }
    }

    /// Turn a soft miss into a hard error
    pub fn harden(self) -> Self {
        match self {
            Self::Miss(error) => Self::fail(error),
            other => other,
        }
    }
}

impl<T, E> From<Result<T, E>> for Recoverable<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Ok(value),
            Err(error) => Self::fail(error),
        }
    }
}
