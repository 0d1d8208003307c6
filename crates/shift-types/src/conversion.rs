//! Point-free data conversions
//!
//! A [`Conversion`] is an inspectable description of a function over
//! [`Data`], so that the optimizer can flatten and fuse it before it runs.

use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use crate::data::Data;
use crate::error::{ConversionError, ConversionResult};
use crate::family::FamilyFold;
use crate::optic::{modify_path, Step};
use crate::types::ReadOptions;

/// Boxed data transform
pub type ConvertFn = Arc<dyn Fn(Data) -> ConversionResult<Data> + Send + Sync>;

/// Named opaque data transform
///
/// Two functions are equal only if they share the same allocation.
#[derive(Clone)]
pub struct NamedFn {
    name: Arc<str>,
    func: ConvertFn,
}

impl NamedFn {
    /// Wrap a closure
    pub fn new(
        name: impl Into<Arc<str>>,
        func: impl Fn(Data) -> ConversionResult<Data> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// Function name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the function
    #[inline]
    pub fn call(&self, data: Data) -> ConversionResult<Data> {
        (self.func)(data)
    }
}

impl PartialEq for NamedFn {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl Debug for NamedFn {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Fn({})", self.name)
    }
}

/// Description of a data transform
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Conversion {
    /// Identity
    #[default]
    Id,
    /// Opaque function
    Fn(NamedFn),
    /// Run each conversion in order
    Compose(Vec<Conversion>),
    /// Run the inner conversion at every focus of a path
    Lift(Vec<Step>, Box<Conversion>),
    /// Migrate a recursive occurrence at a family index
    Fold(Arc<FamilyFold>, usize),
    /// Reference to the enclosing fold at another index
    Recurse(usize),
}

impl Conversion {
    /// Opaque named function
    pub fn function(
        name: impl Into<Arc<str>>,
        func: impl Fn(Data) -> ConversionResult<Data> + Send + Sync + 'static,
    ) -> Self {
        Self::Fn(NamedFn::new(name, func))
    }

    /// Compose in order, flattening nested compositions and dropping
    /// identities
    #[must_use]
    pub fn compose(parts: Vec<Conversion>) -> Self {
        let mut flat = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                Self::Id => {}
                Self::Compose(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Self::Id,
            1 => flat.pop().unwrap_or_default(),
            _ => Self::Compose(flat),
        }
    }

    /// Lift through a path, collapsing identities and nested lifts
    #[must_use]
    pub fn lift(path: Vec<Step>, inner: Conversion) -> Self {
        match inner {
            Self::Id => Self::Id,
            inner if path.is_empty() => inner,
            Self::Lift(rest, inner) => {
                let mut path = path;
                path.extend(rest);
                Self::Lift(path, inner)
            }
            inner => Self::Lift(path, Box::new(inner)),
        }
    }

    /// Run `self`, then `next`
    #[must_use]
    pub fn then(self, next: Conversion) -> Self {
        Self::compose(vec![self, next])
    }

    /// Check for the identity
    #[inline]
    #[must_use]
    pub fn is_id(&self) -> bool {
        matches!(self, Self::Id)
    }

    /// Run the conversion
    pub fn apply(&self, data: Data) -> ConversionResult<Data> {
        self.apply_with(data, &ReadOptions::default())
    }

    /// Run the conversion, decoding opaque recursive occurrences with
    /// `options`
    pub fn apply_with(&self, data: Data, options: &ReadOptions) -> ConversionResult<Data> {
        self.apply_in(data, None, options)
    }

    pub(crate) fn apply_in(
        &self,
        data: Data,
        fold: Option<&FamilyFold>,
        options: &ReadOptions,
    ) -> ConversionResult<Data> {
        match self {
            Self::Id => Ok(data),
            Self::Fn(f) => f.call(data),
            Self::Compose(parts) => parts
                .iter()
                .try_fold(data, |acc, part| part.apply_in(acc, fold, options)),
            Self::Lift(path, inner) => {
                modify_path(path, data, &mut |d| inner.apply_in(d, fold, options))
            }
            Self::Fold(family_fold, index) => family_fold.recurse(*index, data, options),
            Self::Recurse(index) => fold
                .ok_or(ConversionError::UnboundRecursion(*index))?
                .recurse(*index, data, options),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn double() -> Conversion {
        Conversion::function("double", |d| match d {
            Data::Int(v) => Ok(Data::Int(v * 2)),
            other => Err(ConversionError::TypeMismatch {
                expected: "int",
                found: other.kind(),
            }),
        })
    }

    #[test]
    fn compose_flattens_and_drops_identity() {
        let f = double();
        let composed = Conversion::compose(vec![
            Conversion::Id,
            Conversion::compose(vec![f.clone(), f.clone()]),
            Conversion::Id,
        ]);
        assert_eq!(composed, Conversion::Compose(vec![f.clone(), f]));
    }

    #[test]
    fn lift_of_identity_is_identity() {
        assert_eq!(Conversion::lift(vec![Step::First], Conversion::Id), Conversion::Id);
    }

    #[test]
    fn nested_lifts_merge_paths() {
        let f = double();
        let lifted = Conversion::lift(
            vec![Step::First],
            Conversion::lift(vec![Step::Elements], f.clone()),
        );
        assert_eq!(
            lifted,
            Conversion::Lift(vec![Step::First, Step::Elements], Box::new(f))
        );
    }

    #[test]
    fn apply_runs_in_order() {
        let add_one = Conversion::function("inc", |d| Ok(Data::Int(d.as_i64().unwrap_or(0) as i32 + 1)));
        let c = add_one.then(double());
        assert_eq!(c.apply(Data::Int(1)).unwrap(), Data::Int(4));
    }

    #[test]
    fn recurse_outside_fold_fails() {
        let err = Conversion::Recurse(2).apply(Data::Unit).unwrap_err();
        assert_eq!(err, ConversionError::UnboundRecursion(2));
    }

    #[test]
    fn functions_compare_by_identity() {
        let a = double();
        let b = double();
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }
}
