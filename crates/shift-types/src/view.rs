//! Views and rewrite results

use smallvec::SmallVec;

use crate::conversion::Conversion;
use crate::data::Data;
use crate::error::ConversionResult;
use crate::optimizer::Optimizer;
use crate::types::{ReadOptions, Type};

/// Conversion between two types
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    /// Type of the input data
    pub from: Type,
    /// Type of the output data
    pub to: Type,
    /// Conversion from one to the other
    pub function: Conversion,
}

impl View {
    /// Create a view
    #[must_use]
    pub fn new(from: Type, to: Type, function: Conversion) -> Self {
        Self { from, to, function }
    }

    /// Identity view of a type
    #[must_use]
    pub fn nop(ty: Type) -> Self {
        Self {
            from: ty.clone(),
            to: ty,
            function: Conversion::Id,
        }
    }

    /// Whether the view changes neither type nor data
    #[must_use]
    pub fn is_nop(&self) -> bool {
        self.function.is_id() && self.from == self.to
    }

    /// Run `before`, then this view
    #[must_use]
    pub fn compose(&self, before: &View) -> View {
        if self.is_nop() {
            return before.clone();
        }
        if before.is_nop() {
            return self.clone();
        }
        View {
            from: before.from.clone(),
            to: self.to.clone(),
            function: Conversion::compose(vec![before.function.clone(), self.function.clone()]),
        }
    }

    /// Convert data of `from` into data of `to`
    pub fn apply(&self, data: Data) -> ConversionResult<Data> {
        self.function.apply(data)
    }

    /// [`View::apply`], decoding opaque recursive occurrences with `options`
    pub fn apply_with(&self, data: Data, options: &ReadOptions) -> ConversionResult<Data> {
        self.function.apply_with(data, options)
    }
}

/// Bit set of recursive family indices
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RecursionSet(SmallVec<[u64; 2]>);

impl RecursionSet {
    /// Empty set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an index
    pub fn insert(&mut self, index: usize) {
        let (word, bit) = (index / 64, index % 64);
        if self.0.len() <= word {
            self.0.resize(word + 1, 0);
        }
        self.0[word] |= 1 << bit;
    }

    /// Check for an index
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        self.0
            .get(index / 64)
            .is_some_and(|word| word & (1 << (index % 64)) != 0)
    }

    /// Check for the empty set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|word| *word == 0)
    }

    /// Set union
    #[must_use]
    pub fn union(&self, other: &RecursionSet) -> RecursionSet {
        let (long, short) = if self.0.len() >= other.0.len() {
            (self, other)
        } else {
            (other, self)
        };
        let mut out = long.clone();
        for (word, bits) in out.0.iter_mut().zip(short.0.iter()) {
            *word |= bits;
        }
        out
    }

    /// Indices in ascending order
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().enumerate().flat_map(|(w, word)| {
            (0..64).filter(move |bit| word & (1 << bit) != 0).map(move |bit| w * 64 + bit)
        })
    }
}

impl FromIterator<usize> for RecursionSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut set = Self::new();
        for index in iter {
            set.insert(index);
        }
        set
    }
}

/// View plus the recursive family indices it touched
#[derive(Debug, Clone, PartialEq)]
pub struct RewriteResult {
    /// The rewrite
    pub view: View,
    /// Family indices whose occurrences the rewrite changed
    pub recursion: RecursionSet,
}

impl RewriteResult {
    /// Create a result
    #[must_use]
    pub fn new(view: View, recursion: RecursionSet) -> Self {
        Self { view, recursion }
    }

    /// Result that changes nothing
    #[must_use]
    pub fn nop(ty: Type) -> Self {
        Self::new(View::nop(ty), RecursionSet::new())
    }

    /// Whether the result changes nothing
    #[inline]
    #[must_use]
    pub fn is_nop(&self) -> bool {
        self.view.is_nop()
    }

    /// Run `before`, then this result
    ///
    /// A no-op on either side returns the other side unchanged.
    #[must_use]
    pub fn compose(&self, before: &RewriteResult) -> RewriteResult {
        if self.is_nop() {
            return before.clone();
        }
        if before.is_nop() {
            return self.clone();
        }
        RewriteResult {
            view: self.view.compose(&before.view),
            recursion: self.recursion.union(&before.recursion),
        }
    }

    /// Optimize the conversion
    #[must_use]
    pub fn optimize(self, optimizer: Optimizer) -> RewriteResult {
        RewriteResult {
            view: View {
                function: optimizer.optimize(self.view.function),
                ..self.view
            },
            recursion: self.recursion,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Primitive;

    #[test]
    fn recursion_set_ops() {
        let mut a = RecursionSet::new();
        a.insert(1);
        a.insert(70);
        let b: RecursionSet = [3].into_iter().collect();
        let u = a.union(&b);
        assert_eq!(u.iter().collect::<Vec<_>>(), vec![1, 3, 70]);
        assert!(!u.contains(2));
        assert!(RecursionSet::new().is_empty());
    }

    #[test]
    fn nop_absorbs_on_both_sides() {
        let int = Type::primitive(Primitive::Int);
        let long = Type::primitive(Primitive::Long);
        let widen = RewriteResult::new(
            View::new(
                int.clone(),
                long,
                Conversion::function("widen", |d| Ok(Data::Long(d.as_i64().unwrap_or(0)))),
            ),
            RecursionSet::new(),
        );
        let nop = RewriteResult::nop(int);
        assert_eq!(nop.compose(&widen), widen);
        assert_eq!(widen.compose(&nop), widen);
    }

    #[test]
    fn retyping_without_conversion_is_not_nop() {
        let view = View::new(
            Type::primitive(Primitive::Int),
            Type::primitive(Primitive::Long),
            Conversion::Id,
        );
        assert!(!view.is_nop());
    }
}
