//! Recursive type families
//!
//! A family is an arena of templates addressed by index. Recursion points are
//! plain `(family, index)` pairs and unfold by applying the template at that
//! index, so mutually recursive types need no reference cycles.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use shift_dynamic::{Recoverable, Value, ValueOps};
use tracing::debug;

use crate::conversion::Conversion;
use crate::data::Data;
use crate::error::{ConversionResult, FieldNotFound};
use crate::optimizer::Optimizer;
use crate::rule::RewriteRule;
use crate::template::TypeTemplate;
use crate::types::{ReadOptions, Type};
use crate::view::{RecursionSet, RewriteResult, View};

struct FamilyInner {
    name: String,
    templates: Vec<TypeTemplate>,
    hash: u64,
}

/// Named table of templates that may reference each other by index
#[derive(Clone)]
pub struct RecursiveTypeFamily(Arc<FamilyInner>);

impl RecursiveTypeFamily {
    /// Create a family
    pub fn new(name: impl Into<String>, templates: Vec<TypeTemplate>) -> Self {
        let name = name.into();
        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        templates.hash(&mut hasher);
        let hash = hasher.finish();
        Self(Arc::new(FamilyInner {
            name,
            templates,
            hash,
        }))
    }

    /// Family name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Number of indices
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.0.templates.len()
    }

    /// All templates, by index
    #[inline]
    #[must_use]
    pub fn templates(&self) -> &[TypeTemplate] {
        &self.0.templates
    }

    /// Template at `index`
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[inline]
    #[must_use]
    pub fn template(&self, index: usize) -> &TypeTemplate {
        &self.0.templates[index]
    }

    /// Unfolded type at `index`
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[must_use]
    pub fn apply(&self, index: usize) -> Type {
        self.template(index).apply(self, index)
    }

    /// Recursion point for `index`
    #[must_use]
    pub fn point(&self, index: usize) -> Type {
        Type::recursive_point(self.clone(), index)
    }

    /// Apply `rule` everywhere across the family and return the rewrite of
    /// the recursion point at `index`
    ///
    /// `None` means no index of the family changes.
    #[must_use]
    pub fn everywhere(
        &self,
        index: usize,
        rule: &RewriteRule,
        optimizer: Optimizer,
    ) -> Option<RewriteResult> {
        self.fixpoint(rule, optimizer, true)
            .map(|fixpoint| fixpoint.point_result(self, index))
    }

    /// Replace the type of field `name` in the template at `index`
    ///
    /// The new family shares every other template.
    pub fn replace_field(
        &self,
        index: usize,
        name: &str,
        focus: &Type,
        result: &TypeTemplate,
    ) -> Recoverable<RecursiveTypeFamily, FieldNotFound> {
        self.template(index)
            .find_field_or_type(self, index, name, focus, result)
            .map(|template| {
                let mut templates = self.0.templates.clone();
                templates[index] = template;
                RecursiveTypeFamily::new(self.name(), templates)
            })
    }

    /// Cross-index fixpoint of `rule`
    ///
    /// Each index is rewritten one level deep; the new family is built from
    /// the rewritten types and a fold lifts the per-index conversions through
    /// every recursion point.
    pub(crate) fn fixpoint(
        &self,
        rule: &RewriteRule,
        optimizer: Optimizer,
        check_index: bool,
    ) -> Option<Arc<Fixpoint>> {
        let results: Vec<RewriteResult> = (0..self.size())
            .map(|i| self.apply(i).everywhere(rule, optimizer, false, check_index))
            .collect();
        let touched: RecursionSet = results
            .iter()
            .enumerate()
            .filter(|(_, r)| !r.is_nop())
            .map(|(i, _)| i)
            .collect();
        if touched.is_empty() {
            return None;
        }
        debug!(family = %self.name(), touched = ?touched.iter().collect::<Vec<_>>(), "rewriting recursive family");

        let new_family = RecursiveTypeFamily::new(
            self.name(),
            results.iter().map(|r| r.view.to.build_template()).collect(),
        );
        let reach = self.reaching(&touched);
        let lifts = (0..self.size())
            .map(|i| {
                if !reach[i] {
                    return Conversion::Id;
                }
                let lifted = self.template(i).hmap(self, i, &|j| {
                    if reach[j] {
                        RewriteResult::new(
                            View::new(self.point(j), new_family.point(j), Conversion::Recurse(j)),
                            [j].into_iter().collect(),
                        )
                    } else {
                        RewriteResult::nop(self.point(j))
                    }
                });
                optimizer.optimize(lifted.view.function)
            })
            .collect();
        let functions = results.into_iter().map(|r| r.view.function).collect();

        Some(Arc::new(Fixpoint {
            fold: Arc::new(FamilyFold {
                old: self.clone(),
                new: new_family,
                lifts,
                functions,
                reach,
            }),
            touched,
        }))
    }

    /// Indices whose types are touched or contain a touched index
    fn reaching(&self, touched: &RecursionSet) -> Vec<bool> {
        let mut reach: Vec<bool> = (0..self.size()).map(|i| touched.contains(i)).collect();
        let points: Vec<Vec<usize>> = self.templates().iter().map(TypeTemplate::points).collect();
        let mut changed = true;
        while changed {
            changed = false;
            for (i, refs) in points.iter().enumerate() {
                if !reach[i] && refs.iter().any(|&j| reach.get(j).copied().unwrap_or(false)) {
                    reach[i] = true;
                    changed = true;
                }
            }
        }
        reach
    }
}

impl PartialEq for RecursiveTypeFamily {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
            || (self.0.hash == other.0.hash
                && self.0.name == other.0.name
                && self.0.templates == other.0.templates)
    }
}

impl Eq for RecursiveTypeFamily {}

impl Hash for RecursiveTypeFamily {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash.hash(state);
    }
}

impl Debug for RecursiveTypeFamily {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Family({}, {} templates)", self.0.name, self.0.templates.len())
    }
}

/// Memo of family fixpoints for one `everywhere` traversal
pub(crate) type FixpointMemo = HashMap<RecursiveTypeFamily, Option<Arc<Fixpoint>>>;

/// Outcome of rewriting a whole family
#[derive(Debug)]
pub(crate) struct Fixpoint {
    fold: Arc<FamilyFold>,
    touched: RecursionSet,
}

impl Fixpoint {
    /// Rewrite of the recursion point at `index`
    pub(crate) fn point_result(&self, family: &RecursiveTypeFamily, index: usize) -> RewriteResult {
        let function = if self.fold.reach.get(index).copied().unwrap_or(false) {
            Conversion::Fold(Arc::clone(&self.fold), index)
        } else {
            Conversion::Id
        };
        RewriteResult::new(
            View::new(family.point(index), self.fold.new.point(index), function),
            self.touched.clone(),
        )
    }
}

/// Bottom-up migration of data through a rewritten family
///
/// Folding index `i` first folds every nested recursive occurrence, then runs
/// the one-level conversion of index `i`. A folded occurrence is handed back
/// already encoded against the new family, so the enclosing conversion can
/// write it verbatim whatever shape it expects.
#[derive(Debug, PartialEq)]
pub struct FamilyFold {
    old: RecursiveTypeFamily,
    new: RecursiveTypeFamily,
    lifts: Vec<Conversion>,
    functions: Vec<Conversion>,
    reach: Vec<bool>,
}

impl FamilyFold {
    /// Family the input data belongs to
    #[inline]
    #[must_use]
    pub fn old_family(&self) -> &RecursiveTypeFamily {
        &self.old
    }

    /// Family the output data belongs to
    #[inline]
    #[must_use]
    pub fn new_family(&self) -> &RecursiveTypeFamily {
        &self.new
    }

    pub(crate) fn recurse(
        &self,
        index: usize,
        data: Data,
        options: &ReadOptions,
    ) -> ConversionResult<Data> {
        if !self.reach.get(index).copied().unwrap_or(false) {
            return Ok(data);
        }
        let data = match data {
            Data::Dynamic(value) => match self.old.apply(index).read(&ValueOps, value, options) {
                Recoverable::Ok((_, data)) => data,
                Recoverable::Err {
                    error,
                    partial: Some((_, data)),
                } if error.is_skippable() => data,
                Recoverable::Miss(error) | Recoverable::Err { error, .. } => return Err(error.into()),
            },
            data => data,
        };
        let data = self.lifts[index].apply_in(data, Some(self), options)?;
        let data = self.functions[index].apply_with(data, options)?;
        let value = self.new.apply(index).write(&ValueOps, Value::Empty, &data)?;
        Ok(Data::Dynamic(value))
    }
}
