//! Type templates
//!
//! A [`TypeTemplate`] is a [`Type`] with its recursion points left as bare
//! indices. Applying it to a [`RecursiveTypeFamily`] at some index resolves
//! those indices into recursion points of that family.

use std::collections::BTreeMap;

use shift_dynamic::Recoverable;

use crate::conversion::Conversion;
use crate::error::FieldNotFound;
use crate::family::RecursiveTypeFamily;
use crate::optic::Step;
use crate::types::{Hook, Type};
use crate::view::{RecursionSet, RewriteResult, View};

/// Blueprint of a type, parametrized over a recursive family
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeTemplate {
    /// Fixed type, the same at every index and never rewritten
    Const(Type),
    /// Product of two templates
    Product(Box<TypeTemplate>, Box<TypeTemplate>),
    /// Sum of two templates
    Sum(Box<TypeTemplate>, Box<TypeTemplate>),
    /// List of a template
    List(Box<TypeTemplate>),
    /// Compound list of two templates
    CompoundList(Box<TypeTemplate>, Box<TypeTemplate>),
    /// Tagged choice over template alternatives
    TaggedChoice {
        /// Map key holding the discriminator
        name: String,
        /// Discriminator type
        key_type: Type,
        /// Alternatives by rendered key
        alternatives: BTreeMap<String, TypeTemplate>,
    },
    /// Nominal wrapper
    Named(String, Box<TypeTemplate>),
    /// Field wrapper
    Field(String, Box<TypeTemplate>),
    /// Guard resolved against the index the template is applied at
    Check {
        /// Check name
        name: String,
        /// Index the guard accepts
        index: usize,
        /// Guarded template
        element: Box<TypeTemplate>,
    },
    /// Hooked template
    Hook(Box<TypeTemplate>, Hook),
    /// Reference to a family index
    RecursivePoint(usize),
}

impl TypeTemplate {
    /// Product template
    #[must_use]
    pub fn product(first: TypeTemplate, second: TypeTemplate) -> Self {
        Self::Product(Box::new(first), Box::new(second))
    }

    /// Sum template
    #[must_use]
    pub fn sum(left: TypeTemplate, right: TypeTemplate) -> Self {
        Self::Sum(Box::new(left), Box::new(right))
    }

    /// List template
    #[must_use]
    pub fn list(element: TypeTemplate) -> Self {
        Self::List(Box::new(element))
    }

    /// Compound list template
    #[must_use]
    pub fn compound_list(key: TypeTemplate, value: TypeTemplate) -> Self {
        Self::CompoundList(Box::new(key), Box::new(value))
    }

    /// Named template
    #[must_use]
    pub fn named(name: impl Into<String>, inner: TypeTemplate) -> Self {
        Self::Named(name.into(), Box::new(inner))
    }

    /// Field template
    #[must_use]
    pub fn field(name: impl Into<String>, inner: TypeTemplate) -> Self {
        Self::Field(name.into(), Box::new(inner))
    }

    /// Number of family indices this template may reference
    #[must_use]
    pub fn size(&self) -> usize {
        match self {
            Self::Const(_) => 0,
            Self::Product(a, b) | Self::Sum(a, b) | Self::CompoundList(a, b) => a.size().max(b.size()),
            Self::List(a) | Self::Named(_, a) | Self::Field(_, a) | Self::Hook(a, _) => a.size(),
            Self::TaggedChoice { alternatives, .. } => {
                alternatives.values().map(Self::size).max().unwrap_or(0)
            }
            Self::Check { index, element, .. } => element.size().max(index + 1),
            Self::RecursivePoint(index) => index + 1,
        }
    }

    /// Family indices referenced by recursion points, in order of appearance
    #[must_use]
    pub fn points(&self) -> Vec<usize> {
        let mut out = Vec::new();
        self.collect_points(&mut out);
        out
    }

    fn collect_points(&self, out: &mut Vec<usize>) {
        match self {
            Self::Const(_) => {}
            Self::Product(a, b) | Self::Sum(a, b) | Self::CompoundList(a, b) => {
                a.collect_points(out);
                b.collect_points(out);
            }
            Self::List(a) | Self::Named(_, a) | Self::Field(_, a) | Self::Hook(a, _) => {
                a.collect_points(out);
            }
            Self::TaggedChoice { alternatives, .. } => {
                for alternative in alternatives.values() {
                    alternative.collect_points(out);
                }
            }
            Self::Check { element, .. } => element.collect_points(out),
            Self::RecursivePoint(j) => out.push(*j),
        }
    }

    /// Resolve against `family` at `index`
    #[must_use]
    pub fn apply(&self, family: &RecursiveTypeFamily, index: usize) -> Type {
        self.apply_with(index, &|j| family.point(j))
    }

    /// Resolve with a custom resolution for recursion points
    pub(crate) fn apply_with(&self, index: usize, point: &dyn Fn(usize) -> Type) -> Type {
        let go = |t: &TypeTemplate| t.apply_with(index, point);
        match self {
            Self::Const(ty) => ty.clone(),
            Self::Product(a, b) => Type::product(go(a), go(b)),
            Self::Sum(a, b) => Type::sum(go(a), go(b)),
            Self::List(a) => Type::list(go(a)),
            Self::CompoundList(k, v) => Type::compound_list(go(k), go(v)),
            Self::TaggedChoice {
                name,
                key_type,
                alternatives,
            } => Type::tagged_choice(
                name.clone(),
                key_type.clone(),
                alternatives.iter().map(|(k, t)| (k.clone(), go(t))).collect(),
            ),
            Self::Named(n, a) => Type::named(n.clone(), go(a)),
            Self::Field(n, a) => Type::field(n.clone(), go(a)),
            Self::Check {
                name,
                index: expected,
                element,
            } => Type::check(name.clone(), index, *expected, go(element)),
            Self::Hook(a, hook) => Type::hook(go(a), hook.clone()),
            Self::RecursivePoint(j) => point(*j),
        }
    }

    /// Replace the type of field `name` with `result`
    ///
    /// The field's current type, resolved at `index`, must be shape-equal to
    /// `focus`. Recursion points are not followed: every family index is
    /// rewritten through its own template.
    pub fn find_field_or_type(
        &self,
        family: &RecursiveTypeFamily,
        index: usize,
        name: &str,
        focus: &Type,
        result: &TypeTemplate,
    ) -> Recoverable<TypeTemplate, FieldNotFound> {
        let go = |t: &TypeTemplate| t.find_field_or_type(family, index, name, focus, result);
        let not_found = || Recoverable::Miss(FieldNotFound::NotFound(format!("field '{name}'")));
        match self {
            Self::Field(n, inner) if n == name => {
                let found = inner.apply(family, index);
                if found.same_shape(focus) {
                    Recoverable::Ok(Self::field(n.clone(), result.clone()))
                } else {
                    Recoverable::fail(FieldNotFound::WrongType {
                        name: name.to_string(),
                        expected: focus.to_string(),
                        found: found.to_string(),
                    })
                }
            }
            Self::Product(a, b) => match go(a) {
                Recoverable::Ok(a) => Recoverable::Ok(Self::Product(Box::new(a), b.clone())),
                Recoverable::Miss(_) => go(b).map(|b| Self::Product(a.clone(), Box::new(b))),
                err => err,
            },
            Self::Sum(a, b) => match (go(a), go(b)) {
                (Recoverable::Ok(a), Recoverable::Ok(b)) => Recoverable::Ok(Self::sum(a, b)),
                (Recoverable::Ok(a), Recoverable::Miss(_)) => {
                    Recoverable::Ok(Self::Sum(Box::new(a), b.clone()))
                }
                (Recoverable::Miss(_), Recoverable::Ok(b)) => {
                    Recoverable::Ok(Self::Sum(a.clone(), Box::new(b)))
                }
                (err @ Recoverable::Err { .. }, _) | (_, err @ Recoverable::Err { .. }) => err,
                (miss, _) => miss,
            },
            Self::List(a) => go(a).map(Self::list),
            Self::CompoundList(k, v) => go(v).map(|v| Self::CompoundList(k.clone(), Box::new(v))),
            Self::TaggedChoice {
                name: choice,
                key_type,
                alternatives,
            } => {
                let mut replaced = alternatives.clone();
                let mut any = false;
                for (key, alternative) in alternatives {
                    match go(alternative) {
                        Recoverable::Ok(t) => {
                            replaced.insert(key.clone(), t);
                            any = true;
                        }
                        Recoverable::Miss(_) => {}
                        err @ Recoverable::Err { .. } => return err,
                    }
                }
                if any {
                    Recoverable::Ok(Self::TaggedChoice {
                        name: choice.clone(),
                        key_type: key_type.clone(),
                        alternatives: replaced,
                    })
                } else {
                    not_found()
                }
            }
            Self::Named(n, a) => go(a).map(|a| Self::named(n.clone(), a)),
            Self::Check {
                name: check,
                index: expected,
                element,
            } => go(element).map(|element| Self::Check {
                name: check.clone(),
                index: *expected,
                element: Box::new(element),
            }),
            Self::Hook(a, hook) => go(a).map(|a| Self::Hook(Box::new(a), hook.clone())),
            Self::Field(..) | Self::Const(_) | Self::RecursivePoint(_) => not_found(),
        }
    }

    /// Lift a per-index change through this template
    ///
    /// `change(j)` is the rewrite for recursion point `j`. The result converts
    /// data of `self.apply(family, index)` by applying each change at every
    /// position where the template references that index.
    pub fn hmap(
        &self,
        family: &RecursiveTypeFamily,
        index: usize,
        change: &dyn Fn(usize) -> RewriteResult,
    ) -> RewriteResult {
        let from = self.apply(family, index);
        let mut recursion = RecursionSet::new();
        let function = self.hmap_function(&mut |j| {
            let result = change(j);
            if result.is_nop() {
                None
            } else {
                recursion.insert(j);
                Some(result.view.function)
            }
        });
        let to = self.apply_with(index, &|j| change(j).view.to);
        RewriteResult::new(View::new(from, to, function), recursion)
    }

    fn hmap_function(&self, change: &mut dyn FnMut(usize) -> Option<Conversion>) -> Conversion {
        fn lift(
            path: Vec<Step>,
            t: &TypeTemplate,
            change: &mut dyn FnMut(usize) -> Option<Conversion>,
        ) -> Conversion {
            Conversion::lift(path, t.hmap_function(change))
        }
        match self {
            Self::Const(_) => Conversion::Id,
            Self::Product(a, b) => Conversion::compose(vec![
                lift(vec![Step::First], a, change),
                lift(vec![Step::Second], b, change),
            ]),
            Self::Sum(a, b) => Conversion::compose(vec![
                lift(vec![Step::Left], a, change),
                lift(vec![Step::Right], b, change),
            ]),
            Self::List(a) => lift(vec![Step::Elements], a, change),
            Self::CompoundList(k, v) => Conversion::compose(vec![
                lift(vec![Step::Elements, Step::First], k, change),
                lift(vec![Step::Elements, Step::Second], v, change),
            ]),
            Self::TaggedChoice { alternatives, .. } => Conversion::compose(
                alternatives
                    .iter()
                    .map(|(key, t)| lift(vec![Step::Tag(key.clone())], t, change))
                    .collect(),
            ),
            Self::Named(_, a) | Self::Field(_, a) | Self::Hook(a, _) => a.hmap_function(change),
            Self::Check { element, .. } => element.hmap_function(change),
            Self::RecursivePoint(j) => change(*j).unwrap_or(Conversion::Id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Primitive;
    use crate::types::TypeKind;

    fn int() -> TypeTemplate {
        TypeTemplate::Const(Type::primitive(Primitive::Int))
    }

    fn tree_family() -> RecursiveTypeFamily {
        RecursiveTypeFamily::new(
            "tree",
            vec![TypeTemplate::named(
                "Tree",
                TypeTemplate::product(
                    TypeTemplate::field("value", int()),
                    TypeTemplate::field("children", TypeTemplate::list(TypeTemplate::RecursivePoint(0))),
                ),
            )],
        )
    }

    #[test]
    fn size_counts_referenced_indices() {
        let t = TypeTemplate::product(TypeTemplate::RecursivePoint(2), int());
        assert_eq!(t.size(), 3);
        assert_eq!(int().size(), 0);
    }

    #[test]
    fn points_lists_references() {
        let t = TypeTemplate::product(
            TypeTemplate::RecursivePoint(1),
            TypeTemplate::list(TypeTemplate::RecursivePoint(0)),
        );
        assert_eq!(t.points(), vec![1, 0]);
        assert!(int().points().is_empty());
    }

    #[test]
    fn apply_resolves_points_into_family() {
        let family = tree_family();
        let ty = family.apply(0);
        let TypeKind::Named(name, _) = ty.kind() else {
            panic!("expected named type");
        };
        assert_eq!(name, "Tree");
        assert!(ty.to_string().contains("Rec[tree#0]"));
    }

    #[test]
    fn check_resolves_against_applied_index() {
        let family = RecursiveTypeFamily::new(
            "checked",
            vec![
                TypeTemplate::Check {
                    name: "kind".to_string(),
                    index: 1,
                    element: Box::new(int()),
                },
                int(),
            ],
        );
        let TypeKind::Check { index, expected, .. } = family.apply(0).kind().clone() else {
            panic!("expected check");
        };
        assert_eq!((index, expected), (0, 1));
    }

    #[test]
    fn replace_field_rewrites_blueprint() {
        let family = tree_family();
        let long = TypeTemplate::Const(Type::primitive(Primitive::Long));
        let replaced = family.template(0).find_field_or_type(
            &family,
            0,
            "value",
            &Type::primitive(Primitive::Int),
            &long,
        );
        let template = replaced.ok().unwrap();
        assert!(template.apply(&family, 0).to_string().contains("value: long"));
    }

    #[test]
    fn replace_field_with_wrong_focus_is_hard_error() {
        let family = tree_family();
        let replaced = family.template(0).find_field_or_type(
            &family,
            0,
            "value",
            &Type::primitive(Primitive::String),
            &int(),
        );
        assert!(matches!(
            replaced,
            Recoverable::Err {
                error: FieldNotFound::WrongType { .. },
                ..
            }
        ));
    }

    #[test]
    fn hmap_lifts_changes_to_every_reference() {
        let family = tree_family();
        let result = family.template(0).hmap(&family, 0, &|j| {
            RewriteResult::new(
                View::new(family.point(j), family.point(j), Conversion::Recurse(j)),
                RecursionSet::new(),
            )
        });
        assert!(result.recursion.contains(0));
        assert_eq!(
            result.view.function,
            Conversion::lift(
                vec![Step::Second, Step::Elements],
                Conversion::Recurse(0)
            )
        );
    }
}
