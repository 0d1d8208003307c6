//! Locating sub-types and building optics to them

use std::collections::{BTreeMap, HashSet};

use shift_dynamic::Recoverable;

use super::{Type, TypeKind};
use crate::error::FieldNotFound;
use crate::family::RecursiveTypeFamily;
use crate::matcher::{MatchOutcome, Matcher};
use crate::optic::{Step, TypedOptic};

type Found = Recoverable<TypedOptic, FieldNotFound>;

impl Type {
    /// Depth-first search for the node `matcher` selects
    ///
    /// On success the optic's focus is the matched type and its focus target
    /// is `result`, or the focus itself when unset. `Miss` means nothing
    /// matched below this node; `Err` means the focus is definitely absent,
    /// for example a field of the right name but the wrong type.
    #[must_use]
    pub fn find_type(&self, matcher: &Matcher, result: Option<&Type>, recurse: bool) -> Found {
        let mut visiting = HashSet::new();
        self.find_in(matcher, result, recurse, &mut visiting)
    }

    /// Lens-or-weaker optic to the value of field `name`, of any type
    #[must_use]
    pub fn find_field(&self, name: &str) -> Found {
        self.find_type(&Matcher::field(name), None, false)
    }

    /// Field type of field `name`, if the field exists
    #[must_use]
    pub fn find_field_type(&self, name: &str) -> Option<Type> {
        self.find_field(name).ok().map(|optic| optic.focus().clone())
    }

    /// Same type with field `from` renamed to `to`
    ///
    /// Only the record spine is searched: products, sums and transparent
    /// wrappers. `None` when no such field exists.
    #[must_use]
    pub fn rename_field(&self, from: &str, to: &str) -> Option<Type> {
        match self.kind() {
            TypeKind::Field(name, inner) if name == from => Some(Type::field(to, inner.clone())),
            TypeKind::Product(a, b) => match a.rename_field(from, to) {
                Some(a) => Some(Type::product(a, b.clone())),
                None => b.rename_field(from, to).map(|b| Type::product(a.clone(), b)),
            },
            TypeKind::Sum(a, b) => match (a.rename_field(from, to), b.rename_field(from, to)) {
                (None, None) => None,
                (left, right) => Some(Type::sum(
                    left.unwrap_or_else(|| a.clone()),
                    right.unwrap_or_else(|| b.clone()),
                )),
            },
            TypeKind::Named(..) | TypeKind::Hook(..) | TypeKind::Check { .. } => {
                let inner = self.child_paths().pop()?.1.rename_field(from, to)?;
                Some(self.with_children(std::iter::once(inner)))
            }
            _ => None,
        }
    }

    fn find_in(
        &self,
        matcher: &Matcher,
        result: Option<&Type>,
        recurse: bool,
        visiting: &mut HashSet<(RecursiveTypeFamily, usize)>,
    ) -> Found {
        let miss = || Recoverable::Miss(FieldNotFound::NotFound(matcher.describe()));
        match matcher.test(self) {
            MatchOutcome::Mismatch(error) => return Recoverable::fail(error),
            MatchOutcome::Match => {
                return Recoverable::Ok(match self.kind() {
                    TypeKind::Field(name, inner) => {
                        let target = result.cloned().unwrap_or_else(|| inner.clone());
                        TypedOptic::identity(inner.clone(), target.clone())
                            .reroot(self.clone(), Type::field(name.clone(), target))
                    }
                    _ => TypedOptic::identity(self.clone(), result.cloned().unwrap_or_else(|| self.clone())),
                })
            }
            MatchOutcome::Continue => {}
        }
        let mut go = |ty: &Type| ty.find_in(matcher, result, recurse, visiting);
        match self.kind() {
            TypeKind::Primitive(_) => miss(),
            TypeKind::Product(a, b) => match go(a) {
                Recoverable::Ok(o) => {
                    let target = Type::product(o.target().clone(), b.clone());
                    Recoverable::Ok(o.behind(Step::First, self.clone(), target))
                }
                Recoverable::Miss(_) => go(b).map(|o| {
                    let target = Type::product(a.clone(), o.target().clone());
                    o.behind(Step::Second, self.clone(), target)
                }),
                err => err,
            },
            TypeKind::Sum(a, b) => match (go(a), go(b)) {
                (Recoverable::Ok(l), Recoverable::Ok(r)) => {
                    let target = Type::sum(l.target().clone(), r.target().clone());
                    Recoverable::Ok(TypedOptic::either(l, r, self.clone(), target))
                }
                (Recoverable::Ok(l), _) => {
                    let target = Type::sum(l.target().clone(), b.clone());
                    Recoverable::Ok(l.behind(Step::Left, self.clone(), target))
                }
                (_, Recoverable::Ok(r)) => {
                    let target = Type::sum(a.clone(), r.target().clone());
                    Recoverable::Ok(r.behind(Step::Right, self.clone(), target))
                }
                (err @ Recoverable::Err { .. }, _) | (_, err @ Recoverable::Err { .. }) => err,
                (miss, _) => miss,
            },
            TypeKind::List(element) => go(element).map(|o| {
                let target = Type::list(o.target().clone());
                o.behind(Step::Elements, self.clone(), target)
            }),
            TypeKind::CompoundList(key, value) => {
                let entry = Type::product(key.clone(), value.clone());
                let (step, found) = match go(key) {
                    Recoverable::Miss(_) => (Step::Second, go(value)),
                    found => (Step::First, found),
                };
                found.map(|o| {
                    let (k, v) = match step {
                        Step::First => (o.target().clone(), value.clone()),
                        _ => (key.clone(), o.target().clone()),
                    };
                    o.behind(step, entry, Type::product(k.clone(), v.clone()))
                        .behind(Step::Elements, self.clone(), Type::compound_list(k, v))
                })
            }
            TypeKind::TaggedChoice {
                name,
                key_type,
                alternatives,
            } => {
                let rebuild = |replaced: BTreeMap<String, Type>| {
                    let mut alternatives = alternatives.clone();
                    alternatives.extend(replaced);
                    Type::tagged_choice(name.clone(), key_type.clone(), alternatives)
                };
                if let Matcher::Tag { key, .. } = matcher {
                    // test() already rejected a missing key
                    let Some(alternative) = alternatives.get(key) else {
                        return miss();
                    };
                    let focus_target = result.cloned().unwrap_or_else(|| alternative.clone());
                    let target = rebuild(BTreeMap::from([(key.clone(), focus_target.clone())]));
                    return Recoverable::Ok(
                        TypedOptic::identity(alternative.clone(), focus_target).behind(
                            Step::Tag(key.clone()),
                            self.clone(),
                            target,
                        ),
                    );
                }
                let mut found = BTreeMap::new();
                let mut hard = None;
                for (key, alternative) in alternatives {
                    match go(alternative) {
                        Recoverable::Ok(o) => {
                            found.insert(key.clone(), o);
                        }
                        Recoverable::Err { error, .. } => {
                            hard.get_or_insert(error);
                        }
                        Recoverable::Miss(_) => {}
                    }
                }
                let targets = found
                    .iter()
                    .map(|(k, o)| (k.clone(), o.target().clone()))
                    .collect();
                let target = rebuild(targets);
                if found.len() == 1 {
                    let Some((key, optic)) = found.pop_first() else {
                        return miss();
                    };
                    return Recoverable::Ok(optic.behind(Step::Tag(key), self.clone(), target));
                }
                let total = found.len() == alternatives.len();
                match TypedOptic::branches(found, total, self.clone(), target) {
                    Some(optic) => Recoverable::Ok(optic),
                    None => hard.map_or_else(miss, Recoverable::fail),
                }
            }
            TypeKind::Named(n, inner) => go(inner).map(|o| {
                let target = Type::named(n.clone(), o.target().clone());
                o.reroot(self.clone(), target)
            }),
            TypeKind::Field(n, inner) => go(inner).map(|o| {
                let target = Type::field(n.clone(), o.target().clone());
                o.reroot(self.clone(), target)
            }),
            TypeKind::Check {
                name,
                index,
                expected,
                delegate,
            } => go(delegate).map(|o| {
                let target = Type::check(name.clone(), *index, *expected, o.target().clone());
                o.reroot(self.clone(), target)
            }),
            TypeKind::Hook(inner, hook) => go(inner).map(|o| {
                let target = Type::hook(o.target().clone(), hook.clone());
                o.reroot(self.clone(), target)
            }),
            TypeKind::RecursivePoint { family, index } => {
                let key = (family.clone(), *index);
                if !recurse || visiting.contains(&key) {
                    return miss();
                }
                visiting.insert(key.clone());
                let found = family
                    .apply(*index)
                    .find_in(matcher, result, recurse, visiting)
                    .map(|o| {
                        let target = o.target().clone();
                        o.reroot(self.clone(), target)
                    });
                visiting.remove(&key);
                found
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Primitive;
    use crate::data::Data;
    use crate::optic::Capability;
    use crate::template::TypeTemplate;
    use pretty_assertions::assert_eq;

    fn int() -> Type {
        Type::primitive(Primitive::Int)
    }

    fn string() -> Type {
        Type::primitive(Primitive::String)
    }

    fn player() -> Type {
        Type::named(
            "Player",
            Type::product(
                Type::field("name", string()),
                Type::product(Type::field("score", int()), Type::remainder()),
            ),
        )
    }

    #[test]
    fn field_in_product_is_a_lens() {
        let optic = player().find_field("score").ok().unwrap();
        assert_eq!(optic.capability(), Capability::Lens);
        assert_eq!(optic.path(), &[Step::Second, Step::First]);
        assert_eq!(optic.focus(), &int());
        let data = Data::pair(
            Data::String("ann".into()),
            Data::pair(Data::Int(3), Data::Dynamic(shift_dynamic::Value::empty_map())),
        );
        assert_eq!(optic.as_lens().unwrap().view(&data).unwrap(), Data::Int(3));
    }

    #[test]
    fn missing_field_is_soft_miss() {
        assert!(player().find_field("level").is_miss());
    }

    #[test]
    fn wrong_type_is_hard_miss() {
        let found = player().find_type(&Matcher::typed_field("score", string()), None, false);
        assert!(found.is_err());
    }

    #[test]
    fn result_type_rebuilds_target() {
        let long = Type::primitive(Primitive::Long);
        let optic = player()
            .find_type(&Matcher::field("score"), Some(&long), false)
            .ok()
            .unwrap();
        assert_eq!(optic.focus_target(), &long);
        assert_eq!(
            optic.target(),
            &Type::named(
                "Player",
                Type::product(
                    Type::field("name", string()),
                    Type::product(Type::field("score", long), Type::remainder()),
                ),
            )
        );
    }

    #[test]
    fn sum_with_both_branches_fans_out() {
        let ty = Type::sum(Type::field("x", int()), Type::product(Type::field("x", int()), Type::unit()));
        let optic = ty.find_field("x").ok().unwrap();
        assert!(matches!(optic.path(), [Step::Either(..)]));
    }

    #[test]
    fn tagged_choice_partial_cover_is_affine() {
        let alternatives = BTreeMap::from([
            ("a".to_string(), Type::field("x", int())),
            ("b".to_string(), Type::field("x", int())),
            ("c".to_string(), Type::unit()),
        ]);
        let choice = Type::tagged_choice("kind", string(), alternatives);
        let optic = choice.find_field("x").ok().unwrap();
        assert_eq!(optic.capability(), Capability::Affine);
    }

    #[test]
    fn tag_matcher_focuses_one_alternative() {
        let alternatives = BTreeMap::from([
            ("a".to_string(), int()),
            ("b".to_string(), string()),
        ]);
        let choice = Type::tagged_choice("kind", string(), alternatives);
        let optic = choice.find_type(&Matcher::tag("b"), None, false).ok().unwrap();
        assert_eq!(optic.path(), &[Step::Tag("b".into())]);
        assert_eq!(optic.focus(), &string());
        assert!(choice.find_type(&Matcher::tag("z"), None, false).is_err());
    }

    #[test]
    fn recursion_points_are_searched_once() {
        let family = RecursiveTypeFamily::new(
            "chain",
            vec![TypeTemplate::product(
                TypeTemplate::field("next", TypeTemplate::list(TypeTemplate::RecursivePoint(0))),
                TypeTemplate::Const(Type::remainder()),
            )],
        );
        let ty = family.apply(0);
        assert!(ty.find_field("missing").is_miss());
        assert!(ty
            .find_type(&Matcher::field("missing"), None, true)
            .is_miss());
    }

    #[test]
    fn rename_walks_the_spine() {
        let renamed = player().rename_field("score", "points").unwrap();
        assert!(renamed.find_field("points").is_ok());
        assert!(renamed.find_field("score").is_miss());
        assert!(player().rename_field("level", "x").is_none());
    }
}
