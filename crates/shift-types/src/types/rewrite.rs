//! Traversal strategies over a [`Type`]

use tracing::trace;

use super::{Type, TypeKind};
use crate::conversion::Conversion;
use crate::family::{FixpointMemo, RecursiveTypeFamily};
use crate::optic::Step;
use crate::optimizer::Optimizer;
use crate::rule::RewriteRule;
use crate::template::TypeTemplate;
use crate::view::{RecursionSet, RewriteResult, View};

/// Child of a node as seen by a traversal
#[derive(Clone, Copy)]
pub(crate) enum Child<'a> {
    /// Ordinary sub-type
    Type(&'a Type),
    /// Recursion point into a family
    Point(&'a RecursiveTypeFamily, usize),
}

impl Type {
    /// Children together with the data path leading to each
    ///
    /// Transparent wrappers have a single child behind an empty path.
    pub(crate) fn child_paths(&self) -> Vec<(Vec<Step>, &Type)> {
        match self.kind() {
            TypeKind::Primitive(_) | TypeKind::RecursivePoint { .. } => Vec::new(),
            TypeKind::Product(a, b) => vec![(vec![Step::First], a), (vec![Step::Second], b)],
            TypeKind::Sum(a, b) => vec![(vec![Step::Left], a), (vec![Step::Right], b)],
            TypeKind::List(a) => vec![(vec![Step::Elements], a)],
            TypeKind::CompoundList(k, v) => vec![
                (vec![Step::Elements, Step::First], k),
                (vec![Step::Elements, Step::Second], v),
            ],
            TypeKind::TaggedChoice { alternatives, .. } => alternatives
                .iter()
                .map(|(key, ty)| (vec![Step::Tag(key.clone())], ty))
                .collect(),
            TypeKind::Named(_, a)
            | TypeKind::Field(_, a)
            | TypeKind::Hook(a, _)
            | TypeKind::Check { delegate: a, .. } => vec![(Vec::new(), a)],
        }
    }

    /// Rewrite every child with `f`, declining if `f` declines any child
    pub(crate) fn all_with(
        &self,
        f: &mut dyn FnMut(Child<'_>) -> Option<RewriteResult>,
        check_index: bool,
    ) -> Option<RewriteResult> {
        if let TypeKind::Check {
            index, expected, ..
        } = self.kind()
        {
            if check_index && index != expected {
                return Some(RewriteResult::nop(self.clone()));
            }
        }
        let mut parts = Vec::new();
        for (path, child) in self.child_paths() {
            let result = match child.kind() {
                TypeKind::RecursivePoint { family, index } => f(Child::Point(family, *index)),
                _ => f(Child::Type(child)),
            }?;
            parts.push((path, result));
        }
        Some(self.combine(parts))
    }

    fn combine(&self, parts: Vec<(Vec<Step>, RewriteResult)>) -> RewriteResult {
        if parts.iter().all(|(_, r)| r.is_nop()) {
            return RewriteResult::nop(self.clone());
        }
        let to = self.with_children(parts.iter().map(|(_, r)| r.view.to.clone()));
        let recursion = parts
            .iter()
            .fold(RecursionSet::new(), |acc, (_, r)| acc.union(&r.recursion));
        let function = Conversion::compose(
            parts
                .into_iter()
                .map(|(path, r)| Conversion::lift(path, r.view.function))
                .collect(),
        );
        RewriteResult::new(View::new(self.clone(), to, function), recursion)
    }

    /// Rewrite every child with `rule`
    ///
    /// Children the rule declines are left unchanged. With `recurse` set, a
    /// recursion point child is rewritten across its whole family.
    #[must_use]
    pub fn all(&self, rule: &RewriteRule, recurse: bool, check_index: bool) -> RewriteResult {
        let result = self.all_with(
            &mut |child| {
                let rewritten = match child {
                    Child::Type(ty) => rule.rewrite(ty),
                    Child::Point(family, index) if recurse => {
                        family.everywhere(index, rule, Optimizer::default())
                    }
                    Child::Point(family, index) => rule.rewrite(&family.point(index)),
                };
                Some(rewritten.unwrap_or_else(|| match child {
                    Child::Type(ty) => RewriteResult::nop(ty.clone()),
                    Child::Point(family, index) => RewriteResult::nop(family.point(index)),
                }))
            },
            check_index,
        );
        result.unwrap_or_else(|| RewriteResult::nop(self.clone()))
    }

    /// Rewrite the first child `rule` accepts
    #[must_use]
    pub fn one(&self, rule: &RewriteRule) -> Option<RewriteResult> {
        let children = self.child_paths();
        let (position, rewritten) = children
            .iter()
            .enumerate()
            .find_map(|(i, (_, child))| rule.rewrite(child).map(|r| (i, r)))?;
        let mut rewritten = Some(rewritten);
        let parts = children
            .into_iter()
            .enumerate()
            .map(|(i, (path, child))| {
                let result = match rewritten.take() {
                    Some(r) if i == position => r,
                    other => {
                        rewritten = other;
                        RewriteResult::nop(child.clone())
                    }
                };
                (path, result)
            })
            .collect();
        Some(self.combine(parts))
    }

    /// Apply `rule` bottom-up at every node
    ///
    /// Nodes the rule declines keep their rewritten children. With `recurse`
    /// set, recursion points are rewritten across their whole family, once
    /// per family.
    #[must_use]
    pub fn everywhere(
        &self,
        rule: &RewriteRule,
        optimizer: Optimizer,
        recurse: bool,
        check_index: bool,
    ) -> RewriteResult {
        let mut memo = FixpointMemo::new();
        self.everywhere_in(rule, optimizer, recurse, check_index, &mut memo)
    }

    fn everywhere_in(
        &self,
        rule: &RewriteRule,
        optimizer: Optimizer,
        recurse: bool,
        check_index: bool,
        memo: &mut FixpointMemo,
    ) -> RewriteResult {
        let children = self
            .all_with(
                &mut |child| match child {
                    Child::Type(ty) => Some(ty.everywhere_in(rule, optimizer, recurse, check_index, memo)),
                    Child::Point(family, index) => {
                        if !recurse {
                            return Some(RewriteResult::nop(family.point(index)));
                        }
                        let fixpoint = match memo.get(family) {
                            Some(known) => known.clone(),
                            None => {
                                trace!(family = %family.name(), "computing family fixpoint");
                                let computed = family.fixpoint(rule, optimizer, check_index);
                                memo.insert(family.clone(), computed.clone());
                                computed
                            }
                        };
                        Some(match fixpoint {
                            Some(fixpoint) => fixpoint.point_result(family, index),
                            None => RewriteResult::nop(family.point(index)),
                        })
                    }
                },
                check_index,
            )
            .unwrap_or_else(|| RewriteResult::nop(self.clone()));
        let at_node = rule
            .rewrite(&children.view.to)
            .unwrap_or_else(|| RewriteResult::nop(children.view.to.clone()));
        at_node.compose(&children).optimize(optimizer)
    }

    /// Template of this type with every recursion point turned back into a
    /// bare index
    #[must_use]
    pub fn build_template(&self) -> TypeTemplate {
        match self.kind() {
            TypeKind::Primitive(_) => TypeTemplate::Const(self.clone()),
            TypeKind::Product(a, b) => TypeTemplate::product(a.build_template(), b.build_template()),
            TypeKind::Sum(a, b) => TypeTemplate::sum(a.build_template(), b.build_template()),
            TypeKind::List(a) => TypeTemplate::list(a.build_template()),
            TypeKind::CompoundList(k, v) => {
                TypeTemplate::compound_list(k.build_template(), v.build_template())
            }
            TypeKind::TaggedChoice {
                name,
                key_type,
                alternatives,
            } => TypeTemplate::TaggedChoice {
                name: name.clone(),
                key_type: key_type.clone(),
                alternatives: alternatives
                    .iter()
                    .map(|(k, t)| (k.clone(), t.build_template()))
                    .collect(),
            },
            TypeKind::Named(n, a) => TypeTemplate::named(n.clone(), a.build_template()),
            TypeKind::Field(n, a) => TypeTemplate::field(n.clone(), a.build_template()),
            TypeKind::Check {
                name,
                expected,
                delegate,
                ..
            } => TypeTemplate::Check {
                name: name.clone(),
                index: *expected,
                element: Box::new(delegate.build_template()),
            },
            TypeKind::Hook(a, hook) => TypeTemplate::Hook(Box::new(a.build_template()), hook.clone()),
            TypeKind::RecursivePoint { index, .. } => TypeTemplate::RecursivePoint(*index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Primitive;
    use crate::data::Data;
    use pretty_assertions::assert_eq;

    fn int() -> Type {
        Type::primitive(Primitive::Int)
    }

    fn string() -> Type {
        Type::primitive(Primitive::String)
    }

    fn stringify() -> RewriteResult {
        RewriteResult::new(
            View::new(
                int(),
                string(),
                Conversion::function("stringify", |d| {
                    Ok(Data::String(d.as_i64().unwrap_or(0).to_string()))
                }),
            ),
            RecursionSet::new(),
        )
    }

    #[test]
    fn one_declines_without_match() {
        let ty = Type::product(string(), string());
        assert!(ty.one(&RewriteRule::if_same(int(), stringify())).is_none());
    }

    #[test]
    fn all_leaves_declined_children() {
        let ty = Type::sum(int(), string());
        let result = ty.all(&RewriteRule::if_same(int(), stringify()), false, true);
        assert_eq!(result.view.to, Type::sum(string(), string()));
        assert_eq!(
            result.view.apply(Data::right(Data::String("x".into()))).unwrap(),
            Data::right(Data::String("x".into()))
        );
        assert_eq!(
            result.view.apply(Data::left(Data::Int(7))).unwrap(),
            Data::left(Data::String("7".into()))
        );
    }

    #[test]
    fn everywhere_with_nop_rule_is_nop() {
        let ty = Type::named("Box", Type::product(Type::field("x", int()), Type::remainder()));
        let result = ty.everywhere(&RewriteRule::or_else(RewriteRule::nop(), RewriteRule::nop()), Optimizer::Fuse, true, true);
        assert!(result.is_nop());
    }

    #[test]
    fn failing_check_is_skipped() {
        let guarded = Type::check("kind", 0, 1, int());
        let result = guarded.everywhere(
            &RewriteRule::or_else(RewriteRule::if_same(int(), stringify()), RewriteRule::nop()),
            Optimizer::Fuse,
            true,
            true,
        );
        assert!(result.is_nop());
        let open = Type::check("kind", 1, 1, int());
        let result = open.everywhere(
            &RewriteRule::or_else(RewriteRule::if_same(int(), stringify()), RewriteRule::nop()),
            Optimizer::Fuse,
            true,
            true,
        );
        assert_eq!(result.view.to, Type::check("kind", 1, 1, string()));
    }

    #[test]
    fn template_round_trips_through_family() {
        let template = TypeTemplate::named(
            "Node",
            TypeTemplate::product(
                TypeTemplate::field("id", TypeTemplate::Const(int())),
                TypeTemplate::field("next", TypeTemplate::sum(TypeTemplate::RecursivePoint(0), TypeTemplate::Const(Type::unit()))),
            ),
        );
        let family = RecursiveTypeFamily::new("list", vec![template.clone()]);
        assert_eq!(family.apply(0).build_template(), template);
    }
}
