//! Rewrite rules
//!
//! A [`RewriteRule`] maps a type to a [`RewriteResult`], or declines. Rules
//! compose into strategies: sequences, alternatives, and traversals over
//! children or the whole tree.

use std::fmt::{self, Debug, Formatter};
use std::sync::{Arc, OnceLock};

use crate::optimizer::Optimizer;
use crate::types::Type;
use crate::view::RewriteResult;

type RuleFactory = Box<dyn Fn() -> RewriteRule + Send + Sync>;

/// Rule built on first use, for self-referential strategies
#[derive(Clone)]
pub struct LazyRule(Arc<LazyInner>);

struct LazyInner {
    rule: OnceLock<RewriteRule>,
    init: RuleFactory,
}

impl LazyRule {
    fn new(init: impl Fn() -> RewriteRule + Send + Sync + 'static) -> Self {
        Self(Arc::new(LazyInner {
            rule: OnceLock::new(),
            init: Box::new(init),
        }))
    }

    fn get(&self) -> &RewriteRule {
        self.0.rule.get_or_init(|| (self.0.init)())
    }
}

impl Debug for LazyRule {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.0.rule.get() {
            Some(rule) => write!(f, "Lazy({rule:?})"),
            None => f.write_str("Lazy(..)"),
        }
    }
}

/// Type rewriting strategy
#[derive(Debug, Clone)]
pub enum RewriteRule {
    /// Accepts every type and changes nothing
    Nop,
    /// Apply each rule to the output of the previous one; fails if any fails
    Seq(Arc<[RewriteRule]>),
    /// Try the first rule, falling back to the second
    OrElse(Arc<RewriteRule>, LazyRule),
    /// Rewrite the first child the rule accepts
    One(Arc<RewriteRule>),
    /// Rewrite every child
    All {
        /// Rule applied to each child
        rule: Arc<RewriteRule>,
        /// Descend into recursion points
        recurse: bool,
        /// Skip check guards that do not accept their index
        check_index: bool,
    },
    /// Rewrite bottom-up through the whole tree
    Everywhere {
        /// Rule applied at each node
        rule: Arc<RewriteRule>,
        /// Optimizer run after each node
        optimizer: Optimizer,
        /// Descend into recursion points
        recurse: bool,
        /// Skip check guards that do not accept their index
        check_index: bool,
    },
    /// Replace one exact type with a precomputed result
    IfSame {
        /// Type to match, by shape
        anchor: Type,
        /// Result for a match
        result: Arc<RewriteResult>,
    },
}

impl RewriteRule {
    /// Identity rule
    #[inline]
    #[must_use]
    pub fn nop() -> Self {
        Self::Nop
    }

    /// Sequence, flattening nested sequences and dropping no-ops
    #[must_use]
    pub fn seq(rules: impl IntoIterator<Item = RewriteRule>) -> Self {
        let mut flat = Vec::new();
        for rule in rules {
            match rule {
                Self::Nop => {}
                Self::Seq(inner) => flat.extend(inner.iter().cloned()),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Self::Nop,
            1 => flat.pop().unwrap_or(Self::Nop),
            _ => Self::Seq(flat.into()),
        }
    }

    /// `first`, or `second` when `first` declines
    #[must_use]
    pub fn or_else(first: RewriteRule, second: RewriteRule) -> Self {
        Self::OrElse(Arc::new(first), LazyRule::new(move || second.clone()))
    }

    /// `first`, or a fallback built when first needed
    #[must_use]
    pub fn or_else_lazy(
        first: RewriteRule,
        second: impl Fn() -> RewriteRule + Send + Sync + 'static,
    ) -> Self {
        Self::OrElse(Arc::new(first), LazyRule::new(second))
    }

    /// Rewrite the first accepting child
    #[must_use]
    pub fn one(rule: RewriteRule) -> Self {
        Self::One(Arc::new(rule))
    }

    /// Rewrite every child
    #[must_use]
    pub fn all(rule: RewriteRule, recurse: bool, check_index: bool) -> Self {
        Self::All {
            rule: Arc::new(rule),
            recurse,
            check_index,
        }
    }

    /// Rewrite the topmost nodes the rule accepts, trying children only
    /// where the node itself is declined
    #[must_use]
    pub fn once(rule: RewriteRule) -> Self {
        let fallback = rule.clone();
        Self::or_else_lazy(rule, move || Self::one(Self::once(fallback.clone())))
    }

    /// Rewrite bottom-up through the whole tree
    ///
    /// Nodes the rule declines are left unchanged.
    #[must_use]
    pub fn everywhere(rule: RewriteRule, optimizer: Optimizer, recurse: bool, check_index: bool) -> Self {
        Self::Everywhere {
            rule: Arc::new(Self::or_else(rule, Self::Nop)),
            optimizer,
            recurse,
            check_index,
        }
    }

    /// Match `anchor` by shape and return `result`
    #[must_use]
    pub fn if_same(anchor: Type, result: RewriteResult) -> Self {
        Self::IfSame {
            anchor,
            result: Arc::new(result),
        }
    }

    /// Apply the rule to `ty`
    #[must_use]
    pub fn rewrite(&self, ty: &Type) -> Option<RewriteResult> {
        match self {
            Self::Nop => Some(RewriteResult::nop(ty.clone())),
            Self::Seq(rules) => {
                let mut acc = RewriteResult::nop(ty.clone());
                for rule in rules.iter() {
                    let step = rule.rewrite(&acc.view.to)?;
                    acc = step.compose(&acc);
                }
                Some(acc)
            }
            Self::OrElse(first, second) => first.rewrite(ty).or_else(|| second.get().rewrite(ty)),
            Self::One(rule) => ty.one(rule),
            Self::All {
                rule,
                recurse,
                check_index,
            } => Some(ty.all(rule, *recurse, *check_index)),
            Self::Everywhere {
                rule,
                optimizer,
                recurse,
                check_index,
            } => Some(ty.everywhere(rule, *optimizer, *recurse, *check_index)),
            Self::IfSame { anchor, result } => {
                ty.same_shape(anchor).then(|| RewriteResult::clone(result))
            }
        }
    }
}
