//! Structural types
//!
//! A [`Type`] describes the shape of a serialized value. Types are immutable
//! trees behind an `Arc`, compared and hashed structurally, so equal shapes
//! built independently are interchangeable as cache keys.

mod codec;
mod rewrite;
mod search;

use std::collections::BTreeMap;
use std::fmt::{self, Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use shift_dynamic::Value;

use crate::codec::Primitive;
use crate::family::RecursiveTypeFamily;

pub use codec::{ReadOptions, TagPolicy};

/// Value transform run around a hooked type
pub type HookFn = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Named pair of value transforms applied before reading and after writing
///
/// Hooks are identified by name: two hooks with the same name are assumed to
/// perform the same transforms.
#[derive(Clone)]
pub struct Hook {
    name: Arc<str>,
    pre_read: HookFn,
    post_write: HookFn,
}

impl Hook {
    /// Create a hook
    pub fn new(
        name: impl Into<Arc<str>>,
        pre_read: impl Fn(Value) -> Value + Send + Sync + 'static,
        post_write: impl Fn(Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            pre_read: Arc::new(pre_read),
            post_write: Arc::new(post_write),
        }
    }

    /// Hook name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Transform a value before it is read
    #[inline]
    #[must_use]
    pub fn pre_read(&self, value: Value) -> Value {
        (self.pre_read)(value)
    }

    /// Transform a value after it was written
    #[inline]
    #[must_use]
    pub fn post_write(&self, value: Value) -> Value {
        (self.post_write)(value)
    }
}

impl PartialEq for Hook {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Hook {}

impl Hash for Hook {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl Debug for Hook {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Hook({})", self.name)
    }
}

/// Node kinds of a [`Type`]
#[derive(Clone)]
pub enum TypeKind {
    /// Leaf codec
    Primitive(Primitive),
    /// Two required parts, in order
    Product(Type, Type),
    /// Either of two parts
    Sum(Type, Type),
    /// Homogeneous sequence
    List(Type),
    /// Map with typed keys and values
    CompoundList(Type, Type),
    /// A key stored under `name` selects one alternative
    TaggedChoice {
        /// Map key holding the discriminator
        name: String,
        /// Type of the discriminator
        key_type: Type,
        /// Alternatives by rendered key
        alternatives: BTreeMap<String, Type>,
    },
    /// Nominal wrapper
    Named(String, Type),
    /// Sub-type stored under a map key
    Field(String, Type),
    /// Guard that only decodes when `index == expected`
    Check {
        /// Check name
        name: String,
        /// Family index the type was resolved at
        index: usize,
        /// Index the guard accepts
        expected: usize,
        /// Guarded type
        delegate: Type,
    },
    /// Sub-type with value transforms around it
    Hook(Type, Hook),
    /// Back-reference into a recursive family
    RecursivePoint {
        /// Owning family
        family: RecursiveTypeFamily,
        /// Index into the family
        index: usize,
    },
}

/// Immutable structural type
#[derive(Clone)]
pub struct Type(Arc<TypeKind>);

impl Type {
    /// Wrap a node
    #[inline]
    #[must_use]
    pub fn new(kind: TypeKind) -> Self {
        Self(Arc::new(kind))
    }

    /// Borrow the node
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &TypeKind {
        &self.0
    }

    /// Leaf type
    #[must_use]
    pub fn primitive(primitive: Primitive) -> Self {
        Self::new(TypeKind::Primitive(primitive))
    }

    /// Product type
    #[must_use]
    pub fn product(first: Type, second: Type) -> Self {
        Self::new(TypeKind::Product(first, second))
    }

    /// Sum type
    #[must_use]
    pub fn sum(left: Type, right: Type) -> Self {
        Self::new(TypeKind::Sum(left, right))
    }

    /// List type
    #[must_use]
    pub fn list(element: Type) -> Self {
        Self::new(TypeKind::List(element))
    }

    /// Compound list type
    #[must_use]
    pub fn compound_list(key: Type, value: Type) -> Self {
        Self::new(TypeKind::CompoundList(key, value))
    }

    /// Tagged choice type
    #[must_use]
    pub fn tagged_choice(
        name: impl Into<String>,
        key_type: Type,
        alternatives: BTreeMap<String, Type>,
    ) -> Self {
        Self::new(TypeKind::TaggedChoice {
            name: name.into(),
            key_type,
            alternatives,
        })
    }

    /// Named type
    #[must_use]
    pub fn named(name: impl Into<String>, inner: Type) -> Self {
        Self::new(TypeKind::Named(name.into(), inner))
    }

    /// Field type
    #[must_use]
    pub fn field(name: impl Into<String>, inner: Type) -> Self {
        Self::new(TypeKind::Field(name.into(), inner))
    }

    /// Check type
    #[must_use]
    pub fn check(name: impl Into<String>, index: usize, expected: usize, delegate: Type) -> Self {
        Self::new(TypeKind::Check {
            name: name.into(),
            index,
            expected,
            delegate,
        })
    }

    /// Hooked type
    #[must_use]
    pub fn hook(inner: Type, hook: Hook) -> Self {
        Self::new(TypeKind::Hook(inner, hook))
    }

    /// Recursion point
    #[must_use]
    pub fn recursive_point(family: RecursiveTypeFamily, index: usize) -> Self {
        Self::new(TypeKind::RecursivePoint { family, index })
    }

    /// Unit type
    #[must_use]
    pub fn unit() -> Self {
        Self::primitive(Primitive::Unit)
    }

    /// Remainder type
    #[must_use]
    pub fn remainder() -> Self {
        Self::primitive(Primitive::Remainder)
    }

    /// Check for the remainder leaf
    #[inline]
    #[must_use]
    pub fn is_remainder(&self) -> bool {
        matches!(self.kind(), TypeKind::Primitive(Primitive::Remainder))
    }

    /// Pointer identity
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Type) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Unfold a recursion point, or return the type itself
    #[must_use]
    pub fn unfold(&self) -> Type {
        match self.kind() {
            TypeKind::RecursivePoint { family, index } => family.apply(*index),
            _ => self.clone(),
        }
    }

    /// Structural equality
    ///
    /// With `ignore_recursion_points` set, recursion points compare by index
    /// alone, so types from a family and its rewritten successor match. With
    /// `check_indices` cleared, check guards ignore the index they were
    /// resolved at.
    #[must_use]
    pub fn equals(&self, other: &Type, ignore_recursion_points: bool, check_indices: bool) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        let eq = |a: &Type, b: &Type| a.equals(b, ignore_recursion_points, check_indices);
        match (self.kind(), other.kind()) {
            (TypeKind::Primitive(a), TypeKind::Primitive(b)) => a == b,
            (TypeKind::Product(a1, b1), TypeKind::Product(a2, b2))
            | (TypeKind::Sum(a1, b1), TypeKind::Sum(a2, b2))
            | (TypeKind::CompoundList(a1, b1), TypeKind::CompoundList(a2, b2)) => {
                eq(a1, a2) && eq(b1, b2)
            }
            (TypeKind::List(a), TypeKind::List(b)) => eq(a, b),
            (
                TypeKind::TaggedChoice {
                    name: n1,
                    key_type: k1,
                    alternatives: alts1,
                },
                TypeKind::TaggedChoice {
                    name: n2,
                    key_type: k2,
                    alternatives: alts2,
                },
            ) => {
                n1 == n2
                    && eq(k1, k2)
                    && alts1.len() == alts2.len()
                    && alts1
                        .iter()
                        .zip(alts2)
                        .all(|((ka, ta), (kb, tb))| ka == kb && eq(ta, tb))
            }
            (TypeKind::Named(n1, a), TypeKind::Named(n2, b))
            | (TypeKind::Field(n1, a), TypeKind::Field(n2, b)) => n1 == n2 && eq(a, b),
            (
                TypeKind::Check {
                    name: n1,
                    index: i1,
                    expected: e1,
                    delegate: d1,
                },
                TypeKind::Check {
                    name: n2,
                    index: i2,
                    expected: e2,
                    delegate: d2,
                },
            ) => n1 == n2 && e1 == e2 && (!check_indices || i1 == i2) && eq(d1, d2),
            (TypeKind::Hook(a, h1), TypeKind::Hook(b, h2)) => h1 == h2 && eq(a, b),
            (
                TypeKind::RecursivePoint {
                    family: f1,
                    index: i1,
                },
                TypeKind::RecursivePoint {
                    family: f2,
                    index: i2,
                },
            ) => i1 == i2 && (ignore_recursion_points || f1 == f2),
            _ => false,
        }
    }

    /// Shape-only equality, used while a rewrite is in progress
    #[inline]
    #[must_use]
    pub fn same_shape(&self, other: &Type) -> bool {
        self.equals(other, true, true)
    }

    /// Rebuild this node with new children, in the order [`Type::children`]
    /// yields them
    pub(crate) fn with_children(&self, mut children: impl Iterator<Item = Type>) -> Type {
        let mut next = |fallback: &Type| children.next().unwrap_or_else(|| fallback.clone());
        match self.kind() {
            TypeKind::Primitive(_) | TypeKind::RecursivePoint { .. } => self.clone(),
            TypeKind::Product(a, b) => Type::product(next(a), next(b)),
            TypeKind::Sum(a, b) => Type::sum(next(a), next(b)),
            TypeKind::List(a) => Type::list(next(a)),
            TypeKind::CompoundList(k, v) => Type::compound_list(next(k), next(v)),
            TypeKind::TaggedChoice {
                name,
                key_type,
                alternatives,
            } => Type::tagged_choice(
                name.clone(),
                key_type.clone(),
                alternatives
                    .iter()
                    .map(|(k, t)| (k.clone(), next(t)))
                    .collect(),
            ),
            TypeKind::Named(n, a) => Type::named(n.clone(), next(a)),
            TypeKind::Field(n, a) => Type::field(n.clone(), next(a)),
            TypeKind::Check {
                name,
                index,
                expected,
                delegate,
            } => Type::check(name.clone(), *index, *expected, next(delegate)),
            TypeKind::Hook(a, h) => Type::hook(next(a), h.clone()),
        }
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other, false, true)
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self.kind() {
            TypeKind::Primitive(p) => {
                0u8.hash(state);
                p.hash(state);
            }
            TypeKind::Product(a, b) => {
                1u8.hash(state);
                a.hash(state);
                b.hash(state);
            }
            TypeKind::Sum(a, b) => {
                2u8.hash(state);
                a.hash(state);
                b.hash(state);
            }
            TypeKind::List(a) => {
                3u8.hash(state);
                a.hash(state);
            }
            TypeKind::CompoundList(k, v) => {
                4u8.hash(state);
                k.hash(state);
                v.hash(state);
            }
            TypeKind::TaggedChoice {
                name,
                key_type,
                alternatives,
            } => {
                5u8.hash(state);
                name.hash(state);
                key_type.hash(state);
                alternatives.hash(state);
            }
            TypeKind::Named(n, a) => {
                6u8.hash(state);
                n.hash(state);
                a.hash(state);
            }
            TypeKind::Field(n, a) => {
                7u8.hash(state);
                n.hash(state);
                a.hash(state);
            }
            TypeKind::Check {
                name,
                index,
                expected,
                delegate,
            } => {
                8u8.hash(state);
                name.hash(state);
                index.hash(state);
                expected.hash(state);
                delegate.hash(state);
            }
            TypeKind::Hook(a, h) => {
                9u8.hash(state);
                h.hash(state);
                a.hash(state);
            }
            TypeKind::RecursivePoint { family, index } => {
                10u8.hash(state);
                family.hash(state);
                index.hash(state);
            }
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.kind() {
            TypeKind::Primitive(p) => write!(f, "{p}"),
            TypeKind::Product(a, b) => write!(f, "({a}, {b})"),
            TypeKind::Sum(a, b) => write!(f, "({a} | {b})"),
            TypeKind::List(a) => write!(f, "List[{a}]"),
            TypeKind::CompoundList(k, v) => write!(f, "CompoundList[{k}, {v}]"),
            TypeKind::TaggedChoice {
                name,
                key_type,
                alternatives,
            } => {
                write!(f, "TaggedChoice[{name}: {key_type}, {{")?;
                for (i, (key, ty)) in alternatives.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key} => {ty}")?;
                }
                write!(f, "}}]")
            }
            TypeKind::Named(n, a) => write!(f, "{n}={a}"),
            TypeKind::Field(n, a) => write!(f, "{n}: {a}"),
            TypeKind::Check {
                name,
                index,
                expected,
                delegate,
            } => write!(f, "Check[{name}, {index}/{expected}, {delegate}]"),
            TypeKind::Hook(a, h) => write!(f, "Hook[{}, {a}]", h.name()),
            TypeKind::RecursivePoint { family, index } => {
                write!(f, "Rec[{}#{index}]", family.name())
            }
        }
    }
}

impl Debug for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Type({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::TypeTemplate;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(ty: &Type) -> u64 {
        let mut hasher = DefaultHasher::new();
        ty.hash(&mut hasher);
        hasher.finish()
    }

    fn int() -> Type {
        Type::primitive(Primitive::Int)
    }

    #[test]
    fn independently_built_types_are_equal() {
        let a = Type::product(Type::field("x", int()), Type::remainder());
        let b = Type::product(Type::field("x", int()), Type::remainder());
        assert!(!a.ptr_eq(&b));
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn recursion_points_compare_by_family_unless_ignored() {
        let tree = TypeTemplate::list(TypeTemplate::RecursivePoint(0));
        let f1 = RecursiveTypeFamily::new("a", vec![tree.clone()]);
        let f2 = RecursiveTypeFamily::new("b", vec![tree]);
        let p1 = f1.point(0);
        let p2 = f2.point(0);
        assert_ne!(p1, p2);
        assert!(p1.same_shape(&p2));
    }

    #[test]
    fn check_index_is_optional_in_equality() {
        let a = Type::check("guard", 0, 1, int());
        let b = Type::check("guard", 2, 1, int());
        assert!(!a.equals(&b, false, true));
        assert!(a.equals(&b, false, false));
    }

    #[test]
    fn display_is_readable() {
        let ty = Type::named("Player", Type::product(Type::field("name", Type::primitive(Primitive::String)), Type::remainder()));
        assert_eq!(ty.to_string(), "Player=(name: string, remainder)");
    }
}
