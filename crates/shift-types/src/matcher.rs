//! Search predicates for [`Type::find_type`](crate::Type::find_type)

use std::fmt::{self, Display, Formatter};

use crate::error::FieldNotFound;
use crate::types::{Type, TypeKind};

/// What a search is looking for
#[derive(Debug, Clone, PartialEq)]
pub enum Matcher {
    /// A node shape-equal to the type
    Type(Type),
    /// A field by name, optionally of a given type
    Field {
        /// Field name
        name: String,
        /// Required field type, any type when unset
        ty: Option<Type>,
    },
    /// One alternative of a tagged choice
    Tag {
        /// Alternative key
        key: String,
        /// Required alternative type, any type when unset
        ty: Option<Type>,
    },
    /// The remainder leaf
    Remainder,
}

/// Result of testing a single node
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// The node is the focus
    Match,
    /// The node can never contain the focus
    Mismatch(FieldNotFound),
    /// Keep searching below the node
    Continue,
}

impl Matcher {
    /// Field of any type
    #[must_use]
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field {
            name: name.into(),
            ty: None,
        }
    }

    /// Field of a given type
    #[must_use]
    pub fn typed_field(name: impl Into<String>, ty: Type) -> Self {
        Self::Field {
            name: name.into(),
            ty: Some(ty),
        }
    }

    /// Tagged choice alternative of any type
    #[must_use]
    pub fn tag(key: impl Into<String>) -> Self {
        Self::Tag {
            key: key.into(),
            ty: None,
        }
    }

    /// Test a node
    #[must_use]
    pub fn test(&self, ty: &Type) -> MatchOutcome {
        match (self, ty.kind()) {
            (Self::Type(wanted), _) if ty.same_shape(wanted) => MatchOutcome::Match,
            (Self::Field { name, ty: wanted }, TypeKind::Field(n, inner)) if n == name => {
                match wanted {
                    Some(wanted) if !inner.same_shape(wanted) => {
                        MatchOutcome::Mismatch(FieldNotFound::WrongType {
                            name: name.clone(),
                            expected: wanted.to_string(),
                            found: inner.to_string(),
                        })
                    }
                    _ => MatchOutcome::Match,
                }
            }
            (
                Self::Tag { key, ty: wanted },
                TypeKind::TaggedChoice {
                    name, alternatives, ..
                },
            ) => match alternatives.get(key) {
                None => MatchOutcome::Mismatch(FieldNotFound::NoAlternative {
                    choice: name.clone(),
                    key: key.clone(),
                }),
                Some(found) => match wanted {
                    Some(wanted) if !found.same_shape(wanted) => {
                        MatchOutcome::Mismatch(FieldNotFound::WrongType {
                            name: key.clone(),
                            expected: wanted.to_string(),
                            found: found.to_string(),
                        })
                    }
                    _ => MatchOutcome::Continue,
                },
            },
            (Self::Remainder, _) if ty.is_remainder() => MatchOutcome::Match,
            _ => MatchOutcome::Continue,
        }
    }

    /// Human-readable description for miss reports
    #[must_use]
    pub fn describe(&self) -> String {
        self.to_string()
    }
}

impl Display for Matcher {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type(ty) => write!(f, "type {ty}"),
            Self::Field { name, ty: None } => write!(f, "field '{name}'"),
            Self::Field { name, ty: Some(ty) } => write!(f, "field '{name}' of type {ty}"),
            Self::Tag { key, .. } => write!(f, "alternative '{key}'"),
            Self::Remainder => write!(f, "remainder"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Primitive;
    use std::collections::BTreeMap;

    fn int() -> Type {
        Type::primitive(Primitive::Int)
    }

    #[test]
    fn field_by_name_and_type() {
        let field = Type::field("x", int());
        assert_eq!(Matcher::field("x").test(&field), MatchOutcome::Match);
        assert_eq!(Matcher::field("y").test(&field), MatchOutcome::Continue);
        assert!(matches!(
            Matcher::typed_field("x", Type::primitive(Primitive::String)).test(&field),
            MatchOutcome::Mismatch(FieldNotFound::WrongType { .. })
        ));
    }

    #[test]
    fn missing_alternative_is_a_hard_miss() {
        let mut alternatives = BTreeMap::new();
        alternatives.insert("a".to_string(), int());
        let choice = Type::tagged_choice("kind", Type::primitive(Primitive::String), alternatives);
        assert_eq!(Matcher::tag("a").test(&choice), MatchOutcome::Continue);
        assert!(matches!(
            Matcher::tag("b").test(&choice),
            MatchOutcome::Mismatch(FieldNotFound::NoAlternative { .. })
        ));
    }
}
