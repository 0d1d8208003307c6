//! Versioned schemas
//!
//! A [`Schema`] names the types of one data version. Its types live in a
//! single recursive family, so any type may reference any other (or itself)
//! by name through [`SchemaBuilder::id`].

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::dsl;
use crate::error::SchemaError;
use crate::family::RecursiveTypeFamily;
use crate::template::TypeTemplate;
use crate::types::Type;

/// Version key for a version and sub-version
#[inline]
#[must_use]
pub const fn make_key(version: u32, sub_version: u32) -> u32 {
    version * 10 + sub_version
}

/// Version part of a key
#[inline]
#[must_use]
pub const fn key_version(key: u32) -> u32 {
    key / 10
}

/// Sub-version part of a key
#[inline]
#[must_use]
pub const fn key_sub_version(key: u32) -> u32 {
    key % 10
}

/// Type table of one data version
#[derive(Debug)]
pub struct Schema {
    version_key: u32,
    parent: Option<Arc<Schema>>,
    names: IndexMap<String, usize>,
    family: RecursiveTypeFamily,
}

impl Schema {
    /// Version key
    #[inline]
    #[must_use]
    pub fn version_key(&self) -> u32 {
        self.version_key
    }

    /// Schema this one was derived from
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<&Arc<Schema>> {
        self.parent.as_ref()
    }

    /// Family holding every type of the schema
    #[inline]
    #[must_use]
    pub fn family(&self) -> &RecursiveTypeFamily {
        &self.family
    }

    /// Registered type names, in registration order
    pub fn types(&self) -> impl Iterator<Item = &str> + '_ {
        self.names.keys().map(String::as_str)
    }

    /// Family index of a type name
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.get(name).copied()
    }

    /// Check for a type name
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Resolved type for a name
    pub fn get_type(&self, name: &str) -> Result<Type, SchemaError> {
        self.index_of(name)
            .map(|index| self.family.apply(index))
            .ok_or_else(|| SchemaError::UnknownType {
                name: name.to_string(),
                version: self.version_key,
            })
    }
}

/// Incremental schema construction
///
/// # Example
///
/// ```rust
/// use shift_types::dsl::*;
/// use shift_types::SchemaBuilder;
///
/// let mut builder = SchemaBuilder::new(10);
/// let tree = builder.id("Tree");
/// builder.register("Tree", all_with_remainder([
///     field("value", int_type()),
///     field("children", list(tree)),
/// ]));
/// let schema = builder.build().unwrap();
/// assert!(schema.get_type("Tree").is_ok());
/// ```
#[derive(Debug)]
pub struct SchemaBuilder {
    version_key: u32,
    parent: Option<Arc<Schema>>,
    names: IndexMap<String, usize>,
    templates: Vec<Option<TypeTemplate>>,
}

impl SchemaBuilder {
    /// Empty schema
    #[must_use]
    pub fn new(version_key: u32) -> Self {
        Self {
            version_key,
            parent: None,
            names: IndexMap::new(),
            templates: Vec::new(),
        }
    }

    /// Start from every type of `parent`
    ///
    /// Inherited types keep their family indices, so recursion points of
    /// unchanged types line up across versions.
    #[must_use]
    pub fn from_parent(version_key: u32, parent: &Arc<Schema>) -> Self {
        Self {
            version_key,
            parent: Some(Arc::clone(parent)),
            names: parent.names.clone(),
            templates: parent
                .family
                .templates()
                .iter()
                .cloned()
                .map(Some)
                .collect(),
        }
    }

    /// Reference to a type by name, defined now or later
    pub fn id(&mut self, name: &str) -> TypeTemplate {
        dsl::id(self.index(name))
    }

    /// Define or redefine a type
    pub fn register(&mut self, name: &str, template: TypeTemplate) -> &mut Self {
        let index = self.index(name);
        self.templates[index] = Some(dsl::named(name, template));
        self
    }

    /// Resolve every reference
    pub fn build(self) -> Result<Schema, SchemaError> {
        let mut templates = Vec::with_capacity(self.templates.len());
        for (name, &index) in &self.names {
            match &self.templates[index] {
                Some(template) => templates.push((index, template.clone())),
                None => {
                    return Err(SchemaError::UndefinedReference {
                        name: name.clone(),
                        version: self.version_key,
                    })
                }
            }
        }
        templates.sort_by_key(|(index, _)| *index);
        debug!(version = self.version_key, types = templates.len(), "built schema");
        Ok(Schema {
            version_key: self.version_key,
            parent: self.parent,
            family: RecursiveTypeFamily::new(
                format!("schema-{}", self.version_key),
                templates.into_iter().map(|(_, t)| t).collect(),
            ),
            names: self.names,
        })
    }

    fn index(&mut self, name: &str) -> usize {
        if let Some(&index) = self.names.get(name) {
            return index;
        }
        let index = self.templates.len();
        self.names.insert(name.to_string(), index);
        self.templates.push(None);
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::*;
    use crate::types::TypeKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn version_keys() {
        assert_eq!(make_key(1, 0), 10);
        assert_eq!(make_key(3, 2), 32);
        assert_eq!((key_version(32), key_sub_version(32)), (3, 2));
    }

    #[test]
    fn undefined_reference_fails_build() {
        let mut builder = SchemaBuilder::new(10);
        let missing = builder.id("Missing");
        builder.register("Holder", fields([("x", missing)]));
        assert_eq!(
            builder.build().unwrap_err(),
            SchemaError::UndefinedReference {
                name: "Missing".into(),
                version: 10
            }
        );
    }

    #[test]
    fn unknown_type_lookup() {
        let schema = SchemaBuilder::new(10).build().unwrap();
        assert!(matches!(
            schema.get_type("Nope"),
            Err(SchemaError::UnknownType { version: 10, .. })
        ));
    }

    #[test]
    fn child_inherits_and_overrides() {
        let mut builder = SchemaBuilder::new(10);
        builder
            .register("A", fields([("x", int_type())]))
            .register("B", fields([("y", int_type())]));
        let parent = Arc::new(builder.build().unwrap());

        let mut child = SchemaBuilder::from_parent(20, &parent);
        child.register("B", fields([("y", long_type())]));
        let child = child.build().unwrap();

        assert_eq!(child.types().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(child.get_type("A").unwrap(), parent.get_type("A").unwrap());
        assert_ne!(child.get_type("B").unwrap(), parent.get_type("B").unwrap());
        assert_eq!(child.parent().map(|p| p.version_key()), Some(10));
        let TypeKind::Named(name, _) = child.get_type("B").unwrap().kind().clone() else {
            panic!("registered types are named");
        };
        assert_eq!(name, "B");
    }
}
