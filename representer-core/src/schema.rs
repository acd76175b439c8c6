use std::sync::Arc;

use indexmap::IndexMap;

use crate::definition::{Definition, Wrap};
use crate::error::SchemaError;
use crate::options::Options;

/// Ordered, name-unique set of property definitions.
///
/// Declaring a name that already exists replaces its definition in place:
/// the property keeps the position of its first declaration. The same rule
/// applies when deriving from or merging with another schema, so a property
/// declared several times along an inheritance chain ends up as exactly one
/// definition, the most specific one, at its original position.
///
/// Definitions are shared (`Arc`) between a schema and the schemas derived
/// from it. Deriving copies the ordered list, never the definitions.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    definitions: IndexMap<String, Arc<Definition>>,
    wrap: Option<String>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a schema from definitions in declaration order.
    pub fn record(definitions: impl IntoIterator<Item = Definition>) -> Self {
        let mut schema = Schema::new();
        for definition in definitions {
            schema.insert(definition);
        }
        schema
    }

    /// Like [`record`](Self::record), but rejects malformed definitions.
    pub fn try_record(definitions: impl IntoIterator<Item = Definition>) -> Result<Self, SchemaError> {
        let mut schema = Schema::new();
        for definition in definitions {
            schema.declare(definition)?;
        }
        Ok(schema)
    }

    /// Adds or overrides a property.
    pub fn property(mut self, definition: Definition) -> Self {
        self.insert(definition);
        self
    }

    /// Sets the document-level wrap.
    pub fn wrapped(mut self, name: impl Into<String>) -> Self {
        self.wrap = Some(name.into());
        self
    }

    /// Inserts a definition, returning the one it replaced.
    ///
    /// No validation happens here; the engine checks the schema with
    /// [`validate`](Self::validate) before every call.
    pub fn insert(&mut self, definition: Definition) -> Option<Arc<Definition>> {
        let definition = Arc::new(definition);
        // IndexMap keeps an existing key at its index and only swaps the value.
        self.definitions
            .insert(definition.name().to_string(), definition)
    }

    /// Like [`insert`](Self::insert), but rejects malformed definitions.
    pub fn declare(&mut self, definition: Definition) -> Result<Option<Arc<Definition>>, SchemaError> {
        if definition.name().is_empty() {
            return Err(SchemaError::EmptyName);
        }
        Ok(self.insert(definition))
    }

    /// Checks that every declared property has a name.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.definitions.contains_key("") {
            return Err(SchemaError::EmptyName);
        }
        Ok(())
    }

    /// Starts a child schema: a copy of this one to be extended or overridden.
    pub fn derive(&self) -> Schema {
        self.clone()
    }

    /// Composes `other` into this schema.
    ///
    /// New names are appended in `other`'s order; existing names take
    /// `other`'s definition at their current position. The document-level
    /// wrap of `self` wins when both have one.
    pub fn merge(mut self, other: &Schema) -> Self {
        for (name, definition) in &other.definitions {
            self.definitions.insert(name.clone(), Arc::clone(definition));
        }
        if self.wrap.is_none() {
            self.wrap = other.wrap.clone();
        }
        self
    }

    /// Looks up a declared property.
    pub fn definition(&self, name: &str) -> Result<&Arc<Definition>, SchemaError> {
        self.definitions
            .get(name)
            .ok_or_else(|| SchemaError::Undeclared(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Definition>> {
        self.definitions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Property names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    /// Definitions in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Definition>> {
        self.definitions.values()
    }

    pub fn wrap(&self) -> Option<&str> {
        self.wrap.as_deref()
    }

    /// Resolves the document-level wrap for one call.
    ///
    /// A `wrap` in the options wins: a name replaces the schema's wrap and
    /// `false` disables it. Without one, the schema's own wrap applies.
    pub fn wrap_for(&self, options: &Options) -> Option<String> {
        match options.wrap_override() {
            Some(Wrap::Name(name)) => Some(name),
            Some(Wrap::Disabled) => None,
            None => self.wrap.clone(),
        }
    }
}

impl<'a> IntoIterator for &'a Schema {
    type Item = &'a Arc<Definition>;
    type IntoIter = indexmap::map::Values<'a, String, Arc<Definition>>;

    fn into_iter(self) -> Self::IntoIter {
        self.definitions.values()
    }
}
