use std::fmt;
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::SchemaError;
use crate::evaluate::{Callable, EvalContext, OptionValue};
use crate::represented::Represented;
use crate::schema::Schema;
use crate::MappingError;

/// Enclosing key (or element) placed around a document's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Wrap {
    /// Wrap content in the named key.
    Name(String),
    /// Suppress any wrap the nested schema would otherwise apply.
    Disabled,
}

impl Wrap {
    /// Option-bag encoding: a string for a name, `false` when disabled.
    pub fn to_value(&self) -> Value {
        match self {
            Wrap::Name(name) => Value::String(name.clone()),
            Wrap::Disabled => Value::Bool(false),
        }
    }

    /// Reads the option-bag encoding back. Anything else is not a wrap.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(name) => Some(Wrap::Name(name.clone())),
            Value::Bool(false) => Some(Wrap::Disabled),
            _ => None,
        }
    }
}

/// Reference from a definition to the schema of its nested value.
///
/// References exist in two states:
/// - **Fixed**: points at an already built schema
/// - **Deferred**: holds the schema builder of a type and builds on first use
///
/// Deferred references let a type refer to itself (trees, linked lists)
/// without building an infinite schema up front.
#[derive(Clone)]
pub enum SchemaRef {
    Fixed(Arc<Schema>),
    Deferred {
        build: fn() -> Schema,
        cell: OnceLock<Arc<Schema>>,
    },
}

impl SchemaRef {
    pub fn new(schema: Schema) -> Self {
        SchemaRef::Fixed(Arc::new(schema))
    }

    pub fn deferred(build: fn() -> Schema) -> Self {
        SchemaRef::Deferred {
            build,
            cell: OnceLock::new(),
        }
    }

    /// Returns true if the referenced schema has been built.
    pub fn is_resolved(&self) -> bool {
        match self {
            SchemaRef::Fixed(_) => true,
            SchemaRef::Deferred { cell, .. } => cell.get().is_some(),
        }
    }

    /// Returns the referenced schema, building and caching it if necessary.
    pub fn resolve(&self) -> Arc<Schema> {
        match self {
            SchemaRef::Fixed(schema) => Arc::clone(schema),
            SchemaRef::Deferred { build, cell } => Arc::clone(cell.get_or_init(|| Arc::new(build()))),
        }
    }
}

impl fmt::Debug for SchemaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaRef::Fixed(schema) => f.debug_tuple("Fixed").field(schema).finish(),
            // Do not resolve here: a self-referential schema would print forever.
            SchemaRef::Deferred { cell, .. } => f
                .debug_struct("Deferred")
                .field("resolved", &cell.get().is_some())
                .finish(),
        }
    }
}

/// Immutable description of one mapped property.
///
/// `format_options` is opaque to the engine. Only the format's bindings read
/// it, usually through [`Context::evaluate`](crate::Context::evaluate).
#[derive(Debug, Clone)]
pub struct Definition {
    name: String,
    wrap: Option<Wrap>,
    nested: Option<SchemaRef>,
    format_options: IndexMap<String, OptionValue>,
}

impl Definition {
    pub fn new(name: impl Into<String>) -> Self {
        Definition {
            name: name.into(),
            wrap: None,
            nested: None,
            format_options: IndexMap::new(),
        }
    }

    /// Wraps the nested representation of this property in `name`.
    pub fn wrapped(mut self, name: impl Into<String>) -> Self {
        self.wrap = Some(Wrap::Name(name.into()));
        self
    }

    /// Disables the nested schema's own wrap for this property.
    pub fn unwrapped(mut self) -> Self {
        self.wrap = Some(Wrap::Disabled);
        self
    }

    /// Maps this property through `schema`.
    pub fn nested(mut self, schema: Schema) -> Self {
        self.nested = Some(SchemaRef::new(schema));
        self
    }

    /// Maps this property through the schema produced by `build`, built lazily.
    pub fn nested_deferred(mut self, build: fn() -> Schema) -> Self {
        self.nested = Some(SchemaRef::deferred(build));
        self
    }

    /// Sets a static format option.
    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.format_options
            .insert(key.into(), OptionValue::Static(value.into()));
        self
    }

    /// Sets a format option evaluated per call from an [`EvalContext`].
    pub fn option_fn<F>(mut self, key: impl Into<String>, f: F) -> Self
    where
        F: Fn(&EvalContext<'_>) -> Result<Value, MappingError> + Send + Sync + 'static,
    {
        self.format_options
            .insert(key.into(), OptionValue::Callable(Callable::Context(Arc::new(f))));
        self
    }

    /// Sets a format option using the positional calling convention.
    ///
    /// Only the legacy evaluator accepts these.
    pub fn option_positional<F>(mut self, key: impl Into<String>, f: F) -> Self
    where
        F: Fn(&dyn Represented, &serde_json::Map<String, Value>) -> Result<Value, MappingError>
            + Send
            + Sync
            + 'static,
    {
        self.format_options.insert(
            key.into(),
            OptionValue::Callable(Callable::Positional(Arc::new(f))),
        );
        self
    }

    /// Shorthand for the `collection` format option.
    pub fn collection(self) -> Self {
        self.option("collection", true)
    }

    /// Shorthand for the `as` format option (document key differs from the property name).
    pub fn rename(self, key: impl Into<String>) -> Self {
        self.option("as", key.into())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn wrap(&self) -> Option<&Wrap> {
        self.wrap.as_ref()
    }

    pub fn nested_ref(&self) -> Option<&SchemaRef> {
        self.nested.as_ref()
    }

    pub fn is_nested(&self) -> bool {
        self.nested.is_some()
    }

    /// Returns the nested schema, or an error for scalar properties.
    pub fn schema(&self) -> Result<Arc<Schema>, SchemaError> {
        self.nested
            .as_ref()
            .map(SchemaRef::resolve)
            .ok_or_else(|| SchemaError::NotNested(self.name.clone()))
    }

    pub fn format_option(&self, key: &str) -> Option<&OptionValue> {
        self.format_options.get(key)
    }

    pub fn format_options(&self) -> &IndexMap<String, OptionValue> {
        &self.format_options
    }

    /// Returns true if the static `collection` option is set.
    pub fn is_collection(&self) -> bool {
        matches!(
            self.format_options.get("collection"),
            Some(OptionValue::Static(Value::Bool(true)))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> Schema {
        Schema::new()
            .property(Definition::new("label"))
            .property(Definition::new("children").nested_deferred(tree).collection())
    }

    #[test]
    fn wrap_value_encoding() {
        assert_eq!(Wrap::Name("song".into()).to_value(), Value::from("song"));
        assert_eq!(Wrap::Disabled.to_value(), Value::Bool(false));
        assert_eq!(Wrap::from_value(&Value::from("x")), Some(Wrap::Name("x".into())));
        assert_eq!(Wrap::from_value(&Value::Bool(false)), Some(Wrap::Disabled));
        assert_eq!(Wrap::from_value(&Value::Bool(true)), None);
    }

    #[test]
    fn deferred_reference_resolves_once() {
        let reference = SchemaRef::deferred(tree);
        assert!(!reference.is_resolved());

        let first = reference.resolve();
        assert!(reference.is_resolved());
        let second = reference.resolve();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn self_referential_schema_is_lazy() {
        let schema = tree();
        let children = schema.get("children").unwrap();
        assert!(children.is_collection());

        let inner = children.schema().unwrap();
        let names: Vec<_> = inner.names().collect();
        assert_eq!(names, vec!["label", "children"]);
        // The inner "children" reference has not been built yet.
        assert!(!inner.get("children").unwrap().nested_ref().unwrap().is_resolved());
    }

    #[test]
    fn scalar_has_no_schema() {
        let def = Definition::new("title");
        assert_eq!(def.schema().unwrap_err(), SchemaError::NotNested("title".into()));
    }

    #[test]
    fn builder_sets_options() {
        let def = Definition::new("title").rename("name").wrapped("t");
        assert_eq!(def.wrap(), Some(&Wrap::Name("t".into())));
        assert!(matches!(
            def.format_option("as"),
            Some(OptionValue::Static(Value::String(s))) if s == "name"
        ));
        assert!(!def.is_collection());
        assert!(!def.is_nested());
    }
}
