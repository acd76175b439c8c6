//! Call configuration and its propagation into nested calls.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::definition::{Definition, Wrap};
use crate::schema::Schema;

pub const INCLUDE: &str = "include";
pub const EXCLUDE: &str = "exclude";
pub const WRAP: &str = "wrap";
pub const USER_OPTIONS: &str = "user_options";

/// Keys the engine itself understands at the top level of an options bag.
pub const RESERVED: [&str; 4] = [EXCLUDE, INCLUDE, WRAP, USER_OPTIONS];

/// Configuration bag for one render or parse call.
///
/// Besides the reserved keys, a bag may carry one sub-bag per declared
/// property. That sub-bag becomes (part of) the options of the nested call
/// for that property; see [`child_options_for`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Options(Map<String, Value>);

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the call to the named properties.
    pub fn include<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set(INCLUDE, names_to_value(names))
    }

    /// Skips the named properties.
    pub fn exclude<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set(EXCLUDE, names_to_value(names))
    }

    /// Overrides the document-level wrap of this call.
    pub fn wrap(self, name: impl Into<String>) -> Self {
        self.set(WRAP, Value::String(name.into()))
    }

    /// Disables the document-level wrap of this call.
    pub fn no_wrap(self) -> Self {
        self.set(WRAP, Value::Bool(false))
    }

    /// Adds one entry to the opaque `user_options` bag.
    pub fn user_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let entry = self
            .0
            .entry(USER_OPTIONS)
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(user_options) = entry {
            user_options.insert(key.into(), value.into());
        }
        self
    }

    /// Sets the sub-bag forwarded to the nested call of property `name`.
    pub fn property(self, name: impl Into<String>, options: Options) -> Self {
        let name = name.into();
        self.set(&name, Value::Object(options.0))
    }

    /// Sets an arbitrary top-level key.
    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn included(&self) -> Option<Vec<&str>> {
        self.names(INCLUDE)
    }

    pub fn excluded(&self) -> Option<Vec<&str>> {
        self.names(EXCLUDE)
    }

    /// The wrap override of this call, if any.
    pub fn wrap_override(&self) -> Option<Wrap> {
        self.0.get(WRAP).and_then(Wrap::from_value)
    }

    pub fn user_options(&self) -> Option<&Map<String, Value>> {
        self.0.get(USER_OPTIONS).and_then(Value::as_object)
    }

    pub fn user_option_value(&self, key: &str) -> Option<&Value> {
        self.user_options().and_then(|u| u.get(key))
    }

    /// The sub-bag configured for property `name`.
    pub fn nested(&self, name: &str) -> Option<&Map<String, Value>> {
        self.0.get(name).and_then(Value::as_object)
    }

    /// Applies `include` / `exclude` to a property name.
    ///
    /// `include` takes precedence: when present, only listed names pass.
    pub fn permits(&self, name: &str) -> bool {
        if let Some(included) = self.included() {
            return included.contains(&name);
        }
        match self.excluded() {
            Some(excluded) => !excluded.contains(&name),
            None => true,
        }
    }

    /// Normalizes this bag against the properties `schema` declares.
    ///
    /// An empty bag is returned as is. Otherwise the result is a copy: keys
    /// that are neither reserved nor declared property names move into
    /// `user_options`, and their names are reported in
    /// [`Normalized::migrated`]. Entries already present in `user_options`
    /// win over migrated ones. A `user_options` that is not an object is
    /// kept verbatim and nothing is moved, but the keys are still reported.
    /// `self` is never modified.
    pub fn normalize(&self, schema: &Schema) -> Normalized<'_> {
        if self.is_empty() {
            return Normalized {
                options: Cow::Borrowed(self),
                migrated: Vec::new(),
            };
        }

        let mut options = self.clone();
        let migrated: Vec<String> = self
            .0
            .keys()
            .filter(|key| !RESERVED.contains(&key.as_str()) && !schema.contains(key))
            .cloned()
            .collect();

        let mergeable = matches!(self.0.get(USER_OPTIONS), None | Some(Value::Object(_)));
        if !migrated.is_empty() && mergeable {
            let mut user_options = Map::new();
            for key in &migrated {
                if let Some(value) = options.0.remove(key) {
                    user_options.insert(key.clone(), value);
                }
            }
            if let Some(Value::Object(explicit)) = options.0.remove(USER_OPTIONS) {
                user_options.extend(explicit);
            }
            options
                .0
                .insert(USER_OPTIONS.to_string(), Value::Object(user_options));
        }

        Normalized {
            options: Cow::Owned(options),
            migrated,
        }
    }

    fn names(&self, key: &str) -> Option<Vec<&str>> {
        match self.0.get(key)? {
            Value::Array(items) => Some(items.iter().filter_map(Value::as_str).collect()),
            Value::String(single) => Some(vec![single.as_str()]),
            _ => None,
        }
    }
}

impl From<Map<String, Value>> for Options {
    fn from(map: Map<String, Value>) -> Self {
        Options(map)
    }
}

impl TryFrom<Value> for Options {
    type Error = Value;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Options(map)),
            other => Err(other),
        }
    }
}

fn names_to_value<I, S>(names: I) -> Value
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Value::Array(names.into_iter().map(|n| Value::String(n.into())).collect())
}

/// Result of [`Options::normalize`].
#[derive(Debug, Clone)]
pub struct Normalized<'a> {
    pub options: Cow<'a, Options>,
    /// Top-level keys that are neither reserved nor declared properties.
    pub migrated: Vec<String>,
}

impl Normalized<'_> {
    /// True if the caller mixed user-level keys into the top level.
    pub fn is_deprecated(&self) -> bool {
        !self.migrated.is_empty()
    }
}

/// Computes the options of the nested call made for `definition`.
///
/// The child starts with the parent's `user_options` (forwarded verbatim),
/// gets the definition's `wrap` if it declares one, and finally takes every
/// entry of the parent's sub-bag for this property. Sub-bag entries
/// overwrite `wrap` and `user_options`. Nothing else of the parent leaks
/// into the child: `include`, `exclude` and the parent's own `wrap` stay
/// with the parent call.
pub fn child_options_for(parent: &Options, definition: &Definition) -> Options {
    let mut child = Map::new();

    if let Some(user_options) = parent.0.get(USER_OPTIONS) {
        child.insert(USER_OPTIONS.to_string(), user_options.clone());
    }

    if let Some(wrap) = definition.wrap() {
        child.insert(WRAP.to_string(), wrap.to_value());
    }

    if let Some(nested) = parent.nested(definition.name()) {
        for (key, value) in nested {
            child.insert(key.clone(), value.clone());
        }
    }

    Options(child)
}
