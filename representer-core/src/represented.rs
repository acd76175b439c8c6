use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{MappingError, SchemaError};
use crate::schema::Schema;

/// A property value as read from a represented object.
pub enum Property<'a> {
    /// A plain value, mapped by the format without recursion.
    Value(Value),
    /// A nested object mapped through the property's nested schema.
    Nested(Option<&'a dyn Represented>),
    /// A list of nested objects mapped through the property's nested schema.
    Collection(Vec<&'a dyn Represented>),
}

impl Property<'_> {
    /// Returns the plain value, or `Null` for nested properties.
    pub fn into_value(self) -> Value {
        match self {
            Property::Value(value) => value,
            Property::Nested(_) | Property::Collection(_) => Value::Null,
        }
    }

    pub fn is_nested(&self) -> bool {
        !matches!(self, Property::Value(_))
    }
}

impl std::fmt::Debug for Property<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Property::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Property::Nested(nested) => f
                .debug_tuple("Nested")
                .field(&nested.map(|_| ".."))
                .finish(),
            Property::Collection(items) => f.debug_tuple("Collection").field(&items.len()).finish(),
        }
    }
}

/// Reflection over an in-memory object: read and write properties by name.
///
/// This is the only access the engine and the bindings have to the objects
/// they map. Creating nested objects while parsing is the object's business:
/// `nested_mut` and `push_nested` hand out a (possibly freshly constructed)
/// child to parse into.
pub trait Represented {
    /// Reads a property.
    fn read(&self, name: &str) -> Result<Property<'_>, MappingError>;

    /// Writes a plain value. `Null` clears nested properties.
    fn write(&mut self, name: &str, value: Value) -> Result<(), MappingError>;

    /// Returns the nested object stored under `name`, creating it if absent.
    fn nested_mut(&mut self, name: &str) -> Result<&mut dyn Represented, MappingError> {
        Err(SchemaError::NotNested(name.to_string()).into())
    }

    /// Appends a new nested object to the collection `name` and returns it.
    fn push_nested(&mut self, name: &str) -> Result<&mut dyn Represented, MappingError> {
        Err(SchemaError::NotNested(name.to_string()).into())
    }
}

/// A type that registers its schema at definition time.
pub trait Representable: Represented {
    /// Builds the type-level schema.
    fn schema() -> Schema;
}

/// Converts a field into a document value.
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value, MappingError> {
    Ok(serde_json::to_value(value)?)
}

/// Converts a document value into a field.
pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T, MappingError> {
    Ok(serde_json::from_value(value)?)
}

/// A loose record: every name is readable, missing names read as `Null`.
impl Represented for Map<String, Value> {
    fn read(&self, name: &str) -> Result<Property<'_>, MappingError> {
        Ok(Property::Value(self.get(name).cloned().unwrap_or(Value::Null)))
    }

    fn write(&mut self, name: &str, value: Value) -> Result<(), MappingError> {
        self.insert(name.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn map_reads_missing_as_null() {
        let map = Map::new();
        assert_eq!(map.read("absent").unwrap().into_value(), Value::Null);
    }

    #[test]
    fn map_write_then_read() {
        let mut map = Map::new();
        map.write("title", json!("Roxanne")).unwrap();
        assert_eq!(map.read("title").unwrap().into_value(), json!("Roxanne"));
    }

    #[test]
    fn map_is_not_nested() {
        let mut map = Map::new();
        let err = map.nested_mut("child").err().unwrap();
        assert!(matches!(err, MappingError::Schema(SchemaError::NotNested(_))));
    }

    #[test]
    fn value_conversion_errors() {
        let err = from_value::<u32>(json!("not a number")).unwrap_err();
        assert!(matches!(err, MappingError::Value(_)));
        assert_eq!(to_value(&[1, 2]).unwrap(), json!([1, 2]));
    }
}
