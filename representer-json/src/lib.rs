//! JSON format for Representer.
//!
//! Documents are `serde_json::Value`s. Properties become object keys in
//! declaration order, nested properties become nested objects and
//! collections become arrays.

use std::sync::Arc;

use representer_core::{Binding, Definition, Engine, Format, MappingError, Options, Representable};
use serde_json::{Map, Value};
use thiserror::Error;

mod binding;

pub use binding::{NestedBinding, ScalarBinding, AS, DEFAULT, IF, RENDER_NIL};

#[derive(Debug, Error)]
pub enum JsonError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Mapping(#[from] MappingError),
}

/// The JSON format.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json;

impl Format for Json {
    type Document = Value;

    fn document(&self) -> Value {
        Value::Object(Map::new())
    }

    fn build(&self, definition: &Arc<Definition>) -> Box<dyn Binding<Self>> {
        if definition.is_nested() {
            Box::new(NestedBinding::new(Arc::clone(definition)))
        } else {
            Box::new(ScalarBinding::new(Arc::clone(definition)))
        }
    }

    fn wrap(&self, document: Value, wrap: &str) -> Value {
        let mut object = Map::new();
        object.insert(wrap.to_string(), document);
        Value::Object(object)
    }

    fn unwrap<'d>(&self, document: &'d Value, wrap: &str) -> Result<Option<&'d Value>, MappingError> {
        match document {
            Value::Object(object) => Ok(object.get(wrap)),
            Value::Null => Ok(None),
            other => Err(MappingError::Document(format!(
                "expected an object wrapped in `{wrap}`, got {other}"
            ))),
        }
    }

    fn collect(&self, items: Vec<Value>) -> Result<Value, MappingError> {
        Ok(Value::Array(items))
    }

    fn items<'d>(&self, document: &'d Value) -> Result<Vec<&'d Value>, MappingError> {
        match document {
            Value::Array(items) => Ok(items.iter().collect()),
            Value::Null => Ok(Vec::new()),
            other => Err(MappingError::Document(format!("expected an array, got {other}"))),
        }
    }
}

/// Creates an engine for the JSON format with the default configuration.
pub fn engine() -> Engine<Json> {
    Engine::new(Json)
}

/// Renders `value` through its registered schema.
pub fn to_value<T: Representable>(value: &T, options: &Options) -> Result<Value, MappingError> {
    engine().render(value, &T::schema(), options)
}

pub fn to_string<T: Representable>(value: &T, options: &Options) -> Result<String, JsonError> {
    Ok(serde_json::to_string(&to_value(value, options)?)?)
}

pub fn to_string_pretty<T: Representable>(value: &T, options: &Options) -> Result<String, JsonError> {
    Ok(serde_json::to_string_pretty(&to_value(value, options)?)?)
}

/// Parses `json` into a fresh `T`.
pub fn from_str<T: Representable + Default>(json: &str, options: &Options) -> Result<T, JsonError> {
    let document: Value = serde_json::from_str(json)?;
    let mut value = T::default();
    engine().parse(&document, &mut value, &T::schema(), options)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use representer_core::{Represented, Schema};
    use serde_json::json;

    #[derive(Debug, Default, PartialEq, Represented)]
    struct Point {
        x: i64,
        y: i64,
    }

    #[test]
    fn wrap_and_unwrap() {
        let document = Json.wrap(json!({"a": 1}), "song");
        assert_eq!(document, json!({"song": {"a": 1}}));
        assert_eq!(Json.unwrap(&document, "song").unwrap(), Some(&json!({"a": 1})));
        assert_eq!(Json.unwrap(&json!({}), "song").unwrap(), None);
        assert!(Json.unwrap(&json!(1), "song").is_err());
    }

    #[test]
    fn collections_are_arrays() {
        let collected = Json.collect(vec![json!({"a": 1}), json!({"a": 2})]).unwrap();
        assert_eq!(collected, json!([{"a": 1}, {"a": 2}]));
        assert_eq!(Json.items(&collected).unwrap().len(), 2);
        assert!(Json.items(&json!({})).is_err());
    }

    #[test]
    fn build_picks_binding_by_definition() {
        let scalar = Arc::new(Definition::new("a"));
        let nested = Arc::new(Definition::new("b").nested(Schema::new()));
        assert_eq!(Json.build(&scalar).name(), "a");
        assert!(Json.build(&nested).definition().is_nested());
    }

    #[test]
    fn malformed_json_is_a_json_error() {
        let err = from_str::<Point>("{", &Options::new());
        assert!(matches!(err, Err(JsonError::Json(_))));

        let err = from_str::<Point>(r#"{"x": "one"}"#, &Options::new());
        assert!(matches!(err, Err(JsonError::Mapping(MappingError::Value(_)))));
    }

    #[test]
    fn string_helpers() {
        let point = Point { x: 1, y: 2 };
        assert_eq!(to_string(&point, &Options::new()).unwrap(), r#"{"x":1,"y":2}"#);
        assert_eq!(
            to_string_pretty(&point, &Options::new()).unwrap(),
            "{\n  \"x\": 1,\n  \"y\": 2\n}"
        );
        assert_eq!(from_str::<Point>(r#"{"y": 5}"#, &Options::new()).unwrap(), Point { x: 0, y: 5 });
    }
}
