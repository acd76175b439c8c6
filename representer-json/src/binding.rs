use std::sync::Arc;

use representer_core::{Binding, Context, Definition, Format, MappingError, Property};
use serde_json::{Map, Value};

use crate::Json;

/// Format option: document key differing from the property name.
pub const AS: &str = "as";
/// Format option: skip the property when it evaluates to `false` or `null`.
pub const IF: &str = "if";
/// Format option: emit `null` for absent values.
pub const RENDER_NIL: &str = "render_nil";
/// Format option: value written on parse when the key is missing.
pub const DEFAULT: &str = "default";

fn key(definition: &Definition, ctx: &Context<'_, Json>) -> Result<String, MappingError> {
    match ctx.evaluate(AS)? {
        None => Ok(definition.name().to_string()),
        Some(Value::String(key)) => Ok(key),
        Some(other) => Err(MappingError::Evaluation(format!(
            "`as` of `{}` must be a string, got {other}",
            definition.name()
        ))),
    }
}

fn skipped(definition: &Definition, ctx: &Context<'_, Json>) -> Result<bool, MappingError> {
    if !ctx.options().permits(definition.name()) {
        return Ok(true);
    }
    Ok(matches!(ctx.evaluate(IF)?, Some(Value::Bool(false) | Value::Null)))
}

fn render_nil(ctx: &Context<'_, Json>) -> Result<bool, MappingError> {
    Ok(matches!(ctx.evaluate(RENDER_NIL)?, Some(Value::Bool(true))))
}

fn object_mut(document: &mut Value) -> Result<&mut Map<String, Value>, MappingError> {
    match document {
        Value::Object(map) => Ok(map),
        other => Err(MappingError::Document(format!("expected an object, got {other}"))),
    }
}

/// Looks `key` up in an object fragment. `null` reads as an empty object.
fn field<'d>(document: &'d Value, key: &str) -> Result<Option<&'d Value>, MappingError> {
    match document {
        Value::Object(map) => Ok(map.get(key)),
        Value::Null => Ok(None),
        other => Err(MappingError::Document(format!("expected an object, got {other}"))),
    }
}

/// Maps a plain value to a JSON value of the same shape.
pub struct ScalarBinding {
    definition: Arc<Definition>,
}

impl ScalarBinding {
    pub fn new(definition: Arc<Definition>) -> Self {
        ScalarBinding { definition }
    }
}

impl Binding<Json> for ScalarBinding {
    fn definition(&self) -> &Arc<Definition> {
        &self.definition
    }

    fn compile(&self, ctx: &mut Context<'_, Json>) -> Result<(), MappingError> {
        if skipped(&self.definition, ctx)? {
            return Ok(());
        }
        let key = key(&self.definition, ctx)?;
        let value = ctx.represented().read(self.definition.name())?.into_value();
        if value.is_null() && !render_nil(ctx)? {
            return Ok(());
        }
        object_mut(ctx.document_mut()?)?.insert(key, value);
        Ok(())
    }

    fn uncompile(&self, ctx: &mut Context<'_, Json>) -> Result<(), MappingError> {
        if skipped(&self.definition, ctx)? {
            return Ok(());
        }
        let key = key(&self.definition, ctx)?;
        let found = field(ctx.source()?, &key)?;
        let value = match (found, ctx.evaluate(DEFAULT)?) {
            (Some(Value::Null) | None, Some(default)) => default,
            (Some(value), _) => value.clone(),
            (None, None) => return Ok(()),
        };
        ctx.represented_mut()?.write(self.definition.name(), value)
    }
}

/// Maps a nested object (or a list of them) through the property's schema.
///
/// Rendering and parsing the nested value are full engine calls with the
/// options computed by [`Context::child_options`].
pub struct NestedBinding {
    definition: Arc<Definition>,
}

impl NestedBinding {
    pub fn new(definition: Arc<Definition>) -> Self {
        NestedBinding { definition }
    }

    fn uncompile_collection(
        &self,
        ctx: &mut Context<'_, Json>,
        fragment: &Value,
    ) -> Result<(), MappingError> {
        let name = self.definition.name();
        let schema = self.definition.schema()?;
        let options = ctx.child_options(&self.definition);
        let engine = ctx.engine();

        let list = match schema.wrap_for(&options) {
            Some(wrap) => engine.format().unwrap(fragment, &wrap)?,
            None => Some(fragment),
        };
        let items = match list {
            Some(list) => engine.format().items(list)?,
            None => Vec::new(),
        };

        // Items were rendered without the wrap, which encloses the whole list.
        let item_options = options.no_wrap();
        ctx.represented_mut()?.write(name, Value::Null)?;
        for item in items {
            let child = ctx.represented_mut()?.push_nested(name)?;
            engine.parse(item, child, &schema, &item_options)?;
        }
        Ok(())
    }
}

impl Binding<Json> for NestedBinding {
    fn definition(&self) -> &Arc<Definition> {
        &self.definition
    }

    fn compile(&self, ctx: &mut Context<'_, Json>) -> Result<(), MappingError> {
        if skipped(&self.definition, ctx)? {
            return Ok(());
        }
        let name = self.definition.name();
        let key = key(&self.definition, ctx)?;
        let schema = self.definition.schema()?;
        let options = ctx.child_options(&self.definition);
        let engine = ctx.engine();

        let rendered = match ctx.represented().read(name)? {
            Property::Nested(Some(child)) => engine.render(child, &schema, &options)?,
            Property::Collection(items) => engine.render_collection(items, &schema, &options)?,
            Property::Nested(None) | Property::Value(Value::Null) => {
                if !render_nil(ctx)? {
                    return Ok(());
                }
                Value::Null
            }
            Property::Value(_) => {
                return Err(MappingError::Document(format!(
                    "`{name}` holds a plain value but is declared nested"
                )))
            }
        };
        object_mut(ctx.document_mut()?)?.insert(key, rendered);
        Ok(())
    }

    fn uncompile(&self, ctx: &mut Context<'_, Json>) -> Result<(), MappingError> {
        if skipped(&self.definition, ctx)? {
            return Ok(());
        }
        let name = self.definition.name();
        let key = key(&self.definition, ctx)?;
        let fragment = match field(ctx.source()?, &key)? {
            None => return Ok(()),
            Some(Value::Null) => return ctx.represented_mut()?.write(name, Value::Null),
            Some(fragment) => fragment,
        };

        if self.definition.is_collection() {
            return self.uncompile_collection(ctx, fragment);
        }

        let schema = self.definition.schema()?;
        let options = ctx.child_options(&self.definition);
        let engine = ctx.engine();
        let child = ctx.represented_mut()?.nested_mut(name)?;
        log::trace!("parsing nested `{name}`");
        engine.parse(fragment, child, &schema, &options)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use representer_core::{Engine, Options, Schema};
    use serde_json::json;

    fn loose(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn as_renames_the_key() {
        let engine = Engine::new(Json);
        let schema = Schema::record([Definition::new("track").rename("trackNumber")]);
        let object = loose(json!({"track": 1}));

        let document = engine.render(&object, &schema, &Options::new()).unwrap();
        assert_eq!(document, json!({"trackNumber": 1}));

        let mut parsed = Map::new();
        engine.parse(&document, &mut parsed, &schema, &Options::new()).unwrap();
        assert_eq!(parsed, object);
    }

    #[test]
    fn if_false_skips_both_directions() {
        let engine = Engine::new(Json);
        let schema = Schema::record([Definition::new("a"), Definition::new("b").option(IF, false)]);

        let document = engine
            .render(&loose(json!({"a": 1, "b": 2})), &schema, &Options::new())
            .unwrap();
        assert_eq!(document, json!({"a": 1}));

        let mut parsed = Map::new();
        engine
            .parse(&json!({"a": 1, "b": 2}), &mut parsed, &schema, &Options::new())
            .unwrap();
        assert_eq!(Value::Object(parsed), json!({"a": 1}));
    }

    #[test]
    fn render_nil_and_default() {
        let engine = Engine::new(Json);
        let schema = Schema::record([
            Definition::new("a").option(RENDER_NIL, true),
            Definition::new("b"),
            Definition::new("c").option(DEFAULT, "fallback"),
        ]);

        let document = engine.render(&Map::new(), &schema, &Options::new()).unwrap();
        assert_eq!(document, json!({"a": null}));

        let mut parsed = Map::new();
        engine.parse(&json!({}), &mut parsed, &schema, &Options::new()).unwrap();
        assert_eq!(Value::Object(parsed), json!({"c": "fallback"}));
    }

    #[test]
    fn non_string_as_is_an_evaluation_error() {
        let engine = Engine::new(Json);
        let schema = Schema::record([Definition::new("a").option(AS, 5)]);

        let err = engine
            .render(&loose(json!({"a": 1})), &schema, &Options::new())
            .unwrap_err();
        assert!(matches!(err, MappingError::Evaluation(_)));
    }

    #[test]
    fn non_object_documents_are_rejected() {
        let engine = Engine::new(Json);
        let schema = Schema::record([Definition::new("a")]);

        let err = engine
            .parse(&json!([1, 2]), &mut Map::new(), &schema, &Options::new())
            .err()
            .unwrap();
        assert!(matches!(err, MappingError::Document(_)));
    }
}
