//! Evaluation of format option values.
//!
//! Format options are either static values or callables. How a callable is
//! invoked is decided by an [`Evaluator`] chosen once, when the engine is
//! built. Bindings only ever ask "evaluate this option in this context".

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::MappingError;
use crate::represented::Represented;

pub type ContextFn = dyn Fn(&EvalContext<'_>) -> Result<Value, MappingError> + Send + Sync;
pub type PositionalFn =
    dyn Fn(&dyn Represented, &Map<String, Value>) -> Result<Value, MappingError> + Send + Sync;

/// A computed option value.
#[derive(Clone)]
pub enum Callable {
    /// Receives a single [`EvalContext`].
    Context(Arc<ContextFn>),
    /// Receives the represented object and the user options as separate arguments.
    Positional(Arc<PositionalFn>),
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Context(_) => f.write_str("Callable::Context(..)"),
            Callable::Positional(_) => f.write_str("Callable::Positional(..)"),
        }
    }
}

/// Value stored under one format option key of a definition.
#[derive(Debug, Clone)]
pub enum OptionValue {
    Static(Value),
    Callable(Callable),
}

/// What a callable gets to look at.
pub struct EvalContext<'a> {
    pub represented: &'a dyn Represented,
    pub user_options: Option<&'a Map<String, Value>>,
    /// Name of the property whose option is evaluated.
    pub property: &'a str,
}

impl EvalContext<'_> {
    pub fn user_option(&self, key: &str) -> Option<&Value> {
        self.user_options.and_then(|u| u.get(key))
    }
}

/// Strategy interpreting option values.
pub trait Evaluator: fmt::Debug + Send + Sync {
    fn evaluate(&self, value: &OptionValue, context: &EvalContext<'_>) -> Result<Value, MappingError>;
}

/// Evaluates static values and context callables. Positional callables are an error.
#[derive(Debug, Default, Clone, Copy)]
pub struct Strict;

impl Evaluator for Strict {
    fn evaluate(&self, value: &OptionValue, context: &EvalContext<'_>) -> Result<Value, MappingError> {
        match value {
            OptionValue::Static(value) => Ok(value.clone()),
            OptionValue::Callable(Callable::Context(f)) => f(context),
            OptionValue::Callable(Callable::Positional(_)) => Err(MappingError::Evaluation(format!(
                "option of `{}` uses positional arguments, which the strict evaluator does not accept",
                context.property
            ))),
        }
    }
}

/// Evaluates both callable shapes, warning about positional ones.
#[derive(Debug, Default, Clone, Copy)]
pub struct Legacy;

impl Evaluator for Legacy {
    fn evaluate(&self, value: &OptionValue, context: &EvalContext<'_>) -> Result<Value, MappingError> {
        match value {
            OptionValue::Callable(Callable::Positional(f)) => {
                log::warn!(
                    "option of `{}` uses positional arguments; this is deprecated, accept an EvalContext instead",
                    context.property
                );
                let empty = Map::new();
                f(context.represented, context.user_options.unwrap_or(&empty))
            }
            other => Strict.evaluate(other, context),
        }
    }
}

/// Named evaluator selection, for configuration files.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Evaluation {
    #[default]
    Strict,
    Legacy,
}

impl Evaluation {
    pub fn evaluator(self) -> Arc<dyn Evaluator> {
        match self {
            Evaluation::Strict => Arc::new(Strict),
            Evaluation::Legacy => Arc::new(Legacy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn subject() -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("title".into(), json!("Roxanne"));
        map
    }

    fn context<'a>(represented: &'a dyn Represented, user: &'a Map<String, Value>) -> EvalContext<'a> {
        EvalContext {
            represented,
            user_options: Some(user),
            property: "title",
        }
    }

    fn positional() -> OptionValue {
        OptionValue::Callable(Callable::Positional(Arc::new(
            |represented: &dyn Represented, user: &Map<String, Value>| -> Result<Value, MappingError> {
                let title = represented.read("title")?;
                Ok(json!([title.into_value(), user.get("n").cloned()]))
            },
        )))
    }

    #[test]
    fn strict_evaluates_static_and_context() {
        let record = subject();
        let mut user = Map::new();
        user.insert("n".into(), json!(3));
        let ctx = context(&record, &user);

        assert_eq!(Strict.evaluate(&OptionValue::Static(json!(1)), &ctx).unwrap(), json!(1));

        let callable = OptionValue::Callable(Callable::Context(Arc::new(
            |ctx: &EvalContext<'_>| -> Result<Value, MappingError> { Ok(json!(ctx.user_option("n").cloned())) },
        )));
        assert_eq!(Strict.evaluate(&callable, &ctx).unwrap(), json!(3));
    }

    #[test]
    fn strict_rejects_positional() {
        let record = subject();
        let user = Map::new();
        let err = Strict.evaluate(&positional(), &context(&record, &user)).unwrap_err();
        assert!(matches!(err, MappingError::Evaluation(_)));
    }

    #[test]
    fn legacy_accepts_positional() {
        let record = subject();
        let mut user = Map::new();
        user.insert("n".into(), json!(7));
        let value = Legacy.evaluate(&positional(), &context(&record, &user)).unwrap();
        assert_eq!(value, json!(["Roxanne", 7]));
    }

    #[test]
    fn evaluation_deserializes() {
        let evaluation: Evaluation = serde_json::from_value(json!("legacy")).unwrap();
        assert_eq!(evaluation, Evaluation::Legacy);
        assert_eq!(Evaluation::default(), Evaluation::Strict);
    }
}
