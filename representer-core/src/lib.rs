//! Representer maps in-memory objects to structured documents and back.
//!
//! Core concepts:
//! - **Definition**: Immutable description of one mapped property
//! - **Schema**: Ordered, name-unique definitions declared for a type or instance
//! - **Represented**: Reflection over an object (read and write properties by name)
//! - **Format**: A document format; builds one **Binding** per definition
//! - **Engine**: Runs render (compile) and parse (uncompile) calls over the bindings
//! - **Options**: The per-call configuration bag, propagated into nested calls
//!
//! # Example
//!
//! ```
//! use representer_core::{Definition, Map, Options, Schema, Value};
//!
//! let schema = Schema::record([Definition::new("title"), Definition::new("track")]);
//!
//! // Keys that are not declared properties move into `user_options`.
//! let options = Options::try_from(serde_json::json!({"wrap": "song", "limit": 5})).unwrap();
//! let normalized = options.normalize(&schema);
//! assert_eq!(normalized.migrated, vec!["limit".to_string()]);
//! assert_eq!(normalized.options.user_option_value("limit"), Some(&Value::from(5)));
//!
//! // A plain map is a loose represented object.
//! let mut song = Map::new();
//! song.insert("title".into(), Value::from("Roxanne"));
//! ```
//!
//! Formats live in their own crates; `representer-json` maps to
//! `serde_json::Value` documents.

mod attach;
mod binding;
mod context;
mod definition;
mod engine;
mod error;
mod evaluate;
mod format;
mod options;
mod represented;
mod schema;

#[cfg(test)]
mod testing;

pub use attach::{Attachment, Decorator, TypeSchema};
pub use binding::{Binding, BindingMap, Phase};
pub use context::Context;
pub use definition::{Definition, SchemaRef, Wrap};
pub use engine::{Engine, EngineConfig, Representation};
pub use error::{MappingError, SchemaError};
pub use evaluate::{Callable, ContextFn, EvalContext, Evaluation, Evaluator, Legacy, OptionValue, PositionalFn, Strict};
pub use format::Format;
pub use options::{child_options_for, Normalized, Options};
pub use represented::{from_value, to_value, Property, Representable, Represented};
pub use schema::Schema;
pub use serde_json::{Map, Value};

#[cfg(feature = "derive")]
pub use representer_derive::Represented;
