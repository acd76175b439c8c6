use std::sync::Arc;

use serde_json::Value;

use crate::binding::Phase;
use crate::definition::Definition;
use crate::engine::Engine;
use crate::error::MappingError;
use crate::evaluate::EvalContext;
use crate::format::Format;
use crate::options::{child_options_for, Options};
use crate::represented::Represented;
use crate::schema::Schema;

pub(crate) enum Slot<'a, D> {
    Building(&'a mut D),
    Reading(&'a D),
}

pub(crate) enum Subject<'a> {
    Reading(&'a dyn Represented),
    Writing(&'a mut dyn Represented),
}

/// State of one render or parse call, shared by all of its bindings.
///
/// A context is created once per call and handed to every binding in turn
/// by `&mut`. It is never copied: the traversal only swaps the current
/// definition between leaves. A context therefore belongs to exactly one
/// call and cannot be shared between traversals.
///
/// During compile the document is writable and the object read-only;
/// during uncompile it is the other way round. Asking for the wrong side
/// yields [`MappingError::Phase`].
pub struct Context<'a, F: Format> {
    phase: Phase,
    document: Slot<'a, F::Document>,
    represented: Subject<'a>,
    options: &'a Options,
    schema: &'a Schema,
    engine: &'a Engine<F>,
    pub(crate) current: Option<Arc<Definition>>,
}

impl<'a, F: Format> Context<'a, F> {
    pub(crate) fn new(
        phase: Phase,
        document: Slot<'a, F::Document>,
        represented: Subject<'a>,
        options: &'a Options,
        schema: &'a Schema,
        engine: &'a Engine<F>,
    ) -> Self {
        Context {
            phase,
            document,
            represented,
            options,
            schema,
            engine,
            current: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Normalized options of this call.
    pub fn options(&self) -> &'a Options {
        self.options
    }

    /// Schema the call runs on.
    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    /// Engine running the call; bindings use it to recurse into nested values.
    pub fn engine(&self) -> &'a Engine<F> {
        self.engine
    }

    /// Definition of the binding currently running.
    pub fn definition(&self) -> Option<&Arc<Definition>> {
        self.current.as_ref()
    }

    pub fn represented(&self) -> &dyn Represented {
        match &self.represented {
            Subject::Reading(represented) => *represented,
            Subject::Writing(represented) => &**represented,
        }
    }

    pub fn represented_mut(&mut self) -> Result<&mut dyn Represented, MappingError> {
        match &mut self.represented {
            Subject::Writing(represented) => Ok(&mut **represented),
            Subject::Reading(_) => Err(MappingError::Phase {
                operation: "represented_mut",
                phase: self.phase,
            }),
        }
    }

    pub fn document(&self) -> &F::Document {
        match &self.document {
            Slot::Building(document) => document,
            Slot::Reading(document) => document,
        }
    }

    pub fn document_mut(&mut self) -> Result<&mut F::Document, MappingError> {
        match &mut self.document {
            Slot::Building(document) => Ok(&mut **document),
            Slot::Reading(_) => Err(MappingError::Phase {
                operation: "document_mut",
                phase: self.phase,
            }),
        }
    }

    /// The document being parsed, borrowed for the whole call.
    ///
    /// Unlike [`document`](Self::document) the result does not borrow the
    /// context, so a binding can hold a fragment while writing to the object.
    pub fn source(&self) -> Result<&'a F::Document, MappingError> {
        match &self.document {
            Slot::Reading(document) => Ok(*document),
            Slot::Building(_) => Err(MappingError::Phase {
                operation: "source",
                phase: self.phase,
            }),
        }
    }

    /// Options for the nested call made on behalf of `definition`.
    pub fn child_options(&self, definition: &Definition) -> Options {
        child_options_for(self.options, definition)
    }

    /// Evaluates format option `key` of the current definition.
    ///
    /// Returns `None` if the option is not set.
    pub fn evaluate(&self, key: &str) -> Result<Option<Value>, MappingError> {
        let Some(definition) = &self.current else {
            return Ok(None);
        };
        let Some(value) = definition.format_option(key) else {
            return Ok(None);
        };
        let context = EvalContext {
            represented: self.represented(),
            user_options: self.options.user_options(),
            property: definition.name(),
        };
        self.engine.evaluator().evaluate(value, &context).map(Some)
    }
}
