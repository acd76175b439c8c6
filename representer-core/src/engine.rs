use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::binding::{BindingMap, Phase};
use crate::context::{Context, Slot, Subject};
use crate::error::MappingError;
use crate::evaluate::{Evaluation, Evaluator};
use crate::format::Format;
use crate::options::{Normalized, Options};
use crate::represented::Represented;
use crate::schema::Schema;

/// Engine-level settings.
///
/// Per-call configuration lives in [`Options`]; these settings are fixed
/// for the lifetime of an [`Engine`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How callable format options are evaluated.
    pub evaluation: Evaluation,
}

/// What [`Engine::represent`] renders: one object or a list of them.
pub enum Representation<'i> {
    Single(&'i dyn Represented),
    Collection(Vec<&'i dyn Represented>),
}

impl<'i, T: Represented> From<&'i T> for Representation<'i> {
    fn from(one: &'i T) -> Self {
        Representation::Single(one)
    }
}

impl<'i, T: Represented> From<&'i [T]> for Representation<'i> {
    fn from(items: &'i [T]) -> Self {
        Representation::Collection(items.iter().map(|item| item as &dyn Represented).collect())
    }
}

impl<'i> From<Vec<&'i dyn Represented>> for Representation<'i> {
    fn from(items: Vec<&'i dyn Represented>) -> Self {
        Representation::Collection(items)
    }
}

/// Drives render and parse calls for one format.
///
/// Both directions go through the same steps: normalize the options, build
/// the bindings from the schema, and traverse them in declaration order
/// with one shared [`Context`]. They differ only in which leaf action each
/// binding runs ([`Phase`]) and in which side of the context is writable.
///
/// Errors from bindings, including those of nested calls, are returned
/// unchanged. Nothing is retried and no partial result is kept back or
/// patched up.
pub struct Engine<F: Format> {
    format: F,
    evaluator: Arc<dyn Evaluator>,
}

impl<F: Format> Engine<F> {
    /// Creates an engine with the strict evaluator.
    pub fn new(format: F) -> Self {
        Self::with_config(format, &EngineConfig::default())
    }

    pub fn with_config(format: F, config: &EngineConfig) -> Self {
        Self::with_evaluator(format, config.evaluation.evaluator())
    }

    pub fn with_evaluator(format: F, evaluator: Arc<dyn Evaluator>) -> Self {
        Engine { format, evaluator }
    }

    pub fn format(&self) -> &F {
        &self.format
    }

    pub fn evaluator(&self) -> &dyn Evaluator {
        self.evaluator.as_ref()
    }

    /// Renders `represented` into a fresh document.
    pub fn render(
        &self,
        represented: &dyn Represented,
        schema: &Schema,
        options: &Options,
    ) -> Result<F::Document, MappingError> {
        let normalized = self.normalize(schema, options);
        let document = self.compile(represented, schema, &normalized.options)?;
        Ok(self.wrap(document, schema, &normalized.options))
    }

    /// Parses `document` onto `represented` and returns it.
    pub fn parse<'r>(
        &self,
        document: &F::Document,
        represented: &'r mut dyn Represented,
        schema: &Schema,
        options: &Options,
    ) -> Result<&'r mut dyn Represented, MappingError> {
        let normalized = self.normalize(schema, options);
        let empty;
        let document = match self.unwrap(document, schema, &normalized.options)? {
            Some(inner) => inner,
            None => {
                empty = self.format.document();
                &empty
            }
        };
        self.uncompile(document, &mut *represented, schema, &normalized.options)?;
        Ok(represented)
    }

    /// Renders each item and combines the results into one collection document.
    ///
    /// Options are normalized once for all items. The document-level wrap
    /// encloses the whole collection, not the items.
    pub fn render_collection<'i, I>(
        &self,
        items: I,
        schema: &Schema,
        options: &Options,
    ) -> Result<F::Document, MappingError>
    where
        I: IntoIterator<Item = &'i dyn Represented>,
    {
        let normalized = self.normalize(schema, options);
        let documents = items
            .into_iter()
            .map(|item| self.compile(item, schema, &normalized.options))
            .collect::<Result<Vec<_>, _>>()?;
        let document = self.format.collect(documents)?;
        Ok(self.wrap(document, schema, &normalized.options))
    }

    /// Parses a collection document into freshly constructed objects.
    pub fn parse_collection<T>(
        &self,
        document: &F::Document,
        schema: &Schema,
        options: &Options,
    ) -> Result<Vec<T>, MappingError>
    where
        T: Represented + Default,
    {
        let normalized = self.normalize(schema, options);
        let Some(document) = self.unwrap(document, schema, &normalized.options)? else {
            return Ok(Vec::new());
        };
        let mut parsed = Vec::new();
        for item in self.format.items(document)? {
            let mut represented = T::default();
            self.uncompile(item, &mut represented, schema, &normalized.options)?;
            parsed.push(represented);
        }
        Ok(parsed)
    }

    /// Renders a single object or a collection, whichever `target` is.
    pub fn represent<'i>(
        &self,
        target: impl Into<Representation<'i>>,
        schema: &Schema,
        options: &Options,
    ) -> Result<F::Document, MappingError> {
        match target.into() {
            Representation::Single(one) => self.render(one, schema, options),
            Representation::Collection(items) => self.render_collection(items, schema, options),
        }
    }

    fn normalize<'o>(&self, schema: &Schema, options: &'o Options) -> Normalized<'o> {
        let normalized = options.normalize(schema);
        if normalized.is_deprecated() {
            log::warn!(
                "mixing user and mapping options is deprecated, pass {:?} via `user_options`",
                normalized.migrated
            );
        }
        normalized
    }

    fn compile(
        &self,
        represented: &dyn Represented,
        schema: &Schema,
        options: &Options,
    ) -> Result<F::Document, MappingError> {
        let mut document = self.format.document();
        let mut ctx = Context::new(
            Phase::Compile,
            Slot::Building(&mut document),
            Subject::Reading(represented),
            options,
            schema,
            self,
        );
        self.traverse(Phase::Compile, &mut ctx)?;
        Ok(document)
    }

    fn uncompile(
        &self,
        document: &F::Document,
        represented: &mut dyn Represented,
        schema: &Schema,
        options: &Options,
    ) -> Result<(), MappingError> {
        let mut ctx = Context::new(
            Phase::Uncompile,
            Slot::Reading(document),
            Subject::Writing(represented),
            options,
            schema,
            self,
        );
        self.traverse(Phase::Uncompile, &mut ctx)
    }

    fn traverse(&self, phase: Phase, ctx: &mut Context<'_, F>) -> Result<(), MappingError> {
        ctx.schema().validate()?;
        let bindings = BindingMap::build(ctx.schema(), &self.format);
        log::debug!("{phase}: {} bindings", bindings.len());
        bindings.call(phase, ctx)
    }

    fn wrap(&self, document: F::Document, schema: &Schema, options: &Options) -> F::Document {
        match schema.wrap_for(options) {
            Some(wrap) => self.format.wrap(document, &wrap),
            None => document,
        }
    }

    fn unwrap<'d>(
        &self,
        document: &'d F::Document,
        schema: &Schema,
        options: &Options,
    ) -> Result<Option<&'d F::Document>, MappingError> {
        match schema.wrap_for(options) {
            Some(wrap) => self.format.unwrap(document, &wrap),
            None => Ok(Some(document)),
        }
    }
}

impl<F: Format + fmt::Debug> fmt::Debug for Engine<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("format", &self.format)
            .field("evaluator", &self.evaluator)
            .finish()
    }
}
