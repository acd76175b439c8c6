//! Attaching schemas to types and to single instances.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::definition::Definition;
use crate::engine::Engine;
use crate::error::{MappingError, SchemaError};
use crate::format::Format;
use crate::options::Options;
use crate::represented::{Representable, Represented};
use crate::schema::Schema;

/// Shared, type-level schema handle.
///
/// Clones share one schema. Declarations are copy-on-write: a call that
/// already took a [`snapshot`](Self::snapshot) keeps the schema it started
/// with, while every later call observes the new declaration.
#[derive(Clone, Default)]
pub struct TypeSchema(Arc<RwLock<Arc<Schema>>>);

impl TypeSchema {
    pub fn new(schema: Schema) -> Self {
        TypeSchema(Arc::new(RwLock::new(Arc::new(schema))))
    }

    /// Builds the handle from the schema `T` registers.
    pub fn of<T: Representable>() -> Self {
        Self::new(T::schema())
    }

    /// A new, independent handle starting from a copy of this schema.
    ///
    /// Used for derived types: declarations on the child never reach the
    /// parent and vice versa.
    pub fn inherit(&self) -> Self {
        Self::new(self.snapshot().derive())
    }

    pub fn snapshot(&self) -> Arc<Schema> {
        Arc::clone(&self.0.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// A copy of the current schema, detached from this handle.
    pub fn derive(&self) -> Schema {
        self.snapshot().derive()
    }

    /// Adds or overrides one property of the type.
    pub fn declare(&self, definition: Definition) -> Result<(), SchemaError> {
        let mut guard = self.0.write().unwrap_or_else(PoisonError::into_inner);
        Arc::make_mut(&mut guard).declare(definition)?;
        Ok(())
    }

    /// Pairs `value` with this type-level schema.
    pub fn prepare<T: Represented>(&self, value: T) -> Decorator<T> {
        Decorator {
            value,
            attachment: Attachment::Type(self.clone()),
        }
    }
}

impl fmt::Debug for TypeSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeSchema").field(&self.snapshot()).finish()
    }
}

/// Where a decorator's schema comes from.
#[derive(Debug, Clone)]
pub enum Attachment {
    /// Shared with the type; follows later type-level declarations.
    Type(TypeSchema),
    /// Private to one instance.
    Instance(Arc<Schema>),
}

impl Attachment {
    pub fn schema(&self) -> Arc<Schema> {
        match self {
            Attachment::Type(shared) => shared.snapshot(),
            Attachment::Instance(schema) => Arc::clone(schema),
        }
    }
}

/// A represented value together with the schema it maps through.
#[derive(Debug)]
pub struct Decorator<T> {
    value: T,
    attachment: Attachment,
}

impl<T: Represented> Decorator<T> {
    /// Attaches `schema` to `value` alone.
    pub fn new(value: T, schema: Schema) -> Self {
        Decorator {
            value,
            attachment: Attachment::Instance(Arc::new(schema)),
        }
    }

    /// Replaces this instance's schema with `schema`.
    ///
    /// The previous attachment is dropped, not merged. Afterwards the
    /// instance no longer follows its type.
    pub fn extend(&mut self, schema: Schema) -> &mut Self {
        log::debug!("instance attachment replaced ({} properties)", schema.len());
        self.attachment = Attachment::Instance(Arc::new(schema));
        self
    }

    pub fn attachment(&self) -> &Attachment {
        &self.attachment
    }

    pub fn schema(&self) -> Arc<Schema> {
        self.attachment.schema()
    }

    pub fn represented(&self) -> &T {
        &self.value
    }

    pub fn represented_mut(&mut self) -> &mut T {
        &mut self.value
    }

    pub fn into_inner(self) -> T {
        self.value
    }

    pub fn render<F: Format>(&self, engine: &Engine<F>, options: &Options) -> Result<F::Document, MappingError> {
        engine.render(&self.value, &self.schema(), options)
    }

    /// Parses `document` onto the wrapped value and returns it.
    pub fn parse<F: Format>(
        &mut self,
        engine: &Engine<F>,
        document: &F::Document,
        options: &Options,
    ) -> Result<&mut T, MappingError> {
        let schema = self.schema();
        engine.parse(document, &mut self.value, &schema, options)?;
        Ok(&mut self.value)
    }
}
