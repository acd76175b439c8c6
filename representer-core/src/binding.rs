use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::definition::Definition;
use crate::error::MappingError;
use crate::format::Format;
use crate::schema::Schema;

/// Direction of a mapping call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Object to document (render).
    Compile,
    /// Document to object (parse).
    Uncompile,
}

impl Phase {
    /// Runs this phase's leaf action of `binding`.
    pub fn invoke<F: Format>(self, binding: &dyn Binding<F>, ctx: &mut Context<'_, F>) -> Result<(), MappingError> {
        match self {
            Phase::Compile => binding.compile(ctx),
            Phase::Uncompile => binding.uncompile(ctx),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Compile => f.write_str("compile"),
            Phase::Uncompile => f.write_str("uncompile"),
        }
    }
}

/// Adapter mapping one property between an object and a document.
///
/// Bindings are built per call by the [`Format`] and dropped when the call
/// returns.
pub trait Binding<F: Format> {
    fn definition(&self) -> &Arc<Definition>;

    fn name(&self) -> &str {
        self.definition().name()
    }

    /// Reads the property from the represented object and writes it into the document.
    fn compile(&self, ctx: &mut Context<'_, F>) -> Result<(), MappingError>;

    /// Reads the property's fragment from the document and writes it onto the object.
    fn uncompile(&self, ctx: &mut Context<'_, F>) -> Result<(), MappingError>;
}

/// Ordered bindings of one call, unique by property name.
pub struct BindingMap<F: Format> {
    bindings: Vec<Box<dyn Binding<F>>>,
}

impl<F: Format> BindingMap<F> {
    pub fn new() -> Self {
        BindingMap { bindings: Vec::new() }
    }

    /// Asks `format` for one binding per definition, in declaration order.
    pub fn build(schema: &Schema, format: &F) -> Self {
        let mut map = BindingMap::new();
        for definition in schema {
            map.insert(format.build(definition));
        }
        map
    }

    /// Appends `binding`, or replaces the binding of the same name in place.
    pub fn insert(&mut self, binding: Box<dyn Binding<F>>) {
        // Linear scan; maps are built once per call from an already unique schema.
        match self.bindings.iter().position(|b| b.name() == binding.name()) {
            Some(index) => self.bindings[index] = binding,
            None => self.bindings.push(binding),
        }
    }

    /// Runs `phase` over every binding in order.
    ///
    /// The same context is reused for every binding: only its current
    /// definition is swapped before each leaf runs. The first error stops
    /// the traversal and is returned as is.
    pub fn call(&self, phase: Phase, ctx: &mut Context<'_, F>) -> Result<(), MappingError> {
        for binding in &self.bindings {
            ctx.current = Some(Arc::clone(binding.definition()));
            log::trace!("{phase} `{}`", binding.name());
            phase.invoke(binding.as_ref(), ctx)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|b| b.name())
    }

    pub fn get(&self, name: &str) -> Option<&dyn Binding<F>> {
        self.bindings
            .iter()
            .find(|b| b.name() == name)
            .map(|b| b.as_ref())
    }
}

impl<F: Format> Default for BindingMap<F> {
    fn default() -> Self {
        Self::new()
    }
}
