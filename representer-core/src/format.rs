use std::sync::Arc;

use crate::binding::Binding;
use crate::definition::Definition;
use crate::error::MappingError;

/// A document format: builds bindings and owns the document representation.
///
/// Formats operate on their own documents only. The engine never looks
/// inside a document; it creates fresh ones, threads references through
/// and hands them to the bindings this trait builds.
///
/// The wrap and collection hooks have defaults so that a format only
/// needs `document` and `build` to be usable.
pub trait Format: Sized + 'static {
    type Document;

    /// Creates an empty document for a render call.
    fn document(&self) -> Self::Document;

    /// Creates the binding for one property.
    fn build(&self, definition: &Arc<Definition>) -> Box<dyn Binding<Self>>;

    /// Places `document` inside an enclosing `wrap`.
    fn wrap(&self, document: Self::Document, _wrap: &str) -> Self::Document {
        document
    }

    /// Finds the content enclosed by `wrap`; `None` if the wrapper is missing.
    fn unwrap<'d>(
        &self,
        document: &'d Self::Document,
        _wrap: &str,
    ) -> Result<Option<&'d Self::Document>, MappingError> {
        Ok(Some(document))
    }

    /// Combines per-item documents into one collection document.
    fn collect(&self, _items: Vec<Self::Document>) -> Result<Self::Document, MappingError> {
        Err(MappingError::Document(
            "this format does not support collections".to_string(),
        ))
    }

    /// Splits a collection document into per-item documents.
    fn items<'d>(&self, _document: &'d Self::Document) -> Result<Vec<&'d Self::Document>, MappingError> {
        Err(MappingError::Document(
            "this format does not support collections".to_string(),
        ))
    }
}
