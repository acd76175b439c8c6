//! A minimal in-memory format and a loose record type for unit tests.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::binding::Binding;
use crate::context::Context;
use crate::definition::Definition;
use crate::error::MappingError;
use crate::format::Format;
use crate::represented::{Property, Represented};

/// Tree documents: ordered branches of named nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Leaf(Value),
    Branch(Vec<(String, Node)>),
    List(Vec<Node>),
}

impl Node {
    pub fn keys(&self) -> Vec<&str> {
        match self {
            Node::Branch(fields) => fields.iter().map(|(k, _)| k.as_str()).collect(),
            Node::Leaf(_) | Node::List(_) => Vec::new(),
        }
    }

    fn field(&self, name: &str) -> Option<&Node> {
        match self {
            Node::Branch(fields) => fields.iter().find(|(k, _)| k == name).map(|(_, v)| v),
            Node::Leaf(_) | Node::List(_) => None,
        }
    }

    fn push(&mut self, name: &str, node: Node) -> Result<(), MappingError> {
        match self {
            Node::Branch(fields) => {
                fields.push((name.to_string(), node));
                Ok(())
            }
            Node::Leaf(_) | Node::List(_) => Err(MappingError::Document("not a branch".into())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Tree;

impl Format for Tree {
    type Document = Node;

    fn document(&self) -> Node {
        Node::Branch(Vec::new())
    }

    fn build(&self, definition: &Arc<Definition>) -> Box<dyn Binding<Self>> {
        Box::new(TreeBinding {
            definition: Arc::clone(definition),
        })
    }

    fn wrap(&self, document: Node, wrap: &str) -> Node {
        Node::Branch(vec![(wrap.to_string(), document)])
    }

    fn unwrap<'d>(&self, document: &'d Node, wrap: &str) -> Result<Option<&'d Node>, MappingError> {
        Ok(document.field(wrap))
    }

    fn collect(&self, items: Vec<Node>) -> Result<Node, MappingError> {
        Ok(Node::List(items))
    }

    fn items<'d>(&self, document: &'d Node) -> Result<Vec<&'d Node>, MappingError> {
        match document {
            Node::List(items) => Ok(items.iter().collect()),
            _ => Err(MappingError::Document("not a list".into())),
        }
    }
}

/// Maps plain values to leaves and nested values to branches.
///
/// A `fail` option makes both directions return its value as an error. A
/// `misuse` option makes render ask for the object mutably.
pub struct TreeBinding {
    definition: Arc<Definition>,
}

impl TreeBinding {
    pub fn new(definition: Definition) -> Self {
        TreeBinding {
            definition: Arc::new(definition),
        }
    }

    fn check(&self, ctx: &Context<'_, Tree>) -> Result<(), MappingError> {
        match ctx.evaluate("fail")? {
            Some(Value::String(message)) => Err(MappingError::custom(message)),
            Some(_) => Err(MappingError::custom("failed")),
            None => Ok(()),
        }
    }
}

impl Binding<Tree> for TreeBinding {
    fn definition(&self) -> &Arc<Definition> {
        &self.definition
    }

    fn compile(&self, ctx: &mut Context<'_, Tree>) -> Result<(), MappingError> {
        self.check(ctx)?;
        if ctx.evaluate("misuse")?.is_some() {
            ctx.represented_mut()?;
        }
        let name = self.name();
        let node = match ctx.represented().read(name)? {
            Property::Value(Value::Null) | Property::Nested(None) => return Ok(()),
            Property::Value(value) => Node::Leaf(value),
            Property::Nested(Some(child)) => {
                let schema = self.definition.schema()?;
                let options = ctx.child_options(&self.definition);
                ctx.engine().render(child, &schema, &options)?
            }
            Property::Collection(_) => {
                return Err(MappingError::Document("collections are not mapped".into()))
            }
        };
        ctx.document_mut()?.push(name, node)
    }

    fn uncompile(&self, ctx: &mut Context<'_, Tree>) -> Result<(), MappingError> {
        self.check(ctx)?;
        let name = self.name();
        let Some(node) = ctx.source()?.field(name) else {
            return Ok(());
        };
        if self.definition.is_nested() {
            let schema = self.definition.schema()?;
            let options = ctx.child_options(&self.definition);
            let engine = ctx.engine();
            let child = ctx.represented_mut()?.nested_mut(name)?;
            engine.parse(node, child, &schema, &options)?;
            return Ok(());
        }
        match node {
            Node::Leaf(value) => ctx.represented_mut()?.write(name, value.clone()),
            _ => Err(MappingError::Document(format!("`{name}` is not a leaf"))),
        }
    }
}

/// Loose object: any name reads as a value, a child or `Null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub values: IndexMap<String, Value>,
    pub children: IndexMap<String, Record>,
}

impl Represented for Record {
    fn read(&self, name: &str) -> Result<Property<'_>, MappingError> {
        if let Some(value) = self.values.get(name) {
            return Ok(Property::Value(value.clone()));
        }
        match self.children.get(name) {
            Some(child) => Ok(Property::Nested(Some(child))),
            None => Ok(Property::Value(Value::Null)),
        }
    }

    fn write(&mut self, name: &str, value: Value) -> Result<(), MappingError> {
        if value.is_null() {
            self.values.shift_remove(name);
            self.children.shift_remove(name);
        } else {
            self.values.insert(name.to_string(), value);
        }
        Ok(())
    }

    fn nested_mut(&mut self, name: &str) -> Result<&mut dyn Represented, MappingError> {
        Ok(self.children.entry(name.to_string()).or_default())
    }
}
