//! Ordered, name-keyed collection of field descriptors for one row type.

use crate::descriptor::RowDescriptor;
use crate::error::Result;
use crate::field::{FieldDescriptor, FieldKind};

/// Field descriptors keyed by name.
///
/// Iteration follows first insertion, which fixes column order in generated
/// SQL. Adding a name twice replaces the descriptor in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSet {
    fields: Vec<FieldDescriptor>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive the field set of a row type from its descriptor.
    ///
    /// A primary key field is always auto-numbered. The first field with an
    /// unknown kind aborts the derivation.
    pub fn derive(descriptor: &RowDescriptor) -> Result<Self> {
        let mut set = Self::new();
        for decl in &descriptor.fields {
            let mut field = FieldDescriptor::parse(&decl.name, &decl.kind)?;
            field.required = decl.required;
            field.auto_number = decl.auto_number;
            field.max_length = decl.max_length;
            field.min = decl.min;
            field.max = decl.max;
            field.precision = decl.precision;
            if decl.primary_key {
                field = field.primary_key();
            }
            set.add_with(field);
        }
        Ok(set)
    }

    /// Add an unconstrained field.
    pub fn add(&mut self, name: impl Into<String>, kind: FieldKind) -> &mut Self {
        self.add_with(FieldDescriptor::new(name, kind))
    }

    pub fn add_with(&mut self, field: FieldDescriptor) -> &mut Self {
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldDescriptor> {
        self.fields.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether the generated table has an AUTOINCREMENT key and therefore a
    /// sequence row to reset.
    pub fn has_auto_number(&self) -> bool {
        self.fields.iter().any(|f| f.primary_key && f.auto_number)
    }
}

impl<'a> IntoIterator for &'a FieldSet {
    type Item = &'a FieldDescriptor;
    type IntoIter = std::slice::Iter<'a, FieldDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
