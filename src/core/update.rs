//! Entity update builder.

use crate::core::normalizer::Normalized;
use crate::prelude::*;

/// Collects the attributes to write onto a single entity.
#[derive(Clone, PartialEq, Debug)]
pub struct Update {
    pub entity_id: i64,
    pub attributes: Vec<Attribute>,
}

impl Update {
    pub fn new(entity_id: i64) -> Self {
        Self {
            entity_id,
            attributes: Vec::new(),
        }
    }

    pub fn value(mut self, value: f64) -> Self {
        self.attributes.push(Attribute::Value(value));
        self
    }

    pub fn annotation<A: Into<String>>(mut self, annotation: A) -> Self {
        self.attributes.push(Attribute::Annotation(annotation.into()));
        self
    }

    /// Leaves the previous annotation untouched when `None`.
    pub fn optional_annotation<A: Into<String>>(self, annotation: Option<A>) -> Self {
        match annotation {
            Some(annotation) => self.annotation(annotation),
            None => self,
        }
    }

    /// Writes the attributes in the order they were added, stopping at the first failure.
    pub fn write_to<S: DeviceStore>(&self, store: &S) -> Result {
        for attribute in self.attributes.iter() {
            store.write_attribute(self.entity_id, attribute)?;
        }
        Ok(())
    }
}

impl From<(i64, Normalized)> for Update {
    fn from((entity_id, normalized): (i64, Normalized)) -> Self {
        Update::new(entity_id)
            .value(normalized.value)
            .optional_annotation(normalized.annotation)
    }
}
