//! Local shape selection used to pick the two ends of a new arrow.

#[cfg(test)]
#[path = "selection_test.rs"]
mod selection_test;

use frames::ObjectId;

use crate::doc::ObjectRegistry;

/// Arrow creation was attempted without exactly two selected shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("arrow needs exactly two selected shapes, {selected} selected")]
pub struct SelectionCountError {
    pub selected: usize,
}

/// Ordered set of selected shape ids, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: Vec<ObjectId>,
}

impl Selection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a circle or rectangle. Returns `false` if `id` is not a shape in
    /// the registry or is already selected.
    pub fn select(&mut self, registry: &ObjectRegistry, id: &str) -> bool {
        let is_shape = registry.get(id).is_some_and(|obj| obj.kind().is_shape());
        if !is_shape || self.contains(id) {
            return false;
        }
        self.ids.push(id.to_owned());
        true
    }

    /// Returns `false` if `id` was not selected.
    pub fn deselect(&mut self, id: &str) -> bool {
        let before = self.ids.len();
        self.ids.retain(|selected| selected != id);
        self.ids.len() != before
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Drop ids that no longer exist in the registry.
    pub fn retain_existing(&mut self, registry: &ObjectRegistry) {
        self.ids.retain(|id| registry.contains(id));
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|selected| selected == id)
    }

    #[must_use]
    pub fn ids(&self) -> &[ObjectId] {
        &self.ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The two selected shapes as `(source, target)` in selection order.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionCountError`] unless exactly two shapes are selected.
    pub fn pair(&self) -> Result<(ObjectId, ObjectId), SelectionCountError> {
        match self.ids.as_slice() {
            [source, target] => Ok((source.clone(), target.clone())),
            other => Err(SelectionCountError { selected: other.len() }),
        }
    }
}
