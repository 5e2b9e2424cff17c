use std::sync::Arc;

use super::element::Element;
use super::kind::ElementKind;
use super::ModelError;

/// At most one element per [`ElementKind`], stored in a fixed slot per kind.
#[derive(Debug)]
pub(crate) struct ElementMap {
    slots: [Option<Arc<Element>>; ElementKind::COUNT],
    len: usize,
}

impl ElementMap {
    pub(crate) fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
            len: 0,
        }
    }

    pub(crate) fn get(&self, kind: ElementKind) -> Option<&Arc<Element>> {
        self.slots[kind.index()].as_ref()
    }

    pub(crate) fn contains(&self, kind: ElementKind) -> bool {
        self.slots[kind.index()].is_some()
    }

    /// Stores `element` in its kind's slot.
    ///
    /// An occupied slot is only overwritten when `replace` is set; the
    /// displaced element is returned so the caller decides when it drops.
    pub(crate) fn insert(
        &mut self,
        element: Arc<Element>,
        replace: bool,
    ) -> Result<Option<Arc<Element>>, ModelError> {
        let slot = &mut self.slots[element.kind().index()];
        if slot.is_some() && !replace {
            return Err(ModelError::DuplicateKind(element.kind()));
        }
        let previous = slot.replace(element);
        if previous.is_none() {
            self.len += 1;
        }
        Ok(previous)
    }

    /// Empties the map, handing every element to the caller in kind order.
    pub(crate) fn drain(&mut self) -> Vec<Arc<Element>> {
        self.len = 0;
        self.slots.iter_mut().filter_map(Option::take).collect()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Arc<Element>> {
        self.slots.iter().flatten()
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }
}
