use std::sync::Arc;

use super::date::FeedDate;
use super::element::{Element, ParentLink};
use super::kind::ElementKind;
use super::map::ElementMap;
use super::ModelError;
use crate::ids::{ElementId, IdPool, RawId};

/// One `<item>` of a channel.
///
/// Items are built by the parser on a single thread and never mutated after
/// they are published into a [`Channel`](super::Channel), so the element map
/// is not locked.
#[derive(Debug)]
pub struct Item {
    id: ElementId,
    parent: ParentLink,
    elements: ElementMap,
}

impl Item {
    pub fn new(pool: &IdPool, parent: Option<RawId>) -> Self {
        Self {
            id: pool.lease(),
            parent: ParentLink::new(parent),
            elements: ElementMap::new(),
        }
    }

    pub fn id(&self) -> RawId {
        self.id.get()
    }

    /// Pool-wide lease number; unlike [`id`](Self::id) it is never reused.
    pub fn generation(&self) -> u64 {
        self.id.generation()
    }

    /// Raw id of the owning channel.
    pub fn parent(&self) -> Option<RawId> {
        self.parent.get()
    }

    pub(crate) fn set_parent(&self, parent: Option<RawId>) {
        self.parent.set(parent);
    }

    pub fn kind(&self) -> ElementKind {
        ElementKind::Item
    }

    pub fn get_element(&self, kind: ElementKind) -> Option<&Element> {
        self.elements.get(kind).map(Arc::as_ref)
    }

    pub fn has_element(&self, kind: ElementKind) -> bool {
        self.elements.contains(kind)
    }

    /// Adds `element`, replacing an existing one of the same kind only when
    /// `replace` is set. A rejected element is dropped.
    pub fn try_set_element(&mut self, element: Element, replace: bool) -> Result<(), ModelError> {
        element.set_parent(Some(self.id()));
        self.elements
            .insert(Arc::new(element), replace)
            .map(|_previous| ())
    }

    /// Boolean form of [`Item::try_set_element`].
    pub fn set_element(&mut self, element: Element, replace: bool) -> bool {
        self.try_set_element(element, replace).is_ok()
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter().map(Arc::as_ref)
    }

    pub fn guid(&self) -> Option<&str> {
        self.get_element(ElementKind::Guid).and_then(Element::as_text)
    }

    pub fn title(&self) -> Option<&str> {
        self.get_element(ElementKind::Title).and_then(Element::as_text)
    }

    pub fn link(&self) -> Option<&str> {
        self.get_element(ElementKind::Link).and_then(Element::as_link)
    }

    pub fn pub_date(&self) -> Option<&FeedDate> {
        self.get_element(ElementKind::PubDate)
            .and_then(Element::as_date)
    }

    /// Decides whether `new_item` should supersede `old_item`.
    ///
    /// A missing `pubDate` on either side never blocks the newcomer, unless
    /// both lack one: that pair ties and the existing item stays.
    pub fn is_newer(new_item: &Item, old_item: &Item) -> bool {
        match (new_item.pub_date(), old_item.pub_date()) {
            (Some(new), Some(old)) => new.is_newer_than(old),
            (None, None) => false,
            _ => true,
        }
    }

    /// Number of child elements.
    pub fn count(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}
