use parking_lot::Mutex;
use serde::Deserialize;
use std::sync::Arc;

use super::element::Element;
use super::item::Item;
use super::kind::ElementKind;
use super::map::ElementMap;
use super::ModelError;
use crate::ids::{ElementId, IdPool, RawId};

/// What happens when an incoming item carries a GUID already present in the
/// channel and [`Item::is_newer`] says it should win.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefeedPolicy {
    /// Swap the newer item into the old item's position. A GUID maps to at
    /// most one item.
    #[default]
    Replace,
    /// Append the newer item and keep the stale one.
    Append,
}

/// Outcome of offering an item to a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemAdded {
    /// Appended at the end of the item list.
    Appended,
    /// Replaced the stale duplicate at this row.
    Replaced(usize),
    /// An item with the same GUID exists and is not older; the offer was dropped.
    Rejected,
}

impl ItemAdded {
    pub fn accepted(self) -> bool {
        !matches!(self, ItemAdded::Rejected)
    }
}

/// A `<channel>`: metadata leaves plus an ordered list of items.
///
/// Metadata and items sit behind separate locks so readers of one never wait
/// on writers of the other. No method holds both at once.
#[derive(Debug)]
pub struct Channel {
    id: ElementId,
    version: String,
    refeed: RefeedPolicy,
    elements: Mutex<ElementMap>,
    items: Mutex<Vec<Arc<Item>>>,
}

impl Channel {
    /// Creates an empty channel for a document of the given RSS `version`.
    pub fn new(pool: &IdPool, version: impl Into<String>) -> Self {
        Self {
            id: pool.lease(),
            version: version.into(),
            refeed: RefeedPolicy::default(),
            elements: Mutex::new(ElementMap::new()),
            items: Mutex::new(Vec::new()),
        }
    }

    pub fn with_refeed(mut self, refeed: RefeedPolicy) -> Self {
        self.refeed = refeed;
        self
    }

    pub fn id(&self) -> RawId {
        self.id.get()
    }

    /// Pool-wide lease number; unlike [`id`](Self::id) it is never reused.
    pub fn generation(&self) -> u64 {
        self.id.generation()
    }

    pub fn kind(&self) -> ElementKind {
        ElementKind::Channel
    }

    /// Value of the `version` attribute on `<rss>`; empty when absent.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn refeed_policy(&self) -> RefeedPolicy {
        self.refeed
    }

    // ========================================================================
    // Metadata
    // ========================================================================

    pub fn get_element(&self, kind: ElementKind) -> Option<Arc<Element>> {
        self.elements.lock().get(kind).cloned()
    }

    pub fn has_element(&self, kind: ElementKind) -> bool {
        self.elements.lock().contains(kind)
    }

    /// Adds a metadata leaf. An existing leaf of the same kind is only
    /// overwritten when `replace` is set; otherwise `element` is dropped and
    /// [`ModelError::DuplicateKind`] returned.
    pub fn try_set_element(&self, element: Element, replace: bool) -> Result<(), ModelError> {
        element.set_parent(Some(self.id()));
        self.insert_element(Arc::new(element), replace)
    }

    pub fn set_element(&self, element: Element, replace: bool) -> bool {
        self.try_set_element(element, replace).is_ok()
    }

    fn insert_element(&self, element: Arc<Element>, replace: bool) -> Result<(), ModelError> {
        let previous = self.elements.lock().insert(element, replace)?;
        // The displaced leaf is released after the lock is gone.
        drop(previous);
        Ok(())
    }

    /// Snapshot of the metadata leaves in kind order.
    pub fn elements(&self) -> Vec<Arc<Element>> {
        self.elements.lock().iter().cloned().collect()
    }

    /// Text of a metadata leaf (title, link, date text, category text, ...).
    pub fn value(&self, kind: ElementKind) -> Option<String> {
        self.get_element(kind)
            .and_then(|element| element.value().map(str::to_owned))
    }

    pub fn title(&self) -> Option<String> {
        self.value(ElementKind::Title)
    }

    /// The channel `<link>`, which identifies it across refeeds.
    pub fn link(&self) -> Option<String> {
        self.get_element(ElementKind::Link)
            .and_then(|element| element.as_link().map(str::to_owned))
    }

    /// The link as the collection compares it: normalised when it is an
    /// absolute URL, otherwise the trimmed text.
    pub fn link_key(&self) -> Option<String> {
        let element = self.get_element(ElementKind::Link)?;
        match element.as_url() {
            Some(url) => Some(url.into()),
            None => element.as_link().map(|link| link.trim().to_owned()),
        }
    }

    // ========================================================================
    // Items
    // ========================================================================

    pub fn get_item(&self, index: usize) -> Option<Arc<Item>> {
        self.items.lock().get(index).cloned()
    }

    /// First item carrying `guid`.
    pub fn get_item_by_guid(&self, guid: &str) -> Option<Arc<Item>> {
        self.items
            .lock()
            .iter()
            .find(|item| item.guid() == Some(guid))
            .cloned()
    }

    /// Row of the item with raw id `id`.
    pub fn item_row(&self, id: RawId) -> Option<usize> {
        self.items.lock().iter().position(|item| item.id() == id)
    }

    /// Snapshot of the items in feed order.
    pub fn items(&self) -> Vec<Arc<Item>> {
        self.items.lock().clone()
    }

    /// Offers `item` to the channel, returning whether it was kept.
    ///
    /// Items without a GUID are always appended. An item whose GUID is
    /// already present is kept only if [`Item::is_newer`] prefers it; the
    /// channel's [`RefeedPolicy`] then decides where it goes.
    pub fn add_item(&self, item: Item) -> bool {
        self.offer_item(Arc::new(item)).accepted()
    }

    /// Like [`Channel::add_item`] but reports where the item landed.
    pub fn offer_item(&self, item: Arc<Item>) -> ItemAdded {
        let displaced;
        let outcome = {
            let mut items = self.items.lock();
            let existing = item
                .guid()
                .and_then(|guid| items.iter().position(|old| old.guid() == Some(guid)));
            match existing {
                None => {
                    item.set_parent(Some(self.id()));
                    items.push(item);
                    displaced = None;
                    ItemAdded::Appended
                }
                Some(row) if !Item::is_newer(&item, &items[row]) => {
                    tracing::trace!(
                        channel = self.id(),
                        guid = item.guid().unwrap_or_default(),
                        "Dropping item that is not newer than the stored one"
                    );
                    displaced = Some(item);
                    ItemAdded::Rejected
                }
                Some(row) => {
                    item.set_parent(Some(self.id()));
                    match self.refeed {
                        RefeedPolicy::Replace => {
                            displaced = Some(std::mem::replace(&mut items[row], item));
                            ItemAdded::Replaced(row)
                        }
                        RefeedPolicy::Append => {
                            items.push(item);
                            displaced = None;
                            ItemAdded::Appended
                        }
                    }
                }
            }
        };
        drop(displaced);
        outcome
    }

    // ========================================================================
    // Merge
    // ========================================================================

    /// Moves everything `source` owns into `destination`.
    ///
    /// Metadata leaves overwrite the destination's leaves of the same kind.
    /// Items go through [`Channel::offer_item`], so the destination's refeed
    /// policy applies and stale duplicates are dropped. `source` is left
    /// empty. Merging a channel into itself does nothing.
    pub fn merge(source: &Channel, destination: &Channel) {
        if std::ptr::eq(source, destination) {
            tracing::debug!(channel = source.id(), "Ignoring merge of a channel into itself");
            return;
        }

        let elements = source.elements.lock().drain();
        let moved_elements = elements.len();
        for element in elements {
            element.set_parent(Some(destination.id()));
            if let Err(err) = destination.insert_element(element, true) {
                tracing::warn!(channel = destination.id(), error = %err, "Failed to move element");
            }
        }

        let items = std::mem::take(&mut *source.items.lock());
        let offered = items.len();
        let mut kept = 0;
        for item in items {
            if destination.offer_item(item).accepted() {
                kept += 1;
            }
        }

        tracing::debug!(
            source = source.id(),
            destination = destination.id(),
            elements = moved_elements,
            items_offered = offered,
            items_kept = kept,
            "Merged channel"
        );
    }

    /// Number of items.
    pub fn count(&self) -> usize {
        self.items.lock().len()
    }

    /// True when the channel lacks metadata or lacks items.
    pub fn is_empty(&self) -> bool {
        let no_elements = self.elements.lock().is_empty();
        no_elements || self.items.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn item(pool: &IdPool, guid: Option<&str>, date: Option<&str>, title: &str) -> Item {
        let mut item = Item::new(pool, None);
        if let Some(guid) = guid {
            item.set_element(Element::text(pool, ElementKind::Guid, guid, None), false);
        }
        if let Some(date) = date {
            item.set_element(Element::date(pool, ElementKind::PubDate, date, None), false);
        }
        item.set_element(Element::text(pool, ElementKind::Title, title, None), false);
        item
    }

    fn titles(channel: &Channel) -> Vec<String> {
        channel
            .items()
            .iter()
            .map(|item| item.title().unwrap_or_default().to_owned())
            .collect()
    }

    const OLD: &str = "Mon, 09 Jun 2003 04:00:00 GMT";
    const NEW: &str = "Tue, 10 Jun 2003 04:00:00 GMT";

    #[test]
    fn test_set_element_is_type_singleton() {
        let pool = IdPool::new();
        let channel = Channel::new(&pool, "2.0");
        assert!(channel.set_element(Element::text(&pool, ElementKind::Title, "A", None), false));
        assert!(!channel.set_element(Element::text(&pool, ElementKind::Title, "B", None), false));
        assert_eq!(channel.title().as_deref(), Some("A"));
        assert!(channel.set_element(Element::text(&pool, ElementKind::Title, "C", None), true));
        assert_eq!(channel.title().as_deref(), Some("C"));
        assert_eq!(
            channel.get_element(ElementKind::Title).unwrap().parent(),
            Some(channel.id())
        );
    }

    #[test]
    fn test_add_item_without_guid_always_appends() {
        let pool = IdPool::new();
        let channel = Channel::new(&pool, "2.0");
        assert!(channel.add_item(item(&pool, None, None, "a")));
        assert!(channel.add_item(item(&pool, None, None, "b")));
        assert_eq!(channel.count(), 2);
        assert_eq!(channel.get_item(0).unwrap().parent(), Some(channel.id()));
    }

    #[test]
    fn test_add_item_rejects_stale_duplicate() {
        let pool = IdPool::new();
        let channel = Channel::new(&pool, "2.0");
        assert!(channel.add_item(item(&pool, Some("g"), Some(NEW), "current")));
        assert!(!channel.add_item(item(&pool, Some("g"), Some(OLD), "stale")));
        assert!(!channel.add_item(item(&pool, Some("g"), Some(NEW), "same")));
        assert_eq!(titles(&channel), vec!["current"]);
    }

    #[test]
    fn test_add_item_replaces_newer_duplicate_in_place() {
        let pool = IdPool::new();
        let channel = Channel::new(&pool, "2.0");
        channel.add_item(item(&pool, Some("a"), Some(OLD), "a1"));
        channel.add_item(item(&pool, Some("b"), Some(OLD), "b1"));
        let outcome = channel.offer_item(Arc::new(item(&pool, Some("a"), Some(NEW), "a2")));
        assert_eq!(outcome, ItemAdded::Replaced(0));
        assert_eq!(titles(&channel), vec!["a2", "b1"]);
    }

    #[test]
    fn test_append_policy_keeps_stale_item() {
        let pool = IdPool::new();
        let channel = Channel::new(&pool, "2.0").with_refeed(RefeedPolicy::Append);
        channel.add_item(item(&pool, Some("a"), Some(OLD), "a1"));
        assert!(channel.add_item(item(&pool, Some("a"), Some(NEW), "a2")));
        assert_eq!(titles(&channel), vec!["a1", "a2"]);
        assert_eq!(channel.get_item_by_guid("a").unwrap().title(), Some("a1"));
    }

    #[test]
    fn test_undated_duplicates_keep_first() {
        let pool = IdPool::new();
        let channel = Channel::new(&pool, "2.0");
        channel.add_item(item(&pool, Some("g"), None, "first"));
        assert!(!channel.add_item(item(&pool, Some("g"), None, "second")));
        assert_eq!(titles(&channel), vec!["first"]);
    }

    #[test]
    fn test_merge_moves_everything_and_reparents() {
        let pool = IdPool::new();
        let old = Channel::new(&pool, "2.0");
        old.set_element(Element::text(&pool, ElementKind::Title, "Old", None), false);
        old.set_element(Element::integer(&pool, ElementKind::Ttl, 30, None), false);
        old.add_item(item(&pool, Some("a"), Some(OLD), "a1"));

        let fresh = Channel::new(&pool, "2.0");
        fresh.set_element(Element::text(&pool, ElementKind::Title, "New", None), false);
        fresh.add_item(item(&pool, Some("a"), Some(NEW), "a2"));
        fresh.add_item(item(&pool, Some("b"), Some(NEW), "b1"));

        Channel::merge(&fresh, &old);

        assert_eq!(old.title().as_deref(), Some("New"));
        assert_eq!(
            old.get_element(ElementKind::Ttl).and_then(|e| e.as_integer()),
            Some(30)
        );
        assert_eq!(titles(&old), vec!["a2", "b1"]);
        for item in old.items() {
            assert_eq!(item.parent(), Some(old.id()));
        }
        assert_eq!(
            old.get_element(ElementKind::Title).unwrap().parent(),
            Some(old.id())
        );
        assert_eq!(fresh.count(), 0);
        assert!(fresh.elements().is_empty());
    }

    #[test]
    fn test_merge_into_self_is_noop() {
        let pool = IdPool::new();
        let channel = Channel::new(&pool, "2.0");
        channel.set_element(Element::text(&pool, ElementKind::Title, "T", None), false);
        channel.add_item(item(&pool, Some("a"), Some(OLD), "a1"));
        let live = pool.in_use();

        Channel::merge(&channel, &channel);

        assert_eq!(titles(&channel), vec!["a1"]);
        assert_eq!(channel.title().as_deref(), Some("T"));
        assert_eq!(pool.in_use(), live);
    }

    #[test]
    fn test_replaced_item_ids_are_released() {
        let pool = IdPool::new();
        let channel = Channel::new(&pool, "2.0");
        channel.add_item(item(&pool, Some("a"), Some(OLD), "a1"));
        let before = pool.in_use();
        channel.add_item(item(&pool, Some("a"), Some(NEW), "a2"));
        assert_eq!(pool.in_use(), before);
        channel.add_item(item(&pool, Some("a"), Some(OLD), "stale"));
        assert_eq!(pool.in_use(), before);
    }

    #[test]
    fn test_is_empty_needs_metadata_and_items() {
        let pool = IdPool::new();
        let channel = Channel::new(&pool, "2.0");
        assert!(channel.is_empty());
        channel.set_element(Element::text(&pool, ElementKind::Title, "T", None), false);
        assert!(channel.is_empty());
        channel.add_item(item(&pool, None, None, "x"));
        assert!(!channel.is_empty());
    }

    #[test]
    fn test_is_empty_does_not_hold_metadata_lock_while_waiting_on_items() {
        let pool = IdPool::new();
        let channel = Channel::new(&pool, "2.0");
        channel.set_element(Element::text(&pool, ElementKind::Title, "T", None), false);

        let items = channel.items.lock();
        std::thread::scope(|scope| {
            let waiter = scope.spawn(|| channel.is_empty());
            std::thread::sleep(std::time::Duration::from_millis(50));
            assert!(channel.elements.try_lock().is_some());
            drop(items);
            assert!(waiter.join().unwrap());
        });
    }

    #[test]
    fn test_concurrent_adds_keep_one_item_per_guid() {
        let pool = IdPool::new();
        let channel = Arc::new(Channel::new(&pool, "2.0"));
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let channel = Arc::clone(&channel);
                let pool = pool.clone();
                std::thread::spawn(move || {
                    for n in 0..20 {
                        let guid = format!("g{}", n % 5);
                        let date = format!("2003-06-{:02}", 1 + (worker + n) % 28);
                        channel.add_item(item(&pool, Some(&guid), Some(&date), "t"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(channel.count(), 5);
    }
}
