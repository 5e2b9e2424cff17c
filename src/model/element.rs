//! Leaf nodes of the document model.
//!
//! An [`Element`] is immutable once built: the parser gathers every field of a
//! composite payload (image, text input, ...) before constructing it. The only
//! mutable part is the parent back-reference, which is rewritten when a merge
//! moves the element into another channel.

use chrono::Weekday;
use std::sync::atomic::{AtomicU64, Ordering};
use url::Url;

use super::date::FeedDate;
use super::kind::ElementKind;
use crate::ids::{ElementId, IdPool, RawId};

/// Default `<image>` width per RSS 2.0.
pub const DEFAULT_IMAGE_WIDTH: u32 = 88;
/// Default `<image>` height per RSS 2.0.
pub const DEFAULT_IMAGE_HEIGHT: u32 = 31;
/// Default `<cloud>` port.
pub const DEFAULT_CLOUD_PORT: u16 = 80;

const DAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

// ============================================================================
// Parent back-reference
// ============================================================================

/// Non-owning link from a node to its owner, stored as the owner's raw id.
///
/// Resolved only by searching the owning collection; never dereferenced.
#[derive(Debug)]
pub(crate) struct ParentLink(AtomicU64);

impl ParentLink {
    const NONE: u64 = u64::MAX;

    pub(crate) fn new(parent: Option<RawId>) -> Self {
        Self(AtomicU64::new(parent.map_or(Self::NONE, u64::from)))
    }

    pub(crate) fn get(&self) -> Option<RawId> {
        match self.0.load(Ordering::Acquire) {
            Self::NONE => None,
            raw => RawId::try_from(raw).ok(),
        }
    }

    pub(crate) fn set(&self, parent: Option<RawId>) {
        self.0
            .store(parent.map_or(Self::NONE, u64::from), Ordering::Release);
    }
}

// ============================================================================
// Payloads
// ============================================================================

/// `<image>` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub url: String,
    pub link: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub width: u32,
    pub height: u32,
}

/// `<cloud>` payload, read entirely from attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cloud {
    pub domain: String,
    pub port: u16,
    pub path: String,
    pub register_procedure: String,
    pub protocol: String,
}

/// `<enclosure>` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enclosure {
    pub url: String,
    /// Size in bytes; 0 when the feed omitted it or it was not a number.
    pub length: u64,
    pub mime_type: String,
}

/// Shared shape of `<source url="...">` and `<category domain="...">`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    /// `url` for a source, `domain` for a category.
    pub url: Option<String>,
    pub text: String,
}

/// `<textInput>` payload. Every sub-element is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub name: Option<String>,
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementData {
    /// Title, description, GUID, author, language, copyright, editors, generator.
    Text(String),
    /// Link, docs, comments.
    Link(String),
    Date(FeedDate),
    /// TTL, and the skipHours/skipDays bitmasks.
    Integer(i64),
    Image(Image),
    Cloud(Cloud),
    Enclosure(Enclosure),
    /// Source and category.
    Source(Source),
    TextInput(TextInput),
}

// ============================================================================
// Element
// ============================================================================

#[derive(Debug)]
pub struct Element {
    id: ElementId,
    kind: ElementKind,
    parent: ParentLink,
    data: ElementData,
}

impl Element {
    pub fn new(
        pool: &IdPool,
        kind: ElementKind,
        data: ElementData,
        parent: Option<RawId>,
    ) -> Self {
        Self {
            id: pool.lease(),
            kind,
            parent: ParentLink::new(parent),
            data,
        }
    }

    pub fn text(
        pool: &IdPool,
        kind: ElementKind,
        text: impl Into<String>,
        parent: Option<RawId>,
    ) -> Self {
        Self::new(pool, kind, ElementData::Text(text.into()), parent)
    }

    pub fn link(
        pool: &IdPool,
        kind: ElementKind,
        url: impl Into<String>,
        parent: Option<RawId>,
    ) -> Self {
        Self::new(pool, kind, ElementData::Link(url.into()), parent)
    }

    pub fn date(
        pool: &IdPool,
        kind: ElementKind,
        date: impl Into<String>,
        parent: Option<RawId>,
    ) -> Self {
        Self::new(pool, kind, ElementData::Date(FeedDate::new(date)), parent)
    }

    pub fn integer(pool: &IdPool, kind: ElementKind, value: i64, parent: Option<RawId>) -> Self {
        Self::new(pool, kind, ElementData::Integer(value), parent)
    }

    pub fn image(pool: &IdPool, image: Image, parent: Option<RawId>) -> Self {
        Self::new(pool, ElementKind::Image, ElementData::Image(image), parent)
    }

    pub fn cloud(pool: &IdPool, cloud: Cloud, parent: Option<RawId>) -> Self {
        Self::new(pool, ElementKind::Cloud, ElementData::Cloud(cloud), parent)
    }

    pub fn enclosure(pool: &IdPool, enclosure: Enclosure, parent: Option<RawId>) -> Self {
        Self::new(
            pool,
            ElementKind::Enclosure,
            ElementData::Enclosure(enclosure),
            parent,
        )
    }

    /// Builds a source or category leaf; `kind` picks which.
    pub fn source(pool: &IdPool, kind: ElementKind, source: Source, parent: Option<RawId>) -> Self {
        Self::new(pool, kind, ElementData::Source(source), parent)
    }

    pub fn text_input(pool: &IdPool, input: TextInput, parent: Option<RawId>) -> Self {
        Self::new(
            pool,
            ElementKind::TextInput,
            ElementData::TextInput(input),
            parent,
        )
    }

    pub fn id(&self) -> RawId {
        self.id.get()
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// Raw id of the owning channel or item.
    pub fn parent(&self) -> Option<RawId> {
        self.parent.get()
    }

    pub(crate) fn set_parent(&self, parent: Option<RawId>) {
        self.parent.set(parent);
    }

    pub fn data(&self) -> &ElementData {
        &self.data
    }

    /// Leaves have no children.
    pub fn count(&self) -> usize {
        0
    }

    pub fn is_empty(&self) -> bool {
        true
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.data {
            ElementData::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_link(&self) -> Option<&str> {
        match &self.data {
            ElementData::Link(url) => Some(url),
            _ => None,
        }
    }

    /// The link parsed as an absolute URL, if it is one.
    pub fn as_url(&self) -> Option<Url> {
        self.as_link().and_then(|link| Url::parse(link).ok())
    }

    pub fn as_date(&self) -> Option<&FeedDate> {
        match &self.data {
            ElementData::Date(date) => Some(date),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self.data {
            ElementData::Integer(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&Image> {
        match &self.data {
            ElementData::Image(image) => Some(image),
            _ => None,
        }
    }

    pub fn as_cloud(&self) -> Option<&Cloud> {
        match &self.data {
            ElementData::Cloud(cloud) => Some(cloud),
            _ => None,
        }
    }

    pub fn as_enclosure(&self) -> Option<&Enclosure> {
        match &self.data {
            ElementData::Enclosure(enclosure) => Some(enclosure),
            _ => None,
        }
    }

    pub fn as_source(&self) -> Option<&Source> {
        match &self.data {
            ElementData::Source(source) => Some(source),
            _ => None,
        }
    }

    pub fn as_text_input(&self) -> Option<&TextInput> {
        match &self.data {
            ElementData::TextInput(input) => Some(input),
            _ => None,
        }
    }

    /// The single string a text-like leaf carries: text, link, date text or
    /// source/category text.
    pub fn value(&self) -> Option<&str> {
        match &self.data {
            ElementData::Text(text) | ElementData::Link(text) => Some(text),
            ElementData::Date(date) => Some(date.as_str()),
            ElementData::Source(source) => Some(&source.text),
            _ => None,
        }
    }

    /// Hours (0-23) listed by a `skipHours` leaf.
    pub fn skip_hours(&self) -> Vec<u8> {
        match (self.kind, self.as_integer()) {
            (ElementKind::SkipHours, Some(mask)) => {
                (0u8..24).filter(|h| mask & (1 << h) != 0).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Weekdays listed by a `skipDays` leaf.
    pub fn skip_days(&self) -> Vec<Weekday> {
        match (self.kind, self.as_integer()) {
            (ElementKind::SkipDays, Some(mask)) => DAYS
                .iter()
                .enumerate()
                .filter(|(bit, _)| mask & (1 << bit) != 0)
                .map(|(_, day)| *day)
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Bit for an `<hour>` value, or `None` outside 0-23.
pub fn hour_bit(hour: &str) -> Option<i64> {
    match hour.trim().parse::<u8>() {
        Ok(h) if h < 24 => Some(1 << h),
        _ => None,
    }
}

/// Bit for a `<day>` name (Monday = bit 0), case-insensitive.
pub fn day_bit(day: &str) -> Option<i64> {
    let day: Weekday = day.trim().parse().ok()?;
    Some(1 << day.num_days_from_monday())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_releases_id_on_drop() {
        let pool = IdPool::new();
        let title = Element::text(&pool, ElementKind::Title, "T", None);
        assert_eq!(title.id(), 0);
        assert_eq!(pool.in_use(), 1);
        drop(title);
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    fn test_parent_link_can_be_rewritten() {
        let pool = IdPool::new();
        let link = Element::link(&pool, ElementKind::Link, "https://a.example", Some(7));
        assert_eq!(link.parent(), Some(7));
        link.set_parent(Some(9));
        assert_eq!(link.parent(), Some(9));
        link.set_parent(None);
        assert_eq!(link.parent(), None);
    }

    #[test]
    fn test_leaves_report_no_children() {
        let pool = IdPool::new();
        let ttl = Element::integer(&pool, ElementKind::Ttl, 60, None);
        assert_eq!(ttl.count(), 0);
        assert!(ttl.is_empty());
        assert_eq!(ttl.as_integer(), Some(60));
        assert_eq!(ttl.as_text(), None);
    }

    #[test]
    fn test_value_covers_text_like_payloads() {
        let pool = IdPool::new();
        let date = Element::date(&pool, ElementKind::PubDate, "2003-06-10", None);
        let category = Element::source(
            &pool,
            ElementKind::Category,
            Source {
                url: Some("dmoz".into()),
                text: "Rust".into(),
            },
            None,
        );
        assert_eq!(date.value(), Some("2003-06-10"));
        assert_eq!(category.value(), Some("Rust"));
    }

    #[test]
    fn test_as_url_requires_absolute_url() {
        let pool = IdPool::new();
        let absolute = Element::link(&pool, ElementKind::Link, "https://example.com/a", None);
        let relative = Element::link(&pool, ElementKind::Link, "/a", None);
        assert_eq!(
            absolute.as_url().map(|u| u.host_str().map(str::to_owned)),
            Some(Some("example.com".to_owned()))
        );
        assert!(relative.as_url().is_none());
    }

    #[test]
    fn test_skip_masks_decode() {
        let pool = IdPool::new();
        let hours = hour_bit("0").unwrap() | hour_bit("23").unwrap();
        let days = day_bit("Saturday").unwrap() | day_bit("sunday").unwrap();
        let skip_hours = Element::integer(&pool, ElementKind::SkipHours, hours, None);
        let skip_days = Element::integer(&pool, ElementKind::SkipDays, days, None);
        assert_eq!(skip_hours.skip_hours(), vec![0, 23]);
        assert_eq!(skip_days.skip_days(), vec![Weekday::Sat, Weekday::Sun]);
        assert!(skip_hours.skip_days().is_empty());
    }

    #[test]
    fn test_hour_and_day_bits_reject_garbage() {
        assert_eq!(hour_bit("24"), None);
        assert_eq!(hour_bit("noon"), None);
        assert_eq!(day_bit("Caturday"), None);
    }
}
