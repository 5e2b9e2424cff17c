//! Row/parent addressing over a [`FeedCollection`] for two-level tree views.
//!
//! The tree has an invisible root whose children are the channels in
//! collection order; each channel's children are its items in feed order.
//! A [`Handle`] records the row it was resolved at together with the node's
//! [`NodeKey`]. Raw ids are recycled, so the key also carries the node's
//! lease generation, and a handle that has gone stale after a mutation
//! resolves to nothing instead of to a different node.

use std::fmt;
use std::sync::Arc;

use super::channel::Channel;
use super::collection::FeedCollection;
use super::element::Element;
use super::item::Item;
use super::kind::ElementKind;
use crate::ids::RawId;

/// Identity of a channel or item that survives id reuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeKey {
    pub id: RawId,
    pub generation: u64,
}

impl NodeKey {
    fn of_channel(channel: &Channel) -> Self {
        Self {
            id: channel.id(),
            generation: channel.generation(),
        }
    }

    fn of_item(item: &Item) -> Self {
        Self {
            id: item.id(),
            generation: item.generation(),
        }
    }
}

/// Opaque address of a node in the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handle {
    Root,
    Channel { row: usize, key: NodeKey },
    Item { channel: NodeKey, row: usize, key: NodeKey },
}

impl Handle {
    /// Row within the parent; the root has none.
    pub fn row(self) -> Option<usize> {
        match self {
            Handle::Root => None,
            Handle::Channel { row, .. } | Handle::Item { row, .. } => Some(row),
        }
    }

    pub fn id(self) -> Option<RawId> {
        match self {
            Handle::Root => None,
            Handle::Channel { key, .. } | Handle::Item { key, .. } => Some(key.id),
        }
    }
}

/// A presentation field a view can ask a node for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Title,
    Link,
    Description,
    Language,
    Copyright,
    ManagingEditor,
    WebMaster,
    PubDate,
    LastBuildDate,
    Category,
    CategoryDomain,
    Generator,
    Docs,
    CloudDomain,
    CloudPort,
    CloudPath,
    CloudRegisterProcedure,
    CloudProtocol,
    Ttl,
    ImageUrl,
    ImageTitle,
    ImageLink,
    ImageDescription,
    ImageWidth,
    ImageHeight,
    TextInputTitle,
    TextInputDescription,
    TextInputName,
    TextInputLink,
    SkipHours,
    SkipDays,
    Author,
    Comments,
    Guid,
    Source,
    SourceUrl,
    EnclosureUrl,
    EnclosureLength,
    EnclosureType,
}

impl Role {
    /// Kind of the leaf that answers this role.
    pub fn kind(self) -> ElementKind {
        use Role::*;
        match self {
            Title => ElementKind::Title,
            Link => ElementKind::Link,
            Description => ElementKind::Description,
            Language => ElementKind::Language,
            Copyright => ElementKind::Copyright,
            ManagingEditor => ElementKind::ManagingEditor,
            WebMaster => ElementKind::WebMaster,
            PubDate => ElementKind::PubDate,
            LastBuildDate => ElementKind::LastBuildDate,
            Category | CategoryDomain => ElementKind::Category,
            Generator => ElementKind::Generator,
            Docs => ElementKind::Docs,
            CloudDomain | CloudPort | CloudPath | CloudRegisterProcedure | CloudProtocol => {
                ElementKind::Cloud
            }
            Ttl => ElementKind::Ttl,
            ImageUrl | ImageTitle | ImageLink | ImageDescription | ImageWidth | ImageHeight => {
                ElementKind::Image
            }
            TextInputTitle | TextInputDescription | TextInputName | TextInputLink => {
                ElementKind::TextInput
            }
            SkipHours => ElementKind::SkipHours,
            SkipDays => ElementKind::SkipDays,
            Author => ElementKind::Author,
            Comments => ElementKind::Comments,
            Guid => ElementKind::Guid,
            Source | SourceUrl => ElementKind::Source,
            EnclosureUrl | EnclosureLength | EnclosureType => ElementKind::Enclosure,
        }
    }
}

/// Value of a [`Role`] for one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            FieldValue::Integer(_) => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(value) => Some(*value),
            FieldValue::Text(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(text) => f.write_str(text),
            FieldValue::Integer(value) => write!(f, "{value}"),
        }
    }
}

/// Resolves view addresses against a live collection.
///
/// Handles are only meaningful until the next mutation of the collection or
/// of the channel they point into; callers re-resolve after a change.
#[derive(Debug, Clone, Copy)]
pub struct AddressResolver<'a> {
    collection: &'a FeedCollection,
}

impl<'a> AddressResolver<'a> {
    pub fn new(collection: &'a FeedCollection) -> Self {
        Self { collection }
    }

    pub fn root(&self) -> Handle {
        Handle::Root
    }

    /// The `row`-th child of `parent`, or `None` if out of range.
    pub fn resolve_address(&self, row: usize, parent: Handle) -> Option<Handle> {
        match parent {
            Handle::Root => {
                let channel = self.collection.channel_at(row)?;
                Some(Handle::Channel {
                    row,
                    key: NodeKey::of_channel(&channel),
                })
            }
            Handle::Channel { key, .. } => {
                let channel = self.channel(parent)?;
                let item = channel.get_item(row)?;
                Some(Handle::Item {
                    channel: key,
                    row,
                    key: NodeKey::of_item(&item),
                })
            }
            Handle::Item { .. } => None,
        }
    }

    /// The channel an item handle sits under.
    ///
    /// Channels and the root report no parent.
    pub fn resolve_parent(&self, handle: Handle) -> Option<Handle> {
        match handle {
            Handle::Item { channel, .. } => {
                let (row, _) = self.find_channel(channel)?;
                Some(Handle::Channel { row, key: channel })
            }
            Handle::Root | Handle::Channel { .. } => None,
        }
    }

    /// Number of children under `handle`.
    pub fn child_count(&self, handle: Handle) -> usize {
        match handle {
            Handle::Root => self.collection.len(),
            Handle::Channel { .. } => self.channel(handle).map_or(0, |c| c.count()),
            Handle::Item { .. } => 0,
        }
    }

    /// The channel a channel or item handle refers to.
    pub fn channel(&self, handle: Handle) -> Option<Arc<Channel>> {
        match handle {
            Handle::Channel { row, key } => self
                .collection
                .channel_at(row)
                .filter(|channel| NodeKey::of_channel(channel) == key),
            Handle::Item { channel, .. } => self.find_channel(channel).map(|(_, found)| found),
            Handle::Root => None,
        }
    }

    pub fn item(&self, handle: Handle) -> Option<Arc<Item>> {
        let Handle::Item { row, key, .. } = handle else {
            return None;
        };
        self.channel(handle)?
            .get_item(row)
            .filter(|item| NodeKey::of_item(item) == key)
    }

    /// Linear search for the channel with `key`, wherever it now sits.
    fn find_channel(&self, key: NodeKey) -> Option<(usize, Arc<Channel>)> {
        let row = self.collection.index_of(key.id)?;
        self.collection
            .channel_at(row)
            .filter(|channel| NodeKey::of_channel(channel) == key)
            .map(|channel| (row, channel))
    }

    /// Value of `role` for the node at `handle`.
    pub fn data(&self, handle: Handle, role: Role) -> Option<FieldValue> {
        match handle {
            Handle::Root => None,
            Handle::Channel { .. } => {
                let element = self.channel(handle)?.get_element(role.kind())?;
                field(&element, role)
            }
            Handle::Item { .. } => {
                let item = self.item(handle)?;
                field(item.get_element(role.kind())?, role)
            }
        }
    }
}

fn text(value: &str) -> Option<FieldValue> {
    Some(FieldValue::Text(value.to_owned()))
}

fn optional(value: Option<&String>) -> Option<FieldValue> {
    value.and_then(|value| text(value))
}

fn field(element: &Element, role: Role) -> Option<FieldValue> {
    use Role::*;
    match role {
        Title | Description | Language | Copyright | ManagingEditor | WebMaster | Generator
        | Author | Guid | Link | Docs | Comments | PubDate | LastBuildDate | Category | Source => {
            element.value().and_then(text)
        }
        CategoryDomain | SourceUrl => optional(element.as_source()?.url.as_ref()),
        Ttl => element.as_integer().map(FieldValue::Integer),

        CloudDomain => text(&element.as_cloud()?.domain),
        CloudPort => Some(FieldValue::Integer(i64::from(element.as_cloud()?.port))),
        CloudPath => text(&element.as_cloud()?.path),
        CloudRegisterProcedure => text(&element.as_cloud()?.register_procedure),
        CloudProtocol => text(&element.as_cloud()?.protocol),

        ImageUrl => text(&element.as_image()?.url),
        ImageTitle => optional(element.as_image()?.title.as_ref()),
        ImageLink => optional(element.as_image()?.link.as_ref()),
        ImageDescription => optional(element.as_image()?.description.as_ref()),
        ImageWidth => Some(FieldValue::Integer(i64::from(element.as_image()?.width))),
        ImageHeight => Some(FieldValue::Integer(i64::from(element.as_image()?.height))),

        TextInputTitle => optional(element.as_text_input()?.title.as_ref()),
        TextInputDescription => optional(element.as_text_input()?.description.as_ref()),
        TextInputName => optional(element.as_text_input()?.name.as_ref()),
        TextInputLink => optional(element.as_text_input()?.link.as_ref()),

        SkipHours => {
            let hours: Vec<String> = element.skip_hours().iter().map(u8::to_string).collect();
            Some(FieldValue::Text(hours.join(", ")))
        }
        SkipDays => {
            let days: Vec<String> = element.skip_days().iter().map(|d| d.to_string()).collect();
            Some(FieldValue::Text(days.join(", ")))
        }

        EnclosureUrl => text(&element.as_enclosure()?.url),
        EnclosureLength => i64::try_from(element.as_enclosure()?.length)
            .ok()
            .map(FieldValue::Integer),
        EnclosureType => text(&element.as_enclosure()?.mime_type),
    }
}
