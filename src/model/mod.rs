//! In-memory RSS document model.
//!
//! A [`FeedCollection`] owns [`Channel`]s; a channel owns metadata
//! [`Element`]s and [`Item`]s; an item owns its own leaves. Every node leases
//! a unique id from an [`IdPool`](crate::ids::IdPool) and gives it back on
//! drop. [`AddressResolver`] exposes the tree as row/parent addresses for a
//! two-level view.

mod address;
mod channel;
mod collection;
mod date;
mod element;
mod item;
mod kind;
mod map;

pub use address::{AddressResolver, FieldValue, Handle, NodeKey, Role};
pub use channel::{Channel, ItemAdded, RefeedPolicy};
pub use collection::FeedCollection;
pub use date::{parse_date, FeedDate};
pub use element::{
    day_bit, hour_bit, Cloud, Element, ElementData, Enclosure, Image, Source, TextInput,
    DEFAULT_CLOUD_PORT, DEFAULT_IMAGE_HEIGHT, DEFAULT_IMAGE_WIDTH,
};
pub use item::Item;
pub use kind::ElementKind;

use thiserror::Error;

/// Errors raised by model mutations.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("an element of kind <{0}> is already present")]
    DuplicateKind(ElementKind),
}

impl ModelError {
    /// Kind of the element that was rejected.
    pub fn kind(self) -> ElementKind {
        match self {
            ModelError::DuplicateKind(kind) => kind,
        }
    }
}
