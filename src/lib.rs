//! An RSS 2.0 document model.
//!
//! Documents are parsed by [`feed::RssParser`] into [`model::Channel`]s, which
//! a [`model::FeedCollection`] keys by channel link so that a refeed updates
//! the existing channel instead of duplicating it. [`model::AddressResolver`]
//! presents the collection as a two-level tree of channels and items.
//!
//! ```
//! use feedtree::model::{AddressResolver, FeedCollection, Role};
//!
//! let collection = FeedCollection::default();
//! collection
//!     .ingest(br#"<rss version="2.0"><channel><title>News</title>
//!         <link>http://example.com/</link>
//!         <item><title>First</title><guid>1</guid></item>
//!     </channel></rss>"#)
//!     .unwrap();
//!
//! let resolver = AddressResolver::new(&collection);
//! let channel = resolver.resolve_address(0, resolver.root()).unwrap();
//! let item = resolver.resolve_address(0, channel).unwrap();
//! assert_eq!(
//!     resolver.data(item, Role::Title).unwrap().to_string(),
//!     "First"
//! );
//! ```

pub mod config;
pub mod feed;
pub mod ids;
pub mod model;
pub mod util;
