//! Turning RSS documents into [`Channel`](crate::model::Channel)s.
//!
//! - [`sax`] - callback-driven reading on top of `quick-xml`
//! - `parser` - the RSS 2.0 handler that builds the document model
//!
//! # Example
//!
//! ```
//! use feedtree::feed::{ParserOptions, RssParser};
//! use feedtree::ids::IdPool;
//!
//! let xml = br#"<rss version="2.0"><channel><title>T</title></channel></rss>"#;
//! let channel = RssParser::new(IdPool::new(), ParserOptions::default())
//!     .parse(xml)
//!     .unwrap();
//! assert_eq!(channel.title().as_deref(), Some("T"));
//! ```

mod parser;
pub mod sax;
mod state;

pub use parser::{
    parse, ParseError, ParserOptions, RssParser, DEFAULT_MAX_DEPTH, DEFAULT_MAX_DOCUMENT_BYTES,
};
