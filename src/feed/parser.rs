//! RSS 2.0 document parser.
//!
//! [`RssParser`] is a [`SaxHandler`] that tracks its [`Position`] in the tag
//! hierarchy and builds a [`Channel`] as the document streams past. Text is
//! buffered per element and committed when the element closes; composite
//! leaves (`<image>`, `<textInput>`, `<skipHours>`, `<skipDays>`) gather
//! their sub-elements first and become one leaf on their own end tag.
//!
//! The parser reads RSS 2.0 and the 0.9x dialects that share its element
//! set. Atom, RSS 1.0 and namespaced extensions are not understood; unknown
//! tags are skipped with their whole subtree.

use std::collections::HashMap;
use std::io::BufRead;
use thiserror::Error;

use super::sax::{self, Attributes, SaxHandler, XmlIssue};
use super::state::Position;
use crate::ids::{IdPool, RawId};
use crate::model::{
    day_bit, hour_bit, Channel, Cloud, Element, ElementKind, Enclosure, Image, Item, RefeedPolicy,
    Source, TextInput, DEFAULT_CLOUD_PORT, DEFAULT_IMAGE_HEIGHT, DEFAULT_IMAGE_WIDTH,
};

/// Default cap on the size of one document (10 MiB).
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

/// Default cap on element nesting.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Errors that can occur while parsing a feed document.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The XML was not well-formed.
    #[error("malformed XML at byte {position}: {message}")]
    Malformed { position: u64, message: String },

    /// The document parsed but never opened a `<channel>`.
    #[error("document has no <channel> element")]
    NoChannel,

    /// Strict mode saw a second element of a kind its parent already holds.
    #[error("duplicate <{0}> element")]
    DuplicateElement(ElementKind),

    /// Elements were nested deeper than the configured limit.
    #[error("element nesting exceeds {0} levels")]
    TooDeep(usize),

    /// The document is larger than the configured limit.
    #[error("document is {size} bytes, limit is {limit} bytes")]
    TooLarge { size: usize, limit: usize },
}

impl From<&XmlIssue> for ParseError {
    fn from(issue: &XmlIssue) -> Self {
        ParseError::Malformed {
            position: issue.position,
            message: issue.message.clone(),
        }
    }
}

/// Knobs for one parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    /// Abort on a duplicate element instead of keeping the first.
    pub strict: bool,
    /// Refeed policy given to the channel the parse creates.
    pub refeed: RefeedPolicy,
    pub max_document_bytes: usize,
    pub max_depth: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            strict: false,
            refeed: RefeedPolicy::default(),
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Parses one document into a [`Channel`].
///
/// A parser is single-use: [`RssParser::parse`] consumes it.
#[derive(Debug)]
pub struct RssParser {
    pool: IdPool,
    options: ParserOptions,
    channel: Option<Channel>,
    item: Option<Item>,
    position: Position,
    /// Sub-element values of the composite currently open.
    scratch: HashMap<&'static str, String>,
    /// skipHours/skipDays bits gathered so far.
    mask: i64,
    text: String,
    /// Depth inside an unknown subtree; 0 when not skipping.
    skip_depth: usize,
    depth: usize,
    version: String,
    failure: Option<ParseError>,
}

impl RssParser {
    pub fn new(pool: IdPool, options: ParserOptions) -> Self {
        Self {
            pool,
            options,
            channel: None,
            item: None,
            position: Position::Document,
            scratch: HashMap::new(),
            mask: 0,
            text: String::new(),
            skip_depth: 0,
            depth: 0,
            version: String::new(),
            failure: None,
        }
    }

    /// Parses an in-memory document.
    ///
    /// # Arguments
    ///
    /// * `bytes` - The raw XML
    ///
    /// # Returns
    ///
    /// The channel the document describes, or the reason there is none.
    pub fn parse(self, bytes: &[u8]) -> Result<Channel, ParseError> {
        if bytes.len() > self.options.max_document_bytes {
            return Err(ParseError::TooLarge {
                size: bytes.len(),
                limit: self.options.max_document_bytes,
            });
        }
        self.parse_reader(bytes)
    }

    /// Parses a document from any buffered reader.
    ///
    /// The size cap is not applied here; callers streaming from a file or
    /// socket bound the input themselves.
    pub fn parse_reader<R: BufRead>(mut self, input: R) -> Result<Channel, ParseError> {
        let completed = sax::drive(input, &mut self);
        if let Some(err) = self.failure.take() {
            return Err(err);
        }
        if !completed {
            return Err(ParseError::Malformed {
                position: 0,
                message: "parse stopped early".to_string(),
            });
        }
        // Drop any half-built item before releasing the channel.
        self.item = None;
        let channel = self.channel.take().ok_or(ParseError::NoChannel)?;
        tracing::debug!(
            channel = channel.id(),
            version = channel.version(),
            items = channel.count(),
            "Parsed channel"
        );
        Ok(channel)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn channel_id(&self) -> Option<RawId> {
        self.channel.as_ref().map(Channel::id)
    }

    fn item_id(&self) -> Option<RawId> {
        self.item.as_ref().map(Item::id)
    }

    fn fail(&mut self, err: ParseError) -> bool {
        tracing::debug!(error = %err, "Aborting parse");
        if self.failure.is_none() {
            self.failure = Some(err);
        }
        false
    }

    /// Adds a leaf to the channel, applying the duplicate policy.
    fn set_channel_element(&mut self, element: Element) -> bool {
        let Some(channel) = self.channel.as_ref() else {
            return true;
        };
        match channel.try_set_element(element, false) {
            Ok(()) => true,
            Err(err) => self.duplicate(err.kind()),
        }
    }

    fn set_item_element(&mut self, element: Element) -> bool {
        let Some(item) = self.item.as_mut() else {
            return true;
        };
        match item.try_set_element(element, false) {
            Ok(()) => true,
            Err(err) => self.duplicate(err.kind()),
        }
    }

    fn duplicate(&mut self, kind: ElementKind) -> bool {
        if self.options.strict {
            return self.fail(ParseError::DuplicateElement(kind));
        }
        tracing::warn!(element = %kind, "Ignoring duplicate element, keeping the first");
        true
    }

    fn channel_text(&mut self, kind: ElementKind, text: String) -> bool {
        if text.is_empty() {
            return true;
        }
        let element = Element::text(&self.pool, kind, text, self.channel_id());
        self.set_channel_element(element)
    }

    fn item_text(&mut self, kind: ElementKind, text: String) -> bool {
        if text.is_empty() {
            return true;
        }
        let element = Element::text(&self.pool, kind, text, self.item_id());
        self.set_item_element(element)
    }

    fn take_scratch(&mut self, key: &str) -> Option<String> {
        self.scratch.remove(key).filter(|value| !value.is_empty())
    }

    // ========================================================================
    // Start tags
    // ========================================================================

    fn open(&mut self, next: Position, attributes: &Attributes) -> bool {
        self.text.clear();
        match next {
            Position::Channel => {
                if self.channel.is_none() {
                    let channel = Channel::new(&self.pool, self.version.clone())
                        .with_refeed(self.options.refeed);
                    tracing::trace!(channel = channel.id(), "Opened channel");
                    self.channel = Some(channel);
                }
            }
            Position::Item => {
                self.item = Some(Item::new(&self.pool, self.channel_id()));
            }
            Position::Image | Position::TextInput => self.scratch.clear(),
            Position::SkipHours | Position::SkipDays => self.mask = 0,
            Position::ChannelCategory | Position::ItemCategory => {
                let domain = attributes.get("domain").unwrap_or_default();
                self.scratch.insert("domain", domain.to_owned());
            }
            Position::ItemSource => {
                let url = attributes.get("url").unwrap_or_default();
                self.scratch.insert("url", url.to_owned());
            }
            Position::ChannelCloud => return self.open_cloud(attributes),
            Position::ItemEnclosure => return self.open_enclosure(attributes),
            _ => {}
        }
        true
    }

    fn open_cloud(&mut self, attributes: &Attributes) -> bool {
        let Some(domain) = attributes.get("domain").filter(|d| !d.is_empty()) else {
            tracing::debug!("Skipping <cloud> without a domain");
            return true;
        };
        let port = match attributes.get("port").map(str::trim) {
            None | Some("") => DEFAULT_CLOUD_PORT,
            Some(port) => port.parse().unwrap_or_else(|_| {
                tracing::warn!(port, "Invalid <cloud> port, using default");
                DEFAULT_CLOUD_PORT
            }),
        };
        let cloud = Cloud {
            domain: domain.to_owned(),
            port,
            path: attributes.get("path").unwrap_or_default().to_owned(),
            register_procedure: attributes
                .get("registerProcedure")
                .unwrap_or_default()
                .to_owned(),
            protocol: attributes.get("protocol").unwrap_or_default().to_owned(),
        };
        let element = Element::cloud(&self.pool, cloud, self.channel_id());
        self.set_channel_element(element)
    }

    fn open_enclosure(&mut self, attributes: &Attributes) -> bool {
        let Some(url) = attributes.get("url").filter(|u| !u.is_empty()) else {
            tracing::debug!("Skipping <enclosure> without a url");
            return true;
        };
        let enclosure = Enclosure {
            url: url.to_owned(),
            length: attributes
                .get("length")
                .and_then(|length| length.trim().parse().ok())
                .unwrap_or(0),
            mime_type: attributes.get("type").unwrap_or_default().to_owned(),
        };
        let element = Element::enclosure(&self.pool, enclosure, self.item_id());
        self.set_item_element(element)
    }

    // ========================================================================
    // End tags
    // ========================================================================

    fn close(&mut self, position: Position, text: String) -> bool {
        use Position as P;
        match position {
            P::Document | P::Channel | P::ChannelCloud | P::ItemEnclosure => true,

            P::ChannelTitle => self.channel_text(ElementKind::Title, text),
            P::ChannelDescription => self.channel_text(ElementKind::Description, text),
            P::ChannelLanguage => self.channel_text(ElementKind::Language, text),
            P::ChannelCopyright => self.channel_text(ElementKind::Copyright, text),
            P::ChannelManagingEditor => self.channel_text(ElementKind::ManagingEditor, text),
            P::ChannelWebMaster => self.channel_text(ElementKind::WebMaster, text),
            P::ChannelGenerator => self.channel_text(ElementKind::Generator, text),
            P::ChannelLink | P::ChannelDocs => {
                if text.is_empty() {
                    return true;
                }
                let kind = if position == P::ChannelLink {
                    ElementKind::Link
                } else {
                    ElementKind::Docs
                };
                let element = Element::link(&self.pool, kind, text, self.channel_id());
                self.set_channel_element(element)
            }
            P::ChannelPubDate => {
                if text.is_empty() {
                    return true;
                }
                let element =
                    Element::date(&self.pool, ElementKind::PubDate, text, self.channel_id());
                self.set_channel_element(element)
            }
            P::ChannelLastBuildDate => self.close_last_build_date(text),
            P::ChannelCategory => {
                let source = Source {
                    url: self.take_scratch("domain"),
                    text,
                };
                let element =
                    Element::source(&self.pool, ElementKind::Category, source, self.channel_id());
                self.set_channel_element(element)
            }
            P::ChannelTtl => match text.parse::<i64>() {
                Ok(ttl) => {
                    let element =
                        Element::integer(&self.pool, ElementKind::Ttl, ttl, self.channel_id());
                    self.set_channel_element(element)
                }
                Err(_) => {
                    tracing::warn!(ttl = %text, "Ignoring non-numeric <ttl>");
                    true
                }
            },

            P::ImageUrl => self.stash("url", text),
            P::ImageTitle => self.stash("title", text),
            P::ImageLink => self.stash("link", text),
            P::ImageDescription => self.stash("description", text),
            P::ImageWidth => self.stash("width", text),
            P::ImageHeight => self.stash("height", text),
            P::Image => self.close_image(),

            P::TextInputTitle => self.stash("title", text),
            P::TextInputDescription => self.stash("description", text),
            P::TextInputName => self.stash("name", text),
            P::TextInputLink => self.stash("link", text),
            P::TextInput => {
                let input = TextInput {
                    title: self.take_scratch("title"),
                    description: self.take_scratch("description"),
                    name: self.take_scratch("name"),
                    link: self.take_scratch("link"),
                };
                let element = Element::text_input(&self.pool, input, self.channel_id());
                self.set_channel_element(element)
            }

            P::SkipHoursHour => self.add_skip_bit(hour_bit(&text), "hour", &text),
            P::SkipDaysDay => self.add_skip_bit(day_bit(&text), "day", &text),
            P::SkipHours | P::SkipDays => {
                if !text.is_empty() {
                    let bit = if position == P::SkipHours {
                        hour_bit(&text)
                    } else {
                        day_bit(&text)
                    };
                    self.add_skip_bit(bit, position.tag(), &text);
                }
                let kind = if position == P::SkipHours {
                    ElementKind::SkipHours
                } else {
                    ElementKind::SkipDays
                };
                let mask = std::mem::take(&mut self.mask);
                if mask == 0 {
                    return true;
                }
                let element = Element::integer(&self.pool, kind, mask, self.channel_id());
                self.set_channel_element(element)
            }

            P::Item => self.close_item(),
            P::ItemTitle => self.item_text(ElementKind::Title, text),
            P::ItemDescription => self.item_text(ElementKind::Description, text),
            P::ItemAuthor => self.item_text(ElementKind::Author, text),
            P::ItemGuid => self.item_text(ElementKind::Guid, text),
            P::ItemLink | P::ItemComments => {
                if text.is_empty() {
                    return true;
                }
                let kind = if position == P::ItemLink {
                    ElementKind::Link
                } else {
                    ElementKind::Comments
                };
                let element = Element::link(&self.pool, kind, text, self.item_id());
                self.set_item_element(element)
            }
            P::ItemPubDate => {
                if text.is_empty() {
                    return true;
                }
                let element = Element::date(&self.pool, ElementKind::PubDate, text, self.item_id());
                self.set_item_element(element)
            }
            P::ItemCategory | P::ItemSource => {
                let (kind, key) = if position == P::ItemCategory {
                    (ElementKind::Category, "domain")
                } else {
                    (ElementKind::Source, "url")
                };
                let source = Source {
                    url: self.take_scratch(key),
                    text,
                };
                let element = Element::source(&self.pool, kind, source, self.item_id());
                self.set_item_element(element)
            }
        }
    }

    fn stash(&mut self, key: &'static str, text: String) -> bool {
        self.scratch.insert(key, text);
        true
    }

    fn add_skip_bit(&mut self, bit: Option<i64>, tag: &str, text: &str) -> bool {
        match bit {
            Some(bit) => self.mask |= bit,
            None => tracing::warn!(tag, value = text, "Ignoring invalid skip entry"),
        }
        true
    }

    /// `lastBuildDate` is the one leaf a document may restate: a differing
    /// value replaces the stored one.
    fn close_last_build_date(&mut self, text: String) -> bool {
        if text.is_empty() {
            return true;
        }
        let Some(channel) = self.channel.as_ref() else {
            return true;
        };
        let existing = channel.value(ElementKind::LastBuildDate);
        if existing.as_deref() == Some(text.as_str()) {
            return true;
        }
        let element = Element::date(
            &self.pool,
            ElementKind::LastBuildDate,
            text,
            Some(channel.id()),
        );
        channel.set_element(element, existing.is_some())
    }

    fn close_image(&mut self) -> bool {
        let Some(url) = self.take_scratch("url") else {
            tracing::debug!("Skipping <image> without a url");
            self.scratch.clear();
            return true;
        };
        let width = self.dimension("width", DEFAULT_IMAGE_WIDTH);
        let height = self.dimension("height", DEFAULT_IMAGE_HEIGHT);
        let image = Image {
            url,
            link: self.take_scratch("link"),
            title: self.take_scratch("title"),
            description: self.take_scratch("description"),
            width,
            height,
        };
        let element = Element::image(&self.pool, image, self.channel_id());
        self.set_channel_element(element)
    }

    fn dimension(&mut self, key: &str, default: u32) -> u32 {
        match self.take_scratch(key) {
            None => default,
            Some(value) => value.parse().unwrap_or_else(|_| {
                tracing::warn!(key, value = %value, "Invalid <image> dimension, using default");
                default
            }),
        }
    }

    fn close_item(&mut self) -> bool {
        let (Some(item), Some(channel)) = (self.item.take(), self.channel.as_ref()) else {
            return true;
        };
        if !channel.add_item(item) {
            tracing::debug!(channel = channel.id(), "Dropped stale duplicate item");
        }
        true
    }
}

impl SaxHandler for RssParser {
    fn start_element(&mut self, name: &str, attributes: &Attributes) -> bool {
        self.depth += 1;
        if self.depth > self.options.max_depth {
            return self.fail(ParseError::TooDeep(self.options.max_depth));
        }
        if self.skip_depth > 0 {
            self.skip_depth += 1;
            return true;
        }

        match self.position.enter(name) {
            Some(next) => {
                self.position = next;
                self.open(next, attributes)
            }
            None if self.position == Position::Document => {
                if name == "rss" {
                    self.version = attributes.get("version").unwrap_or_default().to_owned();
                }
                true
            }
            None => {
                tracing::trace!(tag = name, position = ?self.position, "Skipping unknown element");
                self.skip_depth = 1;
                true
            }
        }
    }

    fn characters(&mut self, text: &str) -> bool {
        if self.skip_depth == 0 && self.position.collects_text() {
            self.text.push_str(text);
        }
        true
    }

    fn end_element(&mut self, name: &str) -> bool {
        self.depth = self.depth.saturating_sub(1);
        if self.skip_depth > 0 {
            self.skip_depth -= 1;
            return true;
        }
        let position = self.position;
        if name != position.tag() {
            return true;
        }
        let text = std::mem::take(&mut self.text).trim().to_owned();
        self.position = position.parent();
        self.close(position, text)
    }

    fn error(&mut self, issue: &XmlIssue) -> bool {
        tracing::warn!(%issue, "XML error");
        self.fail(issue.into())
    }

    fn fatal_error(&mut self, issue: &XmlIssue) -> bool {
        tracing::warn!(%issue, "Fatal XML error");
        self.fail(issue.into())
    }
}

/// Parses `bytes` with default options, logging and discarding any failure.
pub fn parse(pool: &IdPool, bytes: &[u8]) -> Option<Channel> {
    match RssParser::new(pool.clone(), ParserOptions::default()).parse(bytes) {
        Ok(channel) => Some(channel),
        Err(err) => {
            tracing::warn!(error = %err, "Failed to parse feed");
            None
        }
    }
}
