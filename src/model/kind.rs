use std::fmt;

/// The closed set of RSS node categories.
///
/// Leaf kinds key the type-singleton maps of [`Channel`](super::Channel) and
/// [`Item`](super::Item); `Item` and `Channel` name the composites themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ElementKind {
    Url = 0,
    Link,
    Title,
    Description,
    Language,
    Copyright,
    ManagingEditor,
    WebMaster,
    PubDate,
    LastBuildDate,
    Category,
    Generator,
    Docs,
    Cloud,
    Ttl,
    Image,
    TextInput,
    SkipHours,
    SkipDays,
    Enclosure,
    Item,
    Guid,
    Author,
    Source,
    Comments,
    Channel,
}

impl ElementKind {
    /// Number of kinds; sizes the singleton maps.
    pub const COUNT: usize = 26;

    pub const ALL: [ElementKind; Self::COUNT] = [
        ElementKind::Url,
        ElementKind::Link,
        ElementKind::Title,
        ElementKind::Description,
        ElementKind::Language,
        ElementKind::Copyright,
        ElementKind::ManagingEditor,
        ElementKind::WebMaster,
        ElementKind::PubDate,
        ElementKind::LastBuildDate,
        ElementKind::Category,
        ElementKind::Generator,
        ElementKind::Docs,
        ElementKind::Cloud,
        ElementKind::Ttl,
        ElementKind::Image,
        ElementKind::TextInput,
        ElementKind::SkipHours,
        ElementKind::SkipDays,
        ElementKind::Enclosure,
        ElementKind::Item,
        ElementKind::Guid,
        ElementKind::Author,
        ElementKind::Source,
        ElementKind::Comments,
        ElementKind::Channel,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// RSS 2.0 tag name for this kind.
    pub fn tag(self) -> &'static str {
        match self {
            ElementKind::Url => "url",
            ElementKind::Link => "link",
            ElementKind::Title => "title",
            ElementKind::Description => "description",
            ElementKind::Language => "language",
            ElementKind::Copyright => "copyright",
            ElementKind::ManagingEditor => "managingEditor",
            ElementKind::WebMaster => "webMaster",
            ElementKind::PubDate => "pubDate",
            ElementKind::LastBuildDate => "lastBuildDate",
            ElementKind::Category => "category",
            ElementKind::Generator => "generator",
            ElementKind::Docs => "docs",
            ElementKind::Cloud => "cloud",
            ElementKind::Ttl => "ttl",
            ElementKind::Image => "image",
            ElementKind::TextInput => "textInput",
            ElementKind::SkipHours => "skipHours",
            ElementKind::SkipDays => "skipDays",
            ElementKind::Enclosure => "enclosure",
            ElementKind::Item => "item",
            ElementKind::Guid => "guid",
            ElementKind::Author => "author",
            ElementKind::Source => "source",
            ElementKind::Comments => "comments",
            ElementKind::Channel => "channel",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
