//! Where the parser currently is inside an RSS 2.0 document.
//!
//! One variant per tag context the parser understands. Unknown tags never
//! produce a position; the parser skips their whole subtree instead.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Position {
    /// Outside any `<channel>` (the `<rss>` wrapper, prolog, ...).
    Document,
    Channel,
    ChannelTitle,
    ChannelLink,
    ChannelDescription,
    ChannelLanguage,
    ChannelCopyright,
    ChannelManagingEditor,
    ChannelWebMaster,
    ChannelPubDate,
    ChannelLastBuildDate,
    ChannelCategory,
    ChannelGenerator,
    ChannelDocs,
    ChannelCloud,
    ChannelTtl,
    Image,
    ImageUrl,
    ImageTitle,
    ImageLink,
    ImageDescription,
    ImageWidth,
    ImageHeight,
    TextInput,
    TextInputTitle,
    TextInputDescription,
    TextInputName,
    TextInputLink,
    SkipHours,
    SkipHoursHour,
    SkipDays,
    SkipDaysDay,
    Item,
    ItemTitle,
    ItemLink,
    ItemDescription,
    ItemAuthor,
    ItemCategory,
    ItemComments,
    ItemEnclosure,
    ItemGuid,
    ItemPubDate,
    ItemSource,
}

impl Position {
    /// Position reached by opening `tag` here, if the tag is understood.
    pub(crate) fn enter(self, tag: &str) -> Option<Position> {
        use Position::*;
        let next = match (self, tag) {
            (Document, "channel") => Channel,

            (Channel, "title") => ChannelTitle,
            (Channel, "link") => ChannelLink,
            (Channel, "description") => ChannelDescription,
            (Channel, "language") => ChannelLanguage,
            (Channel, "copyright") => ChannelCopyright,
            (Channel, "managingEditor") => ChannelManagingEditor,
            (Channel, "webMaster") => ChannelWebMaster,
            (Channel, "pubDate") => ChannelPubDate,
            (Channel, "lastBuildDate") => ChannelLastBuildDate,
            (Channel, "category") => ChannelCategory,
            (Channel, "generator") => ChannelGenerator,
            (Channel, "docs") => ChannelDocs,
            (Channel, "cloud") => ChannelCloud,
            (Channel, "ttl") => ChannelTtl,
            (Channel, "image") => Image,
            (Channel, "textInput") => TextInput,
            (Channel, "skipHours") => SkipHours,
            (Channel, "skipDays") => SkipDays,
            (Channel, "item") => Item,

            (Image, "url") => ImageUrl,
            (Image, "title") => ImageTitle,
            (Image, "link") => ImageLink,
            (Image, "description") => ImageDescription,
            (Image, "width") => ImageWidth,
            (Image, "height") => ImageHeight,

            (TextInput, "title") => TextInputTitle,
            (TextInput, "description") => TextInputDescription,
            (TextInput, "name") => TextInputName,
            (TextInput, "link") => TextInputLink,

            (SkipHours, "hour") => SkipHoursHour,
            (SkipDays, "day") => SkipDaysDay,

            (Item, "title") => ItemTitle,
            (Item, "link") => ItemLink,
            (Item, "description") => ItemDescription,
            (Item, "author") => ItemAuthor,
            (Item, "category") => ItemCategory,
            (Item, "comments") => ItemComments,
            (Item, "enclosure") => ItemEnclosure,
            (Item, "guid") => ItemGuid,
            (Item, "pubDate") => ItemPubDate,
            (Item, "source") => ItemSource,

            _ => return None,
        };
        Some(next)
    }

    /// Position restored when this one closes.
    pub(crate) fn parent(self) -> Position {
        use Position::*;
        match self {
            Document | Channel => Document,
            ImageUrl | ImageTitle | ImageLink | ImageDescription | ImageWidth | ImageHeight => {
                Image
            }
            TextInputTitle | TextInputDescription | TextInputName | TextInputLink => TextInput,
            SkipHoursHour => SkipHours,
            SkipDaysDay => SkipDays,
            ItemTitle | ItemLink | ItemDescription | ItemAuthor | ItemCategory | ItemComments
            | ItemEnclosure | ItemGuid | ItemPubDate | ItemSource => Item,
            _ => Channel,
        }
    }

    /// Tag that closes this position. Never matches for `Document`.
    pub(crate) fn tag(self) -> &'static str {
        use Position::*;
        match self {
            Document => "",
            Channel => "channel",
            ChannelTitle | ImageTitle | TextInputTitle | ItemTitle => "title",
            ChannelLink | ImageLink | TextInputLink | ItemLink => "link",
            ChannelDescription | ImageDescription | TextInputDescription | ItemDescription => {
                "description"
            }
            ChannelLanguage => "language",
            ChannelCopyright => "copyright",
            ChannelManagingEditor => "managingEditor",
            ChannelWebMaster => "webMaster",
            ChannelPubDate | ItemPubDate => "pubDate",
            ChannelLastBuildDate => "lastBuildDate",
            ChannelCategory | ItemCategory => "category",
            ChannelGenerator => "generator",
            ChannelDocs => "docs",
            ChannelCloud => "cloud",
            ChannelTtl => "ttl",
            Image => "image",
            ImageUrl => "url",
            ImageWidth => "width",
            ImageHeight => "height",
            TextInput => "textInput",
            TextInputName => "name",
            SkipHours => "skipHours",
            SkipHoursHour => "hour",
            SkipDays => "skipDays",
            SkipDaysDay => "day",
            Item => "item",
            ItemAuthor => "author",
            ItemComments => "comments",
            ItemEnclosure => "enclosure",
            ItemGuid => "guid",
            ItemSource => "source",
        }
    }

    /// True where character data is meaningful. Bare numbers directly under
    /// `<skipHours>`/`<skipDays>` are accepted too.
    pub(crate) fn collects_text(self) -> bool {
        use Position::*;
        !matches!(
            self,
            Document | Channel | ChannelCloud | Image | TextInput | Item | ItemEnclosure
        )
    }
}
