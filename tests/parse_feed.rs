//! Integration tests for parsing whole documents through the public API.
//!
//! Each test parses with its own identifier pool so id accounting can be
//! checked in isolation.

use feedtree::feed::{self, ParseError, ParserOptions, RssParser};
use feedtree::ids::IdPool;
use feedtree::model::{ElementKind, FeedCollection};
use pretty_assertions::assert_eq;

const MINIMAL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>T</title>
    <link>L</link>
    <description>D</description>
    <item>
      <title>I1</title>
      <guid>g1</guid>
      <pubDate>Tue, 10 Jun 2003 04:00:00 GMT</pubDate>
    </item>
  </channel>
</rss>"#;

// ============================================================================
// Round trip
// ============================================================================

#[test]
fn test_minimal_document_round_trip() {
    let pool = IdPool::new();
    let channel = feed::parse(&pool, MINIMAL.as_bytes()).unwrap();

    assert_eq!(
        channel
            .get_element(ElementKind::Title)
            .and_then(|e| e.as_text().map(str::to_owned)),
        Some("T".to_owned())
    );
    assert_eq!(channel.link().as_deref(), Some("L"));
    assert_eq!(channel.value(ElementKind::Description).as_deref(), Some("D"));
    assert_eq!(channel.count(), 1);

    let item = channel.get_item(0).unwrap();
    assert_eq!(item.guid(), Some("g1"));
    assert_eq!(item.title(), Some("I1"));
    assert_eq!(item.pub_date().and_then(|d| d.timestamp()), Some(1055217600));
}

#[test]
fn test_every_node_has_a_distinct_id() {
    let pool = IdPool::new();
    let channel = feed::parse(&pool, MINIMAL.as_bytes()).unwrap();

    let mut ids = vec![channel.id()];
    ids.extend(channel.elements().iter().map(|e| e.id()));
    for item in channel.items() {
        ids.push(item.id());
        ids.extend(item.elements().map(|e| e.id()));
    }
    let live = ids.len();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), live);
    assert_eq!(pool.in_use(), live);

    drop(channel);
    assert_eq!(pool.in_use(), 0);
}

#[test]
fn test_parent_links_point_at_owners() {
    let pool = IdPool::new();
    let channel = feed::parse(&pool, MINIMAL.as_bytes()).unwrap();
    for element in channel.elements() {
        assert_eq!(element.parent(), Some(channel.id()));
    }
    let item = channel.get_item(0).unwrap();
    assert_eq!(item.parent(), Some(channel.id()));
    for element in item.elements() {
        assert_eq!(element.parent(), Some(item.id()));
    }
}

// ============================================================================
// Malformed input
// ============================================================================

#[test]
fn test_unterminated_tag_yields_nothing() {
    let pool = IdPool::new();
    let truncated = &MINIMAL[..MINIMAL.find("</item>").unwrap()];
    assert!(feed::parse(&pool, truncated.as_bytes()).is_none());
    assert!(feed::parse(&pool, b"<rss><channel><title>T</titl").is_none());
    assert_eq!(pool.in_use(), 0);
}

#[test]
fn test_garbage_and_empty_input() {
    let pool = IdPool::new();
    assert!(feed::parse(&pool, b"").is_none());
    assert!(feed::parse(&pool, b"\x00\x01\x02 not xml").is_none());
    assert!(feed::parse(&pool, b"<html><body>hi</body></html>").is_none());
}

#[test]
fn test_error_variants_describe_the_failure() {
    let options = ParserOptions::default();

    let err = RssParser::new(IdPool::new(), options)
        .parse(b"<rss><channel></rss>")
        .unwrap_err();
    assert!(matches!(err, ParseError::Malformed { .. }));
    assert!(err.to_string().starts_with("malformed XML"));

    let err = RssParser::new(IdPool::new(), options)
        .parse(b"<rss/>")
        .unwrap_err();
    assert!(matches!(err, ParseError::NoChannel));
}

#[test]
fn test_strict_mode_rejects_duplicate_item_elements() {
    let xml = "<rss><channel><item><guid>a</guid><guid>b</guid></item></channel></rss>";
    let lenient = RssParser::new(IdPool::new(), ParserOptions::default())
        .parse(xml.as_bytes())
        .unwrap();
    assert_eq!(lenient.get_item(0).unwrap().guid(), Some("a"));

    let strict = ParserOptions {
        strict: true,
        ..Default::default()
    };
    let pool = IdPool::new();
    let err = RssParser::new(pool.clone(), strict)
        .parse(xml.as_bytes())
        .unwrap_err();
    assert!(matches!(err, ParseError::DuplicateElement(ElementKind::Guid)));
    assert_eq!(pool.in_use(), 0);
}

// ============================================================================
// Streaming input
// ============================================================================

#[tokio::test]
async fn test_ingest_document_read_from_disk() {
    let dir = std::env::temp_dir().join("feedtree_parse_feed_disk");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("feed.xml");
    tokio::fs::write(&path, MINIMAL).await.unwrap();

    let bytes = tokio::fs::read(&path).await.unwrap();
    let collection = FeedCollection::default();
    let channel = collection.ingest(&bytes).unwrap();
    assert_eq!(channel.title().as_deref(), Some("T"));
    assert_eq!(collection.len(), 1);

    let file = std::fs::File::open(&path).unwrap();
    let streamed = RssParser::new(IdPool::new(), ParserOptions::default())
        .parse_reader(std::io::BufReader::new(file))
        .unwrap();
    assert_eq!(streamed.count(), 1);

    std::fs::remove_dir_all(&dir).ok();
}
