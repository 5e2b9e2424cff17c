//! Integration tests for refeeding: merging a newer copy of a channel into
//! the one already held, and addressing the result.

use feedtree::feed::ParserOptions;
use feedtree::ids::IdPool;
use feedtree::model::{
    AddressResolver, Channel, Element, ElementKind, FeedCollection, Item, RefeedPolicy, Role,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn document(items: &[(&str, &str, &str)]) -> String {
    let items: String = items
        .iter()
        .map(|(guid, date, title)| {
            format!(
                "<item><guid>{guid}</guid><pubDate>{date}</pubDate><title>{title}</title></item>"
            )
        })
        .collect();
    format!(
        r#"<rss version="2.0"><channel><title>News</title><link>http://news.example/</link>{items}</channel></rss>"#
    )
}

const JUNE_9: &str = "Mon, 09 Jun 2003 04:00:00 GMT";
const JUNE_10: &str = "Tue, 10 Jun 2003 04:00:00 GMT";

fn titles(channel: &Channel) -> Vec<String> {
    channel
        .items()
        .iter()
        .map(|item| item.title().unwrap_or_default().to_owned())
        .collect()
}

// ============================================================================
// Refeed update
// ============================================================================

#[test]
fn test_refeed_keeps_one_item_per_guid_with_newer_payload() {
    let collection = FeedCollection::default();
    collection
        .ingest(document(&[("a", JUNE_9, "a v1"), ("b", JUNE_9, "b v1")]).as_bytes())
        .unwrap();
    let channel = collection
        .ingest(document(&[("a", JUNE_10, "a v2"), ("b", JUNE_9, "b v1 again")]).as_bytes())
        .unwrap();

    assert_eq!(collection.len(), 1);
    assert_eq!(titles(&channel), vec!["a v2", "b v1"]);
    assert_eq!(
        channel
            .get_item_by_guid("a")
            .and_then(|item| item.pub_date().map(|d| d.as_str().to_owned())),
        Some(JUNE_10.to_owned())
    );
}

#[test]
fn test_refeed_with_append_policy_keeps_history() {
    let options = ParserOptions {
        refeed: RefeedPolicy::Append,
        ..Default::default()
    };
    let collection = FeedCollection::new(IdPool::new(), options);
    collection
        .ingest(document(&[("a", JUNE_9, "a v1")]).as_bytes())
        .unwrap();
    let channel = collection
        .ingest(document(&[("a", JUNE_10, "a v2")]).as_bytes())
        .unwrap();
    assert_eq!(titles(&channel), vec!["a v1", "a v2"]);
}

#[test]
fn test_refeed_releases_replaced_nodes() {
    let collection = FeedCollection::default();
    collection
        .ingest(document(&[("a", JUNE_9, "a v1")]).as_bytes())
        .unwrap();
    let live = collection.pool().in_use();
    collection
        .ingest(document(&[("a", JUNE_10, "a v2")]).as_bytes())
        .unwrap();
    assert_eq!(collection.pool().in_use(), live);
}

// ============================================================================
// Merge
// ============================================================================

#[test]
fn test_merge_into_self_preserves_everything() {
    let collection = FeedCollection::default();
    let channel = collection
        .ingest(document(&[("a", JUNE_9, "a"), ("b", JUNE_10, "b")]).as_bytes())
        .unwrap();
    let live = collection.pool().in_use();

    Channel::merge(&channel, &channel);

    assert_eq!(titles(&channel), vec!["a", "b"]);
    assert_eq!(channel.title().as_deref(), Some("News"));
    assert_eq!(collection.pool().in_use(), live);
}

// ============================================================================
// Addressing
// ============================================================================

#[test]
fn test_every_item_resolves_back_to_its_channel() {
    let collection = FeedCollection::default();
    collection
        .ingest(br#"<rss><channel><link>http://other/</link></channel></rss>"#)
        .unwrap();
    collection
        .ingest(document(&[("a", JUNE_9, "a"), ("b", JUNE_9, "b"), ("c", JUNE_9, "c")]).as_bytes())
        .unwrap();

    let resolver = AddressResolver::new(&collection);
    let channel = resolver.resolve_address(1, resolver.root()).unwrap();
    let count = resolver.child_count(channel);
    assert_eq!(count, 3);
    for row in 0..count {
        let item = resolver.resolve_address(row, channel).unwrap();
        assert_eq!(resolver.resolve_parent(item), Some(channel));
    }
}

#[test]
fn test_refeed_keeps_channel_row_and_updates_data() {
    let collection = FeedCollection::default();
    collection
        .ingest(document(&[("a", JUNE_9, "a v1")]).as_bytes())
        .unwrap();
    let resolver = AddressResolver::new(&collection);
    let before = resolver.resolve_address(0, resolver.root()).unwrap();

    collection
        .ingest(document(&[("a", JUNE_10, "a v2")]).as_bytes())
        .unwrap();

    let after = resolver.resolve_address(0, resolver.root()).unwrap();
    assert_eq!(before, after);
    let item = resolver.resolve_address(0, after).unwrap();
    assert_eq!(
        resolver.data(item, Role::Title).map(|v| v.to_string()),
        Some("a v2".to_owned())
    );
}

// ============================================================================
// Properties
// ============================================================================

fn item(pool: &IdPool, guid: &str, day: Option<u32>, tag: usize) -> Item {
    let mut item = Item::new(pool, None);
    item.set_element(Element::text(pool, ElementKind::Guid, guid, None), false);
    if let Some(day) = day {
        let date = format!("2003-06-{day:02}");
        item.set_element(Element::date(pool, ElementKind::PubDate, date, None), false);
    }
    item.set_element(
        Element::text(pool, ElementKind::Title, tag.to_string(), None),
        false,
    );
    item
}

proptest! {
    #[test]
    fn prop_guid_dedup_keeps_latest_or_first(
        offers in proptest::collection::vec((0usize..4, proptest::option::of(1u32..29)), 1..40)
    ) {
        let pool = IdPool::new();
        let channel = Channel::new(&pool, "2.0");
        for (tag, (guid, day)) in offers.iter().enumerate() {
            channel.add_item(item(&pool, &format!("g{guid}"), *day, tag));
        }

        for guid in 0..4 {
            let mine: Vec<(usize, Option<u32>)> = offers
                .iter()
                .enumerate()
                .filter(|(_, (g, _))| *g == guid)
                .map(|(tag, (_, day))| (tag, *day))
                .collect();
            let key = format!("g{guid}");
            let survivors: Vec<_> = channel
                .items()
                .into_iter()
                .filter(|i| i.guid() == Some(key.as_str()))
                .collect();
            if mine.is_empty() {
                prop_assert!(survivors.is_empty());
                continue;
            }
            prop_assert_eq!(survivors.len(), 1);

            // Replay the acceptance rule to find the expected winner.
            let mut winner = mine[0];
            for &candidate in &mine[1..] {
                let newer = match (candidate.1, winner.1) {
                    (Some(new), Some(old)) => new > old,
                    (None, None) => false,
                    _ => true,
                };
                if newer {
                    winner = candidate;
                }
            }
            let expected_tag = winner.0.to_string();
            prop_assert_eq!(survivors[0].title(), Some(expected_tag.as_str()));
        }
    }
}
