use parking_lot::RwLock;
use std::sync::Arc;

use super::channel::Channel;
use crate::feed::{ParseError, ParserOptions, RssParser};
use crate::ids::{IdPool, RawId};

/// Merge key for a link string, matching [`Channel::link_key`].
fn link_key(link: &str) -> String {
    let link = link.trim();
    url::Url::parse(link).map_or_else(|_| link.to_owned(), String::from)
}

/// Every channel the application knows about, in insertion order.
///
/// Channels are keyed by their `<link>`: adding a channel whose link is
/// already present merges it into the existing one, so a refeed updates
/// the channel in place and keeps its row. Absolute links are compared in
/// normalised URL form, so `http://Example.com` and `http://example.com/`
/// name the same channel.
#[derive(Debug)]
pub struct FeedCollection {
    pool: IdPool,
    options: ParserOptions,
    channels: RwLock<Vec<Arc<Channel>>>,
}

impl FeedCollection {
    pub fn new(pool: IdPool, options: ParserOptions) -> Self {
        Self {
            pool,
            options,
            channels: RwLock::new(Vec::new()),
        }
    }

    pub fn pool(&self) -> &IdPool {
        &self.pool
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Parses `bytes` and adds the resulting channel.
    ///
    /// # Arguments
    ///
    /// * `bytes` - One complete RSS document
    ///
    /// # Returns
    ///
    /// The channel now holding the document's content: a fresh one, or the
    /// existing channel with the same link that it was merged into.
    pub fn ingest(&self, bytes: &[u8]) -> Result<Arc<Channel>, ParseError> {
        let channel = RssParser::new(self.pool.clone(), self.options).parse(bytes)?;
        Ok(self.add_channel(channel))
    }

    /// Adds a parsed channel, merging it into an existing channel with the
    /// same link when there is one.
    ///
    /// The lookup and the merge happen under one write lock, so two refeeds
    /// of the same link never produce two channels.
    pub fn add_channel(&self, channel: Channel) -> Arc<Channel> {
        let mut channels = self.channels.write();
        let link = channel.link_key();

        let existing = link.as_ref().and_then(|link| {
            channels
                .iter()
                .find(|existing| existing.link_key().as_ref() == Some(link))
        });

        if let Some(existing) = existing {
            Channel::merge(&channel, existing);
            tracing::info!(
                channel = existing.id(),
                link = link.as_deref().unwrap_or_default(),
                items = existing.count(),
                "Refreshed channel"
            );
            return Arc::clone(existing);
        }

        if link.is_none() {
            tracing::warn!(
                channel = channel.id(),
                "Channel has no <link>; it cannot be refreshed by a later feed"
            );
        }
        let channel = Arc::new(channel);
        channels.push(Arc::clone(&channel));
        tracing::info!(
            channel = channel.id(),
            row = channels.len() - 1,
            items = channel.count(),
            "Added channel"
        );
        channel
    }

    pub fn channel_by_link(&self, link: &str) -> Option<Arc<Channel>> {
        let key = link_key(link);
        self.channels
            .read()
            .iter()
            .find(|channel| channel.link_key().as_ref() == Some(&key))
            .cloned()
    }

    pub fn channel_at(&self, row: usize) -> Option<Arc<Channel>> {
        self.channels.read().get(row).cloned()
    }

    /// Row of the channel with raw id `id`.
    pub fn index_of(&self, id: RawId) -> Option<usize> {
        self.channels
            .read()
            .iter()
            .position(|channel| channel.id() == id)
    }

    /// Removes the channel with `link`, returning it.
    ///
    /// Later channels move up one row.
    pub fn remove_by_link(&self, link: &str) -> Option<Arc<Channel>> {
        let key = link_key(link);
        let mut channels = self.channels.write();
        let row = channels
            .iter()
            .position(|channel| channel.link_key().as_ref() == Some(&key))?;
        Some(channels.remove(row))
    }

    /// Snapshot of the channel list.
    pub fn snapshot(&self) -> Vec<Arc<Channel>> {
        self.channels.read().clone()
    }

    pub fn len(&self) -> usize {
        self.channels.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.read().is_empty()
    }

    pub fn clear(&self) {
        let removed = std::mem::take(&mut *self.channels.write());
        tracing::debug!(channels = removed.len(), "Cleared collection");
    }
}

impl Default for FeedCollection {
    fn default() -> Self {
        Self::new(IdPool::new(), ParserOptions::default())
    }
}
