use std::fs::File;

use feedsmith_core::{Error, FeedEntry, FeedMeta, Result};
use rss::{Channel, ChannelBuilder, GuidBuilder, Item, ItemBuilder};

pub fn build_channel(meta: &FeedMeta, entries: &[FeedEntry]) -> Channel {
    let items: Vec<Item> = entries.iter().map(build_item).collect();

    ChannelBuilder::default()
        .title(meta.title.clone())
        .link(meta.link.clone())
        .description(meta.description.clone())
        .language(Some(meta.language.clone()))
        .items(items)
        .build()
}

fn build_item(entry: &FeedEntry) -> Item {
    let guid = entry.guid.as_ref().map(|value| {
        GuidBuilder::default()
            .value(value.clone())
            .permalink(true)
            .build()
    });

    ItemBuilder::default()
        .title(Some(entry.title.clone()))
        .link(Some(entry.link.clone()))
        .description(Some(entry.description.clone()))
        .pub_date(Some(entry.published_at.to_rfc2822()))
        .guid(guid)
        .build()
}

/// Serializes one source's entries to its fixed output file in the working
/// directory.
pub fn write_feed(meta: &FeedMeta, entries: &[FeedEntry]) -> Result<()> {
    let channel = build_channel(meta, entries);
    let file = File::create(&meta.output_file)?;
    channel
        .pretty_write_to(file, b' ', 2)
        .map_err(|e| Error::Feed(e.to_string()))?;
    Ok(())
}
