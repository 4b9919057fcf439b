use std::path::Path;

use anyhow::{Context, Result};
use chirp::{
    DocumentStore, Timeline,
    backend::redis::RedisDocumentStore,
    feed::{profile_query, timeline_query},
};

use super::load_config;
use crate::examples::ExampleGroup;
use crate::output::OutputManager;

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Live Feed",
    commands: &[
        "chirp watch                     # Follow the newest posts until Ctrl-C",
        "chirp watch --limit 10          # Follow only the ten newest posts",
        "chirp watch --user <uid>        # Follow one user's posts",
    ],
}];

/// Follows the live feed in Redis and prints every snapshot.
pub async fn handle_watch(
    path: Option<&Path>,
    limit: Option<usize>,
    user: Option<&str>,
    output: &OutputManager,
) -> Result<()> {
    let config = load_config(path)?;
    let mut limits = config.limits();
    if let Some(limit) = limit {
        limits.feed_limit = limit;
    }
    let collection = config.chirp.collection.as_str();

    output.progress("Connecting to Redis");
    let store = RedisDocumentStore::from_config(&config)
        .await
        .context("Failed to connect to Redis")?;
    output.clear_line();
    output.success("Connected to Redis");

    let query = match user {
        Some(uid) => profile_query(uid, &limits, collection),
        None => timeline_query(&limits, collection),
    };
    let title = match user {
        Some(uid) => format!("Posts by {uid}"),
        None => "Timeline".to_string(),
    };
    let mut timeline = Timeline::with_subscription(store.subscribe(query).await?);
    output.info("Watching for changes, press Ctrl-C to stop");

    loop {
        tokio::select! {
            delivered = timeline.next() => {
                if !delivered {
                    output.warning("The live query ended");
                    break;
                }
                output.feed(&title, timeline.posts())?;
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                break;
            }
        }
    }

    timeline.unmount();
    output.success("Stopped watching");
    Ok(())
}
