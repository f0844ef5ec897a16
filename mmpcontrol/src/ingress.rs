//! Wires configured field sources to the reconciler.
//!
//! One tokio task per configured field consumes that field's stream and
//! feeds the reconciler, so different fields update independently and no
//! field update ever blocks on another. Teardown aborts every task before
//! anything else is released; no notification lands after teardown.

use std::sync::Arc;

use futures::StreamExt;
use mmpconfig::{TopicMap, ValueSource};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::model::PlayerField;
use crate::platform::{TemplateEngine, TopicBroker};
use crate::state::IngressReconciler;

/// The configured fields, paired with their value sources.
fn configured_sources(topics: &TopicMap) -> Vec<(PlayerField, ValueSource)> {
    let entries = [
        (PlayerField::SongTitle, &topics.song_title),
        (PlayerField::SongArtist, &topics.song_artist),
        (PlayerField::SongAlbum, &topics.song_album),
        (PlayerField::Volume, &topics.volume),
        (PlayerField::PlayerStatus, &topics.player_status),
        (PlayerField::Power, &topics.power),
        (PlayerField::Mute, &topics.mute),
        (PlayerField::Source, &topics.source),
        (PlayerField::SourceList, &topics.sourcelist),
        (PlayerField::AlbumArt, &topics.album_art),
    ];
    entries
        .into_iter()
        .filter_map(|(field, source)| source.clone().map(|s| (field, s)))
        .collect()
}

/// Live ingress subscriptions of one player entity.
///
/// Dropping (or shutting down) aborts every task, releasing all
/// subscriptions atomically.
pub(crate) struct Subscriptions {
    tasks: Vec<JoinHandle<()>>,
}

impl Subscriptions {
    pub(crate) fn attach(
        topics: &TopicMap,
        engine: &Arc<dyn TemplateEngine>,
        broker: &Arc<dyn TopicBroker>,
        reconciler: &Arc<IngressReconciler>,
    ) -> Self {
        let mut tasks = Vec::new();

        for (field, source) in configured_sources(topics) {
            let reconciler = Arc::clone(reconciler);
            let task = match source {
                ValueSource::Template { template } => {
                    debug!(field = field.name(), "Tracking template source");
                    let mut stream = engine.track(&template);
                    tokio::spawn(async move {
                        while let Some(value) = stream.next().await {
                            reconciler.apply_value(field, value);
                        }
                    })
                }
                ValueSource::Topic { topic } => {
                    debug!(field = field.name(), topic = topic.as_str(), "Subscribing raw topic");
                    let mut stream = broker.subscribe(&topic);
                    tokio::spawn(async move {
                        while let Some(payload) = stream.next().await {
                            reconciler.apply_raw(field, &payload);
                        }
                    })
                }
            };
            tasks.push(task);
        }

        Self { tasks }
    }

    pub(crate) fn shutdown(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for Subscriptions {
    fn drop(&mut self) {
        self.shutdown();
    }
}
