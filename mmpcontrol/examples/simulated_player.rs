//! Drives a player entity against in-memory collaborators.
//!
//! Run with: cargo run --example simulated_player

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use futures::channel::mpsc::{UnboundedSender, unbounded};
use serde_json::{Value, json};

use mmpconfig::PlayerConfig;
use mmpcontrol::{
    ActionBinding, ActionParams, ActionRunner, CallerContext, MqttMediaPlayer, PayloadStream,
    RefreshSink, TemplateEngine, TopicBroker, ValueStream,
};

#[derive(Default)]
struct InMemoryEngine {
    senders: Mutex<HashMap<String, UnboundedSender<Value>>>,
}

impl InMemoryEngine {
    fn push(&self, expression: &str, value: Value) {
        if let Some(tx) = self.senders.lock().unwrap().get(expression) {
            let _ = tx.unbounded_send(value);
        }
    }
}

impl TemplateEngine for InMemoryEngine {
    fn track(&self, expression: &str) -> ValueStream {
        let (tx, rx) = unbounded();
        self.senders.lock().unwrap().insert(expression.to_string(), tx);
        rx.boxed()
    }
}

#[derive(Default)]
struct InMemoryBroker {
    senders: Mutex<HashMap<String, UnboundedSender<Vec<u8>>>>,
}

impl InMemoryBroker {
    fn publish(&self, topic: &str, payload: &[u8]) {
        if let Some(tx) = self.senders.lock().unwrap().get(topic) {
            let _ = tx.unbounded_send(payload.to_vec());
        }
    }
}

impl TopicBroker for InMemoryBroker {
    fn subscribe(&self, topic: &str) -> PayloadStream {
        let (tx, rx) = unbounded();
        self.senders.lock().unwrap().insert(topic.to_string(), tx);
        rx.boxed()
    }
}

struct LoggingRunner;

#[async_trait]
impl ActionRunner for LoggingRunner {
    async fn run(
        &self,
        binding: &ActionBinding,
        params: ActionParams,
        caller: &CallerContext,
    ) -> anyhow::Result<()> {
        println!(
            "-> action '{}' params={} caller={:?}",
            binding.id(),
            Value::Object(params),
            caller
        );
        Ok(())
    }
}

struct LoggingSink;

impl RefreshSink for LoggingSink {
    fn request_refresh(&self, forced: bool) {
        println!("-> refresh requested (forced={forced})");
    }
}

const CONFIG: &str = r#"
name: Simulated Player
topic:
  song_title: { template: "title_tpl" }
  song_artist: { template: "artist_tpl" }
  volume: { template: "volume_tpl" }
  power: { topic: "sim/power" }
  player_status: { topic: "sim/status" }
play: sim_play
pause: sim_pause
volume: sim_set_volume
status_keyword: playing
power_off_keyword: standby
"#;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .init();

    let config = PlayerConfig::from_yaml(CONFIG)?;
    let engine = Arc::new(InMemoryEngine::default());
    let broker = Arc::new(InMemoryBroker::default());

    let player = MqttMediaPlayer::new(
        &config,
        engine.clone(),
        broker.clone(),
        Arc::new(LoggingRunner),
        Arc::new(LoggingSink),
    );

    // Simulated notifications from the remote appliance.
    broker.publish("sim/power", b"on");
    broker.publish("sim/status", b"playing");
    engine.push("title_tpl", json!("Deacon Blues"));
    engine.push("artist_tpl", json!("Steely Dan"));
    engine.push("volume_tpl", json!(35));
    tokio::time::sleep(Duration::from_millis(50)).await;

    let snapshot = player.reconciler().snapshot();
    println!(
        "observed: title={:?} artist={:?} volume={} phase={:?}",
        snapshot.track_title,
        snapshot.track_artist,
        snapshot.volume_level,
        snapshot.phase.map(|p| p.as_str())
    );

    // A couple of user intents.
    let caller = CallerContext("demo".to_string());
    player.media_play_pause(&caller).await?;
    player.set_volume_level(0.5, &caller).await?;
    println!(
        "after commands: phase={:?} volume={}",
        player.phase().map(|p| p.as_str()),
        player.volume_level()
    );

    player.teardown();
    Ok(())
}
