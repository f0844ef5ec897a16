//! End-to-end tests for the player entity: ingress wiring, command routing,
//! capability gating, and teardown, against in-memory collaborators.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use futures::channel::mpsc::{UnboundedSender, unbounded};
use serde_json::{Value, json};

use mmpconfig::{PlayerConfig, ValueSource};
use mmpcontrol::{
    ActionBinding, ActionParams, ActionRunner, CallerContext, MqttMediaPlayer, PayloadStream,
    PlaybackPhase, PlayerError, PlayerField, RefreshSink, TemplateEngine, TopicBroker, ValueStream,
};

/// Template engine delivering values pushed by the test.
#[derive(Default)]
struct FakeEngine {
    senders: Mutex<HashMap<String, UnboundedSender<Value>>>,
}

impl FakeEngine {
    fn push(&self, expression: &str, value: Value) {
        let senders = self.senders.lock().unwrap();
        senders
            .get(expression)
            .expect("expression not tracked")
            .unbounded_send(value)
            .unwrap();
    }
}

impl TemplateEngine for FakeEngine {
    fn track(&self, expression: &str) -> ValueStream {
        let (tx, rx) = unbounded();
        self.senders.lock().unwrap().insert(expression.to_string(), tx);
        rx.boxed()
    }
}

/// Raw broker delivering payloads pushed by the test.
#[derive(Default)]
struct FakeBroker {
    senders: Mutex<HashMap<String, UnboundedSender<Vec<u8>>>>,
}

impl FakeBroker {
    fn publish(&self, topic: &str, payload: &[u8]) {
        let senders = self.senders.lock().unwrap();
        senders
            .get(topic)
            .expect("topic not subscribed")
            .unbounded_send(payload.to_vec())
            .unwrap();
    }
}

impl TopicBroker for FakeBroker {
    fn subscribe(&self, topic: &str) -> PayloadStream {
        let (tx, rx) = unbounded();
        self.senders.lock().unwrap().insert(topic.to_string(), tx);
        rx.boxed()
    }
}

/// Records executed actions; actions listed in `failing` report failure.
#[derive(Default)]
struct FakeRunner {
    calls: Mutex<Vec<(String, ActionParams, CallerContext)>>,
    failing: Mutex<Vec<String>>,
}

impl FakeRunner {
    fn fail_on(&self, action: &str) {
        self.failing.lock().unwrap().push(action.to_string());
    }

    fn calls(&self) -> Vec<(String, ActionParams, CallerContext)> {
        self.calls.lock().unwrap().clone()
    }

    fn action_ids(&self) -> Vec<String> {
        self.calls().into_iter().map(|(id, _, _)| id).collect()
    }
}

#[async_trait]
impl ActionRunner for FakeRunner {
    async fn run(
        &self,
        binding: &ActionBinding,
        params: ActionParams,
        caller: &CallerContext,
    ) -> anyhow::Result<()> {
        if self.failing.lock().unwrap().contains(&binding.id().to_string()) {
            anyhow::bail!("executor rejected '{}'", binding.id());
        }
        self.calls
            .lock()
            .unwrap()
            .push((binding.id().to_string(), params, caller.clone()));
        Ok(())
    }
}

#[derive(Default)]
struct CountingSink {
    refreshes: Mutex<Vec<bool>>,
}

impl CountingSink {
    fn forced_count(&self) -> usize {
        self.refreshes.lock().unwrap().iter().filter(|f| **f).count()
    }
}

impl RefreshSink for CountingSink {
    fn request_refresh(&self, forced: bool) {
        self.refreshes.lock().unwrap().push(forced);
    }
}

struct Harness {
    player: MqttMediaPlayer,
    engine: Arc<FakeEngine>,
    broker: Arc<FakeBroker>,
    runner: Arc<FakeRunner>,
    sink: Arc<CountingSink>,
}

fn harness(config: PlayerConfig) -> Harness {
    let engine = Arc::new(FakeEngine::default());
    let broker = Arc::new(FakeBroker::default());
    let runner = Arc::new(FakeRunner::default());
    let sink = Arc::new(CountingSink::default());
    let player = MqttMediaPlayer::new(
        &config,
        engine.clone(),
        broker.clone(),
        runner.clone(),
        sink.clone(),
    );
    Harness {
        player,
        engine,
        broker,
        runner,
        sink,
    }
}

fn base_config() -> PlayerConfig {
    PlayerConfig::from_yaml("name: Test Player").unwrap()
}

fn template(expression: &str) -> Option<ValueSource> {
    Some(ValueSource::Template {
        template: expression.to_string(),
    })
}

fn topic(name: &str) -> Option<ValueSource> {
    Some(ValueSource::Topic {
        topic: name.to_string(),
    })
}

fn caller() -> CallerContext {
    CallerContext("test-caller".to_string())
}

/// Let the per-field ingress tasks drain their streams.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

#[tokio::test]
async fn test_entity_folds_template_and_topic_updates() {
    let mut config = base_config();
    config.topic.song_title = template("title_tpl");
    config.topic.volume = template("volume_tpl");
    config.topic.power = topic("player/power");
    config.status_keyword = Some("playing".to_string());
    config.power_off_keyword = Some("standby".to_string());
    let h = harness(config);

    h.engine.push("title_tpl", json!("Deacon Blues"));
    h.engine.push("volume_tpl", json!(50));
    h.broker.publish("player/power", b"standby");
    settle().await;

    assert_eq!(h.player.media_title(), "Deacon Blues");
    assert_eq!(h.player.volume_level(), 0.5);
    assert_eq!(h.player.phase(), Some(PlaybackPhase::Off));
    // Power transitions are always published as forced refreshes.
    assert_eq!(h.sink.forced_count(), 1);
}

#[tokio::test]
async fn test_malformed_volume_dropped_end_to_end() {
    let mut config = base_config();
    config.topic.volume = template("volume_tpl");
    let h = harness(config);

    h.engine.push("volume_tpl", json!(42));
    h.engine.push("volume_tpl", json!("abc"));
    h.engine.push("volume_tpl", json!(3.5));
    settle().await;

    assert_eq!(h.player.volume_level(), 0.42);
}

#[tokio::test]
async fn test_absolute_volume_refused_while_step_bound() {
    let mut config = base_config();
    config.vol_up = Some("vol_up_act".to_string());
    config.volume = Some("vol_set_act".to_string());
    let h = harness(config);
    h.player
        .reconciler()
        .apply_value(PlayerField::Volume, json!(50));

    h.player.set_volume_level(0.7, &caller()).await.unwrap();

    assert!(h.runner.calls().is_empty());
    assert_eq!(h.player.volume_level(), 0.5);
}

#[tokio::test]
async fn test_volume_step_not_advertised_with_single_direction() {
    let mut config = base_config();
    config.vol_up = Some("vol_up_act".to_string());
    let h = harness(config);
    assert!(!h.player.supported_features().volume_step);

    let mut config = base_config();
    config.vol_up = Some("vol_up_act".to_string());
    config.vol_down = Some("vol_down_act".to_string());
    let h = harness(config);
    assert!(h.player.supported_features().volume_step);
}

#[tokio::test]
async fn test_volume_up_clamps_then_gates_with_nothing_bound() {
    let h = harness(base_config());
    h.player
        .reconciler()
        .apply_value(PlayerField::Volume, json!(98));

    h.player.volume_up(&caller()).await.unwrap();

    assert_eq!(h.player.volume_level(), 1.0);
    assert!(h.runner.calls().is_empty());
}

#[tokio::test]
async fn test_volume_up_fallback_routes_through_absolute_set() {
    let mut config = base_config();
    config.volume = Some("vol_set_act".to_string());
    let h = harness(config);
    h.player
        .reconciler()
        .apply_value(PlayerField::Volume, json!(50));

    h.player.volume_up(&caller()).await.unwrap();

    let calls = h.runner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "vol_set_act");
    let sent = calls[0].1.get("volume").unwrap().as_f64().unwrap();
    assert!((sent - 55.0).abs() < 1e-9);
    assert!((h.player.volume_level() - 0.55).abs() < 1e-9);
}

#[tokio::test]
async fn test_volume_down_step_binding_preferred() {
    let mut config = base_config();
    config.vol_down = Some("vol_down_act".to_string());
    let h = harness(config);

    h.player.volume_down(&caller()).await.unwrap();

    assert_eq!(h.runner.action_ids(), vec!["vol_down_act"]);
    // Step control leaves the stored level to the authoritative feed.
    assert_eq!(h.player.volume_level(), 0.0);
}

#[tokio::test]
async fn test_play_pause_toggle_follows_phase() {
    let mut config = base_config();
    config.play = Some("play_act".to_string());
    config.pause = Some("pause_act".to_string());
    let h = harness(config);

    h.player.media_play_pause(&caller()).await.unwrap();
    assert_eq!(h.player.phase(), Some(PlaybackPhase::Playing));

    h.player.media_play_pause(&caller()).await.unwrap();
    assert_eq!(h.player.phase(), Some(PlaybackPhase::Paused));

    assert_eq!(h.runner.action_ids(), vec!["play_act", "pause_act"]);
}

#[tokio::test]
async fn test_stop_sets_idle_phase() {
    let mut config = base_config();
    config.stop = Some("stop_act".to_string());
    let h = harness(config);

    h.player.media_stop(&caller()).await.unwrap();
    assert_eq!(h.player.phase(), Some(PlaybackPhase::Idle));
}

#[tokio::test]
async fn test_action_failure_propagates_without_optimistic_write() {
    let mut config = base_config();
    config.play = Some("play_act".to_string());
    let h = harness(config);
    h.runner.fail_on("play_act");

    let result = h.player.media_play(&caller()).await;

    assert!(matches!(
        result,
        Err(PlayerError::ActionFailed { ref action, .. }) if action == "play_act"
    ));
    assert_eq!(h.player.phase(), None);
}

#[tokio::test]
async fn test_unbound_commands_are_noops() {
    let h = harness(base_config());
    let ctx = caller();

    h.player.turn_on(&ctx).await.unwrap();
    h.player.turn_off(&ctx).await.unwrap();
    h.player.media_play(&ctx).await.unwrap();
    h.player.media_next_track(&ctx).await.unwrap();
    h.player.mute_volume(true, &ctx).await.unwrap();
    h.player.select_source("optical", &ctx).await.unwrap();

    assert!(h.runner.calls().is_empty());
    assert_eq!(h.player.phase(), None);
}

#[tokio::test]
async fn test_mute_routes_by_intent() {
    let mut config = base_config();
    config.vol_mute = Some("mute_act".to_string());
    config.vol_unmute = Some("unmute_act".to_string());
    let h = harness(config);

    h.player.mute_volume(true, &caller()).await.unwrap();
    h.player.mute_volume(false, &caller()).await.unwrap();

    assert_eq!(h.runner.action_ids(), vec!["mute_act", "unmute_act"]);
}

#[tokio::test]
async fn test_select_source_and_caller_context_forwarded() {
    let mut config = base_config();
    config.select_source = Some("source_act".to_string());
    let h = harness(config);

    h.player.select_source("optical", &caller()).await.unwrap();

    let calls = h.runner.calls();
    assert_eq!(calls[0].1.get("source").unwrap(), &json!("optical"));
    assert_eq!(calls[0].2, caller());
}

#[tokio::test]
async fn test_authoritative_notification_supersedes_optimistic_phase() {
    let mut config = base_config();
    config.play = Some("play_act".to_string());
    config.topic.player_status = template("status_tpl");
    config.status_keyword = Some("playing".to_string());
    let h = harness(config);

    h.player.media_play(&caller()).await.unwrap();
    assert_eq!(h.player.phase(), Some(PlaybackPhase::Playing));

    h.engine.push("status_tpl", json!("stopped"));
    settle().await;
    assert_eq!(h.player.phase(), Some(PlaybackPhase::Paused));
}

#[tokio::test]
async fn test_teardown_stops_notification_delivery() {
    let mut config = base_config();
    config.topic.power = topic("player/power");
    config.power_off_keyword = Some("standby".to_string());
    let h = harness(config);

    h.broker.publish("player/power", b"standby");
    settle().await;
    assert_eq!(h.player.phase(), Some(PlaybackPhase::Off));

    h.player.teardown();
    h.broker.publish("player/power", b"awake");
    settle().await;

    assert_eq!(h.player.reconciler().snapshot().power, "standby");
}
