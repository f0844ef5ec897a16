//! Player entity: construction from configuration, read-only state
//! accessors, and the command router.
//!
//! Commands resolve against the capability bindings fixed at construction.
//! An unbound capability is a defensive no-op, never an error; a failed
//! action execution propagates to the caller and leaves optimistic state
//! untouched.

use std::sync::{Arc, Mutex};

use mmpconfig::PlayerConfig;
use serde_json::json;
use tracing::{debug, info};

use crate::capabilities::{CapabilityBindings, SupportedFeatures};
use crate::errors::PlayerError;
use crate::ingress::Subscriptions;
use crate::model::{
    ActionBinding, CallerContext, MEDIA_TYPE_MUSIC, PlaybackPhase, StatusKeywords,
};
use crate::platform::{ActionParams, ActionRunner, RefreshSink, TemplateEngine, TopicBroker};
use crate::state::IngressReconciler;

/// Relative step applied by the software volume fallback.
const VOLUME_STEP: f64 = 0.05;

/// A remote media player folded into one controllable entity.
pub struct MqttMediaPlayer {
    name: String,
    reconciler: Arc<IngressReconciler>,
    bindings: CapabilityBindings,
    features: SupportedFeatures,
    runner: Arc<dyn ActionRunner>,
    subscriptions: Mutex<Subscriptions>,
}

impl MqttMediaPlayer {
    /// Build the entity and attach all configured ingress subscriptions.
    ///
    /// Bindings and advertised features are resolved here, once; they are
    /// immutable for the lifetime of the entity.
    pub fn new(
        config: &PlayerConfig,
        engine: Arc<dyn TemplateEngine>,
        broker: Arc<dyn TopicBroker>,
        runner: Arc<dyn ActionRunner>,
        refresh: Arc<dyn RefreshSink>,
    ) -> Self {
        let keywords = StatusKeywords::from_config(config);
        let bindings = CapabilityBindings::from_config(config);
        let features = SupportedFeatures::of(&bindings);
        let reconciler = Arc::new(IngressReconciler::new(keywords, refresh));
        let subscriptions = Subscriptions::attach(&config.topic, &engine, &broker, &reconciler);

        info!(player = config.name.as_str(), "Media player entity ready");

        Self {
            name: config.name.clone(),
            reconciler,
            bindings,
            features,
            runner,
            subscriptions: Mutex::new(subscriptions),
        }
    }

    /// Release every ingress subscription. Idempotent; also runs on Drop.
    pub fn teardown(&self) {
        self.subscriptions.lock().unwrap().shutdown();
        info!(player = self.name.as_str(), "Media player entity torn down");
    }

    // ------------------------------------------------------------------
    // Read-only surface
    // ------------------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phase(&self) -> Option<PlaybackPhase> {
        self.reconciler.phase()
    }

    /// Volume level of the player in [0, 1].
    pub fn volume_level(&self) -> f64 {
        self.reconciler.volume_level()
    }

    pub fn is_volume_muted(&self) -> bool {
        self.reconciler.snapshot().muted
    }

    pub fn media_title(&self) -> String {
        self.reconciler.snapshot().track_title
    }

    pub fn media_artist(&self) -> String {
        self.reconciler.snapshot().track_artist
    }

    pub fn media_album_name(&self) -> String {
        self.reconciler.snapshot().track_album
    }

    pub fn media_content_type(&self) -> &'static str {
        MEDIA_TYPE_MUSIC
    }

    pub fn source(&self) -> Option<String> {
        self.reconciler.snapshot().source
    }

    pub fn source_list(&self) -> Vec<String> {
        self.reconciler.snapshot().source_list
    }

    pub fn supported_features(&self) -> SupportedFeatures {
        self.features
    }

    pub fn media_image_hash(&self) -> Option<String> {
        self.reconciler.media_image_hash()
    }

    pub fn media_image(&self) -> Option<(Vec<u8>, &'static str)> {
        self.reconciler.media_image()
    }

    /// Direct access to the reconciler, for wiring ad-hoc notification
    /// sources that bypass the configured subscriptions.
    pub fn reconciler(&self) -> &Arc<IngressReconciler> {
        &self.reconciler
    }

    // ------------------------------------------------------------------
    // Command router
    // ------------------------------------------------------------------

    /// Run a bound action, forwarding the caller context unchanged.
    ///
    /// Returns whether an action actually ran, so callers can gate their
    /// optimistic state writes on successful execution.
    async fn run_action(
        &self,
        binding: &Option<ActionBinding>,
        params: ActionParams,
        caller: &CallerContext,
    ) -> Result<bool, PlayerError> {
        let Some(binding) = binding else {
            return Ok(false);
        };
        self.runner
            .run(binding, params, caller)
            .await
            .map_err(|source| PlayerError::ActionFailed {
                action: binding.id().to_string(),
                source,
            })?;
        Ok(true)
    }

    pub async fn turn_on(&self, caller: &CallerContext) -> Result<(), PlayerError> {
        self.run_action(&self.bindings.power_on, ActionParams::new(), caller)
            .await
            .map(|_| ())
    }

    pub async fn turn_off(&self, caller: &CallerContext) -> Result<(), PlayerError> {
        self.run_action(&self.bindings.power_off, ActionParams::new(), caller)
            .await
            .map(|_| ())
    }

    pub async fn media_play(&self, caller: &CallerContext) -> Result<(), PlayerError> {
        if self
            .run_action(&self.bindings.play, ActionParams::new(), caller)
            .await?
        {
            self.reconciler.store_phase(PlaybackPhase::Playing);
        }
        Ok(())
    }

    pub async fn media_pause(&self, caller: &CallerContext) -> Result<(), PlayerError> {
        if self
            .run_action(&self.bindings.pause, ActionParams::new(), caller)
            .await?
        {
            self.reconciler.store_phase(PlaybackPhase::Paused);
        }
        Ok(())
    }

    pub async fn media_stop(&self, caller: &CallerContext) -> Result<(), PlayerError> {
        if self
            .run_action(&self.bindings.stop, ActionParams::new(), caller)
            .await?
        {
            self.reconciler.store_phase(PlaybackPhase::Idle);
        }
        Ok(())
    }

    /// Toggle between the play and pause paths based on the current phase.
    pub async fn media_play_pause(&self, caller: &CallerContext) -> Result<(), PlayerError> {
        if self.reconciler.phase() == Some(PlaybackPhase::Playing) {
            self.media_pause(caller).await
        } else {
            self.media_play(caller).await
        }
    }

    pub async fn media_next_track(&self, caller: &CallerContext) -> Result<(), PlayerError> {
        self.run_action(&self.bindings.next, ActionParams::new(), caller)
            .await
            .map(|_| ())
    }

    pub async fn media_previous_track(&self, caller: &CallerContext) -> Result<(), PlayerError> {
        self.run_action(&self.bindings.previous, ActionParams::new(), caller)
            .await
            .map(|_| ())
    }

    pub async fn volume_up(&self, caller: &CallerContext) -> Result<(), PlayerError> {
        if self.bindings.vol_up.is_some() {
            return self
                .run_action(&self.bindings.vol_up, ActionParams::new(), caller)
                .await
                .map(|_| ());
        }
        // Software fallback: clamp first, then route through the absolute
        // path, which applies its own binding gate.
        let level = (self.reconciler.volume_level() + VOLUME_STEP).min(1.0);
        self.reconciler.store_volume(level);
        self.set_volume_level(level, caller).await
    }

    pub async fn volume_down(&self, caller: &CallerContext) -> Result<(), PlayerError> {
        if self.bindings.vol_down.is_some() {
            return self
                .run_action(&self.bindings.vol_down, ActionParams::new(), caller)
                .await
                .map(|_| ());
        }
        let level = (self.reconciler.volume_level() - VOLUME_STEP).max(0.0);
        self.reconciler.store_volume(level);
        self.set_volume_level(level, caller).await
    }

    /// Set an absolute volume level in [0, 1].
    ///
    /// Refused while any step action is bound: a player driven by step
    /// control must not also receive absolute levels.
    pub async fn set_volume_level(
        &self,
        level: f64,
        caller: &CallerContext,
    ) -> Result<(), PlayerError> {
        if self.bindings.step_control_bound() {
            debug!(
                player = self.name.as_str(),
                "Ignoring absolute volume while step control is bound"
            );
            return Ok(());
        }
        let mut params = ActionParams::new();
        params.insert("volume".to_string(), json!(level * 100.0));
        if self
            .run_action(&self.bindings.volume_set, params, caller)
            .await?
        {
            self.reconciler.store_volume(level);
        }
        Ok(())
    }

    /// Mute (`true`) or unmute (`false`). No software fallback exists.
    pub async fn mute_volume(&self, mute: bool, caller: &CallerContext) -> Result<(), PlayerError> {
        let binding = if mute {
            &self.bindings.vol_mute
        } else {
            &self.bindings.vol_unmute
        };
        self.run_action(binding, ActionParams::new(), caller)
            .await
            .map(|_| ())
    }

    pub async fn select_source(
        &self,
        source: &str,
        caller: &CallerContext,
    ) -> Result<(), PlayerError> {
        let mut params = ActionParams::new();
        params.insert("source".to_string(), json!(source));
        self.run_action(&self.bindings.select_source, params, caller)
            .await
            .map(|_| ())
    }
}
