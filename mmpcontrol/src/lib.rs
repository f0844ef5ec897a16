//! # MMPControl
//!
//! State-reconciliation and command-dispatch core for the MQTT media player
//! bridge.
//!
//! Two layers compose the crate:
//! - the **ingress reconciler** ([`state`]) folds unordered field
//!   notifications into one coherent [`PlayerObservedState`] and derives the
//!   composite playback phase from the raw power/status tokens;
//! - the **command router** ([`player`]) resolves high-level intents
//!   against the capability bindings fixed at construction, with a software
//!   fallback for step volume and a mutual-exclusivity gate between step and
//!   absolute volume control.
//!
//! The host platform is consumed through the [`platform`] trait seams only.

mod ingress;

pub mod capabilities;
pub mod errors;
pub mod model;
pub mod platform;
pub mod player;
pub mod state;

pub use capabilities::{CapabilityBindings, SupportedFeatures};
pub use errors::PlayerError;
pub use model::{
    ActionBinding, CallerContext, MEDIA_TYPE_MUSIC, PlaybackPhase, PlayerField, RefreshPolicy,
    StatusKeywords,
};
pub use platform::{
    ActionParams, ActionRunner, PayloadStream, RefreshSink, TemplateEngine, TopicBroker,
    ValueStream,
};
pub use player::MqttMediaPlayer;
pub use state::{IngressReconciler, PlayerObservedState, derive_phase};
