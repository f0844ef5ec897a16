//! Capability bindings and the advertised feature flags derived from them.

use mmpconfig::PlayerConfig;

use crate::model::ActionBinding;

/// Immutable per-capability action bindings, resolved once at construction.
///
/// A `None` entry means the capability has no outbound action; the command
/// router treats invocations of it as a defensive no-op.
#[derive(Clone, Debug, Default)]
pub struct CapabilityBindings {
    pub play: Option<ActionBinding>,
    pub pause: Option<ActionBinding>,
    pub stop: Option<ActionBinding>,
    pub next: Option<ActionBinding>,
    pub previous: Option<ActionBinding>,
    /// Absolute volume-set action.
    pub volume_set: Option<ActionBinding>,
    pub vol_up: Option<ActionBinding>,
    pub vol_down: Option<ActionBinding>,
    pub vol_mute: Option<ActionBinding>,
    pub vol_unmute: Option<ActionBinding>,
    pub power_on: Option<ActionBinding>,
    pub power_off: Option<ActionBinding>,
    pub select_source: Option<ActionBinding>,
}

fn bind(id: &Option<String>) -> Option<ActionBinding> {
    id.as_ref().map(|id| ActionBinding(id.clone()))
}

impl CapabilityBindings {
    pub fn from_config(config: &PlayerConfig) -> Self {
        Self {
            play: bind(&config.play),
            pause: bind(&config.pause),
            stop: bind(&config.stop),
            next: bind(&config.next),
            previous: bind(&config.previous),
            volume_set: bind(&config.volume),
            vol_up: bind(&config.vol_up),
            vol_down: bind(&config.vol_down),
            vol_mute: bind(&config.vol_mute),
            vol_unmute: bind(&config.vol_unmute),
            power_on: bind(&config.power_on),
            power_off: bind(&config.power_off),
            select_source: bind(&config.select_source),
        }
    }

    /// True if any step-volume action is bound. While this holds, absolute
    /// volume-set commands are refused so the two control modes never fight.
    pub fn step_control_bound(&self) -> bool {
        self.vol_up.is_some() || self.vol_down.is_some()
    }
}

/// Feature flags advertised to the platform.
///
/// Computed exactly once at entity construction; the paired flags
/// (`volume_step`, `volume_mute`) require BOTH members of their pair and are
/// evaluated as a unit here, never per call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SupportedFeatures {
    pub play: bool,
    pub pause: bool,
    pub stop: bool,
    pub next_track: bool,
    pub previous_track: bool,
    pub turn_on: bool,
    pub turn_off: bool,
    pub volume_set: bool,
    pub volume_step: bool,
    pub volume_mute: bool,
    pub select_source: bool,
}

impl SupportedFeatures {
    pub fn of(bindings: &CapabilityBindings) -> Self {
        Self {
            play: bindings.play.is_some(),
            pause: bindings.pause.is_some(),
            stop: bindings.stop.is_some(),
            next_track: bindings.next.is_some(),
            previous_track: bindings.previous.is_some(),
            turn_on: bindings.power_on.is_some(),
            turn_off: bindings.power_off.is_some(),
            volume_set: bindings.volume_set.is_some(),
            volume_step: bindings.vol_up.is_some() && bindings.vol_down.is_some(),
            volume_mute: bindings.vol_mute.is_some() && bindings.vol_unmute.is_some(),
            select_source: bindings.select_source.is_some(),
        }
    }
}
