//! Ingress reconciler: folds unordered field notifications into one coherent
//! observed state.
//!
//! Each tracked field has exactly one update path, applied with
//! last-writer-wins semantics. The composite playback phase is never written
//! by a listener; it is recomputed by [`derive_phase`] whenever a relevant
//! raw input changes, so raw inputs and derived state cannot diverge.

use std::sync::{Arc, RwLock};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::model::{PlaybackPhase, PlayerField, RefreshPolicy, StatusKeywords};
use crate::platform::RefreshSink;

/// Latest observed value of every tracked field.
#[derive(Clone, Debug)]
pub struct PlayerObservedState {
    pub track_title: String,
    pub track_artist: String,
    pub track_album: String,
    /// Unit-interval volume level, derived from an integer percentage.
    pub volume_level: f64,
    pub muted: bool,
    /// Raw power token, compared against the configured keywords.
    pub power: String,
    /// Raw status token, compared against the configured playing keyword.
    pub playback_token: Option<String>,
    pub source: Option<String>,
    pub source_list: Vec<String>,
    /// Decoded album art bytes. The hash is derived on demand, never stored.
    pub album_art: Option<Vec<u8>>,
    /// Derived playback phase; `None` until a keyword rule matches.
    pub phase: Option<PlaybackPhase>,
}

impl Default for PlayerObservedState {
    fn default() -> Self {
        Self {
            track_title: String::new(),
            track_artist: String::new(),
            track_album: String::new(),
            volume_level: 0.0,
            muted: false,
            power: "standby".to_string(),
            playback_token: None,
            source: None,
            source_list: Vec::new(),
            album_art: None,
            phase: None,
        }
    }
}

/// Pure phase derivation, in keyword-priority order:
/// off keyword, then on keyword, then the playing/paused split on the status
/// keyword. When no rule matches the phase is unknown; the derivation never
/// guesses.
pub fn derive_phase(
    power: &str,
    playback_token: Option<&str>,
    keywords: &StatusKeywords,
) -> Option<PlaybackPhase> {
    if let Some(off) = &keywords.power_off {
        if power == off {
            return Some(PlaybackPhase::Off);
        }
    }
    if let Some(on) = &keywords.power_on {
        if power == on {
            return Some(PlaybackPhase::On);
        }
    }
    if let Some(playing) = &keywords.playing {
        return if playback_token == Some(playing.as_str()) {
            Some(PlaybackPhase::Playing)
        } else {
            Some(PlaybackPhase::Paused)
        };
    }
    None
}

/// Owns the observed state and applies field updates.
///
/// Field writes hold the lock only for the assignment itself; refresh
/// signalling happens after the lock is released. Updates for different
/// fields may interleave freely.
pub struct IngressReconciler {
    state: RwLock<PlayerObservedState>,
    keywords: StatusKeywords,
    refresh: Arc<dyn RefreshSink>,
}

impl IngressReconciler {
    pub fn new(keywords: StatusKeywords, refresh: Arc<dyn RefreshSink>) -> Self {
        Self {
            state: RwLock::new(PlayerObservedState::default()),
            keywords,
            refresh,
        }
    }

    /// Apply an evaluated (typed) value to a field.
    ///
    /// Malformed payloads are dropped with a diagnostic log and trigger no
    /// refresh; they never propagate and never crash the reconciler.
    pub fn apply_value(&self, field: PlayerField, value: Value) {
        let accepted = {
            let mut state = self.state.write().unwrap();
            self.mutate(&mut state, field, value)
        };
        if accepted {
            match field.refresh_policy() {
                RefreshPolicy::None => {}
                RefreshPolicy::Publish => self.refresh.request_refresh(false),
                RefreshPolicy::Forced => self.refresh.request_refresh(true),
            }
        }
    }

    /// Apply a raw topic payload to a field.
    ///
    /// Album art is base64 (embedded newlines stripped first); every other
    /// field's payload is parsed as a JSON scalar when possible and falls
    /// back to the verbatim UTF-8 text.
    pub fn apply_raw(&self, field: PlayerField, payload: &[u8]) {
        if field == PlayerField::AlbumArt {
            let cleaned: Vec<u8> = payload
                .iter()
                .copied()
                .filter(|b| *b != b'\n' && *b != b'\r')
                .collect();
            match BASE64.decode(&cleaned) {
                Ok(bytes) => {
                    self.state.write().unwrap().album_art = Some(bytes);
                }
                Err(e) => warn!(field = field.name(), "Dropping undecodable album art: {e}"),
            }
            return;
        }

        match std::str::from_utf8(payload) {
            Ok(text) => {
                let value = serde_json::from_str(text)
                    .unwrap_or_else(|_| Value::String(text.to_string()));
                self.apply_value(field, value);
            }
            Err(e) => warn!(field = field.name(), "Dropping non-UTF-8 payload: {e}"),
        }
    }

    /// Table-driven per-field mutation. Returns whether the value was
    /// accepted (and a refresh may be due).
    fn mutate(&self, state: &mut PlayerObservedState, field: PlayerField, value: Value) -> bool {
        match field {
            PlayerField::SongTitle => state.track_title = coerce_string(value),
            PlayerField::SongArtist => state.track_artist = coerce_string(value),
            PlayerField::SongAlbum => state.track_album = coerce_string(value),
            PlayerField::Volume => {
                let Some(percent) = value.as_i64() else {
                    debug!(field = field.name(), %value, "Dropping non-integer volume");
                    return false;
                };
                state.volume_level = percent.clamp(0, 100) as f64 / 100.0;
            }
            PlayerField::Mute => {
                state.muted = value == Value::Bool(true) || value.as_str() == Some("true");
            }
            PlayerField::Power => {
                state.power = coerce_string(value);
                state.phase =
                    derive_phase(&state.power, state.playback_token.as_deref(), &self.keywords);
            }
            PlayerField::PlayerStatus => {
                state.playback_token = Some(coerce_string(value));
                state.phase =
                    derive_phase(&state.power, state.playback_token.as_deref(), &self.keywords);
            }
            PlayerField::Source => state.source = Some(coerce_string(value)),
            PlayerField::SourceList => {
                let Value::Array(entries) = value else {
                    debug!(field = field.name(), "Dropping non-list source list");
                    return false;
                };
                state.source_list = entries.into_iter().map(coerce_string).collect();
            }
            // Album art only arrives through apply_raw.
            PlayerField::AlbumArt => return false,
        }
        true
    }

    /// Full snapshot of the observed state.
    pub fn snapshot(&self) -> PlayerObservedState {
        self.state.read().unwrap().clone()
    }

    pub fn phase(&self) -> Option<PlaybackPhase> {
        self.state.read().unwrap().phase
    }

    pub fn volume_level(&self) -> f64 {
        self.state.read().unwrap().volume_level
    }

    /// First 5 hex characters of a SHA-256 digest of the art bytes,
    /// recomputed fresh on every query.
    pub fn media_image_hash(&self) -> Option<String> {
        let state = self.state.read().unwrap();
        state
            .album_art
            .as_ref()
            .map(|bytes| hex::encode(Sha256::digest(bytes))[..5].to_string())
    }

    /// Current art bytes with their content type.
    pub fn media_image(&self) -> Option<(Vec<u8>, &'static str)> {
        let state = self.state.read().unwrap();
        state.album_art.clone().map(|bytes| (bytes, "image/jpeg"))
    }

    /// Optimistic phase write from the command router. Advisory only; the
    /// next authoritative power/status notification reassigns the phase.
    pub(crate) fn store_phase(&self, phase: PlaybackPhase) {
        self.state.write().unwrap().phase = Some(phase);
    }

    /// Optimistic volume write from the command router.
    pub(crate) fn store_volume(&self, level: f64) {
        self.state.write().unwrap().volume_level = level;
    }
}

/// String coercion of whatever arrived, stored verbatim.
fn coerce_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
