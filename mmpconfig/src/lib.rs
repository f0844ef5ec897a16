//! # MMPConfig
//!
//! Configuration surface for the MQTT media player bridge.
//!
//! A player is described by:
//! - a display name,
//! - an optional `topic` map binding each tracked field to a value source
//!   (either a host template expression or a raw pub/sub topic),
//! - an optional action id per capability (play, pause, volume, ...),
//! - optional keyword strings used to derive the playback phase from raw
//!   power and status tokens.
//!
//! Configurations are plain YAML documents, one per player entity:
//!
//! ```yaml
//! name: Living Room Player
//! topic:
//!   song_title: { template: "{{ states('sensor.lr_title') }}" }
//!   album_art: { topic: "livingroom/player/art" }
//! play: livingroom_play
//! pause: livingroom_pause
//! status_keyword: playing
//! power_off_keyword: standby
//! ```

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Errors raised while loading or validating a player configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read configuration file '{0}': {1}")]
    Io(String, #[source] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Player name must not be empty")]
    EmptyName,
}

/// Where a tracked field gets its value from.
///
/// Both styles normalize into the same update contract downstream; the
/// reconciler does not care which transport supplied a value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ValueSource {
    /// Host template expression, evaluated by the platform's template engine.
    Template { template: String },
    /// Raw topic whose opaque payload the reconciler parses itself.
    Topic { topic: String },
}

/// Per-field value sources. Field names are the recognized option set;
/// anything else is rejected at parse time.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TopicMap {
    pub song_title: Option<ValueSource>,
    pub song_artist: Option<ValueSource>,
    pub song_album: Option<ValueSource>,
    pub volume: Option<ValueSource>,
    pub player_status: Option<ValueSource>,
    pub power: Option<ValueSource>,
    pub mute: Option<ValueSource>,
    pub source: Option<ValueSource>,
    pub sourcelist: Option<ValueSource>,
    pub album_art: Option<ValueSource>,
}

/// Full configuration for one player entity.
///
/// Every action field holds the id of an externally-defined action sequence;
/// a missing id simply means the capability is not advertised.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerConfig {
    pub name: String,

    #[serde(default)]
    pub topic: TopicMap,

    pub play: Option<String>,
    pub pause: Option<String>,
    pub stop: Option<String>,
    pub next: Option<String>,
    pub previous: Option<String>,
    /// Absolute volume-set action. Mutually exclusive with step control at
    /// dispatch time, but both may be configured.
    pub volume: Option<String>,
    pub vol_down: Option<String>,
    pub vol_up: Option<String>,
    pub vol_mute: Option<String>,
    pub vol_unmute: Option<String>,
    pub power_on: Option<String>,
    pub power_off: Option<String>,
    pub select_source: Option<String>,

    /// Token meaning "playing" on the status topic.
    pub status_keyword: Option<String>,
    /// Token meaning "off" on the power topic.
    pub power_off_keyword: Option<String>,
    /// Token meaning "on" on the power topic.
    pub power_on_keyword: Option<String>,
}

impl PlayerConfig {
    /// Parse and validate a configuration from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: PlayerConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.display().to_string(), e))?;
        let config = Self::from_yaml(&text)?;
        debug!(player = config.name.as_str(), "Loaded player configuration");
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        Ok(())
    }
}
