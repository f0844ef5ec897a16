use mmpconfig::PlayerConfig;

/// Content type reported for everything this player plays.
pub const MEDIA_TYPE_MUSIC: &str = "music";

/// Composite playback phase derived from the raw power and status tokens.
///
/// Never written by a listener directly; always recomputed by
/// [`derive_phase`](crate::state::derive_phase) or set optimistically by the
/// command router (and superseded by the next authoritative notification).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackPhase {
    Off,
    On,
    Playing,
    Paused,
    Idle,
}

impl PlaybackPhase {
    /// Human-readable label for the phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackPhase::Off => "off",
            PlaybackPhase::On => "on",
            PlaybackPhase::Playing => "playing",
            PlaybackPhase::Paused => "paused",
            PlaybackPhase::Idle => "idle",
        }
    }
}

/// Keywords the phase derivation compares raw tokens against.
///
/// All comparisons are case-sensitive literal matches.
#[derive(Clone, Debug, Default)]
pub struct StatusKeywords {
    /// Status token meaning the player is playing.
    pub playing: Option<String>,
    /// Power token meaning the player is on.
    pub power_on: Option<String>,
    /// Power token meaning the player is off.
    pub power_off: Option<String>,
}

impl StatusKeywords {
    pub fn from_config(config: &PlayerConfig) -> Self {
        Self {
            playing: config.status_keyword.clone(),
            power_on: config.power_on_keyword.clone(),
            power_off: config.power_off_keyword.clone(),
        }
    }
}

/// One tracked attribute of the remote player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlayerField {
    SongTitle,
    SongArtist,
    SongAlbum,
    Volume,
    PlayerStatus,
    Power,
    Mute,
    Source,
    SourceList,
    AlbumArt,
}

/// What a successful update of a field asks of the platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshPolicy {
    /// No republish; the change is picked up on the next refresh.
    None,
    /// Republish through normal change detection.
    Publish,
    /// Republish even if the platform believes nothing changed.
    Forced,
}

impl PlayerField {
    /// Refresh policy of the field, part of the table-driven dispatch.
    ///
    /// Artist, album and source list intentionally stay silent: they are
    /// assumed to co-arrive with a title or source change and ride on that
    /// refresh. Power and status transitions must always be visible.
    pub fn refresh_policy(self) -> RefreshPolicy {
        match self {
            PlayerField::SongTitle | PlayerField::Volume | PlayerField::Mute | PlayerField::Source => {
                RefreshPolicy::Publish
            }
            PlayerField::Power | PlayerField::PlayerStatus => RefreshPolicy::Forced,
            PlayerField::SongArtist
            | PlayerField::SongAlbum
            | PlayerField::SourceList
            | PlayerField::AlbumArt => RefreshPolicy::None,
        }
    }

    /// Configuration-surface name of the field.
    pub fn name(self) -> &'static str {
        match self {
            PlayerField::SongTitle => "song_title",
            PlayerField::SongArtist => "song_artist",
            PlayerField::SongAlbum => "song_album",
            PlayerField::Volume => "volume",
            PlayerField::PlayerStatus => "player_status",
            PlayerField::Power => "power",
            PlayerField::Mute => "mute",
            PlayerField::Source => "source",
            PlayerField::SourceList => "sourcelist",
            PlayerField::AlbumArt => "album_art",
        }
    }
}

/// Opaque handle naming an external action sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionBinding(pub String);

impl ActionBinding {
    pub fn id(&self) -> &str {
        &self.0
    }
}

/// Authorization/context token of the caller that triggered a command.
///
/// Forwarded unchanged to every action execution so the external action
/// subsystem can attribute the side effect.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallerContext(pub String);
