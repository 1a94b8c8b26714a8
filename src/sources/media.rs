//! Media player adapter
//!
//! The player is never queried synchronously by the snapshot builder.
//! Instead a [`MediaSubscription`] polls the [`PlayerFeed`] in the background
//! and publishes the freshest [`PlayerInfo`] into a single-value cell; the
//! builder reads that cell through a [`MediaCache`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::{SourceError, SourceResult};

/// Playback state reported by the player
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    Playing,
    Paused,
    #[default]
    Stopped,
}

impl PlaybackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackStatus::Playing => "playing",
            PlaybackStatus::Paused => "paused",
            PlaybackStatus::Stopped => "stopped",
        }
    }
}

/// Latest known state of the active media player
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerInfo {
    pub player_name: String,
    pub status: PlaybackStatus,
    pub length: Duration,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub album_artist: String,
    /// Playback position at `updated_at`
    pub position: Duration,
    /// When `position` was sampled
    pub updated_at: Instant,
}

impl PlayerInfo {
    /// Create an empty, stopped player entry
    pub fn new(player_name: impl Into<String>) -> Self {
        Self {
            player_name: player_name.into(),
            status: PlaybackStatus::Stopped,
            length: Duration::ZERO,
            title: String::new(),
            artist: String::new(),
            album: String::new(),
            album_artist: String::new(),
            position: Duration::ZERO,
            updated_at: Instant::now(),
        }
    }

    /// Builder method: set track metadata
    pub fn track(
        mut self,
        title: impl Into<String>,
        artist: impl Into<String>,
        album: impl Into<String>,
        length: Duration,
    ) -> Self {
        let artist = artist.into();
        self.title = title.into();
        self.album_artist = artist.clone();
        self.artist = artist;
        self.album = album.into();
        self.length = length;
        self
    }

    /// Builder method: set playback state
    pub fn status(mut self, status: PlaybackStatus) -> Self {
        self.status = status;
        self
    }

    /// Builder method: set position as of now
    pub fn position(mut self, position: Duration) -> Self {
        self.position = position;
        self.updated_at = Instant::now();
        self
    }

    /// Position extrapolated to `now`
    ///
    /// Advances with wall time only while playing, and never runs past the
    /// end of a track of known length.
    pub fn position_at(&self, now: Instant) -> Duration {
        if self.status != PlaybackStatus::Playing {
            return self.position;
        }
        let elapsed = now.saturating_duration_since(self.updated_at);
        let position = self.position + elapsed;
        if self.length > Duration::ZERO {
            position.min(self.length)
        } else {
            position
        }
    }
}

/// Transport commands understood by the music API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCommand {
    Play,
    Pause,
    PlayPause,
    Next,
    Previous,
    Stop,
    Seek(Duration),
}

impl PlayerCommand {
    /// Parse a command name as used in `/api/music/{command}`
    ///
    /// `seek` takes an argument and is parsed by [`PlayerCommand::seek`].
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "play" => Some(PlayerCommand::Play),
            "pause" => Some(PlayerCommand::Pause),
            "playpause" | "toggleplaying" | "toggle" => Some(PlayerCommand::PlayPause),
            "skip" | "next" => Some(PlayerCommand::Next),
            "previous" | "back" => Some(PlayerCommand::Previous),
            "stop" => Some(PlayerCommand::Stop),
            _ => None,
        }
    }

    /// Seek command from a whole number of seconds
    pub fn seek(seconds: &str) -> Option<Self> {
        seconds
            .parse::<u64>()
            .ok()
            .map(|s| PlayerCommand::Seek(Duration::from_secs(s)))
    }
}

/// Source of player state for the background subscription
#[async_trait]
pub trait PlayerFeed: Send + Sync {
    /// Short adapter name for logs
    fn name(&self) -> &str;

    /// Current player state, or `None` if no player is running
    async fn poll(&self) -> SourceResult<Option<PlayerInfo>>;
}

/// Playback control surface
#[async_trait]
pub trait PlayerControl: Send + Sync {
    async fn execute(&self, command: PlayerCommand) -> SourceResult<()>;
}

/// Read side of the cached player state
///
/// Cheap to clone; reads never wait on the player.
#[derive(Clone)]
pub struct MediaCache {
    rx: watch::Receiver<Option<PlayerInfo>>,
}

impl MediaCache {
    /// A cache that always holds the given value
    pub fn fixed(info: Option<PlayerInfo>) -> Self {
        let (_tx, rx) = watch::channel(info);
        Self { rx }
    }

    /// Freshest known player state
    pub fn latest(&self) -> Option<PlayerInfo> {
        self.rx.borrow().clone()
    }

    /// Whether a player is currently known
    pub fn is_connected(&self) -> bool {
        self.rx.borrow().is_some()
    }
}

/// Background subscription keeping the [`MediaCache`] fresh
pub struct MediaSubscription {
    feed: Arc<dyn PlayerFeed>,
    tx: watch::Sender<Option<PlayerInfo>>,
    refresh: Duration,
}

impl MediaSubscription {
    /// Create a subscription and the cache it writes to
    pub fn new(feed: Arc<dyn PlayerFeed>, refresh: Duration) -> (Self, MediaCache) {
        let (tx, rx) = watch::channel(None);
        (Self { feed, tx, refresh }, MediaCache { rx })
    }

    /// Poll the feed once and publish the result
    ///
    /// On error the previous value stays in the cache.
    pub async fn refresh_once(&self) -> SourceResult<()> {
        let info = self.feed.poll().await?;
        self.tx.send_replace(info);
        Ok(())
    }

    /// Start the refresh loop
    pub fn start(self) -> JoinHandle<()> {
        tracing::info!(
            feed = self.feed.name(),
            refresh_ms = self.refresh.as_millis() as u64,
            "Starting media player subscription"
        );

        tokio::spawn(async move {
            let period = self.refresh.max(Duration::from_millis(1));
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if let Err(e) = self.refresh_once().await {
                    tracing::debug!(feed = self.feed.name(), error = %e, "Media player poll failed");
                }
            }
        })
    }
}

/// Feed used when no player integration is configured
pub struct NullPlayer;

#[async_trait]
impl PlayerFeed for NullPlayer {
    fn name(&self) -> &str {
        "none"
    }

    async fn poll(&self) -> SourceResult<Option<PlayerInfo>> {
        Ok(None)
    }
}

#[async_trait]
impl PlayerControl for NullPlayer {
    async fn execute(&self, command: PlayerCommand) -> SourceResult<()> {
        Err(SourceError::Unsupported(format!(
            "no media player configured for {:?}",
            command
        )))
    }
}

/// Simulated media player cycling through a fixed playlist
pub struct SimulatedPlayer {
    playlist: Vec<(String, String, String, Duration)>,
    state: Mutex<SimulatedState>,
}

struct SimulatedState {
    track: usize,
    info: PlayerInfo,
}

impl SimulatedPlayer {
    pub fn new() -> Self {
        let playlist = vec![
            (
                "Midnight City".to_string(),
                "M83".to_string(),
                "Hurry Up, We're Dreaming".to_string(),
                Duration::from_secs(243),
            ),
            (
                "Nightcall".to_string(),
                "Kavinsky".to_string(),
                "OutRun".to_string(),
                Duration::from_secs(258),
            ),
            (
                "Tadow".to_string(),
                "Masego".to_string(),
                "Lady Lady".to_string(),
                Duration::from_secs(301),
            ),
        ];
        let info = Self::load(&playlist, 0, PlaybackStatus::Playing);

        Self {
            playlist,
            state: Mutex::new(SimulatedState { track: 0, info }),
        }
    }

    fn load(
        playlist: &[(String, String, String, Duration)],
        track: usize,
        status: PlaybackStatus,
    ) -> PlayerInfo {
        let (title, artist, album, length) = &playlist[track];
        PlayerInfo::new("simulated")
            .track(title.as_str(), artist.as_str(), album.as_str(), *length)
            .status(status)
            .position(Duration::ZERO)
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut SimulatedState) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }

    fn skip(&self, state: &mut SimulatedState, forward: bool) {
        let len = self.playlist.len();
        state.track = if forward {
            (state.track + 1) % len
        } else {
            (state.track + len - 1) % len
        };
        let status = state.info.status;
        state.info = Self::load(&self.playlist, state.track, status);
    }
}

impl Default for SimulatedPlayer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlayerFeed for SimulatedPlayer {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn poll(&self) -> SourceResult<Option<PlayerInfo>> {
        let info = self.with_state(|state| {
            let now = Instant::now();
            if state.info.status == PlaybackStatus::Playing
                && state.info.position_at(now) >= state.info.length
            {
                self.skip(state, true);
            }
            state.info.clone()
        });
        Ok(Some(info))
    }
}

#[async_trait]
impl PlayerControl for SimulatedPlayer {
    async fn execute(&self, command: PlayerCommand) -> SourceResult<()> {
        self.with_state(|state| {
            let now = Instant::now();
            let position = state.info.position_at(now);
            match command {
                PlayerCommand::Play => {
                    state.info = state.info.clone().status(PlaybackStatus::Playing).position(position);
                }
                PlayerCommand::Pause => {
                    state.info = state.info.clone().status(PlaybackStatus::Paused).position(position);
                }
                PlayerCommand::PlayPause => {
                    let next = if state.info.status == PlaybackStatus::Playing {
                        PlaybackStatus::Paused
                    } else {
                        PlaybackStatus::Playing
                    };
                    state.info = state.info.clone().status(next).position(position);
                }
                PlayerCommand::Next => self.skip(state, true),
                PlayerCommand::Previous => self.skip(state, false),
                PlayerCommand::Stop => {
                    state.info = state
                        .info
                        .clone()
                        .status(PlaybackStatus::Stopped)
                        .position(Duration::ZERO);
                }
                PlayerCommand::Seek(to) => {
                    let to = to.min(state.info.length);
                    state.info = state.info.clone().position(to);
                }
            }
        });
        tracing::debug!(?command, "Simulated player command applied");
        Ok(())
    }
}
