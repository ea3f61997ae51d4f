//! Playback and download side effects.
//!
//! The song queue only sees the [`MediaSink`] trait:
//!
//! ```text
//! SongQueue::tick ──spawn──▶ MediaSink::download   (detached, logged)
//!                 ──await──▶ MediaSink::play        (blocks the tick)
//! ```
//!
//! [`LocalMediaSink`] is the production sink: [`HttpDownloader`] saves the
//! asset under the songs directory and [`CommandPlayer`] streams the URL
//! through an external player.

pub mod download;
pub mod player;

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::PlaybackConfig;

pub use download::{song_path, HttpDownloader};
pub use player::CommandPlayer;

// ---------------------------------------------------------------------------
// PlaybackError
// ---------------------------------------------------------------------------

/// Errors from downloading or playing a song.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The asset could not be fetched.
    #[error("download failed: {0}")]
    Download(String),

    /// Local file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The player executable could not be started.
    #[error("failed to launch player `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The player ran but exited unsuccessfully.
    #[error("player exited with {status}: {stderr}")]
    PlayerFailed { status: String, stderr: String },
}

impl From<reqwest::Error> for PlaybackError {
    fn from(e: reqwest::Error) -> Self {
        PlaybackError::Download(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// MediaSink trait
// ---------------------------------------------------------------------------

/// Where finished songs go.
#[async_trait]
pub trait MediaSink: Send + Sync {
    /// Persist the asset at `audio_url` under a path keyed by `song_id`.
    async fn download(&self, audio_url: &str, song_id: &str) -> Result<PathBuf, PlaybackError>;

    /// Play `audio_url`, returning once playback ends.
    async fn play(&self, audio_url: &str) -> Result<(), PlaybackError>;
}

// ---------------------------------------------------------------------------
// LocalMediaSink
// ---------------------------------------------------------------------------

/// Downloads over HTTP and plays through an external command.
pub struct LocalMediaSink {
    downloader: HttpDownloader,
    player: CommandPlayer,
}

impl LocalMediaSink {
    pub fn new(downloader: HttpDownloader, player: CommandPlayer) -> Self {
        Self { downloader, player }
    }

    pub fn from_config(config: &PlaybackConfig) -> Self {
        Self::new(
            HttpDownloader::from_config(config),
            CommandPlayer::from_config(config),
        )
    }
}

#[async_trait]
impl MediaSink for LocalMediaSink {
    async fn download(&self, audio_url: &str, song_id: &str) -> Result<PathBuf, PlaybackError> {
        self.downloader.download(audio_url, song_id).await
    }

    async fn play(&self, audio_url: &str) -> Result<(), PlaybackError> {
        self.player.play(audio_url).await
    }
}

// ---------------------------------------------------------------------------
// RecordingSink  (test-only)
// ---------------------------------------------------------------------------

/// Records every call without touching the network or spawning processes.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingSink {
    pub downloads: std::sync::Mutex<Vec<(String, String)>>,
    pub plays: std::sync::Mutex<Vec<String>>,
    pub songs_dir: PathBuf,
    pub fail_play: bool,
}

#[cfg(test)]
impl RecordingSink {
    pub fn new() -> Self {
        Self {
            songs_dir: PathBuf::from("saved_songs"),
            ..Self::default()
        }
    }

    pub fn downloads(&self) -> Vec<(String, String)> {
        self.downloads.lock().unwrap().clone()
    }

    pub fn plays(&self) -> Vec<String> {
        self.plays.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl MediaSink for RecordingSink {
    async fn download(&self, audio_url: &str, song_id: &str) -> Result<PathBuf, PlaybackError> {
        self.downloads
            .lock()
            .unwrap()
            .push((audio_url.to_string(), song_id.to_string()));
        Ok(song_path(&self.songs_dir, song_id))
    }

    async fn play(&self, audio_url: &str) -> Result<(), PlaybackError> {
        self.plays.lock().unwrap().push(audio_url.to_string());
        if self.fail_play {
            return Err(PlaybackError::PlayerFailed {
                status: "exit status: 1".into(),
                stderr: "device busy".into(),
            });
        }
        Ok(())
    }
}
