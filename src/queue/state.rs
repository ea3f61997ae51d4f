//! Song request model and the two-slot queue state.
//!
//! [`QueueState`] only knows slots: it never performs I/O, so every method
//! is safe to call while the controller holds its lock.
//!
//! ```text
//!            admit                     finish_current / promote
//! (empty) ─────────▶ current ──────────────────────────────▶ (cleared)
//!            admit        ▲
//! current ─────────▶ next ┘ promote (only when current is empty)
//! ```

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

// ---------------------------------------------------------------------------
// SongStatus
// ---------------------------------------------------------------------------

/// Local view of a song's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SongStatus {
    /// Created remotely; waiting for the service to produce audio.
    Submitted,
    /// Audio is live on the stream URL; playback has been triggered.
    Streaming,
    /// Final asset available; playback has been triggered.
    Complete,
    /// The remote job failed.
    Error,
}

impl SongStatus {
    /// A short human-readable label for the status page.
    pub fn label(&self) -> &'static str {
        match self {
            SongStatus::Submitted => "Generating",
            SongStatus::Streaming => "Streaming",
            SongStatus::Complete => "Playing",
            SongStatus::Error => "Failed",
        }
    }
}

// ---------------------------------------------------------------------------
// SongRequest
// ---------------------------------------------------------------------------

/// One generation job tracked by the queue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SongRequest {
    /// Identifier assigned by the generation service.
    pub song_id: String,
    /// Prompt (or `title [tags]`) the song was generated from.
    pub prompt: String,
    pub status: SongStatus,
    /// Set once the song is streaming or complete.
    pub audio_url: Option<String>,
    /// Submission time, seconds since the Unix epoch.
    pub submitted_at: u64,
}

impl SongRequest {
    /// A freshly submitted request.
    pub fn new(song_id: impl Into<String>, prompt: impl Into<String>) -> Self {
        let submitted_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self {
            song_id: song_id.into(),
            prompt: prompt.into(),
            status: SongStatus::Submitted,
            audio_url: None,
            submitted_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Slot
// ---------------------------------------------------------------------------

/// Which slot a request landed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Current,
    Next,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Current => f.write_str("current"),
            Slot::Next => f.write_str("next"),
        }
    }
}

// ---------------------------------------------------------------------------
// QueueState
// ---------------------------------------------------------------------------

/// The `current` / `next` slot pair.
#[derive(Debug, Clone, Default)]
pub struct QueueState {
    current: Option<SongRequest>,
    next: Option<SongRequest>,
}

impl QueueState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&SongRequest> {
        self.current.as_ref()
    }

    pub fn next(&self) -> Option<&SongRequest> {
        self.next.as_ref()
    }

    /// Both slots are occupied.
    pub fn is_full(&self) -> bool {
        self.current.is_some() && self.next.is_some()
    }

    /// Number of occupied slots (0–2).
    pub fn len(&self) -> usize {
        usize::from(self.current.is_some()) + usize::from(self.next.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Place `song` in the first free slot.
    ///
    /// A waiting `next` is promoted before `song` is placed, so requests are
    /// always served in submission order. Returns the song back when both
    /// slots are taken.
    pub fn admit(&mut self, song: SongRequest) -> Result<Slot, SongRequest> {
        if self.current.is_none() {
            if let Some(waiting) = self.next.take() {
                self.current = Some(waiting);
                self.next = Some(song);
                return Ok(Slot::Next);
            }
            self.current = Some(song);
            return Ok(Slot::Current);
        }
        if self.next.is_none() {
            self.next = Some(song);
            return Ok(Slot::Next);
        }
        Err(song)
    }

    /// Record a status change on `current`, if it is still `song_id`.
    pub fn mark_current(
        &mut self,
        song_id: &str,
        status: SongStatus,
        audio_url: Option<String>,
    ) -> bool {
        match self.current.as_mut() {
            Some(song) if song.song_id == song_id => {
                song.status = status;
                if audio_url.is_some() {
                    song.audio_url = audio_url;
                }
                true
            }
            _ => false,
        }
    }

    /// Move `next` into an empty `current`. Returns the promoted request.
    pub fn promote(&mut self) -> Option<&SongRequest> {
        if self.current.is_none() {
            self.current = self.next.take();
            return self.current.as_ref();
        }
        None
    }

    /// Clear `current` (if it is still `song_id`) and promote `next` in the
    /// same step. Returns the id of the promoted request, if any.
    pub fn finish_current(&mut self, song_id: &str, status: SongStatus) -> Option<String> {
        if self.mark_current(song_id, status, None) {
            self.current = None;
        }
        self.promote().map(|song| song.song_id.clone())
    }
}

// ---------------------------------------------------------------------------
// QueueSnapshot
// ---------------------------------------------------------------------------

/// Serializable copy of the queue for the status endpoint and the form page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueSnapshot {
    pub current: Option<SongRequest>,
    pub next: Option<SongRequest>,
    pub full: bool,
}

impl From<&QueueState> for QueueSnapshot {
    fn from(state: &QueueState) -> Self {
        Self {
            current: state.current.clone(),
            next: state.next.clone(),
            full: state.is_full(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
