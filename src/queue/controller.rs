//! The song queue controller.
//!
//! [`SongQueue`] owns the two slots behind a mutex and drives them from a
//! fixed-interval poll loop:
//!
//! ```text
//! submit ─▶ pre-check full ─▶ gateway.submit ─▶ admit (lock)
//!
//! tick:  current? ─▶ poll_status ─┬─ pending      ─▶ keep
//!                                 ├─ unreachable  ─▶ keep, retry next tick
//!                                 ├─ error        ─▶ clear + promote
//!                                 └─ streaming /  ─▶ spawn download,
//!                                    complete        await play,
//!                                                    clear + promote
//!        then promote next into an empty current (polled next tick)
//! ```
//!
//! The lock is never held across an `.await`; gateway and sink calls run
//! with the slots unlocked. Playback start and end are published as
//! [`QueueEvent`]s for front ends that report them to users.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;

use crate::config::QueueConfig;
use crate::gateway::{GatewayError, GenerationGateway, GenerationRequest, RemoteStatus};
use crate::playback::MediaSink;
use crate::shutdown::{self, ShutdownRx};

use super::state::{QueueSnapshot, QueueState, SongRequest, SongStatus};

// ---------------------------------------------------------------------------
// QueueError
// ---------------------------------------------------------------------------

/// Why a submission was not queued.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueueError {
    /// A song is playing and another is already waiting.
    #[error("queue is full: a song is playing and another is already waiting")]
    QueueFull,

    /// The generation service refused the job.
    #[error("song generation failed: {reason}")]
    GenerationFailed { reason: String },

    /// The generation service could not be reached.
    #[error("generation service unavailable: {0}")]
    GatewayUnavailable(String),
}

impl From<GatewayError> for QueueError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::Unavailable(msg) => QueueError::GatewayUnavailable(msg),
            GatewayError::GenerationFailed { reason } => QueueError::GenerationFailed { reason },
        }
    }
}

// ---------------------------------------------------------------------------
// Tick results
// ---------------------------------------------------------------------------

/// What happened to `current` during one tick.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Still generating.
    Pending { song_id: String, remote_status: String },
    /// Audio was played (or playback attempted) and the slot cleared.
    Played {
        song_id: String,
        audio_url: String,
        status: SongStatus,
        play_error: Option<String>,
    },
    /// The remote job failed; the slot was cleared without side effects.
    Failed { song_id: String, message: String },
    /// Status could not be fetched; the slot is kept for the next tick.
    Unreachable { song_id: String, reason: String },
}

/// Summary of one poll-loop iteration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TickReport {
    /// `None` when `current` was empty at the start of the tick.
    pub polled: Option<PollOutcome>,
    /// Song moved from `next` into `current` during this tick.
    pub promoted: Option<String>,
}

/// Song lifecycle notifications sent from the poll loop.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    /// Audio is available and playback is starting.
    NowPlaying { song_id: String },
    /// Playback ended; `play_error` is set when the player failed.
    Finished {
        song_id: String,
        play_error: Option<String>,
    },
    /// The remote job failed and the song was dropped.
    Failed { song_id: String, message: String },
}

/// Buffered events per subscriber before the oldest are dropped.
const EVENT_CAPACITY: usize = 32;

/// Shortest poll interval `run` will use; `tokio::time::interval` rejects zero.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

// ---------------------------------------------------------------------------
// SongQueue
// ---------------------------------------------------------------------------

/// Two-slot song queue shared between the HTTP front ends and the poll loop.
pub struct SongQueue {
    state: Mutex<QueueState>,
    gateway: Arc<dyn GenerationGateway>,
    sink: Arc<dyn MediaSink>,
    poll_interval: Duration,
    events: broadcast::Sender<QueueEvent>,
}

impl SongQueue {
    pub fn new(
        gateway: Arc<dyn GenerationGateway>,
        sink: Arc<dyn MediaSink>,
        config: &QueueConfig,
    ) -> Self {
        let secs = if config.poll_interval_secs == 0 {
            log::warn!("queue: poll_interval_secs = 0 is not allowed, polling every second");
            1
        } else {
            config.poll_interval_secs
        };
        Self::with_poll_interval(gateway, sink, Duration::from_secs(secs))
    }

    /// `poll_interval` is raised to at least one millisecond.
    pub fn with_poll_interval(
        gateway: Arc<dyn GenerationGateway>,
        sink: Arc<dyn MediaSink>,
        poll_interval: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Mutex::new(QueueState::new()),
            gateway,
            sink,
            poll_interval: poll_interval.max(MIN_POLL_INTERVAL),
            events,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Receive [`QueueEvent`]s published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }

    /// Copy of both slots.
    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot::from(&*self.lock())
    }

    /// Create a remote job for `request` and place it in a free slot.
    ///
    /// Fullness is checked before the gateway is called so a full queue does
    /// not create remote jobs. Two submissions racing for the last slot can
    /// both pass that check; the loser gets [`QueueError::QueueFull`].
    pub async fn submit(&self, request: GenerationRequest) -> Result<String, QueueError> {
        if self.lock().is_full() {
            log::warn!("queue: rejected \"{}\", both slots busy", request.label());
            return Err(QueueError::QueueFull);
        }

        let song_id = self.gateway.submit(&request).await.map_err(|e| {
            log::error!("queue: submission failed: {e}");
            QueueError::from(e)
        })?;

        let admitted = self.lock().admit(SongRequest::new(song_id.clone(), request.label()));
        match admitted {
            Ok(slot) => {
                log::info!("queue: song {song_id} queued in {slot} slot");
                Ok(song_id)
            }
            Err(_) => {
                log::warn!("queue: song {song_id} was created but both slots filled meanwhile");
                Err(QueueError::QueueFull)
            }
        }
    }

    /// One poll-loop iteration.
    ///
    /// A song promoted during this tick is first polled on the next one.
    pub async fn tick(&self) -> TickReport {
        let current = self.lock().current().map(|s| s.song_id.clone());

        let mut report = TickReport::default();
        if let Some(song_id) = current {
            let (outcome, promoted) = self.poll_current(&song_id).await;
            report.polled = Some(outcome);
            report.promoted = promoted;
        }

        if report.promoted.is_none() {
            report.promoted = self.lock().promote().map(|s| s.song_id.clone());
        }
        if let Some(id) = &report.promoted {
            log::info!("queue: song {id} promoted to current");
        }
        report
    }

    /// Run [`tick`](Self::tick) every poll interval until shutdown.
    ///
    /// Shutdown interrupts an in-flight tick, which drops (and kills) a
    /// running player.
    pub async fn run(self: Arc<Self>, mut shutdown_rx: ShutdownRx) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        log::info!("queue: poll loop started (every {:?})", self.poll_interval);

        loop {
            tokio::select! {
                _ = shutdown::requested(&mut shutdown_rx) => break,
                _ = interval.tick() => {}
            }
            tokio::select! {
                _ = shutdown::requested(&mut shutdown_rx) => break,
                report = self.tick() => log::debug!("queue: {report:?}"),
            }
        }
        log::info!("queue: poll loop stopped");
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, event: QueueEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    async fn poll_current(&self, song_id: &str) -> (PollOutcome, Option<String>) {
        let status = match self.gateway.poll_status(song_id).await {
            Ok(status) => status,
            Err(e) => {
                log::warn!("queue: status check for {song_id} failed, retrying next tick: {e}");
                let outcome = PollOutcome::Unreachable {
                    song_id: song_id.to_string(),
                    reason: e.to_string(),
                };
                return (outcome, None);
            }
        };

        match status {
            RemoteStatus::Pending(remote_status) => {
                log::info!("queue: song {song_id} still generating ({remote_status})");
                let outcome = PollOutcome::Pending {
                    song_id: song_id.to_string(),
                    remote_status,
                };
                (outcome, None)
            }
            RemoteStatus::Streaming => {
                let url = self.gateway.stream_url(song_id);
                self.play_and_clear(song_id, SongStatus::Streaming, url).await
            }
            RemoteStatus::Complete { audio_url } => {
                self.play_and_clear(song_id, SongStatus::Complete, audio_url)
                    .await
            }
            RemoteStatus::Error { message } => {
                log::error!("queue: song {song_id} failed remotely: {message}");
                let promoted = self.lock().finish_current(song_id, SongStatus::Error);
                self.publish(QueueEvent::Failed {
                    song_id: song_id.to_string(),
                    message: message.clone(),
                });
                let outcome = PollOutcome::Failed {
                    song_id: song_id.to_string(),
                    message,
                };
                (outcome, promoted)
            }
        }
    }

    /// Trigger the download, play to the end, then free the slot.
    async fn play_and_clear(
        &self,
        song_id: &str,
        status: SongStatus,
        audio_url: String,
    ) -> (PollOutcome, Option<String>) {
        self.lock().mark_current(song_id, status, Some(audio_url.clone()));
        log::info!("queue: song {song_id} ready ({}), playing {audio_url}", status.label());

        let sink = Arc::clone(&self.sink);
        let (url, id) = (audio_url.clone(), song_id.to_string());
        tokio::spawn(async move {
            match sink.download(&url, &id).await {
                Ok(path) => log::info!("queue: song {id} saved to {}", path.display()),
                Err(e) => log::warn!("queue: download of song {id} failed: {e}"),
            }
        });

        self.publish(QueueEvent::NowPlaying {
            song_id: song_id.to_string(),
        });
        let play_error = match self.sink.play(&audio_url).await {
            Ok(()) => None,
            Err(e) => {
                log::error!("queue: playback of song {song_id} failed: {e}");
                Some(e.to_string())
            }
        };

        let promoted = self.lock().finish_current(song_id, status);
        self.publish(QueueEvent::Finished {
            song_id: song_id.to_string(),
            play_error: play_error.clone(),
        });
        let outcome = PollOutcome::Played {
            song_id: song_id.to_string(),
            audio_url,
            status,
            play_error,
        };
        (outcome, promoted)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
