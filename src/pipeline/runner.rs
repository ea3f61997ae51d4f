//! Radio orchestrator: drives the record → transcribe → summarize → submit
//! cycle.
//!
//! # Cycle
//!
//! ```text
//! spawn_blocking(source.record)        [Recording]
//!   └─▶ stt.transcribe                 [Transcribing]  → transcribed_text.txt
//!         └─▶ summarizer.summarize     [Summarizing]   → summary_text.txt
//!               └─▶ radio_prompt → submitter.submit_prompt   [Submitting]
//! ```
//!
//! [`RadioOrchestrator::run`] repeats the cycle with a fixed pause until
//! shutdown. A failed cycle is logged, recorded in [`SharedState`] and
//! followed by the same pause.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::audio::{AudioSource, CaptureError};
use crate::config::AppConfig;
use crate::llm::{LlmError, PromptBuilder, Summarizer};
use crate::queue::QueueError;
use crate::shutdown::{self, ShutdownRx};
use crate::stt::{SttEngine, SttError};

use super::state::{RadioPhase, SharedState};
use super::submit::SongSubmitter;

/// Diagnostic dump of the latest transcript.
pub const TRANSCRIPT_FILE: &str = "transcribed_text.txt";
/// Diagnostic dump of the latest summary.
pub const SUMMARY_FILE: &str = "summary_text.txt";

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

/// Why a cycle did not produce a queued song.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("recording failed: {0}")]
    Capture(#[from] CaptureError),

    #[error("transcription failed: {0}")]
    Transcription(#[from] SttError),

    /// Nothing intelligible was said during the recording window.
    #[error("transcript was empty, nothing to summarize")]
    EmptyTranscript,

    #[error("summarization failed: {0}")]
    Summarization(#[from] LlmError),

    #[error("song submission failed: {0}")]
    Submission(#[from] QueueError),

    /// Internal / unexpected error (e.g. tokio join failure).
    #[error("internal error: {0}")]
    Internal(String),
}

// ---------------------------------------------------------------------------
// CycleSettings
// ---------------------------------------------------------------------------

/// Timing and output settings for the orchestrator.
#[derive(Debug, Clone)]
pub struct CycleSettings {
    pub record_duration: Duration,
    pub cycle_pause: Duration,
    pub max_summary_chars: usize,
    pub diagnostics_dir: PathBuf,
}

impl CycleSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            record_duration: Duration::from_secs(config.audio.duration_secs),
            cycle_pause: Duration::from_secs(config.radio.cycle_pause_secs),
            max_summary_chars: config.radio.max_summary_chars,
            diagnostics_dir: config.radio.diagnostics_dir.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// RadioOrchestrator
// ---------------------------------------------------------------------------

/// Drives the ambient capture → song prompt loop.
pub struct RadioOrchestrator {
    state: SharedState,
    source: Arc<dyn AudioSource>,
    stt: Arc<dyn SttEngine>,
    summarizer: Arc<dyn Summarizer>,
    submitter: Arc<dyn SongSubmitter>,
    prompts: PromptBuilder,
    settings: CycleSettings,
}

impl RadioOrchestrator {
    pub fn new(
        state: SharedState,
        source: Arc<dyn AudioSource>,
        stt: Arc<dyn SttEngine>,
        summarizer: Arc<dyn Summarizer>,
        submitter: Arc<dyn SongSubmitter>,
        settings: CycleSettings,
    ) -> Self {
        Self {
            state,
            source,
            stt,
            summarizer,
            submitter,
            prompts: PromptBuilder::new(settings.max_summary_chars),
            settings,
        }
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Run cycles until shutdown is requested.
    pub async fn run(&self, mut shutdown_rx: ShutdownRx) {
        log::info!(
            "pipeline: ambient loop started ({:?} recordings, {:?} pause)",
            self.settings.record_duration,
            self.settings.cycle_pause
        );

        loop {
            tokio::select! {
                _ = shutdown::requested(&mut shutdown_rx) => break,
                _ = self.run_cycle_logged() => {}
            }

            self.set_phase_unless_error(RadioPhase::Waiting);
            tokio::select! {
                _ = shutdown::requested(&mut shutdown_rx) => break,
                _ = tokio::time::sleep(self.settings.cycle_pause) => {}
            }
        }

        log::info!("pipeline: ambient loop stopped");
    }

    async fn run_cycle_logged(&self) {
        match self.run_cycle().await {
            Ok(song_id) => log::info!("pipeline: cycle queued song {song_id}"),
            Err(e) => self.set_error(&e),
        }
    }

    /// One record → transcribe → summarize → submit pass.
    ///
    /// Returns the id of the submitted song.
    pub async fn run_cycle(&self) -> Result<String, PipelineError> {
        // ── 1. Record (blocking → thread pool) ──────────────────────────
        self.set_phase(RadioPhase::Recording);
        let source = Arc::clone(&self.source);
        let duration = self.settings.record_duration;
        let clip = tokio::task::spawn_blocking(move || source.record(duration))
            .await
            .map_err(|e| PipelineError::Internal(e.to_string()))??;
        log::debug!(
            "pipeline: captured {:.1}s ({} ch @ {} Hz)",
            clip.duration().as_secs_f32(),
            clip.channels,
            clip.sample_rate
        );

        // ── 2. Transcribe ───────────────────────────────────────────────
        self.set_phase(RadioPhase::Transcribing);
        let transcript = self.stt.transcribe(&clip).await?;
        self.dump(TRANSCRIPT_FILE, &transcript).await;
        self.update(|st| st.last_transcript = Some(transcript.clone()));
        if transcript.trim().is_empty() {
            return Err(PipelineError::EmptyTranscript);
        }

        // ── 3. Summarize ────────────────────────────────────────────────
        self.set_phase(RadioPhase::Summarizing);
        let summary = self.summarizer.summarize(&transcript).await?;
        self.dump(SUMMARY_FILE, &summary).await;
        self.update(|st| st.last_summary = Some(summary.clone()));

        // ── 4. Submit ───────────────────────────────────────────────────
        self.set_phase(RadioPhase::Submitting);
        let prompt = self.prompts.radio_prompt(&summary);
        log::info!("pipeline: submitting prompt: {prompt}");
        self.update(|st| st.last_prompt = Some(prompt.clone()));
        let song_id = self.submitter.submit_prompt(&prompt).await?;

        self.update(|st| {
            st.phase = RadioPhase::Idle;
            st.error_message = None;
            st.last_song_id = Some(song_id.clone());
            st.cycles_completed += 1;
        });
        Ok(song_id)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Overwrite `<diagnostics_dir>/<name>`; failures are only logged.
    async fn dump(&self, name: &str, contents: &str) {
        let dir: &Path = &self.settings.diagnostics_dir;
        let path = dir.join(name);
        let result = async {
            tokio::fs::create_dir_all(dir).await?;
            tokio::fs::write(&path, contents).await
        }
        .await;
        if let Err(e) = result {
            log::warn!("pipeline: could not write {}: {e}", path.display());
        }
    }

    fn update(&self, f: impl FnOnce(&mut super::state::RadioState)) {
        let mut st = self.state.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut st);
    }

    fn set_phase(&self, phase: RadioPhase) {
        log::debug!("pipeline: → {}", phase.label());
        self.update(|st| st.phase = phase);
    }

    /// Enter `phase` unless the last cycle ended in `Error`.
    fn set_phase_unless_error(&self, phase: RadioPhase) {
        self.update(|st| {
            if st.phase != RadioPhase::Error {
                st.phase = phase;
            }
        });
    }

    fn set_error(&self, error: &PipelineError) {
        let message = error.to_string();
        match error {
            PipelineError::EmptyTranscript | PipelineError::Submission(QueueError::QueueFull) => {
                log::warn!("pipeline: {message}")
            }
            _ => log::error!("pipeline error: {message}"),
        }
        self.update(|st| {
            st.phase = RadioPhase::Error;
            st.error_message = Some(message);
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
