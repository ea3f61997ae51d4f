//! Ambient radio state machine and shared state.
//!
//! [`RadioPhase`] drives the orchestrator's cycle. [`RadioState`] keeps the
//! last results of each stage for logging and inspection, and
//! [`SharedState`] is the `Arc<Mutex<_>>` handle to it.

use std::sync::{Arc, Mutex};

// ---------------------------------------------------------------------------
// RadioPhase
// ---------------------------------------------------------------------------

/// Phases of one capture → prompt cycle.
///
/// ```text
/// Idle ──▶ Recording ──▶ Transcribing ──▶ Summarizing ──▶ Submitting ──▶ Idle
/// any stage ──error──▶ Error
/// Idle / Error ──pause──▶ Waiting ──▶ Recording (next cycle)
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RadioPhase {
    /// No cycle has run yet, or the last one finished successfully.
    #[default]
    Idle,
    /// Microphone is open for the fixed recording window.
    Recording,
    /// The clip is being uploaded for transcription.
    Transcribing,
    /// The transcript is being condensed into a summary.
    Summarizing,
    /// The radio prompt is being handed to the jukebox.
    Submitting,
    /// Pausing between cycles.
    Waiting,
    /// The last cycle failed; the loop continues after the pause.
    Error,
}

impl RadioPhase {
    /// Returns `true` while a cycle is actively working.
    ///
    /// ```
    /// use rowdy_radio::pipeline::RadioPhase;
    ///
    /// assert!(!RadioPhase::Idle.is_busy());
    /// assert!(RadioPhase::Recording.is_busy());
    /// assert!(RadioPhase::Submitting.is_busy());
    /// assert!(!RadioPhase::Waiting.is_busy());
    /// assert!(!RadioPhase::Error.is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            RadioPhase::Recording
                | RadioPhase::Transcribing
                | RadioPhase::Summarizing
                | RadioPhase::Submitting
        )
    }

    /// A short human-readable label for log lines.
    pub fn label(&self) -> &'static str {
        match self {
            RadioPhase::Idle => "Idle",
            RadioPhase::Recording => "Recording",
            RadioPhase::Transcribing => "Transcribing",
            RadioPhase::Summarizing => "Summarizing",
            RadioPhase::Submitting => "Submitting",
            RadioPhase::Waiting => "Waiting",
            RadioPhase::Error => "Error",
        }
    }
}

// ---------------------------------------------------------------------------
// RadioState
// ---------------------------------------------------------------------------

/// Everything the ambient loop has produced so far.
#[derive(Debug, Clone, Default)]
pub struct RadioState {
    pub phase: RadioPhase,
    pub last_transcript: Option<String>,
    pub last_summary: Option<String>,
    pub last_prompt: Option<String>,
    /// Song id returned by the jukebox for the last accepted prompt.
    pub last_song_id: Option<String>,
    /// Set when `phase == RadioPhase::Error`.
    pub error_message: Option<String>,
    /// Cycles that ended with an accepted submission.
    pub cycles_completed: u64,
}

// ---------------------------------------------------------------------------
// SharedState
// ---------------------------------------------------------------------------

/// Thread-safe handle to [`RadioState`].
///
/// Lock for a short critical section; never hold the lock across `.await`.
pub type SharedState = Arc<Mutex<RadioState>>;

pub fn new_shared_state() -> SharedState {
    Arc::new(Mutex::new(RadioState::default()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_phases() {
        assert!(RadioPhase::Transcribing.is_busy());
        assert!(RadioPhase::Summarizing.is_busy());
        assert!(!RadioPhase::Idle.is_busy());
    }

    #[test]
    fn labels() {
        assert_eq!(RadioPhase::Summarizing.label(), "Summarizing");
        assert_eq!(RadioPhase::Waiting.label(), "Waiting");
    }

    #[test]
    fn default_state_is_idle_and_empty() {
        let state = RadioState::default();
        assert_eq!(state.phase, RadioPhase::Idle);
        assert!(state.last_prompt.is_none());
        assert_eq!(state.cycles_completed, 0);
    }

    #[test]
    fn shared_state_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SharedState>();
    }

    #[test]
    fn shared_state_can_be_cloned_and_mutated() {
        let state = new_shared_state();
        let state2 = Arc::clone(&state);
        state.lock().unwrap().phase = RadioPhase::Recording;
        assert_eq!(state2.lock().unwrap().phase, RadioPhase::Recording);
    }
}
