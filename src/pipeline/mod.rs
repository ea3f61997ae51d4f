//! Ambient radio pipeline.
//!
//! Records the room, transcribes and summarizes what was said, and hands a
//! song prompt to the jukebox, forever.
//!
//! # Architecture
//!
//! ```text
//! RadioOrchestrator::run()  ← async tokio task
//!        │
//!        ├─ spawn_blocking(AudioSource::record)      → Recording
//!        ├─ SttEngine::transcribe                    → Transcribing
//!        ├─ Summarizer::summarize                    → Summarizing
//!        ├─ SongSubmitter::submit_prompt             → Submitting
//!        └─ sleep(cycle_pause) or shutdown           → Waiting
//!
//! SharedState (Arc<Mutex<RadioState>>) ←─── last results and phase
//! ```

pub mod runner;
pub mod state;
pub mod submit;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use runner::{CycleSettings, PipelineError, RadioOrchestrator, SUMMARY_FILE, TRANSCRIPT_FILE};
pub use state::{new_shared_state, RadioPhase, RadioState, SharedState};
pub use submit::{JukeboxClient, SongSubmitter};
