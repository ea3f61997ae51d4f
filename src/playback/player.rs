//! External media player invocation.
//!
//! [`CommandPlayer`] runs the configured player (`ffplay -nodisp -autoexit`
//! by default) with the audio URL as its last argument and waits for it to
//! exit. The child is spawned with `kill_on_drop`, so dropping the `play`
//! future (shutdown) terminates playback.

use std::process::Stdio;

use crate::config::PlaybackConfig;

use super::PlaybackError;

/// Plays audio by spawning an external program.
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    program: String,
    args: Vec<String>,
}

impl CommandPlayer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &PlaybackConfig) -> Self {
        Self::new(config.player_program.clone(), config.player_args.clone())
    }

    /// Play `audio_url` to completion.
    ///
    /// Blocks the calling task until the player exits. A non-zero exit is
    /// reported with the player's stderr.
    pub async fn play(&self, audio_url: &str) -> Result<(), PlaybackError> {
        log::info!("player: streaming {audio_url} via {}", self.program);

        let output = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(audio_url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| PlaybackError::Launch {
                program: self.program.clone(),
                source,
            })?;

        if output.status.success() {
            log::info!("player: finished {audio_url}");
            Ok(())
        } else {
            Err(PlaybackError::PlayerFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
