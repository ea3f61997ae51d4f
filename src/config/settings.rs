//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across tasks.
//! Every section is `#[serde(default)]`, so a `settings.toml` only needs the
//! keys it wants to change.
//!
//! API keys are normally not stored in the file: [`AppConfig::apply_env`]
//! overlays them from `API_KEY` (generation service) and `OPENAI_API_KEY`
//! (transcription + summarization).

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

/// Environment variable holding the music-generation API key.
pub const GENERATION_KEY_ENV: &str = "API_KEY";
/// Environment variable holding the transcription / chat API key.
pub const OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";

// ---------------------------------------------------------------------------
// GatewayConfig
// ---------------------------------------------------------------------------

/// Settings for the remote music-generation API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base URL of the generation API, including the trailing slash.
    pub base_url: String,
    /// Base URL of the live audio pipe; `?item_id=<song_id>` is appended.
    pub stream_base_url: String,
    /// Value sent in the `api-key` header.
    pub api_key: Option<String>,
    /// Model version passed as `mv`.
    pub model: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.sunoaiapi.com/api/v1/".into(),
            stream_base_url: "https://audiopipe.suno.ai/".into(),
            api_key: None,
            model: "chirp-v3-5".into(),
            timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// QueueConfig
// ---------------------------------------------------------------------------

/// Settings for the two-slot song queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Seconds between two status polls of the current song.
    pub poll_interval_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// PlaybackConfig
// ---------------------------------------------------------------------------

/// Settings for playback and song downloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// External player executable.
    pub player_program: String,
    /// Arguments passed before the audio URL.
    pub player_args: Vec<String>,
    /// Directory where finished songs are saved as `<song_id>.mp3`.
    pub songs_dir: PathBuf,
    /// Timeout for establishing a download connection, in seconds.
    pub download_connect_timeout_secs: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            player_program: "ffplay".into(),
            player_args: vec![
                "-nodisp".into(),
                "-autoexit".into(),
                "-loglevel".into(),
                "error".into(),
            ],
            songs_dir: PathBuf::from("saved_songs"),
            download_connect_timeout_secs: 15,
        }
    }
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

/// Settings for the jukebox HTTP front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the front end listens on.
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5001".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Settings for ambient audio capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Length of each ambient recording in seconds.
    pub duration_secs: u64,
    /// Capture sample rate requested from the device in Hz.
    pub sample_rate: u32,
    /// Input device: a device name, a numeric index from
    /// `paranoid-radio --list-devices`, or `None` for the system default.
    pub device: Option<String>,
    /// Attempts made while the input device is missing or busy.
    pub capture_retries: u32,
    /// Fixed pause between capture attempts in seconds.
    pub capture_backoff_secs: u64,
    /// Rate the clip is resampled to (mono) before upload.
    pub upload_sample_rate: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            duration_secs: 30,
            sample_rate: 96_000,
            device: None,
            capture_retries: 3,
            capture_backoff_secs: 5,
            upload_sample_rate: 16_000,
        }
    }
}

// ---------------------------------------------------------------------------
// SttConfig
// ---------------------------------------------------------------------------

/// Settings for the remote speech-to-text endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SttConfig {
    /// Base URL of an OpenAI-compatible API (no trailing `/v1`).
    pub base_url: String,
    /// Bearer token; `None` for local servers without authentication.
    pub api_key: Option<String>,
    /// Transcription model identifier.
    pub model: String,
    /// Optional ISO-639-1 language hint.
    pub language: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Attempts made when the request times out.
    pub retries: u32,
    /// Fixed pause between timed-out attempts in seconds.
    pub retry_backoff_secs: u64,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".into(),
            api_key: None,
            model: "whisper-1".into(),
            language: None,
            timeout_secs: 60,
            retries: 3,
            retry_backoff_secs: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// LlmConfig
// ---------------------------------------------------------------------------

/// Settings for the summarization step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API (no trailing `/v1`).
    pub base_url: String,
    /// Bearer token; `None` for local servers without authentication.
    pub api_key: Option<String>,
    /// Chat model identifier.
    pub model: String,
    /// Sampling temperature; `None` leaves the provider default.
    pub temperature: Option<f32>,
    /// Maximum seconds to wait for a response.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".into(),
            api_key: None,
            model: "gpt-4".into(),
            temperature: None,
            timeout_secs: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// RadioConfig
// ---------------------------------------------------------------------------

/// Settings for the ambient capture → prompt loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioConfig {
    /// Base URL of the jukebox front end that receives prompts.
    pub jukebox_url: String,
    /// Pause between two capture cycles in seconds.
    pub cycle_pause_secs: u64,
    /// Summary characters kept in the generation prompt.
    pub max_summary_chars: usize,
    /// Directory for `transcribed_text.txt` and `summary_text.txt`.
    pub diagnostics_dir: PathBuf,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            jukebox_url: "http://localhost:5001".into(),
            cycle_pause_secs: 60,
            max_summary_chars: 1000,
            diagnostics_dir: PathBuf::from("."),
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use rowdy_radio::config::AppConfig;
///
/// // Load (returns Default when file is missing), then pull secrets from env
/// let mut config = AppConfig::load().unwrap();
/// config.apply_env();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Remote music-generation API.
    pub gateway: GatewayConfig,
    /// Song queue polling.
    pub queue: QueueConfig,
    /// Player and downloads.
    pub playback: PlaybackConfig,
    /// HTTP front end.
    pub server: ServerConfig,
    /// Ambient capture.
    pub audio: AudioConfig,
    /// Remote transcription.
    pub stt: SttConfig,
    /// Remote summarization.
    pub llm: LlmConfig,
    /// Ambient loop.
    pub radio: RadioConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests and `--config`).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save to an explicit path, creating parent directories as needed.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Overlay API keys from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|name| std::env::var(name).ok());
    }

    /// Overlay API keys using `lookup` as the environment.
    ///
    /// Non-empty environment values win over the file. The OpenAI key is
    /// shared by transcription and summarization.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty(GENERATION_KEY_ENV) {
            self.gateway.api_key = Some(key);
        }
        if let Some(key) = non_empty(OPENAI_KEY_ENV) {
            self.stt.api_key = Some(key.clone());
            self.llm.api_key = Some(key);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
