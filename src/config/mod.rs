//! Configuration module for rowdy-radio.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for each subsystem,
//! `AppPaths` for the platform settings location, TOML persistence via
//! `AppConfig::load` / `AppConfig::save_to`, and the environment overlay for
//! API secrets (`AppConfig::apply_env`).

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AppConfig, AudioConfig, GatewayConfig, LlmConfig, PlaybackConfig, QueueConfig, RadioConfig,
    ServerConfig, SttConfig, GENERATION_KEY_ENV, OPENAI_KEY_ENV,
};
