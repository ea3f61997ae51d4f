//! Transcript summarization.
//!
//! This module provides:
//! * [`Summarizer`]: async trait used by the ambient pipeline.
//! * [`ApiSummarizer`]: OpenAI-compatible chat-completions backend.
//! * [`PromptBuilder`]: summary request and radio prompt templates.
//! * [`LlmError`]: error variants for LLM operations.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use rowdy_radio::config::AppConfig;
//! use rowdy_radio::llm::{ApiSummarizer, PromptBuilder, Summarizer};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let summarizer = ApiSummarizer::from_config(&config.llm);
//!
//!     let summary = summarizer.summarize("we argued about pizza").await.unwrap();
//!     let prompt = PromptBuilder::new(config.radio.max_summary_chars).radio_prompt(&summary);
//!     println!("{prompt}");
//! }
//! ```

pub mod prompt;
pub mod summarizer;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use prompt::{PromptBuilder, DEFAULT_MAX_SUMMARY_CHARS};
pub use summarizer::{ApiSummarizer, LlmError, Summarizer};

#[cfg(test)]
pub use summarizer::MockSummarizer;
