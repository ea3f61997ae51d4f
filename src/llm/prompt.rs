//! Prompt builder for transcript summarization and song prompts.
//!
//! [`PromptBuilder`] produces two things:
//! * **Chat** (`build_chat`): `(system_msg, user_msg)` for an
//!   OpenAI-compatible `/v1/chat/completions` endpoint.
//! * **Radio prompt** (`radio_prompt`): the generation prompt sent to the
//!   jukebox, built from a summary.

// ---------------------------------------------------------------------------
// Instructions
// ---------------------------------------------------------------------------

const SYSTEM_INSTRUCTION: &str = "You are a helpful assistant.";

const SUMMARY_REQUEST: &str = "Please summarize the following conversation in 3 sentences: ";

const RADIO_PREFIX: &str = "The next song should be about the following topic: ";

/// Default cap on the summary part of a radio prompt, in characters.
pub const DEFAULT_MAX_SUMMARY_CHARS: usize = 1000;

// ---------------------------------------------------------------------------
// PromptBuilder
// ---------------------------------------------------------------------------

/// Builds summarization and song-generation prompts.
///
/// # Example
/// ```rust
/// use rowdy_radio::llm::PromptBuilder;
///
/// let builder = PromptBuilder::new(1000);
/// let (system, user) = builder.build_chat("we talked about the sea");
/// assert_eq!(system, "You are a helpful assistant.");
/// assert!(user.ends_with("we talked about the sea"));
/// ```
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    max_summary_chars: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SUMMARY_CHARS)
    }
}

impl PromptBuilder {
    pub fn new(max_summary_chars: usize) -> Self {
        Self { max_summary_chars }
    }

    /// The fixed system instruction.
    pub fn system_instruction(&self) -> &'static str {
        SYSTEM_INSTRUCTION
    }

    /// `(system_msg, user_msg)` asking for a 3-sentence summary of `transcript`.
    pub fn build_chat(&self, transcript: &str) -> (String, String) {
        (
            SYSTEM_INSTRUCTION.to_string(),
            format!("{SUMMARY_REQUEST}{transcript}"),
        )
    }

    /// Song-generation prompt for `summary`.
    ///
    /// The summary is trimmed and cut to `max_summary_chars` characters
    /// (never inside a UTF-8 code point).
    pub fn radio_prompt(&self, summary: &str) -> String {
        let summary = summary.trim();
        let cut = match summary.char_indices().nth(self.max_summary_chars) {
            Some((idx, _)) => &summary[..idx],
            None => summary,
        };
        format!("{RADIO_PREFIX}{cut}")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_uses_fixed_instructions() {
        let (system, user) = PromptBuilder::default().build_chat("hello there");
        assert_eq!(system, "You are a helpful assistant.");
        assert_eq!(
            user,
            "Please summarize the following conversation in 3 sentences: hello there"
        );
    }

    #[test]
    fn radio_prompt_prefixes_summary() {
        let prompt = PromptBuilder::default().radio_prompt("  Friends planned a beach trip.  ");
        assert_eq!(
            prompt,
            "The next song should be about the following topic: Friends planned a beach trip."
        );
    }

    #[test]
    fn radio_prompt_truncates_by_characters() {
        let builder = PromptBuilder::new(5);
        assert_eq!(
            builder.radio_prompt("abcdefghij"),
            format!("{RADIO_PREFIX}abcde")
        );
        // Multi-byte characters are counted, not bytes.
        assert_eq!(builder.radio_prompt("ééééééé"), format!("{RADIO_PREFIX}ééééé"));
    }

    #[test]
    fn radio_prompt_default_cap_is_1000() {
        let long = "x".repeat(1500);
        let prompt = PromptBuilder::default().radio_prompt(&long);
        assert_eq!(prompt.len(), RADIO_PREFIX.len() + 1000);
    }

    #[test]
    fn short_summary_is_untouched() {
        let builder = PromptBuilder::new(1000);
        assert_eq!(builder.radio_prompt("rain"), format!("{RADIO_PREFIX}rain"));
    }
}
