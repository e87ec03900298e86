//! Rotating prompt list and per-cycle generation requests.

use chrono::Utc;

/// Fixed, ordered prompt rotation.
///
/// The cursor advances by one and wraps after every cycle, whether or not
/// the cycle produced an image: a failed prompt waits a full rotation
/// rather than being retried immediately.
pub struct PromptCycle {
    prompts: Vec<String>,
    cursor: usize,
}

impl PromptCycle {
    /// `prompts` must be non-empty; the config layer validates this before
    /// construction.
    pub fn new(prompts: Vec<String>) -> Self {
        assert!(!prompts.is_empty(), "prompt list must not be empty");
        Self { prompts, cursor: 0 }
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    /// Current cursor position, always in `[0, len)`
    #[allow(dead_code)]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Build the request for the current prompt and advance the cursor
    pub fn next_request(&mut self) -> GenerationRequest {
        let prompt = self.prompts[self.cursor].clone();
        self.cursor = (self.cursor + 1) % self.prompts.len();
        GenerationRequest::new(prompt)
    }
}

/// One prompt instance, made unique with a generation nonce.
///
/// The nonce is coarse unix seconds; appending it to the prompt defeats
/// upstream response caching. Duplicate nonces (a stalled clock) produce
/// the same filename, which the atomic save turns into a harmless
/// overwrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub nonce: i64,
}

impl GenerationRequest {
    pub fn new(prompt: String) -> Self {
        Self {
            prompt,
            nonce: Utc::now().timestamp(),
        }
    }

    #[cfg(test)]
    pub fn with_nonce(prompt: &str, nonce: i64) -> Self {
        Self {
            prompt: prompt.to_string(),
            nonce,
        }
    }

    /// The prompt text sent to the endpoint, nonce appended
    pub fn seeded_prompt(&self) -> String {
        format!("{} {}", self.prompt, self.nonce)
    }

    /// Gallery filename: sanitized prompt, nonce, fixed extension
    pub fn file_name(&self) -> String {
        format!("{}_{}.jpg", sanitize(&self.prompt), self.nonce)
    }
}

/// Keep filenames flat and storage-safe: alphanumerics pass through,
/// everything else (spaces included) becomes an underscore.
fn sanitize(prompt: &str) -> String {
    prompt
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cycle(prompts: &[&str]) -> PromptCycle {
        PromptCycle::new(prompts.iter().map(|p| p.to_string()).collect())
    }

    #[test]
    fn cursor_is_position_mod_len_after_k_cycles() {
        let mut c = cycle(&["a", "b", "c"]);
        for k in 1..=10 {
            c.next_request();
            assert_eq!(c.cursor(), k % 3);
        }
    }

    #[test]
    fn cursor_advances_on_every_cycle_regardless_of_outcome() {
        // The cursor moves when the request is built, before any fetch can
        // fail, so a skipped cycle still consumes its rotation slot.
        let mut c = cycle(&["a", "b"]);
        let first = c.next_request();
        assert_eq!(first.prompt, "a");
        assert_eq!(c.cursor(), 1);
        let second = c.next_request();
        assert_eq!(second.prompt, "b");
        assert_eq!(c.cursor(), 0);
    }

    #[test]
    fn rotation_order_is_stable() {
        let mut c = cycle(&["x", "y", "z"]);
        let got: Vec<String> = (0..6).map(|_| c.next_request().prompt).collect();
        assert_eq!(got, ["x", "y", "z", "x", "y", "z"]);
    }

    #[test]
    fn file_name_combines_sanitized_prompt_and_nonce() {
        let req = GenerationRequest::with_nonce("neon palm trees", 1700000000);
        assert_eq!(req.file_name(), "neon_palm_trees_1700000000.jpg");
    }

    #[test]
    fn sanitize_strips_path_hostile_characters() {
        let req = GenerationRequest::with_nonce("a/b\\c: d", 1);
        assert_eq!(req.file_name(), "a_b_c__d_1.jpg");
    }

    #[test]
    fn seeded_prompt_appends_nonce() {
        let req = GenerationRequest::with_nonce("night city", 42);
        assert_eq!(req.seeded_prompt(), "night city 42");
    }

    #[test]
    fn duplicate_nonce_yields_identical_file_name() {
        let a = GenerationRequest::with_nonce("same", 7);
        let b = GenerationRequest::with_nonce("same", 7);
        assert_eq!(a.file_name(), b.file_name());
    }
}
