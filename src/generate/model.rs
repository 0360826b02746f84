//! Chat-completion backends used to author compositions

use std::sync::Mutex;

use crate::error::{Result, WhitenoiseError};

/// A language model that answers a system + user prompt pair
pub trait ComposerModel: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &str;

    /// Send one prompt pair and return the raw reply text
    fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

/// Canned-response backend for tests and offline runs
///
/// Replies are returned in order; the last one repeats once the queue is
/// exhausted. Prompts are recorded for inspection.
pub struct MockComposer {
    replies: Vec<String>,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockComposer {
    pub fn new(reply: impl Into<String>) -> Self {
        Self::with_replies(vec![reply.into()])
    }

    pub fn with_replies(replies: Vec<String>) -> Self {
        Self {
            replies,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Prompt pairs received so far
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

impl ComposerModel for MockComposer {
    fn name(&self) -> &str {
        "mock"
    }

    fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let mut calls = self.calls.lock().map_err(|_| WhitenoiseError::LlmRequestFailed {
            reason: "mock composer lock poisoned".to_string(),
        })?;
        let index = calls.len().min(self.replies.len().saturating_sub(1));
        calls.push((system_prompt.to_string(), user_prompt.to_string()));

        self.replies
            .get(index)
            .cloned()
            .ok_or_else(|| WhitenoiseError::LlmRequestFailed {
                reason: "mock composer has no replies".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_replays_in_order() {
        let mock = MockComposer::with_replies(vec!["one".into(), "two".into()]);
        assert_eq!(mock.complete("s", "u1").unwrap(), "one");
        assert_eq!(mock.complete("s", "u2").unwrap(), "two");
        assert_eq!(mock.complete("s", "u3").unwrap(), "two");
        assert_eq!(mock.calls().len(), 3);
        assert_eq!(mock.calls()[1].1, "u2");
    }

    #[test]
    fn test_mock_without_replies_fails() {
        let mock = MockComposer::with_replies(vec![]);
        assert!(mock.complete("s", "u").is_err());
    }
}
