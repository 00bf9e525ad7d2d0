//! Deterministic oracle that replays canned replies.
//!
//! Drives the merge loop in unit and integration tests without a network.
//! Replies are consumed in order; once the script runs out, the
//! fallback reply is repeated.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::Oracle;
use crate::errors::OracleError;

/// One scripted answer.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail(String),
}

impl Reply {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn fail(s: impl Into<String>) -> Self {
        Self::Fail(s.into())
    }
}

/// [`Oracle`] that answers from a fixed script and records every prompt.
#[derive(Debug)]
pub struct ScriptedOracle {
    script: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    /// Replay `replies` in order, then repeat `fallback`.
    pub fn new(replies: impl IntoIterator<Item = Reply>, fallback: Reply) -> Self {
        Self {
            script: Mutex::new(replies.into_iter().collect()),
            fallback,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always answer with `text`.
    pub fn always(text: impl Into<String>) -> Self {
        Self::new([], Reply::text(text))
    }

    /// Always fail with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::new([], Reply::fail(message))
    }

    /// Every prompt received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or_default()
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        let next = self
            .script
            .lock()
            .ok()
            .and_then(|mut s| s.pop_front())
            .unwrap_or_else(|| self.fallback.clone());

        match next {
            Reply::Text(text) => Ok(text),
            Reply::Fail(message) => Err(OracleError::ApiError {
                status: 500,
                body: message,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_then_falls_back() {
        let oracle = ScriptedOracle::new(
            [Reply::text("one"), Reply::fail("boom")],
            Reply::text("again"),
        );
        assert_eq!(oracle.complete("a").await.unwrap(), "one");
        assert!(oracle.complete("b").await.is_err());
        assert_eq!(oracle.complete("c").await.unwrap(), "again");
        assert_eq!(oracle.complete("d").await.unwrap(), "again");
        assert_eq!(oracle.prompts(), vec!["a", "b", "c", "d"]);
    }
}
