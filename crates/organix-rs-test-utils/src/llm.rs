use async_trait::async_trait;
use organix_rs_protocol::{ChatProvider, ChatRequest, ProviderError};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Always answers with the same text.
#[derive(Debug, Clone)]
pub struct FixedLLM {
    response: String,
}

impl FixedLLM {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

#[async_trait]
impl ChatProvider for FixedLLM {
    async fn complete(&self, _request: &ChatRequest) -> Result<String, ProviderError> {
        Ok(self.response.clone())
    }
}

/// Always fails with the configured error.
#[derive(Debug, Clone)]
pub struct FailingLLM {
    error: ProviderError,
    calls: Arc<AtomicUsize>,
}

impl FailingLLM {
    pub fn new(error: ProviderError) -> Self {
        Self {
            error,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn transient() -> Self {
        Self::new(ProviderError::Transient("service unavailable".to_string()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatProvider for FailingLLM {
    async fn complete(&self, _request: &ChatRequest) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }
}

/// Answers with a fixed text and keeps every request it saw.
#[derive(Debug, Clone)]
pub struct RecordingLLM {
    response: String,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl RecordingLLM {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().clone()
    }

    pub fn last_request(&self) -> Option<ChatRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl ChatProvider for RecordingLLM {
    async fn complete(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        self.requests.lock().push(request.clone());
        Ok(self.response.clone())
    }
}

/// Fails with a transient error for the first `failures` calls.
#[derive(Debug, Clone)]
pub struct FlakyLLM {
    response: String,
    failures: usize,
    calls: Arc<AtomicUsize>,
}

impl FlakyLLM {
    pub fn new(failures: usize, response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            failures,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatProvider for FlakyLLM {
    async fn complete(&self, _request: &ChatRequest) -> Result<String, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(ProviderError::Transient(format!("flaky call {call}")));
        }
        Ok(self.response.clone())
    }
}

/// What a [`ScriptedLLM`] does for a matching request.
#[derive(Debug, Clone)]
pub enum Script {
    Reply(String),
    Fail(ProviderError),
    /// Sleep, then reply.
    Slow(Duration, String),
}

impl Script {
    pub fn reply(text: impl Into<String>) -> Self {
        Self::Reply(text.into())
    }
}

/// Chooses a behaviour by matching a needle against the system prompt.
///
/// Rules are checked in insertion order; the first needle contained in the
/// system prompt wins, otherwise the default script runs.
#[derive(Debug, Clone)]
pub struct ScriptedLLM {
    rules: Vec<(String, Script)>,
    default: Script,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl ScriptedLLM {
    pub fn new(default: Script) -> Self {
        Self {
            rules: Vec::new(),
            default,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn on_prompt(mut self, needle: impl Into<String>, script: Script) -> Self {
        self.rules.push((needle.into(), script));
        self
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl ChatProvider for ScriptedLLM {
    async fn complete(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        self.requests.lock().push(request.clone());
        let script = self
            .rules
            .iter()
            .find(|(needle, _)| request.system_prompt.contains(needle.as_str()))
            .map(|(_, script)| script.clone())
            .unwrap_or_else(|| self.default.clone());
        match script {
            Script::Reply(text) => Ok(text),
            Script::Fail(err) => Err(err),
            Script::Slow(delay, text) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
        }
    }
}
