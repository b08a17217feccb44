//! Deterministic completion client for tests.
//!
//! Replies are routed by the first registered needle found in the prompt, so a
//! single client can stand in for every stage of a pipeline run.

use std::sync::Mutex;

use async_trait::async_trait;

use super::{CompletionClient, LlmError};

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    ApiError { status: u16, message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub prompt: String,
    pub temperature: f32,
}

#[derive(Default)]
pub struct ScriptedClient {
    routes: Vec<(String, Reply)>,
    fallback: Option<String>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers every prompt with the same text.
    pub fn always(text: &str) -> Self {
        Self {
            fallback: Some(text.to_string()),
            ..Self::default()
        }
    }

    pub fn on(mut self, needle: &str, reply: &str) -> Self {
        self.routes
            .push((needle.to_string(), Reply::Text(reply.to_string())));
        self
    }

    pub fn fail_on(mut self, needle: &str, status: u16, message: &str) -> Self {
        self.routes.push((
            needle.to_string(),
            Reply::ApiError {
                status,
                message: message.to_string(),
            },
        ));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, LlmError> {
        self.calls.lock().unwrap().push(RecordedCall {
            prompt: prompt.to_string(),
            temperature,
        });

        let reply = self
            .routes
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
            .or_else(|| self.fallback.clone().map(Reply::Text));

        match reply {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::ApiError { status, message }) => Err(LlmError::Api { status, message }),
            None => Err(LlmError::EmptyContent),
        }
    }
}
