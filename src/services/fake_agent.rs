//! Scripted [`AgentRunner`] for unit tests.

use crate::error::Result;
use crate::services::llm_service::{AgentRole, AgentRunner};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::sync::Mutex;
use std::time::Duration;

type Handler = Box<dyn Fn(AgentRole, &str) -> Result<JsonValue> + Send + Sync>;
type Delay = Box<dyn Fn(&str) -> Duration + Send + Sync>;

pub struct ScriptedAgent {
    handler: Handler,
    delay: Option<Delay>,
    calls: Mutex<Vec<(AgentRole, String, Option<String>)>>,
}

impl ScriptedAgent {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(AgentRole, &str) -> Result<JsonValue> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Sleeps before answering, so completion order can differ from launch order.
    pub fn with_delay<F>(mut self, delay: F) -> Self
    where
        F: Fn(&str) -> Duration + Send + Sync + 'static,
    {
        self.delay = Some(Box::new(delay));
        self
    }

    pub fn calls(&self) -> Vec<(AgentRole, String, Option<String>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn prompts_for(&self, role: AgentRole) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|(r, _, _)| *r == role)
            .map(|(_, prompt, _)| prompt)
            .collect()
    }
}

#[async_trait]
impl AgentRunner for ScriptedAgent {
    async fn run(&self, role: AgentRole, prompt: &str, model: Option<&str>) -> Result<JsonValue> {
        self.calls
            .lock()
            .unwrap()
            .push((role, prompt.to_string(), model.map(str::to_string)));
        if let Some(delay) = &self.delay {
            tokio::time::sleep(delay(prompt)).await;
        }
        (self.handler)(role, prompt)
    }
}
