use super::{Invocation, Runner};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Mutex;

type Hook = Box<dyn Fn(&Invocation) -> Result<()> + Send + Sync>;

/// Records every invocation instead of spawning it. Hooks run in order on each
/// invocation and may write files to simulate what the real tool produces.
#[derive(Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<Invocation>>,
    fail_on: Option<String>,
    hooks: Vec<Hook>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the first invocation whose display form starts with `prefix`.
    pub fn failing_on(mut self, prefix: &str) -> Self {
        self.fail_on = Some(prefix.to_string());
        self
    }

    pub fn with_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Invocation) -> Result<()> + Send + Sync + 'static,
    {
        self.hooks.push(Box::new(hook));
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Display form of every recorded invocation, in order.
    pub fn commands(&self) -> Vec<String> {
        self.calls().iter().map(ToString::to_string).collect()
    }
}

#[async_trait]
impl Runner for RecordingRunner {
    async fn run(&self, invocation: &Invocation) -> Result<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(invocation.clone());
        }

        if let Some(prefix) = &self.fail_on {
            if invocation.to_string().starts_with(prefix.as_str()) {
                bail!("{} exited with exit status: 2", invocation.program)
            }
        }

        for hook in &self.hooks {
            hook(invocation)?;
        }

        Ok(())
    }
}
