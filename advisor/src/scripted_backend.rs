use crate::backend::{FragmentStream, GenerationBackend};
use crate::error::AnalysisError;
use crate::models::GenerationRequest;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum ScriptStep {
    Fragment(String),
    Fail(AnalysisError),
    Stall(Duration),
}

/// Backend that replays a fixed script instead of calling a model. Every
/// `stream_generate` call gets a fresh copy of the script.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBackend {
    steps: Vec<ScriptStep>,
    delay: Duration,
    calls: Arc<AtomicUsize>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedBackend {
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self {
            steps,
            ..Default::default()
        }
    }

    pub fn from_fragments<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(fragments.into_iter().map(|f| ScriptStep::Fragment(f.into())).collect())
    }

    /// Splits `text` into word-sized fragments, like a model streaming tokens.
    pub fn streaming_text(text: &str) -> Self {
        Self::from_fragments(text.split_inclusive(' '))
    }

    /// Sleeps this long before each fragment.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn stream_generate(
        &self,
        request: &GenerationRequest<'_>,
    ) -> Result<Box<dyn FragmentStream>, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(request.prompt.clone());
        }

        Ok(Box::new(ScriptedStream {
            steps: self.steps.iter().cloned().collect(),
            delay: self.delay,
        }))
    }
}

struct ScriptedStream {
    steps: VecDeque<ScriptStep>,
    delay: Duration,
}

#[async_trait]
impl FragmentStream for ScriptedStream {
    async fn next_fragment(&mut self) -> Result<Option<String>, AnalysisError> {
        loop {
            match self.steps.pop_front() {
                None => return Ok(None),
                Some(ScriptStep::Stall(duration)) => tokio::time::sleep(duration).await,
                Some(ScriptStep::Fail(err)) => return Err(err),
                Some(ScriptStep::Fragment(text)) => {
                    if !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }
                    return Ok(Some(text));
                }
            }
        }
    }
}
