use crate::backend::GenerationBackend;
use crate::error::AnalysisError;
use crate::models::*;
use crate::prompt::PromptTemplate;
use crate::transient::TransientDocument;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;

/// Drives one streaming analysis at a time against a generation backend.
pub struct AnalysisService<B> {
    backend: B,
    generation: GenerationConfig,
    timeout: Duration,
    upload_dir: Option<PathBuf>,
    in_flight: Arc<AtomicBool>,
}

/// Exclusive right to run the next analysis on one service. Released on drop.
#[derive(Debug)]
pub struct AnalysisPermit(Arc<AtomicBool>);

impl Drop for AnalysisPermit {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<B: GenerationBackend> AnalysisService<B> {
    pub fn new(backend: B, generation: GenerationConfig, timeout: Duration) -> Self {
        Self {
            backend,
            generation,
            timeout,
            upload_dir: None,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Where uploads are parked during an analysis. Defaults to the system temp dir.
    pub fn with_upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = Some(dir.into());
        self
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Claims the service for one analysis, or fails if another one holds it.
    pub fn try_begin(&self) -> Result<AnalysisPermit, AnalysisError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AnalysisError::Validation("an analysis is already in progress".to_string()))?;
        Ok(AnalysisPermit(Arc::clone(&self.in_flight)))
    }

    /// Streams an analysis of `document` for `goal`. `on_chunk` sees every
    /// fragment in arrival order; the returned text is their concatenation.
    ///
    /// On failure the fragments already passed to `on_chunk` stay delivered
    /// and must be treated as an incomplete report.
    pub async fn analyze<F>(
        &self,
        document: &Document,
        goal: &str,
        on_chunk: F,
    ) -> Result<FinalText, AnalysisError>
    where
        F: FnMut(&str) + Send,
    {
        let goal = Goal::new(goal)?;
        if document.is_empty() {
            return Err(AnalysisError::Validation("document must not be empty".to_string()));
        }
        let permit = self.try_begin()?;
        self.run(permit, document, goal, on_chunk).await
    }

    /// Like [`analyze_upload`](Self::analyze_upload), for a caller that already
    /// claimed the service with [`try_begin`](Self::try_begin).
    pub async fn analyze_upload_with_permit<F>(
        &self,
        permit: AnalysisPermit,
        bytes: &[u8],
        filename: Option<String>,
        goal: &str,
        on_chunk: F,
    ) -> Result<FinalText, AnalysisError>
    where
        F: FnMut(&str) + Send,
    {
        if !Arc::ptr_eq(&permit.0, &self.in_flight) {
            return Err(AnalysisError::Validation(
                "permit was issued by another service".to_string(),
            ));
        }
        let goal = Goal::new(goal)?;
        let transient = TransientDocument::materialize(bytes, filename, self.upload_dir.as_deref())?;
        let document = transient.load()?;
        if document.is_empty() {
            return Err(AnalysisError::Validation("document must not be empty".to_string()));
        }
        self.run(permit, &document, goal, on_chunk).await
    }

    async fn run<F>(
        &self,
        _permit: AnalysisPermit,
        document: &Document,
        goal: Goal,
        mut on_chunk: F,
    ) -> Result<FinalText, AnalysisError>
    where
        F: FnMut(&str) + Send,
    {
        let start_time = Instant::now();
        let request = GenerationRequest {
            document,
            prompt: PromptTemplate::render(&goal),
            config: self.generation,
        };

        log::info!(
            "Starting analysis of {} ({} bytes) for goal '{}'",
            document.filename.as_deref().unwrap_or("document"),
            document.bytes.len(),
            goal.as_str()
        );

        let mut stream = timeout(self.timeout, self.backend.stream_generate(&request))
            .await
            .map_err(|_| AnalysisError::Timeout(self.timeout))??;

        let mut final_text = FinalText::new();
        let mut fragments = 0usize;

        loop {
            let next = timeout(self.timeout, stream.next_fragment())
                .await
                .map_err(|_| AnalysisError::Timeout(self.timeout));

            match next.and_then(|r| r) {
                Ok(Some(fragment)) => {
                    final_text.push_str(&fragment);
                    fragments += 1;
                    on_chunk(&fragment);
                }
                Ok(None) => break,
                Err(e) => {
                    log::error!("Analysis aborted after {} fragments: {}", fragments, e);
                    return Err(e);
                }
            }
        }

        log::info!(
            "Analysis finished: {} fragments, {} chars in {} ms",
            fragments,
            final_text.chars().count(),
            start_time.elapsed().as_millis()
        );

        Ok(final_text)
    }

    /// Analyses a document stored on disk.
    pub async fn analyze_file<F>(
        &self,
        path: &Path,
        goal: &str,
        on_chunk: F,
    ) -> Result<FinalText, AnalysisError>
    where
        F: FnMut(&str) + Send,
    {
        Goal::new(goal)?;
        let document = Document::from_path(path)?;
        self.analyze(&document, goal, on_chunk).await
    }

    /// Parks `bytes` in a temporary file for the duration of the analysis.
    /// The file is gone when this returns, on success and on every error.
    pub async fn analyze_upload<F>(
        &self,
        bytes: &[u8],
        filename: Option<String>,
        goal: &str,
        on_chunk: F,
    ) -> Result<FinalText, AnalysisError>
    where
        F: FnMut(&str) + Send,
    {
        let permit = self.try_begin()?;
        self.analyze_upload_with_permit(permit, bytes, filename, goal, on_chunk)
            .await
    }
}
