use crate::error::AnalysisError;
use crate::models::GenerationRequest;
use async_trait::async_trait;

/// A response still being generated. Yields text fragments in arrival order,
/// `Ok(None)` once the backend has finished.
#[async_trait]
pub trait FragmentStream: Send {
    async fn next_fragment(&mut self) -> Result<Option<String>, AnalysisError>;
}

/// Anything that can run a streaming multimodal generation.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn stream_generate(
        &self,
        request: &GenerationRequest<'_>,
    ) -> Result<Box<dyn FragmentStream>, AnalysisError>;
}

#[async_trait]
impl<B: GenerationBackend + ?Sized> GenerationBackend for Box<B> {
    async fn stream_generate(
        &self,
        request: &GenerationRequest<'_>,
    ) -> Result<Box<dyn FragmentStream>, AnalysisError> {
        (**self).stream_generate(request).await
    }
}
