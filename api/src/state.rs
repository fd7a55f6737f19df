use anyhow::Result;
use record_advisor::report::SAMPLE_REPORT;
use record_advisor::*;
use std::env;
use std::sync::Arc;
use std::time::Duration;

pub type SharedService = Arc<AnalysisService<Box<dyn GenerationBackend>>>;

#[derive(Clone)]
pub struct AppState {
    pub service: SharedService,
    pub mode: &'static str,
}

impl AppState {
    /// `ADVISOR_LLM_MODE=mock` replays a canned report; anything else talks to
    /// Vertex AI and needs a working configuration.
    pub fn from_env() -> Result<Self> {
        let is_mock = env::var("ADVISOR_LLM_MODE").as_deref() == Ok("mock");

        let service = if is_mock {
            log::info!("LLM mode: mock");
            AnalysisService::new(
                Box::new(ScriptedBackend::streaming_text(SAMPLE_REPORT).with_delay(Duration::from_millis(30)))
                    as Box<dyn GenerationBackend>,
                GenerationConfig::default(),
                Duration::from_secs(10),
            )
        } else {
            let config = AdvisorConfig::from_env()?;
            log::info!("LLM mode: live, credentials from {}", config.credential_source);
            AnalysisService::new(
                Box::new(VertexService::new(&config)?) as Box<dyn GenerationBackend>,
                config.generation,
                config.timeout,
            )
        };

        let service = match env::var("ADVISOR_UPLOAD_DIR") {
            Ok(dir) => service.with_upload_dir(dir),
            Err(_) => service,
        };

        Ok(Self {
            service: Arc::new(service),
            mode: if is_mock { "mock" } else { "live" },
        })
    }

    #[cfg(test)]
    pub fn with_backend(backend: impl GenerationBackend + 'static, mode: &'static str) -> Self {
        Self {
            service: Arc::new(AnalysisService::new(
                Box::new(backend) as Box<dyn GenerationBackend>,
                GenerationConfig::default(),
                Duration::from_secs(5),
            )),
            mode,
        }
    }
}
