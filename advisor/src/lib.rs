pub mod models;
pub mod error;
pub mod config;
pub mod auth;
pub mod prompt;
pub mod sse;
pub mod backend;
pub mod vertex_service;
pub mod scripted_backend;
pub mod transient;
pub mod report;
pub mod analysis_service;

pub use models::*;
pub use error::AnalysisError;
pub use config::AdvisorConfig;
pub use backend::{FragmentStream, GenerationBackend};
pub use vertex_service::VertexService;
pub use scripted_backend::{ScriptStep, ScriptedBackend};
pub use transient::TransientDocument;
pub use report::ReportOutline;
pub use analysis_service::{AnalysisPermit, AnalysisService};
