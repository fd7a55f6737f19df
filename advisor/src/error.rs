use std::time::Duration;
use thiserror::Error;

/// Every way an analysis can fail. The display string is what the user sees.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("could not reach the generation backend: {0}")]
    Transport(String),
    #[error("generation backend error: {0}")]
    Backend(String),
    #[error("no response from the generation backend within {}s", .0.as_secs())]
    Timeout(Duration),
}

impl AnalysisError {
    /// Maps a reqwest failure onto the taxonomy. `limit` is reported when the
    /// client itself gave up waiting.
    pub fn from_transport(err: reqwest::Error, limit: Duration) -> Self {
        if err.is_timeout() {
            AnalysisError::Timeout(limit)
        } else if err.is_decode() {
            AnalysisError::Backend(format!("malformed response: {}", err))
        } else {
            AnalysisError::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_human_readable() {
        let err = AnalysisError::Timeout(Duration::from_secs(120));
        assert_eq!(err.to_string(), "no response from the generation backend within 120s");

        let err = AnalysisError::Validation("goal must not be empty".to_string());
        assert_eq!(err.to_string(), "invalid request: goal must not be empty");
    }
}
