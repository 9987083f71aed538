use crate::analysis::AnalysisPayload;
use crate::error::CoreError;
use async_trait::async_trait;

/// Request sent to an analysis provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    /// Title of the song to analyse
    pub song_title: String,
}

impl AnalysisRequest {
    pub fn new(song_title: impl Into<String>) -> Self {
        Self {
            song_title: song_title.into(),
        }
    }
}

/// Trait for analysis providers.
///
/// Providers are opaque request/response calls: they either return a well-formed
/// payload or an error. Fallback handling lives in the session, not here.
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &'static str;

    /// Produce an analysis for the requested song
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisPayload, CoreError>;
}

/// Provider used when no analysis backend is configured.
///
/// Every request fails with the given reason, so each song degrades to the
/// fallback payload while playback keeps working.
#[derive(Debug, Clone)]
pub struct UnavailableProvider {
    reason: String,
}

impl UnavailableProvider {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl AnalysisProvider for UnavailableProvider {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    async fn analyze(&self, _request: &AnalysisRequest) -> Result<AnalysisPayload, CoreError> {
        Err(CoreError::AnalysisProviderFailed {
            provider: self.name().to_string(),
            reason: self.reason.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unavailable_provider_always_fails() {
        let provider = UnavailableProvider::new("no API key configured");
        let err = provider
            .analyze(&AnalysisRequest::new("Fortnight"))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Analysis provider unavailable failed: no API key configured"
        );
    }
}
