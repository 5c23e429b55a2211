//! Azure Document Intelligence `prebuilt-layout` client.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use figex_layout::{AnalysisInput, AnalysisResult, DocumentAnalyzer, LayoutError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

pub const API_VERSION: &str = "2024-11-30";
const MODEL_ID: &str = "prebuilt-layout";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest {
    base64_source: String,
}

/// Body of the long-running operation polled via `Operation-Location`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationStatus {
    status: String,
    #[serde(default)]
    analyze_result: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

/// Outcome of reading one poll response.
#[derive(Debug)]
enum PollState {
    Pending,
    Done(AnalysisResult),
}

/// Client for the hosted layout model.
#[derive(Debug, Clone)]
pub struct DocumentIntelligenceClient {
    endpoint: String,
    key: String,
    http_client: reqwest::Client,
    poll_interval: Duration,
    max_polls: u32,
}

impl DocumentIntelligenceClient {
    pub fn new(endpoint: impl Into<String>, key: impl Into<String>) -> Result<Self, LayoutError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| LayoutError::Analysis(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            key: key.into(),
            http_client,
            poll_interval: Duration::from_secs(1),
            max_polls: 120,
        })
    }

    pub fn with_polling(mut self, interval: Duration, max_polls: u32) -> Self {
        self.poll_interval = interval;
        self.max_polls = max_polls;
        self
    }

    pub fn analyze_url(&self) -> String {
        format!(
            "{}/documentintelligence/documentModels/{MODEL_ID}:analyze?api-version={API_VERSION}",
            self.endpoint
        )
    }

    async fn submit(&self, bytes: &[u8]) -> Result<String, LayoutError> {
        let request = AnalyzeRequest {
            base64_source: base64::engine::general_purpose::STANDARD.encode(bytes),
        };

        let response = self
            .http_client
            .post(self.analyze_url())
            .header("Ocp-Apim-Subscription-Key", &self.key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LayoutError::Analysis(format!("failed to submit analysis: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LayoutError::Analysis(format!(
                "analysis request failed with status {status}: {body}"
            )));
        }

        response
            .headers()
            .get("operation-location")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| LayoutError::Analysis("response has no Operation-Location header".to_string()))
    }

    async fn poll(&self, operation_url: &str) -> Result<AnalysisResult, LayoutError> {
        for attempt in 1..=self.max_polls {
            let response = self
                .http_client
                .get(operation_url)
                .header("Ocp-Apim-Subscription-Key", &self.key)
                .send()
                .await
                .map_err(|e| LayoutError::Analysis(format!("failed to poll analysis: {e}")))?;

            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| LayoutError::Analysis(format!("failed to read analysis response: {e}")))?;
            if !status.is_success() {
                return Err(LayoutError::Analysis(format!(
                    "analysis poll failed with status {status}: {body}"
                )));
            }

            match parse_operation(&body)? {
                PollState::Done(result) => return Ok(result),
                PollState::Pending => {
                    debug!(attempt, "analysis still running");
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
        Err(LayoutError::Analysis(format!(
            "analysis did not finish after {} polls",
            self.max_polls
        )))
    }
}

fn parse_operation(body: &str) -> Result<PollState, LayoutError> {
    let operation: OperationStatus = serde_json::from_str(body)
        .map_err(|e| LayoutError::Analysis(format!("failed to parse analysis status: {e}")))?;

    match operation.status.as_str() {
        "notStarted" | "running" => Ok(PollState::Pending),
        "succeeded" => {
            let result = operation
                .analyze_result
                .ok_or_else(|| LayoutError::InvalidInput("succeeded operation has no analyzeResult".to_string()))?;
            Ok(PollState::Done(AnalysisResult::from_json(&result.to_string())?))
        }
        other => Err(LayoutError::Analysis(format!(
            "analysis ended with status {other}: {}",
            operation.error.map(|e| e.to_string()).unwrap_or_default()
        ))),
    }
}

#[async_trait]
impl DocumentAnalyzer for DocumentIntelligenceClient {
    async fn analyze(&self, input: &AnalysisInput) -> Result<AnalysisResult, LayoutError> {
        let bytes = match input {
            AnalysisInput::FilePath(path) => tokio::fs::read(path).await?,
            AnalysisInput::Bytes(data) => data.clone(),
        };
        debug!(bytes = bytes.len(), "submitting layout analysis");
        let operation_url = self.submit(&bytes).await?;
        self.poll(&operation_url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_url() {
        let client = DocumentIntelligenceClient::new("https://di.example.com/", "key").unwrap();
        assert_eq!(
            client.analyze_url(),
            "https://di.example.com/documentintelligence/documentModels/prebuilt-layout:analyze?api-version=2024-11-30"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let request = AnalyzeRequest {
            base64_source: "AAEC".to_string(),
        };
        assert_eq!(serde_json::to_string(&request).unwrap(), r#"{"base64Source":"AAEC"}"#);
    }

    #[test]
    fn test_running_operation_is_pending() {
        let state = parse_operation(r#"{"status": "running", "createdDateTime": "2024-01-01T00:00:00Z"}"#).unwrap();
        assert!(matches!(state, PollState::Pending));
    }

    #[test]
    fn test_succeeded_operation_is_parsed() {
        let body = r#"{
            "status": "succeeded",
            "analyzeResult": {
                "pages": [{"pageNumber": 1, "angle": 1.5, "lines": []}],
                "figures": [{"boundingRegions": [{"pageNumber": 1, "polygon": [1, 1, 5, 1, 5, 5, 1, 5]}]}]
            }
        }"#;
        match parse_operation(body).unwrap() {
            PollState::Done(result) => {
                assert_eq!(result.figures.len(), 1);
                assert_eq!(result.page_angle().unwrap(), 1.5);
            }
            PollState::Pending => panic!("expected a finished operation"),
        }
    }

    #[test]
    fn test_failed_operation_is_error() {
        let body = r#"{"status": "failed", "error": {"code": "InvalidRequest", "message": "bad image"}}"#;
        let err = parse_operation(body).unwrap_err();
        assert!(matches!(err, LayoutError::Analysis(ref m) if m.contains("bad image")), "{err}");
    }

    #[test]
    fn test_succeeded_without_result_is_invalid_input() {
        let err = parse_operation(r#"{"status": "succeeded"}"#).unwrap_err();
        assert!(matches!(err, LayoutError::InvalidInput(_)));
    }
}
