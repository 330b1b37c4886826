//! Vertex AI `generateContent` backend.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ModelError;
use crate::model::ConstrainedModel;
use crate::shape::ResponseSchema;

pub const DEFAULT_LOCATION: &str = "us-central1";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-lite";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Settings for a [`VertexClient`].
#[derive(Clone)]
pub struct ModelSettings {
    pub project_id: String,
    pub location: String,
    pub model: String,
    /// Base URL override, e.g. a regional proxy. Defaults to the regional
    /// `aiplatform.googleapis.com` host.
    pub endpoint: Option<String>,
    /// Bearer token. When absent one is obtained from `gcloud` on connect.
    pub access_token: Option<String>,
    pub timeout_secs: u64,
}

impl ModelSettings {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            location: DEFAULT_LOCATION.to_string(),
            model: DEFAULT_MODEL.to_string(),
            endpoint: None,
            access_token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Full URL of the `generateContent` method for these settings.
    pub fn endpoint_url(&self) -> String {
        let base = match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://{}-aiplatform.googleapis.com", self.location),
        };
        format!(
            "{base}/v1/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
            self.project_id, self.location, self.model
        )
    }
}

impl fmt::Debug for ModelSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSettings")
            .field("project_id", &self.project_id)
            .field("location", &self.location)
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Process-wide handle to a Vertex AI model.
pub struct VertexClient {
    client: Client,
    url: String,
    model: String,
    token: String,
}

impl fmt::Debug for VertexClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VertexClient")
            .field("url", &self.url)
            .field("model", &self.model)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl VertexClient {
    /// Build the HTTP client and resolve credentials once.
    pub async fn connect(settings: ModelSettings) -> Result<Self, ModelError> {
        if settings.project_id.trim().is_empty() {
            return Err(ModelError::Config("model project id is empty".to_string()));
        }

        let token = match settings.access_token.clone().filter(|t| !t.trim().is_empty()) {
            Some(token) => token,
            None => gcloud_access_token().await?,
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| ModelError::Config(e.to_string()))?;

        let url = settings.endpoint_url();
        info!(model = %settings.model, location = %settings.location, "connected model client");
        Ok(Self {
            client,
            url,
            model: settings.model,
            token,
        })
    }

    /// Release the client. Calls already in flight keep their own handles.
    pub fn close(self) {
        info!(model = %self.model, "closed model client");
    }
}

async fn gcloud_access_token() -> Result<String, ModelError> {
    debug!("requesting access token from gcloud");
    let output = tokio::process::Command::new("gcloud")
        .args(["auth", "print-access-token"])
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| ModelError::Config(format!("failed to run gcloud: {e}")))?;
    if !output.status.success() {
        return Err(ModelError::Config(format!(
            "gcloud auth print-access-token failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        return Err(ModelError::Config("gcloud returned an empty access token".to_string()));
    }
    Ok(token)
}

#[async_trait]
impl ConstrainedModel for VertexClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate_constrained(
        &self,
        prompt: &str,
        schema: &ResponseSchema,
    ) -> Result<String, ModelError> {
        let body = GenerateRequest::new(prompt, schema);
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ModelError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(ModelError::Backend {
                status: status.as_u16(),
                message: backend_message(&text),
            });
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&text).map_err(|e| ModelError::Transport(e.to_string()))?;
        parsed.first_text().ok_or(ModelError::EmptyResponse)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'static str,
    response_schema: &'a ResponseSchema,
    candidate_count: u32,
}

impl<'a> GenerateRequest<'a> {
    fn new(prompt: &'a str, schema: &'a ResponseSchema) -> Self {
        Self {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: schema,
                candidate_count: 1,
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    fn first_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

fn backend_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) if !envelope.error.message.is_empty() => envelope.error.message,
        _ => body.trim().to_string(),
    }
}
