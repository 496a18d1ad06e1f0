use crate::types::{Conversation, Role};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("model API returned status {status}: {body}")]
    Api { status: StatusCode, body: String },
    #[error("model API returned invalid response: {0}")]
    InvalidResponse(String),
}

/// Submits the full conversation and yields the model's free-text reply.
/// Every call resends the whole history; there is no delta submission.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    async fn generate(&self, conversation: &Conversation) -> Result<String, ModelError>;
}

#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self::with_client(base_url, model, api_key, Client::new())
    }

    pub fn with_client(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        client: Client,
    ) -> Self {
        Self {
            http: client,
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!("{base}/v1beta/models/{}:generateContent", self.model)
    }
}

#[async_trait]
impl ModelProvider for GeminiClient {
    async fn generate(&self, conversation: &Conversation) -> Result<String, ModelError> {
        let url = self.endpoint();
        let payload = GenerateContentRequest::from(conversation);
        info!(
            model = self.model.as_str(),
            url = %url,
            turns = conversation.len(),
            "Sending conversation to model provider"
        );
        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api { status, body });
        }

        let body = response.text().await?;
        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|err| ModelError::InvalidResponse(err.to_string()))?;
        debug!("Received response from model provider");
        extract_text(parsed)
    }
}

fn extract_text(response: GenerateContentResponse) -> Result<String, ModelError> {
    let text = response
        .candidates
        .unwrap_or_default()
        .into_iter()
        .flat_map(|candidate| candidate.content)
        .flat_map(|content| content.parts)
        .find_map(|part| part.text)
        .ok_or_else(|| ModelError::InvalidResponse("missing candidate text".into()))?;
    Ok(text.trim().to_string())
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<WireContent>,
}

#[derive(Debug, Serialize)]
struct WireContent {
    role: &'static str,
    parts: Vec<WirePart>,
}

#[derive(Debug, Serialize)]
struct WirePart {
    text: String,
}

impl From<&Conversation> for GenerateContentRequest {
    fn from(conversation: &Conversation) -> Self {
        Self {
            contents: conversation
                .turns()
                .iter()
                .map(|turn| WireContent {
                    role: wire_role(turn.role),
                    parts: vec![WirePart {
                        text: turn.content.clone(),
                    }],
                })
                .collect(),
        }
    }
}

// The provider accepts only two content roles; system and tool turns ride
// along as user entries, in their original positions.
fn wire_role(role: Role) -> &'static str {
    match role {
        Role::Model => "model",
        Role::System | Role::User | Role::Tool => "user",
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}
