use async_trait::async_trait;
use chatbridge_types::{Message, ModelRef, ProviderCatalog, Session};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use crate::backend::Backend;
use crate::error::ClientError;

#[derive(Debug, Clone)]
pub struct HttpBackendOptions {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub agent: Option<String>,
}

impl HttpBackendOptions {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            timeout: Duration::from_secs(120),
            agent: None,
        }
    }
}

/// [`Backend`] over the agent server's REST API.
pub struct HttpBackend {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    agent: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateSessionRequest<'a> {
    title: &'a str,
}

#[derive(Debug, Serialize)]
struct PromptRequest<'a> {
    parts: Vec<TextPartInput<'a>>,
    model: &'a ModelRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    agent: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct TextPartInput<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

impl HttpBackend {
    pub fn new(options: HttpBackendOptions) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| ClientError::Connection(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: options.base_url.trim_end_matches('/').to_string(),
            api_key: options.api_key,
            agent: options.agent,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<T, ClientError> {
        let response = self.authorize(request).send().await?;
        let response = check_status(response, what).await?;
        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| ClientError::Decode(format!("{}: {}", what, e)))
    }
}

async fn check_status(response: Response, what: &str) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::debug!(status = status.as_u16(), %body, "{} failed", what);
    Err(ClientError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl Backend for HttpBackend {
    async fn create_session(&self, title: &str) -> Result<Session, ClientError> {
        let request = self
            .client
            .post(self.url("/session"))
            .json(&CreateSessionRequest { title });
        self.execute(request, "create session").await
    }

    async fn send_prompt(
        &self,
        session_id: &str,
        content: &str,
        model: &ModelRef,
    ) -> Result<Message, ClientError> {
        let body = PromptRequest {
            parts: vec![TextPartInput {
                kind: "text",
                text: content,
            }],
            model,
            agent: self.agent.as_deref(),
        };
        let request = self
            .client
            .post(self.url(&format!("/session/{}/message", session_id)))
            .json(&body);
        self.execute(request, "send prompt").await
    }

    async fn get_message(
        &self,
        session_id: &str,
        message_id: &str,
    ) -> Result<Message, ClientError> {
        let request = self.client.get(self.url(&format!(
            "/session/{}/message/{}",
            session_id, message_id
        )));
        self.execute(request, "get message").await
    }

    async fn get_messages(&self, session_id: &str) -> Result<Vec<Message>, ClientError> {
        let request = self
            .client
            .get(self.url(&format!("/session/{}/message", session_id)));
        self.execute(request, "get messages").await
    }

    async fn list_providers(&self) -> Result<ProviderCatalog, ClientError> {
        let request = self.client.get(self.url("/config/providers"));
        self.execute(request, "list providers").await
    }
}
