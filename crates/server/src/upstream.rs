//! HTTP clients for the collaborators behind the agent seams: chat
//! completion (OpenAI-compatible or Ollama), embeddings and the staff
//! notification webhook.

use std::time::Duration;

use async_trait::async_trait;
use budtender_agent::{CompletionRequest, LlmClient};
use budtender_core::cache::EmbeddingService;
use budtender_core::config::{EmbeddingConfig, LlmConfig, LlmProvider, RelayConfig};
use budtender_core::domain::conversation::Role;
use budtender_core::errors::UpstreamError;
use budtender_core::notification::{
    sign_payload, NotificationEvent, NotificationRelay, SIGNATURE_HEADER,
};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

const OPENAI_DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const OLLAMA_DEFAULT_BASE_URL: &str = "http://localhost:11434";

#[derive(Debug, Serialize, PartialEq, Eq)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: String,
}

fn chat_messages(request: &CompletionRequest) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(request.turns.len() + 1);
    messages.push(ChatMessage { role: "system", content: request.system_prompt.clone() });
    messages.extend(request.turns.iter().map(|turn| ChatMessage {
        role: match turn.role {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        },
        content: turn.content.clone(),
    }));
    messages
}

fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder().timeout(timeout).build()
}

fn transport_error(service: &'static str, error: reqwest::Error) -> UpstreamError {
    if error.is_timeout() {
        UpstreamError::unavailable(service, format!("request timed out: {error}"))
    } else {
        UpstreamError::unavailable(service, error.to_string())
    }
}

async fn read_json<T: for<'de> Deserialize<'de>>(
    service: &'static str,
    response: reqwest::Response,
) -> Result<T, UpstreamError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(UpstreamError::unavailable(service, format!("status {status}: {body}")));
    }
    response.json::<T>().await.map_err(|error| UpstreamError::decode(service, error.to_string()))
}

/// Chat completion over HTTP for either provider.
pub struct HttpLlmClient {
    client: Client,
    provider: LlmProvider,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
}

impl HttpLlmClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, reqwest::Error> {
        let default_base = match config.provider {
            LlmProvider::OpenAi => OPENAI_DEFAULT_BASE_URL,
            LlmProvider::Ollama => OLLAMA_DEFAULT_BASE_URL,
        };
        Ok(Self {
            client: build_client(Duration::from_secs(config.timeout_secs))?,
            provider: config.provider,
            base_url: config.base_url.clone().unwrap_or_else(|| default_base.to_string()),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn chat_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        match self.provider {
            LlmProvider::OpenAi => format!("{base}/chat/completions"),
            LlmProvider::Ollama => format!("{base}/api/chat"),
        }
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, UpstreamError> {
        let body = ChatRequest { model: &self.model, messages: chat_messages(request), stream: false };
        let mut builder = self.client.post(self.chat_url()).json(&body);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key.expose_secret());
        }
        let response = builder.send().await.map_err(|error| transport_error("llm", error))?;

        let content = match self.provider {
            LlmProvider::OpenAi => read_json::<OpenAiChatResponse>("llm", response)
                .await?
                .choices
                .into_iter()
                .next()
                .map(|choice| choice.message.content),
            LlmProvider::Ollama => {
                Some(read_json::<OllamaChatResponse>("llm", response).await?.message.content)
            }
        };

        content
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| UpstreamError::decode("llm", "empty completion"))
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbedResponse {
    data: Vec<OpenAiEmbedding>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbedding {
    embedding: Vec<f32>,
}

/// Embedding client. With an API key it speaks the OpenAI `/embeddings`
/// shape, otherwise Ollama's `/api/embed`.
pub struct HttpEmbeddingService {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
}

impl HttpEmbeddingService {
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_client(Duration::from_secs(config.timeout_secs))?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn embed_url(&self) -> String {
        if self.api_key.is_some() {
            format!("{}/embeddings", self.base_url)
        } else {
            format!("{}/api/embed", self.base_url)
        }
    }
}

#[async_trait]
impl EmbeddingService for HttpEmbeddingService {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, UpstreamError> {
        let body = EmbedRequest { model: &self.model, input: text };
        let mut builder = self.client.post(self.embed_url()).json(&body);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key.expose_secret());
        }
        let response = builder.send().await.map_err(|error| transport_error("embedding", error))?;

        let vector = if self.api_key.is_some() {
            read_json::<OpenAiEmbedResponse>("embedding", response)
                .await?
                .data
                .into_iter()
                .next()
                .map(|item| item.embedding)
        } else {
            read_json::<OllamaEmbedResponse>("embedding", response).await?.embeddings.into_iter().next()
        };

        vector
            .filter(|vector| !vector.is_empty())
            .ok_or_else(|| UpstreamError::decode("embedding", "no embedding returned"))
    }
}

/// Posts each event as JSON to the staff webhook, signed when a secret is set.
pub struct WebhookRelay {
    client: Client,
    webhook_url: String,
    signing_secret: Option<SecretString>,
}

impl WebhookRelay {
    /// `None` when the relay is disabled or has no URL.
    pub fn from_config(config: &RelayConfig) -> Result<Option<Self>, reqwest::Error> {
        let Some(webhook_url) = config.webhook_url.clone().filter(|_| config.enabled) else {
            return Ok(None);
        };
        Ok(Some(Self {
            client: build_client(Duration::from_secs(config.timeout_secs))?,
            webhook_url,
            signing_secret: config.signing_secret.clone(),
        }))
    }

    fn signature(&self, body: &[u8]) -> Option<String> {
        self.signing_secret
            .as_ref()
            .map(|secret| sign_payload(secret.expose_secret().as_bytes(), body))
    }
}

#[async_trait]
impl NotificationRelay for WebhookRelay {
    async fn deliver(&self, event: &NotificationEvent) -> Result<(), UpstreamError> {
        let body =
            serde_json::to_vec(event).map_err(|error| UpstreamError::decode("relay", error.to_string()))?;
        let mut builder = self
            .client
            .post(&self.webhook_url)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(signature) = self.signature(&body) {
            builder = builder.header(SIGNATURE_HEADER, signature);
        }

        let response = builder.body(body).send().await.map_err(|error| transport_error("relay", error))?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::unavailable("relay", format!("webhook returned {status}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use budtender_agent::CompletionRequest;
    use budtender_core::config::{AppConfig, LlmProvider};
    use budtender_core::domain::conversation::ConversationTurn;
    use budtender_core::notification::sign_payload;
    use chrono::Utc;

    use super::{chat_messages, HttpEmbeddingService, HttpLlmClient, WebhookRelay};

    #[test]
    fn chat_url_follows_provider() {
        let mut config = AppConfig::default().llm;
        config.provider = LlmProvider::OpenAi;
        config.base_url = None;
        let openai = HttpLlmClient::from_config(&config).expect("client");
        assert_eq!(openai.chat_url(), "https://api.openai.com/v1/chat/completions");

        config.provider = LlmProvider::Ollama;
        config.base_url = Some("http://ollama:11434/".to_string());
        let ollama = HttpLlmClient::from_config(&config).expect("client");
        assert_eq!(ollama.chat_url(), "http://ollama:11434/api/chat");
    }

    #[test]
    fn system_prompt_leads_the_message_list() {
        let request = CompletionRequest::new(
            "be nice".to_string(),
            &[ConversationTurn::assistant("hello", Utc::now())],
            ConversationTurn::user("hi", Utc::now()),
        );

        let messages = chat_messages(&request);

        let roles = messages.iter().map(|message| message.role).collect::<Vec<_>>();
        assert_eq!(roles, vec!["system", "assistant", "user"]);
        assert_eq!(messages[0].content, "be nice");
    }

    #[test]
    fn embedding_url_depends_on_api_key() {
        let mut config = AppConfig::default().embedding;
        let ollama = HttpEmbeddingService::from_config(&config).expect("client");
        assert_eq!(ollama.embed_url(), "http://localhost:11434/api/embed");

        config.base_url = "https://api.openai.com/v1".to_string();
        config.api_key = Some("sk-test".to_string().into());
        let openai = HttpEmbeddingService::from_config(&config).expect("client");
        assert_eq!(openai.embed_url(), "https://api.openai.com/v1/embeddings");
    }

    #[test]
    fn relay_is_absent_unless_enabled_with_url() {
        let mut config = AppConfig::default().relay;
        assert!(WebhookRelay::from_config(&config).expect("build").is_none());

        config.webhook_url = Some("https://hooks.example.test/staff".to_string());
        assert!(WebhookRelay::from_config(&config).expect("build").is_none());

        config.enabled = true;
        config.signing_secret = Some("s3cret".to_string().into());
        let relay = WebhookRelay::from_config(&config).expect("build").expect("relay");
        assert_eq!(relay.signature(b"{}"), Some(sign_payload(b"s3cret", b"{}")));
    }
}
