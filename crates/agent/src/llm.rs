use async_trait::async_trait;
use budtender_core::domain::conversation::{ConversationTurn, DECISION_WINDOW};
use budtender_core::domain::profile::Preferences;
use budtender_core::errors::UpstreamError;
use budtender_core::language::Language;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system_prompt: String,
    /// At most [`DECISION_WINDOW`] turns, the current user message last.
    pub turns: Vec<ConversationTurn>,
}

impl CompletionRequest {
    pub fn new(system_prompt: String, history: &[ConversationTurn], current: ConversationTurn) -> Self {
        let keep = DECISION_WINDOW.saturating_sub(1);
        let start = history.len().saturating_sub(keep);
        let mut turns = history[start..].to_vec();
        turns.push(current);
        Self { system_prompt, turns }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, UpstreamError>;
}

/// System prompt with the rendered stock block and what is known about the
/// customer.
pub fn system_prompt(
    catalog_context: &str,
    language: Language,
    preferences: Option<&Preferences>,
) -> String {
    let mut prompt = String::from(
        "You are a friendly budtender for a delivery shop. Recommend only products from the \
         stock list below and mark product names in bold like **Name**. Never invent prices. \
         If you cannot answer a question about the shop, say that a staff member will get back \
         to the customer.\n",
    );
    prompt.push_str(&format!("Reply in language: {language}.\n"));

    if let Some(preferences) = preferences {
        if let Some(level) = preferences.experience_level {
            prompt.push_str(&format!("Customer experience: {level:?}.\n"));
        }
        if !preferences.effects.is_empty() {
            prompt.push_str(&format!("Preferred effects: {}.\n", preferences.effects.join(", ")));
        }
        if !preferences.favorite_products.is_empty() {
            prompt.push_str(&format!(
                "Previously liked: {}.\n",
                preferences.favorite_products.join(", ")
            ));
        }
    }

    prompt.push_str("\n# Stock\n");
    if catalog_context.trim().is_empty() {
        prompt.push_str("(stock list temporarily unavailable; do not name products)\n");
    } else {
        prompt.push_str(catalog_context);
    }
    prompt
}
