use std::sync::Arc;
use std::time::Duration;

use budtender_core::cache::SemanticCache;
use budtender_core::catalog::CatalogCache;
use budtender_core::clock::Clock;
use budtender_core::domain::catalog::CONCENTRATE_MARKERS;
use budtender_core::domain::conversation::{ConversationId, ConversationTurn, Role};
use budtender_core::domain::intent::Intent;
use budtender_core::domain::profile::{UserId, UserProfile};
use budtender_core::errors::with_timeout;
use budtender_core::language::Language;
use budtender_core::notification::{self, NotificationMetadata, NotificationRelay};
use budtender_core::patterns::contains_any;
use budtender_core::prompt::PromptContextBuilder;
use budtender_core::session::{self, ConversationSession, ConversationStore, ProfileStore};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::classifier::{in_order_flow, IntentClassifier};
use crate::llm::{system_prompt, CompletionRequest, LlmClient};

#[derive(Clone, Debug)]
pub struct RuntimeSettings {
    pub llm_timeout: Duration,
    pub relay_timeout: Duration,
    pub store_timeout: Duration,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            llm_timeout: Duration::from_secs(30),
            relay_timeout: notification::DEFAULT_DELIVERY_TIMEOUT,
            store_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Clone, Debug)]
pub struct InboundMessage {
    pub user_id: UserId,
    pub conversation_id: Option<ConversationId>,
    pub text: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct AgentReply {
    pub conversation_id: ConversationId,
    pub reply: String,
    pub intent: Intent,
    pub language: Language,
    pub from_cache: bool,
    /// The model was unavailable and a fallback reply was used.
    pub degraded: bool,
}

/// Collaborators the runtime is wired with.
pub struct RuntimeDeps {
    pub catalog: Arc<CatalogCache>,
    pub llm: Arc<dyn LlmClient>,
    pub cache: Arc<SemanticCache>,
    pub relay: Arc<dyn NotificationRelay>,
    pub profiles: Arc<dyn ProfileStore>,
    pub conversations: Arc<dyn ConversationStore>,
    pub clock: Arc<dyn Clock>,
}

/// Runs one inbound message through catalog, cache, model, classification,
/// notification and persistence. Every collaborator failure degrades; the
/// caller always gets a reply.
pub struct AgentRuntime {
    deps: RuntimeDeps,
    settings: RuntimeSettings,
    classifier: IntentClassifier,
    prompt: PromptContextBuilder,
}

impl AgentRuntime {
    pub fn new(deps: RuntimeDeps, settings: RuntimeSettings) -> Self {
        Self {
            settings,
            classifier: IntentClassifier::with_clock(Arc::clone(&deps.clock)),
            prompt: PromptContextBuilder::new(),
            deps,
        }
    }

    pub async fn handle_message(&self, inbound: InboundMessage) -> AgentReply {
        let conversation_id = inbound
            .conversation_id
            .clone()
            .unwrap_or_else(|| ConversationId(Uuid::new_v4().to_string()));
        let mut session = self.open_session(&inbound.user_id, &conversation_id).await;
        let history = session.decision_window().to_vec();

        let catalog = self.deps.catalog.get().await;
        let language = Language::detect(&inbound.text);
        let private = in_order_flow(&inbound.text, &history, &catalog.items);

        let cached = if private {
            None
        } else {
            self.deps.cache.lookup_default(&inbound.text, Some(language.as_str())).await
        };

        let (reply, from_cache, degraded) = match cached {
            Some(hit) => {
                info!(
                    event_name = "agent.reply.cached",
                    conversation_id = %conversation_id.0,
                    tier = ?hit.tier,
                    similarity = hit.similarity,
                    "served reply from cache"
                );
                (hit.response, true, false)
            }
            None => {
                let profile = self.load_profile(&inbound.user_id).await;
                let include_secondary =
                    contains_any(&inbound.text.to_lowercase(), CONCENTRATE_MARKERS);
                let context = self.prompt.build(&catalog.items, include_secondary);
                let request = CompletionRequest::new(
                    system_prompt(&context, language, profile.as_ref().map(|p| &p.preferences)),
                    &history,
                    ConversationTurn::user(inbound.text.clone(), self.deps.clock.now()),
                );
                match with_timeout("llm", self.settings.llm_timeout, self.deps.llm.complete(&request))
                    .await
                {
                    Ok(reply) => (reply, false, false),
                    Err(error) => {
                        warn!(
                            event_name = "agent.llm.failed",
                            conversation_id = %conversation_id.0,
                            error = %error,
                            "model unavailable; using fallback reply"
                        );
                        (language.fallback_reply().to_string(), false, true)
                    }
                }
            }
        };

        let intent = if degraded {
            Intent::General
        } else {
            self.classifier.classify(&inbound.text, &reply, &history, &catalog.items)
        };
        debug!(
            event_name = "agent.intent.classified",
            conversation_id = %conversation_id.0,
            kind = %intent.kind(),
            confidence = intent.confidence(),
            "message classified"
        );

        self.notify(&inbound, &conversation_id, &intent, language);

        if !from_cache && !degraded && !private && is_cacheable(&intent) {
            let outcome = self
                .deps
                .cache
                .store(&inbound.text, &reply, intent.kind().as_str(), language.as_str())
                .await;
            debug!(event_name = "agent.cache.store", outcome = ?outcome, "cache write attempted");
        }

        session.append(Role::User, inbound.text.clone());
        session.append_with_products(Role::Assistant, reply.clone(), referenced_products(&intent));
        self.persist(&inbound.user_id, session).await;

        AgentReply { conversation_id, reply, intent, language, from_cache, degraded }
    }

    async fn open_session(&self, user_id: &UserId, id: &ConversationId) -> ConversationSession {
        let clock = Arc::clone(&self.deps.clock);
        let loaded = with_timeout(
            "conversation_store",
            self.settings.store_timeout,
            self.deps.conversations.load(user_id, id),
        )
        .await;
        match loaded {
            Ok(Some(conversation)) => ConversationSession::resume(conversation, clock),
            Ok(None) => ConversationSession::start(id.clone(), clock),
            Err(error) => {
                warn!(
                    event_name = "agent.conversation.load_failed",
                    conversation_id = %id.0,
                    error = %error,
                    "starting without history"
                );
                ConversationSession::start(id.clone(), clock)
            }
        }
    }

    async fn load_profile(&self, user_id: &UserId) -> Option<UserProfile> {
        match with_timeout("profile_store", self.settings.store_timeout, self.deps.profiles.load(user_id))
            .await
        {
            Ok(profile) => profile,
            Err(error) => {
                warn!(
                    event_name = "agent.profile.load_failed",
                    user_id = %user_id.0,
                    error = %error,
                    "continuing without profile"
                );
                None
            }
        }
    }

    fn notify(
        &self,
        inbound: &InboundMessage,
        conversation_id: &ConversationId,
        intent: &Intent,
        language: Language,
    ) {
        let metadata = NotificationMetadata {
            user_id: inbound.user_id.0.clone(),
            conversation_id: conversation_id.0.clone(),
            confidence: intent.confidence(),
            language: language.as_str().to_string(),
            timestamp: self.deps.clock.now(),
        };
        if let Some(event) = notification::assemble(intent, &inbound.text, metadata) {
            notification::dispatch(Arc::clone(&self.deps.relay), event, self.settings.relay_timeout);
        }
    }

    async fn persist(&self, user_id: &UserId, session: ConversationSession) {
        let conversation = session.into_conversation();
        let timeout = self.settings.store_timeout;

        if let Err(error) =
            with_timeout("conversation_store", timeout, self.deps.conversations.save(user_id, &conversation))
                .await
        {
            warn!(
                event_name = "agent.conversation.save_failed",
                conversation_id = %conversation.id.0,
                error = %error,
                "conversation not persisted"
            );
        }

        let now = self.deps.clock.now();
        let profile = self
            .load_profile(user_id)
            .await
            .unwrap_or_else(|| UserProfile::new(user_id.clone(), now));
        let profile = session::merge(profile, &conversation, now);
        if let Err(error) = with_timeout("profile_store", timeout, self.deps.profiles.save(&profile)).await {
            warn!(
                event_name = "agent.profile.save_failed",
                user_id = %user_id.0,
                error = %error,
                "profile not persisted"
            );
        }
    }
}

/// Only answers that are the same for every customer are shared.
fn is_cacheable(intent: &Intent) -> bool {
    matches!(intent, Intent::General | Intent::StaffQuestion { deferred: false, .. })
}

fn referenced_products(intent: &Intent) -> Vec<String> {
    match intent {
        Intent::Order { order, .. } => order.products.clone(),
        Intent::Wish { products, .. } => products.clone(),
        _ => Vec::new(),
    }
}
