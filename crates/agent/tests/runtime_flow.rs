use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use budtender_agent::{
    AgentRuntime, CompletionRequest, InboundMessage, LlmClient, RuntimeDeps, RuntimeSettings,
};
use budtender_core::cache::{EmbeddingService, InMemoryExactCache, InMemoryVectorIndex};
use budtender_core::catalog::CatalogCache;
use budtender_core::clock::{Clock, SystemClock};
use budtender_core::domain::conversation::{ConversationId, Role};
use budtender_core::domain::intent::{Intent, IntentKind};
use budtender_core::domain::profile::UserId;
use budtender_core::errors::UpstreamError;
use budtender_core::language::Language;
use budtender_core::notification::{NotificationEvent, NotificationRelay};
use budtender_core::session::{ConversationStore, ProfileStore};
use budtender_core::{SemanticCache, SemanticCacheSettings};
use budtender_db::{
    CatalogSeedDataset, InMemoryCatalogStore, InMemoryConversationStore, InMemoryProfileStore,
};
use rust_decimal::Decimal;

struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<String, UpstreamError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    calls: AtomicUsize,
}

impl ScriptedLlm {
    fn new(replies: Vec<Result<String, UpstreamError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().expect("lock").push(request.clone());
        self.replies
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or_else(|| Err(UpstreamError::unavailable("llm", "script exhausted")))
    }
}

struct OfflineEmbeddings;

#[async_trait]
impl EmbeddingService for OfflineEmbeddings {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, UpstreamError> {
        Err(UpstreamError::unavailable("embedding", "disabled in tests"))
    }
}

#[derive(Default)]
struct RecordingRelay {
    events: Mutex<Vec<NotificationEvent>>,
}

#[async_trait]
impl NotificationRelay for RecordingRelay {
    async fn deliver(&self, event: &NotificationEvent) -> Result<(), UpstreamError> {
        self.events.lock().expect("lock").push(event.clone());
        Ok(())
    }
}

struct Harness {
    runtime: AgentRuntime,
    llm: Arc<ScriptedLlm>,
    relay: Arc<RecordingRelay>,
    profiles: Arc<InMemoryProfileStore>,
    conversations: Arc<InMemoryConversationStore>,
}

impl Harness {
    fn new(replies: Vec<Result<String, UpstreamError>>) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let catalog = CatalogSeedDataset::items().expect("demo catalog");
        let llm = Arc::new(ScriptedLlm::new(replies));
        let relay = Arc::new(RecordingRelay::default());
        let profiles = Arc::new(InMemoryProfileStore::default());
        let conversations = Arc::new(InMemoryConversationStore::default());

        let deps = RuntimeDeps {
            catalog: Arc::new(CatalogCache::new(
                Arc::new(InMemoryCatalogStore::new(catalog)),
                Arc::clone(&clock),
                Duration::from_secs(1800),
            )),
            llm: llm.clone(),
            cache: Arc::new(SemanticCache::new(
                Arc::new(InMemoryExactCache::new(Arc::clone(&clock), None)),
                Arc::new(OfflineEmbeddings),
                Arc::new(InMemoryVectorIndex::new()),
                Arc::clone(&clock),
                SemanticCacheSettings::default(),
            )),
            relay: relay.clone(),
            profiles: profiles.clone(),
            conversations: conversations.clone(),
            clock,
        };

        Self {
            runtime: AgentRuntime::new(deps, RuntimeSettings::default()),
            llm,
            relay,
            profiles,
            conversations,
        }
    }

    fn llm_calls(&self) -> usize {
        self.llm.calls.load(Ordering::SeqCst)
    }

    async fn wait_for_events(&self, expected: usize) -> Vec<NotificationEvent> {
        for _ in 0..50 {
            let events = self.relay.events.lock().expect("lock").clone();
            if events.len() >= expected {
                return events;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.relay.events.lock().expect("lock").clone()
    }
}

fn message(conversation: Option<&str>, text: &str) -> InboundMessage {
    message_from("u-42", conversation, text)
}

fn message_from(user: &str, conversation: Option<&str>, text: &str) -> InboundMessage {
    InboundMessage {
        user_id: UserId(user.to_string()),
        conversation_id: conversation.map(|id| ConversationId(id.to_string())),
        text: text.to_string(),
    }
}

#[tokio::test]
async fn order_with_contact_is_priced_notified_and_persisted() {
    let harness =
        Harness::new(vec![Ok("Great pick, **Northern Lights** is on its way!".to_string())]);

    let reply = harness
        .runtime
        .handle_message(message(
            Some("c-order"),
            "I want to order 20g of Northern Lights, my number is +66812345678",
        ))
        .await;

    assert!(!reply.degraded);
    assert!(!reply.from_cache);
    assert_eq!(reply.intent.kind(), IntentKind::Order);
    assert!(reply.intent.confidence() >= 0.95);
    let Intent::Order { total, .. } = &reply.intent else {
        panic!("expected order intent");
    };
    assert_eq!(total.as_ref().map(|total| total.amount), Some(Decimal::from(8000)));

    let events = harness.wait_for_events(1).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, IntentKind::Order);
    assert_eq!(events[0].products.as_deref(), Some(&["Northern Lights".to_string()][..]));
    assert_eq!(events[0].breakdown.as_deref(), Some("20 × 400 = 8000"));
    assert_eq!(events[0].metadata.conversation_id, "c-order");

    let conversation = harness
        .conversations
        .load(&UserId("u-42".to_string()), &ConversationId("c-order".to_string()))
        .await
        .expect("load")
        .expect("conversation saved");
    assert_eq!(conversation.turns.len(), 2);
    assert_eq!(conversation.turns[1].role, Role::Assistant);
    assert_eq!(conversation.turns[1].products, vec!["Northern Lights"]);

    let profile =
        harness.profiles.load(&UserId("u-42".to_string())).await.expect("load").expect("profile");
    assert_eq!(profile.conversation_count, 1);
    assert_eq!(profile.message_count, 2);
}

#[tokio::test]
async fn general_answers_are_served_from_cache_the_second_time() {
    let harness = Harness::new(vec![Ok("We deliver across Koh Samui every day.".to_string())]);

    let first = harness.runtime.handle_message(message(None, "Do you deliver to Lamai?")).await;
    let second = harness.runtime.handle_message(message(None, "do you deliver to lamai?")).await;

    assert_eq!(first.intent, Intent::General);
    assert!(!first.from_cache);
    assert!(second.from_cache);
    assert_eq!(second.reply, first.reply);
    assert_eq!(harness.llm_calls(), 1);
    assert!(harness.wait_for_events(0).await.is_empty());
}

#[tokio::test]
async fn model_failure_falls_back_without_caching_or_notifying() {
    let harness = Harness::new(vec![
        Err(UpstreamError::unavailable("llm", "connection refused")),
        Ok("We open at 10am.".to_string()),
    ]);

    let degraded = harness.runtime.handle_message(message(None, "Привет, какие новости?")).await;

    assert!(degraded.degraded);
    assert_eq!(degraded.language, Language::Ru);
    assert_eq!(degraded.reply, Language::Ru.fallback_reply());
    assert_eq!(degraded.intent, Intent::General);

    let retried = harness.runtime.handle_message(message(None, "Привет, какие новости?")).await;
    assert!(!retried.from_cache);
    assert_eq!(harness.llm_calls(), 2);
    assert!(harness.wait_for_events(0).await.is_empty());
}

#[tokio::test]
async fn follow_up_messages_carry_conversation_history() {
    let harness = Harness::new(vec![
        Ok("Hi! How can I help?".to_string()),
        Ok("Try **Gelato**.".to_string()),
    ]);

    let first = harness.runtime.handle_message(message(None, "hello")).await;
    harness
        .runtime
        .handle_message(message(Some(&first.conversation_id.0), "what do you recommend for sleep?"))
        .await;

    let requests = harness.llm.requests.lock().expect("lock").clone();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].turns.len(), 3);
    assert_eq!(requests[1].turns[0].content, "hello");
    assert_eq!(requests[1].turns[2].content, "what do you recommend for sleep?");

    let profile =
        harness.profiles.load(&UserId("u-42".to_string())).await.expect("load").expect("profile");
    assert_eq!(profile.conversation_count, 1);
    assert_eq!(profile.message_count, 4);
    assert_eq!(profile.preferences.effects, vec!["sleep"]);
}

#[tokio::test]
async fn replies_inside_an_order_flow_are_never_shared() {
    let harness = Harness::new(vec![
        Ok("Northern Lights it is. How much would you like?".to_string()),
        Ok("20g of Northern Lights comes to 8000. Where should we bring it?".to_string()),
        Ok("20g of which strain?".to_string()),
    ]);

    harness
        .runtime
        .handle_message(message_from("u-a", Some("conv-a"), "I want Northern Lights"))
        .await;
    let mid_checkout =
        harness.runtime.handle_message(message_from("u-a", Some("conv-a"), "20g")).await;
    let other_user =
        harness.runtime.handle_message(message_from("u-b", Some("conv-b"), "20g")).await;

    assert!(!mid_checkout.from_cache);
    assert!(!other_user.from_cache);
    assert_eq!(other_user.reply, "20g of which strain?");
    assert_eq!(harness.llm_calls(), 3);
}

#[tokio::test]
async fn scattered_checkout_through_the_runtime_is_a_priced_order() {
    let harness = Harness::new(vec![
        Ok("Northern Lights is a great pick. How much?".to_string()),
        Ok("Noted. What's your phone number?".to_string()),
        Ok("Thanks. Where should we deliver?".to_string()),
        Ok("Got it. How will you pay?".to_string()),
        Ok("Thank you! Your order is on its way.".to_string()),
    ]);

    let mut last = None;
    for text in ["I want Northern Lights", "20g", "+66812345678", "Hotel Y room 12", "cash"] {
        last = Some(harness.runtime.handle_message(message(Some("c-e2e"), text)).await);
    }
    let reply = last.expect("final reply");

    assert_eq!(reply.intent.kind(), IntentKind::Order);
    assert!(reply.intent.confidence() >= 0.95);
    let Intent::Order { order, total, .. } = &reply.intent else {
        panic!("expected order intent");
    };
    assert_eq!(order.products, vec!["Northern Lights"]);
    assert_eq!(order.contact_info.phone.as_deref(), Some("+66812345678"));
    let total = total.as_ref().expect("priced");
    assert_eq!(total.amount, Decimal::from(8000));
    assert_eq!(total.breakdown, "20 × 400 = 8000");
    assert_eq!(harness.llm_calls(), 5);
}
