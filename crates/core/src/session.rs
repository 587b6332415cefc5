//! Conversation sessions and profile merging.
//!
//! A profile's preference bag is only ever grown from conversation text:
//! [`merge`] unions new keyword hits into the existing lists and truncates
//! the oldest values beyond each cap. [`UserProfile::reset_preferences`] is
//! the only path that clears it.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::domain::conversation::{
    tail, Conversation, ConversationId, ConversationTurn, Role, DECISION_WINDOW,
};
use crate::domain::profile::{
    ExperienceLevel, UserId, UserProfile, EFFECTS_CAP, FAVORITE_PRODUCTS_CAP,
};
use crate::errors::UpstreamError;
use crate::language::Language;
use crate::patterns::contains_any;

const BEGINNER_MARKERS: &[&str] = &[
    "first time",
    "beginner",
    "never tried",
    "newbie",
    "новичок",
    "впервые",
    "первый раз",
];
const INTERMEDIATE_MARKERS: &[&str] = &["sometimes", "occasionally", "иногда", "изредка"];
const EXPERIENCED_MARKERS: &[&str] = &[
    "experienced",
    "every day",
    "daily smoker",
    "heavy user",
    "tolerance",
    "опытн",
    "каждый день",
    "толерантн",
];

/// Effect tag and the substrings that signal it.
const EFFECT_MARKERS: &[(&str, &[&str])] = &[
    ("relax", &["relax", "calm", "chill", "расслаб", "спокой"]),
    ("sleep", &["sleep", "insomnia", "сон", "спать", "уснуть"]),
    ("energy", &["energy", "energetic", "бодр", "энерг"]),
    ("creative", &["creative", "creativity", "креатив", "творч"]),
    ("focus", &["focus", "productive", "фокус", "сосредоточ"]),
    ("euphoria", &["euphori", "happy", "uplift", "эйфори", "весел"]),
    ("pain", &["pain", "ache", "обезбол"]),
];

/// Persistent profile documents keyed by user id.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn load(&self, user_id: &UserId) -> Result<Option<UserProfile>, UpstreamError>;

    /// Last-write-wins by `updated_at`: returns `false` and leaves the stored
    /// copy untouched when it is newer than `profile`.
    async fn save(&self, profile: &UserProfile) -> Result<bool, UpstreamError>;
}

/// Full conversation histories keyed by the owning user and the
/// conversation id. The same conversation id under another user is a
/// different conversation.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn load(
        &self,
        user_id: &UserId,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, UpstreamError>;

    async fn save(&self, user_id: &UserId, conversation: &Conversation) -> Result<(), UpstreamError>;
}

/// Folds `conversation` into `profile`: the conversation becomes the most
/// recently touched entry, counters grow by what is new, and preference
/// fields gain any keyword hits found in the turns.
pub fn merge(mut profile: UserProfile, conversation: &Conversation, now: DateTime<Utc>) -> UserProfile {
    let previous = profile.recent_conversations.touch(conversation.clone());
    let previous_messages = match &previous {
        Some(previous) => previous.message_count(),
        None => {
            profile.conversation_count += 1;
            0
        }
    };
    profile.message_count += conversation.message_count().saturating_sub(previous_messages);

    if let Some(level) = detect_experience(&conversation.turns) {
        profile.preferences.experience_level = Some(level);
    }

    let effects = detect_effects(&conversation.turns);
    profile.preferences.effects =
        union_newest(&profile.preferences.effects, &effects, EFFECTS_CAP);

    let products = conversation
        .turns
        .iter()
        .flat_map(|turn| turn.products.iter().cloned())
        .collect::<Vec<_>>();
    profile.preferences.favorite_products =
        union_newest(&profile.preferences.favorite_products, &products, FAVORITE_PRODUCTS_CAP);

    let user_text = conversation
        .turns
        .iter()
        .filter(|turn| turn.is_user())
        .map(|turn| turn.content.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    if !user_text.trim().is_empty() {
        profile.preferences.language = Some(Language::detect(&user_text).as_str().to_string());
    }

    profile.last_seen = profile.last_seen.max(conversation.updated_at);
    profile.updated_at = now;
    profile
}

/// One-time migration of a client-held profile copy into the server store.
///
/// Whichever copy has the later `updated_at` wins; `first_seen` keeps the
/// earliest value seen by either side.
pub async fn reconcile_client_profile(
    store: &dyn ProfileStore,
    client: UserProfile,
) -> Result<UserProfile, UpstreamError> {
    let server = store.load(&client.user_id).await?;
    let mut winner = match server {
        Some(server) if server.updated_at >= client.updated_at => {
            debug!(
                event_name = "profile.reconcile.server_kept",
                user_id = %client.user_id.0,
                "server profile is newer than client copy"
            );
            let mut kept = server;
            kept.first_seen = kept.first_seen.min(client.first_seen);
            kept
        }
        Some(server) => {
            let mut adopted = client;
            adopted.first_seen = adopted.first_seen.min(server.first_seen);
            adopted
        }
        None => client,
    };
    winner.last_seen = winner.last_seen.max(winner.first_seen);

    store.save(&winner).await?;
    info!(
        event_name = "profile.reconcile.completed",
        user_id = %winner.user_id.0,
        "client profile reconciled"
    );
    Ok(winner)
}

fn detect_experience(turns: &[ConversationTurn]) -> Option<ExperienceLevel> {
    turns.iter().filter(|turn| turn.is_user()).fold(None, |level, turn| {
        let text = turn.content.to_lowercase();
        if contains_any(&text, EXPERIENCED_MARKERS) {
            Some(ExperienceLevel::Experienced)
        } else if contains_any(&text, BEGINNER_MARKERS) {
            Some(ExperienceLevel::Beginner)
        } else if contains_any(&text, INTERMEDIATE_MARKERS) {
            Some(ExperienceLevel::Intermediate)
        } else {
            level
        }
    })
}

fn detect_effects(turns: &[ConversationTurn]) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for turn in turns {
        let text = turn.content.to_lowercase();
        for (tag, markers) in EFFECT_MARKERS {
            if contains_any(&text, markers) && !found.iter().any(|existing| existing == tag) {
                found.push((*tag).to_string());
            }
        }
    }
    found
}

/// `existing` followed by unseen `additions`, deduplicated in insertion
/// order, keeping the newest `cap` values.
fn union_newest(existing: &[String], additions: &[String], cap: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut merged = existing
        .iter()
        .chain(additions.iter())
        .filter(|value| seen.insert(value.to_lowercase()))
        .cloned()
        .collect::<Vec<_>>();
    if merged.len() > cap {
        merged.drain(..merged.len() - cap);
    }
    merged
}

/// Append-only view of one conversation with timestamps from an injected
/// clock.
pub struct ConversationSession {
    conversation: Conversation,
    clock: Arc<dyn Clock>,
}

impl ConversationSession {
    pub fn start(id: ConversationId, clock: Arc<dyn Clock>) -> Self {
        let conversation = Conversation::new(id, clock.now());
        Self { conversation, clock }
    }

    pub fn resume(conversation: Conversation, clock: Arc<dyn Clock>) -> Self {
        Self { conversation, clock }
    }

    pub fn id(&self) -> &ConversationId {
        &self.conversation.id
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.conversation.turns
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn into_conversation(self) -> Conversation {
        self.conversation
    }

    pub fn append(&mut self, role: Role, content: impl Into<String>) -> &ConversationTurn {
        self.push(ConversationTurn::new(role, content, self.clock.now()))
    }

    pub fn append_with_products(
        &mut self,
        role: Role,
        content: impl Into<String>,
        products: Vec<String>,
    ) -> &ConversationTurn {
        self.push(ConversationTurn::new(role, content, self.clock.now()).with_products(products))
    }

    /// The trailing turns every decision computation is bounded to.
    pub fn decision_window(&self) -> &[ConversationTurn] {
        tail(&self.conversation.turns, DECISION_WINDOW)
    }

    /// Merges a channel-specific copy of the same conversation. Turns already
    /// present (same role, content and timestamp) are skipped; the result is
    /// ordered by timestamp. Returns the number of turns added.
    pub fn absorb(&mut self, channel_copy: &Conversation) -> usize {
        let known = self
            .conversation
            .turns
            .iter()
            .map(turn_identity)
            .collect::<HashSet<_>>();
        let fresh = channel_copy
            .turns
            .iter()
            .filter(|turn| !known.contains(&turn_identity(turn)))
            .cloned()
            .collect::<Vec<_>>();
        let added = fresh.len();
        if added == 0 {
            return 0;
        }

        self.conversation.turns.extend(fresh);
        self.conversation.turns.sort_by_key(|turn| turn.timestamp);
        if self.conversation.channel.is_none() {
            self.conversation.channel = channel_copy.channel.clone();
        }
        self.conversation.started_at = self.conversation.started_at.min(channel_copy.started_at);
        self.conversation.updated_at = self.conversation.updated_at.max(channel_copy.updated_at);
        added
    }

    fn push(&mut self, turn: ConversationTurn) -> &ConversationTurn {
        self.conversation.updated_at = turn.timestamp;
        self.conversation.turns.push(turn);
        let last = self.conversation.turns.len() - 1;
        &self.conversation.turns[last]
    }
}

fn turn_identity(turn: &ConversationTurn) -> (Role, String, DateTime<Utc>) {
    (turn.role, turn.content.clone(), turn.timestamp)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};

    use super::{merge, reconcile_client_profile, union_newest, ConversationSession, ProfileStore};
    use crate::clock::ManualClock;
    use crate::domain::conversation::{Conversation, ConversationId, ConversationTurn, Role};
    use crate::domain::profile::{ExperienceLevel, UserId, UserProfile};
    use crate::errors::UpstreamError;

    fn start() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).single().expect("valid date")
    }

    fn conversation(id: &str, texts: &[&str]) -> Conversation {
        let mut conversation = Conversation::new(ConversationId(id.to_string()), start());
        for (offset, text) in texts.iter().enumerate() {
            conversation
                .turns
                .push(ConversationTurn::user(*text, start() + Duration::seconds(offset as i64)));
        }
        conversation
    }

    #[test]
    fn eleventh_conversation_evicts_the_oldest() {
        let mut profile = UserProfile::new(UserId("u-1".to_string()), start());
        for index in 0..10 {
            profile = merge(profile, &conversation(&format!("c{index}"), &["hi"]), start());
        }
        assert_eq!(profile.recent_conversations.len(), 10);

        profile = merge(profile, &conversation("c10", &["hi"]), start());

        let ids = profile.recent_conversations.iter().map(|c| c.id.0.clone()).collect::<Vec<_>>();
        assert_eq!(ids.len(), 10);
        assert_eq!(ids[0], "c10");
        assert!(!ids.contains(&"c0".to_string()));
        assert_eq!(profile.conversation_count, 11);
    }

    #[test]
    fn remerging_counts_only_new_messages() {
        let profile = UserProfile::new(UserId("u-1".to_string()), start());
        let profile = merge(profile, &conversation("c1", &["hello"]), start());
        let profile = merge(profile, &conversation("c1", &["hello", "and more"]), start());

        assert_eq!(profile.conversation_count, 1);
        assert_eq!(profile.message_count, 2);
        assert_eq!(profile.recent_conversations.len(), 1);
    }

    #[test]
    fn preferences_are_unioned_from_turn_text() {
        let mut profile = UserProfile::new(UserId("u-1".to_string()), start());
        profile.preferences.effects = vec!["focus".to_string()];

        let mut talk = conversation("c1", &["It's my first time, I want to relax and sleep well"]);
        talk.turns.push(
            ConversationTurn::assistant("Try **Northern Lights**", start())
                .with_products(vec!["Northern Lights".to_string()]),
        );
        let profile = merge(profile, &talk, start());

        assert_eq!(profile.preferences.experience_level, Some(ExperienceLevel::Beginner));
        assert_eq!(profile.preferences.effects, vec!["focus", "relax", "sleep"]);
        assert_eq!(profile.preferences.favorite_products, vec!["Northern Lights"]);
        assert_eq!(profile.preferences.language.as_deref(), Some("en"));
    }

    #[test]
    fn conversation_without_hits_keeps_existing_preferences() {
        let mut profile = UserProfile::new(UserId("u-1".to_string()), start());
        profile.preferences.experience_level = Some(ExperienceLevel::Experienced);
        profile.preferences.effects = vec!["energy".to_string()];

        let profile = merge(profile, &conversation("c1", &["how much?"]), start());

        assert_eq!(profile.preferences.experience_level, Some(ExperienceLevel::Experienced));
        assert_eq!(profile.preferences.effects, vec!["energy"]);
    }

    #[test]
    fn union_drops_oldest_beyond_cap() {
        let existing = ["a", "b", "c"].map(String::from);
        let additions = ["B", "d", "e", "f"].map(String::from);

        assert_eq!(union_newest(&existing, &additions, 5), vec!["b", "c", "d", "e", "f"]);
    }

    #[test]
    fn session_window_and_channel_merge() {
        let clock = Arc::new(ManualClock::new(start()));
        let mut session = ConversationSession::start(ConversationId("c1".to_string()), clock.clone());
        for index in 0..14 {
            clock.advance(Duration::seconds(10));
            session.append(Role::User, format!("message {index}"));
        }
        assert_eq!(session.decision_window().len(), 12);
        assert_eq!(session.decision_window()[0].content, "message 2");

        let mut copy = session.conversation().clone();
        copy.channel = Some("telegram".to_string());
        copy.turns.push(ConversationTurn::user("from channel", start() + Duration::seconds(15)));

        assert_eq!(session.absorb(&copy), 1);
        assert_eq!(session.absorb(&copy), 0);
        assert_eq!(session.turns()[1].content, "from channel");
        assert_eq!(session.conversation().channel.as_deref(), Some("telegram"));
    }

    #[derive(Default)]
    struct MemoryProfiles {
        profiles: Mutex<HashMap<String, UserProfile>>,
    }

    #[async_trait]
    impl ProfileStore for MemoryProfiles {
        async fn load(&self, user_id: &UserId) -> Result<Option<UserProfile>, UpstreamError> {
            Ok(self.profiles.lock().expect("lock").get(&user_id.0).cloned())
        }

        async fn save(&self, profile: &UserProfile) -> Result<bool, UpstreamError> {
            let mut profiles = self.profiles.lock().expect("lock");
            if let Some(stored) = profiles.get(&profile.user_id.0) {
                if stored.updated_at > profile.updated_at {
                    return Ok(false);
                }
            }
            profiles.insert(profile.user_id.0.clone(), profile.clone());
            Ok(true)
        }
    }

    #[tokio::test]
    async fn reconcile_keeps_newer_copy_and_earliest_first_seen() {
        let store = MemoryProfiles::default();
        let user = UserId("u-1".to_string());

        let mut server = UserProfile::new(user.clone(), start());
        server.updated_at = start() + Duration::hours(2);
        server.message_count = 7;
        store.save(&server).await.expect("seed");

        let mut client = UserProfile::new(user.clone(), start() - Duration::days(3));
        client.updated_at = start() + Duration::hours(1);
        client.message_count = 3;

        let merged = reconcile_client_profile(&store, client).await.expect("reconcile");

        assert_eq!(merged.message_count, 7);
        assert_eq!(merged.first_seen, start() - Duration::days(3));
        let stored = store.load(&user).await.expect("load").expect("present");
        assert_eq!(stored, merged);
    }

    #[tokio::test]
    async fn reconcile_adopts_newer_client_copy() {
        let store = MemoryProfiles::default();
        let user = UserId("u-2".to_string());
        store.save(&UserProfile::new(user.clone(), start())).await.expect("seed");

        let mut client = UserProfile::new(user.clone(), start());
        client.updated_at = start() + Duration::minutes(5);
        client.preferences.effects = vec!["relax".to_string()];

        let merged = reconcile_client_profile(&store, client).await.expect("reconcile");

        assert_eq!(merged.preferences.effects, vec!["relax"]);
    }
}
