pub mod cache;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod domain;
pub mod errors;
pub mod language;
pub mod notification;
pub mod patterns;
pub mod pricing;
pub mod prompt;
pub mod session;

pub use cache::{CacheHit, CacheTier, SemanticCache, SemanticCacheSettings, StoreOutcome};
pub use catalog::{CatalogCache, CatalogSnapshot, CatalogStore};
pub use clock::{Clock, ManualClock, SystemClock};
pub use domain::catalog::{CatalogItem, CategoryClass, StrainType, TierPrices};
pub use domain::conversation::{
    Conversation, ConversationId, ConversationTurn, Role, DECISION_WINDOW,
};
pub use domain::intent::{Intent, IntentKind};
pub use domain::order::{ContactInfo, OrderInfo, OrderTotal, PaymentMethod, PriceTier};
pub use domain::profile::{Preferences, UserId, UserProfile};
pub use errors::{ApplicationError, DomainError, InterfaceError, UpstreamError};
pub use language::Language;
pub use notification::{NotificationEvent, NotificationRelay};
pub use pricing::PriceCalculator;
pub use prompt::PromptContextBuilder;
pub use session::{ConversationSession, ConversationStore, ProfileStore};
