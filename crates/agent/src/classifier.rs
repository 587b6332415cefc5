use std::sync::Arc;

use budtender_core::clock::{Clock, SystemClock};
use budtender_core::domain::catalog::{find_item, CatalogItem};
use budtender_core::domain::conversation::{tail, user_tail, ConversationTurn};
use budtender_core::domain::intent::Intent;
use budtender_core::patterns::find_phone;
use budtender_core::pricing::PriceCalculator;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::extractor::{mentions, OrderExtractor};
use crate::keywords::{self, KeywordSet};

/// User turns, current message included, searched for catalog mentions and
/// order keywords when gating and scoring an order.
const ORDER_LOOKBACK_TURNS: usize = 5;

/// Turns before the current message that can put a reply inside one
/// customer's order flow.
const ORDER_FLOW_TURNS: usize = 4;

pub const ORDER_WITH_CONTACT_CONFIDENCE: f32 = 0.95;
pub const ORDER_KEYWORD_CONFIDENCE: f32 = 0.90;
pub const ORDER_INFERRED_CONFIDENCE: f32 = 0.75;
pub const WISH_CONFIDENCE: f32 = 0.75;
pub const STAFF_DEFERRED_CONFIDENCE: f32 = 0.90;
pub const STAFF_ANSWERED_CONFIDENCE: f32 = 0.40;
pub const FEEDBACK_CONFIDENCE: f32 = 0.70;

static BOLD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*([^*\n]+)\*\*").expect("bold marker pattern is valid"));

/// Order-related signals carried by a single user message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OrderSignals {
    pub order_keyword: bool,
    pub delivery_friction: bool,
    /// Phone-like digit run, name/hotel/address marker or payment mention.
    pub contact: bool,
}

impl OrderSignals {
    pub fn detect(message: &str) -> Self {
        let normalized = keywords::normalize(message);
        Self {
            order_keyword: keywords::matches(&normalized, KeywordSet::Order),
            delivery_friction: keywords::matches(&normalized, KeywordSet::DeliveryFriction),
            contact: find_phone(message).is_some()
                || keywords::matches(&normalized, KeywordSet::ContactMarker)
                || keywords::payment_method(&normalized).is_some(),
        }
    }

    pub fn any(&self) -> bool {
        self.order_keyword || self.delivery_friction || self.contact
    }
}

/// True when the message or the turns just before it belong to an order:
/// signals in the message, or order keywords, order context, contact details
/// or catalog mentions in the recent turns. Replies inside an order flow are
/// specific to one customer and never shared through the cache.
pub fn in_order_flow(
    user_message: &str,
    history: &[ConversationTurn],
    catalog_items: &[CatalogItem],
) -> bool {
    if OrderSignals::detect(user_message).any()
        || mentions_catalog_item(&keywords::normalize(user_message), catalog_items)
    {
        return true;
    }

    tail(history, ORDER_FLOW_TURNS).iter().any(|turn| {
        let normalized = keywords::normalize(&turn.content);
        OrderSignals::detect(&turn.content).any()
            || keywords::matches(&normalized, KeywordSet::OrderContext)
            || mentions_catalog_item(&normalized, catalog_items)
    })
}

/// Rule-based classifier; the first matching rule wins:
/// order, wish, staff question, feedback, general.
#[derive(Clone)]
pub struct IntentClassifier {
    extractor: OrderExtractor,
    pricing: PriceCalculator,
    clock: Arc<dyn Clock>,
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }
}

impl IntentClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// The clock stamps the current message when it joins the history for
    /// extraction.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { extractor: OrderExtractor::new(), pricing: PriceCalculator::new(), clock }
    }

    /// `history` holds the turns before `user_message`.
    pub fn classify(
        &self,
        user_message: &str,
        model_reply: &str,
        history: &[ConversationTurn],
        catalog_items: &[CatalogItem],
    ) -> Intent {
        let normalized = keywords::normalize(user_message);
        let signals = OrderSignals::detect(user_message);

        if signals.any() {
            let lookback = user_tail(history, ORDER_LOOKBACK_TURNS - 1);
            let catalog_mentioned = mentions_catalog_item(&normalized, catalog_items)
                || lookback.iter().any(|turn| {
                    mentions_catalog_item(&keywords::normalize(&turn.content), catalog_items)
                });

            if signals.order_keyword || catalog_mentioned {
                return self.order_intent(user_message, &signals, history, &lookback, catalog_items);
            }
        }

        if keywords::matches(&normalized, KeywordSet::Advice) {
            return Intent::Wish {
                confidence: WISH_CONFIDENCE,
                products: bold_products(model_reply, catalog_items),
            };
        }

        if keywords::matches(&normalized, KeywordSet::StaffQuestion) {
            let deferred = keywords::matches(&keywords::normalize(model_reply), KeywordSet::Deferral);
            let confidence =
                if deferred { STAFF_DEFERRED_CONFIDENCE } else { STAFF_ANSWERED_CONFIDENCE };
            return Intent::StaffQuestion { confidence, deferred };
        }

        if keywords::matches(&normalized, KeywordSet::Feedback) {
            return Intent::Feedback { confidence: FEEDBACK_CONFIDENCE };
        }

        Intent::General
    }

    fn order_intent(
        &self,
        user_message: &str,
        signals: &OrderSignals,
        history: &[ConversationTurn],
        lookback: &[&ConversationTurn],
        catalog_items: &[CatalogItem],
    ) -> Intent {
        // Scattered checkouts put the keyword and the contact details in
        // different messages, so both are scored over the recent user turns.
        let recent_user = lookback.iter().map(|turn| {
            let signals = OrderSignals::detect(&turn.content);
            (signals.order_keyword, signals.contact)
        });
        let (order_keyword, contact) = recent_user.fold(
            (signals.order_keyword, signals.contact),
            |(keyword, contact), (turn_keyword, turn_contact)| {
                (keyword || turn_keyword, contact || turn_contact)
            },
        );
        let confidence = match (order_keyword, contact) {
            (true, true) => ORDER_WITH_CONTACT_CONFIDENCE,
            (true, false) => ORDER_KEYWORD_CONFIDENCE,
            _ => ORDER_INFERRED_CONFIDENCE,
        };

        let mut turns = history.to_vec();
        turns.push(ConversationTurn::user(user_message, self.clock.now()));
        let order = self.extractor.extract(&turns, catalog_items);
        let total = match (order.products.first(), order.quantity_number) {
            (Some(product), Some(quantity)) => self.pricing.total(product, quantity, catalog_items),
            _ => None,
        };

        Intent::Order { confidence, order, total }
    }
}

fn mentions_catalog_item(normalized_text: &str, catalog_items: &[CatalogItem]) -> bool {
    catalog_items.iter().any(|item| mentions(normalized_text, &item.name))
}

/// `**bold**` names from the reply, resolved against the catalog when one is
/// available.
fn bold_products(model_reply: &str, catalog_items: &[CatalogItem]) -> Vec<String> {
    let mut products: Vec<String> = Vec::new();
    for caps in BOLD.captures_iter(model_reply) {
        let Some(raw) = caps.get(1).map(|m| m.as_str().trim()) else {
            continue;
        };
        let resolved = if catalog_items.is_empty() {
            Some(raw.to_string())
        } else {
            find_item(catalog_items, raw).map(|item| item.name.clone())
        };
        if let Some(name) = resolved {
            if !name.is_empty() && !products.contains(&name) {
                products.push(name);
            }
        }
    }
    products
}
