//! Order extraction from the trailing turns of a conversation.
//!
//! Windows, newest last:
//! - everything: the last [`DECISION_WINDOW`] turns;
//! - contact fields: the last 3 user turns;
//! - quantity: the last 4 user turns;
//! - order context: the last 4 turns;
//! - order-context product search: the last 3 turns, either role.

use std::collections::HashMap;
use std::str::FromStr;

use budtender_core::domain::catalog::CatalogItem;
use budtender_core::domain::conversation::{tail, user_tail, ConversationTurn, DECISION_WINDOW};
use budtender_core::domain::order::{ContactInfo, OrderInfo};
use budtender_core::patterns::find_phone;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

use crate::keywords::{self, KeywordSet};

const CONTACT_USER_TURNS: usize = 3;
const CONTEXT_TURNS: usize = 4;
const PRODUCT_TURNS: usize = 3;
const MAX_FALLBACK_PRODUCTS: usize = 3;

/// Larger quantities are treated as noise rather than an order.
const MAX_QUANTITY: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

static NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i:my name is|name\s*[:\-]|меня зовут|имя\s*[:\-]?|ชื่อ)\s*(\p{Lu}[\p{L}'\-]*(?:[ \t]+\p{Lu}[\p{L}'\-]*)?)",
    )
    .expect("name pattern is valid")
});

static ADDRESS_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:address|адрес|ที่อยู่)\s*[:\-]?\s*(.+)").expect("address label pattern is valid")
});

static LODGING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:hotel|villa|resort|bungalow|guesthouse|condo|отель|гостиниц|вилл|โรงแรม).*")
        .expect("lodging pattern is valid")
});

static ROOM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:room|rm\.?|номер|комнат[аеу]?|ห้อง)\s*#?\s*(\d{1,5})")
        .expect("room pattern is valid")
});

static QUANTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*(?:grams?|gr|g|грамм\w*|гр|г|กรัม)\b")
        .expect("quantity pattern is valid")
});

#[derive(Clone, Debug, Default)]
pub struct OrderExtractor;

impl OrderExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Missing fields stay `None`; nothing here fails.
    pub fn extract(&self, history: &[ConversationTurn], catalog_items: &[CatalogItem]) -> OrderInfo {
        let window = tail(history, DECISION_WINDOW);
        let contact_info = extract_contact(window);
        let (quantity, quantity_number) = extract_quantity(user_tail(window, CONTEXT_TURNS))
            .map_or((None, None), |(raw, number)| (Some(raw), Some(number)));
        let (products, confidence) = resolve_products(window, catalog_items);

        OrderInfo { products, quantity, quantity_number, contact_info, confidence }
    }
}

fn extract_contact(window: &[ConversationTurn]) -> ContactInfo {
    let recent = user_tail(window, CONTACT_USER_TURNS);
    let newest_first = || recent.iter().rev().map(|turn| turn.content.as_str());

    ContactInfo {
        name: newest_first().find_map(extract_name),
        phone: newest_first().find_map(|text| find_phone(text).map(str::to_string)),
        address: newest_first().find_map(extract_address),
        room: newest_first().find_map(|text| {
            ROOM.captures(text).and_then(|caps| caps.get(1)).map(|m| m.as_str().to_string())
        }),
        payment_method: newest_first()
            .find_map(|text| keywords::payment_method(&keywords::normalize(text))),
    }
}

fn extract_name(text: &str) -> Option<String> {
    NAME.captures(text).and_then(|caps| caps.get(1)).map(|m| m.as_str().trim().to_string())
}

fn extract_address(text: &str) -> Option<String> {
    let labelled = ADDRESS_LABEL.captures(text).and_then(|caps| caps.get(1)).map(|m| m.as_str());
    let raw = labelled.or_else(|| LODGING.find(text).map(|m| m.as_str()))?;
    let cleaned = raw.trim().trim_end_matches(['.', ',', ';', '!']).trim();
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

/// First `<number><unit>` in chronological order whose number is positive
/// and at most [`MAX_QUANTITY`].
fn extract_quantity(turns: Vec<&ConversationTurn>) -> Option<(String, Decimal)> {
    turns.into_iter().find_map(|turn| {
        QUANTITY.captures_iter(&turn.content).find_map(|caps| {
            let raw = caps.get(0)?.as_str().trim().to_string();
            let number = Decimal::from_str(&caps.get(1)?.as_str().replace(',', ".")).ok()?;
            (number > Decimal::ZERO && number <= MAX_QUANTITY).then_some((raw, number))
        })
    })
}

fn resolve_products(window: &[ConversationTurn], catalog_items: &[CatalogItem]) -> (Vec<String>, f32) {
    let has_order_context = tail(window, CONTEXT_TURNS).iter().any(|turn| {
        let normalized = keywords::normalize(&turn.content);
        keywords::matches(&normalized, KeywordSet::Order)
            || keywords::matches(&normalized, KeywordSet::OrderContext)
    });

    if has_order_context {
        let narrowed = products_in(tail(window, PRODUCT_TURNS).iter(), catalog_items);
        if !narrowed.is_empty() {
            return (narrowed, 0.90);
        }
    }

    let frequent = most_mentioned(window, catalog_items);
    if frequent.is_empty() {
        return (Vec::new(), 0.0);
    }
    let confidence = if has_order_context { 0.75 } else { 0.50 };
    (frequent, confidence)
}

/// Catalog names mentioned in `turns`, in catalog order.
fn products_in<'a>(
    turns: impl Iterator<Item = &'a ConversationTurn>,
    catalog_items: &[CatalogItem],
) -> Vec<String> {
    let texts = turns.map(|turn| keywords::normalize(&turn.content)).collect::<Vec<_>>();
    catalog_items
        .iter()
        .filter(|item| texts.iter().any(|text| mentions(text, &item.name)))
        .map(|item| item.name.clone())
        .collect()
}

/// Up to three items by mention count, ties going to the most recent mention.
fn most_mentioned(window: &[ConversationTurn], catalog_items: &[CatalogItem]) -> Vec<String> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (position, turn) in window.iter().enumerate() {
        let text = keywords::normalize(&turn.content);
        for item in catalog_items {
            if mentions(&text, &item.name) {
                let entry = counts.entry(item.name.as_str()).or_insert((0, position));
                entry.0 += 1;
                entry.1 = position;
            }
        }
    }

    let mut ranked = counts.into_iter().collect::<Vec<_>>();
    ranked.sort_by(|(left_name, left), (right_name, right)| {
        right.0.cmp(&left.0).then(right.1.cmp(&left.1)).then(left_name.cmp(right_name))
    });
    ranked.into_iter().take(MAX_FALLBACK_PRODUCTS).map(|(name, _)| name.to_string()).collect()
}

/// Whole-name mention: the name must not be glued to surrounding letters or
/// digits.
pub(crate) fn mentions(normalized_text: &str, name: &str) -> bool {
    let needle = name.trim().to_lowercase();
    if needle.is_empty() {
        return false;
    }
    normalized_text.match_indices(&needle).any(|(start, matched)| {
        let before = normalized_text[..start].chars().next_back();
        let after = normalized_text[start + matched.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}
