//! Offline decision run over a saved transcript: classify the last user
//! message, extract the order and price it. No model or network is involved.

use std::fs;
use std::path::Path;

use budtender_agent::{IntentClassifier, OrderExtractor};
use budtender_core::domain::catalog::CatalogItem;
use budtender_core::domain::conversation::{ConversationTurn, Role};
use budtender_core::language::Language;
use budtender_core::pricing::PriceCalculator;
use budtender_db::{parse_catalog_json, CatalogSeedDataset};
use chrono::{Duration, TimeZone, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::commands::{CommandResult, Failure, EXIT_INPUT};

#[derive(Debug, Deserialize)]
pub struct TranscriptTurn {
    pub role: Role,
    pub content: String,
}

pub fn run(catalog: Option<&Path>, transcript: &Path) -> CommandResult {
    let result = load_catalog(catalog).and_then(|items| {
        let turns = load_transcript(transcript)?;
        classify_transcript(&turns, &items)
    });

    match result {
        Ok(data) => {
            let message = format!("classified as {}", data["intent"]["kind"].as_str().unwrap_or("general"));
            CommandResult::success_with_data("classify", message, Some(data))
        }
        Err(failure) => CommandResult::from_failure("classify", failure),
    }
}

/// The last user turn is the message; an assistant turn after it is the
/// model reply; everything before it is history.
pub(crate) fn classify_transcript(
    turns: &[TranscriptTurn],
    catalog_items: &[CatalogItem],
) -> Result<serde_json::Value, Failure> {
    let Some(message_index) = turns.iter().rposition(|turn| turn.role == Role::User) else {
        return Err(("transcript_parse", "transcript has no user turn".to_string(), EXIT_INPUT));
    };

    // Synthetic one-minute spacing keeps turn order stable for window math.
    let start = Utc.timestamp_opt(0, 0).single().unwrap_or_else(Utc::now);
    let history = turns[..message_index]
        .iter()
        .enumerate()
        .map(|(offset, turn)| {
            ConversationTurn::new(turn.role, turn.content.clone(), start + Duration::minutes(offset as i64))
        })
        .collect::<Vec<_>>();
    let message = turns[message_index].content.as_str();
    let model_reply = turns[message_index + 1..]
        .iter()
        .find(|turn| turn.role == Role::Assistant)
        .map(|turn| turn.content.as_str())
        .unwrap_or_default();

    let intent = IntentClassifier::new().classify(message, model_reply, &history, catalog_items);

    let mut all_turns = history;
    all_turns.push(ConversationTurn::user(message, start + Duration::minutes(message_index as i64)));
    let order = OrderExtractor::new().extract(&all_turns, catalog_items);
    let total = match (order.products.first(), order.quantity_number) {
        (Some(product), Some(quantity)) => PriceCalculator::new().total(product, quantity, catalog_items),
        _ => None,
    };

    Ok(json!({
        "intent": intent,
        "language": Language::detect(message).as_str(),
        "order": order,
        "total": total,
    }))
}

fn load_catalog(catalog: Option<&Path>) -> Result<Vec<CatalogItem>, Failure> {
    let Some(path) = catalog else {
        return CatalogSeedDataset::items()
            .map_err(|error| ("catalog_parse", error.to_string(), EXIT_INPUT));
    };
    let raw = read(path, "catalog_read")?;
    parse_catalog_json(&raw).map_err(|error| ("catalog_parse", error.to_string(), EXIT_INPUT))
}

fn load_transcript(path: &Path) -> Result<Vec<TranscriptTurn>, Failure> {
    let raw = read(path, "transcript_read")?;
    serde_json::from_str(&raw).map_err(|error| {
        ("transcript_parse", format!("transcript json: {error}"), EXIT_INPUT)
    })
}

fn read(path: &Path, error_class: &'static str) -> Result<String, Failure> {
    fs::read_to_string(path).map_err(|error| {
        (error_class, format!("could not read `{}`: {error}", path.display()), EXIT_INPUT)
    })
}
