use budtender_agent::{IntentClassifier, OrderExtractor};
use budtender_core::domain::conversation::ConversationTurn;
use budtender_core::domain::intent::{Intent, IntentKind};
use budtender_db::CatalogSeedDataset;
use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;

const SCATTERED_CHECKOUT: [&str; 5] =
    ["I want Northern Lights", "20g", "+66812345678", "Hotel Y room 12", "cash"];

fn user_turns(texts: &[&str]) -> Vec<ConversationTurn> {
    let start = Utc.with_ymd_and_hms(2026, 3, 1, 18, 0, 0).single().expect("valid date");
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| ConversationTurn::user(*text, start + Duration::seconds(i as i64 * 30)))
        .collect()
}

#[test]
fn scattered_checkout_extracts_every_detail() {
    let catalog = CatalogSeedDataset::items().expect("demo catalog");

    let order = OrderExtractor::new().extract(&user_turns(&SCATTERED_CHECKOUT), &catalog);

    assert_eq!(order.products, vec!["Northern Lights"]);
    assert_eq!(order.quantity_number, Some(Decimal::from(20)));
    assert_eq!(order.contact_info.phone.as_deref(), Some("+66812345678"));
    assert!(order
        .contact_info
        .address
        .as_deref()
        .is_some_and(|address| address.contains("Hotel Y")));
}

#[test]
fn scattered_checkout_classifies_as_priced_order() {
    let catalog = CatalogSeedDataset::items().expect("demo catalog");
    let turns = user_turns(&SCATTERED_CHECKOUT);
    let (history, current) = turns.split_at(turns.len() - 1);

    let intent = IntentClassifier::new().classify(
        &current[0].content,
        "Thank you! Your order is on its way.",
        history,
        &catalog,
    );

    assert_eq!(intent.kind(), IntentKind::Order);
    assert!(intent.confidence() >= 0.90);
    let Intent::Order { total, .. } = intent else {
        panic!("expected order intent");
    };
    let total = total.expect("order should be priced");
    assert_eq!(total.amount, Decimal::from(8000));
    assert_eq!(total.breakdown, "20 × 400 = 8000");
}
