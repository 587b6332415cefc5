//! Staff notification events and the relay seam they are handed to.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::intent::{Intent, IntentKind};
use crate::domain::order::ContactInfo;
use crate::errors::{with_timeout, UpstreamError};

pub const SIGNATURE_HEADER: &str = "X-Budtender-Signature";
pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationMetadata {
    pub user_id: String,
    pub conversation_id: String,
    pub confidence: f32,
    pub language: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    #[serde(rename = "type")]
    pub kind: IntentKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_info: Option<ContactInfo>,
    pub metadata: NotificationMetadata,
}

/// Best-effort delivery channel towards staff.
#[async_trait]
pub trait NotificationRelay: Send + Sync {
    async fn deliver(&self, event: &NotificationEvent) -> Result<(), UpstreamError>;
}

/// Relay used when no webhook is configured: events only reach the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogRelay;

#[async_trait]
impl NotificationRelay for LogRelay {
    async fn deliver(&self, event: &NotificationEvent) -> Result<(), UpstreamError> {
        info!(
            event_name = "relay.logged",
            kind = %event.kind,
            user_id = %event.metadata.user_id,
            conversation_id = %event.metadata.conversation_id,
            "notification recorded without relay"
        );
        Ok(())
    }
}

/// Builds the event for `intent`, or `None` when the intent does not notify.
///
/// Absent order fields are left out of the event rather than defaulted.
pub fn assemble(
    intent: &Intent,
    message: &str,
    metadata: NotificationMetadata,
) -> Option<NotificationEvent> {
    if !intent.should_notify() {
        return None;
    }

    let mut event = NotificationEvent {
        kind: intent.kind(),
        message: message.to_string(),
        products: None,
        quantity: None,
        total_amount: None,
        breakdown: None,
        contact_info: None,
        metadata: NotificationMetadata { confidence: intent.confidence(), ..metadata },
    };

    match intent {
        Intent::Order { order, total, .. } => {
            if !order.products.is_empty() {
                event.products = Some(order.products.clone());
            }
            event.quantity = order.quantity.clone();
            if let Some(total) = total {
                event.total_amount = Some(total.amount);
                event.breakdown = Some(total.breakdown.clone());
            }
            if !order.contact_info.is_empty() {
                event.contact_info = Some(order.contact_info.clone());
            }
        }
        Intent::Wish { products, .. } if !products.is_empty() => {
            event.products = Some(products.clone());
        }
        _ => {}
    }

    Some(event)
}

/// Fire-and-forget delivery on a background task. Failures and timeouts are
/// logged, never retried.
pub fn dispatch(
    relay: Arc<dyn NotificationRelay>,
    event: NotificationEvent,
    timeout: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match with_timeout("relay", timeout, relay.deliver(&event)).await {
            Ok(()) => debug!(
                event_name = "relay.delivery.completed",
                kind = %event.kind,
                conversation_id = %event.metadata.conversation_id,
                "notification delivered"
            ),
            Err(error) => warn!(
                event_name = "relay.delivery.failed",
                kind = %event.kind,
                conversation_id = %event.metadata.conversation_id,
                error = %error,
                "notification dropped"
            ),
        }
    })
}

/// `sha256=<hex>` HMAC of `body` under `secret`.
pub fn sign_payload(secret: &[u8], body: &[u8]) -> String {
    type HmacSha256 = Hmac<Sha256>;
    // HMAC accepts keys of any length.
    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(body);
    let digest = mac.finalize().into_bytes();
    let hex = digest.iter().map(|byte| format!("{byte:02x}")).collect::<String>();
    format!("sha256={hex}")
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::{assemble, dispatch, sign_payload, NotificationEvent, NotificationMetadata, NotificationRelay};
    use crate::domain::intent::Intent;
    use crate::domain::order::{ContactInfo, OrderInfo, OrderTotal, PriceTier};
    use crate::errors::UpstreamError;

    fn metadata() -> NotificationMetadata {
        NotificationMetadata {
            user_id: "u-1".to_string(),
            conversation_id: "c-1".to_string(),
            confidence: 0.0,
            language: "en".to_string(),
            timestamp: Utc::now(),
        }
    }

    fn order_intent() -> Intent {
        Intent::Order {
            confidence: 0.95,
            order: OrderInfo {
                products: vec!["Northern Lights".to_string()],
                quantity: Some("20g".to_string()),
                quantity_number: Some(Decimal::from(20)),
                contact_info: ContactInfo {
                    phone: Some("+66812345678".to_string()),
                    ..ContactInfo::default()
                },
                confidence: 0.9,
            },
            total: Some(OrderTotal {
                product: "Northern Lights".to_string(),
                tier: PriceTier::Per20g,
                unit_price: Decimal::from(400),
                quantity: Decimal::from(20),
                amount: Decimal::from(8000),
                breakdown: "20 × 400 = 8000".to_string(),
            }),
        }
    }

    #[test]
    fn order_event_carries_total_and_contact() {
        let event = assemble(&order_intent(), "20g please", metadata()).expect("order notifies");
        let json = serde_json::to_value(&event).expect("serialize");

        assert_eq!(json["type"], "order");
        assert_eq!(json["breakdown"], "20 × 400 = 8000");
        assert_eq!(json["contactInfo"]["phone"], "+66812345678");
        assert_eq!(json["metadata"]["conversationId"], "c-1");
        assert!((event.metadata.confidence - 0.95).abs() < f32::EPSILON);
    }

    #[test]
    fn absent_fields_are_omitted() {
        let event = assemble(&Intent::Feedback { confidence: 0.7 }, "thanks!", metadata())
            .expect("feedback notifies");
        let json = serde_json::to_value(&event).expect("serialize");

        assert!(json.get("products").is_none());
        assert!(json.get("totalAmount").is_none());
        assert!(json.get("contactInfo").is_none());
    }

    #[test]
    fn silent_intents_produce_no_event() {
        assert!(assemble(&Intent::General, "hi", metadata()).is_none());
        let answered = Intent::StaffQuestion { confidence: 0.4, deferred: false };
        assert!(assemble(&answered, "where are you?", metadata()).is_none());
    }

    #[test]
    fn signature_is_stable_hex() {
        let first = sign_payload(b"secret", b"{\"type\":\"order\"}");
        let second = sign_payload(b"secret", b"{\"type\":\"order\"}");
        let other = sign_payload(b"other", b"{\"type\":\"order\"}");

        assert!(first.starts_with("sha256="));
        assert_eq!(first.len(), "sha256=".len() + 64);
        assert_eq!(first, second);
        assert_ne!(first, other);
    }

    struct SlowRelay {
        delivered: Mutex<Vec<NotificationEvent>>,
    }

    #[async_trait]
    impl NotificationRelay for SlowRelay {
        async fn deliver(&self, event: &NotificationEvent) -> Result<(), UpstreamError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            self.delivered.lock().expect("lock").push(event.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn dispatch_gives_up_after_timeout() {
        let relay = Arc::new(SlowRelay { delivered: Mutex::new(Vec::new()) });
        let event = assemble(&order_intent(), "order", metadata()).expect("event");

        dispatch(relay.clone(), event, Duration::from_millis(20)).await.expect("task completes");

        assert!(relay.delivered.lock().expect("lock").is_empty());
    }
}
