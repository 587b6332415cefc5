use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::order::{OrderInfo, OrderTotal};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Order,
    Wish,
    Feedback,
    StaffQuestion,
    General,
}

impl IntentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Order => "order",
            Self::Wish => "wish",
            Self::Feedback => "feedback",
            Self::StaffQuestion => "staff_question",
            Self::General => "general",
        }
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification result with a kind-specific payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Intent {
    Order { confidence: f32, order: OrderInfo, total: Option<OrderTotal> },
    Wish { confidence: f32, products: Vec<String> },
    StaffQuestion { confidence: f32, deferred: bool },
    Feedback { confidence: f32 },
    General,
}

impl Intent {
    pub fn kind(&self) -> IntentKind {
        match self {
            Self::Order { .. } => IntentKind::Order,
            Self::Wish { .. } => IntentKind::Wish,
            Self::StaffQuestion { .. } => IntentKind::StaffQuestion,
            Self::Feedback { .. } => IntentKind::Feedback,
            Self::General => IntentKind::General,
        }
    }

    pub fn confidence(&self) -> f32 {
        match self {
            Self::Order { confidence, .. }
            | Self::Wish { confidence, .. }
            | Self::StaffQuestion { confidence, .. }
            | Self::Feedback { confidence } => *confidence,
            Self::General => 0.0,
        }
    }

    /// Staff questions only reach a human when the assistant deferred.
    pub fn should_notify(&self) -> bool {
        match self {
            Self::Order { .. } | Self::Wish { .. } | Self::Feedback { .. } => true,
            Self::StaffQuestion { deferred, .. } => *deferred,
            Self::General => false,
        }
    }
}
