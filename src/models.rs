//! Order and Asset records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflow::OrderStatus;

pub type OrderId = u64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub product: String,
    pub color: String,
    pub size: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn new(id: OrderId, product: &str, color: &str, size: &str) -> Self {
        Self {
            id,
            product: product.to_string(),
            color: color.to_string(),
            size: size.to_string(),
            status: OrderStatus::Created,
            created_at: Utc::now(),
        }
    }
}

/// Generated artifacts for one order. `mockup_url` stays empty until a
/// generation step succeeds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: u64,
    pub order_id: OrderId,
    #[serde(default)]
    pub logo_url: String,
    #[serde(default)]
    pub mockup_url: String,
    #[serde(default)]
    pub ai_generated: bool,
    #[serde(default)]
    pub ai_prompt: String,
}

impl Asset {
    pub fn has_mockup(&self) -> bool {
        !self.mockup_url.is_empty()
    }
}

/// Order intake payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub product: String,
    pub color: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub logo_url: Option<String>,
}
