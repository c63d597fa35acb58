//! Order Workflow - Linear State Machine
//!
//! CREATED -> MOCKUP_GENERATED -> APPROVED -> READY_FOR_FULFILLMENT
//!
//! Transitions are looked up by the order's *current* status. A retried
//! transition whose target has already been reached fails; callers reload the
//! order before retrying.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::models::Order;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Created,
    MockupGenerated,
    Approved,
    ReadyForFulfillment,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Created,
        OrderStatus::MockupGenerated,
        OrderStatus::Approved,
        OrderStatus::ReadyForFulfillment,
    ];

    /// The only status reachable from `self`, if any.
    pub fn successor(self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Created => Some(OrderStatus::MockupGenerated),
            OrderStatus::MockupGenerated => Some(OrderStatus::Approved),
            OrderStatus::Approved => Some(OrderStatus::ReadyForFulfillment),
            OrderStatus::ReadyForFulfillment => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.successor().is_none()
    }

    pub fn can_transition_to(self, target: OrderStatus) -> bool {
        self.successor() == Some(target)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Created => "CREATED",
            OrderStatus::MockupGenerated => "MOCKUP_GENERATED",
            OrderStatus::Approved => "APPROVED",
            OrderStatus::ReadyForFulfillment => "READY_FOR_FULFILLMENT",
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        Self::Created
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| WorkflowError::UnknownStatus(s.to_string()))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Unknown order status: {0}")]
    UnknownStatus(String),
}

/// Move `order` to `target` if it is the permitted successor of its current
/// status. On failure the order is left untouched.
pub fn transition(order: &mut Order, target: OrderStatus) -> Result<(), WorkflowError> {
    let from = order.status;
    if !from.can_transition_to(target) {
        return Err(WorkflowError::InvalidTransition { from, to: target });
    }

    order.status = target;
    info!(order_id = order.id, %from, to = %target, "order status advanced");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_in(status: OrderStatus) -> Order {
        Order {
            status,
            ..Order::new(7, "Hoodie", "black", "M")
        }
    }

    #[test]
    fn test_full_chain_advances() {
        let mut order = order_in(OrderStatus::Created);
        transition(&mut order, OrderStatus::MockupGenerated).unwrap();
        transition(&mut order, OrderStatus::Approved).unwrap();
        transition(&mut order, OrderStatus::ReadyForFulfillment).unwrap();
        assert!(order.status.is_terminal());
    }

    #[test]
    fn test_only_successor_is_accepted() {
        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                let mut order = order_in(from);
                let result = transition(&mut order, to);
                if from.successor() == Some(to) {
                    assert!(result.is_ok(), "{from} -> {to} should succeed");
                    assert_eq!(order.status, to);
                } else {
                    assert_eq!(result, Err(WorkflowError::InvalidTransition { from, to }));
                    assert_eq!(order.status, from, "failed transition must not mutate");
                }
            }
        }
    }

    #[test]
    fn test_approved_rejects_regression_and_self() {
        let mut order = order_in(OrderStatus::Approved);
        assert!(transition(&mut order, OrderStatus::Created).is_err());
        assert!(transition(&mut order, OrderStatus::Approved).is_err());
        assert!(transition(&mut order, OrderStatus::ReadyForFulfillment).is_ok());
    }

    #[test]
    fn test_repeated_transition_fails() {
        let mut order = order_in(OrderStatus::MockupGenerated);
        transition(&mut order, OrderStatus::Approved).unwrap();
        let err = transition(&mut order, OrderStatus::Approved).unwrap_err();
        assert_eq!(err.to_string(), "Invalid state transition from APPROVED to APPROVED");
    }

    #[test]
    fn test_status_parses_wire_names() {
        assert_eq!("MOCKUP_GENERATED".parse::<OrderStatus>(), Ok(OrderStatus::MockupGenerated));
        assert_eq!("ready_for_fulfillment".parse::<OrderStatus>(), Ok(OrderStatus::ReadyForFulfillment));
        assert!("SHIPPED".parse::<OrderStatus>().is_err());

        let json = serde_json::to_string(&OrderStatus::ReadyForFulfillment).unwrap();
        assert_eq!(json, r#""READY_FOR_FULFILLMENT""#);
    }
}
