//! Order status lifecycle and payment method enums.
//!
//! Eight statuses form the sequential "happy path" that progress timelines
//! render. Three more (`cancelled`, `returned`, `refunded`) are side states
//! with no position in that sequence.
//!
//! There is no transition guard. An admin may move any order from any status
//! to any other, including backwards (`delivered` → `pending`).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a status or payment method string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind}: {value}")]
pub struct ParseEnumError {
    /// Which enum was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// Order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Placed, not yet confirmed.
    Pending,
    /// Confirmed by the platform. Also the fallback for unknown wire values.
    #[default]
    OrderConfirmed,
    /// Payment and routing in progress.
    Processing,
    /// Items are being prepared.
    Preparing,
    /// Items packed and waiting for pickup.
    Packed,
    /// Handed to the carrier.
    Shipped,
    /// With a rider for the last leg.
    OutForDelivery,
    /// Delivered to the customer.
    Delivered,
    /// Cancelled before delivery.
    Cancelled,
    /// Returned by the customer.
    Returned,
    /// Payment refunded.
    Refunded,
}

impl OrderStatus {
    /// The sequential happy path, in order.
    pub const HAPPY_PATH: [Self; 8] = [
        Self::Pending,
        Self::OrderConfirmed,
        Self::Processing,
        Self::Preparing,
        Self::Packed,
        Self::Shipped,
        Self::OutForDelivery,
        Self::Delivered,
    ];

    /// Statuses outside the happy path.
    pub const SIDE_STATES: [Self; 3] = [Self::Cancelled, Self::Returned, Self::Refunded];

    /// Every status, happy path first.
    pub const ALL: [Self; 11] = [
        Self::Pending,
        Self::OrderConfirmed,
        Self::Processing,
        Self::Preparing,
        Self::Packed,
        Self::Shipped,
        Self::OutForDelivery,
        Self::Delivered,
        Self::Cancelled,
        Self::Returned,
        Self::Refunded,
    ];

    /// Wire name (snake_case) as used by the backend.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::OrderConfirmed => "order_confirmed",
            Self::Processing => "processing",
            Self::Preparing => "preparing",
            Self::Packed => "packed",
            Self::Shipped => "shipped",
            Self::OutForDelivery => "out_for_delivery",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Returned => "returned",
            Self::Refunded => "refunded",
        }
    }

    /// 0-based index within the happy path, or `None` for side states.
    ///
    /// Timelines render nothing when this returns `None`.
    #[must_use]
    pub fn position_in_sequence(self) -> Option<usize> {
        Self::HAPPY_PATH.iter().position(|s| *s == self)
    }

    /// Whether `self` comes strictly before `reference` on the happy path.
    ///
    /// Always false when either status is a side state.
    #[must_use]
    pub fn is_completed_relative_to(self, reference: Self) -> bool {
        match (self.position_in_sequence(), reference.position_in_sequence()) {
            (Some(a), Some(b)) => a < b,
            _ => false,
        }
    }

    /// Whether this status is one of the side states.
    #[must_use]
    pub fn is_side_state(self) -> bool {
        self.position_in_sequence().is_none()
    }

    /// Whether the order still needs work (anything but delivered or cancelled).
    #[must_use]
    pub const fn is_pending_work(self) -> bool {
        !matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Admin overrides are unconstrained: every transition is allowed.
    #[must_use]
    pub const fn can_transition_to(self, _next: Self) -> bool {
        true
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::OrderConfirmed => write!(f, "Order Confirmed"),
            Self::Processing => write!(f, "Processing"),
            Self::Preparing => write!(f, "Preparing"),
            Self::Packed => write!(f, "Packed"),
            Self::Shipped => write!(f, "Shipped"),
            Self::OutForDelivery => write!(f, "Out for Delivery"),
            Self::Delivered => write!(f, "Delivered"),
            Self::Cancelled => write!(f, "Cancelled"),
            Self::Returned => write!(f, "Returned"),
            Self::Refunded => write!(f, "Refunded"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = ParseEnumError;

    /// Accepts wire names plus the spaced or hyphenated spellings some
    /// backend versions emit (`"Out for delivery"`, `"out-for-delivery"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "pending" => Ok(Self::Pending),
            "order_confirmed" | "confirmed" => Ok(Self::OrderConfirmed),
            "processing" => Ok(Self::Processing),
            "preparing" => Ok(Self::Preparing),
            "packed" => Ok(Self::Packed),
            "shipped" => Ok(Self::Shipped),
            "out_for_delivery" => Ok(Self::OutForDelivery),
            "delivered" => Ok(Self::Delivered),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            "returned" => Ok(Self::Returned),
            "refunded" => Ok(Self::Refunded),
            _ => Err(ParseEnumError {
                kind: "order status",
                value: s.to_string(),
            }),
        }
    }
}

/// State of one step in a progress timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Completed,
    Current,
    Upcoming,
}

/// One step of a rendered progress timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimelineStep {
    pub status: OrderStatus,
    pub state: StepState,
}

/// Build the happy-path progress timeline for an order in `current` status.
///
/// Returns `None` for side states, which have no timeline.
#[must_use]
pub fn progress_timeline(current: OrderStatus) -> Option<Vec<TimelineStep>> {
    current.position_in_sequence()?;
    Some(
        OrderStatus::HAPPY_PATH
            .iter()
            .map(|&status| {
                let state = if status == current {
                    StepState::Current
                } else if status.is_completed_relative_to(current) {
                    StepState::Completed
                } else {
                    StepState::Upcoming
                };
                TimelineStep { status, state }
            })
            .collect(),
    )
}

/// Payment method recorded on an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash on delivery. Fallback when the backend omits the field.
    #[default]
    Cash,
    Wallet,
    Card,
    Upi,
}

impl PaymentMethod {
    /// Wire name as used by the backend.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Wallet => "wallet",
            Self::Card => "card",
            Self::Upi => "upi",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cash => write!(f, "Cash"),
            Self::Wallet => write!(f, "Wallet"),
            Self::Card => write!(f, "Card"),
            Self::Upi => write!(f, "UPI"),
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" | "cod" => Ok(Self::Cash),
            "wallet" => Ok(Self::Wallet),
            "card" => Ok(Self::Card),
            "upi" => Ok(Self::Upi),
            _ => Err(ParseEnumError {
                kind: "payment method",
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_position_in_sequence() {
        assert_eq!(OrderStatus::Pending.position_in_sequence(), Some(0));
        assert_eq!(OrderStatus::Packed.position_in_sequence(), Some(4));
        assert_eq!(OrderStatus::Delivered.position_in_sequence(), Some(7));
        assert_eq!(OrderStatus::Refunded.position_in_sequence(), None);
        assert_eq!(OrderStatus::Cancelled.position_in_sequence(), None);
        assert_eq!(OrderStatus::Returned.position_in_sequence(), None);
    }

    #[test]
    fn test_is_completed_relative_to() {
        assert!(OrderStatus::Packed.is_completed_relative_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Shipped.is_completed_relative_to(OrderStatus::Packed));
        assert!(!OrderStatus::Packed.is_completed_relative_to(OrderStatus::Packed));
        assert!(!OrderStatus::Pending.is_completed_relative_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Refunded.is_completed_relative_to(OrderStatus::Delivered));
    }

    #[test]
    fn test_every_transition_allowed() {
        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                assert!(from.can_transition_to(to));
            }
        }
    }

    #[test]
    fn test_parse_roundtrips_wire_names() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_parse_lenient_spellings() {
        assert_eq!(
            "Out for delivery".parse::<OrderStatus>().unwrap(),
            OrderStatus::OutForDelivery
        );
        assert_eq!(
            "out-for-delivery".parse::<OrderStatus>().unwrap(),
            OrderStatus::OutForDelivery
        );
        assert_eq!("CANCELED".parse::<OrderStatus>().unwrap(), OrderStatus::Cancelled);
        assert!("teleported".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&OrderStatus::OutForDelivery).unwrap();
        assert_eq!(json, "\"out_for_delivery\"");
    }

    #[test]
    fn test_progress_timeline_marks_steps() {
        let steps = progress_timeline(OrderStatus::Packed).unwrap();
        assert_eq!(steps.len(), 8);
        let states: Vec<StepState> = steps.iter().map(|s| s.state).collect();
        assert_eq!(&states[..4], &[StepState::Completed; 4]);
        assert_eq!(states[4], StepState::Current);
        assert_eq!(&states[5..], &[StepState::Upcoming; 3]);
    }

    #[test]
    fn test_progress_timeline_side_state_renders_nothing() {
        assert!(progress_timeline(OrderStatus::Refunded).is_none());
    }

    #[test]
    fn test_payment_method_parse_and_display() {
        assert_eq!("UPI".parse::<PaymentMethod>().unwrap(), PaymentMethod::Upi);
        assert_eq!("cod".parse::<PaymentMethod>().unwrap(), PaymentMethod::Cash);
        assert!("barter".parse::<PaymentMethod>().is_err());
        assert_eq!(PaymentMethod::Upi.to_string(), "UPI");
        assert_eq!(PaymentMethod::default(), PaymentMethod::Cash);
    }
}
