//! # Payments
//!
//! Fee split for deal payouts and the payment status machine driven by
//! gateway webhook events.
//!
//! ```text
//! Pending ──► Processing ──► Succeeded ──► PartiallyRefunded ──► Refunded
//!    │            │  ▲            ▲                └──────────────────►┘
//!    └────────────┴──┴──► Failed ─┘
//! ```
//!
//! Events arriving out of order never move a payment backwards; they are
//! reported as "no change" so the caller can acknowledge and drop them.

use serde::{Deserialize, Serialize};

use crate::types::PaymentStatus;
use crate::{Error, Result};

/// Platform fee charged on gross deal amounts (10 %).
pub const DEFAULT_PLATFORM_FEE_BPS: u32 = 1_000;

const BPS_DENOMINATOR: i64 = 10_000;

/// Gross amount split between the platform and the athlete, in minor units.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FeeSplit {
    pub amount: i64,
    pub platform_fee: i64,
    pub athlete_amount: i64,
}

/// Splits `amount` with the platform fee rounded up to the next minor unit.
pub fn split_fee(amount: i64, fee_bps: u32) -> Result<FeeSplit> {
    if amount <= 0 {
        return Err(Error::InvalidAmount(amount));
    }
    if i64::from(fee_bps) > BPS_DENOMINATOR {
        return Err(Error::InvalidFee(fee_bps));
    }
    let scaled = i128::from(amount) * i128::from(fee_bps);
    let denominator = i128::from(BPS_DENOMINATOR);
    let fee = (scaled + denominator - 1) / denominator;
    let platform_fee = i64::try_from(fee).map_err(|_| Error::InvalidAmount(amount))?;
    Ok(FeeSplit {
        amount,
        platform_fee,
        athlete_amount: amount - platform_fee,
    })
}

/// Gateway event kinds that affect a payment.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum GatewayEvent {
    Processing,
    Succeeded,
    Failed { reason: Option<String> },
    Refunded { amount_refunded: i64 },
    Unknown,
}

impl GatewayEvent {
    /// Builds the event from a gateway event type plus the refund total and
    /// failure message carried in its payload.
    pub fn from_type(
        event_type: &str,
        amount_refunded: Option<i64>,
        failure_reason: Option<String>,
    ) -> Self {
        match event_type {
            "payment_intent.processing" => Self::Processing,
            "payment_intent.succeeded" => Self::Succeeded,
            "payment_intent.payment_failed" => Self::Failed {
                reason: failure_reason,
            },
            "charge.refunded" => Self::Refunded {
                amount_refunded: amount_refunded.unwrap_or(0),
            },
            _ => Self::Unknown,
        }
    }
}

/// Status a payment moves to on `event`, or `None` when the event must be
/// ignored (duplicate, out of order, or unknown).
pub fn next_status(
    current: PaymentStatus,
    event: &GatewayEvent,
    amount: i64,
) -> Option<PaymentStatus> {
    use PaymentStatus::*;
    match (current, event) {
        (Pending | Failed, GatewayEvent::Processing) => Some(Processing),
        (Pending | Processing | Failed, GatewayEvent::Succeeded) => Some(Succeeded),
        (Pending | Processing, GatewayEvent::Failed { .. }) => Some(Failed),
        (Succeeded | PartiallyRefunded, GatewayEvent::Refunded { amount_refunded }) => {
            if *amount_refunded <= 0 {
                None
            } else if *amount_refunded >= amount {
                Some(Refunded)
            } else {
                Some(PartiallyRefunded)
            }
        }
        _ => None,
    }
}
