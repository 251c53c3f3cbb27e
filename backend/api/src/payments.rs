//! Deal payments: intent creation and webhook reconciliation.

use std::sync::Arc;

use chrono::Utc;
use gradeup_protocol::payments::{self, GatewayEvent};
use gradeup_protocol::{Deal, DealStatus, Payment, PaymentStatus};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::{ApiError, Result};
use crate::gateway::{IntentRequest, PaymentGateway};
use crate::store::{PaymentUpdate, Store};
use crate::webhook::WebhookEvent;

/// Conditional updates retried when a concurrent event moved the payment.
const MAX_APPLY_ATTEMPTS: usize = 3;

#[derive(Debug, Serialize)]
pub struct CreatedIntent {
    #[serde(flatten)]
    pub payment: Payment,
    pub client_secret: Option<String>,
}

/// What a webhook delivery did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum WebhookOutcome {
    Applied {
        payment_intent_id: String,
        status: PaymentStatus,
    },
    Duplicate,
    Ignored {
        reason: String,
    },
}

#[derive(Clone)]
pub struct PaymentService {
    store: Arc<dyn Store>,
    gateway: Arc<dyn PaymentGateway>,
    fee_bps: u32,
}

impl PaymentService {
    pub fn new(store: Arc<dyn Store>, gateway: Arc<dyn PaymentGateway>, fee_bps: u32) -> Self {
        Self {
            store,
            gateway,
            fee_bps,
        }
    }

    pub async fn upsert_deal(&self, deal: Deal) -> Result<Deal> {
        self.store.upsert_deal(&deal).await?;
        info!(deal_id = %deal.id, status = deal.status.as_str(), "Deal stored");
        Ok(deal)
    }

    pub async fn payment_for_deal(&self, deal_id: Uuid) -> Result<Payment> {
        self.store
            .get_payment_for_deal(deal_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("no payment for deal {deal_id}")))
    }

    /// Opens a gateway payment intent for a completed deal and records it as
    /// `pending`. One payment per deal.
    pub async fn create_intent(&self, deal_id: Uuid) -> Result<CreatedIntent> {
        let deal = self
            .store
            .get_deal(deal_id)
            .await?
            .ok_or_else(|| ApiError::not_found("deal", deal_id))?;
        if deal.status != DealStatus::Completed {
            return Err(ApiError::InvalidState(format!(
                "deal {deal_id} is {}, only completed deals can be paid",
                deal.status.as_str()
            )));
        }
        if self.store.get_payment_for_deal(deal_id).await?.is_some() {
            return Err(ApiError::Conflict(format!(
                "deal {deal_id} already has a payment"
            )));
        }

        let split = payments::split_fee(deal.amount, self.fee_bps)?;
        let intent = self
            .gateway
            .create_payment_intent(&IntentRequest {
                deal_id,
                amount: split.amount,
                currency: deal.currency.clone(),
                application_fee_amount: split.platform_fee,
                destination: deal.athlete_account_id.clone(),
            })
            .await?;

        let now = Utc::now();
        let payment = Payment {
            id: Uuid::new_v4(),
            deal_id,
            payment_intent_id: intent.id,
            amount: split.amount,
            platform_fee: split.platform_fee,
            athlete_amount: split.athlete_amount,
            currency: deal.currency,
            status: PaymentStatus::Pending,
            amount_refunded: 0,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        };
        if !self.store.insert_payment(&payment).await? {
            return Err(ApiError::Conflict(format!(
                "deal {deal_id} already has a payment"
            )));
        }
        info!(
            deal_id = %deal_id,
            payment_intent_id = %payment.payment_intent_id,
            amount = payment.amount,
            platform_fee = payment.platform_fee,
            "Payment intent created"
        );
        Ok(CreatedIntent {
            payment,
            client_secret: intent.client_secret,
        })
    }

    /// Applies a verified webhook event exactly once per event id.
    pub async fn handle_webhook(&self, event: WebhookEvent) -> Result<WebhookOutcome> {
        if !self
            .store
            .record_webhook_event(&event.id, &event.event_type, Utc::now())
            .await?
        {
            debug!(event_id = %event.id, "Duplicate webhook delivery");
            return Ok(WebhookOutcome::Duplicate);
        }

        match self.apply(&event).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                // Let the gateway's redelivery try again.
                self.store.forget_webhook_event(&event.id).await?;
                Err(err)
            }
        }
    }

    async fn apply(&self, event: &WebhookEvent) -> Result<WebhookOutcome> {
        let gateway_event = GatewayEvent::from_type(
            &event.event_type,
            event.amount_refunded,
            event.failure_reason.clone(),
        );
        if gateway_event == GatewayEvent::Unknown {
            debug!(event_id = %event.id, event_type = %event.event_type, "Unhandled webhook event type");
            return Ok(ignored(format!("unhandled event type {}", event.event_type)));
        }
        let Some(intent_id) = event.payment_intent_id.as_deref() else {
            warn!(event_id = %event.id, "Webhook event without a payment intent");
            return Ok(ignored("event carries no payment intent".to_string()));
        };

        for _ in 0..MAX_APPLY_ATTEMPTS {
            let Some(payment) = self.store.get_payment_by_intent(intent_id).await? else {
                warn!(event_id = %event.id, payment_intent_id = intent_id, "Webhook for unknown payment intent");
                return Ok(ignored(format!("unknown payment intent {intent_id}")));
            };
            let Some(next) = payments::next_status(payment.status, &gateway_event, payment.amount)
            else {
                debug!(
                    event_id = %event.id,
                    payment_intent_id = intent_id,
                    current = %payment.status,
                    "Webhook event does not advance the payment"
                );
                return Ok(ignored(format!("payment is already {}", payment.status)));
            };

            let update = PaymentUpdate {
                status: next,
                amount_refunded: match &gateway_event {
                    GatewayEvent::Refunded { amount_refunded } => {
                        Some((*amount_refunded).max(payment.amount_refunded))
                    }
                    _ => None,
                },
                failure_reason: match &gateway_event {
                    GatewayEvent::Failed { reason } => reason.clone(),
                    _ => None,
                },
                at: Utc::now(),
            };
            if self
                .store
                .update_payment(intent_id, payment.status, &update)
                .await?
            {
                info!(
                    event_id = %event.id,
                    payment_intent_id = intent_id,
                    from = %payment.status,
                    to = %next,
                    "Payment status changed"
                );
                return Ok(WebhookOutcome::Applied {
                    payment_intent_id: intent_id.to_string(),
                    status: next,
                });
            }
        }
        Err(ApiError::Conflict(format!(
            "payment {intent_id} kept changing while applying event {}",
            event.id
        )))
    }
}

fn ignored(reason: String) -> WebhookOutcome {
    WebhookOutcome::Ignored { reason }
}
