//! `/api/deals` payment routes and the gateway webhook.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use gradeup_protocol::{Deal, DealStatus};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use super::{parse_id, ApiState};
use crate::errors::{ApiError, Result};
use crate::validation::Validator;
use crate::webhook::{self, SIGNATURE_HEADER};

#[derive(Debug, Default, Deserialize)]
pub struct DealBody {
    pub athlete_id: Option<String>,
    pub brand_id: Option<String>,
    pub amount: Option<i64>,
    pub currency: Option<String>,
    pub status: Option<String>,
    pub athlete_account_id: Option<String>,
}

impl DealBody {
    fn validate(self, id: Uuid) -> Result<Deal> {
        let mut v = Validator::new();
        let athlete_id = v
            .required("athlete_id", self.athlete_id.as_deref(), 36)
            .and_then(|raw| v.uuid("athlete_id", raw));
        let brand_id = v
            .required("brand_id", self.brand_id.as_deref(), 36)
            .and_then(|raw| v.uuid("brand_id", raw));
        match self.amount {
            Some(amount) => v.range("amount", amount, 1, i64::MAX / 10_000),
            None => v.add("amount", "is required"),
        }
        let currency = self.currency.as_deref().unwrap_or("USD");
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            v.add("currency", "must be a 3-letter ISO 4217 code");
        }
        let status = v.one_of(
            "status",
            self.status.as_deref().unwrap_or("draft"),
            &DealStatus::ALL.map(|s| s.as_str()),
            DealStatus::parse,
        );
        v.optional_length("athlete_account_id", self.athlete_account_id.as_deref(), 255);
        let currency = currency.to_uppercase();
        v.finish()?;

        match (athlete_id, brand_id, self.amount, status) {
            (Some(athlete_id), Some(brand_id), Some(amount), Some(status)) => Ok(Deal {
                id,
                athlete_id,
                brand_id,
                amount,
                currency,
                status,
                athlete_account_id: self.athlete_account_id,
            }),
            _ => Err(ApiError::field("body", "incomplete deal")),
        }
    }
}

/// `PUT /api/deals/:id`
pub async fn upsert_deal(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    body: std::result::Result<Json<DealBody>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let id = parse_id("id", &id)?;
    let Json(body) = body?;
    Ok(Json(state.payments.upsert_deal(body.validate(id)?).await?))
}

/// `GET /api/deals/:id/payment`
pub async fn get_deal_payment(
    State(state): State<Arc<ApiState>>,
    Path(deal_id): Path<String>,
) -> Result<impl IntoResponse> {
    let deal_id = parse_id("deal_id", &deal_id)?;
    Ok(Json(state.payments.payment_for_deal(deal_id).await?))
}

/// `POST /api/deals/:id/payment-intent`
pub async fn create_payment_intent(
    State(state): State<Arc<ApiState>>,
    Path(deal_id): Path<String>,
) -> Result<impl IntoResponse> {
    let deal_id = parse_id("deal_id", &deal_id)?;
    let created = state.payments.create_intent(deal_id).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `POST /api/webhooks/payments`
///
/// Authenticated by the signature header, not by the bearer token. The raw
/// body is verified before it is parsed.
pub async fn payment_webhook(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse> {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    if let Err(err) = webhook::verify(
        &state.webhook_secret,
        signature,
        &body,
        Utc::now().timestamp(),
        state.webhook_tolerance_secs,
    ) {
        warn!("Rejected webhook delivery: {err}");
        return Err(err);
    }

    let event = webhook::parse_event(&body)?;
    let outcome = state.payments.handle_webhook(event).await?;
    Ok(Json(outcome))
}
