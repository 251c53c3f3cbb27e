//! Payment gateway client.
//!
//! The gateway speaks form-encoded requests and JSON responses. Intent
//! creation carries an `Idempotency-Key` derived from the deal, so a retried
//! request returns the intent created by the first attempt.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::{ApiError, Result};

/// Everything needed to open a payment intent for a deal.
#[derive(Debug, Clone)]
pub struct IntentRequest {
    pub deal_id: Uuid,
    pub amount: i64,
    pub currency: String,
    pub application_fee_amount: i64,
    /// Connected account receiving the athlete's share.
    pub destination: Option<String>,
}

impl IntentRequest {
    pub fn idempotency_key(&self) -> String {
        format!("deal-{}", self.deal_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
    pub status: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment_intent(&self, request: &IntentRequest) -> Result<PaymentIntent>;
}

// ─────────────────────────────────────────────────────────
// HTTP implementation
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct GatewayErrorBody {
    error: GatewayErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GatewayErrorDetail {
    message: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

pub struct HttpGateway {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpGateway {
    pub fn new(base_url: &str, api_key: &str, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    async fn create_payment_intent(&self, request: &IntentRequest) -> Result<PaymentIntent> {
        let mut form = vec![
            ("amount", request.amount.to_string()),
            ("currency", request.currency.to_lowercase()),
            (
                "application_fee_amount",
                request.application_fee_amount.to_string(),
            ),
            ("metadata[deal_id]", request.deal_id.to_string()),
        ];
        if let Some(destination) = &request.destination {
            form.push(("transfer_data[destination]", destination.clone()));
        }

        let url = format!("{}/v1/payment_intents", self.base_url);
        debug!(%url, deal_id = %request.deal_id, "Creating payment intent");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("Idempotency-Key", request.idempotency_key())
            .form(&form)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GatewayErrorBody>(&body)
                .ok()
                .and_then(|b| b.error.message.or(b.error.kind))
                .unwrap_or_else(|| format!("gateway returned {status}"));
            warn!(%status, deal_id = %request.deal_id, "Payment intent rejected: {message}");
            return Err(ApiError::Upstream(message));
        }

        Ok(resp.json::<PaymentIntent>().await?)
    }
}
