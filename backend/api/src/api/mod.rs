//! Axum REST API handlers.

pub mod campaigns;
pub mod contracts;
pub mod payments;
pub mod scoring;

use std::sync::Arc;

use axum::{body::Bytes, http::HeaderMap, response::IntoResponse, Json};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::campaigns::CampaignService;
use crate::config::Config;
use crate::contracts::ContractService;
use crate::errors::{ApiError, Result};
use crate::gateway::PaymentGateway;
use crate::payments::PaymentService;
use crate::scoring::{ScoringService, DEFAULT_PAGE, MAX_PAGE};
use crate::store::Store;
use crate::validation::Validator;

pub struct ApiState {
    pub campaigns: CampaignService,
    pub contracts: ContractService,
    pub scoring: ScoringService,
    pub payments: PaymentService,
    /// `None` disables the bearer check.
    pub api_token: Option<String>,
    pub webhook_secret: String,
    pub webhook_tolerance_secs: i64,
}

impl ApiState {
    pub fn new(store: Arc<dyn Store>, gateway: Arc<dyn PaymentGateway>, config: &Config) -> Self {
        Self {
            campaigns: CampaignService::new(store.clone()),
            contracts: ContractService::new(store.clone()),
            scoring: ScoringService::new(store.clone()),
            payments: PaymentService::new(store, gateway, config.platform_fee_bps),
            api_token: config.api_token.clone(),
            webhook_secret: config.webhook_secret.clone(),
            webhook_tolerance_secs: config.webhook_tolerance_secs,
        }
    }
}

// ─────────────────────────────────────────────────────────
// Shared shapes
// ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ListResponse<T> {
    pub count: usize,
    pub items: Vec<T>,
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(items: Vec<T>) -> Self {
        Self {
            count: items.len(),
            items,
        }
    }
}

/// `?limit=` paging, 1–100, default 25.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<u32>,
}

impl PageQuery {
    pub fn limit(&self) -> Result<u32> {
        let limit = self.limit.unwrap_or(DEFAULT_PAGE);
        let mut v = Validator::new();
        v.range("limit", limit, 1, MAX_PAGE);
        v.finish()?;
        Ok(limit)
    }
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ─────────────────────────────────────────────────────────
// Extraction helpers
// ─────────────────────────────────────────────────────────

/// Path ids are validated like any other field.
pub(crate) fn parse_id(field: &str, raw: &str) -> Result<Uuid> {
    let mut v = Validator::new();
    let id = v.uuid(field, raw);
    v.finish()?;
    id.ok_or_else(|| ApiError::field(field, "must be a valid UUID"))
}

/// JSON body that may be empty; empty means `{}`.
pub(crate) fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T> {
    let raw: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}"
    } else {
        body
    };
    serde_json::from_slice(raw).map_err(|e| ApiError::field("body", e.to_string()))
}

/// First hop of `X-Forwarded-For`, else `X-Real-IP`.
pub(crate) fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
}
