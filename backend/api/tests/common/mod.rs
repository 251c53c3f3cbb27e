#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use gradeup_api::api::ApiState;
use gradeup_api::config::{Config, StoreBackend};
use gradeup_api::errors::Result;
use gradeup_api::gateway::{IntentRequest, PaymentGateway, PaymentIntent};
use gradeup_api::router;
use gradeup_api::store::memory::MemoryStore;
use serde_json::Value;
use tower::ServiceExt;

pub const TOKEN: &str = "test-token";
pub const WEBHOOK_SECRET: &str = "whsec_integration";

/// Answers every intent request with `pi_<deal id>`.
pub struct FakeGateway;

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_payment_intent(&self, request: &IntentRequest) -> Result<PaymentIntent> {
        Ok(PaymentIntent {
            id: format!("pi_{}", request.deal_id.simple()),
            client_secret: Some("pi_secret".to_string()),
            status: Some("requires_payment_method".to_string()),
        })
    }
}

pub fn config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        store_backend: StoreBackend::Memory,
        api_port: 0,
        api_token: Some(TOKEN.to_string()),
        payment_api_url: "http://gateway.invalid".to_string(),
        payment_api_key: "sk_test".to_string(),
        webhook_secret: WEBHOOK_SECRET.to_string(),
        webhook_tolerance_secs: 300,
        platform_fee_bps: 1_000,
        gateway_timeout_secs: 5,
    }
}

pub fn app() -> Router {
    let state = ApiState::new(Arc::new(MemoryStore::new()), Arc::new(FakeGateway), &config());
    router(Arc::new(state))
}

pub async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"));
    let body = match body {
        Some(json) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    send(app, request.body(body).unwrap()).await
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}
