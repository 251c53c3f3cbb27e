//! GradeUp NIL backend.
//!
//! Serves brand campaigns, the contract signing workflow, GradeUp scoring and
//! deal payments over REST. Domain rules live in `gradeup_protocol`; this crate adds
//! persistence, the payment gateway and HTTP.

pub mod api;
pub mod auth;
pub mod campaigns;
pub mod config;
pub mod contracts;
pub mod db;
pub mod errors;
pub mod gateway;
pub mod payments;
pub mod scoring;
pub mod store;
pub mod validation;
pub mod webhook;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use api::ApiState;

/// Full application router. Everything under `/api` except the payment
/// webhook sits behind the bearer guard.
pub fn router(state: Arc<ApiState>) -> Router {
    let protected = Router::new()
        // ─── Campaigns ────────────────────────────────────
        .route(
            "/campaigns",
            get(api::campaigns::list_campaigns).post(api::campaigns::create_campaign),
        )
        // ─── Contracts ────────────────────────────────────
        .route("/contracts", post(api::contracts::create_contract))
        .route(
            "/contracts/:id",
            get(api::contracts::get_contract)
                .patch(api::contracts::update_contract)
                .delete(api::contracts::delete_contract)
                .post(api::contracts::contract_action),
        )
        // ─── Deals & payments ─────────────────────────────
        .route("/deals/:id", put(api::payments::upsert_deal))
        .route("/deals/:id/contracts", get(api::contracts::list_deal_contracts))
        .route("/deals/:id/payment", get(api::payments::get_deal_payment))
        .route(
            "/deals/:id/payment-intent",
            post(api::payments::create_payment_intent),
        )
        // ─── Scoring ──────────────────────────────────────
        .route("/athletes/:id", put(api::scoring::upsert_athlete))
        .route(
            "/gradeup/calculate/:athlete_id",
            post(api::scoring::calculate),
        )
        .route("/gradeup/batch", post(api::scoring::calculate_batch))
        .route("/gradeup/leaderboard", get(api::scoring::leaderboard))
        .route("/gradeup/:athlete_id", get(api::scoring::latest_score))
        .route(
            "/gradeup/:athlete_id/history",
            get(api::scoring::score_history),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ));

    let webhooks = Router::new().route("/webhooks/payments", post(api::payments::payment_webhook));

    Router::new()
        .route("/health", get(api::health))
        .nest("/api", protected.merge(webhooks))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
