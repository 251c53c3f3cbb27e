//! `/api/campaigns`.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use gradeup_protocol::CampaignStatus;
use serde::Deserialize;

use super::{ApiState, ListResponse, PageQuery};
use crate::campaigns::NewCampaign;
use crate::errors::{ApiError, Result};
use crate::store::CampaignFilter;
use crate::validation::Validator;

const MAX_TITLE: usize = 200;
const MAX_DESCRIPTION: usize = 5_000;
const MAX_SPORTS: usize = 20;
const MAX_BUDGET: i64 = 100_000_000_000;

#[derive(Debug, Default, Deserialize)]
pub struct CampaignBody {
    pub brand_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub budget: Option<i64>,
    pub currency: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub sports: Vec<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl CampaignBody {
    fn validate(self) -> Result<NewCampaign> {
        let mut v = Validator::new();
        let brand_id = v
            .required("brand_id", self.brand_id.as_deref(), 36)
            .and_then(|raw| v.uuid("brand_id", raw));
        let title = v
            .required("title", self.title.as_deref(), MAX_TITLE)
            .map(|t| t.trim().to_string());
        v.optional_length("description", self.description.as_deref(), MAX_DESCRIPTION);
        match self.budget {
            Some(budget) => v.range("budget", budget, 0, MAX_BUDGET),
            None => v.add("budget", "is required"),
        }
        let currency = self.currency.as_deref().unwrap_or("USD");
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            v.add("currency", "must be a 3-letter ISO 4217 code");
        }
        let currency = currency.to_uppercase();
        let status = v.one_of(
            "status",
            self.status.as_deref().unwrap_or("draft"),
            &CampaignStatus::ALL.map(|s| s.as_str()),
            CampaignStatus::parse,
        );
        if self.sports.len() > MAX_SPORTS {
            v.add("sports", format!("must contain at most {MAX_SPORTS} sports"));
        }
        for (i, sport) in self.sports.iter().enumerate() {
            v.length(&format!("sports[{i}]"), sport, 1, MAX_TITLE);
        }
        let start_date = v.date("start_date", self.start_date.as_deref());
        let end_date = v.date("end_date", self.end_date.as_deref());
        v.finish()?;

        match (brand_id, title, self.budget, status) {
            (Some(brand_id), Some(title), Some(budget), Some(status)) => Ok(NewCampaign {
                brand_id,
                title,
                description: self.description,
                budget,
                currency,
                status,
                sports: self
                    .sports
                    .into_iter()
                    .map(|s| s.trim().to_lowercase())
                    .collect(),
                start_date,
                end_date,
            }),
            _ => Err(ApiError::field("body", "incomplete campaign")),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CampaignQuery {
    pub brand_id: Option<String>,
    pub status: Option<String>,
    pub sport: Option<String>,
    pub limit: Option<u32>,
}

impl CampaignQuery {
    fn filter(self) -> Result<CampaignFilter> {
        let limit = PageQuery { limit: self.limit }.limit()?;
        let mut v = Validator::new();
        let brand_id = self
            .brand_id
            .as_deref()
            .and_then(|raw| v.uuid("brand_id", raw));
        let status = self.status.as_deref().and_then(|raw| {
            v.one_of(
                "status",
                raw,
                &CampaignStatus::ALL.map(|s| s.as_str()),
                CampaignStatus::parse,
            )
        });
        v.finish()?;
        Ok(CampaignFilter {
            brand_id,
            status,
            sport: self.sport.map(|s| s.trim().to_lowercase()),
            limit,
        })
    }
}

/// `GET /api/campaigns`
pub async fn list_campaigns(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<CampaignQuery>,
) -> Result<impl IntoResponse> {
    let campaigns = state.campaigns.list(query.filter()?).await?;
    Ok(Json(ListResponse::from(campaigns)))
}

/// `POST /api/campaigns`
pub async fn create_campaign(
    State(state): State<Arc<ApiState>>,
    body: std::result::Result<Json<CampaignBody>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(body) = body?;
    let campaign = state.campaigns.create(body.validate()?).await?;
    Ok((StatusCode::CREATED, Json(campaign)))
}
