//! `/api/athletes` and `/api/gradeup`.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use gradeup_protocol::score::{AthleteProfile, MajorCategory, SportTier};
use gradeup_protocol::Athlete;
use serde::Deserialize;
use uuid::Uuid;

use super::{parse_id, ApiState, ListResponse, PageQuery};
use crate::errors::{ApiError, Result};
use crate::validation::Validator;

const MAX_NAME: usize = 200;
const MAX_TERMS: usize = 16;
const MAX_FOLLOWERS: u64 = i64::MAX as u64;

#[derive(Debug, Default, Deserialize)]
pub struct AthleteBody {
    pub name: Option<String>,
    pub sport: Option<String>,
    pub sport_tier: Option<String>,
    #[serde(default)]
    pub athletic_rating: f64,
    #[serde(default)]
    pub deals_completed: u32,
    #[serde(default)]
    pub avg_deal_rating: f64,
    #[serde(default)]
    pub total_followers: u64,
    #[serde(default)]
    pub gpa: f64,
    pub cumulative_gpa: Option<f64>,
    #[serde(default)]
    pub term_gpas: Vec<f64>,
    pub major_category: Option<String>,
    #[serde(default)]
    pub grades_verified: bool,
    #[serde(default)]
    pub enrollment_verified: bool,
    #[serde(default)]
    pub sport_verified: bool,
}

impl AthleteBody {
    fn validate(self, id: Uuid) -> Result<Athlete> {
        let mut v = Validator::new();
        let name = v.required("name", self.name.as_deref(), MAX_NAME);
        let sport = v.required("sport", self.sport.as_deref(), MAX_NAME);
        let sport_tier = v
            .required("sport_tier", self.sport_tier.as_deref(), 20)
            .and_then(|raw| {
                v.one_of(
                    "sport_tier",
                    raw,
                    &SportTier::ALL.map(|t| t.as_str()),
                    SportTier::parse,
                )
            });
        let major_category = v.one_of(
            "major_category",
            self.major_category.as_deref().unwrap_or("undeclared"),
            &MajorCategory::ALL.map(|m| m.as_str()),
            MajorCategory::parse,
        );

        v.range("athletic_rating", self.athletic_rating, 0.0, 100.0);
        v.range("avg_deal_rating", self.avg_deal_rating, 0.0, 5.0);
        v.range("total_followers", self.total_followers, 0, MAX_FOLLOWERS);
        v.range("gpa", self.gpa, 0.0, 4.0);
        if let Some(cumulative) = self.cumulative_gpa {
            v.range("cumulative_gpa", cumulative, 0.0, 4.0);
        }
        if self.term_gpas.len() > MAX_TERMS {
            v.add("term_gpas", format!("must contain at most {MAX_TERMS} terms"));
        }
        if self.term_gpas.iter().any(|g| !(0.0..=4.0).contains(g)) {
            v.add("term_gpas", "every term GPA must be between 0 and 4");
        }

        let name = name.map(|n| n.trim().to_string());
        let sport = sport.map(|s| s.trim().to_string());
        v.finish()?;

        match (name, sport, sport_tier, major_category) {
            (Some(name), Some(sport), Some(sport_tier), Some(major_category)) => Ok(Athlete {
                id,
                name,
                sport,
                profile: AthleteProfile {
                    sport_tier,
                    athletic_rating: self.athletic_rating,
                    deals_completed: self.deals_completed,
                    avg_deal_rating: self.avg_deal_rating,
                    total_followers: self.total_followers,
                    gpa: self.gpa,
                    cumulative_gpa: self.cumulative_gpa,
                    term_gpas: self.term_gpas,
                    major_category,
                    grades_verified: self.grades_verified,
                    enrollment_verified: self.enrollment_verified,
                    sport_verified: self.sport_verified,
                },
            }),
            _ => Err(ApiError::field("body", "incomplete athlete profile")),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BatchBody {
    pub athlete_ids: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<u32>,
    #[serde(default)]
    pub verified_only: bool,
}

/// `PUT /api/athletes/:id`
pub async fn upsert_athlete(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    body: std::result::Result<Json<AthleteBody>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let id = parse_id("id", &id)?;
    let Json(body) = body?;
    let athlete = state.scoring.upsert_athlete(body.validate(id)?).await?;
    Ok(Json(athlete))
}

/// `POST /api/gradeup/calculate/:athlete_id`
pub async fn calculate(
    State(state): State<Arc<ApiState>>,
    Path(athlete_id): Path<String>,
) -> Result<impl IntoResponse> {
    let athlete_id = parse_id("athlete_id", &athlete_id)?;
    let record = state.scoring.calculate(athlete_id).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// `POST /api/gradeup/batch`
///
/// Always answers 200 once the id list itself is acceptable; per-athlete
/// failures are reported inside the result.
pub async fn calculate_batch(
    State(state): State<Arc<ApiState>>,
    body: std::result::Result<Json<BatchBody>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(body) = body?;
    let ids = body
        .athlete_ids
        .ok_or_else(|| ApiError::field("athlete_ids", "is required"))?;
    Ok(Json(state.scoring.calculate_batch(ids).await?))
}

/// `GET /api/gradeup/:athlete_id`
pub async fn latest_score(
    State(state): State<Arc<ApiState>>,
    Path(athlete_id): Path<String>,
) -> Result<impl IntoResponse> {
    let athlete_id = parse_id("athlete_id", &athlete_id)?;
    Ok(Json(state.scoring.latest(athlete_id).await?))
}

/// `GET /api/gradeup/:athlete_id/history`
pub async fn score_history(
    State(state): State<Arc<ApiState>>,
    Path(athlete_id): Path<String>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    let athlete_id = parse_id("athlete_id", &athlete_id)?;
    let limit = page.limit()?;
    let history = state.scoring.history(athlete_id, limit).await?;
    Ok(Json(ListResponse::from(history)))
}

/// `GET /api/gradeup/leaderboard`
pub async fn leaderboard(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<impl IntoResponse> {
    let limit = PageQuery { limit: query.limit }.limit()?;
    let board = state.scoring.leaderboard(query.verified_only, limit).await?;
    Ok(Json(ListResponse::from(board)))
}
