//! GradeUp scoring service: calculation, batch runs, history and leaderboard.

use std::sync::Arc;

use chrono::Utc;
use gradeup_protocol::score::{self, Trend, BATCH_LIMIT};
use gradeup_protocol::{Athlete, ScoreRecord};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::{ApiError, Result};
use crate::store::Store;

pub const DEFAULT_PAGE: u32 = 25;
pub const MAX_PAGE: u32 = 100;

/// Latest score plus the direction it moved in.
#[derive(Debug, Serialize)]
pub struct LatestScore {
    #[serde(flatten)]
    pub score: ScoreRecord,
    pub trend: Trend,
    pub previous_total: Option<u32>,
}

/// Per-athlete result of a batch run.
#[derive(Debug, Serialize)]
pub struct BatchItem {
    pub athlete_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<ScoreRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchOutcome {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Same order as the requested ids.
    pub results: Vec<BatchItem>,
}

#[derive(Clone)]
pub struct ScoringService {
    store: Arc<dyn Store>,
}

impl ScoringService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn upsert_athlete(&self, athlete: Athlete) -> Result<Athlete> {
        self.store.upsert_athlete(&athlete).await?;
        info!(athlete_id = %athlete.id, "Athlete profile stored");
        Ok(athlete)
    }

    /// Scores the athlete's current profile and appends it to the history.
    pub async fn calculate(&self, athlete_id: Uuid) -> Result<ScoreRecord> {
        let athlete = self
            .store
            .get_athlete(athlete_id)
            .await?
            .ok_or_else(|| ApiError::not_found("athlete", athlete_id))?;

        let record = ScoreRecord {
            id: Uuid::new_v4(),
            athlete_id,
            components: score::calculate(&athlete.profile),
            calculated_at: Utc::now(),
        };
        self.store.append_score(&record).await?;
        info!(
            athlete_id = %athlete_id,
            total = record.components.total,
            grade = record.components.grade.as_str(),
            "GradeUp score calculated"
        );
        Ok(record)
    }

    /// Scores every id concurrently. A failing id is reported in its own
    /// slot and never aborts the rest.
    pub async fn calculate_batch(&self, athlete_ids: Vec<String>) -> Result<BatchOutcome> {
        if athlete_ids.is_empty() || athlete_ids.len() > BATCH_LIMIT {
            return Err(ApiError::field(
                "athlete_ids",
                format!("must contain between 1 and {BATCH_LIMIT} ids"),
            ));
        }

        let handles: Vec<_> = athlete_ids
            .into_iter()
            .map(|raw| {
                let service = self.clone();
                let handle = tokio::spawn({
                    let raw = raw.clone();
                    async move {
                        let id = Uuid::parse_str(&raw).map_err(|_| {
                            ApiError::field("athlete_id", format!("{raw:?} is not a valid UUID"))
                        })?;
                        service.calculate(id).await
                    }
                });
                (raw, handle)
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (athlete_id, handle) in handles {
            let item = match handle.await {
                Ok(Ok(score)) => BatchItem {
                    athlete_id,
                    success: true,
                    score: Some(score),
                    error: None,
                },
                Ok(Err(err)) => {
                    warn!(%athlete_id, error = %err, "Batch score failed");
                    BatchItem {
                        athlete_id,
                        success: false,
                        score: None,
                        error: Some(batch_error_message(&err)),
                    }
                }
                Err(join_err) => {
                    warn!(%athlete_id, error = %join_err, "Batch score task aborted");
                    BatchItem {
                        athlete_id,
                        success: false,
                        score: None,
                        error: Some("score calculation aborted".to_string()),
                    }
                }
            };
            results.push(item);
        }

        let succeeded = results.iter().filter(|r| r.success).count();
        let outcome = BatchOutcome {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        };
        info!(
            total = outcome.total,
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            "Batch scoring finished"
        );
        Ok(outcome)
    }

    pub async fn latest(&self, athlete_id: Uuid) -> Result<LatestScore> {
        let mut recent = self.store.score_history(athlete_id, 2).await?;
        let totals: Vec<u32> = recent.iter().map(|r| r.components.total).collect();
        let trend = Trend::from_history(&totals);
        let previous_total = totals.get(1).copied();
        if recent.is_empty() {
            return Err(ApiError::NotFound(format!(
                "no GradeUp score recorded for athlete {athlete_id}"
            )));
        }
        Ok(LatestScore {
            score: recent.swap_remove(0),
            trend,
            previous_total,
        })
    }

    /// Newest first.
    pub async fn history(&self, athlete_id: Uuid, limit: u32) -> Result<Vec<ScoreRecord>> {
        self.store.score_history(athlete_id, limit).await
    }

    pub async fn leaderboard(&self, verified_only: bool, limit: u32) -> Result<Vec<ScoreRecord>> {
        self.store.leaderboard(verified_only, limit).await
    }
}

/// Validation errors carry their message in the field map rather than in
/// `Display`.
fn batch_error_message(err: &ApiError) -> String {
    match err {
        ApiError::Validation(fields) => fields
            .values()
            .flatten()
            .cloned()
            .collect::<Vec<_>>()
            .join("; "),
        ApiError::NotFound(_) | ApiError::InvalidState(_) | ApiError::Conflict(_) => {
            err.to_string()
        }
        _ => "internal error".to_string(),
    }
}
