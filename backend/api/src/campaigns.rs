//! Brand campaigns.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use gradeup_protocol::{Campaign, CampaignStatus};
use tracing::info;
use uuid::Uuid;

use crate::errors::{ApiError, Result};
use crate::store::{CampaignFilter, Store};

#[derive(Debug, Clone)]
pub struct NewCampaign {
    pub brand_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub budget: i64,
    pub currency: String,
    pub status: CampaignStatus,
    pub sports: Vec<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Clone)]
pub struct CampaignService {
    store: Arc<dyn Store>,
}

impl CampaignService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create(&self, input: NewCampaign) -> Result<Campaign> {
        if let (Some(start), Some(end)) = (input.start_date, input.end_date) {
            if end < start {
                return Err(ApiError::field("end_date", "must not be before start_date"));
            }
        }
        let campaign = Campaign {
            id: Uuid::new_v4(),
            brand_id: input.brand_id,
            title: input.title,
            description: input.description,
            budget: input.budget,
            currency: input.currency,
            status: input.status,
            sports: input.sports,
            start_date: input.start_date,
            end_date: input.end_date,
            created_at: Utc::now(),
        };
        self.store.insert_campaign(&campaign).await?;
        info!(
            campaign_id = %campaign.id,
            brand_id = %campaign.brand_id,
            status = campaign.status.as_str(),
            "Campaign created"
        );
        Ok(campaign)
    }

    pub async fn list(&self, filter: CampaignFilter) -> Result<Vec<Campaign>> {
        self.store.list_campaigns(&filter).await
    }
}
