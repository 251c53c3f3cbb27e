//! Repository interface over the relational store.
//!
//! Services only talk to these traits. [`sqlite::SqliteStore`] is the
//! production backend; [`memory::MemoryStore`] keeps the same conditional
//! update semantics in process for tests and local runs.
//!
//! Every mutation that races with other requests is conditional: it names the
//! state it expects to find and reports `false` when the row was not in that
//! state, leaving the caller to re-read.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gradeup_protocol::{
    Athlete, Campaign, CampaignStatus, Contract, ContractStatus, ContractTerms,
    ContractWithParties, Deal, PartyType, Payment, PaymentStatus, ScoreRecord, SignatureStatus,
    SignatureType,
};
use uuid::Uuid;

use crate::errors::Result;

/// Decision recorded on a signature slot.
#[derive(Debug, Clone)]
pub enum SignatureUpdate {
    Signed {
        signer_name: Option<String>,
        signature_data: String,
        signature_type: SignatureType,
        signature_ip: Option<String>,
        at: DateTime<Utc>,
    },
    Declined {
        reason: String,
        at: DateTime<Utc>,
    },
}

impl SignatureUpdate {
    pub fn status(&self) -> SignatureStatus {
        match self {
            SignatureUpdate::Signed { .. } => SignatureStatus::Signed,
            SignatureUpdate::Declined { .. } => SignatureStatus::Declined,
        }
    }
}

/// New contract status plus the columns that travel with it.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub status: ContractStatus,
    pub at: DateTime<Utc>,
    /// Set when the contract becomes fully signed.
    pub signed_at: Option<DateTime<Utc>>,
    /// Set when the contract is voided.
    pub void_reason: Option<String>,
}

impl StatusUpdate {
    /// A plain move to `status` stamped now.
    pub fn to(status: ContractStatus) -> Self {
        Self {
            status,
            at: Utc::now(),
            signed_at: None,
            void_reason: None,
        }
    }
}

/// Webhook-driven change to a payment.
#[derive(Debug, Clone)]
pub struct PaymentUpdate {
    pub status: PaymentStatus,
    pub amount_refunded: Option<i64>,
    pub failure_reason: Option<String>,
    pub at: DateTime<Utc>,
}

/// Filters for [`CampaignStore::list_campaigns`]; `None` matches anything.
#[derive(Debug, Clone, Default)]
pub struct CampaignFilter {
    pub brand_id: Option<Uuid>,
    pub status: Option<CampaignStatus>,
    /// Campaign targets this sport.
    pub sport: Option<String>,
    pub limit: u32,
}

#[async_trait]
pub trait ContractStore: Send + Sync {
    async fn insert_contract(&self, contract: &ContractWithParties) -> Result<()>;

    async fn get_contract(&self, id: Uuid) -> Result<Option<ContractWithParties>>;

    async fn list_contracts_for_deal(&self, deal_id: Uuid) -> Result<Vec<Contract>>;

    /// Replaces the terms if the status is one of `expected`.
    async fn update_contract_terms(
        &self,
        id: Uuid,
        terms: &ContractTerms,
        expected: &[ContractStatus],
        at: DateTime<Utc>,
    ) -> Result<bool>;

    /// Deletes the contract and its slots if the status is `expected`.
    async fn delete_contract(&self, id: Uuid, expected: ContractStatus) -> Result<bool>;

    /// Records a decision on the slot of `party` if it is still `expected`
    /// and the contract is still awaiting signatures.
    async fn update_signature(
        &self,
        contract_id: Uuid,
        party: PartyType,
        expected: SignatureStatus,
        update: &SignatureUpdate,
    ) -> Result<bool>;

    /// Moves the contract to `update.status` if it is currently one of `expected`.
    async fn update_contract_status(
        &self,
        id: Uuid,
        expected: &[ContractStatus],
        update: &StatusUpdate,
    ) -> Result<bool>;
}

#[async_trait]
pub trait AthleteStore: Send + Sync {
    async fn upsert_athlete(&self, athlete: &Athlete) -> Result<()>;

    async fn get_athlete(&self, id: Uuid) -> Result<Option<Athlete>>;
}

#[async_trait]
pub trait ScoreStore: Send + Sync {
    async fn append_score(&self, record: &ScoreRecord) -> Result<()>;

    /// Newest first.
    async fn score_history(&self, athlete_id: Uuid, limit: u32) -> Result<Vec<ScoreRecord>>;

    /// Latest record per athlete, highest total first.
    async fn leaderboard(&self, verified_only: bool, limit: u32) -> Result<Vec<ScoreRecord>>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn upsert_deal(&self, deal: &Deal) -> Result<()>;

    async fn get_deal(&self, id: Uuid) -> Result<Option<Deal>>;

    async fn get_payment_for_deal(&self, deal_id: Uuid) -> Result<Option<Payment>>;

    async fn get_payment_by_intent(&self, payment_intent_id: &str) -> Result<Option<Payment>>;

    /// Returns `false` if a payment already exists for the deal.
    async fn insert_payment(&self, payment: &Payment) -> Result<bool>;

    /// Applies `update` if the payment keyed by `payment_intent_id` is still `expected`.
    async fn update_payment(
        &self,
        payment_intent_id: &str,
        expected: PaymentStatus,
        update: &PaymentUpdate,
    ) -> Result<bool>;

    /// Records a webhook event id. Returns `false` when it was already seen.
    async fn record_webhook_event(
        &self,
        event_id: &str,
        event_type: &str,
        at: DateTime<Utc>,
    ) -> Result<bool>;

    /// Drops a recorded event id so a redelivery is processed again.
    async fn forget_webhook_event(&self, event_id: &str) -> Result<()>;
}

#[async_trait]
pub trait CampaignStore: Send + Sync {
    async fn insert_campaign(&self, campaign: &Campaign) -> Result<()>;

    /// Newest first.
    async fn list_campaigns(&self, filter: &CampaignFilter) -> Result<Vec<Campaign>>;
}

/// Everything the service needs from persistence.
pub trait Store: ContractStore + AthleteStore + ScoreStore + PaymentStore + CampaignStore {}

impl<T> Store for T where
    T: ContractStore + AthleteStore + ScoreStore + PaymentStore + CampaignStore
{
}
