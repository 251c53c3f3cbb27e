//! In-process [`Store`](super::Store) with the same conditional-update
//! semantics as the SQLite backend.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gradeup_protocol::{
    Athlete, Campaign, Contract, ContractStatus, ContractTerms, ContractWithParties, Deal,
    PartyType, Payment, PaymentStatus, ScoreRecord, SignatureStatus,
};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    AthleteStore, CampaignFilter, CampaignStore, ContractStore, PaymentStore, PaymentUpdate,
    ScoreStore, SignatureUpdate, StatusUpdate,
};
use crate::errors::Result;

#[derive(Default)]
struct Tables {
    contracts: BTreeMap<Uuid, ContractWithParties>,
    athletes: BTreeMap<Uuid, Athlete>,
    /// Append order is history order.
    scores: Vec<ScoreRecord>,
    deals: BTreeMap<Uuid, Deal>,
    payments: BTreeMap<Uuid, Payment>,
    webhook_events: BTreeSet<String>,
    campaigns: Vec<Campaign>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContractStore for MemoryStore {
    async fn insert_contract(&self, contract: &ContractWithParties) -> Result<()> {
        self.tables
            .lock()
            .await
            .contracts
            .insert(contract.contract.id, contract.clone());
        Ok(())
    }

    async fn get_contract(&self, id: Uuid) -> Result<Option<ContractWithParties>> {
        Ok(self.tables.lock().await.contracts.get(&id).cloned())
    }

    async fn list_contracts_for_deal(&self, deal_id: Uuid) -> Result<Vec<Contract>> {
        let tables = self.tables.lock().await;
        let mut contracts: Vec<Contract> = tables
            .contracts
            .values()
            .filter(|c| c.contract.deal_id == deal_id)
            .map(|c| c.contract.clone())
            .collect();
        contracts.sort_by_key(|c| c.created_at);
        Ok(contracts)
    }

    async fn update_contract_terms(
        &self,
        id: Uuid,
        terms: &ContractTerms,
        expected: &[ContractStatus],
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        match tables.contracts.get_mut(&id) {
            Some(c) if expected.contains(&c.contract.status) => {
                c.contract.terms = terms.clone();
                c.contract.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_contract(&self, id: Uuid, expected: ContractStatus) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        match tables.contracts.get(&id) {
            Some(c) if c.contract.status == expected => {
                tables.contracts.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_signature(
        &self,
        contract_id: Uuid,
        party: PartyType,
        expected: SignatureStatus,
        update: &SignatureUpdate,
    ) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        let Some(slot) = tables
            .contracts
            .get_mut(&contract_id)
            .filter(|c| c.contract.status.is_awaiting_signatures())
            .and_then(|c| c.parties.iter_mut().find(|p| p.party_type == party))
        else {
            return Ok(false);
        };
        if slot.status != expected {
            return Ok(false);
        }
        slot.status = update.status();
        match update {
            SignatureUpdate::Signed {
                signer_name,
                signature_data,
                signature_type,
                signature_ip,
                at,
            } => {
                if signer_name.is_some() {
                    slot.signer_name = signer_name.clone();
                }
                slot.signature_data = Some(signature_data.clone());
                slot.signature_type = Some(*signature_type);
                slot.signature_ip = signature_ip.clone();
                slot.signed_at = Some(*at);
            }
            SignatureUpdate::Declined { reason, at } => {
                slot.decline_reason = Some(reason.clone());
                slot.declined_at = Some(*at);
            }
        }
        Ok(true)
    }

    async fn update_contract_status(
        &self,
        id: Uuid,
        expected: &[ContractStatus],
        update: &StatusUpdate,
    ) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        let Some(c) = tables.contracts.get_mut(&id) else {
            return Ok(false);
        };
        if !expected.contains(&c.contract.status) {
            return Ok(false);
        }
        c.contract.status = update.status;
        c.contract.updated_at = update.at;
        if update.signed_at.is_some() {
            c.contract.signed_at = update.signed_at;
        }
        if update.status == ContractStatus::Voided {
            c.contract.voided_at = Some(update.at);
            c.contract.void_reason = update.void_reason.clone();
        }
        Ok(true)
    }
}

#[async_trait]
impl AthleteStore for MemoryStore {
    async fn upsert_athlete(&self, athlete: &Athlete) -> Result<()> {
        self.tables
            .lock()
            .await
            .athletes
            .insert(athlete.id, athlete.clone());
        Ok(())
    }

    async fn get_athlete(&self, id: Uuid) -> Result<Option<Athlete>> {
        Ok(self.tables.lock().await.athletes.get(&id).cloned())
    }
}

#[async_trait]
impl ScoreStore for MemoryStore {
    async fn append_score(&self, record: &ScoreRecord) -> Result<()> {
        self.tables.lock().await.scores.push(record.clone());
        Ok(())
    }

    async fn score_history(&self, athlete_id: Uuid, limit: u32) -> Result<Vec<ScoreRecord>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .scores
            .iter()
            .rev()
            .filter(|r| r.athlete_id == athlete_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn leaderboard(&self, verified_only: bool, limit: u32) -> Result<Vec<ScoreRecord>> {
        let tables = self.tables.lock().await;
        let mut latest: BTreeMap<Uuid, &ScoreRecord> = BTreeMap::new();
        for record in tables.scores.iter().rev() {
            latest.entry(record.athlete_id).or_insert(record);
        }
        let mut board: Vec<ScoreRecord> = latest
            .into_values()
            .filter(|r| !verified_only || r.components.verified)
            .cloned()
            .collect();
        board.sort_by(|a, b| {
            b.components
                .total
                .cmp(&a.components.total)
                .then(a.athlete_id.cmp(&b.athlete_id))
        });
        board.truncate(limit as usize);
        Ok(board)
    }
}

#[async_trait]
impl PaymentStore for MemoryStore {
    async fn upsert_deal(&self, deal: &Deal) -> Result<()> {
        self.tables.lock().await.deals.insert(deal.id, deal.clone());
        Ok(())
    }

    async fn get_deal(&self, id: Uuid) -> Result<Option<Deal>> {
        Ok(self.tables.lock().await.deals.get(&id).cloned())
    }

    async fn get_payment_for_deal(&self, deal_id: Uuid) -> Result<Option<Payment>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .payments
            .values()
            .find(|p| p.deal_id == deal_id)
            .cloned())
    }

    async fn get_payment_by_intent(&self, payment_intent_id: &str) -> Result<Option<Payment>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .payments
            .values()
            .find(|p| p.payment_intent_id == payment_intent_id)
            .cloned())
    }

    async fn insert_payment(&self, payment: &Payment) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        let duplicate = tables.payments.values().any(|p| {
            p.deal_id == payment.deal_id || p.payment_intent_id == payment.payment_intent_id
        });
        if duplicate {
            return Ok(false);
        }
        tables.payments.insert(payment.id, payment.clone());
        Ok(true)
    }

    async fn update_payment(
        &self,
        payment_intent_id: &str,
        expected: PaymentStatus,
        update: &PaymentUpdate,
    ) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        let Some(payment) = tables
            .payments
            .values_mut()
            .find(|p| p.payment_intent_id == payment_intent_id)
        else {
            return Ok(false);
        };
        if payment.status != expected {
            return Ok(false);
        }
        payment.status = update.status;
        payment.updated_at = update.at;
        if let Some(refunded) = update.amount_refunded {
            payment.amount_refunded = refunded;
        }
        if update.failure_reason.is_some() {
            payment.failure_reason = update.failure_reason.clone();
        }
        Ok(true)
    }

    async fn record_webhook_event(
        &self,
        event_id: &str,
        _event_type: &str,
        _at: DateTime<Utc>,
    ) -> Result<bool> {
        Ok(self
            .tables
            .lock()
            .await
            .webhook_events
            .insert(event_id.to_string()))
    }

    async fn forget_webhook_event(&self, event_id: &str) -> Result<()> {
        self.tables.lock().await.webhook_events.remove(event_id);
        Ok(())
    }
}

#[async_trait]
impl CampaignStore for MemoryStore {
    async fn insert_campaign(&self, campaign: &Campaign) -> Result<()> {
        self.tables.lock().await.campaigns.push(campaign.clone());
        Ok(())
    }

    async fn list_campaigns(&self, filter: &CampaignFilter) -> Result<Vec<Campaign>> {
        let tables = self.tables.lock().await;
        let mut campaigns: Vec<Campaign> = tables
            .campaigns
            .iter()
            .filter(|c| filter.brand_id.map_or(true, |b| c.brand_id == b))
            .filter(|c| filter.status.map_or(true, |s| c.status == s))
            .filter(|c| {
                filter
                    .sport
                    .as_deref()
                    .map_or(true, |sport| c.sports.iter().any(|s| s == sport))
            })
            .cloned()
            .collect();
        // Ties: later insert first, as in SQLite.
        campaigns.sort_by_key(|c| c.created_at);
        campaigns.reverse();
        campaigns.truncate(filter.limit as usize);
        Ok(campaigns)
    }
}
