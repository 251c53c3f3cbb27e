//! Contract lifecycle service.
//!
//! Loads the contract aggregate, asks [`gradeup_protocol::lifecycle`] what
//! the next status is, and writes it back with a conditional update. When a
//! conditional update loses a race the aggregate is re-read so the caller gets
//! the error that matches the row as it is now.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use gradeup_protocol::lifecycle;
use gradeup_protocol::{
    Clause, Compensation, Contract, ContractStatus, ContractTerms, ContractWithParties, PartyType,
    SignatureStatus, SignatureType,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::{ApiError, Result};
use crate::store::{SignatureUpdate, StatusUpdate, Store};

/// Input of [`ContractService::create`].
#[derive(Debug, Clone)]
pub struct NewContract {
    pub deal_id: Uuid,
    pub terms: ContractTerms,
    pub requires_guardian_signature: bool,
    pub requires_witness: bool,
}

/// Partial edit of [`ContractTerms`]; absent fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct TermsPatch {
    pub title: Option<String>,
    pub compensation: Option<Compensation>,
    pub clauses: Option<Vec<Clause>>,
    pub effective_date: Option<NaiveDate>,
    pub expiration_date: Option<NaiveDate>,
}

impl TermsPatch {
    pub fn apply(self, current: &ContractTerms) -> ContractTerms {
        ContractTerms {
            title: self.title.unwrap_or_else(|| current.title.clone()),
            compensation: self
                .compensation
                .unwrap_or_else(|| current.compensation.clone()),
            clauses: self.clauses.unwrap_or_else(|| current.clauses.clone()),
            effective_date: self.effective_date.or(current.effective_date),
            expiration_date: self.expiration_date.or(current.expiration_date),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Signing {
    pub party: PartyType,
    pub signer_name: Option<String>,
    pub signature_data: String,
    pub signature_type: SignatureType,
    pub ip: Option<String>,
}

#[derive(Clone)]
pub struct ContractService {
    store: Arc<dyn Store>,
}

impl ContractService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    // ─── CRUD ─────────────────────────────────────────────

    pub async fn create(&self, input: NewContract) -> Result<ContractWithParties> {
        ensure_date_order(&input.terms)?;
        let contract = Contract::draft(
            input.deal_id,
            input.terms,
            input.requires_guardian_signature,
            input.requires_witness,
            Utc::now(),
        );
        self.store.insert_contract(&contract).await?;
        info!(
            contract_id = %contract.contract.id,
            deal_id = %contract.contract.deal_id,
            parties = contract.parties.len(),
            "Contract drafted"
        );
        Ok(contract)
    }

    pub async fn get(&self, id: Uuid) -> Result<ContractWithParties> {
        self.store
            .get_contract(id)
            .await?
            .ok_or_else(|| ApiError::not_found("contract", id))
    }

    pub async fn list_for_deal(&self, deal_id: Uuid) -> Result<Vec<Contract>> {
        self.store.list_contracts_for_deal(deal_id).await
    }

    pub async fn update_terms(&self, id: Uuid, patch: TermsPatch) -> Result<ContractWithParties> {
        let current = self.get(id).await?;
        lifecycle::ensure_editable(current.contract.status)?;

        let terms = patch.apply(&current.contract.terms);
        ensure_date_order(&terms)?;

        let editable = [ContractStatus::Draft, ContractStatus::PendingSignature];
        if !self
            .store
            .update_contract_terms(id, &terms, &editable, Utc::now())
            .await?
        {
            let fresh = self.get(id).await?;
            lifecycle::ensure_editable(fresh.contract.status)?;
            return Err(conflict(id));
        }
        debug!(contract_id = %id, "Contract terms updated");
        self.get(id).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let current = self.get(id).await?;
        lifecycle::ensure_deletable(current.contract.status)?;
        if !self
            .store
            .delete_contract(id, ContractStatus::Draft)
            .await?
        {
            let fresh = self.get(id).await?;
            lifecycle::ensure_deletable(fresh.contract.status)?;
            return Err(conflict(id));
        }
        info!(contract_id = %id, "Draft contract deleted");
        Ok(())
    }

    // ─── Lifecycle ────────────────────────────────────────

    pub async fn send(&self, id: Uuid) -> Result<ContractWithParties> {
        let current = self.get(id).await?;
        let next = lifecycle::send_for_signature(current.contract.status)?;
        self.transition(&current, StatusUpdate::to(next)).await
    }

    pub async fn sign(&self, id: Uuid, signing: Signing) -> Result<ContractWithParties> {
        let current = self.get(id).await?;
        lifecycle::ensure_awaiting_signatures(current.contract.status, "sign")?;
        lifecycle::pending_slot(&current.parties, signing.party)?;

        let update = SignatureUpdate::Signed {
            signer_name: signing.signer_name,
            signature_data: signing.signature_data,
            signature_type: signing.signature_type,
            signature_ip: signing.ip,
            at: Utc::now(),
        };
        self.record_decision(id, signing.party, &update, "sign").await?;
        info!(contract_id = %id, party = %signing.party, "Signature recorded");

        let fresh = self.get(id).await?;
        let next = lifecycle::recompute(
            &fresh.signature_states(),
            fresh.contract.requires_guardian_signature,
            fresh.contract.requires_witness,
        );
        self.settle(fresh, next).await
    }

    pub async fn decline(
        &self,
        id: Uuid,
        party: PartyType,
        reason: String,
    ) -> Result<ContractWithParties> {
        let current = self.get(id).await?;
        lifecycle::ensure_awaiting_signatures(current.contract.status, "decline")?;
        lifecycle::pending_slot(&current.parties, party)?;

        let update = SignatureUpdate::Declined {
            reason,
            at: Utc::now(),
        };
        self.record_decision(id, party, &update, "decline").await?;
        info!(contract_id = %id, party = %party, "Signature declined");

        let fresh = self.get(id).await?;
        let next = lifecycle::status_after_decline(
            party,
            &fresh.signature_states(),
            fresh.contract.requires_guardian_signature,
            fresh.contract.requires_witness,
        );
        self.settle(fresh, next).await
    }

    pub async fn void(&self, id: Uuid, reason: String) -> Result<ContractWithParties> {
        let current = self.get(id).await?;
        let next = lifecycle::void(current.contract.status)?;
        let update = StatusUpdate {
            void_reason: Some(reason),
            ..StatusUpdate::to(next)
        };
        self.transition(&current, update).await
    }

    pub async fn activate(&self, id: Uuid) -> Result<ContractWithParties> {
        let current = self.get(id).await?;
        let next = lifecycle::activate(
            current.contract.status,
            current.contract.terms.effective_date,
            Utc::now().date_naive(),
        )?;
        self.transition(&current, StatusUpdate::to(next)).await
    }

    pub async fn expire(&self, id: Uuid) -> Result<ContractWithParties> {
        let current = self.get(id).await?;
        let next = lifecycle::expire(
            current.contract.status,
            current.contract.terms.expiration_date,
            Utc::now().date_naive(),
        )?;
        self.transition(&current, StatusUpdate::to(next)).await
    }

    // ─── Internals ────────────────────────────────────────

    /// Explicit action from the status the caller validated against.
    async fn transition(
        &self,
        current: &ContractWithParties,
        update: StatusUpdate,
    ) -> Result<ContractWithParties> {
        let id = current.contract.id;
        let from = current.contract.status;
        if !self
            .store
            .update_contract_status(id, &[from], &update)
            .await?
        {
            return Err(conflict(id));
        }
        info!(contract_id = %id, %from, to = %update.status, "Contract status changed");
        self.get(id).await
    }

    /// Conditional slot update; on a lost race re-reads the contract so the
    /// caller sees `InvalidState` or `AlreadyActed` for the write that won.
    async fn record_decision(
        &self,
        id: Uuid,
        party: PartyType,
        update: &SignatureUpdate,
        action: &'static str,
    ) -> Result<()> {
        if self
            .store
            .update_signature(id, party, SignatureStatus::Pending, update)
            .await?
        {
            return Ok(());
        }
        let fresh = self.get(id).await?;
        lifecycle::ensure_awaiting_signatures(fresh.contract.status, action)?;
        lifecycle::pending_slot(&fresh.parties, party)?;
        Err(conflict(id))
    }

    /// Moves the contract to the status implied by its signatures. Only
    /// statuses that can reach `next` in one step are overwritten, so a writer
    /// holding a stale view never moves the contract backwards.
    async fn settle(
        &self,
        fresh: ContractWithParties,
        next: ContractStatus,
    ) -> Result<ContractWithParties> {
        let id = fresh.contract.id;
        let from = fresh.contract.status;
        if from == next {
            return Ok(fresh);
        }
        let update = StatusUpdate {
            signed_at: (next == ContractStatus::FullySigned).then(Utc::now),
            ..StatusUpdate::to(next)
        };
        if self
            .store
            .update_contract_status(id, &next.predecessors(), &update)
            .await?
        {
            info!(contract_id = %id, %from, to = %next, "Contract status changed");
        } else {
            debug!(contract_id = %id, to = %next, "Status already moved by a concurrent writer");
        }
        self.get(id).await
    }
}

fn conflict(id: Uuid) -> ApiError {
    ApiError::Conflict(format!("contract {id} was modified concurrently, retry"))
}

fn ensure_date_order(terms: &ContractTerms) -> Result<()> {
    match (terms.effective_date, terms.expiration_date) {
        (Some(effective), Some(expiration)) if expiration < effective => Err(ApiError::field(
            "expiration_date",
            "must not be before effective_date",
        )),
        _ => Ok(()),
    }
}
