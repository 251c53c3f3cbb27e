//! # Types
//!
//! Shared data structures used across all modules of the GradeUp protocol.
//!
//! ## Contract status as a finite-state machine
//!
//! [`ContractStatus`] only moves forward:
//!
//! ```text
//! Draft            ──► PendingSignature
//! PendingSignature ──► PartiallySigned | FullySigned | Cancelled
//! PartiallySigned  ──► FullySigned | Cancelled
//! FullySigned      ──► Active | Expired
//! Active           ──► Expired
//! any but Voided   ──► Voided
//! ```
//!
//! `Cancelled`, `Expired` and `Voided` end the signing lifecycle. The only
//! edge leaving `Cancelled` or `Expired` is the administrative `Voided`.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::score::{AthleteProfile, ScoreComponents};

// ── Contract status ──────────────────────────────────────────────────

/// Lifecycle status of a contract document.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    /// Being drafted; the only deletable status.
    Draft,
    /// Sent out; no party has signed yet.
    PendingSignature,
    /// At least one party signed, but not every party the contract needs.
    PartiallySigned,
    /// Every required and optional party signed.
    FullySigned,
    /// In force.
    Active,
    /// Past its expiration date.
    Expired,
    /// A required party declined.
    Cancelled,
    /// Administratively voided. Irreversible.
    Voided,
}

impl ContractStatus {
    pub const ALL: [ContractStatus; 8] = [
        Self::Draft,
        Self::PendingSignature,
        Self::PartiallySigned,
        Self::FullySigned,
        Self::Active,
        Self::Expired,
        Self::Cancelled,
        Self::Voided,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingSignature => "pending_signature",
            Self::PartiallySigned => "partially_signed",
            Self::FullySigned => "fully_signed",
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
            Self::Voided => "voided",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == raw)
    }

    /// `Cancelled`, `Expired` and `Voided` end the signing lifecycle.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Expired | Self::Voided)
    }

    /// Statuses in which parties may sign or decline.
    pub fn is_awaiting_signatures(&self) -> bool {
        matches!(self, Self::PendingSignature | Self::PartiallySigned)
    }

    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Draft | Self::PendingSignature)
    }

    pub fn is_deletable(&self) -> bool {
        matches!(self, Self::Draft)
    }

    /// Whether `self -> to` is an edge of the status graph.
    pub fn can_transition_to(&self, to: ContractStatus) -> bool {
        use ContractStatus::*;
        match (self, to) {
            (Voided, _) => false,
            (_, Voided) => true,
            (Draft, PendingSignature) => true,
            (PendingSignature, PartiallySigned | FullySigned | Cancelled) => true,
            (PartiallySigned, FullySigned | Cancelled) => true,
            (FullySigned, Active | Expired) => true,
            (Active, Expired) => true,
            _ => false,
        }
    }

    /// Every status from which `self` can be reached in one step.
    ///
    /// Stores use this as the `expected` set of a conditional status update so
    /// that a stale writer can never move a contract backwards.
    pub fn predecessors(&self) -> Vec<ContractStatus> {
        Self::ALL
            .into_iter()
            .filter(|from| from.can_transition_to(*self))
            .collect()
    }
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Signatures ───────────────────────────────────────────────────────

/// Role of a contract signer.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyType {
    Athlete,
    Brand,
    Guardian,
    Witness,
}

impl PartyType {
    pub const ALL: [PartyType; 4] = [Self::Athlete, Self::Brand, Self::Guardian, Self::Witness];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Athlete => "athlete",
            Self::Brand => "brand",
            Self::Guardian => "guardian",
            Self::Witness => "witness",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == raw)
    }

    /// Athlete and brand must sign every contract; their decline cancels it.
    pub fn is_required(&self) -> bool {
        matches!(self, Self::Athlete | Self::Brand)
    }
}

impl fmt::Display for PartyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureStatus {
    Pending,
    Signed,
    Declined,
    Expired,
}

impl SignatureStatus {
    pub const ALL: [SignatureStatus; 4] =
        [Self::Pending, Self::Signed, Self::Declined, Self::Expired];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Signed => "signed",
            Self::Declined => "declined",
            Self::Expired => "expired",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == raw)
    }
}

impl fmt::Display for SignatureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the signature image was captured.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureType {
    Drawn,
    Typed,
    Uploaded,
}

impl SignatureType {
    pub const ALL: [SignatureType; 3] = [Self::Drawn, Self::Typed, Self::Uploaded];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Drawn => "drawn",
            Self::Typed => "typed",
            Self::Uploaded => "uploaded",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == raw)
    }
}

/// One signature slot on a contract. Exactly one per party type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContractSignature {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub party_type: PartyType,
    pub signer_name: Option<String>,
    #[serde(rename = "signature_status")]
    pub status: SignatureStatus,
    pub signature_data: Option<String>,
    pub signature_type: Option<SignatureType>,
    pub signed_at: Option<DateTime<Utc>>,
    pub signature_ip: Option<String>,
    pub decline_reason: Option<String>,
    pub declined_at: Option<DateTime<Utc>>,
}

impl ContractSignature {
    /// A fresh `pending` slot for `party_type`.
    pub fn pending(contract_id: Uuid, party_type: PartyType) -> Self {
        Self {
            id: Uuid::new_v4(),
            contract_id,
            party_type,
            signer_name: None,
            status: SignatureStatus::Pending,
            signature_data: None,
            signature_type: None,
            signed_at: None,
            signature_ip: None,
            decline_reason: None,
            declined_at: None,
        }
    }
}

// ── Contracts ────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compensation {
    /// Minor currency units.
    pub amount: i64,
    pub currency: String,
    pub terms: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clause {
    pub title: String,
    pub body: String,
}

/// The editable part of a contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractTerms {
    pub title: String,
    pub compensation: Compensation,
    pub clauses: Vec<Clause>,
    pub effective_date: Option<NaiveDate>,
    pub expiration_date: Option<NaiveDate>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: Uuid,
    pub deal_id: Uuid,
    pub status: ContractStatus,
    #[serde(flatten)]
    pub terms: ContractTerms,
    pub requires_guardian_signature: bool,
    pub requires_witness: bool,
    pub signed_at: Option<DateTime<Utc>>,
    pub voided_at: Option<DateTime<Utc>>,
    pub void_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contract {
    /// A new `draft` contract together with one pending slot per party it needs.
    pub fn draft(
        deal_id: Uuid,
        terms: ContractTerms,
        requires_guardian_signature: bool,
        requires_witness: bool,
        now: DateTime<Utc>,
    ) -> ContractWithParties {
        let contract = Contract {
            id: Uuid::new_v4(),
            deal_id,
            status: ContractStatus::Draft,
            terms,
            requires_guardian_signature,
            requires_witness,
            signed_at: None,
            voided_at: None,
            void_reason: None,
            created_at: now,
            updated_at: now,
        };
        let parties = crate::lifecycle::parties_for(requires_guardian_signature, requires_witness)
            .into_iter()
            .map(|party| ContractSignature::pending(contract.id, party))
            .collect();
        ContractWithParties { contract, parties }
    }
}

/// A contract with every signature slot, the aggregate all transitions return.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContractWithParties {
    #[serde(flatten)]
    pub contract: Contract,
    pub parties: Vec<ContractSignature>,
}

impl ContractWithParties {
    pub fn party(&self, party_type: PartyType) -> Option<&ContractSignature> {
        self.parties.iter().find(|p| p.party_type == party_type)
    }

    /// `(party, status)` pairs, the input shape of [`crate::lifecycle::recompute`].
    pub fn signature_states(&self) -> Vec<(PartyType, SignatureStatus)> {
        self.parties
            .iter()
            .map(|p| (p.party_type, p.status))
            .collect()
    }
}

// ── Athletes & scores ────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Athlete {
    pub id: Uuid,
    pub name: String,
    pub sport: String,
    #[serde(flatten)]
    pub profile: AthleteProfile,
}

/// One appended GradeUp calculation. History rows are never mutated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub id: Uuid,
    pub athlete_id: Uuid,
    #[serde(flatten)]
    pub components: ScoreComponents,
    pub calculated_at: DateTime<Utc>,
}

// ── Campaigns ────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Draft,
    Active,
    Paused,
    Completed,
    Cancelled,
}

impl CampaignStatus {
    pub const ALL: [CampaignStatus; 5] = [
        Self::Draft,
        Self::Active,
        Self::Paused,
        Self::Completed,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == raw)
    }
}

/// A brand's sponsorship campaign that deals are sourced from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    pub brand_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    /// Minor currency units.
    pub budget: i64,
    pub currency: String,
    pub status: CampaignStatus,
    pub sports: Vec<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

// ── Deals & payments ─────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealStatus {
    Draft,
    Active,
    Completed,
    Cancelled,
}

impl DealStatus {
    pub const ALL: [DealStatus; 4] = [Self::Draft, Self::Active, Self::Completed, Self::Cancelled];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == raw)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deal {
    pub id: Uuid,
    pub athlete_id: Uuid,
    pub brand_id: Uuid,
    /// Gross amount in minor currency units.
    pub amount: i64,
    pub currency: String,
    pub status: DealStatus,
    /// Gateway account that receives the athlete's share.
    pub athlete_account_id: Option<String>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Succeeded,
    Failed,
    Refunded,
    PartiallyRefunded,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 6] = [
        Self::Pending,
        Self::Processing,
        Self::Succeeded,
        Self::Failed,
        Self::Refunded,
        Self::PartiallyRefunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
            Self::PartiallyRefunded => "partially_refunded",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == raw)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment for a completed deal. After creation only webhook events move it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub deal_id: Uuid,
    pub payment_intent_id: String,
    pub amount: i64,
    pub platform_fee: i64,
    pub athlete_amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub amount_refunded: i64,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
