//! # GradeUp Protocol
//!
//! Deterministic domain rules of the GradeUp NIL marketplace, with no I/O.
//! The `gradeup-api` backend drives these rules against its store; every
//! function here is pure and can be tested in isolation.
//!
//! | Area               | Entry Point(s)                                             |
//! |--------------------|------------------------------------------------------------|
//! | Contract lifecycle | [`lifecycle::send_for_signature`], [`lifecycle::recompute`], [`lifecycle::status_after_decline`], [`lifecycle::void`] |
//! | Editing rules      | [`lifecycle::ensure_editable`], [`lifecycle::ensure_deletable`] |
//! | Scoring            | [`score::calculate`], [`score::Grade::from_total`], [`score::Trend::from_history`] |
//! | Payments           | [`payments::split_fee`], [`payments::next_status`]         |
//!
//! ## Architecture
//!
//! Persistence is not modelled here. Callers load a contract with its
//! signature rows, ask this crate for the next status, and write it back with
//! a conditional update keyed on [`ContractStatus::predecessors`]. That keeps
//! concurrent signers from moving a contract backwards along the status graph.

pub mod lifecycle;
pub mod payments;
pub mod score;
mod types;

#[cfg(test)]
mod invariants;
#[cfg(test)]
mod test_lifecycle;
#[cfg(test)]
mod test_score;

pub use types::{
    Athlete, Campaign, CampaignStatus, Clause, Compensation, Contract, ContractSignature,
    ContractStatus, ContractTerms, ContractWithParties, Deal, DealStatus, PartyType, Payment,
    PaymentStatus, ScoreRecord, SignatureStatus, SignatureType,
};

use thiserror::Error;

/// Every way a protocol rule can refuse an operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("cannot {action} a contract in status {status}")]
    InvalidState {
        action: &'static str,
        status: ContractStatus,
    },

    #[error("no {0} signature is attached to this contract")]
    SignatureNotFound(PartyType),

    #[error("{party} has already {status} this contract")]
    AlreadyActed {
        party: PartyType,
        status: SignatureStatus,
    },

    #[error("contract is not effective until {0}")]
    NotYetEffective(chrono::NaiveDate),

    #[error("contract does not expire until {0}")]
    NotYetExpired(chrono::NaiveDate),

    #[error("contract has no expiration date")]
    NoExpirationDate,

    #[error("invalid amount: {0}")]
    InvalidAmount(i64),

    #[error("invalid fee basis points: {0}")]
    InvalidFee(u32),
}

pub type Result<T> = std::result::Result<T, Error>;
