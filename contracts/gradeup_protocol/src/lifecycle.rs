//! # Lifecycle
//!
//! Contract signature state machine. Every function decides the next status
//! from the current one (and, for signing events, from the full signature
//! set); none of them touch storage.
//!
//! | Event                | Allowed from                         | Result                          |
//! |----------------------|--------------------------------------|---------------------------------|
//! | `send_for_signature` | `draft`                              | `pending_signature`             |
//! | sign                 | `pending_signature`, `partially_signed` | [`recompute`]                |
//! | decline              | `pending_signature`, `partially_signed` | [`status_after_decline`]     |
//! | `void`               | anything but `voided`                | `voided`                        |
//! | `activate`           | `fully_signed`, effective date reached | `active`                      |
//! | `expire`             | `fully_signed`, `active`, past expiration | `expired`                  |

use chrono::NaiveDate;

use crate::types::{ContractSignature, ContractStatus, PartyType, SignatureStatus};
use crate::{Error, Result};

/// Parties that get a signature slot when a contract is drafted.
pub fn parties_for(requires_guardian: bool, requires_witness: bool) -> Vec<PartyType> {
    let mut parties = vec![PartyType::Athlete, PartyType::Brand];
    if requires_guardian {
        parties.push(PartyType::Guardian);
    }
    if requires_witness {
        parties.push(PartyType::Witness);
    }
    parties
}

pub fn ensure_editable(status: ContractStatus) -> Result<()> {
    if status.is_editable() {
        Ok(())
    } else {
        Err(Error::InvalidState {
            action: "edit",
            status,
        })
    }
}

pub fn ensure_deletable(status: ContractStatus) -> Result<()> {
    if status.is_deletable() {
        Ok(())
    } else {
        Err(Error::InvalidState {
            action: "delete",
            status,
        })
    }
}

/// `draft -> pending_signature`.
pub fn send_for_signature(status: ContractStatus) -> Result<ContractStatus> {
    match status {
        ContractStatus::Draft => Ok(ContractStatus::PendingSignature),
        _ => Err(Error::InvalidState {
            action: "send",
            status,
        }),
    }
}

/// Contract-level precondition shared by sign and decline.
pub fn ensure_awaiting_signatures(status: ContractStatus, action: &'static str) -> Result<()> {
    if status.is_awaiting_signatures() {
        Ok(())
    } else {
        Err(Error::InvalidState { action, status })
    }
}

/// Finds the slot of `party` and checks it has not been acted on yet.
pub fn pending_slot(
    parties: &[ContractSignature],
    party: PartyType,
) -> Result<&ContractSignature> {
    let slot = parties
        .iter()
        .find(|p| p.party_type == party)
        .ok_or(Error::SignatureNotFound(party))?;
    match slot.status {
        SignatureStatus::Pending => Ok(slot),
        status => Err(Error::AlreadyActed { party, status }),
    }
}

/// Contract status implied by the full signature set.
///
/// * not every athlete/brand slot signed: `partially_signed` if anyone signed,
///   `pending_signature` otherwise;
/// * athlete and brand signed: `fully_signed` once the guardian and witness
///   are each signed or not required, `partially_signed` otherwise.
pub fn recompute(
    signatures: &[(PartyType, SignatureStatus)],
    requires_guardian: bool,
    requires_witness: bool,
) -> ContractStatus {
    let signed = |party: PartyType| {
        signatures
            .iter()
            .any(|(p, s)| *p == party && *s == SignatureStatus::Signed)
    };

    let all_required_signed = signatures
        .iter()
        .filter(|(p, _)| p.is_required())
        .all(|(_, s)| *s == SignatureStatus::Signed);

    if !all_required_signed {
        let any_signed = signatures
            .iter()
            .any(|(_, s)| *s == SignatureStatus::Signed);
        return if any_signed {
            ContractStatus::PartiallySigned
        } else {
            ContractStatus::PendingSignature
        };
    }

    let guardian_ok = !requires_guardian || signed(PartyType::Guardian);
    let witness_ok = !requires_witness || signed(PartyType::Witness);
    if guardian_ok && witness_ok {
        ContractStatus::FullySigned
    } else {
        ContractStatus::PartiallySigned
    }
}

/// Status after `party` declined. A required party's decline always cancels;
/// anyone else's decline leaves the status to [`recompute`].
pub fn status_after_decline(
    party: PartyType,
    signatures: &[(PartyType, SignatureStatus)],
    requires_guardian: bool,
    requires_witness: bool,
) -> ContractStatus {
    if party.is_required() {
        ContractStatus::Cancelled
    } else {
        recompute(signatures, requires_guardian, requires_witness)
    }
}

/// Any status except `voided` may be voided.
pub fn void(status: ContractStatus) -> Result<ContractStatus> {
    match status {
        ContractStatus::Voided => Err(Error::InvalidState {
            action: "void",
            status,
        }),
        _ => Ok(ContractStatus::Voided),
    }
}

/// `fully_signed -> active` once the effective date (if any) has arrived.
pub fn activate(
    status: ContractStatus,
    effective_date: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<ContractStatus> {
    if status != ContractStatus::FullySigned {
        return Err(Error::InvalidState {
            action: "activate",
            status,
        });
    }
    match effective_date {
        Some(date) if date > today => Err(Error::NotYetEffective(date)),
        _ => Ok(ContractStatus::Active),
    }
}

/// `fully_signed | active -> expired` once the expiration date has passed.
pub fn expire(
    status: ContractStatus,
    expiration_date: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<ContractStatus> {
    if !matches!(status, ContractStatus::FullySigned | ContractStatus::Active) {
        return Err(Error::InvalidState {
            action: "expire",
            status,
        });
    }
    match expiration_date {
        Some(date) if date < today => Ok(ContractStatus::Expired),
        Some(date) => Err(Error::NotYetExpired(date)),
        None => Err(Error::NoExpirationDate),
    }
}
