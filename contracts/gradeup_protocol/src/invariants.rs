#![allow(dead_code)]

use crate::score::{ScoreComponents, MAX_ACADEMIC, MAX_ATHLETIC, MAX_SOCIAL, MAX_TOTAL};
use crate::types::{ContractStatus, ContractWithParties, PartyType, SignatureStatus};

/// INV-1: Each party type appears at most once per contract.
pub fn assert_one_slot_per_party(contract: &ContractWithParties) {
    for party in PartyType::ALL {
        let count = contract
            .parties
            .iter()
            .filter(|p| p.party_type == party)
            .count();
        assert!(
            count <= 1,
            "INV-1 violated: contract {} has {} {} slots",
            contract.contract.id,
            count,
            party
        );
    }
}

/// INV-2: Athlete and brand slots always exist.
pub fn assert_required_parties_present(contract: &ContractWithParties) {
    for party in [PartyType::Athlete, PartyType::Brand] {
        assert!(
            contract.party(party).is_some(),
            "INV-2 violated: contract {} has no {} slot",
            contract.contract.id,
            party
        );
    }
}

/// INV-3: Guardian/witness slots exist exactly when the contract requires them.
pub fn assert_optional_parties_match_flags(contract: &ContractWithParties) {
    assert_eq!(
        contract.party(PartyType::Guardian).is_some(),
        contract.contract.requires_guardian_signature,
        "INV-3 violated: guardian slot does not match requires_guardian_signature"
    );
    assert_eq!(
        contract.party(PartyType::Witness).is_some(),
        contract.contract.requires_witness,
        "INV-3 violated: witness slot does not match requires_witness"
    );
}

/// INV-4: A status change follows an edge of the status graph.
pub fn assert_valid_status_transition(from: ContractStatus, to: ContractStatus) {
    assert!(
        from.can_transition_to(to),
        "INV-4 violated: invalid status transition from {:?} to {:?}",
        from,
        to
    );
}

/// INV-5: A slot that left `pending` never changes again.
pub fn assert_decision_unchanged(before: SignatureStatus, after: SignatureStatus) {
    if before != SignatureStatus::Pending {
        assert_eq!(
            before, after,
            "INV-5 violated: recorded decision {:?} changed to {:?}",
            before, after
        );
    }
}

/// INV-6: `fully_signed` always carries `signed_at`.
pub fn assert_fully_signed_has_timestamp(contract: &ContractWithParties) {
    if contract.contract.status == ContractStatus::FullySigned {
        assert!(
            contract.contract.signed_at.is_some(),
            "INV-6 violated: fully signed contract {} has no signed_at",
            contract.contract.id
        );
    }
}

/// INV-7: Score components stay within their bounds and add up.
pub fn assert_score_bounds(score: &ScoreComponents) {
    assert!(score.athletic_score <= MAX_ATHLETIC, "INV-7 violated: athletic {}", score.athletic_score);
    assert!(score.social_score <= MAX_SOCIAL, "INV-7 violated: social {}", score.social_score);
    assert!(score.academic_score <= MAX_ACADEMIC, "INV-7 violated: academic {}", score.academic_score);
    assert!(score.total <= MAX_TOTAL, "INV-7 violated: total {}", score.total);
    assert_eq!(
        score.total,
        score.athletic_score + score.social_score + score.academic_score,
        "INV-7 violated: total is not the sum of its components"
    );
}

/// Run all stateless contract invariants.
pub fn assert_all_contract_invariants(contract: &ContractWithParties) {
    assert_one_slot_per_party(contract);
    assert_required_parties_present(contract);
    assert_optional_parties_match_flags(contract);
    assert_fully_signed_has_timestamp(contract);
}
