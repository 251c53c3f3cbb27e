use chrono::{NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use crate::invariants::{
    assert_all_contract_invariants, assert_decision_unchanged, assert_valid_status_transition,
};
use crate::lifecycle::{self, recompute, status_after_decline};
use crate::types::{
    Compensation, Contract, ContractStatus, ContractTerms, ContractWithParties, PartyType,
    SignatureStatus,
};
use crate::Error;

use ContractStatus::*;
use PartyType::*;
use SignatureStatus::{Declined, Pending, Signed};

fn terms() -> ContractTerms {
    ContractTerms {
        title: "Spring social campaign".to_string(),
        compensation: Compensation {
            amount: 250_000,
            currency: "usd".to_string(),
            terms: Some("Net 30".to_string()),
        },
        clauses: vec![],
        effective_date: NaiveDate::from_ymd_opt(2025, 3, 1),
        expiration_date: NaiveDate::from_ymd_opt(2025, 9, 1),
    }
}

fn draft(guardian: bool, witness: bool) -> ContractWithParties {
    let now = Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap();
    Contract::draft(Uuid::new_v4(), terms(), guardian, witness, now)
}

fn sent(guardian: bool, witness: bool) -> ContractWithParties {
    let mut c = draft(guardian, witness);
    c.contract.status = lifecycle::send_for_signature(c.contract.status).unwrap();
    c
}

/// Applies a signing event the way the backend does: check, mark, recompute.
fn sign(c: &mut ContractWithParties, party: PartyType) -> Result<ContractStatus, Error> {
    lifecycle::ensure_awaiting_signatures(c.contract.status, "sign")?;
    lifecycle::pending_slot(&c.parties, party)?;
    let now = Utc::now();
    let slot = c
        .parties
        .iter_mut()
        .find(|p| p.party_type == party)
        .unwrap();
    slot.status = Signed;
    slot.signed_at = Some(now);

    let next = recompute(
        &c.signature_states(),
        c.contract.requires_guardian_signature,
        c.contract.requires_witness,
    );
    if next != c.contract.status {
        assert_valid_status_transition(c.contract.status, next);
        c.contract.status = next;
        if next == FullySigned {
            c.contract.signed_at = Some(now);
        }
    }
    assert_all_contract_invariants(c);
    Ok(c.contract.status)
}

fn decline(c: &mut ContractWithParties, party: PartyType) -> Result<ContractStatus, Error> {
    lifecycle::ensure_awaiting_signatures(c.contract.status, "decline")?;
    lifecycle::pending_slot(&c.parties, party)?;
    let slot = c
        .parties
        .iter_mut()
        .find(|p| p.party_type == party)
        .unwrap();
    slot.status = Declined;
    slot.decline_reason = Some("terms not acceptable".to_string());

    let next = status_after_decline(
        party,
        &c.signature_states(),
        c.contract.requires_guardian_signature,
        c.contract.requires_witness,
    );
    if next != c.contract.status {
        assert_valid_status_transition(c.contract.status, next);
        c.contract.status = next;
    }
    Ok(c.contract.status)
}

// ── recompute state table ────────────────────────────────────────────

#[test]
fn test_recompute_required_only_table() {
    let cases = [
        (Pending, Pending, PendingSignature),
        (Signed, Pending, PartiallySigned),
        (Pending, Signed, PartiallySigned),
        (Signed, Signed, FullySigned),
        (Declined, Pending, PendingSignature),
        (Declined, Signed, PartiallySigned),
    ];
    for (athlete, brand, expected) in cases {
        let got = recompute(&[(Athlete, athlete), (Brand, brand)], false, false);
        assert_eq!(got, expected, "athlete={athlete:?} brand={brand:?}");
    }
}

#[test]
fn test_recompute_exhaustive_with_optional_parties() {
    let states = [Pending, Signed, Declined];
    for requires_guardian in [false, true] {
        for requires_witness in [false, true] {
            for a in states {
                for b in states {
                    for g in states {
                        for w in states {
                            let mut sigs = vec![(Athlete, a), (Brand, b)];
                            if requires_guardian {
                                sigs.push((Guardian, g));
                            }
                            if requires_witness {
                                sigs.push((Witness, w));
                            }
                            let got = recompute(&sigs, requires_guardian, requires_witness);

                            let any_signed = sigs.iter().any(|(_, s)| *s == Signed);
                            let required_done = a == Signed && b == Signed;
                            let guardian_ok = !requires_guardian || g == Signed;
                            let witness_ok = !requires_witness || w == Signed;
                            let expected = if required_done && guardian_ok && witness_ok {
                                FullySigned
                            } else if any_signed {
                                PartiallySigned
                            } else {
                                PendingSignature
                            };
                            assert_eq!(got, expected, "{sigs:?}");
                        }
                    }
                }
            }
        }
    }
}

#[test]
fn test_recompute_missing_guardian_slot_is_not_satisfied() {
    let got = recompute(&[(Athlete, Signed), (Brand, Signed)], true, false);
    assert_eq!(got, PartiallySigned);
}

// ── end-to-end transitions ───────────────────────────────────────────

#[test]
fn test_draft_creates_expected_slots() {
    let c = draft(true, false);
    assert_eq!(c.contract.status, Draft);
    let parties: Vec<_> = c.parties.iter().map(|p| p.party_type).collect();
    assert_eq!(parties, vec![Athlete, Brand, Guardian]);
    assert!(c.parties.iter().all(|p| p.status == Pending));
    assert_all_contract_invariants(&c);
}

#[test]
fn test_send_only_from_draft() {
    assert_eq!(lifecycle::send_for_signature(Draft), Ok(PendingSignature));
    for status in ContractStatus::ALL.into_iter().filter(|s| *s != Draft) {
        assert_eq!(
            lifecycle::send_for_signature(status),
            Err(Error::InvalidState {
                action: "send",
                status
            })
        );
    }
}

#[test]
fn test_athlete_then_brand_reaches_fully_signed() {
    let mut c = sent(false, false);
    assert_eq!(sign(&mut c, Athlete), Ok(PartiallySigned));
    assert!(c.contract.signed_at.is_none());
    assert_eq!(sign(&mut c, Brand), Ok(FullySigned));
    assert!(c.contract.signed_at.is_some());
}

#[test]
fn test_signing_never_skips_to_active() {
    let mut c = sent(false, false);
    sign(&mut c, Brand).unwrap();
    let status = sign(&mut c, Athlete).unwrap();
    assert_eq!(status, FullySigned);
    assert_ne!(status, Active);
}

#[test]
fn test_guardian_required_keeps_partially_signed() {
    let mut c = sent(true, false);
    sign(&mut c, Athlete).unwrap();
    assert_eq!(sign(&mut c, Brand), Ok(PartiallySigned));
    assert_eq!(sign(&mut c, Guardian), Ok(FullySigned));
}

#[test]
fn test_guardian_first_is_partially_signed() {
    let mut c = sent(true, true);
    assert_eq!(sign(&mut c, Guardian), Ok(PartiallySigned));
    sign(&mut c, Witness).unwrap();
    sign(&mut c, Athlete).unwrap();
    assert_eq!(sign(&mut c, Brand), Ok(FullySigned));
}

#[test]
fn test_cannot_sign_draft() {
    let mut c = draft(false, false);
    assert_eq!(
        sign(&mut c, Athlete),
        Err(Error::InvalidState {
            action: "sign",
            status: Draft
        })
    );
}

#[test]
fn test_cannot_sign_twice() {
    let mut c = sent(false, false);
    sign(&mut c, Athlete).unwrap();
    let before = c.party(Athlete).unwrap().clone();
    assert_eq!(
        sign(&mut c, Athlete),
        Err(Error::AlreadyActed {
            party: Athlete,
            status: Signed
        })
    );
    assert_eq!(c.party(Athlete).unwrap(), &before);
}

#[test]
fn test_cannot_decline_after_signing() {
    let mut c = sent(false, false);
    sign(&mut c, Athlete).unwrap();
    assert_eq!(
        decline(&mut c, Athlete),
        Err(Error::AlreadyActed {
            party: Athlete,
            status: Signed
        })
    );
    assert_decision_unchanged(Signed, c.party(Athlete).unwrap().status);
}

#[test]
fn test_unrequired_party_has_no_slot() {
    let mut c = sent(false, false);
    assert_eq!(sign(&mut c, Guardian), Err(Error::SignatureNotFound(Guardian)));
}

#[test]
fn test_required_decline_cancels_regardless_of_other_signatures() {
    for decliner in [Athlete, Brand] {
        for other_signed in [false, true] {
            let mut c = sent(true, true);
            if other_signed {
                let other = if decliner == Athlete { Brand } else { Athlete };
                sign(&mut c, other).unwrap();
                sign(&mut c, Guardian).unwrap();
                sign(&mut c, Witness).unwrap();
            }
            assert_eq!(decline(&mut c, decliner), Ok(Cancelled));
            assert!(sign(&mut c, decliner).is_err());
        }
    }
}

#[test]
fn test_guardian_decline_does_not_cancel() {
    let mut c = sent(true, false);
    sign(&mut c, Athlete).unwrap();
    assert_eq!(decline(&mut c, Guardian), Ok(PartiallySigned));
    assert_eq!(sign(&mut c, Brand), Ok(PartiallySigned));
}

#[test]
fn test_void_from_every_status_but_voided() {
    for status in ContractStatus::ALL {
        match lifecycle::void(status) {
            Ok(next) => {
                assert_ne!(status, Voided);
                assert_eq!(next, Voided);
                assert_valid_status_transition(status, next);
            }
            Err(err) => {
                assert_eq!(status, Voided);
                assert_eq!(
                    err,
                    Error::InvalidState {
                        action: "void",
                        status: Voided
                    }
                );
            }
        }
    }
}

#[test]
fn test_nothing_leaves_voided() {
    for to in ContractStatus::ALL {
        assert!(!Voided.can_transition_to(to));
    }
    assert!(lifecycle::send_for_signature(Voided).is_err());
    assert!(lifecycle::ensure_awaiting_signatures(Voided, "sign").is_err());
    let today = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
    assert!(lifecycle::activate(Voided, None, today).is_err());
    assert!(lifecycle::expire(Voided, None, today).is_err());
}

#[test]
fn test_activate_waits_for_effective_date() {
    let effective = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
    let before = NaiveDate::from_ymd_opt(2025, 2, 28).unwrap();
    assert_eq!(
        lifecycle::activate(FullySigned, Some(effective), before),
        Err(Error::NotYetEffective(effective))
    );
    assert_eq!(
        lifecycle::activate(FullySigned, Some(effective), effective),
        Ok(Active)
    );
    assert_eq!(lifecycle::activate(FullySigned, None, before), Ok(Active));
    assert!(lifecycle::activate(PartiallySigned, None, before).is_err());
}

#[test]
fn test_expire_after_expiration_date() {
    let expiration = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
    let after = NaiveDate::from_ymd_opt(2025, 9, 2).unwrap();
    assert_eq!(lifecycle::expire(Active, Some(expiration), after), Ok(Expired));
    assert_eq!(
        lifecycle::expire(Active, Some(expiration), expiration),
        Err(Error::NotYetExpired(expiration))
    );
    assert_eq!(
        lifecycle::expire(Active, None, after),
        Err(Error::NoExpirationDate)
    );
    assert!(lifecycle::expire(PendingSignature, Some(expiration), after).is_err());
}

#[test]
fn test_edit_and_delete_rules() {
    for status in ContractStatus::ALL {
        assert_eq!(
            lifecycle::ensure_editable(status).is_ok(),
            matches!(status, Draft | PendingSignature)
        );
        assert_eq!(lifecycle::ensure_deletable(status).is_ok(), status == Draft);
    }
}

#[test]
fn test_predecessors_match_graph() {
    assert_eq!(PendingSignature.predecessors(), vec![Draft]);
    assert_eq!(FullySigned.predecessors(), vec![PendingSignature, PartiallySigned]);
    assert_eq!(Cancelled.predecessors(), vec![PendingSignature, PartiallySigned]);
    assert!(!PartiallySigned.predecessors().contains(&PartiallySigned));
    assert_eq!(Voided.predecessors().len(), ContractStatus::ALL.len() - 1);
}

#[test]
fn test_status_strings_round_trip() {
    for status in ContractStatus::ALL {
        assert_eq!(ContractStatus::parse(status.as_str()), Some(status));
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, format!("\"{}\"", status.as_str()));
    }
    assert_eq!(ContractStatus::parse("signed"), None);
}
