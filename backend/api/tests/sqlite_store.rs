use chrono::{Duration, NaiveDate, Utc};
use gradeup_api::db;
use gradeup_api::store::sqlite::SqliteStore;
use gradeup_api::store::{
    AthleteStore, CampaignFilter, CampaignStore, ContractStore, PaymentStore, PaymentUpdate,
    ScoreStore, SignatureUpdate, StatusUpdate,
};
use gradeup_protocol::score::{self, AthleteProfile, MajorCategory, SportTier};
use gradeup_protocol::{
    Athlete, Campaign, CampaignStatus, Clause, Compensation, Contract, ContractStatus,
    ContractTerms, Deal, DealStatus, PartyType, Payment, PaymentStatus, ScoreRecord,
    SignatureStatus, SignatureType,
};
use uuid::Uuid;

async fn store() -> SqliteStore {
    SqliteStore::new(db::init_pool("sqlite::memory:").await.unwrap())
}

fn terms() -> ContractTerms {
    ContractTerms {
        title: "Camp appearance".to_string(),
        compensation: Compensation {
            amount: 75_000,
            currency: "USD".to_string(),
            terms: None,
        },
        clauses: vec![Clause {
            title: "Appearance".to_string(),
            body: "Two hours on site.".to_string(),
        }],
        effective_date: NaiveDate::from_ymd_opt(2025, 7, 1),
        expiration_date: NaiveDate::from_ymd_opt(2025, 8, 31),
    }
}

#[tokio::test]
async fn contract_round_trip_and_conditional_updates() {
    let store = store().await;
    let draft = Contract::draft(Uuid::new_v4(), terms(), true, false, Utc::now());
    let id = draft.contract.id;
    store.insert_contract(&draft).await.unwrap();

    let loaded = store.get_contract(id).await.unwrap().unwrap();
    assert_eq!(loaded.contract.terms, draft.contract.terms);
    assert_eq!(loaded.contract.status, ContractStatus::Draft);
    let parties: Vec<PartyType> = loaded.parties.iter().map(|p| p.party_type).collect();
    assert_eq!(parties, vec![PartyType::Athlete, PartyType::Brand, PartyType::Guardian]);

    // Wrong expected status leaves the row alone.
    let send = StatusUpdate::to(ContractStatus::PendingSignature);
    assert!(!store
        .update_contract_status(id, &[ContractStatus::Active], &send)
        .await
        .unwrap());
    assert!(store
        .update_contract_status(id, &[ContractStatus::Draft], &send)
        .await
        .unwrap());

    let signed = SignatureUpdate::Signed {
        signer_name: Some("Avery".to_string()),
        signature_data: "typed:Avery".to_string(),
        signature_type: SignatureType::Typed,
        signature_ip: Some("192.0.2.1".to_string()),
        at: Utc::now(),
    };
    assert!(store
        .update_signature(id, PartyType::Athlete, SignatureStatus::Pending, &signed)
        .await
        .unwrap());
    assert!(!store
        .update_signature(id, PartyType::Athlete, SignatureStatus::Pending, &signed)
        .await
        .unwrap());

    let reloaded = store.get_contract(id).await.unwrap().unwrap();
    let athlete = reloaded.party(PartyType::Athlete).unwrap();
    assert_eq!(athlete.status, SignatureStatus::Signed);
    assert_eq!(athlete.signature_type, Some(SignatureType::Typed));
    assert_eq!(athlete.signer_name.as_deref(), Some("Avery"));

    let void = StatusUpdate {
        void_reason: Some("superseded".to_string()),
        ..StatusUpdate::to(ContractStatus::Voided)
    };
    assert!(store
        .update_contract_status(id, &ContractStatus::Voided.predecessors(), &void)
        .await
        .unwrap());
    let voided = store.get_contract(id).await.unwrap().unwrap();
    assert_eq!(voided.contract.void_reason.as_deref(), Some("superseded"));
    assert!(voided.contract.voided_at.is_some());

    // Only drafts are deletable.
    assert!(!store.delete_contract(id, ContractStatus::Draft).await.unwrap());
}

#[tokio::test]
async fn signature_is_not_recorded_on_a_cancelled_contract() {
    let store = store().await;
    let draft = Contract::draft(Uuid::new_v4(), terms(), false, false, Utc::now());
    let id = draft.contract.id;
    store.insert_contract(&draft).await.unwrap();
    assert!(store
        .update_contract_status(
            id,
            &[ContractStatus::Draft],
            &StatusUpdate::to(ContractStatus::PendingSignature),
        )
        .await
        .unwrap());

    // Brand declines and the contract is cancelled before the athlete writes.
    assert!(store
        .update_contract_status(
            id,
            &ContractStatus::Cancelled.predecessors(),
            &StatusUpdate::to(ContractStatus::Cancelled),
        )
        .await
        .unwrap());

    let signed = SignatureUpdate::Signed {
        signer_name: None,
        signature_data: "typed:Jordan".to_string(),
        signature_type: SignatureType::Typed,
        signature_ip: None,
        at: Utc::now(),
    };
    assert!(!store
        .update_signature(id, PartyType::Athlete, SignatureStatus::Pending, &signed)
        .await
        .unwrap());
    let declined = SignatureUpdate::Declined {
        reason: "too late".to_string(),
        at: Utc::now(),
    };
    assert!(!store
        .update_signature(id, PartyType::Athlete, SignatureStatus::Pending, &declined)
        .await
        .unwrap());

    let loaded = store.get_contract(id).await.unwrap().unwrap();
    assert_eq!(loaded.contract.status, ContractStatus::Cancelled);
    let athlete = loaded.party(PartyType::Athlete).unwrap();
    assert_eq!(athlete.status, SignatureStatus::Pending);
    assert!(athlete.signature_data.is_none());
}

#[tokio::test]
async fn draft_delete_removes_signature_rows() {
    let store = store().await;
    let deal_id = Uuid::new_v4();
    let draft = Contract::draft(deal_id, terms(), false, true, Utc::now());
    store.insert_contract(&draft).await.unwrap();
    assert_eq!(store.list_contracts_for_deal(deal_id).await.unwrap().len(), 1);

    assert!(store
        .delete_contract(draft.contract.id, ContractStatus::Draft)
        .await
        .unwrap());
    assert!(store.get_contract(draft.contract.id).await.unwrap().is_none());
    assert!(store.list_contracts_for_deal(deal_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn score_history_is_newest_first_and_leaderboard_uses_latest() {
    let store = store().await;
    let athlete = Athlete {
        id: Uuid::new_v4(),
        name: "Casey Moreno".to_string(),
        sport: "softball".to_string(),
        profile: AthleteProfile {
            sport_tier: SportTier::Tier3,
            athletic_rating: 64.0,
            deals_completed: 2,
            avg_deal_rating: 3.9,
            total_followers: 12_500,
            gpa: 3.2,
            cumulative_gpa: None,
            term_gpas: vec![3.1, 3.3],
            major_category: MajorCategory::PreMed,
            grades_verified: true,
            enrollment_verified: true,
            sport_verified: false,
        },
    };
    store.upsert_athlete(&athlete).await.unwrap();
    assert_eq!(store.get_athlete(athlete.id).await.unwrap().unwrap(), athlete);

    let mut oversized = athlete.clone();
    oversized.profile.total_followers = u64::MAX;
    assert!(store.upsert_athlete(&oversized).await.is_err());
    assert_eq!(store.get_athlete(athlete.id).await.unwrap().unwrap(), athlete);

    let components = score::calculate(&athlete.profile);
    let base = Utc::now();
    let mut ids = Vec::new();
    for minutes in 0..3 {
        let record = ScoreRecord {
            id: Uuid::new_v4(),
            athlete_id: athlete.id,
            components: components.clone(),
            calculated_at: base + Duration::minutes(minutes),
        };
        ids.push(record.id);
        store.append_score(&record).await.unwrap();
    }

    let history = store.score_history(athlete.id, 2).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, ids[2]);
    assert_eq!(history[1].id, ids[1]);
    assert_eq!(history[0].components.total, components.total);
    assert_eq!(history[0].components.grade, components.grade);
    assert_eq!(
        history[0].components.breakdown.social.followers,
        athlete.profile.total_followers
    );

    let board = store.leaderboard(false, 10).await.unwrap();
    assert_eq!(board.len(), 1);
    assert_eq!(board[0].id, ids[2]);
    assert!(store.leaderboard(true, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn payments_are_unique_per_deal_and_webhooks_per_event() {
    let store = store().await;
    let deal = Deal {
        id: Uuid::new_v4(),
        athlete_id: Uuid::new_v4(),
        brand_id: Uuid::new_v4(),
        amount: 9_999,
        currency: "USD".to_string(),
        status: DealStatus::Completed,
        athlete_account_id: None,
    };
    store.upsert_deal(&deal).await.unwrap();
    assert_eq!(store.get_deal(deal.id).await.unwrap().unwrap(), deal);

    let now = Utc::now();
    let payment = Payment {
        id: Uuid::new_v4(),
        deal_id: deal.id,
        payment_intent_id: "pi_sqlite".to_string(),
        amount: 9_999,
        platform_fee: 1_000,
        athlete_amount: 8_999,
        currency: "USD".to_string(),
        status: PaymentStatus::Pending,
        amount_refunded: 0,
        failure_reason: None,
        created_at: now,
        updated_at: now,
    };
    assert!(store.insert_payment(&payment).await.unwrap());
    let again = Payment {
        id: Uuid::new_v4(),
        payment_intent_id: "pi_other".to_string(),
        ..payment.clone()
    };
    assert!(!store.insert_payment(&again).await.unwrap());

    let update = PaymentUpdate {
        status: PaymentStatus::Failed,
        amount_refunded: None,
        failure_reason: Some("insufficient funds".to_string()),
        at: Utc::now(),
    };
    assert!(!store
        .update_payment("pi_sqlite", PaymentStatus::Succeeded, &update)
        .await
        .unwrap());
    assert!(store
        .update_payment("pi_sqlite", PaymentStatus::Pending, &update)
        .await
        .unwrap());
    let stored = store.get_payment_by_intent("pi_sqlite").await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::Failed);
    assert_eq!(stored.failure_reason.as_deref(), Some("insufficient funds"));

    assert!(store.record_webhook_event("evt_1", "payment_intent.payment_failed", now).await.unwrap());
    assert!(!store.record_webhook_event("evt_1", "payment_intent.payment_failed", now).await.unwrap());
    store.forget_webhook_event("evt_1").await.unwrap();
    assert!(store.record_webhook_event("evt_1", "payment_intent.payment_failed", now).await.unwrap());
}

#[tokio::test]
async fn campaigns_filter_by_brand_status_and_sport() {
    let store = store().await;
    let brand = Uuid::new_v4();
    let base = Utc::now();
    let campaign = |sports: &[&str], status: CampaignStatus, minutes: i64| Campaign {
        id: Uuid::new_v4(),
        brand_id: brand,
        title: "Tournament run".to_string(),
        description: Some("Bracket promos".to_string()),
        budget: 40_000,
        currency: "USD".to_string(),
        status,
        sports: sports.iter().map(|s| s.to_string()).collect(),
        start_date: NaiveDate::from_ymd_opt(2026, 3, 1),
        end_date: None,
        created_at: base + Duration::minutes(minutes),
    };
    let older = campaign(&["basketball"], CampaignStatus::Active, 0);
    let newer = campaign(&["soccer", "basketball"], CampaignStatus::Paused, 1);
    store.insert_campaign(&older).await.unwrap();
    store.insert_campaign(&newer).await.unwrap();

    let all = store
        .list_campaigns(&CampaignFilter {
            brand_id: Some(brand),
            limit: 10,
            ..CampaignFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(
        all.iter().map(|c| c.id).collect::<Vec<_>>(),
        vec![newer.id, older.id]
    );
    assert_eq!(all[0].sports, newer.sports);
    assert_eq!(all[1].description, older.description);

    let soccer = store
        .list_campaigns(&CampaignFilter {
            sport: Some("soccer".to_string()),
            limit: 10,
            ..CampaignFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(soccer.len(), 1);
    assert_eq!(soccer[0].id, newer.id);

    let active = store
        .list_campaigns(&CampaignFilter {
            status: Some(CampaignStatus::Active),
            limit: 1,
            ..CampaignFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, older.id);
}
