//! SQLite-backed [`Store`](super::Store).

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use gradeup_protocol::score::{AthleteProfile, Grade, MajorCategory, ScoreComponents, SportTier};
use gradeup_protocol::{
    Athlete, Campaign, CampaignStatus, Clause, Compensation, Contract, ContractSignature,
    ContractStatus, ContractTerms, ContractWithParties, Deal, DealStatus, PartyType, Payment,
    PaymentStatus, ScoreRecord, SignatureStatus, SignatureType,
};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{
    AthleteStore, CampaignFilter, CampaignStore, ContractStore, PaymentStore, PaymentUpdate,
    ScoreStore, SignatureUpdate, StatusUpdate,
};
use crate::errors::{ApiError, Result};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

// ─────────────────────────────────────────────────────────
// Row shapes and decoding
// ─────────────────────────────────────────────────────────

fn parse_uuid(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::Corrupt(format!("invalid id {raw:?}")))
}

fn parse_enum<T>(raw: &str, what: &str, parse: impl Fn(&str) -> Option<T>) -> Result<T> {
    parse(raw).ok_or_else(|| ApiError::Corrupt(format!("unknown {what} {raw:?}")))
}

/// `?start, ?start+1, ...` for a dynamic `IN (...)` list.
fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(sqlx::FromRow)]
struct ContractRow {
    id: String,
    deal_id: String,
    title: String,
    status: String,
    compensation_amount: i64,
    currency: String,
    compensation_terms: Option<String>,
    clauses: String,
    effective_date: Option<NaiveDate>,
    expiration_date: Option<NaiveDate>,
    requires_guardian_signature: bool,
    requires_witness: bool,
    signed_at: Option<DateTime<Utc>>,
    voided_at: Option<DateTime<Utc>>,
    void_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ContractRow> for Contract {
    type Error = ApiError;

    fn try_from(row: ContractRow) -> Result<Self> {
        let clauses: Vec<Clause> = serde_json::from_str(&row.clauses)?;
        Ok(Contract {
            id: parse_uuid(&row.id)?,
            deal_id: parse_uuid(&row.deal_id)?,
            status: parse_enum(&row.status, "contract status", ContractStatus::parse)?,
            terms: ContractTerms {
                title: row.title,
                compensation: Compensation {
                    amount: row.compensation_amount,
                    currency: row.currency,
                    terms: row.compensation_terms,
                },
                clauses,
                effective_date: row.effective_date,
                expiration_date: row.expiration_date,
            },
            requires_guardian_signature: row.requires_guardian_signature,
            requires_witness: row.requires_witness,
            signed_at: row.signed_at,
            voided_at: row.voided_at,
            void_reason: row.void_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SignatureRow {
    id: String,
    contract_id: String,
    party_type: String,
    signer_name: Option<String>,
    signature_status: String,
    signature_data: Option<String>,
    signature_type: Option<String>,
    signed_at: Option<DateTime<Utc>>,
    signature_ip: Option<String>,
    decline_reason: Option<String>,
    declined_at: Option<DateTime<Utc>>,
}

impl TryFrom<SignatureRow> for ContractSignature {
    type Error = ApiError;

    fn try_from(row: SignatureRow) -> Result<Self> {
        Ok(ContractSignature {
            id: parse_uuid(&row.id)?,
            contract_id: parse_uuid(&row.contract_id)?,
            party_type: parse_enum(&row.party_type, "party type", PartyType::parse)?,
            signer_name: row.signer_name,
            status: parse_enum(&row.signature_status, "signature status", SignatureStatus::parse)?,
            signature_data: row.signature_data,
            signature_type: row
                .signature_type
                .as_deref()
                .map(|t| parse_enum(t, "signature type", SignatureType::parse))
                .transpose()?,
            signed_at: row.signed_at,
            signature_ip: row.signature_ip,
            decline_reason: row.decline_reason,
            declined_at: row.declined_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AthleteRow {
    id: String,
    name: String,
    sport: String,
    sport_tier: String,
    athletic_rating: f64,
    deals_completed: i64,
    avg_deal_rating: f64,
    total_followers: i64,
    gpa: f64,
    cumulative_gpa: Option<f64>,
    term_gpas: String,
    major_category: String,
    grades_verified: bool,
    enrollment_verified: bool,
    sport_verified: bool,
}

impl TryFrom<AthleteRow> for Athlete {
    type Error = ApiError;

    fn try_from(row: AthleteRow) -> Result<Self> {
        Ok(Athlete {
            id: parse_uuid(&row.id)?,
            name: row.name,
            sport: row.sport,
            profile: AthleteProfile {
                sport_tier: parse_enum(&row.sport_tier, "sport tier", SportTier::parse)?,
                athletic_rating: row.athletic_rating,
                deals_completed: u32::try_from(row.deals_completed.max(0)).unwrap_or(u32::MAX),
                avg_deal_rating: row.avg_deal_rating,
                total_followers: u64::try_from(row.total_followers).map_err(|_| {
                    ApiError::Corrupt(format!("negative follower count {}", row.total_followers))
                })?,
                gpa: row.gpa,
                cumulative_gpa: row.cumulative_gpa,
                term_gpas: serde_json::from_str(&row.term_gpas)?,
                major_category: parse_enum(
                    &row.major_category,
                    "major category",
                    MajorCategory::parse,
                )?,
                grades_verified: row.grades_verified,
                enrollment_verified: row.enrollment_verified,
                sport_verified: row.sport_verified,
            },
        })
    }
}

#[derive(sqlx::FromRow)]
struct ScoreRow {
    id: String,
    athlete_id: String,
    total: i64,
    grade: String,
    athletic_score: i64,
    social_score: i64,
    academic_score: i64,
    gpa_multiplier: f64,
    major_multiplier: f64,
    consistency_bonus: i64,
    verified: bool,
    breakdown: String,
    calculated_at: DateTime<Utc>,
}

fn points(raw: i64, column: &str) -> Result<u32> {
    u32::try_from(raw).map_err(|_| ApiError::Corrupt(format!("{column} out of range: {raw}")))
}

impl TryFrom<ScoreRow> for ScoreRecord {
    type Error = ApiError;

    fn try_from(row: ScoreRow) -> Result<Self> {
        Ok(ScoreRecord {
            id: parse_uuid(&row.id)?,
            athlete_id: parse_uuid(&row.athlete_id)?,
            components: ScoreComponents {
                total: points(row.total, "total")?,
                grade: parse_enum(&row.grade, "grade", Grade::parse)?,
                athletic_score: points(row.athletic_score, "athletic_score")?,
                social_score: points(row.social_score, "social_score")?,
                academic_score: points(row.academic_score, "academic_score")?,
                gpa_multiplier: row.gpa_multiplier,
                major_multiplier: row.major_multiplier,
                consistency_bonus: points(row.consistency_bonus, "consistency_bonus")?,
                verified: row.verified,
                breakdown: serde_json::from_str(&row.breakdown)?,
            },
            calculated_at: row.calculated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct DealRow {
    id: String,
    athlete_id: String,
    brand_id: String,
    amount: i64,
    currency: String,
    status: String,
    athlete_account_id: Option<String>,
}

impl TryFrom<DealRow> for Deal {
    type Error = ApiError;

    fn try_from(row: DealRow) -> Result<Self> {
        Ok(Deal {
            id: parse_uuid(&row.id)?,
            athlete_id: parse_uuid(&row.athlete_id)?,
            brand_id: parse_uuid(&row.brand_id)?,
            amount: row.amount,
            currency: row.currency,
            status: parse_enum(&row.status, "deal status", DealStatus::parse)?,
            athlete_account_id: row.athlete_account_id,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: String,
    deal_id: String,
    payment_intent_id: String,
    amount: i64,
    platform_fee: i64,
    athlete_amount: i64,
    currency: String,
    status: String,
    amount_refunded: i64,
    failure_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = ApiError;

    fn try_from(row: PaymentRow) -> Result<Self> {
        Ok(Payment {
            id: parse_uuid(&row.id)?,
            deal_id: parse_uuid(&row.deal_id)?,
            payment_intent_id: row.payment_intent_id,
            amount: row.amount,
            platform_fee: row.platform_fee,
            athlete_amount: row.athlete_amount,
            currency: row.currency,
            status: parse_enum(&row.status, "payment status", PaymentStatus::parse)?,
            amount_refunded: row.amount_refunded,
            failure_reason: row.failure_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CampaignRow {
    id: String,
    brand_id: String,
    title: String,
    description: Option<String>,
    budget: i64,
    currency: String,
    status: String,
    sports: String,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
}

impl TryFrom<CampaignRow> for Campaign {
    type Error = ApiError;

    fn try_from(row: CampaignRow) -> Result<Self> {
        Ok(Campaign {
            id: parse_uuid(&row.id)?,
            brand_id: parse_uuid(&row.brand_id)?,
            title: row.title,
            description: row.description,
            budget: row.budget,
            currency: row.currency,
            status: parse_enum(&row.status, "campaign status", CampaignStatus::parse)?,
            sports: serde_json::from_str(&row.sports)?,
            start_date: row.start_date,
            end_date: row.end_date,
            created_at: row.created_at,
        })
    }
}

const CONTRACT_COLUMNS: &str = r#"
    id, deal_id, title, status, compensation_amount, currency, compensation_terms,
    clauses, effective_date, expiration_date, requires_guardian_signature,
    requires_witness, signed_at, voided_at, void_reason, created_at, updated_at
"#;

const SCORE_COLUMNS: &str = r#"
    id, athlete_id, total, grade, athletic_score, social_score, academic_score,
    gpa_multiplier, major_multiplier, consistency_bonus, verified, breakdown, calculated_at
"#;

const PAYMENT_COLUMNS: &str = r#"
    id, deal_id, payment_intent_id, amount, platform_fee, athlete_amount, currency,
    status, amount_refunded, failure_reason, created_at, updated_at
"#;

// ─────────────────────────────────────────────────────────
// Contracts
// ─────────────────────────────────────────────────────────

#[async_trait]
impl ContractStore for SqliteStore {
    async fn insert_contract(&self, contract: &ContractWithParties) -> Result<()> {
        let c = &contract.contract;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO contracts
                (id, deal_id, title, status, compensation_amount, currency, compensation_terms,
                 clauses, effective_date, expiration_date, requires_guardian_signature,
                 requires_witness, signed_at, voided_at, void_reason, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
            "#,
        )
        .bind(c.id.to_string())
        .bind(c.deal_id.to_string())
        .bind(&c.terms.title)
        .bind(c.status.as_str())
        .bind(c.terms.compensation.amount)
        .bind(&c.terms.compensation.currency)
        .bind(&c.terms.compensation.terms)
        .bind(serde_json::to_string(&c.terms.clauses)?)
        .bind(c.terms.effective_date)
        .bind(c.terms.expiration_date)
        .bind(c.requires_guardian_signature)
        .bind(c.requires_witness)
        .bind(c.signed_at)
        .bind(c.voided_at)
        .bind(&c.void_reason)
        .bind(c.created_at)
        .bind(c.updated_at)
        .execute(&mut *tx)
        .await?;

        for slot in &contract.parties {
            sqlx::query(
                r#"
                INSERT INTO contract_signatures
                    (id, contract_id, party_type, signer_name, signature_status)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(slot.id.to_string())
            .bind(c.id.to_string())
            .bind(slot.party_type.as_str())
            .bind(&slot.signer_name)
            .bind(slot.status.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_contract(&self, id: Uuid) -> Result<Option<ContractWithParties>> {
        let sql = format!("SELECT {CONTRACT_COLUMNS} FROM contracts WHERE id = ?1");
        let Some(row) = sqlx::query_as::<_, ContractRow>(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let slots = sqlx::query_as::<_, SignatureRow>(
            r#"
            SELECT id, contract_id, party_type, signer_name, signature_status, signature_data,
                   signature_type, signed_at, signature_ip, decline_reason, declined_at
            FROM   contract_signatures
            WHERE  contract_id = ?1
            ORDER  BY CASE party_type
                        WHEN 'athlete'  THEN 0
                        WHEN 'brand'    THEN 1
                        WHEN 'guardian' THEN 2
                        ELSE 3
                      END
            "#,
        )
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(ContractWithParties {
            contract: Contract::try_from(row)?,
            parties: slots
                .into_iter()
                .map(ContractSignature::try_from)
                .collect::<Result<_>>()?,
        }))
    }

    async fn list_contracts_for_deal(&self, deal_id: Uuid) -> Result<Vec<Contract>> {
        let sql = format!(
            "SELECT {CONTRACT_COLUMNS} FROM contracts WHERE deal_id = ?1 ORDER BY created_at ASC"
        );
        sqlx::query_as::<_, ContractRow>(&sql)
            .bind(deal_id.to_string())
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Contract::try_from)
            .collect()
    }

    async fn update_contract_terms(
        &self,
        id: Uuid,
        terms: &ContractTerms,
        expected: &[ContractStatus],
        at: DateTime<Utc>,
    ) -> Result<bool> {
        if expected.is_empty() {
            return Ok(false);
        }
        let sql = format!(
            r#"
            UPDATE contracts
            SET    title = ?1, compensation_amount = ?2, currency = ?3, compensation_terms = ?4,
                   clauses = ?5, effective_date = ?6, expiration_date = ?7, updated_at = ?8
            WHERE  id = ?9 AND status IN ({})
            "#,
            placeholders(10, expected.len())
        );
        let mut query = sqlx::query(&sql)
            .bind(&terms.title)
            .bind(terms.compensation.amount)
            .bind(&terms.compensation.currency)
            .bind(&terms.compensation.terms)
            .bind(serde_json::to_string(&terms.clauses)?)
            .bind(terms.effective_date)
            .bind(terms.expiration_date)
            .bind(at)
            .bind(id.to_string());
        for status in expected {
            query = query.bind(status.as_str());
        }
        Ok(query.execute(&self.pool).await?.rows_affected() == 1)
    }

    async fn delete_contract(&self, id: Uuid, expected: ContractStatus) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let deleted = sqlx::query("DELETE FROM contracts WHERE id = ?1 AND status = ?2")
            .bind(id.to_string())
            .bind(expected.as_str())
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 1 {
            sqlx::query("DELETE FROM contract_signatures WHERE contract_id = ?1")
                .bind(id.to_string())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(deleted == 1)
    }

    async fn update_signature(
        &self,
        contract_id: Uuid,
        party: PartyType,
        expected: SignatureStatus,
        update: &SignatureUpdate,
    ) -> Result<bool> {
        let result = match update {
            SignatureUpdate::Signed {
                signer_name,
                signature_data,
                signature_type,
                signature_ip,
                at,
            } => {
                sqlx::query(
                    r#"
                    UPDATE contract_signatures
                    SET    signature_status = ?1, signer_name = COALESCE(?2, signer_name),
                           signature_data = ?3, signature_type = ?4, signature_ip = ?5,
                           signed_at = ?6
                    WHERE  contract_id = ?7 AND party_type = ?8 AND signature_status = ?9
                      AND  EXISTS (SELECT 1 FROM contracts
                                   WHERE contracts.id = ?7 AND contracts.status IN (?10, ?11))
                    "#,
                )
                .bind(update.status().as_str())
                .bind(signer_name)
                .bind(signature_data)
                .bind(signature_type.as_str())
                .bind(signature_ip)
                .bind(at)
                .bind(contract_id.to_string())
                .bind(party.as_str())
                .bind(expected.as_str())
                .bind(ContractStatus::PendingSignature.as_str())
                .bind(ContractStatus::PartiallySigned.as_str())
                .execute(&self.pool)
                .await?
            }
            SignatureUpdate::Declined { reason, at } => {
                sqlx::query(
                    r#"
                    UPDATE contract_signatures
                    SET    signature_status = ?1, decline_reason = ?2, declined_at = ?3
                    WHERE  contract_id = ?4 AND party_type = ?5 AND signature_status = ?6
                      AND  EXISTS (SELECT 1 FROM contracts
                                   WHERE contracts.id = ?4 AND contracts.status IN (?7, ?8))
                    "#,
                )
                .bind(update.status().as_str())
                .bind(reason)
                .bind(at)
                .bind(contract_id.to_string())
                .bind(party.as_str())
                .bind(expected.as_str())
                .bind(ContractStatus::PendingSignature.as_str())
                .bind(ContractStatus::PartiallySigned.as_str())
                .execute(&self.pool)
                .await?
            }
        };
        Ok(result.rows_affected() == 1)
    }

    async fn update_contract_status(
        &self,
        id: Uuid,
        expected: &[ContractStatus],
        update: &StatusUpdate,
    ) -> Result<bool> {
        if expected.is_empty() {
            return Ok(false);
        }
        let sql = format!(
            r#"
            UPDATE contracts
            SET    status      = ?1,
                   updated_at  = ?2,
                   signed_at   = COALESCE(?3, signed_at),
                   voided_at   = CASE WHEN ?1 = 'voided' THEN ?2 ELSE voided_at END,
                   void_reason = CASE WHEN ?1 = 'voided' THEN ?4 ELSE void_reason END
            WHERE  id = ?5 AND status IN ({})
            "#,
            placeholders(6, expected.len())
        );
        let mut query = sqlx::query(&sql)
            .bind(update.status.as_str())
            .bind(update.at)
            .bind(update.signed_at)
            .bind(&update.void_reason)
            .bind(id.to_string());
        for status in expected {
            query = query.bind(status.as_str());
        }
        Ok(query.execute(&self.pool).await?.rows_affected() == 1)
    }
}

// ─────────────────────────────────────────────────────────
// Athletes and scores
// ─────────────────────────────────────────────────────────

#[async_trait]
impl AthleteStore for SqliteStore {
    async fn upsert_athlete(&self, athlete: &Athlete) -> Result<()> {
        let p = &athlete.profile;
        let followers = i64::try_from(p.total_followers)
            .map_err(|_| ApiError::field("total_followers", "is too large"))?;
        sqlx::query(
            r#"
            INSERT INTO athletes
                (id, name, sport, sport_tier, athletic_rating, deals_completed, avg_deal_rating,
                 total_followers, gpa, cumulative_gpa, term_gpas, major_category,
                 grades_verified, enrollment_verified, sport_verified)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            ON CONFLICT (id) DO UPDATE SET
                name = excluded.name, sport = excluded.sport, sport_tier = excluded.sport_tier,
                athletic_rating = excluded.athletic_rating,
                deals_completed = excluded.deals_completed,
                avg_deal_rating = excluded.avg_deal_rating,
                total_followers = excluded.total_followers, gpa = excluded.gpa,
                cumulative_gpa = excluded.cumulative_gpa, term_gpas = excluded.term_gpas,
                major_category = excluded.major_category,
                grades_verified = excluded.grades_verified,
                enrollment_verified = excluded.enrollment_verified,
                sport_verified = excluded.sport_verified
            "#,
        )
        .bind(athlete.id.to_string())
        .bind(&athlete.name)
        .bind(&athlete.sport)
        .bind(p.sport_tier.as_str())
        .bind(p.athletic_rating)
        .bind(i64::from(p.deals_completed))
        .bind(p.avg_deal_rating)
        .bind(followers)
        .bind(p.gpa)
        .bind(p.cumulative_gpa)
        .bind(serde_json::to_string(&p.term_gpas)?)
        .bind(p.major_category.as_str())
        .bind(p.grades_verified)
        .bind(p.enrollment_verified)
        .bind(p.sport_verified)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_athlete(&self, id: Uuid) -> Result<Option<Athlete>> {
        sqlx::query_as::<_, AthleteRow>(
            r#"
            SELECT id, name, sport, sport_tier, athletic_rating, deals_completed, avg_deal_rating,
                   total_followers, gpa, cumulative_gpa, term_gpas, major_category,
                   grades_verified, enrollment_verified, sport_verified
            FROM   athletes
            WHERE  id = ?1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .map(Athlete::try_from)
        .transpose()
    }
}

#[async_trait]
impl ScoreStore for SqliteStore {
    async fn append_score(&self, record: &ScoreRecord) -> Result<()> {
        let s = &record.components;
        sqlx::query(
            r#"
            INSERT INTO gradeup_scores
                (id, athlete_id, total, grade, athletic_score, social_score, academic_score,
                 gpa_multiplier, major_multiplier, consistency_bonus, verified, breakdown,
                 calculated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.athlete_id.to_string())
        .bind(i64::from(s.total))
        .bind(s.grade.as_str())
        .bind(i64::from(s.athletic_score))
        .bind(i64::from(s.social_score))
        .bind(i64::from(s.academic_score))
        .bind(s.gpa_multiplier)
        .bind(s.major_multiplier)
        .bind(i64::from(s.consistency_bonus))
        .bind(s.verified)
        .bind(serde_json::to_string(&s.breakdown)?)
        .bind(record.calculated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn score_history(&self, athlete_id: Uuid, limit: u32) -> Result<Vec<ScoreRecord>> {
        let sql = format!(
            r#"
            SELECT {SCORE_COLUMNS}
            FROM   gradeup_scores
            WHERE  athlete_id = ?1
            ORDER  BY calculated_at DESC, rowid DESC
            LIMIT  ?2
            "#
        );
        sqlx::query_as::<_, ScoreRow>(&sql)
            .bind(athlete_id.to_string())
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(ScoreRecord::try_from)
            .collect()
    }

    async fn leaderboard(&self, verified_only: bool, limit: u32) -> Result<Vec<ScoreRecord>> {
        let sql = format!(
            r#"
            SELECT {SCORE_COLUMNS}
            FROM   gradeup_scores s
            WHERE  s.rowid = (
                       SELECT s2.rowid FROM gradeup_scores s2
                       WHERE  s2.athlete_id = s.athlete_id
                       ORDER  BY s2.calculated_at DESC, s2.rowid DESC
                       LIMIT  1
                   )
              AND  (?1 = 0 OR s.verified = 1)
            ORDER  BY s.total DESC, s.athlete_id ASC
            LIMIT  ?2
            "#
        );
        sqlx::query_as::<_, ScoreRow>(&sql)
            .bind(verified_only)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(ScoreRecord::try_from)
            .collect()
    }
}

// ─────────────────────────────────────────────────────────
// Deals, payments and webhook bookkeeping
// ─────────────────────────────────────────────────────────

#[async_trait]
impl PaymentStore for SqliteStore {
    async fn upsert_deal(&self, deal: &Deal) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO deals (id, athlete_id, brand_id, amount, currency, status, athlete_account_id)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT (id) DO UPDATE SET
                athlete_id = excluded.athlete_id, brand_id = excluded.brand_id,
                amount = excluded.amount, currency = excluded.currency,
                status = excluded.status, athlete_account_id = excluded.athlete_account_id
            "#,
        )
        .bind(deal.id.to_string())
        .bind(deal.athlete_id.to_string())
        .bind(deal.brand_id.to_string())
        .bind(deal.amount)
        .bind(&deal.currency)
        .bind(deal.status.as_str())
        .bind(&deal.athlete_account_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_deal(&self, id: Uuid) -> Result<Option<Deal>> {
        sqlx::query_as::<_, DealRow>(
            r#"
            SELECT id, athlete_id, brand_id, amount, currency, status, athlete_account_id
            FROM   deals
            WHERE  id = ?1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .map(Deal::try_from)
        .transpose()
    }

    async fn get_payment_for_deal(&self, deal_id: Uuid) -> Result<Option<Payment>> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE deal_id = ?1");
        sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(deal_id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .map(Payment::try_from)
            .transpose()
    }

    async fn get_payment_by_intent(&self, payment_intent_id: &str) -> Result<Option<Payment>> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE payment_intent_id = ?1");
        sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(payment_intent_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Payment::try_from)
            .transpose()
    }

    async fn insert_payment(&self, payment: &Payment) -> Result<bool> {
        let inserted = sqlx::query(
            r#"
            INSERT OR IGNORE INTO payments
                (id, deal_id, payment_intent_id, amount, platform_fee, athlete_amount, currency,
                 status, amount_refunded, failure_reason, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(payment.id.to_string())
        .bind(payment.deal_id.to_string())
        .bind(&payment.payment_intent_id)
        .bind(payment.amount)
        .bind(payment.platform_fee)
        .bind(payment.athlete_amount)
        .bind(&payment.currency)
        .bind(payment.status.as_str())
        .bind(payment.amount_refunded)
        .bind(&payment.failure_reason)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(inserted == 1)
    }

    async fn update_payment(
        &self,
        payment_intent_id: &str,
        expected: PaymentStatus,
        update: &PaymentUpdate,
    ) -> Result<bool> {
        let updated = sqlx::query(
            r#"
            UPDATE payments
            SET    status          = ?1,
                   amount_refunded = COALESCE(?2, amount_refunded),
                   failure_reason  = COALESCE(?3, failure_reason),
                   updated_at      = ?4
            WHERE  payment_intent_id = ?5 AND status = ?6
            "#,
        )
        .bind(update.status.as_str())
        .bind(update.amount_refunded)
        .bind(&update.failure_reason)
        .bind(update.at)
        .bind(payment_intent_id)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(updated == 1)
    }

    async fn record_webhook_event(
        &self,
        event_id: &str,
        event_type: &str,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO webhook_events (event_id, event_type, received_at) VALUES (?1, ?2, ?3)",
        )
        .bind(event_id)
        .bind(event_type)
        .bind(at)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(inserted == 1)
    }

    async fn forget_webhook_event(&self, event_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM webhook_events WHERE event_id = ?1")
            .bind(event_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────
// Campaigns
// ─────────────────────────────────────────────────────────

#[async_trait]
impl CampaignStore for SqliteStore {
    async fn insert_campaign(&self, campaign: &Campaign) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO campaigns
                (id, brand_id, title, description, budget, currency, status, sports,
                 start_date, end_date, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(campaign.id.to_string())
        .bind(campaign.brand_id.to_string())
        .bind(&campaign.title)
        .bind(&campaign.description)
        .bind(campaign.budget)
        .bind(&campaign.currency)
        .bind(campaign.status.as_str())
        .bind(serde_json::to_string(&campaign.sports)?)
        .bind(campaign.start_date)
        .bind(campaign.end_date)
        .bind(campaign.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_campaigns(&self, filter: &CampaignFilter) -> Result<Vec<Campaign>> {
        sqlx::query_as::<_, CampaignRow>(
            r#"
            SELECT id, brand_id, title, description, budget, currency, status, sports,
                   start_date, end_date, created_at
            FROM   campaigns
            WHERE  (?1 IS NULL OR brand_id = ?1)
              AND  (?2 IS NULL OR status = ?2)
              AND  (?3 IS NULL OR EXISTS (SELECT 1 FROM json_each(campaigns.sports) WHERE value = ?3))
            ORDER  BY created_at DESC, rowid DESC
            LIMIT  ?4
            "#,
        )
        .bind(filter.brand_id.map(|id| id.to_string()))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.sport.as_deref())
        .bind(i64::from(filter.limit))
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Campaign::try_from)
        .collect()
    }
}
