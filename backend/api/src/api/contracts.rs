//! `/api/contracts` and `/api/deals/:id/contracts`.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use gradeup_protocol::{Clause, Compensation, ContractTerms, PartyType, SignatureType};
use serde::Deserialize;

use super::{client_ip, parse_body, parse_id, ApiState, ListResponse};
use crate::contracts::{NewContract, Signing, TermsPatch};
use crate::errors::{ApiError, Result};
use crate::validation::Validator;

const MAX_TITLE: usize = 200;
const MAX_TERMS_TEXT: usize = 2_000;
const MAX_CLAUSES: usize = 50;
const MAX_CLAUSE_BODY: usize = 10_000;
const MAX_REASON: usize = 1_000;
/// Drawn and uploaded signatures arrive as data URLs.
const MAX_SIGNATURE_DATA: usize = 500_000;
const MAX_COMPENSATION: i64 = 100_000_000_000;

// ─────────────────────────────────────────────────────────
// Request shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct TermsBody {
    pub title: Option<String>,
    pub compensation: Option<Compensation>,
    pub clauses: Option<Vec<Clause>>,
    pub effective_date: Option<String>,
    pub expiration_date: Option<String>,
}

impl TermsBody {
    /// Checks every present field; `required` also demands title and
    /// compensation.
    fn check(self, v: &mut Validator, required: bool) -> TermsPatch {
        if let Some(title) = &self.title {
            v.length("title", title, 1, MAX_TITLE);
        } else if required {
            v.add("title", "is required");
        }

        if let Some(c) = &self.compensation {
            v.range("compensation.amount", c.amount, 0, MAX_COMPENSATION);
            if c.currency.len() != 3 || !c.currency.chars().all(|ch| ch.is_ascii_alphabetic()) {
                v.add("compensation.currency", "must be a 3-letter ISO 4217 code");
            }
            v.optional_length("compensation.terms", c.terms.as_deref(), MAX_TERMS_TEXT);
        } else if required {
            v.add("compensation", "is required");
        }

        if let Some(clauses) = &self.clauses {
            if clauses.len() > MAX_CLAUSES {
                v.add("clauses", format!("must contain at most {MAX_CLAUSES} clauses"));
            }
            for (i, clause) in clauses.iter().enumerate() {
                v.length(&format!("clauses[{i}].title"), &clause.title, 1, MAX_TITLE);
                v.length(&format!("clauses[{i}].body"), &clause.body, 1, MAX_CLAUSE_BODY);
            }
        }

        let effective_date = v.date("effective_date", self.effective_date.as_deref());
        let expiration_date = v.date("expiration_date", self.expiration_date.as_deref());

        TermsPatch {
            title: self.title.map(|t| t.trim().to_string()),
            compensation: self.compensation.map(|c| Compensation {
                currency: c.currency.to_uppercase(),
                ..c
            }),
            clauses: self.clauses,
            effective_date,
            expiration_date,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateContractBody {
    pub deal_id: Option<String>,
    #[serde(flatten)]
    pub terms: TermsBody,
    #[serde(default)]
    pub requires_guardian_signature: bool,
    #[serde(default)]
    pub requires_witness: bool,
}

impl CreateContractBody {
    fn validate(self) -> Result<NewContract> {
        let mut v = Validator::new();
        let deal_id = match self.deal_id.as_deref() {
            Some(raw) => v.uuid("deal_id", raw),
            None => {
                v.add("deal_id", "is required");
                None
            }
        };
        let patch = self.terms.check(&mut v, true);
        v.finish()?;

        match (deal_id, patch.title, patch.compensation) {
            (Some(deal_id), Some(title), Some(compensation)) => Ok(NewContract {
                deal_id,
                terms: ContractTerms {
                    title,
                    compensation,
                    clauses: patch.clauses.unwrap_or_default(),
                    effective_date: patch.effective_date,
                    expiration_date: patch.expiration_date,
                },
                requires_guardian_signature: self.requires_guardian_signature,
                requires_witness: self.requires_witness,
            }),
            _ => Err(ApiError::field("body", "incomplete contract")),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ActionQuery {
    pub action: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContractAction {
    Send,
    Sign,
    Decline,
    Void,
    Activate,
    Expire,
}

impl ContractAction {
    const ALL: [ContractAction; 6] = [
        Self::Send,
        Self::Sign,
        Self::Decline,
        Self::Void,
        Self::Activate,
        Self::Expire,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            Self::Send => "send",
            Self::Sign => "sign",
            Self::Decline => "decline",
            Self::Void => "void",
            Self::Activate => "activate",
            Self::Expire => "expire",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == raw)
    }
}

#[derive(Debug, Default, Deserialize)]
struct SignBody {
    party_type: Option<String>,
    signer_name: Option<String>,
    signature_data: Option<String>,
    signature_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DeclineBody {
    party_type: Option<String>,
    reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct VoidBody {
    reason: Option<String>,
}

fn party(v: &mut Validator, raw: Option<&str>) -> Option<PartyType> {
    let raw = v.required("party_type", raw, 20)?;
    v.one_of(
        "party_type",
        raw,
        &PartyType::ALL.map(|p| p.as_str()),
        PartyType::parse,
    )
}

impl SignBody {
    fn validate(self, ip: Option<String>) -> Result<Signing> {
        let mut v = Validator::new();
        let party = party(&mut v, self.party_type.as_deref());
        let data = v.required(
            "signature_data",
            self.signature_data.as_deref(),
            MAX_SIGNATURE_DATA,
        );
        let signature_type = v
            .required("signature_type", self.signature_type.as_deref(), 20)
            .and_then(|raw| {
                v.one_of(
                    "signature_type",
                    raw,
                    &SignatureType::ALL.map(|t| t.as_str()),
                    SignatureType::parse,
                )
            });
        v.optional_length("signer_name", self.signer_name.as_deref(), MAX_TITLE);
        let data = data.map(str::to_string);
        v.finish()?;

        match (party, data, signature_type) {
            (Some(party), Some(signature_data), Some(signature_type)) => Ok(Signing {
                party,
                signer_name: self.signer_name,
                signature_data,
                signature_type,
                ip,
            }),
            _ => Err(ApiError::field("body", "incomplete signature")),
        }
    }
}

fn required_reason(v: &mut Validator, raw: Option<&str>) -> Option<String> {
    v.required("reason", raw, MAX_REASON).map(|r| r.trim().to_string())
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `POST /api/contracts`
pub async fn create_contract(
    State(state): State<Arc<ApiState>>,
    body: std::result::Result<Json<CreateContractBody>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(body) = body?;
    let contract = state.contracts.create(body.validate()?).await?;
    Ok((StatusCode::CREATED, Json(contract)))
}

/// `GET /api/contracts/:id`
pub async fn get_contract(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let id = parse_id("id", &id)?;
    Ok(Json(state.contracts.get(id).await?))
}

/// `GET /api/deals/:id/contracts`
pub async fn list_deal_contracts(
    State(state): State<Arc<ApiState>>,
    Path(deal_id): Path<String>,
) -> Result<impl IntoResponse> {
    let deal_id = parse_id("deal_id", &deal_id)?;
    let contracts = state.contracts.list_for_deal(deal_id).await?;
    Ok(Json(ListResponse::from(contracts)))
}

/// `PATCH /api/contracts/:id`
pub async fn update_contract(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    body: std::result::Result<Json<TermsBody>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let id = parse_id("id", &id)?;
    let Json(body) = body?;
    let mut v = Validator::new();
    let patch = body.check(&mut v, false);
    v.finish()?;
    Ok(Json(state.contracts.update_terms(id, patch).await?))
}

/// `DELETE /api/contracts/:id`
pub async fn delete_contract(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let id = parse_id("id", &id)?;
    state.contracts.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/contracts/:id?action=send|sign|decline|void|activate|expire`
pub async fn contract_action(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    Query(query): Query<ActionQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse> {
    let id = parse_id("id", &id)?;
    let mut v = Validator::new();
    let action = v
        .required("action", query.action.as_deref(), 20)
        .and_then(|raw| {
            v.one_of(
                "action",
                raw,
                &ContractAction::ALL.map(|a| a.as_str()),
                ContractAction::parse,
            )
        });
    v.finish()?;
    let action = action.ok_or_else(|| ApiError::field("action", "is required"))?;

    let contracts = &state.contracts;
    let contract = match action {
        ContractAction::Send => contracts.send(id).await?,
        ContractAction::Activate => contracts.activate(id).await?,
        ContractAction::Expire => contracts.expire(id).await?,
        ContractAction::Sign => {
            let signing = parse_body::<SignBody>(&body)?.validate(client_ip(&headers))?;
            contracts.sign(id, signing).await?
        }
        ContractAction::Decline => {
            let body: DeclineBody = parse_body(&body)?;
            let mut v = Validator::new();
            let party = party(&mut v, body.party_type.as_deref());
            let reason = required_reason(&mut v, body.reason.as_deref());
            v.finish()?;
            match (party, reason) {
                (Some(party), Some(reason)) => contracts.decline(id, party, reason).await?,
                _ => return Err(ApiError::field("body", "incomplete decline")),
            }
        }
        ContractAction::Void => {
            let body: VoidBody = parse_body(&body)?;
            let mut v = Validator::new();
            let reason = required_reason(&mut v, body.reason.as_deref());
            v.finish()?;
            let reason = reason.ok_or_else(|| ApiError::field("reason", "is required"))?;
            contracts.void(id, reason).await?
        }
    };
    Ok(Json(contract))
}
