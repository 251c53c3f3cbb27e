//! # GradeUp score
//!
//! Composite athlete ranking: athletic performance, social reach and academic
//! standing, each bounded, summed into a 0–1000 total and banded into a letter
//! grade. [`calculate`] is a pure function of an [`AthleteProfile`]; identical
//! inputs always give identical output.
//!
//! | Component | Range   | Inputs                                                       |
//! |-----------|---------|--------------------------------------------------------------|
//! | athletic  | 0–400   | sport tier, athletic rating, completed deals, deal rating     |
//! | social    | 0–300   | total followers, log-scaled                                   |
//! | academic  | 0–300   | GPA, GPA multiplier, major multiplier, term consistency bonus |
//!
//! Verification flags never change the score. They only decide whether the
//! result counts as [`ScoreComponents::verified`].

use serde::{Deserialize, Serialize};

pub const MAX_ATHLETIC: u32 = 400;
pub const MAX_SOCIAL: u32 = 300;
pub const MAX_ACADEMIC: u32 = 300;
pub const MAX_TOTAL: u32 = MAX_ATHLETIC + MAX_SOCIAL + MAX_ACADEMIC;

/// Upper bound on athlete ids per batch calculation.
pub const BATCH_LIMIT: usize = 100;

/// Score changes within ±this many points count as `stable`.
pub const TREND_DEADBAND: i64 = 10;

const RATING_POINTS: f64 = 250.0;
const POINTS_PER_DEAL: f64 = 5.0;
const MAX_COUNTED_DEALS: u32 = 20;
const DEAL_QUALITY_POINTS: f64 = 50.0;
const MAX_DEAL_RATING: f64 = 5.0;

/// Follower count at which the social component saturates.
const SOCIAL_SATURATION_FOLLOWERS: f64 = 10_000_000.0;

const GPA_SCALE: f64 = 4.0;
const GPA_BASE_POINTS: f64 = 200.0;

// ── Inputs ───────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SportTier {
    /// Revenue sports (football, basketball).
    #[serde(rename = "tier_1")]
    Tier1,
    #[serde(rename = "tier_2")]
    Tier2,
    #[serde(rename = "tier_3")]
    Tier3,
}

impl SportTier {
    pub const ALL: [SportTier; 3] = [Self::Tier1, Self::Tier2, Self::Tier3];

    pub fn weight(&self) -> f64 {
        match self {
            Self::Tier1 => 1.0,
            Self::Tier2 => 0.85,
            Self::Tier3 => 0.70,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tier1 => "tier_1",
            Self::Tier2 => "tier_2",
            Self::Tier3 => "tier_3",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == raw)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MajorCategory {
    Stem,
    PreMed,
    Business,
    Communications,
    GeneralStudies,
    Undeclared,
}

impl MajorCategory {
    pub const ALL: [MajorCategory; 6] = [
        Self::Stem,
        Self::PreMed,
        Self::Business,
        Self::Communications,
        Self::GeneralStudies,
        Self::Undeclared,
    ];

    pub fn multiplier(&self) -> f64 {
        match self {
            Self::Stem | Self::PreMed => 1.15,
            Self::Business => 1.05,
            Self::Communications | Self::GeneralStudies => 1.0,
            Self::Undeclared => 0.95,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stem => "stem",
            Self::PreMed => "pre_med",
            Self::Business => "business",
            Self::Communications => "communications",
            Self::GeneralStudies => "general_studies",
            Self::Undeclared => "undeclared",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == raw)
    }
}

/// Stored athlete attributes the score is computed from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AthleteProfile {
    pub sport_tier: SportTier,
    /// 0–100.
    pub athletic_rating: f64,
    pub deals_completed: u32,
    /// 0–5.
    pub avg_deal_rating: f64,
    pub total_followers: u64,
    /// Current-term GPA on a 4.0 scale.
    pub gpa: f64,
    /// Preferred over `gpa` when present.
    pub cumulative_gpa: Option<f64>,
    /// Per-term GPAs, oldest first.
    #[serde(default)]
    pub term_gpas: Vec<f64>,
    pub major_category: MajorCategory,
    #[serde(default)]
    pub grades_verified: bool,
    #[serde(default)]
    pub enrollment_verified: bool,
    #[serde(default)]
    pub sport_verified: bool,
}

impl AthleteProfile {
    pub fn is_verified(&self) -> bool {
        self.grades_verified && self.enrollment_verified && self.sport_verified
    }
}

// ── Outputs ──────────────────────────────────────────────────────────

/// Letter band of a total score. Ordered from lowest to highest.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    F,
    D,
    C,
    #[serde(rename = "C+")]
    CPlus,
    B,
    #[serde(rename = "B+")]
    BPlus,
    A,
    #[serde(rename = "A+")]
    APlus,
    S,
}

impl Grade {
    const BANDS: [(u32, Grade); 8] = [
        (900, Grade::S),
        (800, Grade::APlus),
        (700, Grade::A),
        (600, Grade::BPlus),
        (500, Grade::B),
        (400, Grade::CPlus),
        (300, Grade::C),
        (200, Grade::D),
    ];

    pub fn from_total(total: u32) -> Self {
        Self::BANDS
            .iter()
            .find(|(floor, _)| total >= *floor)
            .map(|(_, grade)| *grade)
            .unwrap_or(Grade::F)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::S => "S",
            Self::APlus => "A+",
            Self::A => "A",
            Self::BPlus => "B+",
            Self::B => "B",
            Self::CPlus => "C+",
            Self::C => "C",
            Self::D => "D",
            Self::F => "F",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        [
            Self::S,
            Self::APlus,
            Self::A,
            Self::BPlus,
            Self::B,
            Self::CPlus,
            Self::C,
            Self::D,
            Self::F,
        ]
        .into_iter()
        .find(|g| g.as_str() == raw)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AthleticBreakdown {
    pub tier_weight: f64,
    pub rating_points: f64,
    pub deal_volume_points: f64,
    pub deal_quality_points: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SocialBreakdown {
    pub followers: u64,
    pub reach_ratio: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AcademicBreakdown {
    pub gpa_used: f64,
    pub base_points: f64,
    pub terms_considered: usize,
}

/// Per-factor detail for display.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub athletic: AthleticBreakdown,
    pub social: SocialBreakdown,
    pub academic: AcademicBreakdown,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponents {
    pub total: u32,
    pub grade: Grade,
    pub athletic_score: u32,
    pub social_score: u32,
    pub academic_score: u32,
    pub gpa_multiplier: f64,
    pub major_multiplier: f64,
    pub consistency_bonus: u32,
    /// Grades, enrollment and sport all verified.
    pub verified: bool,
    pub breakdown: ScoreBreakdown,
}

/// Direction of the two most recent scores.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

impl Trend {
    pub fn between(previous: u32, latest: u32) -> Self {
        let delta = i64::from(latest) - i64::from(previous);
        if delta > TREND_DEADBAND {
            Trend::Up
        } else if delta < -TREND_DEADBAND {
            Trend::Down
        } else {
            Trend::Stable
        }
    }

    /// `totals` newest first. Fewer than two entries is `Stable`.
    pub fn from_history(totals: &[u32]) -> Self {
        match totals {
            [latest, previous, ..] => Self::between(*previous, *latest),
            _ => Trend::Stable,
        }
    }
}

// ── Calculation ──────────────────────────────────────────────────────

/// Clamp into `[lo, hi]`, mapping NaN to `lo`.
fn bounded(value: f64, lo: f64, hi: f64) -> f64 {
    if value.is_nan() {
        lo
    } else {
        value.clamp(lo, hi)
    }
}

fn points(value: f64, max: u32) -> u32 {
    (bounded(value, 0.0, f64::from(max)).round() as u32).min(max)
}

fn athletic(profile: &AthleteProfile) -> (f64, AthleticBreakdown) {
    let tier_weight = profile.sport_tier.weight();
    let rating_points =
        tier_weight * bounded(profile.athletic_rating, 0.0, 100.0) / 100.0 * RATING_POINTS;
    let deal_volume_points =
        f64::from(profile.deals_completed.min(MAX_COUNTED_DEALS)) * POINTS_PER_DEAL;
    let deal_quality_points = bounded(profile.avg_deal_rating, 0.0, MAX_DEAL_RATING)
        / MAX_DEAL_RATING
        * DEAL_QUALITY_POINTS;
    (
        rating_points + deal_volume_points + deal_quality_points,
        AthleticBreakdown {
            tier_weight,
            rating_points,
            deal_volume_points,
            deal_quality_points,
        },
    )
}

fn social(profile: &AthleteProfile) -> (f64, SocialBreakdown) {
    // u64 -> f64 loses precision only far above the saturation point.
    let followers = profile.total_followers as f64;
    let reach_ratio = if profile.total_followers == 0 {
        0.0
    } else {
        ((followers + 1.0).log10() / (SOCIAL_SATURATION_FOLLOWERS + 1.0).log10()).min(1.0)
    };
    (
        reach_ratio * f64::from(MAX_SOCIAL),
        SocialBreakdown {
            followers: profile.total_followers,
            reach_ratio,
        },
    )
}

pub fn gpa_multiplier(gpa: f64) -> f64 {
    if gpa >= 3.5 {
        1.20
    } else if gpa >= 3.0 {
        1.10
    } else {
        1.0
    }
}

/// Bonus for a stable GPA across at least two terms, by max-min spread.
pub fn consistency_bonus(term_gpas: &[f64]) -> u32 {
    let terms: Vec<f64> = term_gpas
        .iter()
        .copied()
        .filter(|g| g.is_finite())
        .map(|g| g.clamp(0.0, GPA_SCALE))
        .collect();
    if terms.len() < 2 {
        return 0;
    }
    let max = terms.iter().copied().fold(f64::MIN, f64::max);
    let min = terms.iter().copied().fold(f64::MAX, f64::min);
    // 3.6 - 3.5 is not exactly 0.1 in binary.
    const EPS: f64 = 1e-9;
    let spread = max - min;
    if spread <= 0.10 + EPS {
        30
    } else if spread <= 0.25 + EPS {
        20
    } else if spread <= 0.50 + EPS {
        10
    } else {
        0
    }
}

fn academic(profile: &AthleteProfile) -> (f64, f64, f64, u32, AcademicBreakdown) {
    let gpa_used = bounded(profile.cumulative_gpa.unwrap_or(profile.gpa), 0.0, GPA_SCALE);
    let base_points = gpa_used / GPA_SCALE * GPA_BASE_POINTS;
    let gpa_mult = gpa_multiplier(gpa_used);
    let major_mult = profile.major_category.multiplier();
    let bonus = consistency_bonus(&profile.term_gpas);
    let value = base_points * gpa_mult * major_mult + f64::from(bonus);
    (
        value,
        gpa_mult,
        major_mult,
        bonus,
        AcademicBreakdown {
            gpa_used,
            base_points,
            terms_considered: profile.term_gpas.len(),
        },
    )
}

/// Computes the GradeUp score of one athlete.
pub fn calculate(profile: &AthleteProfile) -> ScoreComponents {
    let (athletic_raw, athletic_breakdown) = athletic(profile);
    let (social_raw, social_breakdown) = social(profile);
    let (academic_raw, gpa_mult, major_mult, bonus, academic_breakdown) = academic(profile);

    let athletic_score = points(athletic_raw, MAX_ATHLETIC);
    let social_score = points(social_raw, MAX_SOCIAL);
    let academic_score = points(academic_raw, MAX_ACADEMIC);
    let total = athletic_score + social_score + academic_score;

    ScoreComponents {
        total,
        grade: Grade::from_total(total),
        athletic_score,
        social_score,
        academic_score,
        gpa_multiplier: gpa_mult,
        major_multiplier: major_mult,
        consistency_bonus: bonus,
        verified: profile.is_verified(),
        breakdown: ScoreBreakdown {
            athletic: athletic_breakdown,
            social: social_breakdown,
            academic: academic_breakdown,
        },
    }
}
