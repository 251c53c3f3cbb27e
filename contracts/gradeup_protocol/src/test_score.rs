use proptest::prelude::*;
use proptest::test_runner::Config;

use crate::invariants::assert_score_bounds;
use crate::score::{
    calculate, consistency_bonus, gpa_multiplier, AthleteProfile, Grade, MajorCategory,
    SportTier, Trend, MAX_ACADEMIC, MAX_ATHLETIC, MAX_SOCIAL,
};

fn profile() -> AthleteProfile {
    AthleteProfile {
        sport_tier: SportTier::Tier2,
        athletic_rating: 72.0,
        deals_completed: 4,
        avg_deal_rating: 4.5,
        total_followers: 25_000,
        gpa: 3.4,
        cumulative_gpa: Some(3.6),
        term_gpas: vec![3.5, 3.6, 3.7],
        major_category: MajorCategory::Stem,
        grades_verified: true,
        enrollment_verified: true,
        sport_verified: false,
    }
}

fn maxed() -> AthleteProfile {
    AthleteProfile {
        sport_tier: SportTier::Tier1,
        athletic_rating: 100.0,
        deals_completed: 50,
        avg_deal_rating: 5.0,
        total_followers: 50_000_000,
        gpa: 4.0,
        cumulative_gpa: None,
        term_gpas: vec![4.0, 4.0],
        major_category: MajorCategory::PreMed,
        grades_verified: true,
        enrollment_verified: true,
        sport_verified: true,
    }
}

#[test]
fn test_calculate_is_deterministic() {
    let p = profile();
    assert_eq!(calculate(&p), calculate(&p));
}

#[test]
fn test_known_profile_components() {
    let score = calculate(&profile());
    // 0.85 * 0.72 * 250 + 4 * 5 + 4.5 / 5 * 50 = 153 + 20 + 45
    assert_eq!(score.athletic_score, 218);
    // 3.6 / 4 * 200 * 1.2 * 1.15 + 20 (spread 0.2)
    assert_eq!(score.academic_score, 268);
    assert_eq!(score.consistency_bonus, 20);
    assert_eq!(score.gpa_multiplier, 1.20);
    assert_eq!(score.major_multiplier, 1.15);
    assert_eq!(
        score.total,
        score.athletic_score + score.social_score + score.academic_score
    );
    assert!(!score.verified);
}

#[test]
fn test_maxed_profile_hits_every_cap() {
    let score = calculate(&maxed());
    assert_eq!(score.athletic_score, MAX_ATHLETIC);
    assert_eq!(score.social_score, MAX_SOCIAL);
    assert_eq!(score.academic_score, MAX_ACADEMIC);
    assert_eq!(score.total, 1_000);
    assert_eq!(score.grade, Grade::S);
    assert!(score.verified);
}

#[test]
fn test_empty_profile_scores_zero() {
    let p = AthleteProfile {
        sport_tier: SportTier::Tier3,
        athletic_rating: 0.0,
        deals_completed: 0,
        avg_deal_rating: 0.0,
        total_followers: 0,
        gpa: 0.0,
        cumulative_gpa: None,
        term_gpas: vec![],
        major_category: MajorCategory::Undeclared,
        grades_verified: false,
        enrollment_verified: false,
        sport_verified: false,
    };
    let score = calculate(&p);
    assert_eq!(score.total, 0);
    assert_eq!(score.grade, Grade::F);
}

#[test]
fn test_out_of_range_inputs_are_clamped() {
    let mut p = profile();
    p.athletic_rating = f64::NAN;
    p.avg_deal_rating = 99.0;
    p.gpa = -1.0;
    p.cumulative_gpa = Some(7.5);
    let score = calculate(&p);
    assert_score_bounds(&score);
    assert_eq!(score.breakdown.athletic.rating_points, 0.0);
    assert_eq!(score.breakdown.academic.gpa_used, 4.0);
}

#[test]
fn test_social_has_diminishing_returns() {
    let mut p = profile();
    let at = |followers: u64, p: &mut AthleteProfile| {
        p.total_followers = followers;
        calculate(p).social_score
    };
    let first_ten_thousand = at(10_000, &mut p) - at(0, &mut p);
    let next_hundredfold = at(1_000_000, &mut p) - at(10_000, &mut p);
    assert!(next_hundredfold > 0);
    assert!(next_hundredfold < first_ten_thousand);
    assert_eq!(at(10_000_000, &mut p), MAX_SOCIAL);
    assert_eq!(at(u64::MAX, &mut p), MAX_SOCIAL);
}

#[test]
fn test_verification_does_not_change_score() {
    let mut unverified = maxed();
    unverified.grades_verified = false;
    unverified.sport_verified = false;
    let a = calculate(&maxed());
    let b = calculate(&unverified);
    assert_eq!(a.total, b.total);
    assert!(a.verified);
    assert!(!b.verified);
}

#[test]
fn test_gpa_multiplier_thresholds() {
    assert_eq!(gpa_multiplier(2.99), 1.0);
    assert_eq!(gpa_multiplier(3.0), 1.10);
    assert_eq!(gpa_multiplier(3.49), 1.10);
    assert_eq!(gpa_multiplier(3.5), 1.20);
}

#[test]
fn test_consistency_bonus_needs_two_terms() {
    assert_eq!(consistency_bonus(&[]), 0);
    assert_eq!(consistency_bonus(&[3.9]), 0);
    assert_eq!(consistency_bonus(&[3.5, 3.6]), 30);
    assert_eq!(consistency_bonus(&[3.2, 3.45]), 20);
    assert_eq!(consistency_bonus(&[3.0, 3.5]), 10);
    assert_eq!(consistency_bonus(&[2.0, 3.5]), 0);
}

#[test]
fn test_grade_thresholds() {
    let cases = [
        (1_000, Grade::S),
        (900, Grade::S),
        (899, Grade::APlus),
        (800, Grade::APlus),
        (700, Grade::A),
        (600, Grade::BPlus),
        (500, Grade::B),
        (400, Grade::CPlus),
        (300, Grade::C),
        (200, Grade::D),
        (199, Grade::F),
        (0, Grade::F),
    ];
    for (total, grade) in cases {
        assert_eq!(Grade::from_total(total), grade, "total {total}");
    }
    assert_eq!(serde_json::to_string(&Grade::APlus).unwrap(), "\"A+\"");
    assert_eq!(Grade::parse("C+"), Some(Grade::CPlus));
}

#[test]
fn test_trend_deadband() {
    assert_eq!(Trend::between(500, 511), Trend::Up);
    assert_eq!(Trend::between(500, 510), Trend::Stable);
    assert_eq!(Trend::between(500, 490), Trend::Stable);
    assert_eq!(Trend::between(500, 489), Trend::Down);
    assert_eq!(Trend::from_history(&[]), Trend::Stable);
    assert_eq!(Trend::from_history(&[640]), Trend::Stable);
    assert_eq!(Trend::from_history(&[640, 600, 900]), Trend::Up);
}

fn arb_profile() -> impl Strategy<Value = AthleteProfile> {
    (
        prop::sample::select(SportTier::ALL.to_vec()),
        -10.0f64..150.0,
        0u32..100,
        -1.0f64..7.0,
        0u64..200_000_000,
        -1.0f64..5.0,
        proptest::option::of(0.0f64..4.5),
        prop::collection::vec(0.0f64..4.0, 0..8),
        prop::sample::select(MajorCategory::ALL.to_vec()),
        any::<(bool, bool, bool)>(),
    )
        .prop_map(
            |(tier, rating, deals, deal_rating, followers, gpa, cumulative, terms, major, flags)| {
                AthleteProfile {
                    sport_tier: tier,
                    athletic_rating: rating,
                    deals_completed: deals,
                    avg_deal_rating: deal_rating,
                    total_followers: followers,
                    gpa,
                    cumulative_gpa: cumulative,
                    term_gpas: terms,
                    major_category: major,
                    grades_verified: flags.0,
                    enrollment_verified: flags.1,
                    sport_verified: flags.2,
                }
            },
        )
}

proptest! {
    #![proptest_config(Config::with_cases(256))]

    #[test]
    fn prop_components_stay_in_bounds(p in arb_profile()) {
        let score = calculate(&p);
        assert_score_bounds(&score);
        prop_assert_eq!(score.grade, Grade::from_total(score.total));
    }

    #[test]
    fn prop_grade_banding_is_monotonic(a in 0u32..=1_000, b in 0u32..=1_000) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(Grade::from_total(lo) <= Grade::from_total(hi));
    }

    #[test]
    fn prop_athletic_is_monotonic(p in arb_profile(), extra_rating in 0.0f64..50.0, extra_deals in 0u32..10) {
        let base = calculate(&p).athletic_score;
        let mut better = p.clone();
        better.athletic_rating = p.athletic_rating.max(0.0) + extra_rating;
        better.deals_completed = p.deals_completed + extra_deals;
        better.avg_deal_rating = p.avg_deal_rating.max(0.0);
        prop_assert!(calculate(&better).athletic_score >= base);
    }

    #[test]
    fn prop_social_is_monotonic(p in arb_profile(), extra in 0u64..1_000_000) {
        let base = calculate(&p).social_score;
        let mut better = p.clone();
        better.total_followers = p.total_followers.saturating_add(extra);
        prop_assert!(calculate(&better).social_score >= base);
    }
}
