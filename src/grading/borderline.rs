//! Borderline-upgrade review.
//!
//! A final grade within [`BORDERLINE_MARGIN`] points below a classification
//! threshold is reviewed against two criteria. The primary criterion looks
//! at Level 6 alone: at least half of its credits must carry marks in the
//! higher band. The secondary criterion pools Level 5 and Level 6 credits,
//! needs half of the pool in the higher band, and also needs at least
//! [`SECONDARY_MIN_LEVEL6_CREDITS`] of those credits to come from Level 6.

use crate::grading::grade::classify;
use crate::grading::types::{BorderlineResult, Classification, ModuleRecord};
use crate::grading::utility::{credits_at_or_above, fraction, percent, total_credits};
use tracing::debug;

/// Width of the zone below each threshold that qualifies for review.
pub const BORDERLINE_MARGIN: f64 = 2.0;

/// Share of credits that must sit in the higher band.
pub const REQUIRED_SHARE: f64 = 0.5;

pub const SECONDARY_MIN_LEVEL6_CREDITS: f64 = 40.0;

/// Returns the classification a borderline grade could be upgraded to,
/// or `None` outside every borderline zone.
pub fn borderline_zone(final_grade: f64) -> Option<Classification> {
    Classification::HONOURS.into_iter().find(|class| {
        class.threshold().is_some_and(|threshold| {
            final_grade >= threshold - BORDERLINE_MARGIN && final_grade < threshold
        })
    })
}

/// Reviews a final grade for borderline-upgrade eligibility.
///
/// Modules that do not count towards the weighted averages are ignored, so
/// passing raw or pre-filtered lists gives the same result.
pub fn check_borderline_eligibility(
    final_grade: f64,
    level5_modules: &[ModuleRecord],
    level6_modules: &[ModuleRecord],
) -> BorderlineResult {
    let current_class = classify(final_grade);

    let Some(higher_class) = borderline_zone(final_grade) else {
        return BorderlineResult::not_borderline(current_class);
    };
    let Some(threshold) = higher_class.threshold() else {
        return BorderlineResult::not_borderline(current_class);
    };

    let level6_higher = credits_at_or_above(level6_modules, threshold);
    let level6_total = total_credits(level6_modules);
    let level6_share = fraction(level6_higher, level6_total);

    let primary = level6_total > 0.0 && level6_share >= REQUIRED_SHARE;
    let primary_detail = if primary {
        format!(
            "✅ Primary criterion met: {} out of {} Level 6 credits ({:.1}%) at {}% or above",
            level6_higher,
            level6_total,
            percent(level6_higher, level6_total),
            threshold
        )
    } else {
        format!(
            "❌ Primary criterion not met: {} out of {} Level 6 credits ({:.1}%) at {}% or above (need 50%)",
            level6_higher,
            level6_total,
            percent(level6_higher, level6_total),
            threshold
        )
    };

    let combined_higher = credits_at_or_above(level5_modules, threshold) + level6_higher;
    let combined_total = total_credits(level5_modules) + level6_total;
    let combined_share = fraction(combined_higher, combined_total);

    let secondary = combined_total > 0.0
        && combined_share >= REQUIRED_SHARE
        && level6_higher >= SECONDARY_MIN_LEVEL6_CREDITS;
    let secondary_detail = if secondary {
        format!(
            "✅ Secondary criterion met: {} out of {} total credits ({:.1}%) at {}% or above, with {} Level 6 credits (need 40+)",
            combined_higher,
            combined_total,
            percent(combined_higher, combined_total),
            threshold,
            level6_higher
        )
    } else {
        format!(
            "❌ Secondary criterion not met: {} out of {} total credits ({:.1}%) at {}% or above, with {} Level 6 credits (need 50% total and 40+ Level 6 credits)",
            combined_higher,
            combined_total,
            percent(combined_higher, combined_total),
            threshold,
            level6_higher
        )
    };

    debug!(
        final_grade,
        potential = %higher_class,
        level6_higher,
        level6_total,
        combined_higher,
        combined_total,
        primary,
        secondary,
        "Borderline review"
    );

    BorderlineResult {
        is_borderline: true,
        current_class,
        potential_class: Some(higher_class),
        primary_criterion: primary,
        secondary_criterion: secondary,
        level6_higher_credits: level6_higher,
        level5_and6_higher_credits: combined_higher,
        details: vec![primary_detail, secondary_detail],
    }
}
