use crate::grading::borderline::check_borderline_eligibility;
use crate::grading::grade::classify;
use crate::grading::types::{Cohort, GradeReport, Level, ModuleRecord};
use tracing::{info, warn};

/// Credit-weighted mean mark of the countable modules.
///
/// Modules with a non-numeric mark or credit value, or with no credits, are
/// skipped. Returns 0.0 when nothing is countable.
pub fn weighted_average<'a>(modules: impl IntoIterator<Item = &'a ModuleRecord>) -> f64 {
    let mut weighted_sum = 0.0;
    let mut total_credits = 0.0;

    for module in modules {
        if !module.is_countable() {
            continue;
        }
        weighted_sum += module.mark * module.credits;
        total_credits += module.credits;
    }

    if total_credits > 0.0 {
        weighted_sum / total_credits
    } else {
        0.0
    }
}

/// Blends the two level averages with the fixed 25/75 weighting.
pub fn final_grade(level5_average: f64, level6_average: f64) -> f64 {
    level5_average * Level::Five.weight() + level6_average * Level::Six.weight()
}

/// Evaluates both cohorts into a [`GradeReport`].
///
/// Zero-credit modules must already have been resolved; any still present
/// are left out of the averages like any other uncountable module.
pub fn evaluate(level5: &Cohort, level6: &Cohort) -> GradeReport {
    for cohort in [level5, level6] {
        let pending = cohort.zero_credit().count();
        if pending > 0 {
            warn!(level = %cohort.level, pending, "Unresolved zero-credit modules left out");
        }
    }

    let level5_modules: Vec<ModuleRecord> = level5.countable().cloned().collect();
    let level6_modules: Vec<ModuleRecord> = level6.countable().cloned().collect();

    let level5_average = weighted_average(&level5_modules);
    let level6_average = weighted_average(&level6_modules);
    let final_grade = final_grade(level5_average, level6_average);
    let classification = classify(final_grade);
    let borderline = check_borderline_eligibility(final_grade, &level5_modules, &level6_modules);

    info!(
        level5_average,
        level6_average,
        final_grade,
        classification = %classification,
        borderline = borderline.is_borderline,
        "Grades evaluated"
    );

    GradeReport {
        level5_average,
        level6_average,
        final_grade,
        classification,
        borderline,
    }
}
