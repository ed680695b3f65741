use crate::grading::types::ModuleRecord;

/// Sums the credits of countable modules. Returns 0.0 for empty input.
pub fn total_credits<'a>(modules: impl IntoIterator<Item = &'a ModuleRecord>) -> f64 {
    modules
        .into_iter()
        .filter(|m| m.is_countable())
        .map(|m| m.credits)
        .fold(0.0, |acc, c| acc + c)
}

/// Sums the credits of countable modules marked at or above `threshold`.
pub fn credits_at_or_above<'a>(
    modules: impl IntoIterator<Item = &'a ModuleRecord>,
    threshold: f64,
) -> f64 {
    modules
        .into_iter()
        .filter(|m| m.is_countable() && m.mark >= threshold)
        .map(|m| m.credits)
        .fold(0.0, |acc, c| acc + c)
}

/// Divides `part` by `whole`, returning 0.0 when `whole` is not positive.
pub fn fraction(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { part / whole } else { 0.0 }
}

/// `part` as a percentage of `whole`, rounded to one decimal place with halves
/// going up. Returns 0.0 when `whole` is not positive.
pub fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        (part * 1000.0 / whole).round() / 10.0
    } else {
        0.0
    }
}
