//! Data types shared by the grading pipeline.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// A single academic module: a mark out of 100 and its credit weight.
///
/// Marks and credits that could not be read as numbers are carried as NaN
/// and never count towards an average. JSON writes them as `null`, which
/// reads back as NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleRecord {
    pub name: String,
    #[serde(deserialize_with = "nan_if_null")]
    pub mark: f64,
    #[serde(deserialize_with = "nan_if_null")]
    pub credits: f64,
}

fn nan_if_null<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

impl ModuleRecord {
    pub fn new(name: impl Into<String>, mark: f64, credits: f64) -> Self {
        Self {
            name: name.into(),
            mark,
            credits,
        }
    }

    /// Builds a record using the default credit weight for its name.
    pub fn with_default_credits(name: impl Into<String>, mark: f64) -> Self {
        let name = name.into();
        let credits = default_credits_for(&name);
        Self::new(name, mark, credits)
    }

    /// True when the module contributes to weighted averages.
    pub fn is_countable(&self) -> bool {
        self.mark.is_finite() && self.credits.is_finite() && self.credits > 0.0
    }

    /// True for a zero-credit ("compensated credit") candidate.
    pub fn is_zero_credit(&self) -> bool {
        self.credits == 0.0
    }

    pub fn is_project(&self) -> bool {
        is_project_name(&self.name)
    }
}

/// Credit weight of a standard module.
pub const STANDARD_CREDITS: f64 = 20.0;

/// Credit weight of a final-year project.
pub const PROJECT_CREDITS: f64 = 40.0;

pub fn is_project_name(name: &str) -> bool {
    name.to_lowercase().contains("project")
}

/// 40 credits for anything named like a project, 20 otherwise.
pub fn default_credits_for(name: &str) -> f64 {
    if is_project_name(name) {
        PROJECT_CREDITS
    } else {
        STANDARD_CREDITS
    }
}

/// Study level a module was taken at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "6")]
    Six,
}

impl Level {
    /// Share of the final grade contributed by this level's average.
    pub fn weight(self) -> f64 {
        match self {
            Level::Five => 0.25,
            Level::Six => 0.75,
        }
    }

    pub fn from_digit(digit: u8) -> Option<Self> {
        match digit {
            5 => Some(Level::Five),
            6 => Some(Level::Six),
            _ => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Five => write!(f, "Level 5"),
            Level::Six => write!(f, "Level 6"),
        }
    }
}

/// An ordered list of modules taken at one level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cohort {
    pub level: Level,
    pub modules: Vec<ModuleRecord>,
}

impl Cohort {
    pub fn new(level: Level) -> Self {
        Self {
            level,
            modules: Vec::new(),
        }
    }

    pub fn with_modules(level: Level, modules: Vec<ModuleRecord>) -> Self {
        Self { level, modules }
    }

    pub fn push(&mut self, module: ModuleRecord) {
        self.modules.push(module);
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Modules that count towards the weighted average.
    pub fn countable(&self) -> impl Iterator<Item = &ModuleRecord> {
        self.modules.iter().filter(|m| m.is_countable())
    }

    /// Zero-credit modules still awaiting an inclusion decision.
    pub fn zero_credit(&self) -> impl Iterator<Item = &ModuleRecord> {
        self.modules.iter().filter(|m| m.is_zero_credit())
    }
}

/// UK honours degree classification, ordered lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Classification {
    #[serde(rename = "Fail")]
    Fail,
    #[serde(rename = "Third-Class Honours (3rd)")]
    Third,
    #[serde(rename = "Lower Second-Class Honours (2:2)")]
    LowerSecond,
    #[serde(rename = "Upper Second-Class Honours (2:1)")]
    UpperSecond,
    #[serde(rename = "First-Class Honours (1st)")]
    First,
}

impl Classification {
    /// Honours bands from highest to lowest. `Fail` has no threshold.
    pub const HONOURS: [Classification; 4] = [
        Classification::First,
        Classification::UpperSecond,
        Classification::LowerSecond,
        Classification::Third,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Classification::First => "First-Class Honours (1st)",
            Classification::UpperSecond => "Upper Second-Class Honours (2:1)",
            Classification::LowerSecond => "Lower Second-Class Honours (2:2)",
            Classification::Third => "Third-Class Honours (3rd)",
            Classification::Fail => "Fail",
        }
    }

    /// Lowest final grade that earns this classification.
    pub fn threshold(self) -> Option<f64> {
        match self {
            Classification::First => Some(70.0),
            Classification::UpperSecond => Some(60.0),
            Classification::LowerSecond => Some(50.0),
            Classification::Third => Some(40.0),
            Classification::Fail => None,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of the borderline-upgrade review.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BorderlineResult {
    pub is_borderline: bool,
    pub current_class: Classification,
    pub potential_class: Option<Classification>,
    pub primary_criterion: bool,
    pub secondary_criterion: bool,
    pub level6_higher_credits: f64,
    pub level5_and6_higher_credits: f64,
    /// One explanation line per criterion, primary first.
    pub details: Vec<String>,
}

impl BorderlineResult {
    pub fn not_borderline(current_class: Classification) -> Self {
        Self {
            is_borderline: false,
            current_class,
            potential_class: None,
            primary_criterion: false,
            secondary_criterion: false,
            level6_higher_credits: 0.0,
            level5_and6_higher_credits: 0.0,
            details: Vec::new(),
        }
    }

    /// Either criterion is enough for the examination board to consider an upgrade.
    pub fn eligible_for_upgrade(&self) -> bool {
        self.is_borderline && (self.primary_criterion || self.secondary_criterion)
    }
}

/// Complete result of evaluating both cohorts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeReport {
    pub level5_average: f64,
    pub level6_average: f64,
    pub final_grade: f64,
    pub classification: Classification,
    pub borderline: BorderlineResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_mark_survives_json() {
        let record = ModuleRecord::new("Final Project", f64::NAN, 40.0);
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"name":"Final Project","mark":null,"credits":40.0}"#);

        let back: ModuleRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, "Final Project");
        assert!(back.mark.is_nan());
        assert_eq!(back.credits, 40.0);
        assert!(!back.is_countable());
    }

    #[test]
    fn test_cohort_with_missing_values_reads_back() {
        let cohort = Cohort::with_modules(
            Level::Six,
            vec![
                ModuleRecord::new("Networks", 64.0, 20.0),
                ModuleRecord::new("Ethics", 58.0, f64::NAN),
            ],
        );
        let json = serde_json::to_string(&cohort).unwrap();
        let back: Cohort = serde_json::from_str(&json).unwrap();
        assert_eq!(back.level, Level::Six);
        assert_eq!(back.modules[0], cohort.modules[0]);
        assert!(back.modules[1].credits.is_nan());
        assert_eq!(back.countable().count(), 1);
    }

    #[test]
    fn test_default_credits_by_name() {
        assert_eq!(default_credits_for("Individual Project"), PROJECT_CREDITS);
        assert_eq!(default_credits_for("Databases"), STANDARD_CREDITS);
    }
}
