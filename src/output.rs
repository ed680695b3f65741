//! Output formatting and persistence for grade results.
//!
//! Supports a human-readable summary, JSON serialization, and CSV
//! import/export of module lists.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::path::Path;
use tracing::{debug, warn};

use crate::grading::types::{Cohort, GradeReport, Level, ModuleRecord, default_credits_for};

pub const SCHEMA_VERSION: u8 = 1;

/// JSON document written for one evaluation.
#[derive(Serialize)]
pub struct ReportDocument<'a> {
    pub schema_version: u8,
    pub generated_at: DateTime<Utc>,
    pub level5: &'a Cohort,
    pub level6: &'a Cohort,
    pub result: &'a GradeReport,
}

impl<'a> ReportDocument<'a> {
    pub fn new(level5: &'a Cohort, level6: &'a Cohort, result: &'a GradeReport) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            generated_at: Utc::now(),
            level5,
            level6,
            result,
        }
    }
}

/// Logs a report using Rust's debug pretty-print format.
pub fn print_pretty(report: &GradeReport) {
    debug!("{:#?}", report);
}

/// Serializes the cohorts and their evaluation as pretty-printed JSON.
pub fn to_json(level5: &Cohort, level6: &Cohort, report: &GradeReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(&ReportDocument::new(
        level5, level6, report,
    ))?)
}

/// Renders the evaluation as plain text for a terminal.
pub fn render_summary(report: &GradeReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Level 5 Weighted Average: {:.2}", report.level5_average);
    let _ = writeln!(out, "Level 6 Weighted Average: {:.2}", report.level6_average);
    let _ = writeln!(out, "Final Grade: {:.2}", report.final_grade);
    let _ = writeln!(out, "Current Classification: {}", report.classification);

    let borderline = &report.borderline;
    if !borderline.is_borderline {
        return out;
    }

    let potential = borderline
        .potential_class
        .map(|c| c.label())
        .unwrap_or_default();

    let _ = writeln!(out);
    let _ = writeln!(out, "Borderline Classification Analysis");
    let _ = writeln!(out, "You are in the 2% borderline zone for {potential}.");
    if borderline.eligible_for_upgrade() {
        let _ = writeln!(out, "POSSIBLE UPGRADE: you may be eligible for {potential}.");
        let _ = writeln!(
            out,
            "This is not guaranteed; final decisions are made by the Examination Board."
        );
    } else {
        let _ = writeln!(out, "Upgrade criteria not met.");
        let _ = writeln!(out, "You remain at {}.", borderline.current_class);
    }
    let _ = writeln!(out);
    for detail in &borderline.details {
        let _ = writeln!(out, "  {detail}");
    }

    out
}

/// Lists a cohort's modules, flagging those that will not be counted.
pub fn render_modules(cohort: &Cohort) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} modules:", cohort.level);

    if cohort.is_empty() {
        let _ = writeln!(out, "  (none)");
        return out;
    }

    for module in &cohort.modules {
        let mark = if module.mark.is_finite() {
            format!("{}", module.mark)
        } else {
            "awaiting mark".to_string()
        };
        let _ = writeln!(out, "  - {}: {} ({} credits)", module.name, mark, module.credits);
    }
    out
}

/// One row of a module CSV file.
///
/// `mark` and `credits` are read as text so that blank or malformed cells
/// become uncountable modules instead of decode errors.
#[derive(Debug, Serialize, Deserialize)]
struct ModuleRow {
    #[serde(default)]
    level: Option<String>,
    name: String,
    #[serde(default)]
    mark: Option<String>,
    #[serde(default)]
    credits: Option<String>,
}

impl ModuleRow {
    /// Marks outside 0..=100 and negative credits are kept as NaN.
    fn into_record(self) -> ModuleRecord {
        let name = self.name.trim();
        let mut mark = parse_number(self.mark.as_deref());
        let mut credits = match self.credits.as_deref().map(str::trim) {
            None | Some("") => default_credits_for(name),
            Some(value) => value.parse::<f64>().unwrap_or(f64::NAN),
        };
        if mark.is_finite() && !(0.0..=100.0).contains(&mark) {
            warn!(name, mark, "Mark out of range, treating as missing");
            mark = f64::NAN;
        }
        if credits.is_finite() && credits < 0.0 {
            warn!(name, credits, "Negative credits, treating as missing");
            credits = f64::NAN;
        }
        ModuleRecord::new(name, mark, credits)
    }

    fn from_record(level: Level, module: &ModuleRecord) -> Self {
        Self {
            level: Some(level_column(level).to_string()),
            name: module.name.clone(),
            mark: module.mark.is_finite().then(|| module.mark.to_string()),
            credits: module.credits.is_finite().then(|| module.credits.to_string()),
        }
    }
}

fn parse_number(value: Option<&str>) -> f64 {
    value
        .map(str::trim)
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

fn level_column(level: Level) -> &'static str {
    match level {
        Level::Five => "5",
        Level::Six => "6",
    }
}

/// Reads a `name,mark,credits` CSV into a cohort at `level`.
///
/// A blank credits cell takes the default for the module name. Any `level`
/// column is ignored.
pub fn read_cohort_csv(path: &Path, level: Level) -> Result<Cohort> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut cohort = Cohort::new(level);
    for result in reader.deserialize::<ModuleRow>() {
        let row = result.with_context(|| format!("invalid module row in {}", path.display()))?;
        cohort.push(row.into_record());
    }

    debug!(path = %path.display(), %level, modules = cohort.len(), "Cohort loaded");
    Ok(cohort)
}

/// Reads a `level,name,mark,credits` CSV holding both levels.
///
/// Rows whose level is neither 5 nor 6 are skipped with a warning.
pub fn read_modules_csv(path: &Path) -> Result<(Cohort, Cohort)> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut level5 = Cohort::new(Level::Five);
    let mut level6 = Cohort::new(Level::Six);

    for result in reader.deserialize::<ModuleRow>() {
        let row = result.with_context(|| format!("invalid module row in {}", path.display()))?;
        match row.level.as_deref() {
            Some("5") => level5.push(row.into_record()),
            Some("6") => level6.push(row.into_record()),
            other => warn!(name = %row.name, level = ?other, "Skipping module with unknown level"),
        }
    }

    Ok((level5, level6))
}

/// Appends a cohort's modules as `level,name,mark,credits` rows to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_cohort(path: &Path, cohort: &Cohort) -> Result<()> {
    let file_exists = path.exists();
    debug!(path = %path.display(), file_exists, "Appending CSV records");

    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    for module in &cohort.modules {
        writer.serialize(ModuleRow::from_record(cohort.level, module))?;
    }
    writer.flush()?;

    Ok(())
}
