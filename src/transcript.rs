//! Best-effort parser for transcript text.
//!
//! Input is usually OCR output of a results page, so every line is matched
//! against a cascade of progressively looser patterns and the first match
//! wins. Lines that match nothing are ignored. There is no stronger promise
//! than recovering plausible records from a well-formed results export.

use anyhow::Result;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

use crate::grading::types::{
    Cohort, Level, ModuleRecord, PROJECT_CREDITS, STANDARD_CREDITS, is_project_name,
};

const SKIP_MARKERS: &[&str] = &[
    "Year Module Level Mark Grade Result Attempt Credit",
    "Results for module",
    "unavailable pending",
    "currently unavailable",
];

/// Which recogniser accepted a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineShape {
    /// Full results row including result, attempt and credits.
    Table,
    /// Row with a mark and letter grade but unreliable trailing columns.
    Flexible,
    /// Level, mark and grade found somewhere after the module name.
    Lenient,
    /// Module listed without a result yet.
    Pending,
}

/// One module recovered from a transcript line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptEntry {
    pub year: String,
    pub code: String,
    pub title: String,
    pub level: Level,
    /// `None` while the result is pending.
    pub mark: Option<u32>,
    pub letter_grade: Option<String>,
    pub credits: f64,
    pub shape: LineShape,
}

impl TranscriptEntry {
    pub fn name(&self) -> String {
        format!("{} - {}", self.code, self.title)
    }

    pub fn to_module_record(&self) -> ModuleRecord {
        ModuleRecord::new(
            self.name(),
            self.mark.map_or(f64::NAN, f64::from),
            self.credits,
        )
    }
}

/// Modules found in a transcript, split by level in reading order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedTranscript {
    pub level5: Vec<TranscriptEntry>,
    pub level6: Vec<TranscriptEntry>,
}

impl ParsedTranscript {
    pub fn is_empty(&self) -> bool {
        self.level5.is_empty() && self.level6.is_empty()
    }

    pub fn into_cohorts(self) -> (Cohort, Cohort) {
        let level5 = self.level5.iter().map(TranscriptEntry::to_module_record).collect();
        let level6 = self.level6.iter().map(TranscriptEntry::to_module_record).collect();
        (
            Cohort::with_modules(Level::Five, level5),
            Cohort::with_modules(Level::Six, level6),
        )
    }
}

/// Compiled recogniser cascade.
pub struct TranscriptParser {
    table: Regex,
    flexible: Regex,
    lenient: Regex,
    pending: Regex,
    sub_row: Regex,
    trailing_number: Regex,
    ocr_code: Regex,
}

impl TranscriptParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            // 2023/24 CI514 Embedded Systems 5 30 E- F 1 0.0
            table: Regex::new(
                r"(?i)^(\d{4}/\d{2})\s+([a-z]+\d+)\s+(.+?)\s+([56])\s+(\d{1,3})\s+([a-z]+[+-]?)\s+[pf]\s+\d+\s+([\d.]+)",
            )?,
            // 2023/24 Ci517 Game Engine Fundamentals 5 65 B ...
            flexible: Regex::new(
                r"(?i)^(\d{4}/\d{2})\s+([a-z]+\d+)\s+(.+?)\s+([56])\s+(\d{1,3})\s+([a-z]+[+-]?)",
            )?,
            lenient: Regex::new(
                r"(?i)(\d{4}/\d{2})\s+([a-z]+\d+)\s+(.+?)\s+([56]).*?(\d{1,3})\s+([a-z]+[+-]?)",
            )?,
            // 2024/25 C1601 The Computing Project 6
            pending: Regex::new(r"(?i)^(\d{4}/\d{2})\s+([a-z]+\d+)\s+(.+?)\s+([56])$")?,
            sub_row: Regex::new(r"^0[1-9]\s+")?,
            trailing_number: Regex::new(r"([\d.]+)$")?,
            ocr_code: Regex::new(r"^CIS?(\d{2})$")?,
        })
    }

    /// Parses every line of `text`.
    pub fn parse(&self, text: &str) -> ParsedTranscript {
        let mut parsed = ParsedTranscript::default();

        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let Some(entry) = self.parse_line(line) else {
                continue;
            };
            debug!(
                shape = ?entry.shape,
                code = %entry.code,
                level = %entry.level,
                mark = ?entry.mark,
                credits = entry.credits,
                "Transcript module recognised"
            );
            match entry.level {
                Level::Five => parsed.level5.push(entry),
                Level::Six => parsed.level6.push(entry),
            }
        }

        info!(
            level5 = parsed.level5.len(),
            level6 = parsed.level6.len(),
            "Transcript parsed"
        );
        parsed
    }

    /// Recognises a single trimmed line, or returns `None` to skip it.
    pub fn parse_line(&self, line: &str) -> Option<TranscriptEntry> {
        if self.should_skip(line) {
            return None;
        }

        if let Some(caps) = self.table.captures(line) {
            let mut entry = self.entry(&caps, LineShape::Table)?;
            entry.credits = caps[7].parse::<f64>().ok().filter(|c| *c >= 0.0)?;
            return Some(entry);
        }

        if let Some(caps) = self.flexible.captures(line) {
            let mut entry = self.entry(&caps, LineShape::Flexible)?;
            entry.credits = if entry.level == Level::Six && is_project_name(&entry.title) {
                self.trailing_number
                    .captures(line)
                    .and_then(|c| c[1].parse::<f64>().ok())
                    .unwrap_or(STANDARD_CREDITS)
            } else {
                STANDARD_CREDITS
            };
            return Some(entry);
        }

        if let Some(caps) = self.lenient.captures(line) {
            let mut entry = self.entry(&caps, LineShape::Lenient)?;
            entry.credits = if entry.level == Level::Six && is_project_name(&entry.title) {
                PROJECT_CREDITS
            } else {
                STANDARD_CREDITS
            };
            return Some(entry);
        }

        if let Some(caps) = self.pending.captures(line) {
            let level = level_of(&caps[4])?;
            let title = caps[3].trim();
            let code = self.normalize_code(&caps[2]);
            if level != Level::Six || !is_project_name(title) || is_excluded_code(&code) {
                return None;
            }
            return Some(TranscriptEntry {
                year: caps[1].to_string(),
                code,
                title: title.to_string(),
                level,
                mark: None,
                letter_grade: None,
                credits: PROJECT_CREDITS,
                shape: LineShape::Pending,
            });
        }

        None
    }

    fn should_skip(&self, line: &str) -> bool {
        SKIP_MARKERS.iter().any(|marker| line.contains(marker)) || self.sub_row.is_match(line)
    }

    /// Builds an entry from the shared year/code/title/level/mark/grade groups.
    /// Credits are filled in by the caller.
    fn entry(&self, caps: &regex::Captures<'_>, shape: LineShape) -> Option<TranscriptEntry> {
        let code = self.normalize_code(&caps[2]);
        if is_excluded_code(&code) {
            debug!(code = %code, "Skipping 4xx module");
            return None;
        }

        let mark = caps[5].parse::<u32>().ok().filter(|m| *m <= 100)?;

        Some(TranscriptEntry {
            year: caps[1].to_string(),
            code,
            title: caps[3].trim().to_string(),
            level: level_of(&caps[4])?,
            mark: Some(mark),
            letter_grade: Some(caps[6].to_uppercase()),
            credits: 0.0,
            shape,
        })
    }

    /// Upper-cases a module code and repairs the common OCR misreads of
    /// `CI5nn` (`CISnn`, `CInn`).
    fn normalize_code(&self, raw: &str) -> String {
        let code = raw.to_uppercase();
        match self.ocr_code.captures(&code) {
            Some(caps) => format!("CI5{}", &caps[1]),
            None => code,
        }
    }
}

/// Convenience wrapper compiling a parser for a single transcript.
pub fn parse_transcript(text: &str) -> Result<ParsedTranscript> {
    Ok(TranscriptParser::new()?.parse(text))
}

fn level_of(digit: &str) -> Option<Level> {
    digit.parse::<u8>().ok().and_then(Level::from_digit)
}

/// Codes whose three-digit number starts with 4 are not credit bearing here.
fn is_excluded_code(code: &str) -> bool {
    let digits: Vec<char> = code.chars().rev().take(3).collect();
    digits.len() == 3 && digits.iter().all(char::is_ascii_digit) && digits[2] == '4'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> TranscriptParser {
        TranscriptParser::new().unwrap()
    }

    #[test]
    fn test_table_row_keeps_zero_credits() {
        let entry = parser()
            .parse_line("2023/24 CI514 Embedded Systems 5 30 E- F 1 0.0")
            .unwrap();
        assert_eq!(entry.shape, LineShape::Table);
        assert_eq!(entry.code, "CI514");
        assert_eq!(entry.title, "Embedded Systems");
        assert_eq!(entry.level, Level::Five);
        assert_eq!(entry.mark, Some(30));
        assert_eq!(entry.letter_grade.as_deref(), Some("E-"));
        assert_eq!(entry.credits, 0.0);
        assert_eq!(entry.name(), "CI514 - Embedded Systems");
    }

    #[test]
    fn test_table_row_is_case_insensitive() {
        let entry = parser()
            .parse_line("2023/24 Ci517 Game Engine Fundamentals 5 65 B p 1 20.0")
            .unwrap();
        assert_eq!(entry.shape, LineShape::Table);
        assert_eq!(entry.code, "CI517");
        assert_eq!(entry.title, "Game Engine Fundamentals");
        assert_eq!(entry.credits, 20.0);
    }

    #[test]
    fn test_ocr_code_repair() {
        let p = parser();
        let entry = p
            .parse_line("2023/24 Cis14 Embedded Systems 5 30 E- F 1 0.0")
            .unwrap();
        assert_eq!(entry.code, "CI514");
        let entry = p
            .parse_line("2023/24 CI18 Software Testing 5 58 C P 1 20.0")
            .unwrap();
        assert_eq!(entry.code, "CI518");
    }

    #[test]
    fn test_flexible_row_defaults_credits() {
        let p = parser();
        let entry = p
            .parse_line("2023/24 CI536 Integrated Group Work 5 62 B- P")
            .unwrap();
        assert_eq!(entry.shape, LineShape::Flexible);
        assert_eq!(entry.credits, 20.0);

        let entry = p
            .parse_line("2024/25 CI601 The Computing Project 6 71 A- P 40")
            .unwrap();
        assert_eq!(entry.shape, LineShape::Flexible);
        assert_eq!(entry.credits, 40.0);
    }

    #[test]
    fn test_lenient_row() {
        let entry = parser()
            .parse_line("Row: 2024/25 CI602 Final Year Project 6 | 68 B+")
            .unwrap();
        assert_eq!(entry.shape, LineShape::Lenient);
        assert_eq!(entry.level, Level::Six);
        assert_eq!(entry.mark, Some(68));
        assert_eq!(entry.credits, 40.0);
    }

    #[test]
    fn test_pending_project_only() {
        let p = parser();
        let entry = p
            .parse_line("2024/25 C1601 The Computing Project 6")
            .unwrap();
        assert_eq!(entry.shape, LineShape::Pending);
        assert_eq!(entry.code, "C1601");
        assert_eq!(entry.mark, None);
        assert_eq!(entry.credits, 40.0);
        assert!(!entry.to_module_record().is_countable());

        assert!(p.parse_line("2024/25 CI610 Cyber Security 6").is_none());
        assert!(p.parse_line("2023/24 CI520 Student Project 5").is_none());
    }

    #[test]
    fn test_4xx_codes_excluded() {
        let p = parser();
        assert!(p.parse_line("2023/24 CI401 Programming 5 70 A P 1 20.0").is_none());
        assert!(p.parse_line("2023/24 CI401 Programming 5 70 A P").is_none());
    }

    #[test]
    fn test_out_of_range_mark_dropped() {
        assert!(parser()
            .parse_line("2023/24 CI512 Intelligent Systems 5 101 A P 1 20.0")
            .is_none());
    }

    #[test]
    fn test_skip_rules() {
        let p = parser();
        assert!(p.parse_line("Year Module Level Mark Grade Result Attempt Credit").is_none());
        assert!(p.parse_line("Results for module CI512").is_none());
        assert!(p.parse_line("01 Coursework 5 70 A P 1 20.0").is_none());
        assert!(p
            .parse_line("2024/25 CI603 Dissertation 6 result currently unavailable")
            .is_none());
        assert!(p.parse_line("Student number 12345678").is_none());
    }

    #[test]
    fn test_parse_splits_levels() {
        let text = "\
Year Module Level Mark Grade Result Attempt Credit
2023/24 CI512 Intelligent Systems 5 65 B P 1 20.0

  2023/24 CI514 Embedded Systems 5 30 E- F 1 0.0
01 Coursework 65 B
2024/25 CI601 The Computing Project 6
2024/25 CI610 Cyber Security 6 72 A- P 1 20.0
";
        let parsed = parse_transcript(text).unwrap();
        assert_eq!(parsed.level5.len(), 2);
        assert_eq!(parsed.level6.len(), 2);
        assert_eq!(parsed.level6[0].shape, LineShape::Pending);

        let (l5, l6) = parsed.into_cohorts();
        assert_eq!(l5.level, Level::Five);
        assert_eq!(l5.zero_credit().count(), 1);
        assert_eq!(l6.modules[1].name, "CI610 - Cyber Security");
        assert_eq!(l6.modules[1].mark, 72.0);
    }

    #[test]
    fn test_parse_empty_text() {
        assert!(parse_transcript("").unwrap().is_empty());
        assert!(parse_transcript("no modules here\n\n").unwrap().is_empty());
    }

    #[test]
    fn test_excluded_code_helper() {
        assert!(is_excluded_code("CI401"));
        assert!(!is_excluded_code("CI514"));
        assert!(!is_excluded_code("C1601"));
        assert!(!is_excluded_code("AB12"));
    }
}
