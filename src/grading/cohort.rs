//! Compensated-credit resolution and import normalisation.
//!
//! A module recorded with zero credits may have been passed on compensation.
//! It only joins the averages once a [`CompensatedCreditResolver`] decides to
//! include it; excluded modules are dropped from the cohort.

use crate::grading::types::{Cohort, Level, ModuleRecord, PROJECT_CREDITS, STANDARD_CREDITS};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use tracing::{debug, info};

/// Credits given to an included compensated module unless the resolver says otherwise.
pub const COMPENSATED_CREDITS: f64 = 20.0;

/// A project needs at least this many credits to fill the final-project slot.
pub const FINAL_PROJECT_MIN_CREDITS: f64 = 30.0;

pub const FINAL_PROJECT_NAME: &str = "Final Project";

/// Answer to "did this zero-credit module earn compensated credit?".
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CompensationDecision {
    pub include: bool,
    /// Credits to count the module at. Falls back to the resolver default.
    pub credits: Option<f64>,
    /// Replacement mark. Keeps the recorded mark when absent.
    pub mark: Option<f64>,
}

impl CompensationDecision {
    pub fn include(credits: f64) -> Self {
        Self {
            include: true,
            credits: Some(credits),
            mark: None,
        }
    }

    pub fn exclude() -> Self {
        Self::default()
    }
}

/// Decides whether zero-credit modules count.
///
/// Resolution blocks until the implementation answers; there is no timeout.
pub trait CompensatedCreditResolver {
    fn resolve(&mut self, module: &ModuleRecord, level: Level) -> Result<CompensationDecision>;
}

/// Gives the same answer for every module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CompensationPolicy {
    /// Ask interactively. Handled by [`PromptResolver`]; as a fixed policy it excludes.
    #[default]
    Ask,
    Include,
    Exclude,
}

/// Fixed-answer resolver backed by a [`CompensationPolicy`].
#[derive(Debug, Clone, Copy)]
pub struct PolicyResolver {
    pub policy: CompensationPolicy,
    pub credits: f64,
}

impl PolicyResolver {
    pub fn new(policy: CompensationPolicy, credits: f64) -> Self {
        Self { policy, credits }
    }
}

impl CompensatedCreditResolver for PolicyResolver {
    fn resolve(&mut self, _module: &ModuleRecord, _level: Level) -> Result<CompensationDecision> {
        Ok(match self.policy {
            CompensationPolicy::Include => CompensationDecision::include(self.credits),
            CompensationPolicy::Ask | CompensationPolicy::Exclude => {
                CompensationDecision::exclude()
            }
        })
    }
}

/// Asks the user about each zero-credit module over a reader/writer pair.
///
/// Any answer starting with `y` includes the module with its recorded mark;
/// anything else, including end of input, excludes it.
pub struct PromptResolver<R, W> {
    input: R,
    output: W,
    credits: f64,
}

impl<R: BufRead, W: Write> PromptResolver<R, W> {
    pub fn new(input: R, output: W, credits: f64) -> Self {
        Self {
            input,
            output,
            credits,
        }
    }
}

impl<R: BufRead, W: Write> CompensatedCreditResolver for PromptResolver<R, W> {
    fn resolve(&mut self, module: &ModuleRecord, level: Level) -> Result<CompensationDecision> {
        let mark = if module.mark.is_finite() {
            module.mark
        } else {
            0.0
        };

        writeln!(self.output, "Zero credits detected: {} ({level})", module.name)?;
        writeln!(
            self.output,
            "Did you receive compensated credit for this module?"
        )?;
        write!(
            self.output,
            "[y] use mark {} with {} credits / [n] exclude module: ",
            mark, self.credits
        )?;
        self.output.flush()?;

        let mut answer = String::new();
        self.input.read_line(&mut answer)?;

        if answer.trim().to_lowercase().starts_with('y') {
            Ok(CompensationDecision {
                include: true,
                credits: Some(self.credits),
                mark: Some(mark),
            })
        } else {
            Ok(CompensationDecision::exclude())
        }
    }
}

/// Runs every zero-credit module through `resolver`.
///
/// Included modules take the decided credits (or [`COMPENSATED_CREDITS`]) and
/// mark; excluded modules are removed. Other modules pass through untouched.
pub fn resolve_compensated<C: CompensatedCreditResolver + ?Sized>(
    cohort: Cohort,
    resolver: &mut C,
) -> Result<Cohort> {
    let level = cohort.level;
    let mut modules = Vec::with_capacity(cohort.modules.len());

    for mut module in cohort.modules {
        if !module.is_zero_credit() {
            modules.push(module);
            continue;
        }

        let decision = resolver.resolve(&module, level)?;
        if !decision.include {
            info!(module = %module.name, %level, "Compensated module excluded");
            continue;
        }

        module.credits = decision.credits.unwrap_or(COMPENSATED_CREDITS);
        if let Some(mark) = decision.mark {
            module.mark = mark;
        }
        info!(
            module = %module.name,
            %level,
            credits = module.credits,
            "Compensated module included"
        );
        modules.push(module);
    }

    Ok(Cohort::with_modules(level, modules))
}

/// Applies the standard credit weights to imported transcript modules.
///
/// Level 5 modules count 20 credits. Level 6 projects keep their recorded
/// credits (40 when none); other Level 6 modules count 20. Zero-credit
/// modules keep their 0 for the resolver.
pub fn normalize_imported(cohort: Cohort) -> Cohort {
    let level = cohort.level;
    let modules = cohort
        .modules
        .into_iter()
        .map(|mut module| {
            if module.is_zero_credit() {
                return module;
            }
            module.credits = match level {
                Level::Six if module.is_project() => {
                    if module.credits > 0.0 {
                        module.credits
                    } else {
                        PROJECT_CREDITS
                    }
                }
                _ => STANDARD_CREDITS,
            };
            module
        })
        .collect();

    Cohort::with_modules(level, modules)
}

/// Makes sure Level 6 carries a final project.
///
/// When no project of at least [`FINAL_PROJECT_MIN_CREDITS`] is present, a
/// placeholder worth 40 credits with no mark is appended. It stays out of the
/// averages until a mark is supplied.
pub fn ensure_final_project(mut cohort: Cohort) -> Cohort {
    if cohort.level != Level::Six {
        return cohort;
    }

    let has_project = cohort
        .modules
        .iter()
        .any(|m| m.is_project() && m.credits >= FINAL_PROJECT_MIN_CREDITS);

    if !has_project {
        debug!("No final project found, adding placeholder");
        cohort.push(ModuleRecord::new(FINAL_PROJECT_NAME, f64::NAN, PROJECT_CREDITS));
    }

    cohort
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct Recording {
        seen: Vec<String>,
        decision: CompensationDecision,
    }

    impl CompensatedCreditResolver for Recording {
        fn resolve(&mut self, module: &ModuleRecord, _level: Level) -> Result<CompensationDecision> {
            self.seen.push(module.name.clone());
            Ok(self.decision)
        }
    }

    fn sample(level: Level) -> Cohort {
        Cohort::with_modules(
            level,
            vec![
                ModuleRecord::new("CI512 - Intelligent Systems", 65.0, 20.0),
                ModuleRecord::new("CI514 - Embedded Systems", 30.0, 0.0),
                ModuleRecord::new("CI517 - Game Engines", 72.0, 20.0),
            ],
        )
    }

    #[test]
    fn test_only_zero_credit_modules_are_asked() {
        let mut resolver = Recording {
            seen: Vec::new(),
            decision: CompensationDecision::exclude(),
        };
        let resolved = resolve_compensated(sample(Level::Five), &mut resolver).unwrap();
        assert_eq!(resolver.seen, vec!["CI514 - Embedded Systems"]);
        assert_eq!(resolved.len(), 2);
        assert!(resolved.zero_credit().next().is_none());
    }

    #[test]
    fn test_include_uses_decided_credits_and_mark() {
        let mut resolver = Recording {
            seen: Vec::new(),
            decision: CompensationDecision {
                include: true,
                credits: Some(15.0),
                mark: Some(40.0),
            },
        };
        let resolved = resolve_compensated(sample(Level::Five), &mut resolver).unwrap();
        assert_eq!(resolved.len(), 3);
        assert_eq!(resolved.modules[1].credits, 15.0);
        assert_eq!(resolved.modules[1].mark, 40.0);
    }

    #[test]
    fn test_include_without_credits_uses_default() {
        let mut resolver = Recording {
            seen: Vec::new(),
            decision: CompensationDecision {
                include: true,
                credits: None,
                mark: None,
            },
        };
        let resolved = resolve_compensated(sample(Level::Six), &mut resolver).unwrap();
        assert_eq!(resolved.modules[1].credits, COMPENSATED_CREDITS);
        assert_eq!(resolved.modules[1].mark, 30.0);
    }

    #[test]
    fn test_policy_resolver() {
        let mut include = PolicyResolver::new(CompensationPolicy::Include, 20.0);
        let resolved = resolve_compensated(sample(Level::Five), &mut include).unwrap();
        assert_eq!(resolved.len(), 3);
        assert_eq!(resolved.modules[1].credits, 20.0);

        let mut exclude = PolicyResolver::new(CompensationPolicy::Exclude, 20.0);
        let resolved = resolve_compensated(sample(Level::Five), &mut exclude).unwrap();
        assert_eq!(resolved.len(), 2);
    }

    #[test]
    fn test_prompt_resolver_yes() {
        let mut output = Vec::new();
        let mut resolver = PromptResolver::new(Cursor::new("y\n"), &mut output, 20.0);
        let module = ModuleRecord::new("CI514 - Embedded Systems", 30.0, 0.0);
        let decision = resolver.resolve(&module, Level::Five).unwrap();
        assert_eq!(decision, CompensationDecision {
            include: true,
            credits: Some(20.0),
            mark: Some(30.0),
        });
        drop(resolver);
        let prompt = String::from_utf8(output).unwrap();
        assert!(prompt.contains("CI514 - Embedded Systems"));
        assert!(prompt.contains("use mark 30 with 20 credits"));
    }

    #[test]
    fn test_prompt_resolver_no_and_eof() {
        let module = ModuleRecord::new("CI514 - Embedded Systems", 30.0, 0.0);

        let mut resolver = PromptResolver::new(Cursor::new("n\n"), Vec::new(), 20.0);
        assert!(!resolver.resolve(&module, Level::Five).unwrap().include);

        let mut resolver = PromptResolver::new(Cursor::new(""), Vec::new(), 20.0);
        assert!(!resolver.resolve(&module, Level::Five).unwrap().include);
    }

    #[test]
    fn test_normalize_imported_levels() {
        let l5 = Cohort::with_modules(
            Level::Five,
            vec![
                ModuleRecord::new("CI512 - Intelligent Systems", 65.0, 15.0),
                ModuleRecord::new("CI514 - Embedded Systems", 30.0, 0.0),
            ],
        );
        let l5 = normalize_imported(l5);
        assert_eq!(l5.modules[0].credits, 20.0);
        assert_eq!(l5.modules[1].credits, 0.0);

        let l6 = Cohort::with_modules(
            Level::Six,
            vec![
                ModuleRecord::new("CI601 - The Computing Project", 68.0, 40.0),
                ModuleRecord::new("CI602 - Group Project", 70.0, 30.0),
                ModuleRecord::new("CI610 - Security", 55.0, 10.0),
            ],
        );
        let l6 = normalize_imported(l6);
        assert_eq!(l6.modules[0].credits, 40.0);
        assert_eq!(l6.modules[1].credits, 30.0);
        assert_eq!(l6.modules[2].credits, 20.0);
    }

    #[test]
    fn test_final_project_placeholder() {
        let l6 = Cohort::with_modules(
            Level::Six,
            vec![ModuleRecord::new("CI610 - Security", 55.0, 20.0)],
        );
        let l6 = ensure_final_project(l6);
        assert_eq!(l6.len(), 2);
        assert_eq!(l6.modules[1].name, FINAL_PROJECT_NAME);
        assert!(!l6.modules[1].is_countable());

        let with_project = Cohort::with_modules(
            Level::Six,
            vec![ModuleRecord::new("CI601 - The Computing Project", 68.0, 40.0)],
        );
        assert_eq!(ensure_final_project(with_project).len(), 1);

        let l5 = ensure_final_project(Cohort::new(Level::Five));
        assert!(l5.is_empty());
    }
}
