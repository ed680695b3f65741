//! Degree grade aggregation and classification.
//!
//! This module turns Level 5 and Level 6 module marks into credit-weighted
//! averages, blends them into a final grade, assigns an honours
//! classification, and reviews grades just below a boundary for a possible
//! upgrade.

pub mod aggregate;
pub mod borderline;
pub mod cohort;
pub mod grade;
pub mod types;
pub mod utility;

pub use aggregate::{evaluate, final_grade, weighted_average};
pub use borderline::check_borderline_eligibility;
pub use grade::classify;
pub use types::{BorderlineResult, Classification, Cohort, GradeReport, Level, ModuleRecord};
