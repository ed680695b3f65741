use crate::grading::types::Classification;

/// Converts a final grade (0–100) into a degree classification.
///
/// | Range   | Classification                     |
/// |---------|------------------------------------|
/// | >= 70   | First-Class Honours (1st)          |
/// | >= 60   | Upper Second-Class Honours (2:1)   |
/// | >= 50   | Lower Second-Class Honours (2:2)   |
/// | >= 40   | Third-Class Honours (3rd)          |
/// | < 40    | Fail                               |
pub fn classify(final_grade: f64) -> Classification {
    match final_grade {
        g if g >= 70.0 => Classification::First,
        g if g >= 60.0 => Classification::UpperSecond,
        g if g >= 50.0 => Classification::LowerSecond,
        g if g >= 40.0 => Classification::Third,
        _ => Classification::Fail,
    }
}
