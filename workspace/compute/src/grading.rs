//! Score validation and the pass/fail rule.

use common::{GradeAction, PASSING_RATING, SubjectScores};

use crate::error::{ComputeError, Result};

/// Lowest accepted score.
pub const MIN_SCORE: f64 = 0.0;
/// Highest accepted score.
pub const MAX_SCORE: f64 = 100.0;

/// Rejects scores that are not finite or fall outside `[0, 100]`.
pub fn validate_score(value: f64) -> Result<f64> {
    if !value.is_finite() {
        return Err(ComputeError::InvalidArgument(
            "grade value must be a finite number".to_string(),
        ));
    }
    if !(MIN_SCORE..=MAX_SCORE).contains(&value) {
        return Err(ComputeError::InvalidArgument(format!(
            "grade value {} is outside {}..={}",
            value, MIN_SCORE, MAX_SCORE
        )));
    }
    Ok(value)
}

/// Mean of both partial scores, or `None` until both are recorded.
pub fn final_rating(midterm: Option<f64>, finals: Option<f64>) -> Option<f64> {
    match (midterm, finals) {
        (Some(midterm), Some(finals)) => Some((midterm + finals) / 2.0),
        _ => None,
    }
}

pub fn action_for(rating: f64) -> GradeAction {
    if rating >= PASSING_RATING {
        GradeAction::Passed
    } else {
        GradeAction::Failed
    }
}

/// Builds the full score block, deriving the rating and action.
pub fn derive_scores(midterm: Option<f64>, finals: Option<f64>) -> SubjectScores {
    let rating = final_rating(midterm, finals);
    SubjectScores {
        midterm,
        finals,
        final_rating: rating,
        action: rating.map(action_for),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_at_threshold_passes() {
        let scores = derive_scores(Some(80.0), Some(70.0));
        assert_eq!(scores.final_rating, Some(75.0));
        assert_eq!(scores.action, Some(GradeAction::Passed));
    }

    #[test]
    fn test_rating_below_threshold_fails() {
        let scores = derive_scores(Some(80.0), Some(69.0));
        assert_eq!(scores.final_rating, Some(74.5));
        assert_eq!(scores.action, Some(GradeAction::Failed));
    }

    #[test]
    fn test_single_score_has_no_rating() {
        let scores = derive_scores(Some(80.0), None);
        assert_eq!(scores.midterm, Some(80.0));
        assert_eq!(scores.final_rating, None);
        assert_eq!(scores.action, None);

        let scores = derive_scores(None, Some(90.0));
        assert_eq!(scores.final_rating, None);
        assert_eq!(scores.action, None);
    }

    #[test]
    fn test_validate_score_bounds() {
        assert_eq!(validate_score(0.0).unwrap(), 0.0);
        assert_eq!(validate_score(100.0).unwrap(), 100.0);
        assert!(matches!(
            validate_score(101.0),
            Err(ComputeError::InvalidArgument(_))
        ));
        assert!(matches!(
            validate_score(-1.0),
            Err(ComputeError::InvalidArgument(_))
        ));
        assert!(validate_score(f64::NAN).is_err());
        assert!(validate_score(f64::INFINITY).is_err());
    }
}
