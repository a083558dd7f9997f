//! Weight-sum validation for catalog rows and course weights.

use crate::GradingError;

/// Permitted deviation of a weight sum from exactly 1.0.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Verifies that `weights` sum to 1.0 within [`WEIGHT_SUM_TOLERANCE`].
///
/// `context` names the mapping in the error (e.g. `rubric "writing"`). Weights
/// are never normalised; a mismatch is always an error.
pub fn validate_weights<I>(context: &str, weights: I) -> Result<(), GradingError>
where
    I: IntoIterator<Item = f64>,
{
    let sum: f64 = weights.into_iter().sum();
    if (sum - 1.0).abs() < WEIGHT_SUM_TOLERANCE {
        Ok(())
    } else {
        Err(GradingError::WeightSum {
            context: context.to_string(),
            sum,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_sum_accepted() {
        assert!(validate_weights("rows", [0.6, 0.4]).is_ok());
        assert!(validate_weights("rows", [0.1; 10]).is_ok());
    }

    #[test]
    fn test_mismatch_rejected() {
        let err = validate_weights("course", [0.5, 0.4]).unwrap_err();
        match err {
            GradingError::WeightSum { context, sum } => {
                assert_eq!(context, "course");
                assert!((sum - 0.9).abs() < 1e-12);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_mapping_rejected() {
        assert!(validate_weights("empty", std::iter::empty()).is_err());
    }
}
