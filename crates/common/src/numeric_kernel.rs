use crate::error::Error;
use crate::types::Edge;

/// Products recovered from the log domain are rounded to 6 decimal digits.
pub const PRODUCT_SCALE: f64 = 1e6;

/// Drift absorbed before rounding a recovered product.
pub const EXP_EPSILON: f64 = 1e-10;

/// Tolerance when comparing additive path totals.
pub const SUM_TOLERANCE: f64 = 1e-9;

/// Tolerance when comparing multiplicative path totals.
pub const PRODUCT_TOLERANCE: f64 = 1e-6;

/// Maps a multiplicative weight into the additive log domain.
///
/// Only strictly positive, finite weights have a logarithm; anything else is
/// rejected instead of letting `NaN` or `-inf` leak into the solvers.
pub fn to_log_weight(edge: &Edge) -> Result<f64, Error> {
    if edge.weight <= 0.0 || !edge.weight.is_finite() {
        return Err(Error::Validation(format!(
            "edge {}->{} has weight {} which cannot be multiplied along a path",
            edge.from, edge.to, edge.weight
        )));
    }
    Ok(edge.weight.ln())
}

/// Recovers a product from its log-domain sum, rounded to `PRODUCT_SCALE`.
///
/// Infinite sums (unreachable or blocked) are passed through unchanged.
pub fn from_log_weight(log_sum: f64) -> f64 {
    if !log_sum.is_finite() {
        return log_sum;
    }
    let raw = log_sum.exp();
    ((raw + EXP_EPSILON) * PRODUCT_SCALE).round() / PRODUCT_SCALE
}

/// Smallest per-edge increment that turns a negative cycle strictly positive.
///
/// `ceil(|cycle_weight| / edge_count) + 1`: spreading the deficit evenly and
/// adding one keeps the adjusted sum above zero even after rounding.
pub fn cycle_increment(cycle_weight: f64, edge_count: usize) -> f64 {
    if edge_count == 0 {
        return 0.0;
    }
    (cycle_weight.abs() / edge_count as f64).ceil() + 1.0
}

#[cfg(test)]
mod numerical_kernel_tests {
    use super::*;

    // Helper to check for approximate equality (due to expected quantization/f64 math)
    fn assert_approx_eq(a: f64, b: f64) {
        assert!(
            (a - b).abs() < 0.5 / PRODUCT_SCALE,
            "{} is not approximately equal to {}",
            a,
            b
        );
    }

    #[test]
    fn test_log_round_trip_recovers_product() {
        // 2 * 3 = 6, summed as ln(2) + ln(3).
        let sum = to_log_weight(&Edge::new(0, 1, 2.0)).unwrap()
            + to_log_weight(&Edge::new(1, 2, 3.0)).unwrap();
        assert_approx_eq(from_log_weight(sum), 6.0);
    }

    #[test]
    fn test_quantization() {
        // 1.0001 * 1.00013 = 1.000230013 -> 1.00023
        let sum = 1.0001f64.ln() + 1.00013f64.ln();
        assert_approx_eq(from_log_weight(sum), 1.00023);
        assert_eq!(from_log_weight(sum), 1.00023);
    }

    #[test]
    fn test_exp_drift_is_absorbed() {
        // exp(3 * ln(0.1)) is not exactly 0.001 in f64.
        let sum = 0.1f64.ln() * 3.0;
        assert_eq!(from_log_weight(sum), 0.001);
    }

    #[test]
    fn test_infinity_passes_through() {
        assert_eq!(from_log_weight(f64::INFINITY), f64::INFINITY);
    }

    #[test]
    fn test_rejects_non_positive_weights() {
        assert!(to_log_weight(&Edge::new(0, 1, 0.0)).is_err());
        assert!(to_log_weight(&Edge::new(0, 1, -2.0)).is_err());
        assert!(to_log_weight(&Edge::new(0, 1, f64::NAN)).is_err());
    }

    #[test]
    fn test_cycle_increment() {
        // Cycle 1->2 (2), 2->1 (-5): deficit 3 over 2 edges -> ceil(1.5) + 1 = 3.
        assert_eq!(cycle_increment(-3.0, 2), 3.0);
        assert_eq!(cycle_increment(-0.2, 3), 2.0);
        assert_eq!(cycle_increment(-1.0, 0), 0.0);
    }
}
