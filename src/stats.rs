/// Shared statistics used by every analysis. Empty input yields 0 by
/// convention; callers guard their own divisions.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (denominator n).
pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let sum_sq_diff: f64 = values.iter().map(|&v| (v - m).powi(2)).sum();
    (sum_sq_diff / values.len() as f64).sqrt()
}

/// Sample variance (denominator n-1); 0 when fewer than two values.
pub fn sample_variance(values: &[f64]) -> f64 {
    let n = values.len();
    if n <= 1 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|&v| (v - m).powi(2)).sum::<f64>() / (n - 1) as f64
}

/// Percentile over an ascending-sorted slice, linearly interpolated on the
/// rank `p/100 * (n-1)`.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = (p / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn mean_of_small_series() {
        assert_abs_diff_eq!(mean(&[1.0, 2.0, 3.0, 4.0, 5.0]), 3.0);
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn population_std_dev_uses_n_denominator() {
        // Variance of 1..5 with denominator n is 2.0.
        assert_abs_diff_eq!(
            population_std_dev(&[1.0, 2.0, 3.0, 4.0, 5.0]),
            2.0_f64.sqrt(),
            epsilon = 1e-12
        );
        assert_eq!(population_std_dev(&[]), 0.0);
    }

    #[test]
    fn sample_variance_uses_n_minus_one() {
        assert_abs_diff_eq!(sample_variance(&[1.0, 2.0, 3.0, 4.0, 5.0]), 2.5);
        assert_eq!(sample_variance(&[7.0]), 0.0);
        assert_eq!(sample_variance(&[]), 0.0);
    }

    #[test]
    fn percentile_interpolates_between_ranks() {
        let sorted = [10.0, 20.0, 30.0, 40.0];
        assert_abs_diff_eq!(percentile(&sorted, 50.0), 25.0);
        assert_abs_diff_eq!(percentile(&sorted, 0.0), 10.0);
        assert_abs_diff_eq!(percentile(&sorted, 100.0), 40.0);
        assert_abs_diff_eq!(percentile(&sorted, 75.0), 32.5);
        assert_eq!(percentile(&[], 50.0), 0.0);
    }
}
