//! Data-derived thresholds.
//!
//! Cutoffs such as "bottom 40% of fundamental scores" or the tercile bands used
//! to label offline estimates are taken from the current data's own
//! distribution rather than fixed constants, so they move as the input set
//! changes.

/// Quantile `q` (0.0-1.0) with linear interpolation between closest ranks.
///
/// Non-finite values are ignored. Returns `None` for an empty input.
pub fn quantile(data: &[f64], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = data.iter().copied().filter(|x| x.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

/// Lower and upper tercile cutoffs (33rd and 66th percentiles).
pub fn tercile_bounds(data: &[f64]) -> Option<(f64, f64)> {
    Some((quantile(data, 0.33)?, quantile(data, 0.66)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantile_interpolates() {
        let data = vec![5.0, 1.0, 4.0, 2.0, 3.0];
        assert!((quantile(&data, 0.4).unwrap() - 2.6).abs() < 1e-9);
        assert!((quantile(&data, 0.5).unwrap() - 3.0).abs() < 1e-9);
        assert_eq!(quantile(&data, 0.0), Some(1.0));
        assert_eq!(quantile(&data, 1.0), Some(5.0));
    }

    #[test]
    fn test_quantile_edge_cases() {
        assert_eq!(quantile(&[], 0.4), None);
        assert_eq!(quantile(&[7.0], 0.4), Some(7.0));
        assert_eq!(quantile(&[f64::NAN, 2.0], 0.5), Some(2.0));
    }

    #[test]
    fn test_tercile_bounds() {
        let data: Vec<f64> = (0..=100).map(|i| i as f64).collect();
        let (low, high) = tercile_bounds(&data).unwrap();
        assert!((low - 33.0).abs() < 1e-9);
        assert!((high - 66.0).abs() < 1e-9);
    }
}
