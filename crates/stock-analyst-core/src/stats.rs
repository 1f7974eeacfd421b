use serde::{Deserialize, Serialize};

/// Arithmetic mean, or `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (N - 1 denominator).
/// Returns `None` for fewer than two values.
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let sum_sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((sum_sq / (values.len() - 1) as f64).sqrt())
}

/// Descriptive statistics for one numeric series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesStats {
    pub count: usize,
    pub mean: f64,
    pub std_dev: Option<f64>,
    pub min: f64,
    pub max: f64,
}

impl SeriesStats {
    /// Describe the defined values of a series. `None` when nothing is defined.
    pub fn describe(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let values: Vec<f64> = values.into_iter().collect();
        let mean = mean(&values)?;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Some(Self {
            count: values.len(),
            mean,
            std_dev: sample_std_dev(&values),
            min,
            max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_empty_is_none() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[2.0, 4.0]), Some(3.0));
    }

    #[test]
    fn sample_std_dev_uses_n_minus_one() {
        // 1..=20 has sample variance n(n+1)/12 = 35
        let values: Vec<f64> = (1..=20).map(f64::from).collect();
        let sd = sample_std_dev(&values).unwrap();
        assert!((sd - 35f64.sqrt()).abs() < 1e-12);

        assert_eq!(sample_std_dev(&[5.0]), None);
        assert_eq!(sample_std_dev(&[5.0, 5.0]), Some(0.0));
    }

    #[test]
    fn describe_series() {
        let stats = SeriesStats::describe([3.0, -1.0, 4.0]).unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.min, -1.0);
        assert_eq!(stats.max, 4.0);
        assert!((stats.mean - 2.0).abs() < 1e-12);
        assert!(stats.std_dev.is_some());

        assert!(SeriesStats::describe(std::iter::empty()).is_none());

        let single = SeriesStats::describe([7.0]).unwrap();
        assert_eq!(single.std_dev, None);
    }
}
