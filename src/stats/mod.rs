// Statistics — descriptive aggregation and pairwise faction comparison.

pub mod aggregate;
pub mod compare;
pub mod correction;
pub mod significance;

/// Count, mean and sample variance of a set of observations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub n: usize,
    /// `None` when there are no observations
    pub mean: Option<f64>,
    /// Sample variance (n - 1 denominator). `Some(0.0)` for a single
    /// observation, `None` when there are none.
    pub variance: Option<f64>,
}

/// Summarize observations. Two-pass, so the variance does not suffer from
/// cancellation.
pub fn summarize(values: &[f64]) -> Summary {
    let n = values.len();
    if n == 0 {
        return Summary {
            n,
            mean: None,
            variance: None,
        };
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let variance = if n == 1 {
        0.0
    } else {
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64
    };
    Summary {
        n,
        mean: Some(mean),
        variance: Some(variance),
    }
}
