// Two-sample significance tests for categorical sentiment.
//
// Three tests are available because the right choice depends on how much
// you trust the {-1, 0, +1} scale:
//
// - Mann–Whitney U (default): rank-based, only uses the ordering of the
//   categories. Normal approximation with tie correction and continuity
//   correction; sentiment data is almost all ties, so the tie term matters.
// - Welch's t-test: compares means, treating the scale as interval, with
//   unequal variances and Welch–Satterthwaite degrees of freedom.
// - Pearson chi-square on the 2 x k table of category counts: ignores the
//   ordering entirely and tests whether the category mix differs.
//
// All tests are two-sided. None of them is run when either side has fewer
// than two observations; that is reported as a distinct outcome instead of
// a placeholder p-value.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF, Normal, StudentsT};

use super::summarize;
use crate::models::SentimentCategory;

/// Which two-sample test the comparator runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestKind {
    MannWhitney,
    Welch,
    ChiSquare,
}

impl TestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestKind::MannWhitney => "mann-whitney",
            TestKind::Welch => "welch",
            TestKind::ChiSquare => "chi-square",
        }
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mann-whitney" | "mannwhitney" | "rank-sum" | "u" => Ok(TestKind::MannWhitney),
            "welch" | "t" | "t-test" => Ok(TestKind::Welch),
            "chi-square" | "chisquare" | "chi2" => Ok(TestKind::ChiSquare),
            other => Err(format!(
                "unknown test '{other}' (expected mann-whitney, welch or chi-square)"
            )),
        }
    }
}

/// A test statistic and its uncorrected two-sided p-value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawTest {
    pub statistic: f64,
    pub p_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TestOutcome {
    Computed(RawTest),
    /// Fewer than two observations on at least one side
    InsufficientSample,
    /// No variation to test (every observation identical)
    Undefined,
}

/// Run the configured test on two samples of sentiment categories.
pub fn run_test(kind: TestKind, a: &[SentimentCategory], b: &[SentimentCategory]) -> TestOutcome {
    if a.len() < 2 || b.len() < 2 {
        return TestOutcome::InsufficientSample;
    }
    match kind {
        TestKind::MannWhitney => {
            let a: Vec<f64> = a.iter().map(SentimentCategory::as_f64).collect();
            let b: Vec<f64> = b.iter().map(SentimentCategory::as_f64).collect();
            mann_whitney_u(&a, &b)
        }
        TestKind::Welch => {
            let a: Vec<f64> = a.iter().map(SentimentCategory::as_f64).collect();
            let b: Vec<f64> = b.iter().map(SentimentCategory::as_f64).collect();
            welch_t(&a, &b)
        }
        TestKind::ChiSquare => chi_square(a, b),
    }
}

/// Mann–Whitney U test. The statistic is U for sample `a`.
pub fn mann_whitney_u(a: &[f64], b: &[f64]) -> TestOutcome {
    let (n1, n2) = (a.len(), b.len());
    if n1 < 2 || n2 < 2 {
        return TestOutcome::InsufficientSample;
    }

    // Pool with a group flag and rank, averaging ranks over ties.
    let mut pooled: Vec<(f64, bool)> = a
        .iter()
        .map(|v| (*v, true))
        .chain(b.iter().map(|v| (*v, false)))
        .collect();
    pooled.sort_by(|x, y| x.0.total_cmp(&y.0));

    let n = pooled.len();
    let mut rank_sum_a = 0.0;
    let mut tie_term = 0.0;
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && pooled[j + 1].0 == pooled[i].0 {
            j += 1;
        }
        // Ranks are 1-based: positions i..=j share (i + 1 + j + 1) / 2
        let avg_rank = (i + j + 2) as f64 / 2.0;
        let tied = (j - i + 1) as f64;
        tie_term += tied.powi(3) - tied;
        rank_sum_a += pooled[i..=j].iter().filter(|(_, in_a)| *in_a).count() as f64 * avg_rank;
        i = j + 1;
    }

    let (n1f, n2f, nf) = (n1 as f64, n2 as f64, n as f64);
    let u = rank_sum_a - n1f * (n1f + 1.0) / 2.0;
    let mean_u = n1f * n2f / 2.0;
    let var_u = n1f * n2f / 12.0 * ((nf + 1.0) - tie_term / (nf * (nf - 1.0)));
    if var_u <= 0.0 {
        return TestOutcome::Undefined;
    }

    let deviation = ((u - mean_u).abs() - 0.5).max(0.0);
    let z = deviation / var_u.sqrt();
    let p_value = match Normal::new(0.0, 1.0) {
        Ok(normal) => (2.0 * normal.sf(z)).min(1.0),
        Err(_) => return TestOutcome::Undefined,
    };

    TestOutcome::Computed(RawTest {
        statistic: u,
        p_value,
    })
}

/// Welch's unequal-variance t-test. The statistic is t for `a - b`.
pub fn welch_t(a: &[f64], b: &[f64]) -> TestOutcome {
    let (sa, sb) = (summarize(a), summarize(b));
    let (Some(mean_a), Some(var_a), Some(mean_b), Some(var_b)) =
        (sa.mean, sa.variance, sb.mean, sb.variance)
    else {
        return TestOutcome::InsufficientSample;
    };
    if sa.n < 2 || sb.n < 2 {
        return TestOutcome::InsufficientSample;
    }

    let (na, nb) = (sa.n as f64, sb.n as f64);
    let term_a = var_a / na;
    let term_b = var_b / nb;
    let se_sq = term_a + term_b;
    // Both samples constant: the standard error is zero and t does not exist
    if se_sq <= 0.0 {
        return TestOutcome::Undefined;
    }

    let t = (mean_a - mean_b) / se_sq.sqrt();
    let df = se_sq.powi(2) / (term_a.powi(2) / (na - 1.0) + term_b.powi(2) / (nb - 1.0));

    let p_value = match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => (2.0 * dist.sf(t.abs())).min(1.0),
        Err(_) => return TestOutcome::Undefined,
    };

    TestOutcome::Computed(RawTest {
        statistic: t,
        p_value,
    })
}

/// Pearson chi-square test of independence on the faction x category
/// contingency table. Categories neither faction used are dropped first.
pub fn chi_square(a: &[SentimentCategory], b: &[SentimentCategory]) -> TestOutcome {
    if a.len() < 2 || b.len() < 2 {
        return TestOutcome::InsufficientSample;
    }

    let mut table = [[0usize; 3]; 2];
    for s in a {
        table[0][s.index()] += 1;
    }
    for s in b {
        table[1][s.index()] += 1;
    }

    let used: Vec<usize> = (0..3)
        .filter(|&c| table[0][c] + table[1][c] > 0)
        .collect();
    if used.len() < 2 {
        return TestOutcome::Undefined;
    }

    let row_totals = [a.len() as f64, b.len() as f64];
    let total = row_totals[0] + row_totals[1];
    let mut statistic = 0.0;
    for &c in &used {
        let col_total = (table[0][c] + table[1][c]) as f64;
        for (r, row_total) in row_totals.iter().enumerate() {
            let expected = row_total * col_total / total;
            let observed = table[r][c] as f64;
            statistic += (observed - expected).powi(2) / expected;
        }
    }

    let df = (used.len() - 1) as f64;
    let p_value = match ChiSquared::new(df) {
        Ok(dist) => dist.sf(statistic).min(1.0),
        Err(_) => return TestOutcome::Undefined,
    };

    TestOutcome::Computed(RawTest { statistic, p_value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use SentimentCategory::{Negative, Neutral, Positive};

    fn computed(outcome: TestOutcome) -> RawTest {
        match outcome {
            TestOutcome::Computed(t) => t,
            other => panic!("expected a computed test, got {other:?}"),
        }
    }

    #[test]
    fn test_insufficient_sample_for_singletons() {
        for kind in [TestKind::MannWhitney, TestKind::Welch, TestKind::ChiSquare] {
            assert_eq!(
                run_test(kind, &[Positive], &[Negative, Neutral, Positive]),
                TestOutcome::InsufficientSample
            );
            assert_eq!(
                run_test(kind, &[], &[Negative, Neutral]),
                TestOutcome::InsufficientSample
            );
        }
    }

    #[test]
    fn test_mann_whitney_fully_separated_samples() {
        // All of a above all of b: U = n1 * n2 = 9. With the tie and
        // continuity corrections z = 4 / sqrt(4.05) ~ 1.988, p ~ 0.047.
        let t = computed(mann_whitney_u(&[1.0, 1.0, 1.0], &[-1.0, -1.0, -1.0]));
        assert!((t.statistic - 9.0).abs() < 1e-9);
        assert!((t.p_value - 0.0469).abs() < 0.001, "p = {}", t.p_value);
    }

    #[test]
    fn test_mann_whitney_identical_samples_not_significant() {
        let t = computed(mann_whitney_u(&[-1.0, 0.0, 1.0, 0.0], &[0.0, 1.0, -1.0, 0.0]));
        assert!(t.p_value > 0.9, "p = {}", t.p_value);
    }

    #[test]
    fn test_mann_whitney_all_tied_is_undefined() {
        assert_eq!(
            mann_whitney_u(&[0.0, 0.0, 0.0], &[0.0, 0.0]),
            TestOutcome::Undefined
        );
    }

    #[test]
    fn test_welch_known_value() {
        // a: mean 0.5, var 1/3; b: mean -0.5, var 1/3; se = sqrt(1/6)
        let a = [1.0, 1.0, 0.0, 0.0];
        let b = [0.0, 0.0, -1.0, -1.0];
        let t = computed(welch_t(&a, &b));
        let expected_t = 1.0 / (1.0f64 / 6.0).sqrt();
        assert!((t.statistic - expected_t).abs() < 1e-9);
        // df = 6, two-sided p for t = 2.449 is ~0.0498
        assert!((t.p_value - 0.0498).abs() < 0.001, "p = {}", t.p_value);
    }

    #[test]
    fn test_welch_constant_samples_undefined() {
        assert_eq!(
            welch_t(&[1.0, 1.0, 1.0], &[-1.0, -1.0, -1.0]),
            TestOutcome::Undefined
        );
    }

    #[test]
    fn test_chi_square_separated_categories() {
        // 2x2 table [[3, 0], [0, 3]]: every expected cell is 1.5,
        // chi2 = 4 * 1.5 = 6 with 1 df, p ~ 0.0143
        let t = computed(chi_square(
            &[Positive, Positive, Positive],
            &[Negative, Negative, Negative],
        ));
        assert!((t.statistic - 6.0).abs() < 1e-9);
        assert!((t.p_value - 0.0143).abs() < 0.001, "p = {}", t.p_value);
    }

    #[test]
    fn test_chi_square_single_category_undefined() {
        assert_eq!(
            chi_square(&[Neutral, Neutral], &[Neutral, Neutral, Neutral]),
            TestOutcome::Undefined
        );
    }

    #[test]
    fn test_test_kind_parse() {
        assert_eq!("Welch".parse::<TestKind>().unwrap(), TestKind::Welch);
        assert_eq!("chi2".parse::<TestKind>().unwrap(), TestKind::ChiSquare);
        assert!("anova".parse::<TestKind>().is_err());
    }
}
