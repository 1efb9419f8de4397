// Multiple-comparison correction across one run's family of tests.
//
// Testing eight topics at alpha = 0.05 gives roughly a one-in-three chance
// of at least one false positive, so every run corrects. Holm is the
// default (family-wise error, uniformly more powerful than Bonferroni);
// Benjamini–Hochberg controls the false discovery rate instead.
//
// Every method returns adjusted values that are >= the raw value, capped
// at 1.0, and monotone in the raw p-value order.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Correction {
    Holm,
    Bonferroni,
    BenjaminiHochberg,
}

impl Correction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Correction::Holm => "holm",
            Correction::Bonferroni => "bonferroni",
            Correction::BenjaminiHochberg => "benjamini-hochberg",
        }
    }
}

impl fmt::Display for Correction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Correction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "holm" | "holm-bonferroni" => Ok(Correction::Holm),
            "bonferroni" => Ok(Correction::Bonferroni),
            "benjamini-hochberg" | "bh" | "fdr" => Ok(Correction::BenjaminiHochberg),
            other => Err(format!(
                "unknown correction '{other}' (expected holm, bonferroni or benjamini-hochberg)"
            )),
        }
    }
}

/// Adjust a family of p-values. Output is in the same order as the input.
pub fn adjust(p_values: &[f64], method: Correction) -> Vec<f64> {
    let m = p_values.len();
    if m == 0 {
        return Vec::new();
    }
    let mf = m as f64;

    // Indices sorted by ascending p; ties keep input order.
    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|&i, &j| p_values[i].total_cmp(&p_values[j]));

    let mut adjusted = vec![0.0; m];
    match method {
        Correction::Bonferroni => {
            for (i, p) in p_values.iter().enumerate() {
                adjusted[i] = (p * mf).min(1.0);
            }
        }
        Correction::Holm => {
            // Step-down: running maximum of (m - rank) * p over ascending p
            let mut running_max: f64 = 0.0;
            for (rank, &idx) in order.iter().enumerate() {
                let candidate = ((mf - rank as f64) * p_values[idx]).min(1.0);
                running_max = running_max.max(candidate);
                adjusted[idx] = running_max;
            }
        }
        Correction::BenjaminiHochberg => {
            // Step-up: running minimum of m / rank * p over descending p
            let mut running_min: f64 = 1.0;
            for (rank, &idx) in order.iter().enumerate().rev() {
                let candidate = (mf / (rank + 1) as f64 * p_values[idx]).min(1.0);
                running_min = running_min.min(candidate);
                adjusted[idx] = running_min;
            }
        }
    }

    for (adj, raw) in adjusted.iter_mut().zip(p_values) {
        *adj = adj.max(*raw);
    }
    adjusted
}
