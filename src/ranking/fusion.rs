use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::RankingError;

/// Centrality measures available for fusion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    PageRank,
    Hub,
    Authority,
    Eigenvector,
}

impl Metric {
    pub const ALL: [Metric; 4] = [Metric::PageRank, Metric::Hub, Metric::Authority, Metric::Eigenvector];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::PageRank => "pagerank",
            Metric::Hub => "hub",
            Metric::Authority => "authority",
            Metric::Eigenvector => "eigenvector",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Metric {
    type Err = RankingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pagerank" => Ok(Metric::PageRank),
            "hub" | "hubs" => Ok(Metric::Hub),
            "authority" | "authorities" => Ok(Metric::Authority),
            "eigenvector" => Ok(Metric::Eigenvector),
            other => Err(RankingError::InvalidWeights(format!("unknown metric '{}'", other))),
        }
    }
}

/// Relative weight of each metric in the final score.
///
/// Authority is off by default: hub score stands in for influence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionWeights {
    pub pagerank: f64,
    pub hub: f64,
    pub authority: f64,
    pub eigenvector: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            pagerank: 1.0 / 3.0,
            hub: 1.0 / 3.0,
            authority: 0.0,
            eigenvector: 1.0 / 3.0,
        }
    }
}

impl FusionWeights {
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::PageRank => self.pagerank,
            Metric::Hub => self.hub,
            Metric::Authority => self.authority,
            Metric::Eigenvector => self.eigenvector,
        }
    }

    fn set(&mut self, metric: Metric, weight: f64) {
        match metric {
            Metric::PageRank => self.pagerank = weight,
            Metric::Hub => self.hub = weight,
            Metric::Authority => self.authority = weight,
            Metric::Eigenvector => self.eigenvector = weight,
        }
    }

    /// Parse `metric=weight` pairs separated by commas, e.g.
    /// `pagerank=0.5,hub=0.25,eigenvector=0.25,authority=0`.
    /// Metrics not named keep their default weight.
    pub fn parse(input: &str) -> Result<Self, RankingError> {
        let mut weights = Self::default();
        for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (name, value) = part.split_once('=').ok_or_else(|| {
                RankingError::InvalidWeights(format!("expected metric=weight, got '{}'", part))
            })?;
            let metric: Metric = name.parse()?;
            let weight: f64 = value.trim().parse().map_err(|_| {
                RankingError::InvalidWeights(format!("weight for {} is not a number: '{}'", metric, value))
            })?;
            weights.set(metric, weight);
        }
        weights.validate()?;
        Ok(weights)
    }

    pub fn validate(&self) -> Result<(), RankingError> {
        for metric in Metric::ALL {
            let w = self.get(metric);
            if !w.is_finite() || w < 0.0 {
                return Err(RankingError::InvalidWeights(format!(
                    "weight for {} must be a non-negative number, got {}",
                    metric, w
                )));
            }
        }
        if Metric::ALL.iter().map(|&m| self.get(m)).sum::<f64>() <= 0.0 {
            return Err(RankingError::InvalidWeights("all weights are zero".to_string()));
        }
        Ok(())
    }
}

/// Min-max scale the present values into [0, 1].
///
/// Absent entries stay absent and do not affect the range. When every
/// present value is equal the metric carries no ordering, so all map to 0.
pub fn min_max_normalize(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let present = values.iter().flatten();
    let min = present.clone().cloned().fold(f64::INFINITY, f64::min);
    let max = present.cloned().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    values
        .iter()
        .map(|v| {
            v.map(|x| {
                if range > 0.0 {
                    ((x - min) / range).clamp(0.0, 1.0)
                } else {
                    0.0
                }
            })
        })
        .collect()
}

/// Weighted mean of normalized metric scores per paper.
///
/// `metrics` holds the raw scores of every metric that converged. Weights
/// of missing metrics are dropped and the rest renormalized; a paper absent
/// from a metric contributes 0 for it.
pub fn fuse(
    size: usize,
    metrics: &[(Metric, &[Option<f64>])],
    weights: &FusionWeights,
) -> Result<Vec<f64>, RankingError> {
    let total_weight: f64 = metrics.iter().map(|(m, _)| weights.get(*m)).sum();
    if total_weight <= 0.0 {
        let available: Vec<&str> = metrics.iter().map(|(m, _)| m.as_str()).collect();
        let missing: Vec<&str> = Metric::ALL
            .iter()
            .filter(|m| weights.get(**m) > 0.0 && !metrics.iter().any(|(a, _)| a == *m))
            .map(|m| m.as_str())
            .collect();
        return Err(RankingError::NoMetrics(format!(
            "{} (available with zero weight: {})",
            missing.join(", "),
            available.join(", ")
        )));
    }

    let mut combined = vec![0.0; size];
    for (metric, values) in metrics {
        let weight = weights.get(*metric) / total_weight;
        if weight == 0.0 {
            continue;
        }
        for (score, value) in combined.iter_mut().zip(min_max_normalize(values)) {
            *score += weight * value.unwrap_or(0.0);
        }
    }
    Ok(combined.into_iter().map(|s| s.clamp(0.0, 1.0)).collect())
}
