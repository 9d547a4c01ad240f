//! Model quality scores.

use serde::{Deserialize, Serialize};

/// Ranking quality of a fitted model. NDCG is the governing metric used by
/// the coordinator when deciding whether to adopt a candidate model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub ndcg: f64,
    pub precision: f64,
    pub recall: f64,
}

impl Score {
    pub fn new(ndcg: f64, precision: f64, recall: f64) -> Self {
        Self {
            ndcg,
            precision,
            recall,
        }
    }

    /// Strictly better on the governing metric.
    pub fn better_than(&self, other: &Score) -> bool {
        self.ndcg > other.ndcg
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "NDCG={:.5} Precision={:.5} Recall={:.5}",
            self.ndcg, self.precision, self.recall
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn better_than_is_strict() {
        let a = Score::new(0.5, 0.0, 0.0);
        let b = Score::new(0.5, 0.9, 0.9);
        assert!(!a.better_than(&b));
        assert!(!b.better_than(&a));
        assert!(Score::new(0.6, 0.0, 0.0).better_than(&a));
    }
}
