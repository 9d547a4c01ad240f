//! Ranking-quality evaluators for cross-validation.

use std::collections::HashSet;

use rf_data::Dataset;

use crate::model::RankingModel;

/// Scores a fitted model against a test partition. Returns matched-length
/// score and cost vectors, one element per metric axis the evaluator emits.
/// Score is higher-better, cost lower-better.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, model: &dyn RankingModel, test: &Dataset, train: &Dataset)
        -> (Vec<f64>, Vec<f64>);
}

/// Top-N ranking metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankMetric {
    Ndcg,
    Precision,
    Recall,
}

/// Evaluates top-N recommendation quality per user, averaged over all users
/// with at least one test interaction. Items the user already interacted
/// with in the train partition are excluded from the candidate ranking.
/// Cost is the negated score.
#[derive(Debug, Clone)]
pub struct RankingEvaluator {
    top_n: usize,
    metrics: Vec<RankMetric>,
}

impl RankingEvaluator {
    pub fn new(top_n: usize, metrics: Vec<RankMetric>) -> Self {
        Self { top_n, metrics }
    }

    /// NDCG@n / Precision@n / Recall@n, the axes used by the searcher.
    pub fn standard(top_n: usize) -> Self {
        Self::new(
            top_n,
            vec![RankMetric::Ndcg, RankMetric::Precision, RankMetric::Recall],
        )
    }

    fn rank_for_user(
        &self,
        model: &dyn RankingModel,
        user: u32,
        item_count: usize,
        exclude: &HashSet<u32>,
    ) -> Vec<u32> {
        let mut scored: Vec<(u32, f64)> = (0..item_count as u32)
            .filter(|item| !exclude.contains(item))
            .map(|item| (item, model.predict(user, item)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(self.top_n);
        scored.into_iter().map(|(item, _)| item).collect()
    }

    fn metric(&self, metric: RankMetric, ranked: &[u32], relevant: &HashSet<u32>) -> f64 {
        match metric {
            RankMetric::Precision => {
                let hits = ranked.iter().filter(|i| relevant.contains(i)).count();
                hits as f64 / self.top_n as f64
            }
            RankMetric::Recall => {
                let hits = ranked.iter().filter(|i| relevant.contains(i)).count();
                hits as f64 / relevant.len() as f64
            }
            RankMetric::Ndcg => {
                let dcg: f64 = ranked
                    .iter()
                    .enumerate()
                    .filter(|(_, item)| relevant.contains(item))
                    .map(|(pos, _)| 1.0 / ((pos + 2) as f64).log2())
                    .sum();
                let ideal: f64 = (0..relevant.len().min(self.top_n))
                    .map(|pos| 1.0 / ((pos + 2) as f64).log2())
                    .sum();
                if ideal == 0.0 {
                    0.0
                } else {
                    dcg / ideal
                }
            }
        }
    }
}

impl Evaluator for RankingEvaluator {
    fn evaluate(
        &self,
        model: &dyn RankingModel,
        test: &Dataset,
        train: &Dataset,
    ) -> (Vec<f64>, Vec<f64>) {
        let item_count = test.item_count();
        let mut sums = vec![0.0; self.metrics.len()];
        let mut users = 0usize;

        for user in 0..test.user_count() as u32 {
            let relevant: HashSet<u32> = test.items_of(user).into_iter().collect();
            if relevant.is_empty() {
                continue;
            }
            let exclude: HashSet<u32> = train.items_of(user).into_iter().collect();
            let ranked = self.rank_for_user(model, user, item_count, &exclude);
            for (axis, metric) in self.metrics.iter().enumerate() {
                sums[axis] += self.metric(*metric, &ranked, &relevant);
            }
            users += 1;
        }

        let scores: Vec<f64> = if users == 0 {
            vec![0.0; self.metrics.len()]
        } else {
            sums.into_iter().map(|s| s / users as f64).collect()
        };
        let costs = scores.iter().map(|s| -s).collect();
        (scores, costs)
    }
}
