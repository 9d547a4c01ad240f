//! Interaction datasets and deterministic fold splitting.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::index::Index;

/// An immutable collection of positive user/item interactions over dense
/// indices. Immutable for the duration of one search/fit cycle: loops load a
/// fresh dataset each cycle rather than mutating a shared one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    user_index: Index,
    item_index: Index,
    pairs: Vec<(u32, u32)>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one positive interaction, inserting unseen ids into the
    /// dense indices.
    pub fn add(&mut self, user_id: &str, item_id: &str) {
        let user = self.user_index.insert(user_id);
        let item = self.item_index.insert(item_id);
        self.pairs.push((user, item));
    }

    pub fn user_count(&self) -> usize {
        self.user_index.len()
    }

    pub fn item_count(&self) -> usize {
        self.item_index.len()
    }

    /// Number of interactions.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[(u32, u32)] {
        &self.pairs
    }

    pub fn user_index(&self) -> &Index {
        &self.user_index
    }

    pub fn item_index(&self) -> &Index {
        &self.item_index
    }

    /// Items interacted with by `user`, in insertion order.
    pub fn items_of(&self, user: u32) -> Vec<u32> {
        self.pairs
            .iter()
            .filter(|(u, _)| *u == user)
            .map(|(_, i)| *i)
            .collect()
    }

    /// A dataset containing only the interactions at `positions`, sharing
    /// the full user/item indices so dense ids stay aligned across
    /// partitions.
    fn subset(&self, positions: &[usize]) -> Dataset {
        Dataset {
            user_index: self.user_index.clone(),
            item_index: self.item_index.clone(),
            pairs: positions.iter().map(|&p| self.pairs[p]).collect(),
        }
    }

    /// Split into (train, test) by holding out one random interaction per
    /// user with at least two interactions. Deterministic for a fixed seed.
    pub fn split(&self, seed: u64) -> (Dataset, Dataset) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut per_user: Vec<Vec<usize>> = vec![Vec::new(); self.user_count()];
        for (pos, (user, _)) in self.pairs.iter().enumerate() {
            per_user[*user as usize].push(pos);
        }

        let mut train = Vec::with_capacity(self.pairs.len());
        let mut test = Vec::new();
        for positions in &per_user {
            if positions.len() < 2 {
                train.extend_from_slice(positions);
                continue;
            }
            let held = positions[rng.gen_range(0..positions.len())];
            test.push(held);
            train.extend(positions.iter().copied().filter(|&p| p != held));
        }
        train.sort_unstable();
        test.sort_unstable();
        (self.subset(&train), self.subset(&test))
    }
}

/// One (train, test) partition of a dataset.
#[derive(Debug, Clone)]
pub struct Fold {
    pub train: Dataset,
    pub test: Dataset,
}

/// Splits a dataset into folds. Deterministic: the same dataset and seed
/// produce identical folds on every call.
pub trait FoldSplitter: Send + Sync {
    fn split(&self, data: &Dataset, seed: u64) -> Vec<Fold>;
}

/// k-fold splitter: interactions are shuffled once with a seeded generator
/// and chunked into `k` disjoint test partitions.
#[derive(Debug, Clone, Copy)]
pub struct KFoldSplitter {
    k: usize,
}

impl KFoldSplitter {
    pub fn new(k: usize) -> Self {
        Self { k: k.max(1) }
    }

    pub fn k(&self) -> usize {
        self.k
    }
}

impl FoldSplitter for KFoldSplitter {
    fn split(&self, data: &Dataset, seed: u64) -> Vec<Fold> {
        let mut positions: Vec<usize> = (0..data.len()).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        positions.shuffle(&mut rng);

        let mut folds = Vec::with_capacity(self.k);
        let chunk = data.len() / self.k;
        let remainder = data.len() % self.k;
        let mut start = 0;
        for fold in 0..self.k {
            let size = chunk + usize::from(fold < remainder);
            let test: Vec<usize> = positions[start..start + size].to_vec();
            let train: Vec<usize> = positions[..start]
                .iter()
                .chain(positions[start + size..].iter())
                .copied()
                .collect();
            start += size;
            folds.push(Fold {
                train: data.subset(&train),
                test: data.subset(&test),
            });
        }
        folds
    }
}
