//! Bootstrap-aggregated forest of weighted decision trees.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use parkwatch_models::{FeatureVector, FEATURE_COUNT};

use crate::tree::{DecisionTree, TreeParams, CLASS_COUNT};

/// Hyperparameters of a forest fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    /// Tree `i` draws its bootstrap and feature order from `seed + i`
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    feature_importances: [f64; FEATURE_COUNT],
}

impl RandomForest {
    /// Fit on `features` with dense class indices.
    ///
    /// Rows are weighted so every present class carries the same total
    /// weight (`n / (n_classes * class_count)`), then each tree sees a
    /// bootstrap resample of the rows.
    pub fn fit(features: &[FeatureVector], classes: &[usize], params: &ForestParams) -> Self {
        let n = features.len();
        let class_weights = balanced_class_weights(classes);
        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split.max(2),
            max_features: ((FEATURE_COUNT as f64).sqrt() as usize).max(1),
        };

        let fitted: Vec<(DecisionTree, [f64; FEATURE_COUNT])> = (0..params.n_estimators)
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(i as u64));

                let mut weights = vec![0.0; n];
                for _ in 0..n {
                    weights[rng.random_range(0..n)] += 1.0;
                }
                for (row, weight) in weights.iter_mut().enumerate() {
                    *weight *= class_weights[classes[row]];
                }

                DecisionTree::fit(features, classes, &weights, tree_params, rng)
            })
            .collect();

        let mut feature_importances = [0.0; FEATURE_COUNT];
        let mut trees = Vec::with_capacity(fitted.len());
        for (tree, importances) in fitted {
            for (total, value) in feature_importances.iter_mut().zip(importances) {
                *total += value;
            }
            trees.push(tree);
        }
        let sum: f64 = feature_importances.iter().sum();
        if sum > 0.0 {
            for value in &mut feature_importances {
                *value /= sum;
            }
        }

        Self {
            trees,
            feature_importances,
        }
    }

    /// Mean of the per-tree class distributions.
    pub fn predict_proba(&self, x: &FeatureVector) -> [f64; CLASS_COUNT] {
        let mut proba = [0.0; CLASS_COUNT];
        if self.trees.is_empty() {
            return proba;
        }
        for tree in &self.trees {
            for (acc, p) in proba.iter_mut().zip(tree.predict_proba(x)) {
                *acc += p;
            }
        }
        let n = self.trees.len() as f64;
        proba.map(|p| p / n)
    }

    /// Most probable class; ties go to the lowest class index.
    pub fn predict(&self, x: &FeatureVector) -> usize {
        let proba = self.predict_proba(x);
        let mut best = 0;
        for class in 1..CLASS_COUNT {
            if proba[class] > proba[best] {
                best = class;
            }
        }
        best
    }

    /// Impurity-decrease importances, summing to 1 (or all zero).
    pub fn feature_importances(&self) -> [f64; FEATURE_COUNT] {
        self.feature_importances
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

/// `n / (n_present_classes * count[c])` per class; 0 for absent classes.
pub fn balanced_class_weights(classes: &[usize]) -> [f64; CLASS_COUNT] {
    let mut counts = [0usize; CLASS_COUNT];
    for &class in classes {
        counts[class] += 1;
    }
    let present = counts.iter().filter(|&&c| c > 0).count();
    let n = classes.len() as f64;

    std::array::from_fn(|c| {
        if counts[c] == 0 {
            0.0
        } else {
            n / (present as f64 * counts[c] as f64)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> (Vec<FeatureVector>, Vec<usize>) {
        let mut features = Vec::new();
        let mut classes = Vec::new();
        for i in 0..30 {
            let jitter = (i % 5) as f64 * 0.0001;
            features.push(FeatureVector::new(0.0005 + jitter, 0.0002, 4));
            classes.push(0);
            features.push(FeatureVector::new(0.003 + jitter, 0.001, 4));
            classes.push(1);
            features.push(FeatureVector::new(0.02 + jitter, 0.005, 4));
            classes.push(2);
        }
        (features, classes)
    }

    fn params(seed: u64) -> ForestParams {
        ForestParams {
            n_estimators: 25,
            max_depth: None,
            min_samples_split: 2,
            seed,
        }
    }

    #[test]
    fn test_learns_separable_classes() {
        let (features, classes) = dataset();
        let forest = RandomForest::fit(&features, &classes, &params(42));

        assert_eq!(forest.n_trees(), 25);
        assert_eq!(forest.predict(&FeatureVector::new(0.0006, 0.0002, 1)), 0);
        assert_eq!(forest.predict(&FeatureVector::new(0.0031, 0.001, 1)), 1);
        assert_eq!(forest.predict(&FeatureVector::new(0.021, 0.005, 1)), 2);
    }

    #[test]
    fn test_fit_is_deterministic_for_a_seed() {
        let (features, classes) = dataset();
        let a = RandomForest::fit(&features, &classes, &params(7));
        let b = RandomForest::fit(&features, &classes, &params(7));
        assert_eq!(a, b);
    }

    #[test]
    fn test_importances_sum_to_one() {
        let (features, classes) = dataset();
        let forest = RandomForest::fit(&features, &classes, &params(42));
        let sum: f64 = forest.feature_importances().iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        // A constant feature is never split on
        assert_eq!(forest.feature_importances()[2], 0.0);
    }

    #[test]
    fn test_balanced_class_weights() {
        let weights = balanced_class_weights(&[0, 0, 0, 1]);
        assert_eq!(weights, [4.0 / 6.0, 2.0, 0.0]);
    }
}
