//! Weighted CART decision tree with Gini impurity.
//!
//! Trees are grown to purity unless limited by `max_depth` or
//! `min_samples_split`. At each node the candidate features are drawn in a
//! random order and the search stops once `max_features` non-constant
//! features have been examined.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use parkwatch_models::{FeatureVector, FEATURE_COUNT};

/// Number of activity classes a tree distinguishes.
pub const CLASS_COUNT: usize = 3;

const EPSILON: f64 = 1e-12;

/// Growth limits of one tree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub max_features: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Leaf {
        /// Weighted class distribution of the training rows in the leaf
        proba: [f64; CLASS_COUNT],
    },
    Split {
        feature: usize,
        /// Rows with `x[feature] <= threshold` go left
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted tree stored as a flat node array; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    /// Fit a tree on the rows with non-zero weight.
    ///
    /// Returns the tree and its normalized impurity-decrease importances.
    pub fn fit(
        features: &[FeatureVector],
        classes: &[usize],
        weights: &[f64],
        params: TreeParams,
        rng: StdRng,
    ) -> (Self, [f64; FEATURE_COUNT]) {
        let mut indices: Vec<usize> = (0..features.len())
            .filter(|&i| weights[i] > 0.0)
            .collect();

        let mut builder = Builder {
            features,
            classes,
            weights,
            params,
            rng,
            nodes: Vec::new(),
            importances: [0.0; FEATURE_COUNT],
        };
        builder.build(&mut indices, 0);

        let mut importances = builder.importances;
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for value in &mut importances {
                *value /= total;
            }
        }

        (
            Self {
                nodes: builder.nodes,
            },
            importances,
        )
    }

    pub fn predict_proba(&self, x: &FeatureVector) -> [f64; CLASS_COUNT] {
        let mut current = 0;
        loop {
            match self.nodes.get(current) {
                Some(Node::Leaf { proba }) => return *proba,
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    current = if x.get(*feature) <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                None => return [0.0; CLASS_COUNT],
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], at: usize) -> usize {
            match nodes.get(at) {
                Some(Node::Split { left, right, .. }) => {
                    1 + walk(nodes, *left).max(walk(nodes, *right))
                }
                _ => 0,
            }
        }
        walk(&self.nodes, 0)
    }
}

struct Candidate {
    feature: usize,
    threshold: f64,
    decrease: f64,
}

struct Builder<'a> {
    features: &'a [FeatureVector],
    classes: &'a [usize],
    weights: &'a [f64],
    params: TreeParams,
    rng: StdRng,
    nodes: Vec<Node>,
    importances: [f64; FEATURE_COUNT],
}

impl Builder<'_> {
    fn value(&self, row: usize, feature: usize) -> f64 {
        self.features[row].get(feature)
    }

    fn class_weights(&self, indices: &[usize]) -> [f64; CLASS_COUNT] {
        let mut counts = [0.0; CLASS_COUNT];
        for &i in indices {
            counts[self.classes[i]] += self.weights[i];
        }
        counts
    }

    fn build(&mut self, indices: &mut [usize], depth: usize) -> usize {
        let counts = self.class_weights(indices);
        let total: f64 = counts.iter().sum();
        let impurity = gini(&counts, total);

        let node_id = self.nodes.len();
        self.nodes.push(Node::Leaf {
            proba: normalize(&counts, total),
        });

        let depth_left = self.params.max_depth.map_or(true, |max| depth < max);
        if impurity <= EPSILON || indices.len() < self.params.min_samples_split || !depth_left {
            return node_id;
        }

        let Some(best) = self.best_split(indices, &counts, total, impurity) else {
            return node_id;
        };

        let feature = best.feature;
        indices.sort_by(|&a, &b| self.value(a, feature).total_cmp(&self.value(b, feature)));
        let mid = indices.partition_point(|&i| self.value(i, feature) <= best.threshold);
        if mid == 0 || mid == indices.len() {
            return node_id;
        }

        self.importances[feature] += best.decrease;

        let (left_rows, right_rows) = indices.split_at_mut(mid);
        let left = self.build(left_rows, depth + 1);
        let right = self.build(right_rows, depth + 1);
        self.nodes[node_id] = Node::Split {
            feature,
            threshold: best.threshold,
            left,
            right,
        };
        node_id
    }

    fn best_split(
        &mut self,
        indices: &mut [usize],
        parent: &[f64; CLASS_COUNT],
        total: f64,
        impurity: f64,
    ) -> Option<Candidate> {
        let mut order: [usize; FEATURE_COUNT] = std::array::from_fn(|i| i);
        order.shuffle(&mut self.rng);

        let mut best: Option<Candidate> = None;
        let mut examined = 0;

        for feature in order {
            if examined >= self.params.max_features {
                break;
            }

            indices.sort_by(|&a, &b| self.value(a, feature).total_cmp(&self.value(b, feature)));
            let first = self.value(indices[0], feature);
            let last = self.value(indices[indices.len() - 1], feature);
            if first == last {
                continue;
            }
            examined += 1;

            let mut left = [0.0; CLASS_COUNT];
            for pos in 0..indices.len() - 1 {
                let row = indices[pos];
                left[self.classes[row]] += self.weights[row];

                let current = self.value(row, feature);
                let next = self.value(indices[pos + 1], feature);
                if current == next {
                    continue;
                }

                let left_total: f64 = left.iter().sum();
                let right_total = total - left_total;
                let right: [f64; CLASS_COUNT] = std::array::from_fn(|c| parent[c] - left[c]);
                let children =
                    left_total * gini(&left, left_total) + right_total * gini(&right, right_total);
                let decrease = total * impurity - children;

                if best
                    .as_ref()
                    .map_or(true, |b| decrease > b.decrease + EPSILON)
                {
                    let mut threshold = current + (next - current) / 2.0;
                    if threshold >= next {
                        threshold = current;
                    }
                    best = Some(Candidate {
                        feature,
                        threshold,
                        decrease,
                    });
                }
            }
        }

        best.filter(|b| b.decrease > EPSILON)
    }
}

fn gini(counts: &[f64; CLASS_COUNT], total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    1.0 - counts.iter().map(|c| (c / total).powi(2)).sum::<f64>()
}

fn normalize(counts: &[f64; CLASS_COUNT], total: f64) -> [f64; CLASS_COUNT] {
    if total <= 0.0 {
        return [0.0; CLASS_COUNT];
    }
    std::array::from_fn(|c| counts[c] / total)
}
