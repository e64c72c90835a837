//! Seeded stratified train/evaluation split.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use parkwatch_models::ActivityLabel;

use crate::error::{MlError, MlResult};

/// Row indices of the two halves of a split, each ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Split row indices so every class is represented in both halves in
/// proportion to its frequency.
///
/// Each class contributes `round(count * test_fraction)` rows to the test
/// half, clamped so both halves keep at least one row of the class. The
/// same labels, fraction and seed always produce the same split.
pub fn stratified_split(
    labels: &[ActivityLabel],
    test_fraction: f64,
    seed: u64,
    min_per_class: usize,
) -> MlResult<Split> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(MlError::invalid_config(format!(
            "test_fraction must be in (0, 1), got {}",
            test_fraction
        )));
    }

    let mut by_class: [Vec<usize>; 3] = Default::default();
    for (index, label) in labels.iter().enumerate() {
        by_class[label.index()].push(index);
    }

    let present: Vec<ActivityLabel> = ActivityLabel::ALL
        .into_iter()
        .filter(|label| !by_class[label.index()].is_empty())
        .collect();
    if present.len() < 2 {
        return Err(MlError::degenerate(format!(
            "need at least 2 classes to train, found {}",
            present.len()
        )));
    }

    let min_per_class = min_per_class.max(2);
    for label in &present {
        let count = by_class[label.index()].len();
        if count < min_per_class {
            return Err(MlError::degenerate(format!(
                "class '{}' has {} labeled row(s), at least {} required to stratify",
                label, count, min_per_class
            )));
        }
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();

    for label in present {
        let mut members = std::mem::take(&mut by_class[label.index()]);
        let count = members.len();
        let n_test = ((count as f64 * test_fraction).round() as usize).clamp(1, count - 1);

        members.shuffle(&mut rng);
        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    Ok(Split { train, test })
}
