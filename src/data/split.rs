//! Deterministic train/validation split.

use crate::domain::model::{SentimentRecord, TrainTestSplit};
use crate::utils::error::{PipelineError, Result};
use crate::utils::validation::validate_fraction;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitOptions {
    /// Share of rows held out for validation.
    pub test_fraction: f64,
    pub seed: u64,
    /// Split each label separately so both partitions keep the label ratio.
    pub stratify: bool,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
            stratify: false,
        }
    }
}

/// Shuffle with a seeded RNG and cut off `round(n * test_fraction)` rows for
/// validation. The training partition is never left empty.
pub fn train_test_split(
    records: Vec<SentimentRecord>,
    options: &SplitOptions,
) -> Result<TrainTestSplit> {
    validate_fraction("split.test_fraction", options.test_fraction)?;

    if records.is_empty() {
        return Err(PipelineError::EmptyDataset {
            message: "no rows to split".to_string(),
        });
    }

    let mut rng = ChaCha8Rng::seed_from_u64(options.seed);

    let split = if options.stratify {
        let (negative, positive): (Vec<_>, Vec<_>) =
            records.into_iter().partition(|r| r.is_negative);

        let (mut train, mut test) = cut(negative, options.test_fraction, &mut rng);
        let (pos_train, pos_test) = cut(positive, options.test_fraction, &mut rng);
        train.extend(pos_train);
        test.extend(pos_test);

        // 合併後再打散一次，避免標籤成塊排列
        train.shuffle(&mut rng);
        test.shuffle(&mut rng);
        TrainTestSplit { train, test }
    } else {
        let (train, test) = cut(records, options.test_fraction, &mut rng);
        TrainTestSplit { train, test }
    };

    tracing::debug!(
        "Dataset split: {} training, {} validation (seed={}, stratify={})",
        split.train.len(),
        split.test.len(),
        options.seed,
        options.stratify
    );

    Ok(split)
}

/// Rows held out from a partition of `total` rows; at least one row stays for training.
pub fn test_count(total: usize, test_fraction: f64) -> usize {
    let count = ((total as f64) * test_fraction).round() as usize;
    count.min(total.saturating_sub(1))
}

/// (training, validation) sizes `train_test_split` will produce for these label counts.
pub fn planned_sizes(negatives: usize, positives: usize, options: &SplitOptions) -> (usize, usize) {
    let total = negatives + positives;
    let test = if options.stratify {
        test_count(negatives, options.test_fraction) + test_count(positives, options.test_fraction)
    } else {
        test_count(total, options.test_fraction)
    };
    (total - test, test)
}

fn cut(
    mut rows: Vec<SentimentRecord>,
    test_fraction: f64,
    rng: &mut ChaCha8Rng,
) -> (Vec<SentimentRecord>, Vec<SentimentRecord>) {
    rows.shuffle(rng);

    let total = rows.len();
    let test = rows.split_off(total - test_count(total, test_fraction));
    (rows, test)
}
