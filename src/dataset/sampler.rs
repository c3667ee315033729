//! Bounded, reproducible row sampling.
//!
//! Prompts can only carry so much table text, so the pipeline works on a
//! capped subset of the dataset. When the dataset is larger than the cap the
//! rows are drawn without replacement from a seeded ChaCha8 RNG, so the same
//! dataset and seed always produce the same sample.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::DatasetError;

use super::Dataset;

/// Default maximum number of rows in a sample.
pub const DEFAULT_SAMPLE_CAP: usize = 50;

/// Default seed for the sampling RNG.
pub const DEFAULT_SAMPLE_SEED: u64 = 42;

/// A bounded subset of dataset rows.
#[derive(Debug, Clone)]
pub struct Sample {
    rows: Dataset,
    indices: Vec<usize>,
    source_row_count: usize,
}

impl Sample {
    /// The sampled rows as a dataset.
    pub fn dataset(&self) -> &Dataset {
        &self.rows
    }

    /// Indices of the sampled rows in the source dataset, in sample order.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Number of rows in the dataset the sample was drawn from.
    pub fn source_row_count(&self) -> usize {
        self.source_row_count
    }

    /// Whether the cap cut rows from the source dataset.
    pub fn is_capped(&self) -> bool {
        self.len() < self.source_row_count
    }

    /// Serializes the sample as CSV for interpolation into prompts.
    pub fn to_csv(&self) -> Result<String, DatasetError> {
        self.rows.to_csv_string()
    }
}

/// Draws at most `cap` rows from `dataset`.
///
/// Datasets with `cap` rows or fewer are returned whole, in original order.
/// Larger datasets yield exactly `cap` rows selected by a seeded shuffle.
pub fn sample(dataset: &Dataset, cap: usize, seed: u64) -> Sample {
    let total = dataset.row_count();

    let indices: Vec<usize> = if total <= cap {
        (0..total).collect()
    } else {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut all: Vec<usize> = (0..total).collect();
        all.shuffle(&mut rng);
        all.truncate(cap);
        all
    };

    tracing::debug!(
        source_rows = total,
        sample_rows = indices.len(),
        cap,
        seed,
        "Sampled dataset"
    );

    Sample {
        rows: dataset.select_rows(&indices),
        indices,
        source_row_count: total,
    }
}
