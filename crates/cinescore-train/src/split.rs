//! Seeded train/test partitioning.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Two disjoint partitions of the input rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Split<T> {
    pub train: Vec<T>,
    pub test: Vec<T>,
}

/// Shuffle `rows` with `seed` and cut off `ceil(test_fraction * n)` rows for
/// the test partition.
///
/// The same rows, fraction and seed always give the same partitions.
pub fn train_test_split<T>(rows: Vec<T>, test_fraction: f64, seed: u64) -> Split<T> {
    let n = rows.len();
    let fraction = test_fraction.clamp(0.0, 1.0);
    let test_size = ((fraction * n as f64).ceil() as usize).min(n);

    let mut rows = rows;
    let mut rng = StdRng::seed_from_u64(seed);
    rows.shuffle(&mut rng);

    let train = rows.split_off(test_size);
    Split { train, test: rows }
}
