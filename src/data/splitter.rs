// ============================================================
// Layer 4 - Train/Test Splitter
// ============================================================
// Shuffles samples with a seeded RNG and splits them into a
// training set and a held-out test set. The same seed always
// produces the same split, so training runs are reproducible.
//
// Sizes follow the usual hold-out convention:
//   n_test  = ceil(n * test_fraction)
//   n_train = n - n_test
//
// Reference: rand crate documentation (SeedableRng, SliceRandom)

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Default seed for the training split
pub const SPLIT_SEED: u64 = 42;

/// Default held-out fraction
pub const TEST_FRACTION: f64 = 0.3;

/// Shuffle `samples` with `seed` and split into (train, test).
pub fn split_train_test<T>(mut samples: Vec<T>, test_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total  = samples.len();
    // The epsilon keeps float noise (e.g. 30.000000000000004) from adding a row.
    let n_test = ((total as f64) * test_fraction.clamp(0.0, 1.0) - 1e-9).ceil().max(0.0) as usize;
    let split_at = total - n_test.min(total);

    // samples = [0..split_at] (train), test = [split_at..total]
    let test = samples.split_off(split_at);

    tracing::debug!(
        "Dataset split: {} training, {} test (seed {})",
        samples.len(),
        test.len(),
        seed,
    );

    (samples, test)
}
