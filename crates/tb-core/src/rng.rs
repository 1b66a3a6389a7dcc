//! Seeded sample generation for deterministic probing.

use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use siphasher::sip::SipHasher13;
use std::hash::Hasher;

/// Derives an independent seed for the `substream`-th consumer of `master_seed`.
///
/// SipHash-1-3 with zero keys over `(master_seed, substream)`; stable across
/// platforms and releases.
pub fn derive_substream_seed(master_seed: u64, substream: u64) -> u64 {
    let mut hasher = SipHasher13::new_with_keys(0, 0);
    hasher.write_u64(master_seed);
    hasher.write_u64(substream);
    hasher.finish()
}

/// Uniform samples in `[low, high)` drawn from the given substream.
pub fn sample_uniform(
    master_seed: u64,
    substream: u64,
    len: usize,
    low: f64,
    high: f64,
) -> Array1<f64> {
    let mut rng = StdRng::seed_from_u64(derive_substream_seed(master_seed, substream));
    Array1::from_iter((0..len).map(|_| rng.gen_range(low..high)))
}
