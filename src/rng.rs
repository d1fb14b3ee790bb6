/* ------------------------------------------------------------------ */
/* Seeded random source and weighted sampling helpers                 */
/* ------------------------------------------------------------------ */
//
// Every sampling call takes the generator explicitly. There is no global
// RNG: two streams built from distinct seeds never share state.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::weighted::WeightedIndex;
use rand_distr::Distribution;

use crate::error::{DataError, Result};

/// The generator owned by a batch stream.
pub type StreamRng = StdRng;

pub fn seeded(seed: u64) -> StreamRng {
    StdRng::seed_from_u64(seed)
}

// Draw `k` distinct indices weighted by `weights`. Each draw renormalizes
// over the indices not yet taken.
pub fn sample_without_replacement<R: Rng + ?Sized>(
    rng: &mut R,
    weights: &[f64],
    k: usize,
) -> Result<Vec<usize>> {
    if k == 0 {
        return Ok(Vec::new());
    }
    let support = weights.iter().filter(|&&w| w > 0.0).count();
    if k > support {
        return Err(DataError::precondition(format!(
            "cannot draw {k} distinct tokens from {support} with nonzero weight"
        )));
    }

    let mut dist = WeightedIndex::new(weights)?;
    let mut picked = Vec::with_capacity(k);
    for draw in 0..k {
        let idx = dist.sample(rng);
        picked.push(idx);
        if draw + 1 < k {
            dist.update_weights(&[(idx, &0.0)])?;
        }
    }
    Ok(picked)
}

// Pick one element of `pool`, weighted by the matching entry of `weights`.
pub fn choose_weighted<R: Rng + ?Sized>(
    rng: &mut R,
    pool: &[usize],
    weights: &[f64],
) -> Result<usize> {
    let mass: f64 = weights.iter().sum();
    if pool.is_empty() || mass <= 0.0 {
        return Err(DataError::precondition("weighted pool has no probability mass"));
    }
    let dist = WeightedIndex::new(weights)?;
    Ok(pool[dist.sample(rng)])
}
