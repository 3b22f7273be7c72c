//! Cumulative-weight random selection.
//!
//! A draw value is taken uniformly from `[0, total)` and the buckets are
//! walked in order, subtracting each weight until the value falls inside one.
//! A bucket is therefore chosen with probability `weight / total`, and
//! zero-weight buckets are never chosen.

use rand::Rng;

/// Anything that carries a selection weight.
pub trait Weighted {
    fn weight(&self) -> u64;
}

impl Weighted for u64 {
    fn weight(&self) -> u64 {
        *self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SamplerError {
    #[error("total weight is zero")]
    InvalidInput,
    #[error("total weight overflows u64")]
    WeightOverflow,
}

/// Pick one bucket using the thread-local RNG.
pub fn pick<T: Weighted>(buckets: &[T]) -> Result<&T, SamplerError> {
    pick_with(&mut rand::rng(), buckets)
}

/// Pick one bucket using the given RNG.
pub fn pick_with<'a, T, R>(rng: &mut R, buckets: &'a [T]) -> Result<&'a T, SamplerError>
where
    T: Weighted,
    R: Rng + ?Sized,
{
    let total = buckets
        .iter()
        .try_fold(0u64, |acc, bucket| acc.checked_add(bucket.weight()))
        .ok_or(SamplerError::WeightOverflow)?;
    if total == 0 {
        return Err(SamplerError::InvalidInput);
    }

    let mut remaining = rng.random_range(0..total);
    for bucket in buckets {
        let weight = bucket.weight();
        if remaining < weight {
            return Ok(bucket);
        }
        remaining -= weight;
    }
    // `remaining < total` and the weights sum to `total`, so the walk always
    // returns above.
    Err(SamplerError::InvalidInput)
}
