use crate::error::{Result, RsaError};
use num_bigint::{BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::Rng;

/// Trial division by every integer from 2 up to and including floor(sqrt(n)).
///
/// Deterministic and slow on purpose; the ranges this crate samples from are small.
pub fn is_prime(n: &BigUint) -> bool {
    if *n <= BigUint::one() {
        return false;
    }
    let limit = n.sqrt();
    let mut divisor = BigUint::from(2u8);
    while divisor <= limit {
        if n.is_multiple_of(&divisor) {
            return false;
        }
        divisor += 1u8;
    }
    true
}

/// Draws uniformly from `start, start + step, ...` below `stop` until a draw is prime.
///
/// There is no retry bound: a progression that holds no prime never returns.
/// Only a range with no draws at all is rejected.
pub fn random_prime<R: Rng + ?Sized>(
    rng: &mut R,
    start: &BigUint,
    stop: &BigUint,
    step: &BigUint,
) -> Result<BigUint> {
    if step.is_zero() {
        return Err(RsaError::ZeroStep);
    }
    if start >= stop {
        return Err(RsaError::EmptyRange {
            start: start.clone(),
            stop: stop.clone(),
        });
    }

    // Number of values start + k*step that stay below stop.
    let slots = (stop - start).div_ceil(step);
    loop {
        let k = rng.gen_biguint_below(&slots);
        let candidate = start + k * step;
        if is_prime(&candidate) {
            return Ok(candidate);
        }
    }
}
