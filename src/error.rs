use num_bigint::{BigInt, BigUint};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RsaError>;

#[derive(Debug, Error)]
pub enum RsaError {
    /// Raised by the EEA when the final remainder is not 1.
    #[error("{a} and {b} are not coprime, so the modular inverse does not exist")]
    NotCoprime { a: BigInt, b: BigInt },

    #[error("modulus must not be zero")]
    ZeroModulus,

    #[error("empty range for random prime: start {start} is not below stop {stop}")]
    EmptyRange { start: BigUint, stop: BigUint },

    #[error("step for random prime must not be zero")]
    ZeroStep,

    #[error("{0} is not prime")]
    NotPrime(BigUint),

    #[error("p and q must be distinct primes, both were {0}")]
    SamePrimes(BigUint),

    #[error("no more public exponent candidates to try")]
    ExponentsExhausted,

    #[error("malformed key: {0}")]
    MalformedKey(String),

    #[error("{0} is not a valid character code point")]
    InvalidCodePoint(BigUint),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
