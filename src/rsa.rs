use crate::eea::ExtendedEuclid;
use crate::error::{Result, RsaError};
use crate::key::Key;
use crate::prime::{is_prime, random_prime};
use log::{debug, info};
use num_bigint::{BigInt, BigUint};
use num_traits::{One, ToPrimitive, Zero};
use rand::Rng;
use std::collections::VecDeque;

/// Supplies candidate public exponents during key generation.
///
/// Generation keeps asking until a candidate is coprime with phi, so an
/// implementation that wants a bound has to return an error itself.
pub trait ExponentSource {
    fn candidate(&mut self, phi: &BigUint) -> Result<BigUint>;

    fn rejected(&mut self, candidate: &BigUint, phi: &BigUint);
}

/// A fixed list of candidates, tried in order.
#[derive(Debug, Clone, Default)]
pub struct ScriptedExponents {
    pending: VecDeque<BigUint>,
    rejected: Vec<BigUint>,
}

impl ScriptedExponents {
    pub fn new<I, T>(candidates: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<BigUint>,
    {
        Self {
            pending: candidates.into_iter().map(Into::into).collect(),
            rejected: Vec::new(),
        }
    }

    pub fn rejections(&self) -> &[BigUint] {
        &self.rejected
    }
}

impl ExponentSource for ScriptedExponents {
    fn candidate(&mut self, _phi: &BigUint) -> Result<BigUint> {
        self.pending.pop_front().ok_or(RsaError::ExponentsExhausted)
    }

    fn rejected(&mut self, candidate: &BigUint, _phi: &BigUint) {
        self.rejected.push(candidate.clone());
    }
}

/// A textbook RSA key pair together with the primes it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rsa {
    p: BigUint,
    q: BigUint,
    e: BigUint,
    d: BigUint,
}

impl Rsa {
    /// Samples two distinct primes from `[start, stop)` and asks `exponents`
    /// for a public exponent until one is coprime with phi.
    pub fn generate<R, S>(
        rng: &mut R,
        start: &BigUint,
        stop: &BigUint,
        step: &BigUint,
        exponents: &mut S,
    ) -> Result<Self>
    where
        R: Rng + ?Sized,
        S: ExponentSource + ?Sized,
    {
        let p = random_prime(rng, start, stop, step)?;
        debug!("sampled p = {}", p);
        let mut q = random_prime(rng, start, stop, step)?;
        while q == p {
            q = random_prime(rng, start, stop, step)?;
        }
        debug!("sampled q = {}", q);

        let phi = totient(&p, &q);
        debug!("phi = {}", phi);

        let phi_int = BigInt::from(phi.clone());
        let (e, eea) = loop {
            let e = exponents.candidate(&phi)?;
            let eea = ExtendedEuclid::execute(&BigInt::from(e.clone()), &phi_int);
            if eea.are_coprime() {
                break (e, eea);
            }
            info!("rejected public exponent {}: not coprime with phi = {}", e, phi);
            exponents.rejected(&e, &phi);
        };

        let d = private_exponent_from(&eea, &e, &phi_int)?;
        info!("generated key pair with n = {}", &p * &q);
        Ok(Self { p, q, e, d })
    }

    /// Builds a key pair from known primes and public exponent.
    pub fn from_parts(p: BigUint, q: BigUint, e: BigUint) -> Result<Self> {
        for prime in [&p, &q] {
            if !is_prime(prime) {
                return Err(RsaError::NotPrime(prime.clone()));
            }
        }
        if p == q {
            return Err(RsaError::SamePrimes(p));
        }
        let phi = BigInt::from(totient(&p, &q));
        let e_int = BigInt::from(e.clone());
        let eea = ExtendedEuclid::execute(&e_int, &phi);
        let d = private_exponent_from(&eea, &e, &phi)?;
        Ok(Self { p, q, e, d })
    }

    pub fn n(&self) -> BigUint {
        &self.p * &self.q
    }

    pub fn phi(&self) -> BigUint {
        totient(&self.p, &self.q)
    }

    pub fn public_exponent(&self) -> &BigUint {
        &self.e
    }

    pub fn private_exponent(&self) -> &BigUint {
        &self.d
    }

    pub fn public_key(&self) -> Key {
        Key::new(self.n(), self.e.clone())
    }

    pub fn private_key(&self) -> Key {
        Key::new(self.n(), self.d.clone())
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        encrypt_with(&self.n(), &self.e, plaintext)
    }

    pub fn decrypt(&self, ciphertext: &str) -> Result<String> {
        decrypt_with(&self.n(), &self.d, ciphertext)
    }
}

fn totient(p: &BigUint, q: &BigUint) -> BigUint {
    (p - BigUint::one()) * (q - BigUint::one())
}

fn private_exponent_from(eea: &ExtendedEuclid, e: &BigUint, phi: &BigInt) -> Result<BigUint> {
    let d = eea.modular_inverse(&BigInt::from(e.clone()), phi)?;
    // Reduced modulo a positive phi, so the sign is never negative.
    Ok(d.into_parts().1)
}

fn transform_unit(unit: &BigUint, key: &BigUint, n: &BigUint) -> BigUint {
    unit.modpow(key, n)
}

fn to_char(value: BigUint) -> Result<char> {
    value
        .to_u32()
        .and_then(char::from_u32)
        .ok_or(RsaError::InvalidCodePoint(value))
}

/// Raises every character's code point to `key` modulo `n`.
///
/// Code points at or above `n` are reduced and cannot be recovered. A result
/// that is not a Unicode scalar value is an error.
pub fn encrypt_with(n: &BigUint, key: &BigUint, plaintext: &str) -> Result<String> {
    encrypt_units(n, key, plaintext)?.into_iter().map(to_char).collect()
}

/// Same transform as [`encrypt_with`]; only the exponent differs.
pub fn decrypt_with(n: &BigUint, key: &BigUint, ciphertext: &str) -> Result<String> {
    encrypt_with(n, key, ciphertext)
}

/// Per-character transform that keeps the results as integers.
pub fn encrypt_units(n: &BigUint, key: &BigUint, text: &str) -> Result<Vec<BigUint>> {
    if n.is_zero() {
        return Err(RsaError::ZeroModulus);
    }
    Ok(text
        .chars()
        .map(|c| transform_unit(&BigUint::from(c as u32), key, n))
        .collect())
}

pub fn decrypt_units(n: &BigUint, key: &BigUint, units: &[BigUint]) -> Result<String> {
    if n.is_zero() {
        return Err(RsaError::ZeroModulus);
    }
    units
        .iter()
        .map(|unit| to_char(transform_unit(unit, key, n)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn big(n: u64) -> BigUint {
        BigUint::from(n)
    }

    fn textbook() -> Rsa {
        Rsa::from_parts(big(61), big(53), big(17)).unwrap()
    }

    #[test]
    fn test_textbook_parameters() {
        let rsa = textbook();
        assert_eq!(rsa.n(), big(3233));
        assert_eq!(rsa.phi(), big(3120));
        assert_eq!(rsa.public_exponent(), &big(17));
        assert_eq!(rsa.private_exponent(), &big(2753));
        assert_eq!(rsa.public_key().to_string(), "3233 17");
        assert_eq!(rsa.private_key().to_string(), "3233 2753");
    }

    #[test]
    fn test_rsa_encryption_decryption_small() {
        let ciphertext = encrypt_with(&big(3233), &big(17), "A").unwrap();
        assert_eq!(ciphertext.chars().count(), 1);
        assert_eq!(ciphertext.chars().next().map(|c| c as u32), Some(2790));
        assert_eq!(decrypt_with(&big(3233), &big(2753), &ciphertext).unwrap(), "A");
    }

    #[test]
    fn test_instance_round_trip() {
        let rsa = textbook();
        let message = "Hello RSA! ção";
        let encrypted = rsa.encrypt(message).unwrap();
        assert_eq!(encrypted.chars().count(), message.chars().count());
        assert_ne!(encrypted, message);
        assert_eq!(rsa.decrypt(&encrypted).unwrap(), message);
    }

    #[test]
    fn test_keys_are_interchangeable() {
        let rsa = textbook();
        let signed = rsa.private_key().apply("sig").unwrap();
        assert_eq!(rsa.public_key().apply(&signed).unwrap(), "sig");
    }

    #[test]
    fn test_round_trip_over_prime_pairs() {
        let primes: Vec<u64> = (11..200).filter(|n| is_prime(&big(*n))).collect();
        let text: String = (32u8..127).map(char::from).collect();
        for (i, p) in primes.iter().enumerate() {
            for q in primes.iter().skip(i + 1).step_by(7) {
                let rsa = Rsa::from_parts(big(*p), big(*q), big(65537)).unwrap();
                let encrypted = rsa.encrypt(&text).unwrap();
                assert_eq!(rsa.decrypt(&encrypted).unwrap(), text, "p={} q={}", p, q);
            }
        }
    }

    #[test]
    fn test_lossy_when_code_point_not_below_n() {
        let rsa = Rsa::from_parts(big(5), big(7), big(5)).unwrap();
        assert_eq!(rsa.private_exponent(), &big(5));
        let recovered = rsa.decrypt(&rsa.encrypt("A").unwrap()).unwrap();
        assert_eq!(recovered, char::from(65u8 % 35).to_string());
    }

    #[test]
    fn test_invalid_code_point_is_an_error() {
        let err = encrypt_with(&big(10_000_000_000), &big(2), "\u{FFFF}").unwrap_err();
        assert!(matches!(err, RsaError::InvalidCodePoint(v) if v == big(65535 * 65535)));

        let surrogate = decrypt_units(&big(100_000), &big(1), &[big(0xD800)]).unwrap_err();
        assert!(matches!(surrogate, RsaError::InvalidCodePoint(_)));
    }

    #[test]
    fn test_zero_modulus() {
        assert!(matches!(encrypt_with(&big(0), &big(3), "x"), Err(RsaError::ZeroModulus)));
    }

    #[test]
    fn test_units_survive_large_modulus() {
        let rsa = Rsa::from_parts(big(4999), big(4993), big(65537)).unwrap();
        let public = rsa.public_key();
        let units = public.apply_units("out of range ✓").unwrap();
        assert!(units.iter().all(|u| u < &rsa.n()));
        assert_eq!(rsa.private_key().recover_units(&units).unwrap(), "out of range ✓");
    }

    #[test]
    fn test_from_parts_validation() {
        assert!(matches!(
            Rsa::from_parts(big(60), big(53), big(17)),
            Err(RsaError::NotPrime(v)) if v == big(60)
        ));
        assert!(matches!(
            Rsa::from_parts(big(61), big(61), big(17)),
            Err(RsaError::SamePrimes(_))
        ));
        assert!(matches!(
            Rsa::from_parts(big(61), big(53), big(15)),
            Err(RsaError::NotCoprime { .. })
        ));
    }

    #[test]
    fn test_generate_retries_until_coprime() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut exponents = ScriptedExponents::new([2u32, 4, 10007]);
        let rsa = Rsa::generate(&mut rng, &big(11), &big(100), &big(2), &mut exponents).unwrap();

        assert_eq!(exponents.rejections(), &[big(2), big(4)]);
        assert_eq!(rsa.public_exponent(), &big(10007));
        assert!(rsa.p != rsa.q);
        assert!(is_prime(&rsa.p) && is_prime(&rsa.q));
        assert_eq!((rsa.public_exponent() * rsa.private_exponent()) % rsa.phi(), big(1));
        assert_eq!(rsa.decrypt(&rsa.encrypt("keygen").unwrap()).unwrap(), "keygen");
    }

    #[test]
    fn test_generate_distinct_primes_in_tiny_range() {
        // Only 2 and 3 are available, so q must be resampled until it differs.
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut exponents = ScriptedExponents::new([1u32]);
            let rsa = Rsa::generate(&mut rng, &big(2), &big(4), &big(1), &mut exponents).unwrap();
            assert_eq!(rsa.n(), big(6));
            assert_eq!(rsa.phi(), big(2));
        }
    }

    #[test]
    fn test_generate_stops_when_script_runs_out() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut exponents = ScriptedExponents::new([2u32]);
        let err = Rsa::generate(&mut rng, &big(11), &big(100), &big(2), &mut exponents).unwrap_err();
        assert!(matches!(err, RsaError::ExponentsExhausted));
        assert_eq!(exponents.rejections(), &[big(2)]);
    }
}
