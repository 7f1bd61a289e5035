use crate::error::{Result, RsaError};
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Zero};

/// One iteration of the Extended Euclidean Algorithm.
///
/// `remainder` holds the divisor of the iteration (r before the update),
/// except in the final step where it holds gcd(a, b).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EeaStep {
    pub quotient: BigInt,
    pub remainder: BigInt,
    pub s: BigInt,
    pub t: BigInt,
}

/// The recorded run of the Extended Euclidean Algorithm on one (a, b) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedEuclid {
    steps: Vec<EeaStep>,
    last: EeaStep,
}

impl ExtendedEuclid {
    pub fn execute(a: &BigInt, b: &BigInt) -> Self {
        let mut steps = Vec::new();

        let (mut old_r, mut r) = (a.clone(), b.clone());
        let (mut old_s, mut s) = (BigInt::one(), BigInt::zero());
        let (mut old_t, mut t) = (BigInt::zero(), BigInt::one());

        while !r.is_zero() {
            let quotient = old_r.div_floor(&r);
            steps.push(EeaStep {
                quotient: quotient.clone(),
                remainder: r.clone(),
                s: s.clone(),
                t: t.clone(),
            });

            let next_r = &old_r - &quotient * &r;
            old_r = std::mem::replace(&mut r, next_r);
            let next_s = &old_s - &quotient * &s;
            old_s = std::mem::replace(&mut s, next_s);
            let next_t = &old_t - &quotient * &t;
            old_t = std::mem::replace(&mut t, next_t);
        }

        let last = EeaStep {
            quotient: BigInt::zero(),
            remainder: old_r,
            s: old_s,
            t: old_t,
        };
        Self { steps, last }
    }

    /// Every step in execution order, the final gcd step included.
    pub fn steps(&self) -> impl Iterator<Item = &EeaStep> {
        self.steps.iter().chain(std::iter::once(&self.last))
    }

    pub fn len(&self) -> usize {
        self.steps.len() + 1
    }

    pub fn final_step(&self) -> &EeaStep {
        &self.last
    }

    pub fn gcd(&self) -> &BigInt {
        &self.last.remainder
    }

    /// Bezout coefficients (s, t) with a*s + b*t == gcd(a, b).
    pub fn bezout(&self) -> (&BigInt, &BigInt) {
        (&self.last.s, &self.last.t)
    }

    pub fn are_coprime(&self) -> bool {
        self.last.remainder.is_one()
    }

    /// Inverse of `a` modulo `b`, read from the final step of this run.
    ///
    /// `a` and `b` must be the pair this run was executed on; they are only
    /// used to reduce the coefficient and to describe the failure.
    pub fn modular_inverse(&self, a: &BigInt, b: &BigInt) -> Result<BigInt> {
        if !self.are_coprime() {
            return Err(RsaError::NotCoprime {
                a: a.clone(),
                b: b.clone(),
            });
        }
        if b.is_zero() {
            return Err(RsaError::ZeroModulus);
        }
        Ok(self.last.s.mod_floor(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big(n: i64) -> BigInt {
        BigInt::from(n)
    }

    fn run(a: i64, b: i64) -> ExtendedEuclid {
        ExtendedEuclid::execute(&big(a), &big(b))
    }

    #[test]
    fn test_gcd_24_18() {
        let eea = run(24, 18);
        assert_eq!(eea.gcd(), &big(6));
        assert!(!eea.are_coprime());
        let (s, t) = eea.bezout();
        assert_eq!(big(24) * s + big(18) * t, big(6));
    }

    #[test]
    fn test_step_sequence_24_18() {
        let eea = run(24, 18);
        let steps: Vec<_> = eea.steps().cloned().collect();
        let expected = vec![
            EeaStep { quotient: big(1), remainder: big(18), s: big(0), t: big(1) },
            EeaStep { quotient: big(3), remainder: big(6), s: big(1), t: big(-1) },
            EeaStep { quotient: big(0), remainder: big(6), s: big(1), t: big(-1) },
        ];
        assert_eq!(steps, expected);
        assert_eq!(eea.len(), 3);
    }

    #[test]
    fn test_coprime_17_3120() {
        let eea = run(17, 3120);
        assert_eq!(eea.gcd(), &big(1));
        assert!(eea.are_coprime());
        let (s, t) = eea.bezout();
        assert_eq!(big(17) * s + big(3120) * t, big(1));
    }

    #[test]
    fn test_bezout_identity_holds() {
        let pairs = [(240, 46), (46, 240), (1, 1), (0, 5), (5, 0), (99, 78), (1071, 462), (-12, 18)];
        for (a, b) in pairs {
            let eea = run(a, b);
            let (s, t) = eea.bezout();
            assert_eq!(big(a) * s + big(b) * t, eea.gcd().clone(), "pair ({}, {})", a, b);
        }
    }

    #[test]
    fn test_are_coprime_matches_gcd() {
        assert!(run(7, 3120).are_coprime());
        for a in 1..60 {
            for b in 1..60 {
                assert_eq!(run(a, b).are_coprime(), a.gcd(&b) == 1, "pair ({}, {})", a, b);
            }
        }
    }

    #[test]
    fn test_modular_inverse() {
        let inv = run(7, 3120).modular_inverse(&big(7), &big(3120)).unwrap();
        assert_eq!(inv, big(1783));
        assert_eq!((big(7) * &inv) % big(3120), big(1));

        let d = run(17, 3120).modular_inverse(&big(17), &big(3120)).unwrap();
        assert_eq!(d, big(2753));
    }

    #[test]
    fn test_modular_inverse_not_coprime() {
        let err = run(6, 9).modular_inverse(&big(6), &big(9)).unwrap_err();
        assert!(matches!(err, RsaError::NotCoprime { .. }));
        assert_eq!(
            err.to_string(),
            "6 and 9 are not coprime, so the modular inverse does not exist"
        );
    }

    #[test]
    fn test_modular_inverse_zero_modulus() {
        let err = run(1, 0).modular_inverse(&big(1), &big(0)).unwrap_err();
        assert!(matches!(err, RsaError::ZeroModulus));
    }

    #[test]
    fn test_execute_is_deterministic() {
        assert_eq!(run(1071, 462), run(1071, 462));
        assert_eq!(
            run(17, 3120).steps().collect::<Vec<_>>(),
            run(17, 3120).steps().collect::<Vec<_>>()
        );
    }
}
