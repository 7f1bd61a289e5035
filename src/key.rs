use crate::error::{Result, RsaError};
use crate::rsa;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Either half of a key pair: the modulus and one exponent.
///
/// Public and private keys have the same shape; which one this is depends
/// only on which exponent it carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    pub n: BigUint,
    pub exponent: BigUint,
}

impl Key {
    pub fn new(n: BigUint, exponent: BigUint) -> Self {
        Self { n, exponent }
    }

    pub fn apply(&self, text: &str) -> Result<String> {
        rsa::encrypt_with(&self.n, &self.exponent, text)
    }

    pub fn apply_units(&self, text: &str) -> Result<Vec<BigUint>> {
        rsa::encrypt_units(&self.n, &self.exponent, text)
    }

    pub fn recover_units(&self, units: &[BigUint]) -> Result<String> {
        rsa::decrypt_units(&self.n, &self.exponent, units)
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        fs::read_to_string(path)?.parse()
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_string())?;
        Ok(())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.n, self.exponent)
    }
}

impl FromStr for Key {
    type Err = RsaError;

    fn from_str(s: &str) -> Result<Self> {
        let fields: Vec<&str> = s.split_whitespace().collect();
        let [n, exponent] = fields.as_slice() else {
            return Err(RsaError::MalformedKey(format!(
                "expected 2 integers, found {} fields",
                fields.len()
            )));
        };
        let parse = |field: &str| {
            field
                .parse::<BigUint>()
                .map_err(|e| RsaError::MalformedKey(format!("{:?}: {}", field, e)))
        };
        Ok(Self {
            n: parse(*n)?,
            exponent: parse(*exponent)?,
        })
    }
}
