pub mod cli;
pub mod client;
pub mod eea;
pub mod error;
pub mod key;
pub mod prime;
pub mod protocol;
pub mod rsa;
pub mod server;

pub use eea::{EeaStep, ExtendedEuclid};
pub use error::{Result, RsaError};
pub use key::Key;
pub use prime::{is_prime, random_prime};
pub use rsa::{
    decrypt_units, decrypt_with, encrypt_units, encrypt_with, ExponentSource, Rsa,
    ScriptedExponents,
};
