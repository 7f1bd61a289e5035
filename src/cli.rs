use crate::error::{Result as RsaResult, RsaError};
use crate::key::Key;
use crate::rsa::{ExponentSource, Rsa, ScriptedExponents};
use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use log::LevelFilter;
use num_bigint::BigUint;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

pub const START: u64 = 0;
pub const STOP: u64 = 100;
pub const STEP: u64 = 1;

pub const CHAT_START: u64 = 1000;
pub const CHAT_STOP: u64 = 5000;

pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

#[derive(Parser, Debug)]
#[command(name = "textbook-rsa", version, about = "Textbook RSA over the Extended Euclidean Algorithm")]
pub struct Cli {
    /// Repeat for more log output (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a key pair and store it in two files.
    Create {
        private_key: PathBuf,
        public_key: PathBuf,
        #[command(flatten)]
        range: RangeArgs,
        /// Public exponent candidates to try before prompting.
        #[arg(long = "exponent", value_name = "E")]
        exponents: Vec<BigUint>,
        /// Overwrite existing key files.
        #[arg(long)]
        force: bool,
    },
    /// Encrypt with a public key.
    #[command(subcommand)]
    Encrypt(Target),
    /// Decrypt with a private key.
    #[command(subcommand)]
    Decrypt(Target),
    /// Chat with a peer over TCP.
    #[command(subcommand)]
    Chat(ChatMode),
}

#[derive(Args, Debug, Clone)]
pub struct RangeArgs {
    /// Start of the prime range (inclusive).
    #[arg(long, default_value_t = BigUint::from(START))]
    pub start: BigUint,
    /// End of the prime range (exclusive).
    #[arg(long, default_value_t = BigUint::from(STOP))]
    pub stop: BigUint,
    #[arg(long, default_value_t = BigUint::from(STEP))]
    pub step: BigUint,
}

#[derive(Subcommand, Debug)]
pub enum Target {
    /// Transform a text given on the command line and print it.
    Text { content: String, key: PathBuf },
    /// Transform a file into another file.
    File {
        input: PathBuf,
        output: PathBuf,
        key: PathBuf,
        /// Overwrite the output file if it exists.
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ChatMode {
    Server {
        #[arg(default_value = DEFAULT_ADDR)]
        addr: String,
        #[arg(long = "exponent", value_name = "E")]
        exponents: Vec<BigUint>,
    },
    Client {
        #[arg(default_value = DEFAULT_ADDR)]
        addr: String,
        #[arg(long = "exponent", value_name = "E")]
        exponents: Vec<BigUint>,
    },
}

/// Prompts on stdin for public exponents, after any scripted candidates run out.
pub struct ConsoleExponents {
    scripted: ScriptedExponents,
}

impl ConsoleExponents {
    pub fn new(scripted: Vec<BigUint>) -> Self {
        Self {
            scripted: ScriptedExponents::new(scripted),
        }
    }
}

impl ExponentSource for ConsoleExponents {
    fn candidate(&mut self, phi: &BigUint) -> RsaResult<BigUint> {
        match self.scripted.candidate(phi) {
            Err(RsaError::ExponentsExhausted) => {}
            scripted => return scripted,
        }
        let stdin = io::stdin();
        loop {
            print!("Choose your public key 'e' (must be coprime with phi(n) = {}): ", phi);
            io::stdout().flush()?;
            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                return Err(RsaError::ExponentsExhausted);
            }
            match line.trim().parse::<BigUint>() {
                Ok(e) => return Ok(e),
                Err(_) => println!("{:?} is not a non-negative integer, try again.", line.trim()),
            }
        }
    }

    fn rejected(&mut self, candidate: &BigUint, phi: &BigUint) {
        println!(
            "Invalid 'e'. {} is not coprime with phi(n) = {}. Try again.",
            candidate, phi
        );
    }
}

pub fn create(
    private_key: &Path,
    public_key: &Path,
    range: &RangeArgs,
    exponents: Vec<BigUint>,
    force: bool,
) -> Result<()> {
    for path in [private_key, public_key] {
        if path.exists() && !force {
            bail!("a key already exists at {}", path.display());
        }
    }

    let mut source = ConsoleExponents::new(exponents);
    let rsa = Rsa::generate(
        &mut rand::thread_rng(),
        &range.start,
        &range.stop,
        &range.step,
        &mut source,
    )?;

    rsa.private_key()
        .write_to(private_key)
        .with_context(|| format!("writing {}", private_key.display()))?;
    println!(
        "Private key stored in {}. Do not share it with anyone!",
        private_key.display()
    );
    rsa.public_key()
        .write_to(public_key)
        .with_context(|| format!("writing {}", public_key.display()))?;
    println!("Public key stored in {}", public_key.display());
    Ok(())
}

/// Applies the key in `key_path` to a text or a file; used for both directions.
pub fn transform(target: &Target) -> Result<()> {
    match target {
        Target::Text { content, key } => {
            let key = load_key(key)?;
            println!("{}", key.apply(content)?);
        }
        Target::File {
            input,
            output,
            key,
            force,
        } => {
            let key = load_key(key)?;
            if output.exists() && !force {
                bail!("{} already exists, use --force to overwrite", output.display());
            }
            let source = fs::read_to_string(input)
                .with_context(|| format!("reading {}", input.display()))?;
            fs::write(output, key.apply(&source)?)
                .with_context(|| format!("writing {}", output.display()))?;
            println!("Done. Output written to {}", output.display());
        }
    }
    Ok(())
}

pub fn chat_keys(exponents: Vec<BigUint>) -> Result<Rsa> {
    let mut source = ConsoleExponents::new(exponents);
    let rsa = Rsa::generate(
        &mut rand::thread_rng(),
        &BigUint::from(CHAT_START),
        &BigUint::from(CHAT_STOP),
        &BigUint::from(STEP),
        &mut source,
    )?;
    println!("Key pair ready, public key ({})", rsa.public_key());
    Ok(rsa)
}

fn load_key(path: &Path) -> Result<Key> {
    Key::read_from(path).with_context(|| format!("loading key {}", path.display()))
}
