//! Command-line front end.
//!
//! Everything the engine treats as an external collaborator lives here:
//! argument parsing, passphrase sourcing from the environment, path
//! validation, output-path derivation, and user-facing reporting. The
//! engine only ever sees a validated [`Options`].

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use bytesize::ByteSize;
use clap::{Parser, Subcommand};

use crate::config::{ENCRYPTED_EXTENSION, PASSPHRASE_ENV};
use crate::engine;
use crate::options::Options;
use crate::secret::Secret;

#[derive(Parser)]
#[command(name = "qforge", version, about = "Chunked authenticated file encryption: AES-256-GCM per chunk, Argon2id key derivation, whole-container HMAC.")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt a file into a `.enc` container.
    Encrypt {
        /// Input file path.
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (defaults to the input path plus `.enc`).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Plaintext chunk size in bytes (0 = auto-tune from the input size).
        #[arg(long, default_value_t = 0)]
        chunk_size: u32,

        /// Worker threads (0 = one per logical CPU).
        #[arg(long, default_value_t = 0)]
        workers: usize,

        /// Overwrite the output file if it exists.
        #[arg(long)]
        force: bool,
    },

    /// Decrypt a `.enc` container.
    Decrypt {
        /// Input container path (must end in `.enc`).
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (defaults to the input path without `.enc`).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Worker threads (0 = one per logical CPU).
        #[arg(long, default_value_t = 0)]
        workers: usize,

        /// Overwrite the output file if it exists.
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    pub fn init() -> Result<Self> {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
        Ok(Self::parse())
    }

    pub fn execute(self) -> Result<()> {
        match self.command {
            Commands::Encrypt { input, output, chunk_size, workers, force } => run(Mode::Encrypt, input, output, chunk_size, workers, force),
            Commands::Decrypt { input, output, workers, force } => run(Mode::Decrypt, input, output, 0, workers, force),
        }
    }
}

#[derive(Clone, Copy)]
enum Mode {
    Encrypt,
    Decrypt,
}

fn run(mode: Mode, input: PathBuf, output: Option<PathBuf>, chunk_size: u32, workers: usize, force: bool) -> Result<()> {
    let size = validate_input(&input)?;
    let output = match output {
        Some(path) => path,
        None => derive_output(mode, &input)?,
    };
    validate_output(&input, &output, force)?;
    let passphrase = passphrase_from_env()?;

    tracing::info!("input: {} ({})", input.display(), ByteSize(size).to_string_as(true));
    tracing::info!("output: {}", output.display());

    let opts = Options { input, output, passphrase, chunk_size, workers };

    let start = Instant::now();
    match mode {
        Mode::Encrypt => {
            engine::encrypt(&opts).with_context(|| format!("failed to encrypt {}", opts.input.display()))?;
            tracing::info!("encryption took {:?}", start.elapsed());
        }
        Mode::Decrypt => {
            engine::decrypt(&opts).with_context(|| format!("failed to decrypt {}", opts.input.display()))?;
            tracing::info!("decryption took {:?}", start.elapsed());
        }
    }

    Ok(())
}

/// Input must exist and be a regular file; symlinks are refused rather than
/// followed. Returns the input size for reporting.
fn validate_input(path: &Path) -> Result<u64> {
    let meta = fs::symlink_metadata(path).with_context(|| format!("cannot stat input {}", path.display()))?;
    if meta.file_type().is_symlink() {
        bail!("input is a symlink: {} (refusing to follow)", path.display());
    }
    if !meta.is_file() {
        bail!("input is not a regular file: {}", path.display());
    }
    Ok(meta.len())
}

fn validate_output(input: &Path, output: &Path, force: bool) -> Result<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        let meta = fs::metadata(parent).with_context(|| format!("cannot access output directory {}", parent.display()))?;
        if !meta.is_dir() {
            bail!("output directory {} is not a directory", parent.display());
        }
    }

    if output.exists() {
        if same_file(input, output) {
            bail!("input and output refer to the same file");
        }
        if !force {
            bail!("output file {} already exists (pass --force to overwrite)", output.display());
        }
    }

    Ok(())
}

/// Conservative same-file check via canonicalized paths. Enough to stop the
/// obvious foot-gun of encrypting a file over itself.
fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn derive_output(mode: Mode, input: &Path) -> Result<PathBuf> {
    match mode {
        Mode::Encrypt => {
            let mut name = input.as_os_str().to_os_string();
            name.push(ENCRYPTED_EXTENSION);
            Ok(PathBuf::from(name))
        }
        Mode::Decrypt => match input.to_string_lossy().strip_suffix(ENCRYPTED_EXTENSION) {
            Some(stripped) => Ok(PathBuf::from(stripped.to_owned())),
            None => bail!("decrypt requires the input to end with {ENCRYPTED_EXTENSION}"),
        },
    }
}

fn passphrase_from_env() -> Result<Secret<Vec<u8>>> {
    let value = env::var(PASSPHRASE_ENV).with_context(|| format!("set {PASSPHRASE_ENV} to the passphrase"))?;
    if value.is_empty() {
        bail!("{PASSPHRASE_ENV} is set but empty");
    }
    Ok(Secret::new(value.into_bytes()))
}
