//! qcrypt: hybrid post-quantum file encryption CLI
//!
//! Commands:
//!   encrypt <input>...         - encrypt files to <name>.qcrypt.json + <name>.key
//!   decrypt <container> --key  - decrypt a container with key text or @keyfile
//!   digest <file>              - integrity digest (sha256, sha512, blake3)
//!   backends                   - KEM backend probe report
//!   config show                - display the effective configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use qcrypt_core::config::QcryptConfig;
use qcrypt_crypto::{
    digest::digest_reader, BackendRegistry, CryptoError, DigestAlgorithm, KemVariant, Pipeline,
    PipelineOptions,
};

mod files;

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "qcrypt",
    version,
    about = "Hybrid post-quantum file encryption",
    long_about = "qcrypt: encrypt files with ML-KEM + HKDF-SHA256 + AES-256-GCM"
)]
struct Cli {
    /// Path to qcrypt.toml configuration file
    #[arg(long, short = 'c', env = "QCRYPT_CONFIG", default_value = "qcrypt.toml")]
    config: PathBuf,

    /// Log level or filter directive (overrides config)
    #[arg(long = "log", env = "QCRYPT_LOG")]
    log_level: Option<String>,

    /// Log format (overrides config)
    #[arg(long, env = "QCRYPT_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Use the INSECURE mock KEM when no real backend is available
    #[arg(long, global = true)]
    allow_insecure_mock: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt one or more files
    ///
    /// Each input gets a fresh key pair. The private key is written to
    /// <name>.key; keep it, it is the only way to decrypt.
    Encrypt {
        /// Files to encrypt
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Directory for outputs (default: beside each input)
        #[arg(long, short = 'o')]
        out_dir: Option<PathBuf>,
        /// KEM variant: 512, 768 or 1024 (overrides config)
        #[arg(long)]
        variant: Option<String>,
        /// Write the key with an explicit b64: tag
        #[arg(long)]
        tagged_key: bool,
        /// Print a JSON summary instead of text
        #[arg(long)]
        json: bool,
    },

    /// Decrypt a container
    Decrypt {
        /// Container file (<name>.qcrypt.json)
        container: PathBuf,
        /// Private key text, or @path to read it from a file
        #[arg(long, short = 'k', env = "QCRYPT_KEY", hide_env_values = true)]
        key: String,
        /// Output path (default: container path without .qcrypt.json); "-" for stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Print the integrity digest of a file
    Digest {
        file: PathBuf,
        /// sha256, sha512 or blake3 (overrides config)
        #[arg(long, short = 'a')]
        algorithm: Option<String>,
    },

    /// Show which KEM backends are available
    Backends {
        #[arg(long)]
        json: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (defaults merged with the config file)
    Show,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match QcryptConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let level = cli.log_level.as_deref().unwrap_or(&config.logging.level);
    let format = match &cli.log_format {
        Some(format) => format.clone(),
        None => LogFormat::from_str(&config.logging.format, true).unwrap_or(LogFormat::Text),
    };
    init_logging(level, &format);

    match run(cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, config: QcryptConfig) -> Result<()> {
    let mut options = PipelineOptions::from_config(&config.pipeline)?;
    options.allow_insecure_mock |= cli.allow_insecure_mock;

    match cli.command {
        Commands::Encrypt { inputs, out_dir, variant, tagged_key, json } => {
            if let Some(name) = variant {
                options.variant = KemVariant::from_name(&name).with_context(|| {
                    format!("unknown KEM variant {name:?} (expected 512, 768 or 1024)")
                })?;
            }
            cmd_encrypt(&inputs, out_dir.as_deref(), &options, tagged_key, json)
        }
        Commands::Decrypt { container, key, out } => {
            cmd_decrypt(&container, &key, out.as_deref(), &options)
        }
        Commands::Digest { file, algorithm } => {
            let name = algorithm.as_deref().unwrap_or(&config.pipeline.digest_algorithm);
            cmd_digest(&file, name)
        }
        Commands::Backends { json } => cmd_backends(json),
        Commands::Config { action: ConfigAction::Show } => cmd_config_show(&config, &cli.config),
    }
}

fn report(err: &anyhow::Error) {
    eprintln!("error: {}", describe(err));
}

/// User-facing text for a failure. Crypto failures collapse to the generic
/// client message; the precise kind goes to the debug log only.
fn describe(err: &anyhow::Error) -> String {
    match err.downcast_ref::<CryptoError>() {
        Some(crypto) => {
            tracing::debug!(error = %format!("{err:#}"), "operation failed");
            crypto.client_status().message().to_string()
        }
        None => format!("{err:#}"),
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries command output; logs go to stderr
    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

// ── `qcrypt encrypt` ──────────────────────────────────────────────────────────

fn cmd_encrypt(
    inputs: &[PathBuf],
    out_dir: Option<&Path>,
    options: &PipelineOptions,
    tagged_key: bool,
    json: bool,
) -> Result<()> {
    if let Some(dir) = out_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating output directory {}", dir.display()))?;
    }

    let pipeline = Pipeline::new();
    let results: Vec<Result<files::EncryptedFile>> = inputs
        .par_iter()
        .map(|input| files::encrypt_file(&pipeline, input, out_dir, options, tagged_key))
        .collect();

    let mut written = Vec::with_capacity(results.len());
    let mut failed = 0usize;
    for (input, result) in inputs.iter().zip(results) {
        match result {
            Ok(file) => written.push(file),
            Err(e) => {
                eprintln!("{}: {}", input.display(), describe(&e));
                failed += 1;
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&written)?);
    } else {
        for file in &written {
            if file.backend.insecure {
                eprintln!(
                    "WARNING: {} was encrypted with the INSECURE mock KEM",
                    file.input.display()
                );
            }
            println!("{}", file.input.display());
            println!("  container:  {}", file.container.display());
            println!("  key:        {}", file.key.display());
            println!("  kem:        {} ({})", file.variant, file.backend.backend);
            println!(
                "  {}:     {} (container)",
                file.digest_algorithm, file.container_digest
            );
            println!(
                "  {}:     {} (public key)",
                file.digest_algorithm, file.public_key_digest
            );
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} inputs failed", inputs.len());
    }
    Ok(())
}

// ── `qcrypt decrypt` ──────────────────────────────────────────────────────────

fn cmd_decrypt(
    container: &Path,
    key_arg: &str,
    out: Option<&Path>,
    options: &PipelineOptions,
) -> Result<()> {
    let key = files::read_key_arg(key_arg)?;
    let plaintext = files::decrypt_file(&Pipeline::new(), container, &key, options)?;

    match out {
        Some(path) if path == Path::new("-") => {
            use std::io::Write;
            std::io::stdout()
                .write_all(&plaintext)
                .context("writing plaintext to stdout")?;
        }
        _ => {
            let path = out
                .map(Path::to_path_buf)
                .unwrap_or_else(|| files::default_plaintext_path(container));
            std::fs::write(&path, &plaintext)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

// ── `qcrypt digest` ───────────────────────────────────────────────────────────

fn cmd_digest(file: &Path, algorithm: &str) -> Result<()> {
    let (algorithm, _) = DigestAlgorithm::from_name_or_default(algorithm);
    let reader =
        std::fs::File::open(file).with_context(|| format!("opening {}", file.display()))?;
    let hex = digest_reader(std::io::BufReader::new(reader), algorithm)
        .with_context(|| format!("reading {}", file.display()))?;
    println!("{algorithm}:{hex}  {}", file.display());
    Ok(())
}

// ── `qcrypt backends` ─────────────────────────────────────────────────────────

fn cmd_backends(json: bool) -> Result<()> {
    let registry = BackendRegistry::global();

    if json {
        println!("{}", serde_json::to_string_pretty(registry.report())?);
        return Ok(());
    }

    println!("{:<14} {:<10} supported", "backend", "status");
    for report in registry.report() {
        let status = if report.is_available() { "ok" } else { "unusable" };
        let supported: Vec<&str> = report.supported.iter().map(|v| v.name()).collect();
        println!(
            "{:<14} {:<10} {}",
            report.backend.name(),
            status,
            supported.join(", ")
        );
        if let Some(err) = &report.error {
            println!("{:<14} last error: {err}", "");
        }
    }
    match registry.select_backend(false) {
        Ok(selection) => println!("\nselected: {}", selection.backend),
        Err(_) => println!("\nselected: none (the insecure mock requires --allow-insecure-mock)"),
    }
    Ok(())
}

// ── `qcrypt config show` ──────────────────────────────────────────────────────

fn cmd_config_show(config: &QcryptConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    println!();
    let rendered = config.to_toml().context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}
