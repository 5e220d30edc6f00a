//! Command-line interface for the passkit bundle generator.
//!
//! `passkit generate` assembles and signs a `.pkpass` archive from a
//! `pass.json` document, a PKCS#12 certificate and a template directory.
//! `passkit inspect` prints the contents of an existing archive and checks
//! its manifest.

use clap::{Args, Parser, Subcommand};
use passkit::bundle::decode_pass;
use passkit::{PassArchive, PassGenerator};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "passkit")]
#[command(about = "Wallet pass bundle generator")]
struct Cli {
    /// Log external tool output and every pipeline step
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build a signed .pkpass archive
    Generate(GenerateArgs),
    /// Show the contents of a .pkpass archive and verify its manifest
    Inspect {
        /// Archive to inspect
        archive: PathBuf,
    },
}

#[derive(Args)]
struct GenerateArgs {
    /// pass.json document describing the pass
    #[arg(long)]
    pass: PathBuf,

    /// PKCS#12 file (.p12) with the pass type certificate
    #[arg(short = 'p', long)]
    pkcs12: PathBuf,

    /// Password for the PKCS#12 file
    #[arg(long, env = "PASSKIT_CERT_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Apple WWDR intermediate certificate (PEM)
    #[arg(long)]
    wwdr: PathBuf,

    /// Directory of assets (icons, logos) copied into the pass
    #[arg(short, long)]
    template: PathBuf,

    /// Output file
    #[arg(short, long)]
    output: PathBuf,

    /// openssl binary
    #[arg(long, default_value = "openssl")]
    openssl: PathBuf,

    /// zip binary
    #[arg(long, default_value = "zip")]
    zip: PathBuf,

    /// Kill external tools running longer than this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Read the PKCS#12 file with OpenSSL 3's legacy provider
    #[arg(long)]
    legacy: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Generate(args) => generate(args).await?,
        Command::Inspect { archive } => inspect(&archive)?,
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn generate(args: GenerateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let pass = decode_pass(&tokio::fs::read(&args.pass).await?)?;

    let mut builder = PassGenerator::builder()
        .pkcs12(&args.pkcs12)
        .wwdr_certificate(&args.wwdr)
        .template_dir(&args.template)
        .openssl(&args.openssl)
        .zip(&args.zip)
        .legacy_pkcs12(args.legacy);
    if let Some(password) = args.password {
        builder = builder.password(password);
    }
    if let Some(secs) = args.timeout_secs {
        builder = builder.tool_timeout(Duration::from_secs(secs));
    }
    let generator = builder.build()?;
    debug!(?generator, "Configured generator");

    let bytes = generator.generate(&pass).await?;
    tokio::fs::write(&args.output, &bytes).await?;

    println!("Generated: {} ({} bytes)", args.output.display(), bytes.len());
    Ok(())
}

fn inspect(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let archive = PassArchive::from_bytes(&std::fs::read(path)?)?;

    println!("Entries:");
    for name in archive.entry_names() {
        println!("  {}", name);
    }

    let manifest = archive.manifest()?;
    println!("Manifest:");
    for (key, hash) in manifest.iter() {
        println!("  {}  {}", hash, key);
    }

    match archive.signature() {
        Some(signature) => println!("Signature: {} bytes", signature.len()),
        None => println!("Signature: missing"),
    }

    let pass = archive.pass()?;
    println!(
        "Pass: {} ({}, serial {})",
        pass.pass_type_identifier,
        pass.style.name(),
        pass.serial_number
    );

    archive.verify_manifest()?;
    println!("Manifest verified");
    Ok(())
}
