// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docseal: tamper-evident document issuance and verification.
//
// Entry point. Initialises logging and configuration, opens the registry
// backend, and dispatches the subcommand.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use docseal_app::services::data_dir::{self, CONFIG_FILE, LEDGER_FILE};
use docseal_app::{BatchObserver, Issuer, OriginalCheck, Target, Verifier, check_original, issue_batch, write_bundle};
use docseal_core::human_errors::{HumanError, humanize_error};
use docseal_core::types::{FileStatus, valid_until_from_date};
use docseal_core::{
    DocType, DocsealConfig, DocsealError, DocumentId, DocumentMetadata, UploadedFile, VerificationResult,
};
use docseal_document::{ImageCompositor, QrRenderer, build_payload};
use docseal_registry::{Ledger, SigningSession};
use docseal_security::hash_reader;
use tracing_subscriber::EnvFilter;

/// Seal certificates and ID cards with a QR link to an on-chain registry.
#[derive(Parser, Debug)]
#[command(name = "docseal", version, about)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace). RUST_LOG wins.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file (JSON). Defaults to the data directory's config.json.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Ledger snapshot used as the offline registry.
    #[arg(long, global = true)]
    ledger: Option<PathBuf>,

    /// Issue and verify against the chain in the config instead of the
    /// local ledger. The signer key is read from DOCSEAL_PRIVATE_KEY.
    #[cfg(feature = "evm")]
    #[arg(long, global = true)]
    evm: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the Keccak-256 digest of a file.
    Hash { file: PathBuf },

    /// Show where the QR would go on an image, and how large it would be.
    Place {
        image: PathBuf,
        /// Document type the link would carry (affects the link length).
        #[arg(long = "type", value_name = "TYPE", default_value = "certificate")]
        doc_type: DocType,
    },

    /// Stamp and anchor one or more documents.
    Issue(IssueArgs),

    /// Check a document id or verification link.
    Verify {
        /// Document id, or a full verification URL.
        target: String,
        /// Also check that this file is the one that was anchored.
        #[arg(long)]
        original: Option<PathBuf>,
        /// Canonical record JSON written at issuance (`<id>_record.json`),
        /// needed to check an original when record digests are anchored.
        #[arg(long, requires = "original")]
        record: Option<PathBuf>,
    },

    /// Read the QR from stamped images and verify each.
    VerifyImage {
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },

    /// Revoke a document in the local ledger.
    Revoke { id: String },
}

#[derive(clap::Args, Debug)]
struct IssueArgs {
    /// certificate, id_card or employee_card.
    #[arg(long = "type", value_name = "TYPE")]
    doc_type: DocType,
    #[arg(long)]
    issuer: String,
    #[arg(long, default_value = "")]
    subject: String,
    #[arg(long, default_value = "")]
    title: String,
    /// Role (employee card) or program (ID card).
    #[arg(long, default_value = "")]
    role: String,
    #[arg(long, default_value = "")]
    id_number: String,
    #[arg(long, default_value = "")]
    metadata_uri: String,
    /// Expiry date (YYYY-MM-DD). Omit for documents that never expire.
    #[arg(long)]
    valid_until: Option<NaiveDate>,
    /// Directory for the stamped files.
    #[arg(long, default_value = ".")]
    out: PathBuf,
    /// Also write a ZIP bundle with a manifest.
    #[arg(long)]
    bundle: Option<PathBuf>,
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

impl IssueArgs {
    fn metadata(&self) -> DocumentMetadata {
        DocumentMetadata {
            doc_type: self.doc_type,
            issuer: self.issuer.clone(),
            subject: self.subject.clone(),
            title: self.title.clone(),
            role_or_program: self.role.clone(),
            id_number: self.id_number.clone(),
            metadata_uri: self.metadata_uri.clone(),
            valid_until: self.valid_until.map(valid_until_from_date).unwrap_or(0),
        }
    }
}

/// Prints one line per file as the batch moves.
struct Progress {
    total: usize,
}

impl BatchObserver for Progress {
    fn on_status(&mut self, index: usize, name: &str, status: FileStatus, error: Option<&HumanError>) {
        match (status, error) {
            (FileStatus::Processing, _) => eprintln!("[{}/{}] {name}", index + 1, self.total),
            (FileStatus::Error, Some(err)) => eprintln!("  failed: {}", err.summary()),
            _ => {}
        }
    }
}

fn human(err: DocsealError) -> anyhow::Error {
    let summary = humanize_error(&err).summary();
    anyhow::Error::new(err).context(summary)
}

fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_upload(path: &Path) -> anyhow::Result<UploadedFile> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    UploadedFile::from_name(name, bytes).map_err(human)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    tracing::info!("docseal starting");

    let home = data_dir::data_dir();
    let config_path = cli.config.clone().unwrap_or_else(|| home.join(CONFIG_FILE));
    let mut config = DocsealConfig::load_or_default(&config_path)
        .map_err(human)?
        .with_env_overrides();
    let ledger_path = cli.ledger.clone().unwrap_or_else(|| home.join(LEDGER_FILE));

    match cli.command {
        Commands::Hash { file } => {
            let handle = std::fs::File::open(&file).with_context(|| format!("opening {}", file.display()))?;
            let size = handle.metadata().map(|m| m.len()).unwrap_or(0);
            let name = file.display().to_string();
            let digest = hash_reader(handle, &name, size, Utc::now().timestamp_millis());
            if digest.is_degraded() {
                eprintln!("warning: file could not be read in full; this digest is not content-addressed");
            }
            println!("{}  {}", digest.value, file.display());
        }

        Commands::Place { image, doc_type } => {
            let bytes = std::fs::read(&image).with_context(|| format!("reading {}", image.display()))?;
            let contract = if config.contract_address.is_empty() {
                format!("0x{:040x}", 0)
            } else {
                config.contract_address.clone()
            };
            let sample = build_payload(&config.origin, &config.chain, &contract, &DocumentId::generate(doc_type))
                .map_err(human)?;
            let compositor = ImageCompositor::new(QrRenderer::from_settings(&config.qr).map_err(human)?);
            let (placement, qr_size) = compositor.plan(&bytes, &sample).map_err(human)?;
            println!(
                "{} x={} y={} size={} score={:.3}",
                placement.region, placement.x, placement.y, qr_size, placement.score
            );
        }

        Commands::Revoke { id } => {
            let ledger = Ledger::open(&ledger_path, docseal_core::SystemClock).map_err(human)?;
            ledger.revoke(id.trim()).map_err(human)?;
            ledger.persist(&ledger_path).map_err(human)?;
            println!("revoked {}", id.trim());
        }

        command => {
            #[cfg(feature = "evm")]
            if cli.evm {
                let key = std::env::var("DOCSEAL_PRIVATE_KEY")
                    .context("DOCSEAL_PRIVATE_KEY is not set")?;
                let session = docseal_registry::EvmSession::connect(&config.rpc_url, &key, config.chain_id)
                    .await
                    .map_err(human)?;
                return run(command, session, config).await;
            }

            let ledger = Arc::new(
                Ledger::open(&ledger_path, docseal_core::SystemClock)
                    .map_err(human)?
                    .with_chain_id(config.chain_id),
            );
            config.contract_address = format!("{:?}", ledger.contract_address());
            // Anchored records must outlive a partly failed batch.
            let outcome = run(command, ledger.clone(), config).await;
            ledger.persist(&ledger_path).map_err(human)?;
            outcome?;
        }
    }
    Ok(())
}

/// Commands that talk to a registry.
async fn run<S: SigningSession>(command: Commands, session: S, config: DocsealConfig) -> anyhow::Result<()> {
    match command {
        Commands::Issue(args) => {
            let files = args
                .files
                .iter()
                .map(|p| read_upload(p.as_path()))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let metadata = args.metadata();
            metadata.validate().map_err(human)?;

            let issuer = Issuer::new(session, config).map_err(human)?;
            let mut progress = Progress { total: files.len() };
            let report = issue_batch(&issuer, &files, &metadata, &mut progress).await;

            std::fs::create_dir_all(&args.out)?;
            for doc in &report.issued {
                let path = args.out.join(doc.output_name());
                std::fs::write(&path, &doc.document.bytes)?;
                println!("{}  {}  {}", doc.id, doc.receipt.tx_hash, path.display());
                println!("    {}", doc.verification_url);
                if let Some(json) = &doc.canonical_json {
                    let record_path = args.out.join(format!("{}_record.json", doc.id));
                    std::fs::write(&record_path, json)?;
                    println!("    record: {}", record_path.display());
                }
            }
            if let Some(bundle) = &args.bundle {
                let file = std::fs::File::create(bundle)?;
                write_bundle(file, &report.issued, &metadata, Utc::now()).map_err(human)?;
                println!("bundle: {}", bundle.display());
            }
            if !report.failures.is_empty() {
                bail!("{} of {} files failed", report.failures.len(), files.len());
            }
        }

        Commands::Verify { target, original, record } => {
            let verifier = Verifier::new(session, &config).map_err(human)?;
            let result = match target.parse::<Target>().map_err(human)? {
                Target::Id(id) => verifier.verify_id(&id).await,
                Target::Link(link) => verifier.verify_link(&link).await,
            }
            .map_err(human)?;
            print_result(&result);
            if let (Some(path), Some(anchored)) = (original, result.record()) {
                let bytes = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
                let json = record
                    .map(|p| std::fs::read_to_string(&p).with_context(|| format!("reading {}", p.display())))
                    .transpose()?;
                match check_original(anchored, &bytes, config.anchor_mode, json.as_deref()) {
                    OriginalCheck::Matches => {
                        println!("original: {} matches the anchored digest", path.display())
                    }
                    OriginalCheck::Differs => {
                        println!("original: {} does NOT match the anchored digest", path.display())
                    }
                    OriginalCheck::NeedsRecord => {
                        println!("original: pass --record <id>_record.json to compare under canonical_record anchoring")
                    }
                }
            }
        }

        Commands::VerifyImage { images } => {
            let verifier = Verifier::new(session, &config).map_err(human)?;
            let files = images
                .iter()
                .map(|p| read_upload(p.as_path()))
                .collect::<anyhow::Result<Vec<_>>>()?;
            for entry in verifier.verify_images(&files).await {
                println!(
                    "{:<10} {}  {}  {}",
                    entry.status,
                    entry.file,
                    entry.id.as_deref().unwrap_or("-"),
                    entry.reason
                );
            }
        }

        Commands::Hash { .. } | Commands::Place { .. } | Commands::Revoke { .. } => {
            bail!("command does not use a registry session")
        }
    }
    Ok(())
}

fn print_result(result: &VerificationResult) {
    let status = result.status();
    println!("{status}: {}", status.reason());
    if let Some(record) = result.record() {
        println!("  id:        {}", record.id);
        println!("  type:      {}", record.doc_type);
        println!("  issuer:    {}", record.issuer);
        if !record.title.is_empty() {
            println!("  title:     {}", record.title);
        }
        if !record.role_or_program.is_empty() {
            println!("  role:      {}", record.role_or_program);
        }
        if !record.id_number.is_empty() {
            println!("  id number: {}", record.id_number);
        }
        println!("  issued at: {}", format_unix(record.issued_at));
        if record.valid_until > 0 {
            println!("  valid to:  {}", format_unix(record.valid_until));
        }
        println!("  digest:    {}", record.file_digest);
    }
}

fn format_unix(secs: u64) -> String {
    chrono::DateTime::from_timestamp(secs as i64, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| secs.to_string())
}
