use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ledger_seal::hash::parse_hash;
use ledger_seal::{
    verify_proof, JsonlRootStore, MerkleProof, PublicKeyVerifier, SealConfig, SignatureVerifier,
    SoftwareSigner,
};

#[derive(Parser)]
#[command(name = "ledger-seal", version, about = "Verify sealed ledger batches")]
struct Cli {
    /// Configuration file (TOML); LEDGER_SEAL__* variables override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the signing public key as PEM
    PublicKey {
        /// Private key file; defaults to signer.key_path from the configuration
        #[arg(short, long)]
        key: Option<PathBuf>,
        /// Environment variable holding the key passphrase
        #[arg(long)]
        passphrase_env: Option<String>,
    },
    /// Check that a leaf is included under a root
    VerifyProof {
        /// Proof JSON file
        #[arg(short, long)]
        proof: PathBuf,
        /// Leaf data (the event hash) as hex
        #[arg(long)]
        leaf_hex: String,
        /// Expected Merkle root as hex
        #[arg(short, long)]
        root: String,
    },
    /// Check a root signature against a public key
    VerifySignature {
        /// PEM public key file
        #[arg(long)]
        public_key: PathBuf,
        #[arg(short, long)]
        root: String,
        /// DER signature as hex
        #[arg(short, long)]
        signature: String,
    },
    /// Check every record in a signed root log
    VerifyLog {
        #[arg(long)]
        public_key: PathBuf,
        #[arg(short, long)]
        log: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ledger_seal=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<bool> {
    match cli.command {
        Command::PublicKey {
            key,
            passphrase_env,
        } => {
            let mut config = SealConfig::load(cli.config.as_deref())?;
            if let Some(var) = passphrase_env {
                config.signer.passphrase_env = var;
            }
            let signer = match key {
                Some(path) => {
                    SoftwareSigner::from_key_file(&path, config.passphrase().as_deref())?
                }
                None => config.build_signer()?,
            };
            print!("{}", signer.get_public_key()?);
            Ok(true)
        }
        Command::VerifyProof {
            proof,
            leaf_hex,
            root,
        } => {
            let contents = std::fs::read_to_string(&proof)
                .with_context(|| format!("Failed to read proof {:?}", proof))?;
            let proof: MerkleProof =
                serde_json::from_str(&contents).context("Failed to parse proof JSON")?;
            let leaf_data = hex::decode(leaf_hex.trim()).context("Leaf is not valid hex")?;
            let expected_root = parse_hash(&root)?;
            info!("{}", proof.summary());

            let verified = verify_proof(&leaf_data, &proof, &expected_root)?;
            if verified {
                println!("verified: leaf {} is included under root {}", proof.leaf_index, root);
            } else {
                println!(
                    "NOT verified: leaf {} ({}) does not reproduce root {}",
                    proof.leaf_index,
                    hex::encode(proof.leaf_hash),
                    root
                );
            }
            Ok(verified)
        }
        Command::VerifySignature {
            public_key,
            root,
            signature,
        } => {
            let verifier = load_verifier(&public_key)?;
            let root_bytes = hex::decode(root.trim()).context("Root is not valid hex")?;
            let signature = hex::decode(signature.trim()).context("Signature is not valid hex")?;

            let verified = verifier.verify_signature(&root_bytes, &signature);
            if verified {
                println!("verified: signature over root {} is valid", root);
            } else {
                println!("NOT verified: signature over root {} is invalid", root);
            }
            Ok(verified)
        }
        Command::VerifyLog { public_key, log } => {
            let verifier = load_verifier(&public_key)?;
            if !log.exists() {
                return Err(anyhow!("Signed root log not found: {:?}", log));
            }
            let store = JsonlRootStore::open(&log)?;
            let records = store.load_all()?;
            info!(
                "Verifying {} signed roots from {:?}",
                records.len(),
                store.path()
            );

            let mut failures = 0usize;
            for record in &records {
                if !record.verify_with(&verifier) {
                    failures += 1;
                    warn!("Signature mismatch: {}", record.summary());
                    println!(
                        "NOT verified: record {} (batch {}, events {}..={})",
                        record.id, record.batch_id, record.first_event_id, record.last_event_id
                    );
                }
            }

            println!(
                "{} of {} signed roots verified",
                records.len() - failures,
                records.len()
            );
            Ok(failures == 0)
        }
    }
}

fn load_verifier(path: &Path) -> Result<PublicKeyVerifier> {
    let pem = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read public key {:?}", path))?;
    Ok(PublicKeyVerifier::from_public_key_pem(&pem)?)
}
