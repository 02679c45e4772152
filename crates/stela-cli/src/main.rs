use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

use stela_core::{ClientIdentity, CommitCandidate};

/// Stela CLI - keys, mining, and submission for the commit ledger
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new signing keypair
    Keygen {
        /// Write the keypair to this file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        out: Option<PathBuf>,
    },

    /// Search a satisfying nonce, sign, and print the candidate commit
    Mine {
        #[command(flatten)]
        commit: CommitArgs,
    },

    /// Mine a candidate and submit it to a gateway
    Submit {
        /// Gateway base URL
        #[arg(long, default_value = "http://127.0.0.1:4000")]
        server: String,

        #[command(flatten)]
        commit: CommitArgs,
    },

    /// Show ledger statistics from a gateway
    Info {
        /// Gateway base URL
        #[arg(long, default_value = "http://127.0.0.1:4000")]
        server: String,
    },
}

#[derive(clap::Args)]
struct CommitArgs {
    /// Path to a keypair file produced by `stela keygen`
    #[arg(short, long, value_name = "FILE")]
    key: PathBuf,

    /// Record kind
    #[arg(short = 't', long = "type", value_name = "TYPE", default_value = "post")]
    kind: String,

    /// Payload as a JSON value
    #[arg(short, long, value_name = "JSON")]
    data: Option<String>,

    /// Signature of the post this commit replies to
    #[arg(long, value_name = "SIGNATURE")]
    parent: Option<String>,

    /// Proof-of-work difficulty to mine for
    #[arg(long, default_value = "3")]
    difficulty: u32,

    /// Stamp the candidate with the current time as its declared commitAt
    #[arg(long)]
    timestamp: bool,
}

/// On-disk keypair format
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyFile {
    secret_key: String,
    public_key: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Keygen { out } => {
            let identity = ClientIdentity::generate();
            let keyfile = KeyFile {
                secret_key: identity.secret_hex(),
                public_key: identity.public_key_hex.clone(),
            };
            let content = serde_json::to_string_pretty(&keyfile)?;

            match out {
                Some(path) => {
                    std::fs::write(&path, content)?;
                    println!("Keypair written to {}", path.display());
                    println!("Public key: {}", identity.public_key_hex);
                }
                None => println!("{content}"),
            }
        }

        Commands::Mine { commit } => {
            let candidate = mine(&commit)?;
            println!("{}", serde_json::to_string_pretty(&candidate)?);
        }

        Commands::Submit { server, commit } => {
            let candidate = mine(&commit)?;
            println!("Submitting nonce {} to {server}", candidate.nonce);

            let response = reqwest::Client::new()
                .post(format!("{server}/commits"))
                .json(&candidate)
                .send()
                .await
                .context("gateway unreachable")?;

            let status = response.status();
            let body = response.text().await?;
            if !status.is_success() {
                bail!("gateway rejected the commit ({status}): {body}");
            }
            println!("Accepted:");
            println!("{body}");
        }

        Commands::Info { server } => {
            let response = reqwest::Client::new()
                .get(format!("{server}/info"))
                .send()
                .await
                .context("gateway unreachable")?;
            let info: Value = response.json().await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
    }

    Ok(())
}

fn load_identity(path: &PathBuf) -> anyhow::Result<ClientIdentity> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading key file {}", path.display()))?;
    let keyfile: KeyFile = serde_json::from_str(&content).context("parsing key file")?;
    let identity = ClientIdentity::from_secret_hex(&keyfile.secret_key)
        .context("key file does not contain a valid secret key")?;
    if identity.public_key_hex != keyfile.public_key {
        bail!("key file public key does not match its secret key");
    }
    Ok(identity)
}

fn mine(args: &CommitArgs) -> anyhow::Result<CommitCandidate> {
    let identity = load_identity(&args.key)?;
    let data = build_data(args)?;
    let commit_at = args.timestamp.then(chrono::Utc::now);

    let candidate = identity.create_commit(data, &args.kind, commit_at, args.difficulty)?;
    Ok(candidate)
}

fn build_data(args: &CommitArgs) -> anyhow::Result<Option<Value>> {
    let mut data = match &args.data {
        Some(text) => Some(serde_json::from_str(text).context("--data must be valid JSON")?),
        None => None,
    };

    if let Some(parent) = &args.parent {
        let object = data.get_or_insert_with(|| Value::Object(Default::default()));
        match object.as_object_mut() {
            Some(map) => {
                map.insert("signature".to_string(), Value::String(parent.clone()));
            }
            None => bail!("--parent requires --data to be a JSON object"),
        }
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit_args(data: Option<&str>, parent: Option<&str>) -> CommitArgs {
        CommitArgs {
            key: PathBuf::from("unused"),
            kind: "post".to_string(),
            data: data.map(String::from),
            parent: parent.map(String::from),
            difficulty: 0,
            timestamp: false,
        }
    }

    #[test]
    fn parent_is_woven_into_the_data_object() {
        let data = build_data(&commit_args(Some(r#"{"message":"hi"}"#), Some("sig-1")))
            .unwrap()
            .unwrap();
        assert_eq!(data["message"], "hi");
        assert_eq!(data["signature"], "sig-1");
    }

    #[test]
    fn parent_alone_creates_the_data_object() {
        let data = build_data(&commit_args(None, Some("sig-1"))).unwrap().unwrap();
        assert_eq!(data["signature"], "sig-1");
    }

    #[test]
    fn parent_on_non_object_data_is_an_error() {
        assert!(build_data(&commit_args(Some("[1,2]"), Some("sig-1"))).is_err());
    }

    #[test]
    fn missing_data_stays_absent() {
        assert!(build_data(&commit_args(None, None)).unwrap().is_none());
    }
}
