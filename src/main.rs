//! drive_facade CLI - Upload files to a Drive folder and fetch them back.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use glob::glob;
use tokio::io::AsyncWriteExt;
use tracing_subscriber::EnvFilter;

use drive_facade::{
    extract_id, CredentialSource, DriveClient, DriveConfig, FieldFilter, GetOptions, Payload,
    ResponseType, Retrieved, DEFAULT_PARENT_ID,
};

/// CLI tool for uploading to and retrieving from a Google Drive folder.
#[derive(Parser)]
#[command(name = "drive_facade")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to service account JSON credentials file.
    #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS")]
    credentials: PathBuf,

    /// Folder that receives uploads.
    #[arg(long, env = "DRIVE_PARENT_ID", default_value = DEFAULT_PARENT_ID)]
    parent_id: String,

    /// Per-request timeout in seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload files and print their metadata.
    Upload {
        /// File patterns to upload (supports glob patterns like *.png).
        #[arg(required = true)]
        patterns: Vec<String>,

        /// Comma-separated fields to return, e.g. "name,size".
        #[arg(long)]
        fields: Option<String>,
    },

    /// Fetch metadata or content of an object.
    Get {
        /// Object URL or ID.
        object: String,

        /// Comma-separated fields to return.
        #[arg(long)]
        fields: Option<String>,

        /// Fetch raw content instead of metadata.
        #[arg(long)]
        media: bool,

        /// Response representation: json, arraybuffer, blob or stream.
        #[arg(long)]
        response_type: Option<ResponseType>,

        /// Write content to this path instead of stdout.
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();

    let mut config = DriveConfig::default().with_parent_id(cli.parent_id);
    if let Some(secs) = cli.timeout_secs {
        config = config.with_request_timeout(Duration::from_secs(secs));
    }

    let client = DriveClient::with_config(CredentialSource::Path(cli.credentials.clone()), config)
        .with_context(|| format!("Failed to load credentials from {:?}", cli.credentials))?;

    match cli.command {
        Commands::Upload { patterns, fields } => {
            let files = expand_patterns(&patterns)?;
            if files.is_empty() {
                anyhow::bail!("No files to upload");
            }

            for file_path in files {
                let payload = Payload::from_file(&file_path)
                    .await
                    .with_context(|| format!("Failed to open {:?}", file_path))?;

                match client
                    .upload(payload, fields.clone().map(FieldFilter::from))
                    .await
                {
                    Ok(stored) => println!("{}", serde_json::to_string_pretty(&stored)?),
                    Err(e) => eprintln!("Failed to upload {:?}: {}", file_path, e),
                }
            }
        }

        Commands::Get {
            object,
            fields,
            media,
            response_type,
            out,
        } => {
            let object_id = extract_id(&object)
                .with_context(|| format!("Invalid object URL or ID: {}", object))?;

            let mut options = if media { GetOptions::media() } else { GetOptions::new() };
            options.fields = fields;
            options.response_type = response_type;

            match client.get(&object_id, options).await {
                None => println!("null"),
                Some(Retrieved::Json(value)) => println!("{}", serde_json::to_string_pretty(&value)?),
                Some(Retrieved::Bytes(bytes)) => write_output(out, futures::stream::iter([Ok::<_, std::io::Error>(bytes)])).await?,
                Some(Retrieved::Stream(stream)) => write_output(out, stream).await?,
            }
        }
    }

    Ok(())
}

/// Expand glob patterns into a sorted, de-duplicated list of files.
fn expand_patterns(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let matches: Vec<PathBuf> = glob(pattern)
            .with_context(|| format!("Invalid glob pattern: {}", pattern))?
            .filter_map(|r| r.ok())
            .filter(|p| p.is_file())
            .collect();

        if matches.is_empty() {
            tracing::warn!(pattern = %pattern, "no files matched pattern");
        }
        files.extend(matches);
    }

    files.sort();
    files.dedup();
    Ok(files)
}

/// Copy content chunks to a file, or to stdout when no path is given.
async fn write_output<S>(out: Option<PathBuf>, mut stream: S) -> Result<()>
where
    S: futures::Stream<Item = std::io::Result<bytes::Bytes>> + Unpin,
{
    let mut writer: Box<dyn tokio::io::AsyncWrite + Unpin> = match &out {
        Some(path) => Box::new(
            tokio::fs::File::create(path)
                .await
                .with_context(|| format!("Failed to create {:?}", path))?,
        ),
        None => Box::new(tokio::io::stdout()),
    };

    while let Some(chunk) = stream.next().await {
        writer.write_all(&chunk?).await?;
    }
    writer.flush().await?;

    if let Some(path) = out {
        eprintln!("Saved to: {:?}", path);
    }
    Ok(())
}
