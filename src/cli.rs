use std::ffi::OsString;
use std::path::{Path, PathBuf};

use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::client::{BlobStoreClient, ContainerStatus};
use crate::config::Config;
use crate::error::{Error, Result};

const ENV_HELP: &str = "Environment variables required:\n  \
    - AZURE_STORAGE_ACCOUNT_NAME\n  \
    - AZURE_STORAGE_SAS_TOKEN";

/// Upload a local file to Azure Blob Storage using a SAS token.
#[derive(Debug, Parser)]
#[command(
    name = "azblob-upload",
    version,
    after_help = ENV_HELP,
    subcommand_negates_reqs = true,
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    /// Local file to upload.
    #[arg(required = true, value_name = "FILE_PATH")]
    pub file_path: Option<PathBuf>,

    /// Destination container; created if it does not exist.
    #[arg(required = true, value_name = "CONTAINER_NAME")]
    pub container_name: Option<String>,

    /// Destination blob name; may contain `/` separators.
    #[arg(required = true, value_name = "BLOB_NAME")]
    pub blob_name: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print all container names visible to the credential.
    ListContainers,
}

/// Parse the process arguments, run the requested flow, and return the
/// process exit code.
pub async fn run() -> i32 {
    init_tracing();
    run_with_args(std::env::args_os()).await
}

/// Same as [`run`] but with injectable arguments, for tests.
pub async fn run_with_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => {
            if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                let _ = err.print();
                return 0;
            }
            // Usage and the epilogue share stdout with the status lines.
            print!("{}", err.render());
            println!("{ENV_HELP}");
            return 1;
        }
    };

    let success = match cli.command {
        Some(Command::ListContainers) => list_containers().await,
        None => {
            let (Some(file_path), Some(container), Some(blob)) =
                (cli.file_path, cli.container_name, cli.blob_name)
            else {
                // clap enforces the positionals when no subcommand is given
                return 1;
            };
            // Checked before configuration resolution and any network I/O.
            if !file_path.exists() {
                println!("Error: {}", Error::FileNotFound { path: file_path });
                return 1;
            }
            upload_file(&file_path, &container, &blob).await
        }
    };

    i32::from(!success)
}

/// The upload flow: resolve configuration, ensure the container, send the
/// file. Returns the success boolean the entry point maps to an exit code.
async fn upload_file(file_path: &Path, container: &str, blob: &str) -> bool {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            println!("Error: {err}");
            return false;
        }
    };

    let result = match BlobStoreClient::from_config(&config) {
        Ok(client) => execute_upload(&client, file_path, container, blob).await,
        Err(err) => Err(err),
    };
    match result {
        Ok(()) => true,
        Err(err) => {
            println!("Error uploading to Azure Blob Storage: {err}");
            false
        }
    }
}

async fn execute_upload(
    client: &BlobStoreClient,
    file_path: &Path,
    container: &str,
    blob: &str,
) -> Result<()> {
    match client.ensure_container(container).await? {
        ContainerStatus::Created => {
            println!("Container '{container}' created successfully");
        }
        ContainerStatus::AlreadyExists => {
            println!("Container '{container}' already exists");
        }
    }

    // The file handle lives only for the read and is released on every path.
    let bytes = tokio::fs::read(file_path)
        .await
        .map_err(|source| Error::FileRead {
            path: file_path.to_owned(),
            source,
        })?;
    client.put_blob(container, blob, bytes).await?;

    println!("Successfully uploaded {} to {}", file_path.display(), blob);
    Ok(())
}

/// The diagnostic flow behind `list-containers`. Shares configuration
/// resolution and client construction with the upload flow but is never
/// invoked by it.
async fn list_containers() -> bool {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            println!("Error: {err}");
            return false;
        }
    };

    let result = match BlobStoreClient::from_config(&config) {
        Ok(client) => client.list_containers().await,
        Err(err) => Err(err),
    };
    match result {
        Ok(names) => {
            println!("Available containers:");
            for name in names {
                println!(" - {name}");
            }
            true
        }
        Err(err) => {
            println!("Error listing containers: {err}");
            false
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
