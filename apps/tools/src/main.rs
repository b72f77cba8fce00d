use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::{Parser, Subcommand};
use client_core::{default_state_path, CompletionFlag, FileKeyValueStore};
use server_api::{delete_all_photos, list_photos, ApiContext};
use storage::Storage;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://./data/blobs.db")]
    database_url: String,
    #[arg(long, env = "PUBLIC_BASE_URL", default_value = "http://127.0.0.1:3000")]
    public_base_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clears the local completion flag so the riddles start over.
    ResetFlag {
        #[arg(long)]
        state_file: Option<PathBuf>,
    },
    ListPhotos,
    DeletePhotos,
}

async fn open_store(cli: &Cli) -> Result<ApiContext> {
    let storage = Storage::new(&cli.database_url, &cli.public_base_url).await?;
    Ok(ApiContext::new(Arc::new(storage)))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();
    let cli = Cli::parse();

    match &cli.command {
        Command::ResetFlag { state_file } => {
            let path = state_file.clone().unwrap_or_else(default_state_path);
            CompletionFlag::new(FileKeyValueStore::new(&path)).reset()?;
            println!("cleared completion flag in {}", path.display());
        }
        Command::ListPhotos => {
            let ctx = open_store(&cli).await?;
            let photos = list_photos(&ctx).await?;
            for photo in &photos {
                println!("{}  {}", photo.uploaded_at.to_rfc3339(), photo.url);
            }
            println!("{} photos", photos.len());
        }
        Command::DeletePhotos => {
            let ctx = open_store(&cli).await?;
            let outcome = delete_all_photos(&ctx).await?;
            println!("{}", outcome.message);
        }
    }

    Ok(())
}
