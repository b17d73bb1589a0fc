use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use upload_tracker::config::{StorageConfig, UploadConfig};
use upload_tracker::infrastructure::storage;
use upload_tracker::services::worker::StaleUploadSweeper;
use upload_tracker::utils::validation::file_extension;
use upload_tracker::{Acl, InMemoryUploadStore, UploadService};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Local file to upload
    file: PathBuf,

    /// Destination object key (defaults to the file name)
    #[arg(short, long)]
    key: Option<String>,

    /// Part size in bytes (overrides UPLOAD_PART_SIZE)
    #[arg(long)]
    part_size: Option<usize>,

    /// Parts uploaded in parallel (overrides UPLOAD_CONCURRENCY)
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Content type stored with the object
    #[arg(long, default_value = "application/octet-stream")]
    content_type: String,

    /// Make the object publicly readable
    #[arg(long)]
    public: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "upload_tracker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let storage_config = StorageConfig::from_env();
    let mut upload_config = UploadConfig::from_env();
    if let Some(part_size) = args.part_size {
        upload_config.part_size = part_size;
    }
    if let Some(concurrency) = args.concurrency {
        upload_config.concurrency = concurrency.max(1);
    }

    let key = match args.key {
        Some(key) => key,
        None => args
            .file
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .context("cannot derive an object key from the file path, pass --key")?,
    };

    info!(
        "🚀 Preparing {} (.{}) as '{}' with {} parallel parts",
        args.file.display(),
        file_extension(&key),
        key,
        upload_config.concurrency
    );

    let object_store = storage::setup_storage(&storage_config).await;
    let store = Arc::new(InMemoryUploadStore::new());
    let sweeper_enabled = upload_config.sweeper_enabled();
    let stale_after = Duration::from_secs(upload_config.stale_after_secs);
    let sweep_interval = Duration::from_secs(upload_config.sweep_interval_secs);
    let service = Arc::new(UploadService::new(
        store.clone(),
        object_store,
        upload_config,
    ));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let sweeper = if sweeper_enabled {
        let sweeper = StaleUploadSweeper::new(
            store,
            service.clone(),
            stale_after,
            sweep_interval,
            shutdown_rx,
        )
        .context("invalid stale upload sweeper settings")?;
        Some(tokio::spawn(sweeper.run()))
    } else {
        None
    };

    let acl = if args.public { Acl::Public } else { Acl::Private };
    let result = service
        .upload_path(&args.file, &key, &args.content_type, acl)
        .await;

    let _ = shutdown_tx.send(true);
    if let Some(handle) = sweeper {
        let _ = handle.await;
    }

    let url = result.with_context(|| format!("upload of '{}' failed", key))?;
    info!("✅ Upload complete");
    println!("{}", url);
    Ok(())
}
