use anyhow::{bail, Context};
use clap::Parser;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use uuid::Uuid;

use gallery_uploader::coordinator::UploadEvent;
use gallery_uploader::{config, FileImageSource, HttpTransport, UploadCoordinator, UploadSession};

/// Upload a batch of captured photos to a repository container, one at a
/// time, with retry on transient failures.
#[derive(Parser, Debug)]
#[command(name = "gallery-uploader", version, about)]
struct Args {
    /// Image files to upload, in order
    #[arg(required = true)]
    files: Vec<String>,

    /// Upload endpoint URL
    #[arg(long)]
    endpoint: String,

    /// Target container (folder) name; defaults to the configured one
    #[arg(long)]
    container: Option<String>,

    /// Base name for uploaded files ("name-1.jpg", "name-2.jpg", ...)
    #[arg(long, default_value = "")]
    name: String,

    /// Allow uploading over a metered connection without confirmation
    #[arg(long)]
    allow_cellular: bool,

    /// Answer yes to all confirmation prompts
    #[arg(long, short = 'y')]
    assume_yes: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let cfg = config::load_config().context("failed to load configuration")?;

    env_logger::Builder::from_default_env()
        .filter_level(cfg.log_level.parse().unwrap_or(log::LevelFilter::Info))
        .init();

    log::info!("Starting gallery uploader");

    let container = args
        .container
        .clone()
        .unwrap_or_else(|| cfg.default_container.clone());

    let mut session = UploadSession::new(args.files.clone(), &container, &args.name, &cfg)
        .context("failed to build upload session")?;
    session.allow_cellular = args.allow_cellular || cfg.allow_cellular_uploads;

    if session.needs_cellular_confirmation(&cfg) && !args.assume_yes {
        eprint!("Uploads over cellular data may incur charges. Continue? [y/N] ");
        std::io::stderr().flush().ok();
        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer)?;
        if !matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
            bail!("upload cancelled");
        }
    }

    let source = Arc::new(FileImageSource::new(cfg.max_file_size_mb));
    let transport = Arc::new(HttpTransport::new(
        &args.endpoint,
        cfg.request_timeout_secs,
        cfg.rate_limit_delay_ms,
    )?);

    let coordinator = UploadCoordinator::new(source, transport, cfg.clone());
    let mut handle = coordinator.start(session)?;

    let canceller = handle.canceller();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Interrupt received, cancelling session");
            canceller.cancel();
        }
    });

    let mut attempts: HashMap<Uuid, u32> = HashMap::new();
    let total = handle.progress().map(|p| p.total_items).unwrap_or(0);

    let mut finished = false;
    while let Some(event) = handle.next_event().await {
        match event {
            UploadEvent::Progress { item_id, fraction } => {
                log::debug!("{}: {:.0}%", item_id, fraction * 100.0);
            }
            UploadEvent::Succeeded { item_id } => {
                let done = handle.progress().map(|p| p.completed).unwrap_or(0);
                println!("Uploaded {} ({}/{})", item_id, done, total);
            }
            UploadEvent::Failed { item_id, cause } => {
                eprintln!("Failed {}: {}", item_id, cause);
            }
            UploadEvent::RetryAvailable { item_id } => {
                let count = attempts.entry(item_id).or_insert(0);
                *count += 1;
                if *count > cfg.max_retry_attempts {
                    eprintln!(
                        "Giving up on {} after {} attempts",
                        item_id, cfg.max_retry_attempts
                    );
                    handle.cancel();
                } else {
                    log::info!("Retrying {} (attempt {})", item_id, count);
                    handle.resume();
                }
            }
            UploadEvent::Cancelled => {
                bail!("upload session cancelled");
            }
            UploadEvent::Finished { documents } => {
                println!("Finished: {} documents uploaded", documents.len());
                for doc in documents {
                    println!("  {} -> {}/{}", doc.document_id, doc.container, doc.name);
                }
                finished = true;
                break;
            }
        }
    }

    if !finished {
        // Channel closed without reaching the finish event: session failed
        bail!("upload session failed; see log for details");
    }

    handle.wait().await;
    Ok(())
}
