use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;

use pim_asset_sync::config;
use pim_asset_sync::db::{self, QueueCriteria, QueueStore};
use pim_asset_sync::model::{QueueKind, QueueStatus};

#[derive(Debug, Parser)]
#[command(author, version, about = "Show queue entry counts and list entries by status")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Only list entries in this status (pending, processing, done, error)
    #[arg(long)]
    status: Option<String>,

    /// Only list entries of this kind (asset, product)
    #[arg(long)]
    kind: Option<String>,

    /// Maximum number of entries to list
    #[arg(long, default_value = "50")]
    limit: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let pool = db::init_pool(&cfg.database_url()).await?;
    db::run_migrations(&pool).await?;
    let store = QueueStore::new(pool);

    println!("{:<8} {:<11} {:>8}", "KIND", "STATUS", "COUNT");
    for row in store.count_by_status().await? {
        println!(
            "{:<8} {:<11} {:>8}",
            row.kind.as_str(),
            row.status.as_str(),
            row.count
        );
    }

    let Some(status) = args.status.as_deref() else {
        return Ok(());
    };
    let status = QueueStatus::parse_status(status)
        .ok_or_else(|| anyhow!("unknown status '{}'", status))?;
    let kind = args
        .kind
        .as_deref()
        .map(|k| QueueKind::parse_kind(k).ok_or_else(|| anyhow!("unknown kind '{}'", k)))
        .transpose()?;

    let criteria = QueueCriteria {
        kind,
        limit: Some(args.limit),
        ..QueueCriteria::with_status(status)
    };

    println!();
    for entry in store.find(&criteria).await? {
        println!(
            "#{} {} {} target={} store={} type={} value={} asset_id={} claimed_by={} error={}",
            entry.id.unwrap_or_default(),
            entry.kind.as_str(),
            entry.action.as_str(),
            entry.target_entity_id,
            entry.store_view_id,
            entry.type_metadata,
            entry.value.as_deref().unwrap_or("-"),
            entry.asset_id,
            entry.claimed_by.as_deref().unwrap_or("-"),
            entry.error_message.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}
