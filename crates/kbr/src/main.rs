//! `kbr`: CLI and HTTP server for Keycloak configuration backup/restore.
//!
//! Wires the config loader to `SnapshotManager` and either dispatches one
//! CLI subcommand or starts the `axum` server.

mod cli;
mod config;

use std::sync::Arc;

use clap::Parser;
use kbr_client::ApiClient;
use kbr_reconcile::build_registry;
use kbr_snapshot::{RestoreOutcome, ServiceHandle, SnapshotManager};
use kbr_storage::{LocalBackend, S3Backend, StorageBackend};
use tokio_util::sync::CancellationToken;
use tracing::info;

use cli::{Cli, Command};
use config::{ConfigTree, StorageConfig};

async fn build_storage_backend(tree: &ConfigTree) -> anyhow::Result<(Arc<dyn StorageBackend>, String)> {
    match tree.storage.as_ref() {
        Some(StorageConfig::Local { local }) => {
            let backend: Arc<dyn StorageBackend> = Arc::new(LocalBackend::new(local.base_dir.clone()));
            Ok((backend, "backups".to_string()))
        }
        Some(StorageConfig::S3{ s3 }) => {
            let sdk_config = match (&s3.aws_access_key_id, &s3.aws_secret_access_key) {
                (Some(key), Some(secret)) => {
                    let credentials = aws_credential_types::Credentials::new(
                        key.as_str(),
                        secret.as_str(),
                        None,
                        None,
                        "kbr-config",
                    );
                    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
                        .credentials_provider(credentials);
                    if let Some(region) = &s3.region {
                        loader = loader.region(aws_config::Region::new(region.clone()));
                    }
                    loader.load().await
                }
                _ => S3Backend::load_sdk_config(s3.region.as_deref()).await,
            };
            let backend: Arc<dyn StorageBackend> = Arc::new(S3Backend::from_sdk_config(&sdk_config));
            Ok((backend, s3.bucket.clone()))
        }
        None => anyhow::bail!("configuration is missing a 'storage' section"),
    }
}

fn build_services(tree: &ConfigTree) -> anyhow::Result<Vec<ServiceHandle>> {
    if tree.services.is_empty() {
        anyhow::bail!("configuration declares no services (expected at least 'keycloak')");
    }

    let mut services = Vec::with_capacity(tree.services.len());
    for (name, service_config) in &tree.services {
        let client = ApiClient::new(service_config.auth.clone())?;
        let registry = build_registry()?;
        services.push(ServiceHandle {
            name: name.clone(),
            service_type: service_config.service_type.clone(),
            version: service_config.version.clone(),
            priority: service_config.priority,
            client: Arc::new(client),
            registry: Arc::new(registry),
        });
    }
    Ok(services)
}

async fn build_manager(cli: &Cli) -> anyhow::Result<Arc<SnapshotManager>> {
    let mut tree = config::load(&cli.config_dir)?;
    config::apply_env_overrides(&mut tree);

    let (backend, bucket) = build_storage_backend(&tree).await?;
    let services = build_services(&tree)?;

    Ok(Arc::new(SnapshotManager::new(backend, bucket, services)))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    kbr_rest::init_logging(&cli.log_level);

    let manager = build_manager(&cli).await?;

    // Ctrl-C cancels the in-flight one-shot operation rather than killing
    // the process outright: export/import loops check this token between
    // items and unwind cleanly, and the scoped staging directory is removed
    // on drop regardless.
    let cancellation = CancellationToken::new();
    {
        let cancellation = cancellation.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancellation.cancel();
            }
        });
    }

    match &cli.command {
        Command::Backup {
            service,
            description,
            compress,
            no_archive,
        } => {
            let result = manager
                .backup(service.as_deref(), description.clone(), *compress, !no_archive, &cancellation)
                .await?;
            info!(snapshot_id = %result.snapshot_id, degraded = result.degraded, "backup complete");
            print_json(&result)?;
        }
        Command::Restore { snapshot_id, service } => {
            let id = kbr_core::SnapshotId::from_str_unchecked(snapshot_id.clone());
            match manager.restore(&id, service.as_deref(), false, &cancellation).await? {
                RestoreOutcome::Applied(reports) => print_json(&reports)?,
                RestoreOutcome::Planned(_) => unreachable!("plan=false never yields a plan"),
            }
        }
        Command::Plan { snapshot_id, service } => {
            let id = kbr_core::SnapshotId::from_str_unchecked(snapshot_id.clone());
            match manager.restore(&id, service.as_deref(), true, &cancellation).await? {
                RestoreOutcome::Planned(plans) => print_json(&plans)?,
                RestoreOutcome::Applied(_) => unreachable!("plan=true never yields applied reports"),
            }
        }
        Command::List => {
            let summaries = manager.list().await?;
            print_json(&summaries)?;
        }
        Command::Info { snapshot_id } => {
            let id = kbr_core::SnapshotId::from_str_unchecked(snapshot_id.clone());
            let manifest = manager.info(&id).await?;
            print_json(&manifest)?;
        }
        Command::Serve => {
            let app = kbr_rest::create_app(manager, std::time::Duration::from_secs(cli.request_timeout));
            let addr = format!("0.0.0.0:{}", cli.port);
            info!(%addr, "kbr HTTP server listening");
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
