use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};
use zap_api::config::ServerConfig;
use zap_api::router::build_router;
use zap_api::state::{AppState, AppStateInner};
use zap_core::assets::ensure_buckets;
use zap_core::invites;
use zap_core::store::Store;
use zap_db::Database;
use zap_push::PushGateway;
use zap_storage::LocalBlobStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dailyzap=debug,zap_api=debug,tower_http=debug".into()),
        )
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {:#}", e);
            eprintln!("       Set it in your .env file and restart.");
            std::process::exit(1);
        }
    };
    let settings = config.settings()?;

    // Init database and blob storage
    let db: Arc<dyn Store> = Arc::new(Database::open(&config.db_path)?);
    let blobs = Arc::new(LocalBlobStore::new(
        config.storage_dir.clone(),
        &config.public_url,
        config.signing_key.as_bytes(),
    )?);
    ensure_buckets(blobs.as_ref())?;

    let server_invite = invites::ensure_server_invite(db.as_ref())?;
    if let Some(code) = &server_invite.code {
        info!("Server Invite Link: {}", invites::invite_url(&config.public_url, code));
    }

    let push = match &config.push_gateway_url {
        Some(url) => Some(PushGateway::new(url)?),
        None => {
            warn!("DAILYZAP_PUSH_GATEWAY_URL unset: notifications are stored only, moments are not synced");
            None
        }
    };

    // Background moment sync
    let sync_task = push.clone().map(|gateway| {
        tokio::spawn(zap_push::sync::run_sync_loop(
            db.clone(),
            gateway,
            config.moment_sync_secs,
        ))
    });

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let state: AppState = Arc::new(AppStateInner {
        store: db,
        blobs,
        push,
        settings,
        config,
    });
    let app = build_router(state);

    info!("DailyZap server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(task) = sync_task {
        task.abort();
    }
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
