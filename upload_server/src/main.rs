//! Binary entry point for the upload server.
//!
//! Wires the bootstrap layer's CLI/config/logging/shutdown machinery to
//! the axum HTTP surface and a filesystem `BlobStore` + sqlite
//! `MetadataStore` storage pair.

use std::process::ExitCode;
use std::sync::Arc;

use upload_bootstrap::config::LogLevel;
use upload_bootstrap::shutdown::ShutdownCoordinator;
use upload_bootstrap::{bootstrap_cli, result_to_exit_code, ValidatedCommand};
use upload_server::application::{UploadService, UploadServiceConfig};
use upload_server::infrastructure::blob_store::FilesystemBlobStore;
use upload_server::infrastructure::http::{router, AppState};
use upload_server::infrastructure::metadata_store::SqliteMetadataStore;

use upload_domain::UploadError;

#[tokio::main]
async fn main() -> ExitCode {
    upload_bootstrap::init_tracing(LogLevel::Info);

    let validated = match bootstrap_cli() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("CLI error: {}", e);
            return ExitCode::from(64);
        }
    };

    let ValidatedCommand::Serve {
        bind,
        data_dir,
        database_url,
    } = validated.command
    else {
        eprintln!("upload-server only supports the `serve` subcommand");
        return ExitCode::from(64);
    };

    result_to_exit_code(run(bind, data_dir, database_url).await)
}

async fn run(bind: String, data_dir: std::path::PathBuf, database_url: Option<String>) -> Result<(), UploadError> {
    let blob_store = Arc::new(FilesystemBlobStore::new(&data_dir));

    let database_url = database_url.unwrap_or_else(|| {
        format!("sqlite://{}/manifests.db?mode=rwc", data_dir.display())
    });
    let metadata_store = Arc::new(SqliteMetadataStore::connect(&database_url).await?);

    let service = Arc::new(UploadService::new(blob_store, metadata_store, UploadServiceConfig::default()));
    service.init().await?;

    let state = AppState::new(service);
    let app = router(state.clone());

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!("upload-server listening on {}", bind);

    let coordinator = ShutdownCoordinator::default();
    let shutdown_token = coordinator.token();
    let signal_handler = upload_bootstrap::signals::create_signal_handler();

    tokio::spawn({
        let coordinator = coordinator.clone();
        async move {
            signal_handler
                .wait_for_signal(Box::new(move || {
                    coordinator.initiate_shutdown();
                }))
                .await;
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_token.cancelled().await;
            state.draining.store(true, std::sync::atomic::Ordering::SeqCst);
        })
        .await?;

    coordinator.complete_shutdown();
    Ok(())
}
