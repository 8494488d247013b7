//! Binary entry point for the upload CLI client.
//!
//! Wires the bootstrap layer's CLI/config/logging/shutdown machinery to
//! the `UploadManager` (C8), a `reqwest`-backed `RequestAdapter` (C6),
//! and a sqlite-backed `ProgressStore` (C5).

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use upload_bootstrap::config::LogLevel;
use upload_bootstrap::{bootstrap_cli, result_to_exit_code, ValidatedCommand};
use upload_domain::value_objects::file_info::FileInfo;
use upload_domain::UploadError;
use upload_engine::application::services::file_source::LocalFileSource;
use upload_engine::application::services::upload_task::UploadTaskOptions;
use upload_engine::application::{plugins::LoggerPlugin, UploadManager, UploadManagerOptions};
use upload_engine::infrastructure::adapters::reqwest_adapter::ReqwestAdapter;
use upload_engine::infrastructure::repositories::sqlite_progress_store::SqliteProgressStore;

const DEFAULT_PROGRESS_DB: &str = "upload-progress.db";

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

    result_to_exit_code(run(validated.command).await)
}

async fn run(command: ValidatedCommand) -> Result<(), UploadError> {
    match command {
        ValidatedCommand::Upload { input, server, chunk_size_mb, progress_db } => {
            upload(input, server, chunk_size_mb, progress_db).await
        }
        ValidatedCommand::Resume { task_id, input, server, progress_db } => {
            resume(task_id, input, server, progress_db).await
        }
        ValidatedCommand::ListTasks { progress_db } => list_tasks(progress_db).await,
        ValidatedCommand::Cancel { task_id, progress_db } => cancel(task_id, progress_db).await,
        ValidatedCommand::Serve { .. } => Err(UploadError::invalid_argument("upload-cli does not support the `serve` subcommand")),
    }
}

async fn build_manager(server: &str, progress_db: Option<PathBuf>) -> Result<UploadManager, UploadError> {
    let adapter: Arc<dyn upload_domain::RequestAdapter> = Arc::new(ReqwestAdapter::new(server)?);
    let db_path = progress_db.unwrap_or_else(|| PathBuf::from(DEFAULT_PROGRESS_DB));
    let database_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let progress_store: Arc<dyn upload_domain::ProgressStore> = Arc::new(SqliteProgressStore::connect(&database_url).await?);

    let manager = UploadManager::new(UploadManagerOptions { adapter, progress_store });
    manager.init().await?;
    manager.use_plugin(Arc::new(LoggerPlugin::default()));
    Ok(manager)
}

async fn upload(input: PathBuf, server: String, chunk_size_mb: Option<usize>, progress_db: Option<PathBuf>) -> Result<(), UploadError> {
    let manager = build_manager(&server, progress_db).await?;
    let file_info = file_info_for(&input).await?;
    let source = Arc::new(LocalFileSource::new(input));

    let options = UploadTaskOptions {
        preferred_chunk_size: chunk_size_mb.map(|mb| (mb * 1024 * 1024) as u64),
        ..Default::default()
    };

    let task = manager.create_task(file_info, source, options)?;
    task.start().await?;
    task.wait_for_terminal().await;

    match task.get_status() {
        upload_domain::value_objects::task_status::TaskStatus::Success => {
            tracing::info!(task_id = task.id(), "upload complete");
            Ok(())
        }
        status => Err(UploadError::internal(format!("upload ended in {status:?}"))),
    }
}

async fn resume(task_id: String, input: PathBuf, server: String, progress_db: Option<PathBuf>) -> Result<(), UploadError> {
    let manager = build_manager(&server, progress_db).await?;
    let file_info = file_info_for(&input).await?;
    let source = Arc::new(LocalFileSource::new(input));

    let task = manager.resume_task(&task_id, file_info, source, UploadTaskOptions::default()).await?;
    task.start().await?;
    task.wait_for_terminal().await;

    match task.get_status() {
        upload_domain::value_objects::task_status::TaskStatus::Success => Ok(()),
        status => Err(UploadError::internal(format!("resumed upload ended in {status:?}"))),
    }
}

async fn list_tasks(progress_db: Option<PathBuf>) -> Result<(), UploadError> {
    let db_path = progress_db.unwrap_or_else(|| PathBuf::from(DEFAULT_PROGRESS_DB));
    let database_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let store = SqliteProgressStore::connect(&database_url).await?;
    store.init().await?;

    let records = upload_domain::ProgressStore::get_all_records(&store).await?;
    if records.is_empty() {
        println!("no unfinished uploads");
    }
    for record in records {
        println!(
            "{}\t{}\t{} of {} chunks uploaded",
            record.task_id(),
            record.file_info().name(),
            record.uploaded_chunks().len(),
            record.file_info().size(),
        );
    }
    Ok(())
}

async fn cancel(task_id: String, progress_db: Option<PathBuf>) -> Result<(), UploadError> {
    let db_path = progress_db.unwrap_or_else(|| PathBuf::from(DEFAULT_PROGRESS_DB));
    let database_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let store = SqliteProgressStore::connect(&database_url).await?;
    store.init().await?;
    upload_domain::ProgressStore::delete_record(&store, &task_id).await?;
    println!("cancelled {task_id}");
    Ok(())
}

async fn file_info_for(path: &Path) -> Result<FileInfo, UploadError> {
    let metadata = tokio::fs::metadata(path).await?;
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| "unnamed".to_string());
    let mime_type = mime_guess_from_extension(path);
    let modified = metadata
        .modified()
        .ok()
        .and_then(|m| m.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0);
    FileInfo::new(name, metadata.len(), mime_type, modified)
}

/// A minimal extension-based MIME guess, matching the subset of types a
/// client typically encounters when picking a file to upload. Unknown
/// extensions fall back to `application/octet-stream`.
fn mime_guess_from_extension(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()) {
        Some(ext) if ext == "txt" => "text/plain",
        Some(ext) if ext == "json" => "application/json",
        Some(ext) if ext == "png" => "image/png",
        Some(ext) if ext == "jpg" || ext == "jpeg" => "image/jpeg",
        Some(ext) if ext == "pdf" => "application/pdf",
        Some(ext) if ext == "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}
