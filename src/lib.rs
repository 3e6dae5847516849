// Queueboard - playback queues and local folder trees
// Module declarations
pub mod catalog;
pub mod db;
pub mod error;
pub mod library;
pub mod metadata;
pub mod queue;
pub mod settings;
pub mod source;
pub mod state;

use std::path::PathBuf;
use tracing::{info, warn};

use db::connection::DatabaseConnection;
use library::LibraryScanner;
use settings::AppSettings;
use state::AppState;

fn init_tracing() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("queueboard_lib=info".parse()?),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {e}"))
}

/// Restore queues, scan the library and report what was found.
///
/// The first command-line argument, when present, is scanned in addition to
/// the configured library paths.
pub async fn run() -> Result<(), anyhow::Error> {
    init_tracing()?;

    let app_dir = AppSettings::default_app_dir();
    let settings = AppSettings::load(&app_dir)?;
    let db = DatabaseConnection::new(app_dir.join("queueboard.db"))?;
    let state = AppState::new(db, settings, app_dir)?;

    let mut scan_paths: Vec<PathBuf> = state
        .settings
        .library
        .scan_paths
        .iter()
        .map(PathBuf::from)
        .collect();
    scan_paths.extend(std::env::args().nth(1).map(PathBuf::from));

    if scan_paths.is_empty() {
        info!("no library paths configured");
    } else {
        let (tree, result) = tokio::task::spawn_blocking(move || {
            LibraryScanner::scan_directories(&scan_paths, |_| {})
        })
        .await?;

        if result.failed > 0 {
            warn!("{} of {} files could not be scanned", result.failed, result.total_files);
        }
        let folders = state.install_tree(tree);
        info!("scanned {} songs into {} folders", result.successful, folders);
    }

    let mut board = state.board.lock().await;
    match board.current_queue() {
        Some(current) => info!(
            "{} stored queues, resuming \"{}\" at song {}",
            board.len(),
            current.title,
            current.queue_pos
        ),
        None => info!("no stored queues"),
    }
    board.flush().await;

    Ok(())
}
