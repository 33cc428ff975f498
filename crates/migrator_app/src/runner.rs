use std::sync::Arc;

use anyhow::{Context, Result};
use engine_logging::{engine_info, engine_warn};
use migrator_core::{MigrationProgress, MigrationStatus};
use migrator_engine::{
    FetchSettings, FileAssetStore, FileContentStore, FileProgressStore, MigrationEngine,
    ProgressStore, ReqwestFetcher, PROGRESS_KEY,
};

use crate::config::AppConfig;

/// Wires the file-backed stores and the engine for the configured directories.
///
/// A stored run keeps the source mode it was started with, whatever the
/// current config says.
pub(crate) fn build_engine(config: &AppConfig) -> Result<MigrationEngine> {
    let store = Arc::new(FileProgressStore::new(config.state_dir.clone()));
    let mode = match store
        .get(PROGRESS_KEY)
        .context("failed to read migration progress")?
    {
        Some(existing) => existing.settings.source_mode,
        None => config.migration.source_mode,
    };

    let page_fetcher = Arc::new(ReqwestFetcher::new(FetchSettings::default()));
    let asset_fetcher = Arc::new(ReqwestFetcher::new(FetchSettings::for_assets()));
    let assets = FileAssetStore::open(
        config.asset_dir(),
        config.asset_base_url.clone(),
        asset_fetcher,
    )
    .context("failed to open asset index")?;
    let pages = FileContentStore::new(config.output_dir.clone());

    Ok(MigrationEngine::for_source(
        mode,
        store,
        Arc::new(pages),
        Arc::new(assets),
        page_fetcher,
    ))
}

/// Starts (or resumes) and advances batches until the run is no longer processing
/// or a whole batch fails.
pub(crate) async fn run_to_completion(
    engine: &MigrationEngine,
    config: &AppConfig,
) -> Result<MigrationProgress> {
    let mut progress = engine
        .start_migration(config.migration.clone())
        .await
        .context("failed to start migration")?;

    while progress.status == MigrationStatus::Processing {
        engine_info!(
            "{}/{} processed, {} pending",
            progress.processed,
            progress.total,
            progress.pending_ids.len()
        );
        match engine
            .process_next_batch()
            .await
            .context("failed to process batch")?
        {
            Some(next) => {
                let stalled = next.processed == progress.processed;
                progress = next;
                if stalled && progress.status == MigrationStatus::Processing {
                    engine_warn!(
                        "Batch made no progress ({} errors so far), pausing the run loop",
                        progress.errors.len()
                    );
                    break;
                }
            }
            None => {
                engine_warn!("Migration progress disappeared, stopping");
                break;
            }
        }
    }
    Ok(progress)
}
