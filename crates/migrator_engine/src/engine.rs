use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_debug, engine_error, engine_info, engine_warn, ItemScope};
use migrator_core::{
    page_title, MigrationProgress, MigrationSettings, MigrationStatus, RecordId, SourceMode,
};

use crate::assets::AssetStore;
use crate::content_store::ContentStore;
use crate::discover::Discoverer;
use crate::fetch::Fetcher;
use crate::files::{FileContentFetcher, FileSystemDiscoverer};
use crate::progress_store::ProgressStore;
use crate::scrape::HttpContentFetcher;
use crate::sitemap::SitemapDiscoverer;
use crate::source::{ContentFetcher, ItemRequest};
use crate::MigrationError;

/// Store key of the single progress record.
pub const PROGRESS_KEY: &str = "wiki_migration_progress";
/// Idle lifetime of the progress record; every write renews it.
pub const PROGRESS_TTL: Duration = Duration::from_secs(60 * 60);

/// Attempts per item within one batch and the fixed pause between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub pause: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            pause: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interruption {
    None,
    Stopped,
    Reset,
}

/// Drives a migration run in resumable batches.
///
/// All state lives in the progress record; the engine itself holds only its
/// collaborators, so any invocation may pick up where the previous one stopped.
pub struct MigrationEngine {
    store: Arc<dyn ProgressStore>,
    discoverer: Arc<dyn Discoverer>,
    fetcher: Arc<dyn ContentFetcher>,
    content_store: Arc<dyn ContentStore>,
    retry: RetryPolicy,
}

impl MigrationEngine {
    pub fn new(
        store: Arc<dyn ProgressStore>,
        discoverer: Arc<dyn Discoverer>,
        fetcher: Arc<dyn ContentFetcher>,
        content_store: Arc<dyn ContentStore>,
    ) -> Self {
        Self {
            store,
            discoverer,
            fetcher,
            content_store,
            retry: RetryPolicy::default(),
        }
    }

    /// Engine wired with the discoverer and content fetcher for `mode`.
    pub fn for_source(
        mode: SourceMode,
        store: Arc<dyn ProgressStore>,
        content_store: Arc<dyn ContentStore>,
        assets: Arc<dyn AssetStore>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        match mode {
            SourceMode::Http => Self::new(
                store,
                Arc::new(SitemapDiscoverer::new(fetcher.clone())),
                Arc::new(HttpContentFetcher::new(fetcher, assets)),
                content_store,
            ),
            SourceMode::Files => Self::new(
                store,
                Arc::new(FileSystemDiscoverer),
                Arc::new(FileContentFetcher::default()),
                content_store,
            ),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn get_progress(&self) -> Result<Option<MigrationProgress>, MigrationError> {
        Ok(self.store.get(PROGRESS_KEY)?)
    }

    fn save(&self, progress: &MigrationProgress) -> Result<(), MigrationError> {
        self.store.set(PROGRESS_KEY, progress, PROGRESS_TTL)?;
        Ok(())
    }

    /// Creates or resumes the run, discovers pages on first use and runs one batch.
    ///
    /// `settings` only seed a new record; an existing record keeps its snapshot.
    pub async fn start_migration(
        &self,
        settings: MigrationSettings,
    ) -> Result<MigrationProgress, MigrationError> {
        let mut progress = match self.store.get(PROGRESS_KEY)? {
            Some(existing) => {
                engine_info!(
                    "Resuming migration ({}): {}/{} processed",
                    existing.status,
                    existing.processed,
                    existing.total
                );
                existing
            }
            None => {
                settings.validate()?;
                let settings = settings.sanitized();
                engine_info!(
                    "Starting {} migration from {}",
                    settings.source_mode,
                    settings.base_url
                );
                let fresh = MigrationProgress::new(settings);
                self.save(&fresh)?;
                fresh
            }
        };

        if progress.status == MigrationStatus::Initializing {
            match self.discoverer.discover(&progress.settings).await {
                Ok(discovery) => {
                    engine_info!("Discovered {} pages", discovery.len());
                    progress.apply_discovery(discovery.identifiers, discovery.source_locations);
                }
                Err(err) => {
                    engine_error!("Discovery failed: {}", err);
                    progress.fail_discovery(err.to_string());
                    self.save(&progress)?;
                    return Ok(progress);
                }
            }
            self.save(&progress)?;
        }

        self.process_next_batch().await?;
        Ok(self.store.get(PROGRESS_KEY)?.unwrap_or(progress))
    }

    /// Runs one batch of up to `batch_size` pending items.
    ///
    /// Returns the record as persisted, or `None` when no run exists. Runs that
    /// are still initializing or already terminal are left untouched.
    pub async fn process_next_batch(&self) -> Result<Option<MigrationProgress>, MigrationError> {
        let Some(mut progress) = self.store.get(PROGRESS_KEY)? else {
            engine_warn!("No migration in progress, nothing to process");
            return Ok(None);
        };

        match progress.status {
            MigrationStatus::Processing | MigrationStatus::Stopped => {}
            status => {
                engine_info!("Migration is {}, skipping batch", status);
                return Ok(Some(progress));
            }
        }

        if progress.pending_ids.is_empty() {
            progress.transition(MigrationStatus::Complete);
            self.save(&progress)?;
            engine_info!("Migration complete: {} pages", progress.processed);
            return Ok(Some(progress));
        }

        progress.transition(MigrationStatus::Processing);
        self.save(&progress)?;
        let batch_size = progress.settings.effective_batch_size();
        let delay = progress.settings.effective_request_delay();
        let batch = progress.next_batch(batch_size);
        engine_info!(
            "Processing batch of {} ({} pending)",
            batch.len(),
            progress.pending_ids.len()
        );

        for identifier in batch {
            if progress.is_processed(&identifier) {
                engine_debug!("Skipping already processed {}", identifier);
                continue;
            }
            let _scope = ItemScope::enter(&identifier);
            tokio::time::sleep(delay).await;
            progress.current_item = identifier.clone();

            match self.process_with_retry(&progress, &identifier).await {
                Ok(record) => {
                    engine_info!("Migrated as {}", record);
                    progress.mark_processed(&identifier, record);
                }
                Err(err) => {
                    let message = format!(
                        "Failed to process after {} attempts: {} ({})",
                        self.retry.attempts, identifier, err
                    );
                    engine_error!("{}", message);
                    progress.requeue_front(&identifier);
                    progress.record_error(message);
                }
            }
            let interruption = self.interruption();
            if interruption == Interruption::Reset {
                engine_info!("Migration reset during batch, dropping in-flight state");
                return Ok(None);
            }
            if interruption == Interruption::Stopped
                && progress.status != MigrationStatus::Stopped
                && progress.transition(MigrationStatus::Stopped)
            {
                engine_info!("Stop requested, finishing the current batch");
            }
            self.save(&progress)?;
        }

        if progress.status == MigrationStatus::Stopped {
            if progress.pending_ids.is_empty() {
                progress.transition(MigrationStatus::Complete);
            }
        } else {
            progress.settle_after_batch();
        }
        self.save(&progress)?;
        engine_info!(
            "Batch done: {}/{} processed, status {}",
            progress.processed,
            progress.total,
            progress.status
        );
        Ok(Some(progress))
    }

    /// Stop or reset issued by another invocation while this batch ran.
    ///
    /// A stop lets the batch finish but survives it; a reset abandons the batch.
    fn interruption(&self) -> Interruption {
        match self.store.get(PROGRESS_KEY) {
            Ok(Some(stored)) if stored.status == MigrationStatus::Stopped => Interruption::Stopped,
            Ok(Some(_)) => Interruption::None,
            Ok(None) => Interruption::Reset,
            Err(err) => {
                engine_warn!("Cannot check for stop request: {}", err);
                Interruption::None
            }
        }
    }

    async fn process_with_retry(
        &self,
        progress: &MigrationProgress,
        identifier: &str,
    ) -> Result<RecordId, MigrationError> {
        let attempts = self.retry.attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.migrate_item(progress, identifier).await {
                Ok(record) => return Ok(record),
                Err(err) if attempt < attempts => {
                    engine_warn!("Attempt {}/{} failed: {}", attempt, attempts, err);
                    tokio::time::sleep(self.retry.pause).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Produces one page and hands it to the content store.
    async fn migrate_item(
        &self,
        progress: &MigrationProgress,
        identifier: &str,
    ) -> Result<RecordId, MigrationError> {
        if let Some(existing) = progress.record_for(identifier) {
            return Ok(existing.clone());
        }

        let request = ItemRequest {
            identifier,
            source_location: progress.source_location(identifier).map(|p| p.as_path()),
            settings: &progress.settings,
        };
        let html = self.fetcher.fetch_content(&request).await?;
        let title = page_title(identifier);
        engine_debug!("Creating page {:?} ({} bytes)", title, html.len());
        self.content_store
            .create_page(&title, &html)
            .await
            .map_err(MigrationError::Persist)
    }

    /// Migrates a single identifier outside the batch loop.
    ///
    /// An identifier that already has a record returns it without touching the
    /// source or the content store.
    pub async fn process_item(&self, identifier: &str) -> Result<RecordId, MigrationError> {
        let Some(mut progress) = self.store.get(PROGRESS_KEY)? else {
            return Err(MigrationError::source_error("No migration in progress"));
        };
        if let Some(existing) = progress.record_for(identifier) {
            engine_debug!("{} already migrated as {}", identifier, existing);
            return Ok(existing.clone());
        }

        let _scope = ItemScope::enter(identifier);
        let record = self.migrate_item(&progress, identifier).await?;
        progress.mark_processed(identifier, record.clone());
        self.save(&progress)?;
        Ok(record)
    }

    /// Pauses a processing run. Other states are left as they are.
    pub fn stop(&self) -> Result<Option<MigrationProgress>, MigrationError> {
        let Some(mut progress) = self.store.get(PROGRESS_KEY)? else {
            engine_debug!("No migration to stop");
            return Ok(None);
        };
        if progress.transition(MigrationStatus::Stopped) {
            engine_info!("Migration stopped at {}/{}", progress.processed, progress.total);
            self.save(&progress)?;
        } else {
            engine_info!("Migration is {}, stop ignored", progress.status);
        }
        Ok(Some(progress))
    }

    /// Deletes the progress record.
    pub fn reset(&self) -> Result<(), MigrationError> {
        self.store.delete(PROGRESS_KEY)?;
        engine_info!("Migration progress reset");
        Ok(())
    }
}
