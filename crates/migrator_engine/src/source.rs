use std::path::Path;

use migrator_core::MigrationSettings;

use crate::MigrationError;

/// Everything a content fetcher may need to produce one page.
#[derive(Debug, Clone, Copy)]
pub struct ItemRequest<'a> {
    pub identifier: &'a str,
    pub source_location: Option<&'a Path>,
    pub settings: &'a MigrationSettings,
}

/// Produces the HTML body of one page.
#[async_trait::async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch_content(&self, request: &ItemRequest<'_>) -> Result<String, MigrationError>;
}
