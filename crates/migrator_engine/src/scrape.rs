use std::collections::HashMap;
use std::sync::Arc;

use engine_logging::{engine_debug, engine_warn};

use crate::assets::AssetStore;
use crate::decode::decode_document;
use crate::fetch::Fetcher;
use crate::fragment::{image_sources, render_container, RenderRules};
use crate::source::{ContentFetcher, ItemRequest};
use crate::urls::absolute_url;
use crate::{FetchError, MigrationError};

pub const TABLE_CLASS: &str = "wiki-imported-table";
pub const TABLE_STYLE: &str = "border-collapse: collapse; width: 100%; margin-bottom: 1em;";
pub const CELL_STYLE: &str = "border: 1px solid #ddd; padding: 8px;";
pub const HEADER_STYLE: &str = "border: 1px solid #ddd; padding: 8px; background-color: #f2f2f2;";

/// Scrapes the content container of a rendered wiki page.
///
/// Tables get presentational styling; images are re-hosted through the asset
/// store, keeping the (absolute) source URL when an upload fails.
pub struct HttpContentFetcher {
    fetcher: Arc<dyn Fetcher>,
    assets: Arc<dyn AssetStore>,
}

impl HttpContentFetcher {
    pub fn new(fetcher: Arc<dyn Fetcher>, assets: Arc<dyn AssetStore>) -> Self {
        Self { fetcher, assets }
    }

    async fn rehost_images(&self, page_url: &str, sources: Vec<String>) -> HashMap<String, String> {
        let mut replacements = HashMap::new();
        for src in sources {
            if src.starts_with("data:") {
                continue;
            }
            let Some(absolute) = absolute_url(page_url, &src) else {
                engine_warn!("Cannot resolve image {} against {}", src, page_url);
                continue;
            };
            let target = match self.assets.upload(&absolute).await {
                Ok(asset) => {
                    engine_debug!("Image {} now served from {}", absolute, asset.url);
                    asset.url
                }
                Err(err) => {
                    engine_warn!("Keeping original image {}: {}", absolute, err);
                    absolute
                }
            };
            replacements.insert(src, target);
        }
        replacements
    }
}

#[async_trait::async_trait]
impl ContentFetcher for HttpContentFetcher {
    async fn fetch_content(&self, request: &ItemRequest<'_>) -> Result<String, MigrationError> {
        let selector = request.settings.content_selector.as_str();
        let output = self.fetcher.fetch(request.identifier).await?;
        let decoded = decode_document(&output.bytes, output.metadata.content_type.as_deref())
            .map_err(FetchError::from)?;

        let missing_container =
            || MigrationError::source_error(format!("Content container #{selector} not found"));

        let sources = image_sources(&decoded.text, selector).ok_or_else(missing_container)?;
        let image_sources = self.rehost_images(request.identifier, sources).await;

        let rules = RenderRules {
            table_class: Some(TABLE_CLASS.to_string()),
            table_style: Some(TABLE_STYLE.to_string()),
            cell_style: Some(CELL_STYLE.to_string()),
            header_style: Some(HEADER_STYLE.to_string()),
            image_sources,
        };
        render_container(&decoded.text, selector, &rules).ok_or_else(missing_container)
    }
}
