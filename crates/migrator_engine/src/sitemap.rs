use std::collections::HashSet;
use std::sync::Arc;

use engine_logging::{engine_debug, engine_error, engine_info};
use migrator_core::MigrationSettings;

use crate::decode::decode_document;
use crate::discover::{Discoverer, Discovery};
use crate::fetch::Fetcher;
use crate::fragment::container_links;
use crate::urls::build_page_url;
use crate::MigrationError;

/// Discovers pages from the links on the wiki's site map page.
pub struct SitemapDiscoverer {
    fetcher: Arc<dyn Fetcher>,
}

impl SitemapDiscoverer {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait::async_trait]
impl Discoverer for SitemapDiscoverer {
    async fn discover(&self, settings: &MigrationSettings) -> Result<Discovery, MigrationError> {
        let sitemap_url = settings.sitemap_url();
        engine_info!("Fetching sitemap from {}", sitemap_url);

        let output = self.fetcher.fetch(&sitemap_url).await.map_err(|err| {
            engine_error!("Failed to fetch sitemap {}: {}", sitemap_url, err);
            MigrationError::source_error(format!("Failed to fetch sitemap {sitemap_url}: {err}"))
        })?;
        let decoded = decode_document(&output.bytes, output.metadata.content_type.as_deref())
            .map_err(|err| MigrationError::source_error(format!("Unreadable sitemap: {err}")))?;

        let hrefs = container_links(&decoded.text, &settings.content_selector).ok_or_else(|| {
            MigrationError::source_error(format!(
                "Content container #{} not found in sitemap",
                settings.content_selector
            ))
        })?;
        engine_debug!("Found {} links in sitemap", hrefs.len());

        let identifiers = collect_page_urls(&settings.base_url, &hrefs);
        engine_info!("Total pages to process: {}", identifiers.len());

        Ok(Discovery {
            identifiers,
            ..Discovery::default()
        })
    }
}

fn collect_page_urls(base_url: &str, hrefs: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    hrefs
        .iter()
        .filter(|href| !href.is_empty() && !href.starts_with('#'))
        .map(|href| build_page_url(base_url, href))
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::collect_page_urls;

    #[test]
    fn drops_fragments_and_duplicates_keeping_first_order() {
        let hrefs: Vec<String> = [
            "",
            "#content",
            "https://w.example/wiki.php?n=Main.B",
            "Main.A",
            "wiki.php?n=Main.B",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        assert_eq!(
            collect_page_urls("https://w.example/wiki.php", &hrefs),
            vec![
                "https://w.example/wiki.php?n=Main.B".to_string(),
                "https://w.example/wiki.php?n=Main.A".to_string(),
            ]
        );
    }
}
