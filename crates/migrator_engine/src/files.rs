use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};
use migrator_core::{MarkupConverter, MigrationSettings};
use regex::Regex;

use crate::decode::decode_document;
use crate::discover::{Discoverer, Discovery};
use crate::source::{ContentFetcher, ItemRequest};
use crate::MigrationError;

/// Tombstoned revisions carry a `,del-<unix time>` suffix.
static DELETED_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",del-\d+$").expect("deleted suffix pattern is valid"));

const FRONT_PAGE: &str = "FrontPage";

/// Discovers pages from a directory of `Group.Page` files.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSystemDiscoverer;

#[async_trait::async_trait]
impl Discoverer for FileSystemDiscoverer {
    async fn discover(&self, settings: &MigrationSettings) -> Result<Discovery, MigrationError> {
        let dir = &settings.source_directory;
        engine_info!("Looking for wiki files in {:?}", dir);
        let files = list_page_files(dir)?;
        let discovery = group_pages(&settings.base_url, files);
        engine_info!("Total pages to process: {}", discovery.len());
        Ok(discovery)
    }
}

/// Regular files in `dir`, sorted by file name.
fn list_page_files(dir: &Path) -> Result<Vec<(String, PathBuf)>, MigrationError> {
    if !dir.is_dir() {
        engine_error!("Wiki source directory not found: {:?}", dir);
        return Err(MigrationError::source_error(format!(
            "Wiki source directory not found: {}",
            dir.display()
        )));
    }

    let entries = fs::read_dir(dir).map_err(|err| {
        MigrationError::source_error(format!("Failed to read wiki source directory: {err}"))
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| {
            MigrationError::source_error(format!("Failed to read wiki source directory: {err}"))
        })?;
        if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => files.push((name, entry.path())),
            Err(name) => engine_warn!("Skipping file with non UTF-8 name {:?}", name),
        }
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

/// Splits `Group.Page` file names into groups and orders each group FrontPage-first.
fn group_pages(base_url: &str, files: Vec<(String, PathBuf)>) -> Discovery {
    let mut groups: Vec<(String, Vec<(String, PathBuf)>)> = Vec::new();
    let mut group_index: HashMap<String, usize> = HashMap::new();

    for (name, path) in files {
        if DELETED_SUFFIX.is_match(&name) {
            engine_debug!("Skipping deleted revision {}", name);
            continue;
        }
        let Some((group, page)) = split_page_name(&name) else {
            engine_debug!("Skipping file that is not a Group.Page name: {}", name);
            continue;
        };
        let idx = *group_index.entry(group.to_string()).or_insert_with(|| {
            groups.push((group.to_string(), Vec::new()));
            groups.len() - 1
        });
        groups[idx].1.push((page.to_string(), path));
    }

    let mut discovery = Discovery::default();
    for (group, mut pages) in groups {
        if let Some(pos) = pages.iter().position(|(page, _)| page == FRONT_PAGE) {
            let front = pages.remove(pos);
            pages.insert(0, front);
        }
        for (page, path) in pages {
            let identifier = format!("{base_url}?n={group}.{page}");
            discovery
                .source_locations
                .insert(identifier.clone(), path);
            discovery.identifiers.push(identifier);
        }
    }
    discovery
}

fn split_page_name(name: &str) -> Option<(&str, &str)> {
    let mut parts = name.split('.');
    let group = parts.next()?;
    let page = parts.next()?;
    if parts.next().is_some() || group.is_empty() || page.is_empty() {
        return None;
    }
    Some((group, page))
}

/// Reads page files recorded at discovery and converts their markup to HTML.
#[derive(Debug, Default, Clone)]
pub struct FileContentFetcher {
    converter: MarkupConverter,
}

impl FileContentFetcher {
    pub fn new(converter: MarkupConverter) -> Self {
        Self { converter }
    }
}

#[async_trait::async_trait]
impl ContentFetcher for FileContentFetcher {
    async fn fetch_content(&self, request: &ItemRequest<'_>) -> Result<String, MigrationError> {
        let Some(path) = request.source_location else {
            engine_warn!("File path not found for {}", request.identifier);
            return Err(MigrationError::source_error(format!(
                "File path not recorded for {}",
                request.identifier
            )));
        };

        engine_debug!("Reading content from file {:?}", path);
        let bytes = tokio::fs::read(path).await.map_err(|err| {
            MigrationError::source_error(format!("Failed to read file {}: {err}", path.display()))
        })?;
        let decoded = decode_document(&bytes, None).map_err(|err| {
            MigrationError::source_error(format!("Failed to decode file {}: {err}", path.display()))
        })?;

        let html = self.converter.convert(&decoded.text);
        if html.trim().is_empty() {
            return Err(MigrationError::source_error(format!(
                "Failed to convert content for: {}",
                request.identifier
            )));
        }
        Ok(html)
    }
}
