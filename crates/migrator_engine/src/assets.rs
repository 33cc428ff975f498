use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use engine_logging::{engine_info, engine_warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fetch::Fetcher;
use crate::filename::{sanitize_component, short_hash};
use crate::persist::{AtomicFileWriter, PersistError};
use crate::FetchError;

const INDEX_FILENAME: &str = "assets.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("invalid asset url {0:?}")]
    InvalidUrl(String),
    #[error("download failed: {0}")]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Re-hosts images referenced by migrated pages.
#[async_trait::async_trait]
pub trait AssetStore: Send + Sync {
    async fn upload(&self, source_url: &str) -> Result<UploadedAsset, AssetError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StoredAsset {
    file_name: String,
    source_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct AssetIndex {
    /// Keyed by source URL.
    assets: BTreeMap<String, StoredAsset>,
}

impl AssetIndex {
    fn by_source(&self, source_url: &str) -> Option<&StoredAsset> {
        self.assets.get(source_url)
    }

    fn by_file_name(&self, file_name: &str) -> Option<&StoredAsset> {
        self.assets.values().find(|asset| asset.file_name == file_name)
    }
}

/// Asset store backed by a directory served under `public_base`.
///
/// Uploads are deduplicated first by source URL and then by file name, so
/// re-running a migration never downloads the same image twice.
pub struct FileAssetStore {
    writer: AtomicFileWriter,
    public_base: String,
    fetcher: Arc<dyn Fetcher>,
    index: Mutex<AssetIndex>,
}

impl FileAssetStore {
    pub fn open(
        dir: PathBuf,
        public_base: impl Into<String>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self, PersistError> {
        let writer = AtomicFileWriter::new(dir);
        let index = load_index(&writer)?;
        Ok(Self {
            writer,
            public_base: public_base.into(),
            fetcher,
            index: Mutex::new(index),
        })
    }

    fn asset_for(&self, stored: &StoredAsset) -> UploadedAsset {
        UploadedAsset {
            id: stored.file_name.clone(),
            url: format!(
                "{}/{}",
                self.public_base.trim_end_matches('/'),
                stored.file_name
            ),
        }
    }

    fn lookup(&self, source_url: &str, file_name: &str) -> Option<UploadedAsset> {
        let index = self.index.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(stored) = index.by_source(source_url) {
            engine_info!("Found existing image by source URL {}", source_url);
            return Some(self.asset_for(stored));
        }
        if let Some(stored) = index.by_file_name(file_name) {
            engine_info!("Found existing image by filename {}", file_name);
            return Some(self.asset_for(stored));
        }
        None
    }

    fn record(&self, stored: StoredAsset) -> Result<UploadedAsset, PersistError> {
        let mut index = self.index.lock().unwrap_or_else(|e| e.into_inner());
        index
            .assets
            .insert(stored.source_url.clone(), stored.clone());
        let json = serde_json::to_string_pretty(&*index)?;
        self.writer.write(INDEX_FILENAME, &json)?;
        Ok(self.asset_for(&stored))
    }
}

#[async_trait::async_trait]
impl AssetStore for FileAssetStore {
    async fn upload(&self, source_url: &str) -> Result<UploadedAsset, AssetError> {
        let file_name = asset_file_name(source_url)?;
        if let Some(existing) = self.lookup(source_url, &file_name) {
            return Ok(existing);
        }

        engine_info!("No existing image found, downloading {}", source_url);
        let output = self.fetcher.fetch(source_url).await?;
        self.writer.write_bytes(&file_name, &output.bytes)?;

        let asset = self.record(StoredAsset {
            file_name,
            source_url: source_url.to_string(),
        })?;
        engine_info!("Stored image {} as {}", source_url, asset.id);
        Ok(asset)
    }
}

fn load_index(writer: &AtomicFileWriter) -> Result<AssetIndex, PersistError> {
    let Some(text) = writer.read(INDEX_FILENAME)? else {
        return Ok(AssetIndex::default());
    };
    match serde_json::from_str(&text) {
        Ok(index) => Ok(index),
        Err(err) => {
            engine_warn!("Ignoring unreadable asset index in {:?}: {}", writer.dir(), err);
            Ok(AssetIndex::default())
        }
    }
}

/// Last path segment of the URL, made filesystem safe.
fn asset_file_name(source_url: &str) -> Result<String, AssetError> {
    let parsed =
        url::Url::parse(source_url).map_err(|_| AssetError::InvalidUrl(source_url.to_string()))?;
    let segment = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();
    let fallback = format!("asset-{}", short_hash(source_url));
    let name = sanitize_component(segment, &fallback);
    if name == INDEX_FILENAME {
        return Ok(fallback);
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::asset_file_name;

    #[test]
    fn file_name_is_last_segment() {
        assert_eq!(
            asset_file_name("https://w.example/uploads/Main/oven.jpg").unwrap(),
            "oven.jpg"
        );
    }

    #[test]
    fn directory_urls_get_hashed_name() {
        let name = asset_file_name("https://w.example/uploads/").unwrap();
        assert!(name.starts_with("asset-"));
    }

    #[test]
    fn relative_urls_are_rejected() {
        assert!(asset_file_name("oven.jpg").is_err());
    }
}
