//! Migrator engine: discovery, page fetching, stores and the batch orchestrator.
mod assets;
mod content_store;
mod decode;
mod discover;
mod engine;
mod fetch;
mod files;
mod filename;
mod fragment;
mod persist;
mod progress_store;
mod scrape;
mod sitemap;
mod source;
mod types;
mod urls;

pub use assets::{AssetError, AssetStore, FileAssetStore, UploadedAsset};
pub use content_store::{ContentStore, FileContentStore};
pub use decode::{decode_document, DecodeError, DecodedText};
pub use discover::{Discoverer, Discovery};
pub use engine::{MigrationEngine, RetryPolicy, PROGRESS_KEY, PROGRESS_TTL};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher};
pub use files::{FileContentFetcher, FileSystemDiscoverer};
pub use filename::deterministic_filename;
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use progress_store::{Clock, FileProgressStore, MemoryProgressStore, ProgressStore};
pub use scrape::{HttpContentFetcher, CELL_STYLE, HEADER_STYLE, TABLE_CLASS, TABLE_STYLE};
pub use sitemap::SitemapDiscoverer;
pub use source::{ContentFetcher, ItemRequest};
pub use types::{FailureKind, FetchError, FetchMetadata, FetchOutput, MigrationError};
pub use urls::{absolute_url, build_page_url};
