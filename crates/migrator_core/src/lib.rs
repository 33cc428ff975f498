//! Migrator core: pure migration state, settings and markup conversion.
mod markup;
mod progress;
mod settings;
mod title;
mod view_model;

pub use markup::{escape_html, slugify, MarkupConverter};
pub use progress::{MigrationProgress, MigrationStatus, RecordId};
pub use settings::{
    ConfigError, MigrationSettings, SourceMode, DEFAULT_BATCH_SIZE, DEFAULT_REQUEST_DELAY_SECONDS,
    MAX_BATCH_SIZE, MIN_BATCH_SIZE, MIN_REQUEST_DELAY_SECONDS,
};
pub use title::{page_name, page_title, UNTITLED_PAGE};
pub use view_model::ProgressView;
