use std::path::PathBuf;

use engine_logging::engine_info;
use migrator_core::{escape_html, RecordId};

use crate::filename::deterministic_filename;
use crate::persist::{AtomicFileWriter, PersistError};

/// Target system that receives migrated pages.
#[async_trait::async_trait]
pub trait ContentStore: Send + Sync {
    async fn create_page(&self, title: &str, html: &str) -> Result<RecordId, PersistError>;
}

/// Writes each page as a standalone HTML document.
///
/// The record ID is the file stem `{title}--{hash(title, html)}`, so writing the
/// same page twice lands on the same file.
#[derive(Debug, Clone)]
pub struct FileContentStore {
    writer: AtomicFileWriter,
}

impl FileContentStore {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            writer: AtomicFileWriter::new(dir),
        }
    }
}

#[async_trait::async_trait]
impl ContentStore for FileContentStore {
    async fn create_page(&self, title: &str, html: &str) -> Result<RecordId, PersistError> {
        let key = format!("{title}\n{html}");
        let filename = deterministic_filename(Some(title), &key, "html");
        let document = render_document(title, html);
        let path = self.writer.write(&filename, &document)?;

        let stem = filename.trim_end_matches(".html").to_string();
        engine_info!("Created page {:?} at {:?}", title, path);
        Ok(RecordId(stem))
    }
}

fn render_document(title: &str, body: &str) -> String {
    let title = escape_html(title);
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n<body>\n<h1>{title}</h1>\n{body}\n</body>\n</html>\n"
    )
}
