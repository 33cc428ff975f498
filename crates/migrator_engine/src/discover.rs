use std::collections::BTreeMap;
use std::path::PathBuf;

use migrator_core::MigrationSettings;

use crate::MigrationError;

/// Ordered work list produced by one discovery pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    pub identifiers: Vec<String>,
    /// File mode only: where each identifier's page file lives.
    pub source_locations: BTreeMap<String, PathBuf>,
}

impl Discovery {
    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }
}

/// Enumerates every page a run has to migrate.
///
/// An unreachable source is an error; an empty source is not.
#[async_trait::async_trait]
pub trait Discoverer: Send + Sync {
    async fn discover(&self, settings: &MigrationSettings) -> Result<Discovery, MigrationError>;
}
