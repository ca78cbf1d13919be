use super::{ExportStore, ExportedValue};
use crate::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Exports persisted as a flat JSON object of `name -> value`.
pub struct FileExportStore {
    path: PathBuf,
}

impl FileExportStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<BTreeMap<String, String>> {
        match fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, exports: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(exports)?).await?;
        debug!("Wrote {} exports to {}", exports.len(), self.path.display());
        Ok(())
    }
}

#[async_trait]
impl ExportStore for FileExportStore {
    async fn publish(&self, exports: &[ExportedValue]) -> Result<()> {
        let mut stored = self.load().await?;
        for export in exports {
            stored.insert(export.export_name.clone(), export.value.clone());
        }
        self.save(&stored).await
    }

    async fn lookup(&self, export_name: &str) -> Result<Option<String>> {
        Ok(self.load().await?.get(export_name).cloned())
    }

    async fn remove(&self, export_names: &[String]) -> Result<()> {
        let mut stored = self.load().await?;
        for name in export_names {
            stored.remove(name);
        }
        self.save(&stored).await
    }
}
