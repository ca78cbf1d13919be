use super::{ExportStore, ExportedValue};
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct MockExportStore {
    exports: Arc<Mutex<HashMap<String, String>>>,
    publish_count: Arc<Mutex<usize>>,
}

impl MockExportStore {
    pub fn new() -> Self {
        Self {
            exports: Arc::new(Mutex::new(HashMap::new())),
            publish_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn get_publish_count(&self) -> usize {
        *self.publish_count.lock().unwrap()
    }

    pub fn get_exports(&self) -> HashMap<String, String> {
        self.exports.lock().unwrap().clone()
    }
}

impl Default for MockExportStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExportStore for MockExportStore {
    async fn publish(&self, exports: &[ExportedValue]) -> Result<()> {
        *self.publish_count.lock().unwrap() += 1;

        let mut stored = self.exports.lock().unwrap();
        for export in exports {
            stored.insert(export.export_name.clone(), export.value.clone());
        }
        Ok(())
    }

    async fn lookup(&self, export_name: &str) -> Result<Option<String>> {
        Ok(self.exports.lock().unwrap().get(export_name).cloned())
    }

    async fn remove(&self, export_names: &[String]) -> Result<()> {
        let mut stored = self.exports.lock().unwrap();
        for name in export_names {
            stored.remove(name);
        }
        Ok(())
    }
}
