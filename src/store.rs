// 💾 JSON document persistence
//
// Each registry/board is one pretty-printed JSON document. Writes go to a
// sibling temp file and are renamed into place, so a crash mid-write leaves
// the previous version intact.

use crate::error::{BingoError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct JsonDocument {
    path: PathBuf,
}

impl JsonDocument {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonDocument { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the document; None when the file does not exist
    pub fn load<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(BingoError::io(&self.path, e)),
        };

        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| BingoError::json(&self.path, e))
    }

    /// Load the document, falling back to the type's empty default
    pub fn load_or_default<T: DeserializeOwned + Default>(&self) -> Result<T> {
        Ok(self.load()?.unwrap_or_default())
    }

    pub fn save<T: Serialize>(&self, value: &T) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir).map_err(|e| BingoError::io(dir, e))?;
            }
        }

        let text = serde_json::to_string_pretty(value)
            .map_err(|e| BingoError::json(&self.path, e))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text).map_err(|e| BingoError::io(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| BingoError::io(&self.path, e))?;

        tracing::debug!(path = %self.path.display(), "document saved");
        Ok(())
    }
}
