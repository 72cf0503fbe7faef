use std::fs;
use std::path::{Component, Path, PathBuf};

use pptx_ingest::error::MediaError;
use pptx_ingest::media::AssetUploader;

/// Uploader that stores assets under a local directory, keyed by their
/// storage key, and returns `file://` URLs.
#[derive(Debug, Clone)]
pub struct DirUploader {
    root: PathBuf,
}

impl DirUploader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, MediaError> {
        let rel = Path::new(key);
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if key.is_empty() || escapes {
            return Err(MediaError::Upload {
                key: key.to_string(),
                reason: "key must be a relative path without `..`".to_string(),
            });
        }
        Ok(self.root.join(rel))
    }
}

impl AssetUploader for DirUploader {
    fn upload(&self, data: &[u8], key: &str) -> Result<String, MediaError> {
        let path = self.path_for(key)?;
        let fail = |e: std::io::Error| MediaError::Upload {
            key: key.to_string(),
            reason: e.to_string(),
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(fail)?;
        }
        fs::write(&path, data).map_err(fail)?;
        let absolute = fs::canonicalize(&path).unwrap_or(path);
        Ok(format!("file://{}", absolute.display()))
    }
}
