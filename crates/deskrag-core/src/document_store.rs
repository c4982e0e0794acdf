//! Loads the knowledge base: one `Document` per eligible file, ordered by file name.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{IngestionError, Result};
use crate::types::Document;

pub struct DocumentStore {
    extension: String,
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new("txt")
    }
}

impl DocumentStore {
    pub fn new(extension: &str) -> Self {
        Self { extension: extension.trim_start_matches('.').to_string() }
    }

    /// Read every eligible file directly under `dir`.
    ///
    /// Ids follow lexicographic file-name order. Empty and non-text files are
    /// skipped with a warning and do not consume an id.
    pub fn load(&self, dir: &Path) -> Result<Vec<Document>> {
        if !dir.exists() {
            return Err(IngestionError::MissingDirectory(dir.to_path_buf()).into());
        }
        if !dir.is_dir() {
            return Err(IngestionError::NotADirectory(dir.to_path_buf()).into());
        }

        let files = self.list_files(dir);
        let mut documents = Vec::with_capacity(files.len());
        for path in &files {
            let Some(text) = read_text(path)? else { continue };
            let source_name = source_name(path);
            documents.push(Document { id: documents.len(), source_name, text });
        }

        if documents.is_empty() {
            return Err(IngestionError::NoEligibleFiles {
                dir: dir.to_path_buf(),
                extension: self.extension.clone(),
            }
            .into());
        }
        info!("Loaded {} documents from {} ({} candidate files)", documents.len(), dir.display(), files.len());
        Ok(documents)
    }

    fn list_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.extension().and_then(|s| s.to_str()) == Some(self.extension.as_str()))
            .collect();
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        files
    }
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// `None` when the file should be skipped.
fn read_text(path: &Path) -> Result<Option<String>> {
    let bytes = fs::read(path).map_err(|source| IngestionError::Read { path: path.to_path_buf(), source })?;
    if bytes.contains(&0) {
        warn!("Skipping {}: looks like a binary file", path.display());
        return Ok(None);
    }
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(_) => {
            warn!("Skipping {}: not valid UTF-8", path.display());
            return Ok(None);
        }
    };
    if text.trim().is_empty() {
        warn!("Skipping {}: file is empty", path.display());
        return Ok(None);
    }
    Ok(Some(text))
}
