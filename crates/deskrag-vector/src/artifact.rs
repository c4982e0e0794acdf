//! Single-file persisted index.
//!
//! Layout: one line of header JSON, then the payload JSON. The header records
//! the embedding model identity and a blake3 digest of the raw payload bytes,
//! so a reader can reject a foreign model before decoding anything and never
//! interprets a damaged payload.
//!
//! Writes go to a temporary file in the target directory which is fsynced and
//! then renamed over the target, so readers see either the old artifact or the
//! complete new one.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::info;

use deskrag_core::error::{Error, Result};
use deskrag_core::types::{Document, ModelIdentity};

use crate::index::VectorIndex;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactHeader {
    pub format_version: u32,
    pub model: ModelIdentity,
    pub documents: usize,
    pub built_at: DateTime<Utc>,
    pub checksum: String,
}

#[derive(Serialize)]
struct PayloadRef<'a> {
    documents: &'a [Document],
    vectors: &'a [Vec<f32>],
}

#[derive(Deserialize)]
struct Payload {
    documents: Vec<Document>,
    vectors: Vec<Vec<f32>>,
}

fn load_error(path: &Path, reason: impl Into<String>) -> Error {
    Error::IndexLoad { path: path.to_path_buf(), reason: reason.into() }
}

fn write_error(path: &Path, source: std::io::Error) -> Error {
    Error::IndexWrite { path: path.to_path_buf(), source }
}

fn checksum(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Persist `index` to `path`, replacing any previous artifact atomically.
pub fn write(index: &VectorIndex, path: &Path) -> Result<ArtifactHeader> {
    let payload = serde_json::to_vec(&PayloadRef { documents: index.documents(), vectors: index.vectors() })
        .map_err(|e| write_error(path, e.into()))?;
    let header = ArtifactHeader {
        format_version: FORMAT_VERSION,
        model: index.model().clone(),
        documents: index.len(),
        built_at: Utc::now(),
        checksum: checksum(&payload),
    };
    let header_line = serde_json::to_vec(&header).map_err(|e| write_error(path, e.into()))?;

    let dir = parent_dir(path);
    fs::create_dir_all(&dir).map_err(|e| write_error(path, e))?;
    let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| write_error(path, e))?;
    tmp.write_all(&header_line).map_err(|e| write_error(path, e))?;
    tmp.write_all(b"\n").map_err(|e| write_error(path, e))?;
    tmp.write_all(&payload).map_err(|e| write_error(path, e))?;
    tmp.flush().map_err(|e| write_error(path, e))?;
    tmp.as_file().sync_all().map_err(|e| write_error(path, e))?;
    tmp.persist(path).map_err(|e| write_error(path, e.error))?;

    info!("💾 Saved index of {} documents to {}", header.documents, path.display());
    Ok(header)
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn split_header(path: &Path, bytes: &[u8]) -> Result<(ArtifactHeader, usize)> {
    let newline = bytes
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| load_error(path, "missing header line"))?;
    let header: ArtifactHeader = serde_json::from_slice(&bytes[..newline])
        .map_err(|e| load_error(path, format!("unreadable header: {}", e)))?;
    if header.format_version != FORMAT_VERSION {
        return Err(load_error(
            path,
            format!("unsupported format version {} (expected {})", header.format_version, FORMAT_VERSION),
        ));
    }
    Ok((header, newline + 1))
}

/// Read only the header, e.g. to report what an artifact contains.
pub fn read_header(path: &Path) -> Result<ArtifactHeader> {
    let bytes = fs::read(path).map_err(|e| load_error(path, e.to_string()))?;
    split_header(path, &bytes).map(|(header, _)| header)
}

/// Load the artifact at `path`, which must have been built by `expected`.
pub fn read(path: &Path, expected: &ModelIdentity) -> Result<VectorIndex> {
    let bytes = fs::read(path).map_err(|e| load_error(path, e.to_string()))?;
    let (header, payload_start) = split_header(path, &bytes)?;

    if &header.model != expected {
        return Err(Error::ModelMismatch {
            persisted: header.model.to_string(),
            configured: expected.to_string(),
        });
    }

    let payload_bytes = &bytes[payload_start..];
    if checksum(payload_bytes) != header.checksum {
        return Err(load_error(path, "payload checksum mismatch"));
    }
    let payload: Payload = serde_json::from_slice(payload_bytes)
        .map_err(|e| load_error(path, format!("unreadable payload: {}", e)))?;
    if payload.documents.len() != header.documents {
        return Err(load_error(
            path,
            format!("header lists {} documents, payload has {}", header.documents, payload.documents.len()),
        ));
    }

    let index = VectorIndex::from_parts(header.model, payload.documents, payload.vectors)
        .map_err(|e| load_error(path, e.to_string()))?;
    info!("📂 Loaded index of {} documents from {} (built {})", index.len(), path.display(), header.built_at);
    Ok(index)
}
