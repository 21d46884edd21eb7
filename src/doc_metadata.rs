//! Document metadata: title, detected language, derived counters, and a
//! bounded ring of version snapshots for diagnostics/rollback.
//!
//! Scoped to the single document the host process owns — unlike the
//! donor's multi-document `DocumentManager`, there is no per-id routing
//! here, since one host process backs exactly one collaborative
//! document.

use anyhow::{anyhow, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Derived, recomputed-on-every-update facts about the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: String,
    pub language: Option<String>,
    pub size_bytes: usize,
    pub line_count: u32,
    pub character_count: usize,
    pub word_count: usize,
    pub collaborators: Vec<String>,
}

impl DocumentMetadata {
    fn derive(title: &str, content: &str, author: &str) -> Self {
        Self {
            title: title.to_string(),
            language: detect_language(title, content),
            size_bytes: content.len(),
            line_count: content.lines().count() as u32,
            character_count: content.chars().count(),
            word_count: content.split_whitespace().count(),
            collaborators: vec![author.to_string()],
        }
    }

    fn refresh(&mut self, content: &str, author: &str) {
        self.size_bytes = content.len();
        self.line_count = content.lines().count() as u32;
        self.character_count = content.chars().count();
        self.word_count = content.split_whitespace().count();
        if !self.collaborators.iter().any(|c| c == author) {
            self.collaborators.push(author.to_string());
        }
    }
}

/// A bounded snapshot of the document at a given version, kept for
/// rollback and diagnostics. Capped independently of the core engine's
/// `applied_log`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentVersion {
    pub version: u64,
    pub content: String,
    pub op_id: Option<String>,
    pub author: String,
    pub recorded_at: chrono::DateTime<chrono::Utc>,
}

struct Inner {
    metadata: DocumentMetadata,
    version: u64,
    snapshots: Vec<DocumentVersion>,
}

const MAX_SNAPSHOTS: usize = 100;

/// Host-side metadata manager for the one document this process serves.
/// Entirely separate from the OT engine: `Sync Manager` never reads or
/// writes through this type.
pub struct DocumentMetadataManager {
    inner: RwLock<Option<Inner>>,
}

impl DocumentMetadataManager {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(None),
        }
    }

    pub fn create(&self, title: &str, content: &str, author: &str) -> DocumentMetadata {
        let metadata = DocumentMetadata::derive(title, content, author);
        let snapshot = DocumentVersion {
            version: 0,
            content: content.to_string(),
            op_id: None,
            author: author.to_string(),
            recorded_at: chrono::Utc::now(),
        };
        *self.inner.write() = Some(Inner {
            metadata: metadata.clone(),
            version: 0,
            snapshots: vec![snapshot],
        });
        tracing::info!(title, author, "document created");
        metadata
    }

    pub fn record_update(&self, new_content: &str, author: &str, op_id: &str) -> Result<DocumentMetadata> {
        let mut guard = self.inner.write();
        let inner = guard
            .as_mut()
            .ok_or_else(|| anyhow!("document metadata not initialized"))?;
        inner.metadata.refresh(new_content, author);
        inner.version += 1;
        inner.snapshots.push(DocumentVersion {
            version: inner.version,
            content: new_content.to_string(),
            op_id: Some(op_id.to_string()),
            author: author.to_string(),
            recorded_at: chrono::Utc::now(),
        });
        if inner.snapshots.len() > MAX_SNAPSHOTS {
            inner.snapshots.remove(0);
        }
        tracing::debug!(author, op_id, version = inner.version, "document metadata updated");
        Ok(inner.metadata.clone())
    }

    pub fn version_history(&self) -> Vec<DocumentVersion> {
        self.inner
            .read()
            .as_ref()
            .map(|inner| inner.snapshots.clone())
            .unwrap_or_default()
    }

    /// Diagnostic/recovery surface only: the caller is responsible for
    /// re-seeding the Sync Manager via `set_document` with the returned
    /// content; this manager does not touch the engine.
    pub fn rollback_to(&self, target_version: u64) -> Result<String> {
        let guard = self.inner.read();
        let inner = guard
            .as_ref()
            .ok_or_else(|| anyhow!("document metadata not initialized"))?;
        inner
            .snapshots
            .iter()
            .find(|snap| snap.version == target_version)
            .map(|snap| snap.content.clone())
            .ok_or_else(|| anyhow!("version {target_version} not found"))
    }
}

impl Default for DocumentMetadataManager {
    fn default() -> Self {
        Self::new()
    }
}

fn detect_language(title: &str, content: &str) -> Option<String> {
    if let Some(ext) = extract_extension(title) {
        let lang = match ext.as_str() {
            "rs" => "rust",
            "js" | "jsx" => "javascript",
            "ts" | "tsx" => "typescript",
            "py" => "python",
            "java" => "java",
            "cpp" | "cc" | "cxx" => "cpp",
            "c" => "c",
            "go" => "go",
            "rb" => "ruby",
            "md" => "markdown",
            "json" => "json",
            "yaml" | "yml" => "yaml",
            _ => return None,
        };
        return Some(lang.to_string());
    }
    if content.contains("fn main()") || content.contains("use std::") {
        Some("rust".to_string())
    } else if content.contains("def ") && content.contains("import ") {
        Some("python".to_string())
    } else {
        None
    }
}

fn extract_extension(filename: &str) -> Option<String> {
    filename
        .rfind('.')
        .map(|dot| filename[dot + 1..].to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_derives_language_and_counters() {
        let mgr = DocumentMetadataManager::new();
        let meta = mgr.create("lib.rs", "fn main() {}", "u1");
        assert_eq!(meta.language.as_deref(), Some("rust"));
        assert_eq!(meta.collaborators, vec!["u1".to_string()]);
    }

    #[test]
    fn record_update_refreshes_counters_and_adds_collaborator() {
        let mgr = DocumentMetadataManager::new();
        mgr.create("notes.txt", "hello", "u1");
        let meta = mgr.record_update("hello world", "u2", "op-1").unwrap();
        assert_eq!(meta.character_count, 11);
        assert!(meta.collaborators.contains(&"u2".to_string()));
    }

    #[test]
    fn rollback_returns_recorded_snapshot_content() {
        let mgr = DocumentMetadataManager::new();
        mgr.create("notes.txt", "v0", "u1");
        mgr.record_update("v1", "u1", "op-1").unwrap();
        mgr.record_update("v2", "u1", "op-2").unwrap();
        assert_eq!(mgr.rollback_to(1).unwrap(), "v1");
    }

    #[test]
    fn version_history_caps_at_max_snapshots() {
        let mgr = DocumentMetadataManager::new();
        mgr.create("notes.txt", "v0", "u1");
        for i in 0..150 {
            mgr.record_update(&format!("v{i}"), "u1", &format!("op-{i}")).unwrap();
        }
        assert_eq!(mgr.version_history().len(), MAX_SNAPSHOTS);
    }
}
