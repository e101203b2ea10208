//! Trigger phrase to voice clip mapping.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Exact-match text that requests a specific voice clip.
///
/// Matching is case- and whitespace-sensitive; no normalisation is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Trigger(String);

impl Trigger {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A pre-recorded voice clip on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseAsset {
    path: PathBuf,
}

impl ResponseAsset {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name sent to Telegram alongside the upload.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "voice.ogg".to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub trigger: Trigger,
    pub asset: ResponseAsset,
}

/// Errors raised while building or verifying the catalog.
#[derive(Debug)]
pub enum CatalogError {
    Empty,
    EmptyTrigger { index: usize },
    DuplicateTrigger(String),
    MissingAsset { trigger: String, path: PathBuf },
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "catalog must contain at least one trigger"),
            Self::EmptyTrigger { index } => write!(f, "trigger #{} has empty text", index),
            Self::DuplicateTrigger(text) => write!(f, "duplicate trigger {:?}", text),
            Self::MissingAsset { trigger, path } => write!(
                f,
                "voice file '{}' for trigger {:?} is missing or not a file",
                path.display(),
                trigger
            ),
        }
    }
}

impl std::error::Error for CatalogError {}

/// Immutable trigger catalog, built once at startup.
#[derive(Debug)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog from `(trigger text, voice path)` pairs, keeping their order.
    pub fn new<I, S, P>(pairs: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = (S, P)>,
        S: Into<String>,
        P: Into<PathBuf>,
    {
        let mut entries = Vec::new();
        let mut index = HashMap::new();

        for (i, (text, path)) in pairs.into_iter().enumerate() {
            let text: String = text.into();
            if text.is_empty() {
                return Err(CatalogError::EmptyTrigger { index: i });
            }
            if index.contains_key(&text) {
                return Err(CatalogError::DuplicateTrigger(text));
            }
            index.insert(text.clone(), entries.len());
            entries.push(CatalogEntry {
                trigger: Trigger::new(text),
                asset: ResponseAsset::new(path),
            });
        }

        if entries.is_empty() {
            return Err(CatalogError::Empty);
        }

        Ok(Self { entries, index })
    }

    /// Check that every voice file exists before serving traffic.
    pub fn verify_assets(&self) -> Result<(), CatalogError> {
        for entry in &self.entries {
            if !entry.asset.path().is_file() {
                return Err(CatalogError::MissingAsset {
                    trigger: entry.trigger.as_str().to_string(),
                    path: entry.asset.path().to_path_buf(),
                });
            }
        }
        Ok(())
    }

    pub fn lookup(&self, text: &str) -> Option<&CatalogEntry> {
        self.index.get(text).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, text: &str) -> bool {
        self.index.contains_key(text)
    }

    /// Triggers in configured order.
    pub fn triggers(&self) -> impl Iterator<Item = &Trigger> {
        self.entries.iter().map(|e| &e.trigger)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
