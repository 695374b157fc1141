//! Mapping store: ordered link and image mapping tables.
//!
//! Patterns are compiled once when a mapping is built, case-insensitive, so a
//! malformed table fails the run before any page is touched. The store is
//! read-only after construction and is shared by reference with the rewrite
//! engine.

mod load;

use regex::{Regex, RegexBuilder};
use std::collections::BTreeMap;
use std::path::Path;

pub use load::{load_image_mappings, load_link_mappings, read_image_mappings, read_link_mappings};
pub use load::MappingLoadError;

/// Why a source pattern was rejected.
#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    #[error("source pattern is empty")]
    Empty,
    #[error("invalid source pattern: {0}")]
    Invalid(#[from] regex::Error),
}

/// Compiles a mapping pattern with the flags every mapping uses.
pub(crate) fn compile_pattern(pattern: &str) -> Result<Regex, PatternError> {
    if pattern.is_empty() {
        return Err(PatternError::Empty);
    }
    Ok(RegexBuilder::new(pattern).case_insensitive(true).build()?)
}

/// Rewrites a locale-specific link reference.
#[derive(Debug, Clone)]
pub struct LinkMapping {
    source_pattern: String,
    replacement: String,
    /// Informational only; never used for matching.
    domain: String,
    regex: Regex,
}

impl LinkMapping {
    pub fn new(
        source_pattern: impl Into<String>,
        replacement: impl Into<String>,
        domain: impl Into<String>,
    ) -> Result<Self, PatternError> {
        let source_pattern = source_pattern.into();
        let regex = compile_pattern(&source_pattern)?;
        Ok(Self {
            source_pattern,
            replacement: replacement.into(),
            domain: domain.into(),
            regex,
        })
    }

    pub fn source_pattern(&self) -> &str {
        &self.source_pattern
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }
}

/// Rewrites an embedded image reference, either to an absolute URL or to a
/// sibling filename in the same directory.
#[derive(Debug, Clone)]
pub struct ImageMapping {
    source_pattern: String,
    replacement: String,
    metadata: BTreeMap<String, String>,
    regex: Regex,
}

impl ImageMapping {
    pub fn new(
        source_pattern: impl Into<String>,
        replacement: impl Into<String>,
        metadata: BTreeMap<String, String>,
    ) -> Result<Self, PatternError> {
        let source_pattern = source_pattern.into();
        let regex = compile_pattern(&source_pattern)?;
        Ok(Self {
            source_pattern,
            replacement: replacement.into(),
            metadata,
            regex,
        })
    }

    pub fn source_pattern(&self) -> &str {
        &self.source_pattern
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }
}

/// Link and image mappings for one run, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct MappingStore {
    links: Vec<LinkMapping>,
    images: Vec<ImageMapping>,
}

impl MappingStore {
    pub fn new(links: Vec<LinkMapping>, images: Vec<ImageMapping>) -> Self {
        Self { links, images }
    }

    /// Loads both tables from CSV files. Either failure aborts the load.
    pub fn load(link_path: &Path, image_path: &Path) -> Result<Self, MappingLoadError> {
        let links = load_link_mappings(link_path)?;
        tracing::info!(count = links.len(), path = %link_path.display(), "link mappings loaded");
        let images = load_image_mappings(image_path)?;
        tracing::info!(count = images.len(), path = %image_path.display(), "image mappings loaded");
        Ok(Self::new(links, images))
    }

    pub fn links(&self) -> &[LinkMapping] {
        &self.links
    }

    pub fn images(&self) -> &[ImageMapping] {
        &self.images
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty() && self.images.is_empty()
    }
}
