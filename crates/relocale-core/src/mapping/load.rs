//! CSV ingestion for mapping tables.
//!
//! Link tables use the columns `englishPattern,quebecFrenchReplacement,domain`
//! (or `source_pattern,replacement,domain`). Image tables use
//! `originalPattern,localizedReplacement` (or `source_pattern,replacement`);
//! every other image column is kept as metadata.

use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use super::{ImageMapping, LinkMapping, PatternError};

const LINK_PATTERN: &[&str] = &["englishPattern", "source_pattern", "sourcePattern"];
const LINK_REPLACEMENT: &[&str] = &["quebecFrenchReplacement", "replacement"];
const LINK_DOMAIN: &[&str] = &["domain"];
const IMAGE_PATTERN: &[&str] = &["originalPattern", "source_pattern", "sourcePattern"];
const IMAGE_REPLACEMENT: &[&str] = &["localizedReplacement", "replacement"];

/// Failure to build a mapping table. Always fatal for the run.
#[derive(Debug, thiserror::Error)]
pub enum MappingLoadError {
    #[error("open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("read {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{}: missing column {column:?}", path.display())]
    MissingColumn { path: PathBuf, column: &'static str },
    #[error("{} line {line}: {source}", path.display())]
    Pattern {
        path: PathBuf,
        line: u64,
        #[source]
        source: PatternError,
    },
}

/// A CSV table whose header row has been read.
struct Table<R> {
    path: PathBuf,
    headers: StringRecord,
    rdr: csv::Reader<R>,
}

impl<R: Read> Table<R> {
    /// Header names are trimmed; field values are kept byte for byte.
    fn new(reader: R, path: &Path) -> Result<Self, MappingLoadError> {
        let mut rdr = ReaderBuilder::new().trim(Trim::Headers).from_reader(reader);
        let headers = rdr
            .headers()
            .map_err(|source| MappingLoadError::Csv {
                path: path.to_path_buf(),
                source,
            })?
            .clone();
        Ok(Self {
            path: path.to_path_buf(),
            headers,
            rdr,
        })
    }

    /// Index of the first header matching one of `names` (ASCII case-insensitive).
    fn find(&self, names: &[&str]) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
    }

    fn require(&self, names: &[&'static str]) -> Result<usize, MappingLoadError> {
        self.find(names).ok_or_else(|| MappingLoadError::MissingColumn {
            path: self.path.clone(),
            column: names[0],
        })
    }

    fn rows<T, F>(mut self, mut build: F) -> Result<Vec<T>, MappingLoadError>
    where
        F: FnMut(&StringRecord) -> Result<T, PatternError>,
    {
        let mut out = Vec::new();
        for record in self.rdr.records() {
            let record = record.map_err(|source| MappingLoadError::Csv {
                path: self.path.clone(),
                source,
            })?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            let item = build(&record).map_err(|source| MappingLoadError::Pattern {
                path: self.path.clone(),
                line,
                source,
            })?;
            out.push(item);
        }
        Ok(out)
    }
}

fn open(path: &Path) -> Result<File, MappingLoadError> {
    File::open(path).map_err(|source| MappingLoadError::Open {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads link mappings from CSV; `path` names the source in errors.
pub fn read_link_mappings<R: Read>(
    reader: R,
    path: &Path,
) -> Result<Vec<LinkMapping>, MappingLoadError> {
    let table = Table::new(reader, path)?;
    let pattern = table.require(LINK_PATTERN)?;
    let replacement = table.require(LINK_REPLACEMENT)?;
    let domain = table.find(LINK_DOMAIN);
    table.rows(|rec| {
        LinkMapping::new(
            rec.get(pattern).unwrap_or_default(),
            rec.get(replacement).unwrap_or_default(),
            domain.and_then(|d| rec.get(d)).unwrap_or_default(),
        )
    })
}

/// Reads image mappings from CSV; `path` names the source in errors.
pub fn read_image_mappings<R: Read>(
    reader: R,
    path: &Path,
) -> Result<Vec<ImageMapping>, MappingLoadError> {
    let table = Table::new(reader, path)?;
    let pattern = table.require(IMAGE_PATTERN)?;
    let replacement = table.require(IMAGE_REPLACEMENT)?;
    let headers = table.headers.clone();
    table.rows(|rec| {
        let metadata: BTreeMap<String, String> = headers
            .iter()
            .zip(rec.iter())
            .enumerate()
            .filter(|(i, _)| *i != pattern && *i != replacement)
            .map(|(_, (k, v))| (k.to_string(), v.to_string()))
            .collect();
        ImageMapping::new(
            rec.get(pattern).unwrap_or_default(),
            rec.get(replacement).unwrap_or_default(),
            metadata,
        )
    })
}

/// Loads link mappings from a CSV file.
pub fn load_link_mappings(path: &Path) -> Result<Vec<LinkMapping>, MappingLoadError> {
    read_link_mappings(open(path)?, path)
}

/// Loads image mappings from a CSV file.
pub fn load_image_mappings(path: &Path) -> Result<Vec<ImageMapping>, MappingLoadError> {
    read_image_mappings(open(path)?, path)
}
