//! Content rewriting: link and image substitution over raw markup.
//!
//! Markup is treated as text. Mappings are regexes matched case-insensitively
//! and applied in declaration order; see [`RewriteMode`] for the alternative
//! simultaneous mode.

mod engine;
mod image;
mod link;
mod substitute;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use engine::{RewriteEngine, RewriteReport, Rewritten};
pub use image::{is_absolute_url, resolve_image_reference, rewrite_images};
pub use link::rewrite_links;
pub use substitute::{substitute, substitute_each, Rule, SinglePass, Span, Substitution};

/// How a mapping table is applied to content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RewriteMode {
    /// Each mapping rewrites the output of the previous one.
    #[default]
    Sequential,
    /// All mappings of a table match against the original text at once.
    SinglePass,
}

impl fmt::Display for RewriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewriteMode::Sequential => write!(f, "sequential"),
            RewriteMode::SinglePass => write!(f, "single-pass"),
        }
    }
}

impl FromStr for RewriteMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(RewriteMode::Sequential),
            "single-pass" | "single_pass" | "singlepass" => Ok(RewriteMode::SinglePass),
            other => Err(format!(
                "unknown rewrite mode {other:?} (expected \"sequential\" or \"single-pass\")"
            )),
        }
    }
}
