//! Content rewrite engine: links first, then images, with a marker report.

use serde::Serialize;

use super::image::rewrite_images;
use super::link::rewrite_links;
use super::substitute::{substitute, SinglePass};
use super::RewriteMode;
use crate::mapping::{ImageMapping, LinkMapping, MappingStore};

const LINK_MARKER: &str = "href";
const IMAGE_MARKER: &str = "<img";

/// Marker counts before and after rewriting one page.
///
/// Counts are occurrences of the literal `href` and `<img` (case-sensitive),
/// not matches. A rewrite that keeps its marker text leaves the count
/// unchanged, so `*_replaced` is an estimate of replacement volume, not an
/// exact number, and is usually zero for link rewrites that only change the
/// URL inside an `href`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RewriteReport {
    pub links_before: usize,
    pub links_after: usize,
    pub images_before: usize,
    pub images_after: usize,
}

impl RewriteReport {
    pub fn links_replaced(&self) -> i64 {
        self.links_before as i64 - self.links_after as i64
    }

    pub fn images_replaced(&self) -> i64 {
        self.images_before as i64 - self.images_after as i64
    }
}

/// Rewritten content plus its report.
#[derive(Debug, Clone)]
pub struct Rewritten {
    pub content: String,
    pub report: RewriteReport,
}

/// Applies a [`MappingStore`] to page content.
pub struct RewriteEngine<'a> {
    store: &'a MappingStore,
    mode: RewriteMode,
    single_pass: Option<(SinglePass<'a, LinkMapping>, SinglePass<'a, ImageMapping>)>,
}

impl<'a> RewriteEngine<'a> {
    /// Builds an engine. In single-pass mode the tables are combined here; a
    /// combined pattern that exceeds regex limits is an error.
    pub fn new(store: &'a MappingStore, mode: RewriteMode) -> Result<Self, regex::Error> {
        let single_pass = match mode {
            RewriteMode::Sequential => None,
            RewriteMode::SinglePass => Some((
                SinglePass::new(store.links())?,
                SinglePass::new(store.images())?,
            )),
        };
        Ok(Self {
            store,
            mode,
            single_pass,
        })
    }

    pub fn mode(&self) -> RewriteMode {
        self.mode
    }

    pub fn store(&self) -> &MappingStore {
        self.store
    }

    /// Rewrites links, then images. The order is fixed.
    pub fn rewrite(&self, content: &str) -> Rewritten {
        let links_before = content.matches(LINK_MARKER).count();
        let images_before = content.matches(IMAGE_MARKER).count();

        let rewritten = match &self.single_pass {
            None => {
                let linked = rewrite_links(content, self.store.links());
                rewrite_images(&linked, self.store.images())
            }
            Some((links, images)) => substitute(&substitute(content, links), images),
        };

        let report = RewriteReport {
            links_before,
            links_after: rewritten.matches(LINK_MARKER).count(),
            images_before,
            images_after: rewritten.matches(IMAGE_MARKER).count(),
        };
        Rewritten {
            content: rewritten,
            report,
        }
    }
}
