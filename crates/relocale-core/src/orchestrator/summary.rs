//! Per-page outcomes and run summaries.

use std::fmt;

use crate::cms::{FetchError, UpdateError};
use crate::rewrite::RewriteReport;

/// Lifecycle of one page. `Failed` is reachable from `Fetching` and `Updating`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Fetching,
    Rewriting,
    Updating,
    Done,
    Failed,
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PageState::Fetching => "fetching",
            PageState::Rewriting => "rewriting",
            PageState::Updating => "updating",
            PageState::Done => "done",
            PageState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Why a page failed. Page-scoped; never aborts a run.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// The rewritten content may or may not have reached the CMS.
    #[error(transparent)]
    Update(#[from] UpdateError),
}

impl PageError {
    /// State the page was in when it failed.
    pub fn failed_in(&self) -> PageState {
        match self {
            PageError::Fetch(_) => PageState::Fetching,
            PageError::Update(_) => PageState::Updating,
        }
    }
}

pub type PageOutcome = Result<RewriteReport, PageError>;

#[derive(Debug)]
pub struct PageResult {
    pub page_id: String,
    pub outcome: PageOutcome,
}

/// Outcome of every page in one `run` call, in processing order.
#[derive(Debug, Default)]
pub struct RunSummary {
    pages: Vec<PageResult>,
}

impl RunSummary {
    pub(crate) fn record(&mut self, page_id: &str, outcome: PageOutcome) {
        self.pages.push(PageResult {
            page_id: page_id.to_string(),
            outcome,
        });
    }

    pub fn pages(&self) -> &[PageResult] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.pages.iter().filter(|p| p.outcome.is_ok()).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &PageError)> {
        self.pages.iter().filter_map(|p| match &p.outcome {
            Ok(_) => None,
            Err(e) => Some((p.page_id.as_str(), e)),
        })
    }

    pub fn failed_ids(&self) -> Vec<&str> {
        self.failed().map(|(id, _)| id).collect()
    }
}

/// One [`RunSummary`] per chunk, in chunk order.
#[derive(Debug, Default)]
pub struct BatchedRunSummary {
    pub batches: Vec<RunSummary>,
}

impl BatchedRunSummary {
    pub fn pages(&self) -> impl Iterator<Item = &PageResult> {
        self.batches.iter().flat_map(|b| b.pages.iter())
    }

    pub fn total(&self) -> usize {
        self.batches.iter().map(RunSummary::len).sum()
    }

    pub fn succeeded(&self) -> usize {
        self.batches.iter().map(RunSummary::succeeded).sum()
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &PageError)> {
        self.batches.iter().flat_map(RunSummary::failed)
    }

    pub fn failed_count(&self) -> usize {
        self.failed().count()
    }
}
