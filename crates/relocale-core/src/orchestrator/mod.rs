//! Page orchestrator: fetch → rewrite → update, one page at a time.
//!
//! Each page is a failure boundary: a fetch or update error is logged,
//! recorded in the summary, and the next page proceeds. Nothing is retried at
//! this level, and pages are never processed concurrently.

mod summary;

use std::num::NonZeroUsize;

use crate::cms::{CmsClient, PageUpdate};
use crate::rewrite::{RewriteEngine, Rewritten};

pub use summary::{BatchedRunSummary, PageError, PageOutcome, PageResult, PageState, RunSummary};

/// Drives pages through the rewrite engine against one CMS.
///
/// Holds everything a run needs by reference; there is no global state.
pub struct Orchestrator<'a, C> {
    cms: &'a C,
    engine: &'a RewriteEngine<'a>,
}

impl<'a, C: CmsClient> Orchestrator<'a, C> {
    pub fn new(cms: &'a C, engine: &'a RewriteEngine<'a>) -> Self {
        Self { cms, engine }
    }

    /// Processes one page. Errors are logged and returned, never propagated
    /// as a failure of the caller.
    pub async fn process_page(&self, page_id: &str) -> PageOutcome {
        tracing::debug!(page_id, state = %PageState::Fetching, "page state");
        let page = match self.cms.get_by_id(page_id).await {
            Ok(page) => page,
            Err(e) => {
                tracing::error!(page_id, state = %PageState::Failed, error = %e, "error processing page");
                return Err(e.into());
            }
        };

        tracing::debug!(page_id, state = %PageState::Rewriting, "page state");
        let Rewritten { content, report } = self.engine.rewrite(&page.content);

        tracing::debug!(page_id, state = %PageState::Updating, "page state");
        if let Err(e) = self.cms.update(page_id, &PageUpdate { content }).await {
            tracing::error!(page_id, state = %PageState::Failed, error = %e, "error processing page");
            return Err(e.into());
        }

        tracing::info!(
            page_id,
            state = %PageState::Done,
            links_before = report.links_before,
            links_after = report.links_after,
            images_before = report.images_before,
            images_after = report.images_after,
            links_replaced = report.links_replaced(),
            images_replaced = report.images_replaced(),
            "processed page"
        );
        Ok(report)
    }

    /// Processes pages strictly in order; every page is attempted.
    pub async fn run<S: AsRef<str>>(&self, page_ids: &[S]) -> RunSummary {
        let mut summary = RunSummary::default();
        for id in page_ids {
            let id = id.as_ref();
            let outcome = self.process_page(id).await;
            summary.record(id, outcome);
        }
        summary
    }

    /// Splits `page_ids` into consecutive chunks of `batch_size` (the last may
    /// be shorter) and runs them one after another.
    pub async fn run_batched<S: AsRef<str>>(
        &self,
        page_ids: &[S],
        batch_size: NonZeroUsize,
    ) -> BatchedRunSummary {
        let total_batches = page_ids.len().div_ceil(batch_size.get());
        let mut batched = BatchedRunSummary::default();
        for (index, chunk) in page_ids.chunks(batch_size.get()).enumerate() {
            tracing::info!(batch = index + 1, total_batches, pages = chunk.len(), "starting batch");
            let summary = self.run(chunk).await;
            tracing::info!(
                batch = index + 1,
                succeeded = summary.succeeded(),
                failed = summary.len() - summary.succeeded(),
                "finished batch"
            );
            batched.batches.push(summary);
        }
        batched
    }
}
