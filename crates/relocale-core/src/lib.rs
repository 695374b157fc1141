//! relocale: rewrite locale-specific links and images in CMS pages.
//!
//! Flow: [`mapping::MappingStore`] is loaded once, a
//! [`rewrite::RewriteEngine`] is built over it, and an
//! [`orchestrator::Orchestrator`] pushes pages from a [`cms::CmsClient`]
//! through the engine one at a time.

pub mod config;
pub mod logging;

pub mod cms;
pub mod mapping;
pub mod orchestrator;
pub mod rewrite;
