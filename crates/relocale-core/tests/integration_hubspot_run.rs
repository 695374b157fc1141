//! Integration test: local CMS stand-in, HubSpot client, full batched run.
//!
//! Loads mappings from CSV files, runs the orchestrator against the local
//! server, and checks what the server received.

mod common;

use std::collections::BTreeMap;
use std::io::Write;
use std::num::NonZeroUsize;
use std::time::Duration;

use common::cms_server::{self, ServerState};
use relocale_core::cms::{CmsClient, CmsError, HubSpotClient, RetryPolicy};
use relocale_core::mapping::MappingStore;
use relocale_core::orchestrator::{Orchestrator, PageError};
use relocale_core::rewrite::{RewriteEngine, RewriteMode};

const TOKEN: &str = "test-token";

fn csv_file(body: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(body.as_bytes()).unwrap();
    f.flush().unwrap();
    f
}

fn no_wait_retries(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay: Duration::ZERO,
        max_delay: Duration::ZERO,
    }
}

fn pages(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(id, content)| (id.to_string(), content.to_string()))
        .collect()
}

#[tokio::test]
async fn batched_run_rewrites_pages_and_isolates_failures() {
    let server = cms_server::start(
        TOKEN,
        ServerState {
            pages: pages(&[
                ("A", r#"<a href="https://www.example.com/page">EXAMPLE</a>"#),
                ("C", r#"<img src="/path/to/image.jpg" alt="Image">"#),
                ("D", r#"<img src="/img/logo.png">"#),
            ]),
            ..ServerState::default()
        },
    );

    let links = csv_file(
        "englishPattern,quebecFrenchReplacement,domain\n\
         example,exemple,example\n",
    );
    let images = csv_file(
        "originalPattern,localizedReplacement,alt\n\
         image\\.jpg,image-fr.jpg,Image\n\
         logo\\.png,https://cdn.example.com/logo-fr.png,Logo\n",
    );
    let store = MappingStore::load(links.path(), images.path()).unwrap();
    let engine = RewriteEngine::new(&store, RewriteMode::Sequential).unwrap();
    let client = HubSpotClient::new(&server.base_url, TOKEN)
        .unwrap()
        .with_retry_policy(no_wait_retries(1));
    let orch = Orchestrator::new(&client, &engine);

    let ids = ["A", "B", "C", "D"];
    let batched = orch.run_batched(&ids, NonZeroUsize::new(3).unwrap()).await;

    assert_eq!(batched.batches.len(), 2);
    assert_eq!(batched.total(), 4);
    assert_eq!(batched.succeeded(), 3);
    let failed: Vec<&str> = batched.failed().map(|(id, _)| id).collect();
    assert_eq!(failed, vec!["B"]);
    match batched.failed().next().map(|(_, e)| e) {
        Some(PageError::Fetch(e)) => {
            assert!(matches!(e.source, CmsError::Http { status: 404, .. }))
        }
        other => panic!("expected fetch error for B, got {other:?}"),
    }

    assert_eq!(
        server.updates(),
        vec![
            (
                "A".to_string(),
                r#"<a href="https://www.exemple.com/page">EXEMPLE</a>"#.to_string()
            ),
            (
                "C".to_string(),
                r#"<img src="/path/to/image-fr.jpg" alt="Image">"#.to_string()
            ),
            (
                "D".to_string(),
                r#"<img src="https://cdn.example.com/logo-fr.png">"#.to_string()
            ),
        ]
    );
}

#[tokio::test]
async fn listing_follows_paging_cursor() {
    let server = cms_server::start(
        TOKEN,
        ServerState {
            pages: pages(&[("p1", ""), ("p2", ""), ("p3", ""), ("p4", ""), ("p5", "")]),
            list_page_size: 2,
            ..ServerState::default()
        },
    );
    let client = HubSpotClient::new(&server.base_url, TOKEN).unwrap();
    let ids = client.list_page_ids().await.unwrap();
    assert_eq!(ids, vec!["p1", "p2", "p3", "p4", "p5"]);
}

#[tokio::test]
async fn throttled_fetch_is_retried_by_the_client() {
    let mut state = ServerState {
        pages: pages(&[("flaky", "<p>ok</p>")]),
        ..ServerState::default()
    };
    state.flaky.insert("flaky".to_string(), 1);
    let server = cms_server::start(TOKEN, state);

    let client = HubSpotClient::new(&server.base_url, TOKEN)
        .unwrap()
        .with_retry_policy(no_wait_retries(3));
    let page = client.get_by_id("flaky").await.unwrap();
    assert_eq!(page.content, "<p>ok</p>");
}

#[tokio::test]
async fn throttled_fetch_without_retries_fails() {
    let mut state = ServerState {
        pages: pages(&[("flaky", "<p>ok</p>")]),
        ..ServerState::default()
    };
    state.flaky.insert("flaky".to_string(), 1);
    let server = cms_server::start(TOKEN, state);

    let client = HubSpotClient::new(&server.base_url, TOKEN)
        .unwrap()
        .with_retry_policy(RetryPolicy::none());
    let err = client.get_by_id("flaky").await.unwrap_err();
    assert_eq!(err.page_id, "flaky");
    assert!(matches!(err.source, CmsError::Http { status: 503, .. }));
}

#[tokio::test]
async fn rejected_update_is_a_page_error_and_later_pages_continue() {
    let mut state = ServerState {
        pages: pages(&[("x", "example"), ("y", "example")]),
        ..ServerState::default()
    };
    state.reject_updates.insert("x".to_string());
    let server = cms_server::start(TOKEN, state);

    let links = csv_file("source_pattern,replacement\nexample,exemple\n");
    let images = csv_file("originalPattern,localizedReplacement\n");
    let store = MappingStore::load(links.path(), images.path()).unwrap();
    let engine = RewriteEngine::new(&store, RewriteMode::SinglePass).unwrap();
    let client = HubSpotClient::new(&server.base_url, TOKEN)
        .unwrap()
        .with_retry_policy(no_wait_retries(2));
    let orch = Orchestrator::new(&client, &engine);

    let summary = orch.run(&["x", "y"]).await;
    assert!(matches!(
        summary.pages()[0].outcome,
        Err(PageError::Update(_))
    ));
    assert!(summary.pages()[1].outcome.is_ok());
    assert_eq!(server.updates(), vec![("y".to_string(), "exemple".to_string())]);
}

#[tokio::test]
async fn wrong_token_fails_fetch() {
    let server = cms_server::start(
        TOKEN,
        ServerState {
            pages: pages(&[("A", "x")]),
            ..ServerState::default()
        },
    );
    let client = HubSpotClient::new(&server.base_url, "wrong").unwrap();
    let err = client.get_by_id("A").await.unwrap_err();
    assert!(matches!(err.source, CmsError::Http { status: 401, .. }));
}
