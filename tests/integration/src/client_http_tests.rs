//! KnowledgeClient against the fake HTTP API.
//!
//! Covers paging, retry and error mapping over a real socket. Retry delays go
//! through a ManualClock so no test actually sleeps.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use kb_remote::{
    ClientOptions, DatasetDirectory, Error, IndexingOptions, IndexingTechnique, KnowledgeClient,
    KnowledgeStore,
};
use kb_test_utils::{FAKE_API_KEY, FakeKnowledgeApi, ManualClock};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

async fn within_deadline<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(10), future)
        .await
        .expect("test exceeded its deadline")
}

fn client(base_url: &str, clock: &Arc<ManualClock>) -> KnowledgeClient {
    let options = ClientOptions::new(base_url, FAKE_API_KEY)
        .with_retry(3, Duration::from_secs(1))
        .with_no_proxy();
    KnowledgeClient::with_clock(options, clock.clone()).unwrap()
}

#[tokio::test]
async fn listing_follows_pages() {
    within_deadline(async {
        let (base_url, state) = FakeKnowledgeApi::spawn().await;
        let dataset_id = state.add_dataset("handbook").await;
        for i in 0..5 {
            state
                .add_document(&dataset_id, &format!("doc-{i}.md"), "text", None)
                .await;
        }

        let clock = Arc::new(ManualClock::new());
        let options = ClientOptions::new(&base_url, FAKE_API_KEY)
            .with_page_size(2)
            .with_no_proxy();
        let client = KnowledgeClient::with_clock(options, clock.clone()).unwrap();

        let docs = client.list_documents(&dataset_id).await.unwrap();
        let names: Vec<_> = docs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["doc-0.md", "doc-1.md", "doc-2.md", "doc-3.md", "doc-4.md"]);

        let queries: Vec<_> = state
            .recorded()
            .await
            .into_iter()
            .filter(|r| r.path.ends_with("/documents"))
            .filter_map(|r| r.query)
            .collect();
        assert_eq!(
            queries,
            ["page=1&limit=2", "page=2&limit=2", "page=3&limit=2"]
        );
    })
    .await;
}

#[tokio::test]
async fn base_url_with_v1_suffix_is_normalized() {
    within_deadline(async {
        let (base_url, state) = FakeKnowledgeApi::spawn().await;
        state.add_dataset("handbook").await;

        let clock = Arc::new(ManualClock::new());
        let client = client(&format!("{base_url}/v1/"), &clock);
        let datasets = client.list_datasets().await.unwrap();

        assert_eq!(datasets.len(), 1);
        assert_eq!(datasets[0].name, "handbook");
        assert_eq!(state.count("GET", "/v1/datasets").await, 1);
    })
    .await;
}

#[tokio::test]
async fn sends_bearer_credential() {
    within_deadline(async {
        let (base_url, state) = FakeKnowledgeApi::spawn().await;
        let clock = Arc::new(ManualClock::new());
        client(&base_url, &clock).list_datasets().await.unwrap();

        let recorded = state.recorded().await;
        assert_eq!(
            recorded[0].authorization.as_deref(),
            Some(format!("Bearer {FAKE_API_KEY}").as_str())
        );
    })
    .await;
}

#[tokio::test]
async fn rejected_credential_is_not_retried() {
    within_deadline(async {
        let (base_url, state) = FakeKnowledgeApi::spawn().await;
        let clock = Arc::new(ManualClock::new());
        let options = ClientOptions::new(&base_url, "wrong-key").with_no_proxy();
        let client = KnowledgeClient::with_clock(options, clock.clone()).unwrap();

        let err = client.list_datasets().await.unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert!(!err.is_transient());
        assert_eq!(state.recorded().await.len(), 1);
        assert!(clock.sleeps().is_empty());
    })
    .await;
}

#[tokio::test]
async fn server_errors_retry_with_linear_delay() {
    within_deadline(async {
        let (base_url, state) = FakeKnowledgeApi::spawn().await;
        state.add_dataset("handbook").await;
        state.fail_next(503, 2).await;

        let clock = Arc::new(ManualClock::new());
        let datasets = client(&base_url, &clock).list_datasets().await.unwrap();

        assert_eq!(datasets.len(), 1);
        assert_eq!(state.count("GET", "/datasets").await, 3);
        assert_eq!(
            clock.sleeps(),
            [Duration::from_secs(1), Duration::from_secs(2)]
        );
    })
    .await;
}

#[tokio::test]
async fn retries_stop_after_max_attempts() {
    within_deadline(async {
        let (base_url, state) = FakeKnowledgeApi::spawn().await;
        state.fail_next(500, 5).await;

        let clock = Arc::new(ManualClock::new());
        let err = client(&base_url, &clock).list_datasets().await.unwrap_err();

        assert_eq!(err.status(), Some(500));
        assert_eq!(state.recorded().await.len(), 3);
        assert_eq!(clock.sleeps().len(), 2);
    })
    .await;
}

#[tokio::test]
async fn client_errors_fail_immediately() {
    within_deadline(async {
        let (base_url, state) = FakeKnowledgeApi::spawn().await;
        state.fail_next(400, 1).await;

        let clock = Arc::new(ManualClock::new());
        let err = client(&base_url, &clock).list_datasets().await.unwrap_err();

        match err {
            Error::Api {
                status,
                message,
                body,
            } => {
                assert_eq!(status, 400);
                assert_eq!(message, "API error: 400 Bad Request");
                assert_eq!(body["code"], "injected_failure");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
        assert_eq!(state.recorded().await.len(), 1);
        assert!(clock.sleeps().is_empty());
    })
    .await;
}

#[tokio::test]
async fn non_json_error_body_is_kept_as_text() {
    within_deadline(async {
        let (base_url, state) = FakeKnowledgeApi::spawn().await;
        state.fail_next_with_text(502, "upstream unavailable").await;

        let clock = Arc::new(ManualClock::new());
        let options = ClientOptions::new(&base_url, FAKE_API_KEY)
            .with_retry(1, Duration::from_secs(1))
            .with_no_proxy();
        let client = KnowledgeClient::with_clock(options, clock.clone()).unwrap();

        match client.list_datasets().await.unwrap_err() {
            Error::Api { status, body, .. } => {
                assert_eq!(status, 502);
                assert_eq!(body, Value::String("upstream unavailable".to_string()));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    })
    .await;
}

#[tokio::test]
async fn create_sends_metadata_and_indexing_options() {
    within_deadline(async {
        let (base_url, state) = FakeKnowledgeApi::spawn().await;
        let dataset_id = state.add_dataset("handbook").await;

        let clock = Arc::new(ManualClock::new());
        let store: Arc<dyn KnowledgeStore> = Arc::new(client(&base_url, &clock));
        let directory = DatasetDirectory::new(store, &dataset_id);
        let options = IndexingOptions {
            technique: IndexingTechnique::Economy,
            ..IndexingOptions::default()
        };

        let created = directory
            .create("intro.md", "# Intro", "abc123", &options)
            .await
            .unwrap();
        assert_eq!(created.name, "intro.md");
        assert_eq!(created.stored_fingerprint.as_deref(), Some("abc123"));

        let stored = state.document_named(&dataset_id, "intro.md").await.unwrap();
        assert_eq!(stored.text, "# Intro");
        assert_eq!(stored.indexing_technique.as_deref(), Some("economy"));
        assert_eq!(stored.process_rule, Some(json!({ "mode": "automatic" })));
        let metadata = stored.doc_metadata.unwrap();
        assert_eq!(metadata["source_hash"], "abc123");
        assert!(metadata["synced_at"].is_string());
    })
    .await;
}

#[tokio::test]
async fn update_replaces_text_and_fingerprint() {
    within_deadline(async {
        let (base_url, state) = FakeKnowledgeApi::spawn().await;
        let dataset_id = state.add_dataset("handbook").await;
        let doc_id = state
            .add_document(&dataset_id, "intro.md", "old", Some("old-hash"))
            .await;

        let clock = Arc::new(ManualClock::new());
        let store: Arc<dyn KnowledgeStore> = Arc::new(client(&base_url, &clock));
        let directory = DatasetDirectory::new(store, &dataset_id);

        let updated = directory
            .update(&doc_id, "intro.md", "new", "new-hash")
            .await
            .unwrap();
        assert_eq!(updated.id, doc_id);

        let stored = state.document_named(&dataset_id, "intro.md").await.unwrap();
        assert_eq!(stored.text, "new");
        assert_eq!(stored.doc_metadata.unwrap()["source_hash"], "new-hash");
    })
    .await;
}

#[tokio::test]
async fn delete_accepts_empty_response() {
    within_deadline(async {
        let (base_url, state) = FakeKnowledgeApi::spawn().await;
        let dataset_id = state.add_dataset("handbook").await;
        let doc_id = state.add_document(&dataset_id, "gone.md", "x", None).await;

        let clock = Arc::new(ManualClock::new());
        client(&base_url, &clock)
            .delete_document(&dataset_id, &doc_id)
            .await
            .unwrap();

        assert!(state.documents_of(&dataset_id).await.is_empty());
    })
    .await;
}

#[tokio::test]
async fn deleting_unknown_document_is_not_found() {
    within_deadline(async {
        let (base_url, state) = FakeKnowledgeApi::spawn().await;
        let dataset_id = state.add_dataset("handbook").await;

        let clock = Arc::new(ManualClock::new());
        let err = client(&base_url, &clock)
            .delete_document(&dataset_id, "missing")
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(404));
        assert_eq!(state.recorded().await.len(), 1);
    })
    .await;
}
