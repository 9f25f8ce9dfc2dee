//! Full sync runs: config file, local folders, HTTP client and indexing
//! monitor wired together against the fake API.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use kb_core::{FailedOperation, SyncConfig, SyncEngine, SyncResult};
use kb_remote::{ClientOptions, KnowledgeClient, KnowledgeStore};
use kb_test_utils::{FAKE_API_KEY, FakeKnowledgeApi, FakeState, KnowledgeDir, ManualClock};
use pretty_assertions::assert_eq;

async fn within_deadline<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(10), future)
        .await
        .expect("test exceeded its deadline")
}

struct Harness {
    dir: KnowledgeDir,
    state: Arc<FakeState>,
    clock: Arc<ManualClock>,
    store: Arc<dyn KnowledgeStore>,
}

impl Harness {
    async fn start() -> Self {
        let (base_url, state) = FakeKnowledgeApi::spawn().await;
        let clock = Arc::new(ManualClock::new());
        let options = ClientOptions::new(&base_url, FAKE_API_KEY).with_no_proxy();
        let store: Arc<dyn KnowledgeStore> =
            Arc::new(KnowledgeClient::with_clock(options, clock.clone()).unwrap());

        Self {
            dir: KnowledgeDir::new(),
            state,
            clock,
            store,
        }
    }

    /// Write `config`, load it, and sync every dataset it names.
    async fn run(&self, config: &str) -> Vec<SyncResult> {
        let path = self.dir.write_config("kb-sync.yaml", config);
        let config = SyncConfig::load(&path).unwrap();
        let engine =
            SyncEngine::from_settings(self.store.clone(), self.clock.clone(), &config.settings);
        engine.run(&config.datasets).await
    }
}

const HANDBOOK: &str = r#"
settings:
  poll_interval_secs: 2
  indexing_timeout_secs: 5
datasets:
  - path: handbook
    dataset_name: handbook
"#;

#[tokio::test]
async fn lifecycle_create_skip_update_delete() {
    within_deadline(async {
        let h = Harness::start().await;
        let dataset_id = h.state.add_dataset("handbook").await;
        h.state.set_pending_polls(1);
        h.dir.write_doc("handbook", "intro.md", "# Intro");
        h.dir.write_doc("handbook", "setup.md", "# Setup");

        let first = h.run(HANDBOOK).await;
        assert_eq!(first[0].created, 2);
        assert!(first[0].errors.is_empty());
        assert_eq!(first[0].dataset_id.as_deref(), Some(dataset_id.as_str()));
        assert_eq!(h.clock.sleeps(), [Duration::from_secs(2)]);

        let intro = h.state.document_named(&dataset_id, "intro.md").await.unwrap();
        assert_eq!(
            intro.doc_metadata.unwrap()["source_hash"],
            kb_fs::fingerprint("# Intro")
        );

        let writes_before = h.state.count("POST", "_by_text").await;
        let second = h.run(HANDBOOK).await;
        assert_eq!(second[0].skipped, 2);
        assert_eq!(second[0].total_processed(), 2);
        assert_eq!(h.state.count("POST", "_by_text").await, writes_before);

        h.dir.write_doc("handbook", "intro.md", "# Intro, revised");
        h.dir.remove_doc("handbook", "setup.md");
        let third = h.run(HANDBOOK).await;
        assert_eq!(
            (third[0].created, third[0].updated, third[0].deleted, third[0].skipped),
            (0, 1, 1, 0)
        );

        let docs = h.state.documents_of(&dataset_id).await;
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].text, "# Intro, revised");
        assert_eq!(
            docs[0].doc_metadata.as_ref().unwrap()["source_hash"],
            kb_fs::fingerprint("# Intro, revised")
        );
    })
    .await;
}

#[tokio::test]
async fn creates_missing_dataset_over_http() {
    within_deadline(async {
        let config = r#"
datasets:
  - path: faq
    dataset_name: faq
    create_if_missing: true
    indexing_technique: economy
"#;
        let h = Harness::start().await;
        h.dir.write_doc("faq", "billing.md", "# Billing");

        let results = h.run(config).await;
        assert!(results[0].errors.is_empty(), "{:?}", results[0].errors);
        assert_eq!(results[0].created, 1);

        let datasets = h.state.datasets.read().await.clone();
        assert_eq!(datasets.len(), 1);
        assert_eq!(datasets[0].name, "faq");
        assert_eq!(datasets[0].indexing_technique.as_deref(), Some("economy"));
        assert_eq!(results[0].dataset_id.as_deref(), Some(datasets[0].id.as_str()));

        let doc = h
            .state
            .document_named(&datasets[0].id, "billing.md")
            .await
            .unwrap();
        assert_eq!(doc.indexing_technique.as_deref(), Some("economy"));
    })
    .await;
}

#[tokio::test]
async fn transient_failures_are_retried() {
    within_deadline(async {
        let h = Harness::start().await;
        h.state.add_dataset("handbook").await;
        h.state.fail_next(503, 1).await;
        h.dir.write_doc("handbook", "intro.md", "# Intro");

        let results = h.run(HANDBOOK).await;
        assert!(results[0].errors.is_empty());
        assert_eq!(results[0].created, 1);
        assert_eq!(h.clock.sleeps(), [Duration::from_secs(1)]);
    })
    .await;
}

#[tokio::test]
async fn indexing_timeout_ends_dataset() {
    within_deadline(async {
        let h = Harness::start().await;
        h.state.add_dataset("handbook").await;
        h.state.set_pending_polls(100);
        h.dir.write_doc("handbook", "intro.md", "# Intro");

        let results = h.run(HANDBOOK).await;
        assert_eq!(results[0].created, 1);
        assert_eq!(results[0].errors.len(), 1);
        assert_eq!(results[0].errors[0].operation, FailedOperation::AwaitIndexing);
        assert!(h.clock.elapsed() > Duration::from_secs(5));
    })
    .await;
}

#[tokio::test]
async fn missing_folder_does_not_touch_remote() {
    within_deadline(async {
        let h = Harness::start().await;
        let id = h.state.add_dataset("handbook").await;
        h.state.add_document(&id, "keep.md", "x", Some("hash")).await;

        let results = h.run(HANDBOOK).await;
        assert!(results[0].is_path_missing());
        assert_eq!(h.state.count("DELETE", "").await, 0);
        assert_eq!(h.state.count("POST", "_by_text").await, 0);
    })
    .await;
}
