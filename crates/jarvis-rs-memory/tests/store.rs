use jarvis_rs_memory::{
    LoadStatus, MemoryError, Role, Scope, ScopeFilter, ScopedMemoryStore, ShortTermBuffer,
    StoreOptions, TurnRole,
};
use jarvis_rs_test_utils::{FailingEmbedder, MisreportingEmbedder, StubEmbedder};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

const DIM: usize = 16;

fn scope(project: &str) -> Scope {
    Scope::new("alice", "session-1", project).expect("scope")
}

fn open(root: &Path, embedder: StubEmbedder) -> ScopedMemoryStore {
    ScopedMemoryStore::open(root, Arc::new(embedder), StoreOptions::new(DIM)).expect("open store")
}

fn texts(records: &[jarvis_rs_memory::Record]) -> Vec<String> {
    records.iter().map(|record| record.text.clone()).collect()
}

#[tokio::test]
async fn appended_text_is_recalled_in_its_scope() {
    let temp = tempdir().expect("tempdir");
    let store = open(temp.path(), StubEmbedder::new(DIM));
    let alpha = scope("alpha");

    store
        .append("the build uses cargo workspaces", &alpha, Role::Human)
        .await
        .expect("append");
    store
        .append("lunch is at noon", &alpha, Role::Ai)
        .await
        .expect("append");

    let filter = ScopeFilter::for_scope(&alpha);
    for text in ["the build uses cargo workspaces", "lunch is at noon"] {
        let hits = store.query(text, &filter, 2).await.expect("query");
        assert!(hits.iter().any(|record| record.text == text), "{text} not recalled");
    }
}

#[tokio::test]
async fn projects_do_not_leak_into_each_other() {
    let temp = tempdir().expect("tempdir");
    let store = open(temp.path(), StubEmbedder::new(DIM));
    store
        .append("deploy to staging", &scope("alpha"), Role::Human)
        .await
        .expect("append alpha");
    store
        .append("deploy to staging", &scope("beta"), Role::Human)
        .await
        .expect("append beta");

    let hits = store
        .query(
            "deploy to staging",
            &ScopeFilter::new().user("alice").project("beta"),
            10,
        )
        .await
        .expect("query");
    assert_eq!(hits.len(), 1);
    assert!(hits.iter().all(|record| record.scope.project_id == "beta"));
}

#[tokio::test]
async fn empty_scope_yields_empty_result() {
    let temp = tempdir().expect("tempdir");
    let store = open(temp.path(), StubEmbedder::new(DIM));
    let filter = ScopeFilter::new().project("nobody");
    assert!(store.query("anything", &filter, 3).await.expect("query").is_empty());

    store
        .append("something", &scope("alpha"), Role::Human)
        .await
        .expect("append");
    assert!(store.query("something", &filter, 3).await.expect("query").is_empty());
}

#[tokio::test]
async fn newest_matches_come_first() {
    let temp = tempdir().expect("tempdir");
    let mut pinned = vec![0.0; DIM];
    pinned[0] = 1.0;
    let embedder = ["release notes", "release notes one", "release notes two", "release notes three"]
        .into_iter()
        .fold(StubEmbedder::new(DIM), |stub, text| stub.with_vector(text, pinned.clone()));
    let store = open(temp.path(), embedder);
    let alpha = scope("alpha");
    for text in ["release notes one", "release notes two", "release notes three"] {
        store.append(text, &alpha, Role::Ai).await.expect("append");
    }

    let hits = store
        .query("release notes", &ScopeFilter::for_scope(&alpha), 2)
        .await
        .expect("query");
    assert_eq!(texts(&hits), vec!["release notes three", "release notes two"]);
    assert!(hits[0].timestamp > hits[1].timestamp);
}

#[tokio::test]
async fn repeated_queries_are_deterministic() {
    let temp = tempdir().expect("tempdir");
    let store = open(temp.path(), StubEmbedder::new(DIM));
    let alpha = scope("alpha");
    for idx in 0..6 {
        store
            .append(&format!("note {idx}"), &alpha, Role::Human)
            .await
            .expect("append");
    }
    let filter = ScopeFilter::for_scope(&alpha);
    let first = store.query("note", &filter, 3).await.expect("query");
    let second = store.query("note", &filter, 3).await.expect("query");
    assert_eq!(first, second);
}

#[tokio::test]
async fn reopened_store_answers_identically() {
    let temp = tempdir().expect("tempdir");
    let filter = ScopeFilter::new().user("alice");
    let before = {
        let store = open(temp.path(), StubEmbedder::new(DIM));
        for (project, text) in [("alpha", "red"), ("beta", "green"), ("alpha", "blue")] {
            store
                .append(text, &scope(project), Role::Human)
                .await
                .expect("append");
        }
        store.query("red green blue", &filter, 2).await.expect("query")
    };

    let store = open(temp.path(), StubEmbedder::new(DIM));
    assert_eq!(store.load_status(), &LoadStatus::Restored { records: 3 });
    assert_eq!(store.len(), 3);
    let after = store.query("red green blue", &filter, 2).await.expect("query");
    assert_eq!(before, after);
}

#[tokio::test]
async fn role_filter_selects_failure_records() {
    let temp = tempdir().expect("tempdir");
    let store = open(temp.path(), StubEmbedder::new(DIM));
    let alpha = scope("alpha");
    let parser = Role::AiError(jarvis_rs_memory::FailureKind::Parser);
    store.append("bad json", &alpha, parser).await.expect("append");
    store.append("good json", &alpha, Role::Ai).await.expect("append");

    let hits = store
        .query("json", &ScopeFilter::for_scope(&alpha).role(parser), 5)
        .await
        .expect("query");
    assert_eq!(texts(&hits), vec!["bad json"]);
}

#[tokio::test]
async fn unreachable_gateway_surfaces_retryable_error() {
    let temp = tempdir().expect("tempdir");
    let store =
        ScopedMemoryStore::open(temp.path(), Arc::new(FailingEmbedder::new(DIM)), StoreOptions::new(DIM))
            .expect("open");
    let err = store
        .append("hello", &scope("alpha"), Role::Human)
        .await
        .unwrap_err();
    assert!(matches!(err, MemoryError::EmbeddingUnavailable(_)));
    assert!(err.is_retryable());
    assert!(store.is_empty());
    assert!(!store.log_path().exists());
}

#[tokio::test]
async fn gateway_errors_name_operation_and_scope() {
    let temp = tempdir().expect("tempdir");
    let store =
        ScopedMemoryStore::open(temp.path(), Arc::new(FailingEmbedder::new(DIM)), StoreOptions::new(DIM))
            .expect("open");

    let err = store
        .append("hello", &scope("alpha"), Role::Human)
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    let message = err.to_string();
    assert!(message.contains("append"), "{message}");
    assert!(message.contains("project=alpha"), "{message}");
    assert!(message.contains("quota exceeded"), "{message}");

    let err = store
        .query("hello", &ScopeFilter::new().project("beta"), 3)
        .await
        .unwrap_err();
    assert!(matches!(err, MemoryError::EmbeddingUnavailable(_)));
    let message = err.to_string();
    assert!(message.contains("query (project=beta)"), "{message}");
    assert!(message.contains("quota exceeded"), "{message}");
}

#[tokio::test]
async fn each_call_embeds_once_and_zero_limit_skips_the_gateway() {
    let temp = tempdir().expect("tempdir");
    let embedder = StubEmbedder::new(DIM);
    let store = open(temp.path(), embedder.clone());
    let alpha = scope("alpha");

    store.append("hello", &alpha, Role::Human).await.expect("append");
    assert_eq!(embedder.calls(), 1);
    store
        .query("hello", &ScopeFilter::for_scope(&alpha), 1)
        .await
        .expect("query");
    assert_eq!(embedder.calls(), 2);

    let hits = store
        .query("hello", &ScopeFilter::for_scope(&alpha), 0)
        .await
        .expect("query");
    assert!(hits.is_empty());
    assert_eq!(embedder.calls(), 2);
}

#[tokio::test]
async fn just_appended_text_wins_at_limit_one() {
    let temp = tempdir().expect("tempdir");
    let store = open(temp.path(), StubEmbedder::new(DIM));
    let alpha = scope("alpha");
    let filter = ScopeFilter::for_scope(&alpha);
    for text in ["standup moved to ten", "standup notes", "retro on friday"] {
        store.append(text, &alpha, Role::Human).await.expect("append");
    }
    store
        .append("noise elsewhere", &scope("beta"), Role::Human)
        .await
        .expect("append beta");

    for text in ["standup is cancelled", "a brand new topic"] {
        store.append(text, &alpha, Role::Human).await.expect("append");
        let hits = store.query(text, &filter, 1).await.expect("query");
        assert_eq!(texts(&hits), vec![text.to_string()]);
    }
}

#[tokio::test]
async fn slow_gateway_times_out() {
    let temp = tempdir().expect("tempdir");
    let embedder = StubEmbedder::new(DIM).with_delay(Duration::from_millis(500));
    let options = StoreOptions::new(DIM).with_embed_timeout(Duration::from_millis(20));
    let store = ScopedMemoryStore::open(temp.path(), Arc::new(embedder), options).expect("open");

    let err = store
        .query("hello", &ScopeFilter::new(), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, MemoryError::EmbeddingUnavailable(_)));
}

#[test]
fn gateway_dimension_drift_fails_at_open() {
    let temp = tempdir().expect("tempdir");
    let result = ScopedMemoryStore::open(
        temp.path(),
        Arc::new(StubEmbedder::new(DIM + 1)),
        StoreOptions::new(DIM),
    );
    assert!(matches!(
        result,
        Err(MemoryError::DimensionMismatch {
            expected: DIM,
            actual
        }) if actual == DIM + 1
    ));
}

#[tokio::test]
async fn wrong_vector_length_leaves_log_untouched() {
    let temp = tempdir().expect("tempdir");
    {
        let store = open(temp.path(), StubEmbedder::new(DIM));
        store
            .append("kept", &scope("alpha"), Role::Human)
            .await
            .expect("append");
    }
    let log_path = temp.path().join(jarvis_rs_memory::LOG_FILE_NAME);
    let before = fs::read(&log_path).expect("read log");

    let store = ScopedMemoryStore::open(
        temp.path(),
        Arc::new(MisreportingEmbedder::new(DIM, DIM - 1)),
        StoreOptions::new(DIM),
    )
    .expect("open");
    let err = store
        .append("rejected", &scope("alpha"), Role::Human)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MemoryError::DimensionMismatch { expected: DIM, .. }
    ));
    assert_eq!(fs::read(&log_path).expect("read log"), before);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn failed_write_is_never_visible() {
    let temp = tempdir().expect("tempdir");
    let store = open(temp.path(), StubEmbedder::new(DIM));
    fs::create_dir(store.log_path()).expect("block log path");

    let err = store
        .append("ghost", &scope("alpha"), Role::Human)
        .await
        .unwrap_err();
    assert!(matches!(err, MemoryError::PersistenceFailure { .. }));
    assert!(store.is_empty());
    assert!(
        store
            .query("ghost", &ScopeFilter::new(), 5)
            .await
            .expect("query")
            .is_empty()
    );
}

#[tokio::test]
async fn corrupt_log_recovers_empty_and_accepts_writes() {
    let temp = tempdir().expect("tempdir");
    fs::write(
        temp.path().join(jarvis_rs_memory::LOG_FILE_NAME),
        "{\"not\": \"a record\"}\n",
    )
    .expect("write garbage");

    let store = open(temp.path(), StubEmbedder::new(DIM));
    let LoadStatus::Recovered { quarantined, .. } = store.load_status() else {
        panic!("expected recovery, got {:?}", store.load_status());
    };
    assert!(quarantined.as_ref().is_some_and(|path| path.exists()));
    assert!(store.is_empty());

    store
        .append("fresh start", &scope("alpha"), Role::Human)
        .await
        .expect("append");
    assert_eq!(texts(&store.records()), vec!["fresh start"]);
}

#[tokio::test]
async fn promotion_empties_buffer_and_persists_turns() {
    let temp = tempdir().expect("tempdir");
    let store = open(temp.path(), StubEmbedder::new(DIM));
    let alpha = scope("alpha");
    let mut buffer = ShortTermBuffer::new();
    buffer.append_turn(TurnRole::Human, "what is the deadline");
    buffer.append_turn(TurnRole::Ai, "the deadline is friday");

    let promoted = buffer.promote(&store, &alpha).await.expect("promote");
    assert_eq!(promoted, 2);
    assert_eq!(buffer.render(), "");

    let records = store.records();
    assert_eq!(
        records
            .iter()
            .map(|record| (record.role, record.text.as_str()))
            .collect::<Vec<_>>(),
        vec![
            (Role::Human, "what is the deadline"),
            (Role::Ai, "the deadline is friday"),
        ]
    );
    let hits = store
        .query("deadline", &ScopeFilter::for_scope(&alpha), 2)
        .await
        .expect("query");
    assert_eq!(hits.len(), 2);
}

#[tokio::test]
async fn partial_promotion_keeps_unpromoted_turns() {
    let temp = tempdir().expect("tempdir");
    let store = open(temp.path(), StubEmbedder::new(DIM).failing_after(1));
    let alpha = scope("alpha");
    let mut buffer = ShortTermBuffer::new();
    buffer.append_turn(TurnRole::Human, "first");
    buffer.append_turn(TurnRole::Ai, "second");
    buffer.append_turn(TurnRole::Human, "third");

    let err = buffer.promote(&store, &alpha).await.unwrap_err();
    assert_eq!(err.promoted, 1);
    assert_eq!(err.remaining, 2);
    assert_eq!(err.failed.text, "second");
    assert!(matches!(err.source, MemoryError::EmbeddingUnavailable(_)));
    assert_eq!(buffer.render(), "ai: second\nhuman: third");
    assert_eq!(texts(&store.records()), vec!["first"]);
}

#[tokio::test]
async fn concurrent_queries_share_the_store() {
    let temp = tempdir().expect("tempdir");
    let store = Arc::new(open(temp.path(), StubEmbedder::new(DIM)));
    store
        .append("shared fact", &scope("alpha"), Role::System)
        .await
        .expect("append");

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.query("shared fact", &ScopeFilter::new(), 1).await })
        })
        .collect();
    for task in tasks {
        let hits = task.await.expect("join").expect("query");
        assert_eq!(texts(&hits), vec!["shared fact"]);
    }
}

#[tokio::test]
async fn latest_ignores_similarity() {
    let temp = tempdir().expect("tempdir");
    let store = open(temp.path(), StubEmbedder::new(DIM));
    let alpha = scope("alpha");
    store.append("older answer", &alpha, Role::Ai).await.expect("append");
    store.append("newer answer", &alpha, Role::Ai).await.expect("append");
    store.append("a question", &alpha, Role::Human).await.expect("append");

    let latest = store
        .latest(&ScopeFilter::for_scope(&alpha).role(Role::Ai))
        .expect("latest ai record");
    assert_eq!(latest.text, "newer answer");
    assert!(store.latest(&ScopeFilter::new().project("beta")).is_none());
}
