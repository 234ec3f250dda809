//! Corpus service integration tests against in-memory and on-disk libSQL.

use std::sync::Mutex;

use anno_config::AnnoConfig;
use anno_core::{DiscourseData, Span, StructuralError, TierDefinition};
use anno_db::AnnoDb;
use anno_db::error::DatabaseError;
use anno_db::repos::lookup::WordlistEntry;
use anno_db::service::CorpusService;
use anno_graph::{Control, GraphError};
use anno_query::compile;
use pretty_assertions::assert_eq;
use rstest::rstest;
use tempfile::TempDir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("ANNOGRAPH_LOG"))
        .with_test_writer()
        .try_init();
}

async fn test_service() -> CorpusService {
    init_tracing();
    CorpusService::in_memory().await.unwrap()
}

/// `words` pairs each word with its space-separated phones.
fn utterance(name: &str, words: &[(&str, &str)]) -> DiscourseData {
    let mut phones = Vec::new();
    let mut spans = Vec::new();
    for (word, segments) in words {
        let begin = phones.len();
        phones.extend(segments.split_whitespace().map(Span::unit));
        spans.push(Span::over(*word, "phone", begin, phones.len()));
    }
    DiscourseData::new(name)
        .with_tier(TierDefinition::anchor("phone"), phones)
        .with_tier(TierDefinition::dependent("word"), spans)
}

async fn count(svc: &CorpusService, table: &str) -> i64 {
    let mut rows = svc
        .db()
        .conn()
        .query(&format!("SELECT COUNT(*) FROM {table}"), ())
        .await
        .unwrap();
    rows.next().await.unwrap().unwrap().get::<i64>(0).unwrap()
}

#[tokio::test]
async fn stored_discourse_loads_back() {
    let svc = test_service().await;
    let stored = svc
        .add_discourse(&utterance("s01", &[("cat", "k a t")]))
        .await
        .unwrap();
    assert_eq!(stored.name, "s01");
    assert_eq!(stored.nodes, 4);
    assert_eq!(stored.edges, 4);

    let loaded = svc.load_graph().await.unwrap();
    let graph = &loaded.graph;
    assert_eq!(graph.node_count(), 4);
    assert_eq!(graph.edge_count(), 4);
    let discourse = graph.discourse_by_name("s01").unwrap();
    assert_eq!(graph.anchor_chain(discourse.id).unwrap().len(), 3);
    assert_eq!(loaded.discourse_row(discourse.id), Some(stored.id));
}

#[tokio::test]
async fn duplicate_names_are_rejected() {
    let svc = test_service().await;
    let data = utterance("s01", &[("cat", "k a t")]);
    svc.add_discourse(&data).await.unwrap();

    let err = svc.add_discourse(&data).await.unwrap_err();
    assert!(matches!(
        err,
        DatabaseError::Graph(GraphError::Structural(
            StructuralError::DuplicateDiscourse { .. }
        ))
    ));
    assert_eq!(svc.discourse_names().await.unwrap(), vec!["s01"]);
    assert_eq!(count(&svc, "nodes").await, 4);
}

#[tokio::test]
async fn invalid_discourse_stores_nothing() {
    let svc = test_service().await;
    let data = DiscourseData::new("bad")
        .with_tier(TierDefinition::anchor("phone"), vec![Span::unit("k")])
        .with_tier(
            TierDefinition::dependent("word"),
            vec![Span::over("cat", "phone", 0, 3)],
        );
    assert!(svc.add_discourse(&data).await.is_err());
    assert!(svc.discourse_names().await.unwrap().is_empty());
    assert_eq!(count(&svc, "annotation_types").await, 0);
}

#[tokio::test]
async fn tier_redefinition_rolls_back_the_transaction() {
    let svc = test_service().await;
    svc.add_discourse(&utterance("s01", &[("cat", "k a t")]))
        .await
        .unwrap();

    // "word" is the anchor here but a dependent tier in the stored corpus.
    let clash = DiscourseData::new("s02")
        .with_tier(TierDefinition::anchor("word"), vec![Span::unit("dog")]);
    let err = svc.add_discourse(&clash).await.unwrap_err();
    assert!(matches!(
        err,
        DatabaseError::Graph(GraphError::Structural(StructuralError::TierRedefined { .. }))
    ));

    assert_eq!(svc.discourse_names().await.unwrap(), vec!["s01"]);
    assert_eq!(count(&svc, "annotations").await, 4);
    assert_eq!(count(&svc, "edges").await, 4);
}

#[tokio::test]
async fn closure_is_replaced_not_appended() {
    let svc = test_service().await;
    svc.add_discourse(&utterance(
        "s01",
        &[("cat", "k a t"), ("sat", "s a t")],
    ))
    .await
    .unwrap();

    let first = svc.compute_closure("word", "phone").await.unwrap();
    let second = svc.compute_closure("word", "phone").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(second.records, 2);
    assert_eq!(count(&svc, "annotation_subarcs").await, 2);

    let subarcs: Vec<(String, String)> = svc
        .subarcs("word", "phone")
        .await
        .unwrap()
        .into_iter()
        .map(|r| (r.annotation, r.subarc))
        .collect();
    assert_eq!(
        subarcs,
        vec![
            ("cat".to_string(), "k.a.t.".to_string()),
            ("sat".to_string(), "s.a.t.".to_string()),
        ]
    );
}

#[tokio::test]
async fn closure_of_unknown_tier_fails() {
    let svc = test_service().await;
    let err = svc.compute_closure("syllable", "phone").await.unwrap_err();
    assert!(matches!(err, DatabaseError::Graph(GraphError::Referential(_))));
}

#[tokio::test]
async fn wordlist_combines_frequency_and_subarc() {
    let svc = test_service().await;
    svc.add_discourse(&utterance("s01", &[("cat", "k a t")]))
        .await
        .unwrap();
    svc.add_discourse(&utterance(
        "s02",
        &[("cat", "k a t"), ("sat", "s a t")],
    ))
    .await
    .unwrap();
    svc.compute_closure("word", "phone").await.unwrap();
    svc.regenerate_frequencies().await.unwrap();

    assert_eq!(svc.frequency("a", "phone").await.unwrap(), Some(3));
    assert_eq!(
        svc.wordlist("word", "phone").await.unwrap(),
        vec![
            WordlistEntry {
                label: "cat".into(),
                frequency: 2,
                subarc: Some("k.a.t.".into()),
            },
            WordlistEntry {
                label: "sat".into(),
                frequency: 1,
                subarc: Some("s.a.t.".into()),
            },
        ]
    );
}

#[rstest]
#[case("A", 2)]
#[case("a", 2)]
#[case("k", 1)]
#[case("z", 0)]
#[tokio::test]
async fn find_ignores_case(#[case] label: &str, #[case] expected: usize) {
    let svc = test_service().await;
    svc.add_discourse(&utterance(
        "s01",
        &[("cat", "k a t"), ("sat", "s a t")],
    ))
    .await
    .unwrap();

    let found = svc.find(label, "phone").await.unwrap();
    assert_eq!(found.len(), expected);
    assert!(found.iter().all(|e| e.discourse == "s01"));
}

#[tokio::test]
async fn delete_discourse_removes_rows_and_recounts() {
    let svc = test_service().await;
    svc.add_discourse(&utterance("s01", &[("cat", "k a t")]))
        .await
        .unwrap();
    svc.add_discourse(&utterance("s02", &[("at", "a t")]))
        .await
        .unwrap();
    svc.regenerate_frequencies().await.unwrap();
    assert_eq!(svc.frequency("a", "phone").await.unwrap(), Some(2));

    assert!(svc.delete_discourse("s01").await.unwrap());
    assert!(!svc.delete_discourse("s01").await.unwrap());
    assert_eq!(svc.discourse_names().await.unwrap(), vec!["s02"]);
    assert_eq!(count(&svc, "nodes").await, 3);
    assert_eq!(svc.frequency("a", "phone").await.unwrap(), Some(1));
    assert_eq!(svc.frequency("k", "phone").await.unwrap(), None);
}

async fn service_with(config: AnnoConfig) -> CorpusService {
    init_tracing();
    let db = AnnoDb::open_local(":memory:").await.unwrap();
    CorpusService::new(db, config)
}

#[tokio::test]
async fn batch_import_reports_progress_and_stops() {
    let mut config = AnnoConfig::default();
    config.import.progress_every = 1;
    let svc = service_with(config).await;
    let items = vec![
        utterance("s01", &[("cat", "k a t")]),
        utterance("s02", &[("at", "a t")]),
    ];

    let seen = Mutex::new(Vec::new());
    let control = Control::none().with_progress(|p| seen.lock().unwrap().push(p.done));
    let stored = svc.add_discourses(&items, control).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(*seen.lock().unwrap(), vec![1, 2]);

    let more = vec![utterance("s03", &[("at", "a t")])];
    let stop = Control::none().with_stop_check(|| true);
    let err = svc.add_discourses(&more, stop).await.unwrap_err();
    assert!(matches!(err, DatabaseError::Graph(GraphError::Cancelled)));
    assert_eq!(svc.discourse_names().await.unwrap().len(), 2);
}

#[tokio::test]
async fn batch_progress_follows_configured_interval() {
    let mut config = AnnoConfig::default();
    config.import.progress_every = 2;
    let svc = service_with(config).await;
    let items: Vec<DiscourseData> = ["s01", "s02", "s03", "s04", "s05"]
        .into_iter()
        .map(|name| utterance(name, &[("at", "a t")]))
        .collect();

    let seen = Mutex::new(Vec::new());
    let control = Control::none().with_progress(|p| seen.lock().unwrap().push(p.done));
    svc.add_discourses(&items, control).await.unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![2, 4, 5]);
}

#[tokio::test]
async fn hierarchy_uses_configured_corpus_and_stored_tiers() {
    let mut config = AnnoConfig::default();
    config.query.corpus = "buckeye".into();
    let svc = service_with(config).await;
    svc.add_discourse(&utterance("s01", &[("cat", "k a t")]))
        .await
        .unwrap();

    let h = svc.hierarchy().await.unwrap();
    assert_eq!(h.corpus(), "buckeye");
    let word = h.tier("word").unwrap();
    let spec = h.find("phone").unwrap().filter(word.label().equals("cat"));
    let text = compile(&spec).unwrap().text;
    assert!(text.contains("b_phone.corpus = 'buckeye'"));
    assert!(h.find("syllable").is_err());
}

#[tokio::test]
async fn on_disk_database_survives_reopen() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("corpus.db");
    let mut config = AnnoConfig::default();
    config.database.path = path.to_string_lossy().into_owned();

    {
        let svc = CorpusService::open(config.clone()).await.unwrap();
        svc.add_discourse(&utterance("s01", &[("cat", "k a t")]))
            .await
            .unwrap();
    }

    let db = AnnoDb::open(&config.database).await.unwrap();
    let svc = CorpusService::new(db, config);
    assert_eq!(svc.discourse_names().await.unwrap(), vec!["s01"]);
    let records = svc.list_discourses().await.unwrap();
    assert_eq!(records[0].anchor_tier.as_deref(), Some("phone"));
    assert_eq!(svc.load_graph().await.unwrap().graph.node_count(), 4);
}
