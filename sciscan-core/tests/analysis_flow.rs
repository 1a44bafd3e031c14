//! Integration tests for the analysis flow.
//!
//! These tests drive the public API end-to-end with MockAnalysisService and
//! the in-memory or file-backed history store.

use pretty_assertions::assert_eq;
use sciscan_core::attachment::{Attachment, PDF_MIME_TYPE};
use sciscan_core::client::AnalysisClient;
use sciscan_core::config::{AnalysisConfig, LlmConfig};
use sciscan_core::error::{AnalysisError, SessionError, ValidationError};
use sciscan_core::history::HistoryStore;
use sciscan_core::service::MockAnalysisService;
use sciscan_core::session::{AnalysisSession, RecordingObserver};
use sciscan_core::store::{FileStore, MemoryStore};
use sciscan_core::types::{AnalysisRecord, HistoryEntry, UiStatus};
use std::sync::Arc;

const KEY: &str = "sciscan_history";

fn record_json(total: u8) -> String {
    serde_json::json!({
        "title": "Sleep Deprivation and Working Memory",
        "authors": ["R. Alves", "M. Souza"],
        "publicationDate": "2021",
        "executiveSummarySimple": "O estudo mostra que dormir pouco piora a memória de trabalho (a memória usada para tarefas imediatas).",
        "executiveSummaryAcademic": "Estudo transversal (n=240) com regressão multinível.",
        "freeTranslation": "Privação de Sono e Memória de Trabalho",
        "researchQuestion": "Does partial sleep deprivation reduce working memory span?",
        "methodology": {"type": "Quantitativa", "description": "Cross-sectional", "sampleSize": "240"},
        "keyFindings": ["Span dropped 12% after two nights of 5h sleep"],
        "limitations": ["Self-reported sleep"],
        "implications": "Sleep hygiene matters for students.",
        "critique": "Good sample, weak causal claims.",
        "score": {"total": total, "methodology": 7, "novelty": 5, "clarity": 8, "justification": "Solid but not novel."},
        "keywords": ["sleep", "memory"]
    })
    .to_string()
}

fn client(mock: Arc<MockAnalysisService>) -> AnalysisClient {
    AnalysisClient::new(mock, &LlmConfig::default(), AnalysisConfig::default())
}

/// Helper to create a session over an in-memory history with no reading delay.
fn create_session(
    mock: Arc<MockAnalysisService>,
) -> (AnalysisSession<Arc<MemoryStore>>, Arc<RecordingObserver>) {
    let observer = Arc::new(RecordingObserver::new());
    let analysis = AnalysisConfig {
        reading_delay_ms: 0,
        ..AnalysisConfig::default()
    };
    let client = AnalysisClient::new(mock, &LlmConfig::default(), analysis);
    let history = HistoryStore::open(Arc::new(MemoryStore::new()), KEY, "%d/%m/%Y", None);
    (
        AnalysisSession::new(client, history, observer.clone()),
        observer,
    )
}

#[tokio::test]
async fn test_doi_link_enables_search_and_scores_in_range() {
    let mock = Arc::new(MockAnalysisService::new());
    mock.queue_text(&record_json(7));

    let record = client(mock.clone())
        .analyze("https://doi.org/10.1000/example", None)
        .await
        .unwrap();

    let request = mock.last_request().unwrap();
    assert!(request.enable_search);
    assert!(
        request
            .prompt_text()
            .unwrap()
            .contains("https://doi.org/10.1000/example")
    );
    assert!((1..=10).contains(&record.score.total));
}

#[tokio::test]
async fn test_png_without_text_fails_before_any_call() {
    let mock = Arc::new(MockAnalysisService::new());
    let png = Attachment::new("figure.png", "image/png", vec![0x89, b'P', b'N', b'G']);

    let err = client(mock.clone()).analyze("", Some(&png)).await.unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::Validation(ValidationError::UnsupportedAttachment { .. })
    ));
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_no_input_fails_before_any_call() {
    let mock = Arc::new(MockAnalysisService::new());
    let (mut session, observer) = create_session(mock.clone());

    let err = session.analyze().await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Validation(ValidationError::MissingInput)
    ));
    assert_eq!(mock.call_count(), 0);
    assert!(observer.status_changes().await.is_empty());
}

#[tokio::test]
async fn test_pdf_disables_search() {
    let mock = Arc::new(MockAnalysisService::new());
    mock.queue_text(&record_json(9));
    let pdf = Attachment::new("paper.pdf", PDF_MIME_TYPE, b"%PDF-1.5\n%fake".to_vec());

    client(mock.clone()).analyze("", Some(&pdf)).await.unwrap();
    let request = mock.last_request().unwrap();
    assert!(!request.enable_search);
    assert!(request.has_inline_data());
}

#[tokio::test]
async fn test_prose_and_fence_are_stripped() {
    let mock = Arc::new(MockAnalysisService::new());
    mock.queue_text(&format!(
        "Here is your analysis:\n```json\n{}\n```",
        record_json(8)
    ));

    let record = client(mock).analyze("some abstract", None).await.unwrap();
    assert_eq!(record.title, "Sleep Deprivation and Working Memory");
    assert_eq!(record.methodology.sample_size, "240");
}

#[tokio::test]
async fn test_out_of_range_total_is_rejected() {
    let mock = Arc::new(MockAnalysisService::new());
    mock.queue_text(&record_json(11));

    let err = client(mock).analyze("some abstract", None).await.unwrap_err();
    assert_eq!(err.kind(), "schema");
}

#[tokio::test]
async fn test_session_saves_to_history_most_recent_first() {
    let mock = Arc::new(MockAnalysisService::new());
    mock.queue_text(&record_json(6));
    mock.queue_text(&record_json(9));
    let (mut session, observer) = create_session(mock);

    session.set_input_text("first article");
    let first = session.analyze().await.unwrap().entry.unwrap();
    session.reset().await.unwrap();
    session.set_input_text("second article");
    let second = session.analyze().await.unwrap().entry.unwrap();

    let ids: Vec<_> = session.history().entries().iter().map(|e| e.id.clone()).collect();
    assert_eq!(ids, vec![second.id, first.id]);
    assert_eq!(
        observer.status_changes().await,
        vec![
            UiStatus::Reading,
            UiStatus::Analyzing,
            UiStatus::Complete,
            UiStatus::Idle,
            UiStatus::Reading,
            UiStatus::Analyzing,
            UiStatus::Complete,
        ]
    );
}

#[test]
fn test_append_then_load_puts_entry_first() {
    let store = Arc::new(MemoryStore::new());
    let mut history = HistoryStore::open(store.clone(), KEY, "%d/%m/%Y", None);
    let record: AnalysisRecord = serde_json::from_str(&record_json(7)).unwrap();
    history.append(record.clone()).unwrap();

    let before = history.load().len();
    let entry = history.append(record).unwrap();
    let loaded = history.load();

    assert_eq!(loaded.len(), before + 1);
    assert_eq!(loaded[0], entry);
}

#[test]
fn test_remove_existing_and_missing_ids() {
    let mut history = HistoryStore::open(MemoryStore::new(), KEY, "%d/%m/%Y", None);
    let record: AnalysisRecord = serde_json::from_str(&record_json(7)).unwrap();
    let a = history.append(record.clone()).unwrap();
    history.append(record).unwrap();

    history.remove(&a.id).unwrap();
    let after = history.load();
    assert_eq!(after.len(), 1);
    assert!(after.iter().all(|e| e.id != a.id));

    history.remove("missing").unwrap();
    assert_eq!(history.load(), after);
}

#[test]
fn test_history_round_trip_through_files() {
    let dir = tempfile::tempdir().unwrap();
    let record: AnalysisRecord = serde_json::from_str(&record_json(7)).unwrap();

    let saved: Vec<HistoryEntry> = {
        let mut history = HistoryStore::open(FileStore::new(dir.path()), KEY, "%d/%m/%Y", None);
        history.append(record.clone()).unwrap();
        history.append(record).unwrap();
        history.entries().to_vec()
    };

    let mut reopened = HistoryStore::open(FileStore::new(dir.path()), KEY, "%d/%m/%Y", None);
    assert_eq!(reopened.load(), saved);
}
