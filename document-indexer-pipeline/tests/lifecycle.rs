mod common;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use common::{axis_vector, document, strings, Harness, StaticMetadataSource};
use document_indexer_pipeline::collaborators::Enricher;
use document_indexer_pipeline::consumer::parse_envelope;
use document_indexer_pipeline::{DocumentLifecycle, LifecycleOutcome, PipelineError};
use document_indexer_repository::{IndexHandle, ManagedConnection, MetadataStore, VectorIndex};
use document_indexer_shared::{DocumentRecord, EventKind, VectorDatapoint, EMBEDDING_DIMENSION};

fn handle() -> IndexHandle {
    IndexHandle::new("document_index", "docs", EMBEDDING_DIMENSION)
}

/// Store a processed record with `page_count` pages and matching datapoints.
async fn seed(
    harness: &Harness,
    filename: &str,
    event_id: &str,
    page_count: usize,
) -> DocumentRecord {
    let mut record = DocumentRecord::new(&document(filename), event_id);
    record.creation_time = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    record.is_new = true;
    record.processed = true;
    record.set_pages((0..page_count).map(|p| format!("old page {}", p)).collect());
    harness.metadata.save_document(&record).await.unwrap();

    let datapoints: Vec<VectorDatapoint> = record
        .pages
        .iter()
        .enumerate()
        .map(|(page, text)| VectorDatapoint::new(filename, page, text.clone(), axis_vector(2)))
        .collect();
    harness.vectors.load(&handle(), &datapoints).await.unwrap();

    record
}

#[tokio::test]
async fn test_creation_of_absent_document() {
    let harness = Harness::new();
    harness
        .extractor
        .set_pages(strings(&["invoice one", "invoice two", "terms"]))
        .await;

    let outcome = harness
        .lifecycle
        .handle_event(&EventKind::Finalized, "e1", &document("doc.pdf"))
        .await
        .unwrap();

    assert_eq!(outcome, LifecycleOutcome::Created { page_count: 3 });

    let record = harness.metadata.get_document("doc.pdf").await.unwrap().unwrap();
    assert!(record.is_new);
    assert_eq!(record.event_id, "e1");
    assert_eq!(record.page_count, 3);
    assert_eq!(record.pages, strings(&["invoice one", "invoice two", "terms"]));
    assert_eq!(record.topics_ref.as_deref(), Some("topics:doc.pdf"));
    assert_eq!(record.questions_ref.as_deref(), Some("questions:doc.pdf"));
    assert!(record.creation_time.is_some());
    assert!(record.update_time.is_none());
    assert_eq!(record.mime_type.as_deref(), Some("application/pdf"));
    assert_eq!(record.custom_metadata.get("owner").map(String::as_str), Some("legal"));

    assert_eq!(
        harness.metadata.get_topics("doc.pdf").await.unwrap(),
        strings(&["Billing", "Payments"])
    );
    assert_eq!(harness.metadata.get_questions("doc.pdf").await.unwrap().len(), 2);
    assert_eq!(harness.vectors.datapoints_for("doc.pdf").await.len(), 3);
    assert_eq!(harness.connection.release_count(), 0);
}

#[tokio::test]
async fn test_duplicate_delivery_is_a_noop() {
    let harness = Harness::new();
    harness.extractor.set_pages(strings(&["page a", "page b"])).await;
    let doc = document("doc.pdf");

    harness
        .lifecycle
        .handle_event(&EventKind::Finalized, "e1", &doc)
        .await
        .unwrap();

    let snapshot = harness.metadata.snapshot().await;
    let writes = harness.metadata.write_count();
    let datapoints = harness.vectors.datapoints_for("doc.pdf").await;

    let outcome = harness
        .lifecycle
        .handle_event(&EventKind::Finalized, "e1", &doc)
        .await
        .unwrap();

    assert_eq!(outcome, LifecycleOutcome::Duplicate);
    assert_eq!(harness.metadata.snapshot().await, snapshot);
    assert_eq!(harness.metadata.write_count(), writes);
    assert_eq!(harness.vectors.datapoints_for("doc.pdf").await, datapoints);
    assert_eq!(harness.vectors.len().await, 2);
    assert_eq!(harness.extractor.call_count(), 1);
}

#[tokio::test]
async fn test_update_replaces_datapoints_and_keeps_creation_time() {
    let harness = Harness::new();
    let seeded = seed(&harness, "doc.pdf", "e0", 3).await;
    seed(&harness, "other.pdf", "x0", 2).await;
    harness
        .extractor
        .set_pages(strings(&["p1", "p2", "p3", "p4", "p5"]))
        .await;

    let outcome = harness
        .lifecycle
        .handle_event(&EventKind::MetadataUpdated, "e2", &document("doc.pdf"))
        .await
        .unwrap();

    assert_eq!(outcome, LifecycleOutcome::Updated { page_count: 5 });

    let record = harness.metadata.get_document("doc.pdf").await.unwrap().unwrap();
    assert_eq!(record.creation_time, seeded.creation_time);
    assert!(record.update_time.is_some());
    assert!(!record.is_new);
    assert_eq!(record.event_id, "e2");
    assert_eq!(record.page_count, 5);

    let datapoints = harness.vectors.datapoints_for("doc.pdf").await;
    assert_eq!(datapoints.len(), 5);
    assert!(datapoints.iter().all(|dp| !dp.content.starts_with("old page")));
    assert_eq!(harness.vectors.datapoints_for("other.pdf").await.len(), 2);
}

#[tokio::test]
async fn test_datapoints_match_page_count_after_shrinking_update() {
    let harness = Harness::new();
    let doc = document("doc.pdf");
    harness
        .extractor
        .set_pages(strings(&["a", "b", "c", "d"]))
        .await;
    harness
        .lifecycle
        .handle_event(&EventKind::Finalized, "e1", &doc)
        .await
        .unwrap();

    harness.extractor.set_pages(strings(&["a", "b"])).await;
    harness
        .lifecycle
        .handle_event(&EventKind::Finalized, "e2", &doc)
        .await
        .unwrap();

    let record = harness.metadata.get_document("doc.pdf").await.unwrap().unwrap();
    assert_eq!(record.page_count, 2);
    assert_eq!(
        harness.vectors.datapoints_for("doc.pdf").await.len(),
        record.page_count
    );
}

#[tokio::test]
async fn test_deletion_removes_everything() {
    let harness = Harness::new();
    let doc = document("doc.pdf");
    harness
        .extractor
        .set_pages(strings(&["one", "two", "three"]))
        .await;
    harness
        .lifecycle
        .handle_event(&EventKind::Finalized, "e1", &doc)
        .await
        .unwrap();

    let outcome = harness
        .lifecycle
        .handle_event(&EventKind::Deleted, "e2", &doc)
        .await
        .unwrap();

    assert_eq!(outcome, LifecycleOutcome::Deleted { removed_datapoints: 3 });
    assert!(harness.metadata.get_document("doc.pdf").await.unwrap().is_none());
    assert!(harness.metadata.get_topics("doc.pdf").await.unwrap().is_empty());
    assert!(harness.metadata.get_questions("doc.pdf").await.unwrap().is_empty());
    assert!(harness.vectors.datapoints_for("doc.pdf").await.is_empty());
    assert!(harness.metadata.snapshot().await.is_empty());
}

#[tokio::test]
async fn test_deletion_of_document_without_pages() {
    let harness = Harness::new();
    let doc = document("empty.pdf");
    harness
        .lifecycle
        .handle_event(&EventKind::Finalized, "e1", &doc)
        .await
        .unwrap();

    let outcome = harness
        .lifecycle
        .handle_event(&EventKind::Deleted, "e2", &doc)
        .await
        .unwrap();

    assert_eq!(outcome, LifecycleOutcome::Deleted { removed_datapoints: 0 });
    assert!(harness.metadata.get_document("empty.pdf").await.unwrap().is_none());
    assert_eq!(harness.vectors.delete_count(), 0);
}

#[tokio::test]
async fn test_delete_of_missing_document_has_no_side_effects() {
    let harness = Harness::new();

    let outcome = harness
        .lifecycle
        .handle_event(&EventKind::Deleted, "e1", &document("missing.pdf"))
        .await
        .unwrap();

    assert_eq!(outcome, LifecycleOutcome::NothingToDelete);
    assert_eq!(harness.metadata.write_count(), 0);
    assert!(harness.metadata.snapshot().await.is_empty());
    assert!(harness.vectors.is_empty().await);
    assert_eq!(harness.connection.release_count(), 0);
}

#[tokio::test]
async fn test_embedding_failure_degrades_to_zero_vector() {
    let harness = Harness::new();
    harness
        .extractor
        .set_pages(strings(&["invoice", "contract", "appendix", "signatures"]))
        .await;
    harness.enricher.fail_embedding_for("appendix").await;

    let outcome = harness
        .lifecycle
        .handle_event(&EventKind::Finalized, "e1", &document("doc.pdf"))
        .await
        .unwrap();

    assert_eq!(outcome, LifecycleOutcome::Created { page_count: 4 });

    let mut datapoints = harness.vectors.datapoints_for("doc.pdf").await;
    datapoints.sort_by_key(|dp| dp.page);
    assert_eq!(datapoints.len(), 4);
    assert_eq!(datapoints[2].page, 2);
    assert_eq!(datapoints[2].embedding.len(), EMBEDDING_DIMENSION);
    assert!(datapoints[2].is_zero_vector());
    assert!(!datapoints[0].is_zero_vector());
    assert!(!datapoints[1].is_zero_vector());
    assert!(!datapoints[3].is_zero_vector());
}

#[tokio::test]
async fn test_blank_pages_are_not_sent_for_embedding() {
    let harness = Harness::new();
    harness
        .extractor
        .set_pages(strings(&["invoice", "   ", "contract"]))
        .await;

    harness
        .lifecycle
        .handle_event(&EventKind::Finalized, "e1", &document("doc.pdf"))
        .await
        .unwrap();

    assert_eq!(harness.enricher.embed_calls(), 2);
    assert_eq!(harness.vectors.datapoints_for("doc.pdf").await.len(), 3);
}

#[tokio::test]
async fn test_enrichment_failure_keeps_checkpoint_and_releases_connection() {
    let harness = Harness::new();
    harness
        .extractor
        .set_pages(strings(&["one", "two", "three"]))
        .await;
    harness.enricher.set_topics_failing(true);

    let result = harness
        .lifecycle
        .handle_event(&EventKind::Finalized, "e1", &document("doc.pdf"))
        .await;

    assert!(matches!(result, Err(PipelineError::EnrichmentFailed(_))));

    let record = harness.metadata.get_document("doc.pdf").await.unwrap().unwrap();
    assert_eq!(record.page_count, 3);
    assert_eq!(record.pages.len(), 3);
    assert!(record.topics_ref.is_none());
    assert!(harness.vectors.is_empty().await);
    assert_eq!(harness.connection.release_count(), 1);
    assert!(!harness.connection.is_open().await);
}

#[tokio::test]
async fn test_redelivery_after_enrichment_failure_completes_creation() {
    let harness = Harness::new();
    let doc = document("doc.pdf");
    harness
        .extractor
        .set_pages(strings(&["invoice one", "invoice two", "terms"]))
        .await;
    harness.enricher.set_topics_failing(true);

    let result = harness
        .lifecycle
        .handle_event(&EventKind::Finalized, "e1", &doc)
        .await;
    assert!(matches!(result, Err(PipelineError::EnrichmentFailed(_))));
    let first = harness.metadata.get_document("doc.pdf").await.unwrap().unwrap();
    assert!(!first.processed);

    harness.enricher.set_topics_failing(false);
    let outcome = harness
        .lifecycle
        .handle_event(&EventKind::Finalized, "e1", &doc)
        .await
        .unwrap();

    assert_eq!(outcome, LifecycleOutcome::Created { page_count: 3 });
    let record = harness.metadata.get_document("doc.pdf").await.unwrap().unwrap();
    assert!(record.processed);
    assert!(record.is_new);
    assert!(record.update_time.is_none());
    assert_eq!(record.creation_time, first.creation_time);
    assert_eq!(record.page_count, 3);
    assert_eq!(record.topics_ref.as_deref(), Some("topics:doc.pdf"));
    assert_eq!(harness.vectors.datapoints_for("doc.pdf").await.len(), 3);

    let outcome = harness
        .lifecycle
        .handle_event(&EventKind::Finalized, "e1", &doc)
        .await
        .unwrap();
    assert_eq!(outcome, LifecycleOutcome::Duplicate);
    assert_eq!(harness.extractor.call_count(), 2);
}

#[tokio::test]
async fn test_redelivery_after_interrupted_load_does_not_duplicate_datapoints() {
    let harness = Harness::new();
    let mut record = seed(&harness, "doc.pdf", "e1", 3).await;
    record.processed = false;
    harness.metadata.save_document(&record).await.unwrap();
    harness
        .extractor
        .set_pages(strings(&["p1", "p2", "p3"]))
        .await;

    let outcome = harness
        .lifecycle
        .handle_event(&EventKind::Finalized, "e1", &document("doc.pdf"))
        .await
        .unwrap();

    assert_eq!(outcome, LifecycleOutcome::Created { page_count: 3 });
    let datapoints = harness.vectors.datapoints_for("doc.pdf").await;
    assert_eq!(datapoints.len(), 3);
    assert!(datapoints.iter().all(|dp| !dp.content.starts_with("old page")));

    let stored = harness.metadata.get_document("doc.pdf").await.unwrap().unwrap();
    assert!(stored.processed);
    assert_eq!(stored.creation_time, record.creation_time);
}

/// Enricher whose batch embedding drops the last page.
struct ShortBatchEnricher;

#[async_trait]
impl Enricher for ShortBatchEnricher {
    async fn topics(&self, _full_text: &str) -> Result<Vec<String>, PipelineError> {
        Ok(strings(&["Billing"]))
    }

    async fn questions(
        &self,
        _full_text: &str,
        _topics: &[String],
    ) -> Result<Vec<String>, PipelineError> {
        Ok(Vec::new())
    }

    async fn embed_page(&self, _text: &str) -> Result<Vec<f32>, PipelineError> {
        Ok(axis_vector(0))
    }

    async fn embed(&self, pages: &[String]) -> Vec<Vec<f32>> {
        vec![axis_vector(0); pages.len().saturating_sub(1)]
    }
}

#[tokio::test]
async fn test_short_embedding_batch_fails_before_indexing() {
    let harness = Harness::new();
    harness.extractor.set_pages(strings(&["a", "b", "c"])).await;
    let lifecycle = DocumentLifecycle::new(
        harness.metadata.clone(),
        harness.vectors.clone(),
        harness.connection.clone(),
        harness.extractor.clone(),
        Arc::new(ShortBatchEnricher),
        Arc::new(StaticMetadataSource::default()),
    );

    let result = lifecycle
        .handle_event(&EventKind::Finalized, "e1", &document("doc.pdf"))
        .await;

    assert!(matches!(result, Err(PipelineError::IndexWriteFailed(_))));
    assert!(harness.vectors.is_empty().await);
    let record = harness.metadata.get_document("doc.pdf").await.unwrap().unwrap();
    assert!(!record.processed);
    assert_eq!(harness.connection.release_count(), 1);
}

#[tokio::test]
async fn test_colliding_object_name_leaves_stored_document_untouched() {
    let harness = Harness::new();
    seed(&harness, "a/b.pdf", "e1", 2).await;
    let snapshot = harness.metadata.snapshot().await;

    let outcome = harness
        .lifecycle
        .handle_event(&EventKind::Finalized, "e2", &document("a-b.pdf"))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        LifecycleOutcome::KeyConflict {
            stored_filename: "a/b.pdf".to_string()
        }
    );

    let outcome = harness
        .lifecycle
        .handle_event(&EventKind::Deleted, "e3", &document("a-b.pdf"))
        .await
        .unwrap();
    assert!(matches!(outcome, LifecycleOutcome::KeyConflict { .. }));

    assert_eq!(harness.metadata.snapshot().await, snapshot);
    assert_eq!(harness.vectors.datapoints_for("a/b.pdf").await.len(), 2);
    assert_eq!(harness.extractor.call_count(), 0);
}

#[tokio::test]
async fn test_extraction_failure_leaves_initial_record() {
    let harness = Harness::new();
    harness.extractor.set_failing(true);

    let result = harness
        .lifecycle
        .handle_event(&EventKind::Finalized, "e1", &document("doc.pdf"))
        .await;

    assert!(matches!(result, Err(PipelineError::ExtractionFailed(_))));

    let record = harness.metadata.get_document("doc.pdf").await.unwrap().unwrap();
    assert!(record.is_new);
    assert!(record.pages.is_empty());
    assert_eq!(record.page_count, 0);
    assert_eq!(harness.connection.release_count(), 1);
}

#[tokio::test]
async fn test_unavailable_store_is_fatal() {
    let harness = Harness::new();
    harness.metadata.set_unavailable(true);

    let result = harness
        .lifecycle
        .handle_event(&EventKind::Finalized, "e1", &document("doc.pdf"))
        .await;

    match result {
        Err(e) => {
            assert!(matches!(e, PipelineError::StoreUnavailable(_)));
            assert!(e.is_fatal());
        }
        Ok(outcome) => panic!("expected failure, got {:?}", outcome),
    }
    assert_eq!(harness.extractor.call_count(), 0);
    assert_eq!(harness.connection.release_count(), 1);
}

#[tokio::test]
async fn test_unsupported_event_is_ignored() {
    let harness = Harness::new();

    let outcome = harness
        .lifecycle
        .handle_event(
            &EventKind::parse("google.cloud.storage.object.v1.archived"),
            "e1",
            &document("doc.pdf"),
        )
        .await
        .unwrap();

    assert_eq!(outcome, LifecycleOutcome::Ignored);
    assert_eq!(harness.metadata.write_count(), 0);
    assert_eq!(harness.extractor.call_count(), 0);
}

#[tokio::test]
async fn test_metadata_failure_degrades_to_empty_map() {
    let harness = Harness::with_metadata_source(StaticMetadataSource::failing());
    harness.extractor.set_pages(strings(&["one"])).await;

    harness
        .lifecycle
        .handle_event(&EventKind::Finalized, "e1", &document("doc.pdf"))
        .await
        .unwrap();

    let record = harness.metadata.get_document("doc.pdf").await.unwrap().unwrap();
    assert!(record.custom_metadata.is_empty());
}

#[tokio::test]
async fn test_handle_parsed_envelope() {
    let harness = Harness::new();
    harness.extractor.set_pages(strings(&["one", "two"])).await;
    let event = parse_envelope(
        br#"{"type": "google.cloud.storage.object.v1.finalized",
             "data": {"id": "gen-1", "bucket": "inbox", "name": "dir/doc.pdf",
                      "contentType": "application/pdf",
                      "timeCreated": "2024-05-01T10:00:00Z"}}"#,
    )
    .unwrap();

    let outcome = harness.lifecycle.handle(&event).await.unwrap();

    assert_eq!(outcome, LifecycleOutcome::Created { page_count: 2 });
    let record = harness.metadata.get_document("dir/doc.pdf").await.unwrap().unwrap();
    assert_eq!(record.topics_ref.as_deref(), Some("topics:dir-doc.pdf"));
    assert_eq!(
        record.time_uploaded,
        Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap())
    );
    assert!(harness
        .metadata
        .snapshot()
        .await
        .contains_key("document:dir-doc.pdf"));
}
