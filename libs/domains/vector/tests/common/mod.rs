//! Searcher contract scenarios shared by the adapter test suites
#![allow(dead_code)]

use domain_vector::{
    CancellationToken, ErrorKind, MetadataValue, QueryFilter, Searcher, UpsertVector,
};
use test_utils::assertions::{assert_descending, assert_score_close};

pub const DEMO_VECTOR: [f32; 4] = [0.1, 0.2, 0.3, 0.4];

/// Pretty tracing output for failing tests; repeated calls are no-ops
pub fn init_tracing() {
    core_config::tracing::init_tracing(&core_config::Environment::Development);
}

pub async fn upsert_then_query(searcher: &impl Searcher, index: &str) {
    let cancel = CancellationToken::new();

    searcher.create_index(index, &cancel).await.unwrap();
    searcher
        .upsert_vector(
            index,
            UpsertVector::new("abc", DEMO_VECTOR.to_vec()).with_metadata("k", "v"),
            &cancel,
        )
        .await
        .unwrap();
    searcher
        .upsert_vector(
            index,
            UpsertVector::new("other", vec![0.4, 0.3, 0.2, 0.1]),
            &cancel,
        )
        .await
        .unwrap();

    let results = searcher
        .query_vector(index, &DEMO_VECTOR, None, &cancel)
        .await
        .unwrap();

    assert!(!results.is_empty());
    let scores: Vec<f32> = results.iter().map(|r| r.score).collect();
    assert_descending(&scores, "upsert_then_query");

    let top = &results[0];
    assert_eq!(top.id, "abc");
    assert_score_close(top.score, 1.0, "exact match");
    assert_eq!(top.metadata.get("k"), Some(&MetadataValue::from("v")));
    assert_eq!(top.vectors.as_ref().map(Vec::len), Some(DEMO_VECTOR.len()));
}

pub async fn last_write_wins(searcher: &impl Searcher, index: &str) {
    let cancel = CancellationToken::new();

    searcher.create_index(index, &cancel).await.unwrap();
    searcher
        .upsert_vector(
            index,
            UpsertVector::new("abc", DEMO_VECTOR.to_vec()).with_metadata("version", 1_i64),
            &cancel,
        )
        .await
        .unwrap();
    searcher
        .upsert_vector(
            index,
            UpsertVector::new("abc", vec![0.4, 0.3, 0.2, 0.1]).with_metadata("version", "two"),
            &cancel,
        )
        .await
        .unwrap();

    let results = searcher
        .query_vector(index, &[0.4, 0.3, 0.2, 0.1], None, &cancel)
        .await
        .unwrap();

    let matching: Vec<_> = results.iter().filter(|r| r.id == "abc").collect();
    assert_eq!(matching.len(), 1);
    assert_score_close(matching[0].score, 1.0, "replaced vector");
    assert_eq!(
        matching[0].metadata.get("version"),
        Some(&MetadataValue::from("two"))
    );
}

pub async fn delete_is_idempotent(searcher: &impl Searcher, index: &str) {
    let cancel = CancellationToken::new();

    searcher.create_index(index, &cancel).await.unwrap();
    searcher
        .upsert_vector(
            index,
            UpsertVector::new("abc", DEMO_VECTOR.to_vec()).with_metadata("k", "v"),
            &cancel,
        )
        .await
        .unwrap();

    searcher.delete_vector(index, "abc", &cancel).await.unwrap();
    searcher.delete_vector(index, "abc", &cancel).await.unwrap();

    let results = searcher
        .query_vector(index, &DEMO_VECTOR, None, &cancel)
        .await
        .unwrap();
    assert!(results.iter().all(|r| r.id != "abc"));
}

pub async fn filters_are_honored(searcher: &impl Searcher, index: &str) {
    let cancel = CancellationToken::new();

    searcher.create_index(index, &cancel).await.unwrap();
    for (id, cuisine) in [("pad-thai", "thai"), ("ramen", "japanese"), ("green-curry", "thai")] {
        searcher
            .upsert_vector(
                index,
                UpsertVector::new(id, DEMO_VECTOR.to_vec()).with_metadata("cuisine", cuisine),
                &cancel,
            )
            .await
            .unwrap();
    }

    let mut filter = QueryFilter::new();
    filter.insert("cuisine".to_string(), MetadataValue::from("thai"));

    let results = searcher
        .query_vector(index, &DEMO_VECTOR, Some(&filter), &cancel)
        .await
        .unwrap();

    let mut ids: Vec<_> = results.iter().map(|r| r.id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["green-curry", "pad-thai"]);

    let mut any_of = QueryFilter::new();
    any_of.insert(
        "cuisine".to_string(),
        MetadataValue::from(vec!["japanese".to_string(), "korean".to_string()]),
    );

    let results = searcher
        .query_vector(index, &DEMO_VECTOR, Some(&any_of), &cancel)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "ramen");
}

pub async fn missing_index_is_not_found(searcher: &impl Searcher, index: &str) {
    let cancel = CancellationToken::new();

    let err = searcher
        .upsert_vector(index, UpsertVector::new("abc", DEMO_VECTOR.to_vec()), &cancel)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.operation(), Some("upserting vector"));
}

pub async fn duplicate_index_already_exists(searcher: &impl Searcher, index: &str) {
    let cancel = CancellationToken::new();

    searcher.create_index(index, &cancel).await.unwrap();
    let err = searcher.create_index(index, &cancel).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    assert_eq!(err.operation(), Some("creating index"));
}

pub async fn empty_id_leaves_index_unchanged(searcher: &impl Searcher, index: &str) {
    let cancel = CancellationToken::new();

    searcher.create_index(index, &cancel).await.unwrap();
    let err = searcher
        .upsert_vector(index, UpsertVector::new("", DEMO_VECTOR.to_vec()), &cancel)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let results = searcher
        .query_vector(index, &DEMO_VECTOR, None, &cancel)
        .await
        .unwrap();
    assert!(results.is_empty());
}
