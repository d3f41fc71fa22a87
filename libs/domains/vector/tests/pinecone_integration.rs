//! Pinecone adapter against the in-process fake server

mod common;

use std::time::Duration;

use domain_vector::{
    CancellationToken, ErrorKind, PineconeConfig, ProviderConfig, ProviderKind, SearchProvider,
    Searcher, UpsertVector,
};
use test_utils::{FakePinecone, TestDataBuilder};

async fn setup() -> (FakePinecone, SearchProvider) {
    common::init_tracing();
    let pinecone = FakePinecone::start("k").await;
    let config: ProviderConfig = serde_json::from_value(serde_json::json!({
        "provider": "pinecone",
        "pinecone": { "name": "t", "apiKey": "k", "controllerUrl": pinecone.url() }
    }))
    .unwrap();

    let searcher = config.build().unwrap();
    assert_eq!(searcher.kind(), ProviderKind::Pinecone);
    (pinecone, searcher)
}

#[tokio::test]
async fn test_pinecone_upsert_then_query() {
    let (_pinecone, searcher) = setup().await;
    common::upsert_then_query(&searcher, "demo").await;
}

#[tokio::test]
async fn test_pinecone_last_write_wins() {
    let (pinecone, searcher) = setup().await;
    let index = TestDataBuilder::from_test_name("test_pinecone_last_write_wins").index_name("lww");

    common::last_write_wins(&searcher, &index).await;
    assert_eq!(pinecone.record_count(&index), 1);
}

#[tokio::test]
async fn test_pinecone_delete_is_idempotent() {
    let (pinecone, searcher) = setup().await;

    common::delete_is_idempotent(&searcher, "demo").await;
    assert!(!pinecone.contains("demo", "abc"));
}

#[tokio::test]
async fn test_pinecone_filters() {
    let (_pinecone, searcher) = setup().await;
    common::filters_are_honored(&searcher, "recipes").await;
}

#[tokio::test]
async fn test_pinecone_missing_index() {
    let (_pinecone, searcher) = setup().await;
    common::missing_index_is_not_found(&searcher, "nope").await;
}

#[tokio::test]
async fn test_pinecone_duplicate_index() {
    let (_pinecone, searcher) = setup().await;
    common::duplicate_index_already_exists(&searcher, "demo").await;
}

#[tokio::test]
async fn test_pinecone_empty_id() {
    let (pinecone, searcher) = setup().await;

    common::empty_id_leaves_index_unchanged(&searcher, "demo").await;
    assert_eq!(pinecone.record_count("demo"), 0);
}

#[tokio::test]
async fn test_pinecone_top_k_limits_results() {
    let pinecone = FakePinecone::start("k").await;
    let searcher = ProviderConfig::pinecone(
        PineconeConfig::new("t", "k")
            .with_controller_url(pinecone.url())
            .with_top_k(2),
    )
    .build()
    .unwrap();
    let builder = TestDataBuilder::from_test_name("test_pinecone_top_k_limits_results");
    let cancel = CancellationToken::new();

    searcher.create_index("demo", &cancel).await.unwrap();
    for n in 0..5 {
        searcher
            .upsert_vector(
                "demo",
                UpsertVector::new(builder.record_id(n), builder.vector(4, n + 1)),
                &cancel,
            )
            .await
            .unwrap();
    }

    let results = searcher
        .query_vector("demo", &builder.vector(4, 1), None, &cancel)
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, builder.record_id(0));
}

#[tokio::test]
async fn test_pinecone_dimension_mismatch_is_rejected() {
    let (_pinecone, searcher) = setup().await;
    let cancel = CancellationToken::new();

    searcher.create_index("demo", &cancel).await.unwrap();
    let err = searcher
        .upsert_vector("demo", UpsertVector::new("abc", vec![0.1, 0.2]), &cancel)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Rejected);
}

#[tokio::test]
async fn test_pinecone_wrong_api_key_is_transport() {
    let pinecone = FakePinecone::start("right").await;
    let searcher = ProviderConfig::pinecone(
        PineconeConfig::new("t", "wrong").with_controller_url(pinecone.url()),
    )
    .build()
    .unwrap();

    let err = searcher
        .create_index("demo", &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_pinecone_writes_are_visible_on_return() {
    common::init_tracing();
    let pinecone = FakePinecone::start_with_write_delay("k", Duration::from_millis(300)).await;
    let searcher = ProviderConfig::pinecone(
        PineconeConfig::new("t", "k")
            .with_controller_url(pinecone.url())
            .with_dimension(4),
    )
    .build()
    .unwrap();
    let cancel = CancellationToken::new();

    searcher.create_index("demo", &cancel).await.unwrap();
    searcher
        .upsert_vector("demo", UpsertVector::new("abc", vec![0.1, 0.2, 0.3, 0.4]), &cancel)
        .await
        .unwrap();

    let results = searcher
        .query_vector("demo", &[0.1, 0.2, 0.3, 0.4], None, &cancel)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "abc");

    // Overwrite: the old values stay visible until the delay passes
    searcher
        .upsert_vector("demo", UpsertVector::new("abc", vec![0.4, 0.3, 0.2, 0.1]), &cancel)
        .await
        .unwrap();
    let results = searcher
        .query_vector("demo", &[0.4, 0.3, 0.2, 0.1], None, &cancel)
        .await
        .unwrap();
    assert_eq!(results[0].vectors.as_deref(), Some(&[0.4, 0.3, 0.2, 0.1][..]));

    searcher.delete_vector("demo", "abc", &cancel).await.unwrap();
    let results = searcher
        .query_vector("demo", &[0.4, 0.3, 0.2, 0.1], None, &cancel)
        .await
        .unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_pinecone_cancel_while_waiting_for_visibility() {
    common::init_tracing();
    let pinecone = FakePinecone::start_with_write_delay("k", Duration::from_secs(60)).await;
    let searcher = ProviderConfig::pinecone(
        PineconeConfig::new("t", "k")
            .with_controller_url(pinecone.url())
            .with_dimension(4),
    )
    .build()
    .unwrap();
    let cancel = CancellationToken::new();

    searcher.create_index("demo", &cancel).await.unwrap();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let err = tokio::time::timeout(
        Duration::from_secs(5),
        searcher.upsert_vector("demo", UpsertVector::new("abc", vec![0.1; 4]), &cancel),
    )
    .await
    .unwrap()
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Cancelled);
}
