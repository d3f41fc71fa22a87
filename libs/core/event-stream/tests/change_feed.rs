//! End-to-end tests against an in-process change feed

use std::time::Duration;

use async_trait::async_trait;
use event_stream::{
    BearerTokenHeaders, ChangeKind, CookieHeaders, RequestHeaderBuilder, StreamClient,
    StreamConfig, StreamError, WorkerExit,
};
use http::HeaderMap;
use test_utils::{AfterFrames, FeedFrame, TestChangeFeed};
use tokio::sync::watch;

const TIMEOUT: Duration = Duration::from_secs(5);

fn change(kind: &str, id: &str) -> String {
    format!(
        r#"{{"kind":"{}","resourceType":"project","resourceId":"{}","payload":{{"id":"{}"}}}}"#,
        kind, id, id
    )
}

fn bearer_client(feed: &TestChangeFeed) -> StreamClient<BearerTokenHeaders> {
    core_config::tracing::init_tracing(&core_config::Environment::Development);
    StreamClient::new(
        StreamConfig::new(feed.base_url()),
        BearerTokenHeaders::new("test-token"),
    )
    .unwrap()
}

#[tokio::test]
async fn test_messages_arrive_in_order_until_cancelled() {
    let feed = TestChangeFeed::with_text_frames(
        [
            change("created", "p-1"),
            change("updated", "p-1"),
            change("archived", "p-1"),
        ],
        AfterFrames::Hold,
    )
    .await;

    let client = bearer_client(&feed);
    let (stop, shutdown) = watch::channel(false);
    let mut stream = client.open(shutdown).await.unwrap();

    assert_eq!(feed.authorization().as_deref(), Some("Bearer test-token"));

    let mut kinds = Vec::new();
    for _ in 0..3 {
        let message = tokio::time::timeout(TIMEOUT, stream.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(message.resource_id, "p-1");
        assert_eq!(message.payload["id"], "p-1");
        kinds.push(message.kind);
    }
    assert_eq!(
        kinds,
        vec![ChangeKind::Created, ChangeKind::Updated, ChangeKind::Archived]
    );

    stop.send(true).unwrap();

    assert!(tokio::time::timeout(TIMEOUT, stream.recv()).await.unwrap().is_none());
    assert_eq!(stream.join().await, WorkerExit::Cancelled);
    assert!(feed.wait_for_client_close(TIMEOUT).await);
    assert_eq!(feed.connections(), 1);
}

#[tokio::test]
async fn test_server_close_ends_stream() {
    let feed = TestChangeFeed::with_text_frames(
        [change("created", "a"), change("created", "b")],
        AfterFrames::Close,
    )
    .await;

    let (_stop, shutdown) = watch::channel(false);
    let mut stream = bearer_client(&feed).open(shutdown).await.unwrap();

    assert_eq!(stream.recv().await.unwrap().resource_id, "a");
    assert_eq!(stream.recv().await.unwrap().resource_id, "b");
    assert!(stream.recv().await.is_none());
    assert_eq!(stream.join().await, WorkerExit::ClosedByServer);
}

#[tokio::test]
async fn test_undecodable_frame_fails_stream() {
    let feed = TestChangeFeed::with_text_frames(
        [change("created", "a"), "{not json".to_string()],
        AfterFrames::Hold,
    )
    .await;

    let (_stop, shutdown) = watch::channel(false);
    let mut stream = bearer_client(&feed).open(shutdown).await.unwrap();

    assert_eq!(stream.recv().await.unwrap().resource_id, "a");
    assert!(tokio::time::timeout(TIMEOUT, stream.recv()).await.unwrap().is_none());

    match stream.join().await {
        WorkerExit::Failed(e) => {
            assert!(matches!(e, StreamError::Decode(_)));
            assert!(!e.should_reconnect());
        }
        other => panic!("expected decode failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_binary_frames_and_unknown_kinds() {
    let feed = TestChangeFeed::start(
        vec![
            FeedFrame::Text(change("restored", "a")),
            FeedFrame::Ping,
            FeedFrame::Binary(change("updated", "b").into_bytes()),
        ],
        AfterFrames::Close,
    )
    .await;

    let (_stop, shutdown) = watch::channel(false);
    let mut stream = bearer_client(&feed).open(shutdown).await.unwrap();

    let first = stream.recv().await.unwrap();
    assert_eq!(first.kind, ChangeKind::Other);
    assert_eq!(first.resource_id, "a");

    let second = stream.recv().await.unwrap();
    assert_eq!(second.kind, ChangeKind::Updated);
    assert_eq!(second.resource_id, "b");

    assert!(stream.recv().await.is_none());
}

#[tokio::test]
async fn test_dropped_receiver_stops_worker() {
    let feed = TestChangeFeed::with_text_frames(Vec::<String>::new(), AfterFrames::Hold).await;

    let (_stop, shutdown) = watch::channel(false);
    let stream = bearer_client(&feed).open(shutdown).await.unwrap();

    let (messages, worker) = stream.into_parts();
    drop(messages);

    let exit = tokio::time::timeout(TIMEOUT, worker).await.unwrap().unwrap();
    assert_eq!(exit, WorkerExit::ConsumerGone);
    assert!(feed.wait_for_client_close(TIMEOUT).await);
}

#[tokio::test]
async fn test_cancel_while_consumer_is_slow() {
    let feed = TestChangeFeed::with_text_frames(
        [change("updated", "hot")],
        AfterFrames::Repeat(Duration::from_millis(10)),
    )
    .await;

    let (stop, shutdown) = watch::channel(false);
    let mut stream = bearer_client(&feed).open(shutdown).await.unwrap();

    assert_eq!(stream.recv().await.unwrap().resource_id, "hot");

    // Let the worker fill the channel and block on delivery
    tokio::time::sleep(Duration::from_millis(100)).await;
    stop.send(true).unwrap();

    let exit = tokio::time::timeout(TIMEOUT, stream.join()).await.unwrap();
    assert_eq!(exit, WorkerExit::Cancelled);
}

#[tokio::test]
async fn test_no_message_after_cancel_signal() {
    let feed = TestChangeFeed::with_text_frames(
        [change("updated", "hot")],
        AfterFrames::Repeat(Duration::from_millis(10)),
    )
    .await;

    let (stop, shutdown) = watch::channel(false);
    let mut stream = bearer_client(&feed).open(shutdown).await.unwrap();

    assert_eq!(stream.recv().await.unwrap().resource_id, "hot");

    // The worker has read ahead and a message is sitting in the buffer
    tokio::time::sleep(Duration::from_millis(100)).await;
    stop.send(true).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(tokio::time::timeout(TIMEOUT, stream.recv()).await.unwrap().is_none());
    assert!(tokio::time::timeout(TIMEOUT, stream.recv()).await.unwrap().is_none());
    assert_eq!(stream.join().await, WorkerExit::Cancelled);
    assert!(feed.wait_for_client_close(TIMEOUT).await);
}

#[tokio::test]
async fn test_cookie_credentials() {
    let feed = TestChangeFeed::with_text_frames([change("created", "c")], AfterFrames::Close).await;

    let client = StreamClient::new(
        StreamConfig::new(feed.base_url()),
        CookieHeaders::access_token("session-abc"),
    )
    .unwrap();

    let (_stop, shutdown) = watch::channel(false);
    let mut stream = client.open(shutdown).await.unwrap();

    assert_eq!(feed.cookie().as_deref(), Some("access_token=session-abc"));
    assert!(feed.authorization().is_none());
    assert_eq!(stream.recv().await.unwrap().resource_id, "c");
}

#[tokio::test]
async fn test_unreachable_backend_is_transient() {
    // Bind then release a port so nothing is listening on it
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = StreamClient::new(
        StreamConfig::new(format!("http://{}", addr)).with_connect_timeout(Duration::from_secs(2)),
        BearerTokenHeaders::new("t"),
    )
    .unwrap();

    let (_stop, shutdown) = watch::channel(false);
    let err = client.open(shutdown).await.err().unwrap();
    assert!(matches!(err, StreamError::Transport(_)));
    assert!(err.should_reconnect());
}

struct ExpiredSession;

#[async_trait]
impl RequestHeaderBuilder for ExpiredSession {
    async fn build_request_headers(&self) -> Result<HeaderMap, StreamError> {
        Err(StreamError::Auth("session expired".to_string()))
    }
}

#[tokio::test]
async fn test_header_builder_failure_skips_connect() {
    let feed = TestChangeFeed::with_text_frames([change("created", "x")], AfterFrames::Hold).await;

    let client = StreamClient::new(StreamConfig::new(feed.base_url()), ExpiredSession).unwrap();

    let (_stop, shutdown) = watch::channel(false);
    let err = client.open(shutdown).await.err().unwrap();
    assert_eq!(err, StreamError::Auth("session expired".to_string()));
    assert_eq!(feed.connections(), 0);
}
