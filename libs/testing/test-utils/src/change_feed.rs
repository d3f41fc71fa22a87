//! Fake change feed
//!
//! An in-process websocket server on `/api/v1/websockets/data_changes` that
//! sends a scripted list of frames to each connection. It records the
//! credentials each connection presented and whether the client sent a
//! close frame.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const CHANGE_FEED_PATH: &str = "/api/v1/websockets/data_changes";

/// One scripted server frame
#[derive(Debug, Clone)]
pub enum FeedFrame {
    Text(String),
    Binary(Vec<u8>),
    Ping,
}

/// What the server does once the script is exhausted
#[derive(Debug, Clone, Copy)]
pub enum AfterFrames {
    /// Keep the connection open and silent
    Hold,
    /// Send a close frame
    Close,
    /// Resend the last frame at this interval until the client goes away
    Repeat(Duration),
}

struct FeedState {
    frames: Vec<FeedFrame>,
    after: AfterFrames,
    authorization: Mutex<Option<String>>,
    cookie: Mutex<Option<String>>,
    connections: AtomicUsize,
    client_closed: AtomicBool,
}

type Shared = Arc<FeedState>;

/// Scripted websocket server
///
/// The server is shut down when this struct is dropped.
///
/// # Example
///
/// ```no_run
/// use test_utils::{AfterFrames, FeedFrame, TestChangeFeed};
///
/// # async fn example() {
/// let feed = TestChangeFeed::start(
///     vec![FeedFrame::Text(r#"{"kind":"created"}"#.to_string())],
///     AfterFrames::Hold,
/// )
/// .await;
/// // Point the stream client's base URL at feed.base_url()
/// # }
/// ```
pub struct TestChangeFeed {
    addr: SocketAddr,
    state: Shared,
    handle: JoinHandle<()>,
}

impl TestChangeFeed {
    pub async fn start(frames: Vec<FeedFrame>, after: AfterFrames) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind change feed listener");
        let addr = listener.local_addr().expect("Failed to read local address");

        let state = Arc::new(FeedState {
            frames,
            after,
            authorization: Mutex::new(None),
            cookie: Mutex::new(None),
            connections: AtomicUsize::new(0),
            client_closed: AtomicBool::new(false),
        });

        let router = Router::new()
            .route(CHANGE_FEED_PATH, get(upgrade))
            .with_state(state.clone());

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!(error = %e, "Change feed server stopped");
            }
        });

        tracing::info!(%addr, "Test change feed ready");

        Self {
            addr,
            state,
            handle,
        }
    }

    /// Convenience for a feed of JSON text frames
    pub async fn with_text_frames<I, S>(frames: I, after: AfterFrames) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let frames = frames
            .into_iter()
            .map(|f| FeedFrame::Text(f.into()))
            .collect();
        Self::start(frames, after).await
    }

    /// Backend base URL (plain http; the client derives the ws URL)
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// `Authorization` header of the latest connection
    pub fn authorization(&self) -> Option<String> {
        self.state
            .authorization
            .lock()
            .expect("change feed state poisoned")
            .clone()
    }

    /// `Cookie` header of the latest connection
    pub fn cookie(&self) -> Option<String> {
        self.state
            .cookie
            .lock()
            .expect("change feed state poisoned")
            .clone()
    }

    pub fn connections(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }

    /// Wait up to `timeout` for a client close frame
    pub async fn wait_for_client_close(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if self.state.client_closed.load(Ordering::SeqCst) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.state.client_closed.load(Ordering::SeqCst)
    }
}

impl Drop for TestChangeFeed {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn header_value(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn upgrade(
    State(state): State<Shared>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    *state.authorization.lock().expect("change feed state poisoned") =
        header_value(&headers, header::AUTHORIZATION);
    *state.cookie.lock().expect("change feed state poisoned") =
        header_value(&headers, header::COOKIE);
    state.connections.fetch_add(1, Ordering::SeqCst);

    ws.on_upgrade(move |socket| serve(socket, state))
}

fn to_message(frame: &FeedFrame) -> Message {
    match frame {
        FeedFrame::Text(text) => Message::Text(text.clone().into()),
        FeedFrame::Binary(bytes) => Message::Binary(bytes.clone().into()),
        FeedFrame::Ping => Message::Ping(Vec::new().into()),
    }
}

async fn serve(mut socket: WebSocket, state: Shared) {
    for frame in &state.frames {
        if socket.send(to_message(frame)).await.is_err() {
            return;
        }
    }

    let repeat = match state.after {
        AfterFrames::Close => {
            let _ = socket.send(Message::Close(None)).await;
            None
        }
        AfterFrames::Hold => None,
        AfterFrames::Repeat(interval) => state.frames.last().map(|f| (interval, f.clone())),
    };

    loop {
        tokio::select! {
            message = socket.recv() => match message {
                Some(Ok(Message::Close(_))) => {
                    state.client_closed.store(true, Ordering::SeqCst);
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(_)) | None => break,
            },
            _ = tokio::time::sleep(repeat.as_ref().map_or(Duration::MAX, |(i, _)| *i)), if repeat.is_some() => {
                if let Some((_, frame)) = &repeat
                    && socket.send(to_message(frame)).await.is_err()
                {
                    break;
                }
            }
        }
    }
}
