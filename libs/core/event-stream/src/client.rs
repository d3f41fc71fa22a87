//! Change stream client
//!
//! Opens the websocket, then hands the socket to a background worker that
//! feeds decoded [`ChangeMessage`]s into a bounded channel.

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tracing::{Instrument, info, info_span, instrument};

use crate::auth::RequestHeaderBuilder;
use crate::config::StreamConfig;
use crate::error::StreamError;
use crate::event::ChangeMessage;
use crate::worker::{StreamWorker, WorkerExit, shutdown_signalled};

/// Client for the backend change feed
pub struct StreamClient<H> {
    config: StreamConfig,
    url: String,
    headers: H,
}

impl<H: RequestHeaderBuilder> StreamClient<H> {
    /// Create a client; fails on a malformed base URL
    pub fn new(config: StreamConfig, headers: H) -> Result<Self, StreamError> {
        config.validate()?;
        let url = config.websocket_url()?;
        Ok(Self {
            config,
            url,
            headers,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Connect and start reading.
    ///
    /// Setting `shutdown` to `true` stops the worker between frames and
    /// closes the connection. Dropping the sender without signalling does
    /// not stop it.
    #[instrument(skip_all, fields(url = %self.url), err(Display))]
    pub async fn open(&self, shutdown: watch::Receiver<bool>) -> Result<ChangeStream, StreamError> {
        let headers = self.headers.build_request_headers().await?;

        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| StreamError::InvalidConfig(e.to_string()))?;
        request.headers_mut().extend(headers);

        let (socket, response) =
            tokio::time::timeout(self.config.connect_timeout, connect_async(request))
                .await
                .map_err(|_| {
                    StreamError::Transport(format!(
                        "handshake timed out after {:?}",
                        self.config.connect_timeout
                    ))
                })??;

        info!(status = %response.status(), "Change stream connected");

        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        let consumer_shutdown = shutdown.clone();
        let worker = tokio::spawn(
            StreamWorker::new(socket, tx, shutdown)
                .run()
                .instrument(info_span!("change_stream", url = %self.url)),
        );

        Ok(ChangeStream {
            messages: rx,
            shutdown: consumer_shutdown,
            worker,
        })
    }
}

/// An open change stream
///
/// The worker may have read one message ahead into the channel buffer.
/// Once shutdown is signalled `recv` discards it, so nothing is delivered
/// after cancellation.
pub struct ChangeStream {
    messages: mpsc::Receiver<ChangeMessage>,
    shutdown: watch::Receiver<bool>,
    worker: JoinHandle<WorkerExit>,
}

impl ChangeStream {
    /// Next message; `None` once shutdown is signalled or the worker has stopped
    pub async fn recv(&mut self) -> Option<ChangeMessage> {
        if *self.shutdown.borrow() {
            return None;
        }

        tokio::select! {
            biased;
            _ = shutdown_signalled(&mut self.shutdown) => None,
            message = self.messages.recv() => message,
        }
    }

    /// Wait for the worker to stop and report why.
    ///
    /// Drops the receiver first, so a worker blocked on delivery stops
    /// with [`WorkerExit::ConsumerGone`].
    pub async fn join(self) -> WorkerExit {
        drop(self.messages);
        match self.worker.await {
            Ok(exit) => exit,
            Err(e) => WorkerExit::Failed(StreamError::Transport(format!(
                "change stream worker panicked: {}",
                e
            ))),
        }
    }

    /// Raw channel and worker handle. The raw receiver does not check the
    /// shutdown signal and may still yield a buffered message.
    pub fn into_parts(self) -> (mpsc::Receiver<ChangeMessage>, JoinHandle<WorkerExit>) {
        (self.messages, self.worker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::BearerTokenHeaders;

    #[test]
    fn test_new_rejects_bad_base_url() {
        let result = StreamClient::new(
            StreamConfig::new("not a url"),
            BearerTokenHeaders::new("t"),
        );
        assert!(matches!(result, Err(StreamError::InvalidConfig(_))));
    }

    #[test]
    fn test_url_is_derived() {
        let client = StreamClient::new(
            StreamConfig::new("https://backend.example.com"),
            BearerTokenHeaders::new("t"),
        )
        .unwrap();
        assert_eq!(
            client.url(),
            "wss://backend.example.com/api/v1/websockets/data_changes"
        );
    }

    #[tokio::test]
    async fn test_header_failure_happens_before_connect() {
        let client = StreamClient::new(
            StreamConfig::new("http://127.0.0.1:1"),
            BearerTokenHeaders::new(""),
        )
        .unwrap();
        let (_stop, shutdown) = watch::channel(false);

        let err = client.open(shutdown).await.err().unwrap();
        assert!(matches!(err, StreamError::Auth(_)));
    }
}
