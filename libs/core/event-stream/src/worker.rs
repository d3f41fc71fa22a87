//! Frame reader
//!
//! One worker per connection: read a frame, decode it, hand it to the
//! consumer, repeat. The shutdown signal is only acted on between frames, so
//! a message is either fully delivered or dropped, never split.

use std::time::Duration;

use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, error, info, warn};

use crate::error::StreamError;
use crate::event::ChangeMessage;

const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Why the worker stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerExit {
    /// The consumer signalled shutdown
    Cancelled,
    /// The consumer dropped its receiver
    ConsumerGone,
    /// The server closed the connection
    ClosedByServer,
    /// Transport or decode failure
    Failed(StreamError),
}

impl WorkerExit {
    pub fn is_failure(&self) -> bool {
        matches!(self, WorkerExit::Failed(_))
    }
}

pub(crate) struct StreamWorker<S> {
    socket: S,
    messages: mpsc::Sender<ChangeMessage>,
    shutdown: watch::Receiver<bool>,
}

impl<S> StreamWorker<S>
where
    S: Stream<Item = Result<Message, tungstenite::Error>>
        + Sink<Message, Error = tungstenite::Error>
        + Unpin
        + Send,
{
    pub(crate) fn new(
        socket: S,
        messages: mpsc::Sender<ChangeMessage>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            socket,
            messages,
            shutdown,
        }
    }

    /// Run until shutdown, consumer loss, server close or failure.
    ///
    /// The output channel closes when this returns.
    pub(crate) async fn run(mut self) -> WorkerExit {
        info!("Change stream worker started");
        let mut delivered: u64 = 0;

        let exit = loop {
            let frame = tokio::select! {
                biased;
                _ = shutdown_signalled(&mut self.shutdown) => break WorkerExit::Cancelled,
                _ = self.messages.closed() => break WorkerExit::ConsumerGone,
                frame = self.socket.next() => frame,
            };

            let decoded = match frame {
                None => break WorkerExit::ClosedByServer,
                Some(Err(e)) => break WorkerExit::Failed(e.into()),
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "Server sent close frame");
                    break WorkerExit::ClosedByServer;
                }
                Some(Ok(Message::Text(text))) => ChangeMessage::decode(text.as_bytes()),
                Some(Ok(Message::Binary(bytes))) => ChangeMessage::decode(&bytes),
                // Ping/pong are answered by the transport
                Some(Ok(_)) => continue,
            };

            let message = match decoded {
                Ok(message) => message,
                Err(e) => break WorkerExit::Failed(e),
            };

            debug!(kind = ?message.kind, resource_id = %message.resource_id, "Change received");

            tokio::select! {
                biased;
                _ = shutdown_signalled(&mut self.shutdown) => break WorkerExit::Cancelled,
                sent = self.messages.send(message) => {
                    if sent.is_err() {
                        break WorkerExit::ConsumerGone;
                    }
                    delivered += 1;
                }
            }
        };

        match &exit {
            WorkerExit::Failed(e) => {
                error!(error = %e, category = ?e.category(), delivered, "Change stream failed");
            }
            other => info!(exit = ?other, delivered, "Change stream worker stopped"),
        }

        if matches!(exit, WorkerExit::Cancelled | WorkerExit::ConsumerGone) {
            self.close().await;
        }

        exit
    }

    async fn close(&mut self) {
        match tokio::time::timeout(CLOSE_TIMEOUT, self.socket.close()).await {
            Ok(Ok(())) => debug!("Sent close frame"),
            Ok(Err(e)) => warn!(error = %e, "Failed to close change stream"),
            Err(_) => warn!("Timed out closing change stream"),
        }
    }
}

/// Resolves once `true` is signalled; never resolves if the sender is
/// dropped without signalling.
pub(crate) async fn shutdown_signalled(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}
