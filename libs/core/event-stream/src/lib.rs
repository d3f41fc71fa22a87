//! Change-event stream client
//!
//! Subscribes to the backend's change feed over a websocket and delivers
//! decoded change messages in arrival order.
//!
//! ```text
//! StreamConfig ─► StreamClient::open ─► worker task ─► mpsc (capacity 1) ─► ChangeStream::recv
//!                       ▲                    │
//!        RequestHeaderBuilder         watch::Receiver<bool> (shutdown)
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use event_stream::{BearerTokenHeaders, StreamClient, StreamConfig};
//! use tokio::sync::watch;
//!
//! # async fn run() -> Result<(), event_stream::StreamError> {
//! let client = StreamClient::new(
//!     StreamConfig::new("https://backend.example.com"),
//!     BearerTokenHeaders::new("token"),
//! )?;
//!
//! let (stop, shutdown) = watch::channel(false);
//! let mut stream = client.open(shutdown).await?;
//!
//! while let Some(change) = stream.recv().await {
//!     println!("{:?} {}", change.kind, change.resource_id);
//!     # break;
//! }
//!
//! let _ = stop.send(true);
//! let exit = stream.join().await;
//! # let _ = exit;
//! # Ok(())
//! # }
//! ```

mod auth;
mod client;
mod config;
mod error;
mod event;
mod worker;

pub use auth::{BearerTokenHeaders, CookieHeaders, DEFAULT_TOKEN_COOKIE, RequestHeaderBuilder};
pub use client::{ChangeStream, StreamClient};
pub use config::{DEFAULT_CHANGES_PATH, StreamConfig};
pub use error::{ErrorCategory, StreamError};
pub use event::{ChangeKind, ChangeMessage};
pub use worker::WorkerExit;
