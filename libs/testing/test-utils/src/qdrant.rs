//! Qdrant test infrastructure
//!
//! Provides a `TestQdrant` helper that creates a Qdrant container for testing.

use qdrant_client::Qdrant;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage};

const QDRANT_IMAGE: &str = "qdrant/qdrant";
const QDRANT_TAG: &str = "v1.15.1";
const GRPC_PORT: u16 = 6334;

/// Test Qdrant wrapper that ensures proper cleanup
///
/// The container is automatically stopped and removed when this struct is dropped.
/// The container speaks plaintext gRPC, so build searchers from [`TestQdrant::client`].
///
/// # Example
///
/// ```no_run
/// use test_utils::TestQdrant;
///
/// # async fn example() {
/// let qdrant = TestQdrant::new().await;
/// let client = qdrant.client();
/// assert!(client.health_check().await.is_ok());
/// # }
/// ```
pub struct TestQdrant {
    #[allow(dead_code)]
    container: ContainerAsync<GenericImage>,
    pub url: String,
}

impl TestQdrant {
    /// Create a new test Qdrant instance
    pub async fn new() -> Self {
        let container = GenericImage::new(QDRANT_IMAGE, QDRANT_TAG)
            .with_exposed_port(GRPC_PORT.tcp())
            .with_wait_for(WaitFor::message_on_stdout("gRPC listening"))
            .start()
            .await
            .expect("Failed to start Qdrant container");

        let host_port = container
            .get_host_port_ipv4(GRPC_PORT)
            .await
            .expect("Failed to get Qdrant port");

        let url = format!("http://127.0.0.1:{}", host_port);

        tracing::info!(port = host_port, "Test Qdrant ready ({})", QDRANT_TAG);

        Self { container, url }
    }

    /// Get a fresh client (useful for passing to searchers)
    pub fn client(&self) -> Qdrant {
        Qdrant::from_url(&self.url)
            .build()
            .expect("Failed to create Qdrant client")
    }

    /// Get the gRPC URL for manual client creation
    pub fn url(&self) -> &str {
        &self.url
    }
}

// Container is automatically cleaned up when TestQdrant is dropped
impl Drop for TestQdrant {
    fn drop(&mut self) {
        tracing::debug!("Cleaning up test Qdrant container");
    }
}
