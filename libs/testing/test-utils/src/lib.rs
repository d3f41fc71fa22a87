//! Shared test utilities for the vector and streaming crates
//!
//! This crate provides reusable test infrastructure:
//! - `TestQdrant`: Qdrant container with automatic cleanup (feature: "qdrant")
//! - `FakePinecone`: in-process Pinecone control and data plane (feature: "pinecone")
//! - `TestChangeFeed`: in-process websocket server emitting scripted frames (feature: "change-feed")
//! - `TestDataBuilder`: Deterministic test data generation (always available)
//! - `assertions`: Custom assertion helpers (always available)
//!
//! # Features
//!
//! - `qdrant`: Enables the Qdrant container (needs Docker)
//! - `pinecone`: Enables the fake Pinecone server
//! - `change-feed`: Enables the fake change feed
//! - `all`: Enables everything
//!
//! # Usage
//!
//! ## Pinecone Testing
//!
//! Add `features = ["pinecone"]` to your dev-dependencies:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { workspace = true, features = ["pinecone"] }
//! ```
//!
//! Then in your tests:
//!
//! ```rust,ignore
//! use test_utils::FakePinecone;
//!
//! #[tokio::test]
//! async fn my_pinecone_test() {
//!     let pinecone = FakePinecone::start("k").await;
//!     let config = PineconeConfig::new("t", "k").with_controller_url(pinecone.url());
//!     // ...
//! }
//! ```

#[cfg(feature = "change-feed")]
mod change_feed;

#[cfg(feature = "pinecone")]
mod pinecone;

#[cfg(feature = "qdrant")]
mod qdrant;

#[cfg(feature = "change-feed")]
pub use change_feed::{AfterFrames, CHANGE_FEED_PATH, FeedFrame, TestChangeFeed};

#[cfg(feature = "pinecone")]
pub use pinecone::FakePinecone;

#[cfg(feature = "qdrant")]
pub use qdrant::TestQdrant;

/// Builder for test data with deterministic randomization
///
/// This ensures tests are reproducible by using seeded random data.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    /// Create a new builder with a seed (for deterministic tests)
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create from test name (generates seed from test name hash)
    ///
    /// This is the recommended way to create a builder for consistent test data.
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("test_upsert_then_query");
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Generate an index name unique to the test
    ///
    /// Lowercase letters, digits and hyphens only, which every provider accepts.
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::new(42);
    /// assert_eq!(builder.index_name("demo"), "test-42-demo");
    /// ```
    pub fn index_name(&self, suffix: &str) -> String {
        format!("test-{}-{}", self.seed, suffix)
    }

    /// Generate a record id
    pub fn record_id(&self, n: u32) -> String {
        format!("rec-{}-{}", self.seed, n)
    }

    /// Generate a deterministic vector with components in [-1, 1)
    pub fn vector(&self, dimension: usize, n: u32) -> Vec<f32> {
        let mut state = self
            .seed
            .wrapping_add(u64::from(n).wrapping_mul(0x9e37_79b9_7f4a_7c15));

        (0..dimension)
            .map(|_| {
                // xorshift64
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                ((state >> 40) as f32 / (1u64 << 24) as f32) * 2.0 - 1.0
            })
            .collect()
    }
}

/// Test assertion helpers
pub mod assertions {
    /// Assert that scores never increase
    pub fn assert_descending(scores: &[f32], context: &str) {
        for pair in scores.windows(2) {
            assert!(
                pair[0] >= pair[1],
                "{}: scores not descending: {:?}",
                context,
                scores
            );
        }
    }

    /// Assert two scores agree within floating point noise
    pub fn assert_score_close(actual: f32, expected: f32, context: &str) {
        assert!(
            (actual - expected).abs() < 1e-4,
            "{}: expected score {}, got {}",
            context,
            expected,
            actual
        );
    }
}
