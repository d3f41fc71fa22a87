mod client;
mod config;
mod payload;

pub use client::QdrantSearcher;
pub use config::QdrantConfig;
