mod client;
mod config;
mod wire;

pub use client::PineconeSearcher;
pub use config::{PineconeConfig, API_VERSION, DEFAULT_CONTROLLER_URL};
