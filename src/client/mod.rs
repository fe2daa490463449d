mod client;
mod config;

pub use client::RtmpClient;
pub use config::{ClientConfig, ClientConfigBuilder};
