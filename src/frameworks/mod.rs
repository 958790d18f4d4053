// Framework layer: configuration loading and process bootstrap/run.

pub mod config;
pub mod server;
