//! Process entry points: AWS Lambda and a local dev server.

mod config;
pub mod lambda;
mod server;

pub use config::RuntimeConfig;
pub use server::DevServer;
