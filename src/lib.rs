// Library interface for manga-notify
// Lets the integration tests and the binary share the same components.

pub mod chapter;
pub mod config;
pub mod detector;
pub mod http_client;
pub mod library;
pub mod models;
pub mod notify;
pub mod runner;
pub mod sources;
