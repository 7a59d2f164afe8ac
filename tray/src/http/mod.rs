//! JSON-over-HTTP transport for build servers

pub mod client;
pub mod sources;

pub use client::{Credentials, HttpClient};
pub use sources::{HttpProjectSource, HttpServerSource, ServerConnection};
