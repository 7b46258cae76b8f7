//! HTTP API.

pub mod http;

pub use http::{routes, ApiError};
