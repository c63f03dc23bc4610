//! livecast-api
//!
//! HTTP/JSON REST surface and WebSocket push endpoints projecting the
//! livecast-core engines. This crate is the only layer that maps engine
//! errors to HTTP status codes.

pub mod http;

pub use http::{create_router, AppError, AppResult, AppState};
