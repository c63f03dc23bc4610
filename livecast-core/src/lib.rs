//! livecast-core
//!
//! The interactive control plane of a live-streaming platform: credential
//! issuance, chat, reactions, recording coordination, analytics, and the
//! follower/notification fabric. The WebRTC media plane and the encoder
//! are external collaborators reached through narrow seams.

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod repository;
pub mod service;

pub use config::Config;
pub use error::{Error, Result};
