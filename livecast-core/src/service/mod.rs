pub mod analytics;
pub mod chat;
pub mod content_filter;
pub mod egress;
pub mod notification;
pub mod reaction;
pub mod registry;
pub mod stream_key;
pub mod token;
pub mod vod;

pub use analytics::AnalyticsEngine;
pub use chat::ChatEngine;
pub use content_filter::ContentFilter;
pub use egress::{EgressClient, EgressInfo, FileOutput, HttpEgressClient};
pub use notification::NotificationFabric;
pub use reaction::ReactionEngine;
pub use registry::StreamRegistry;
pub use stream_key::StreamKeyService;
pub use token::TokenService;
pub use vod::VodCoordinator;
