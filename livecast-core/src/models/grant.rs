use serde::{Deserialize, Serialize};

/// Capability bits of a room-join grant, embedded in the signed token.
///
/// Viewers keep `can_publish_data` so chat and reactions still flow over
/// the media plane's data channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoGrant {
    pub room: String,
    pub room_join: bool,
    pub can_publish: bool,
    pub can_publish_data: bool,
    pub can_subscribe: bool,
    pub room_record: bool,
}

impl VideoGrant {
    /// Capabilities for a publishing streamer
    #[must_use]
    pub fn publisher(room: String) -> Self {
        Self {
            room,
            room_join: true,
            can_publish: true,
            can_publish_data: true,
            can_subscribe: true,
            room_record: true,
        }
    }

    /// Capabilities for a viewer
    #[must_use]
    pub fn viewer(room: String) -> Self {
        Self {
            room,
            room_join: true,
            can_publish: false,
            can_publish_data: true,
            can_subscribe: true,
            room_record: false,
        }
    }
}

/// Claims record signed into a room-join token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantClaims {
    /// API key the grant was signed under
    pub iss: String,
    /// Participant identity
    pub sub: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    pub video: VideoGrant,
}

/// A signed grant plus the media-plane URL the client should dial
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedGrant {
    pub token: String,
    pub url: String,
}
