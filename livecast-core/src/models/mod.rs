pub mod analytics;
pub mod chat;
pub mod grant;
pub mod id;
pub mod notification;
pub mod reaction;
pub mod registry;
pub mod stream_key;
pub mod vod;

pub use analytics::{StreamAnalytics, TimeSeriesPoint, ViewerSession};
pub use chat::{
    ChatMessage, ChatMessageKind, ChatParticipant, ChatRoomInfo, ChatRoomSettings, SYSTEM_SENDER,
};
pub use grant::{GrantClaims, IssuedGrant, VideoGrant};
pub use id::{generate_id, Identity, RoomId};
pub use notification::{
    Notification, NotificationKind, NotificationPriority, Subscription, SubscriptionPrefs,
};
pub use reaction::{Reaction, ReactionPosition, ReactionStats, ReactionType, TopReactor};
pub use registry::StreamRegistryEntry;
pub use stream_key::{StreamKey, StreamPermissions};
pub use vod::{PlaybackSession, VodRecording, VodStatus, EGRESS_ID_KEY};
