use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, Default, sqlx::FromRow)]
pub struct Stream {
    /// The unique identifier for the stream.
    pub id: Uuid,
    /// The owning user, one stream per user.
    pub user_id: Uuid,
    /// The media server room backing this stream, assigned at creation.
    pub room_name: String,
    /// The title of the stream.
    pub title: String,
    /// Whether the stream is believed live. Maintained by the reconciler,
    /// may be stale between sweeps.
    pub is_live: bool,
    /// Last-known viewer count, never negative.
    pub viewer_count: i32,
    /// Latest preview image, if one has been captured.
    pub thumbnail_url: Option<String>,
    /// Whether chat is enabled for this stream.
    pub chat_enabled: bool,
    /// The launched token tied to this stream, if any.
    pub token_address: Option<String>,
    /// When the stream was created.
    pub created_at: DateTime<Utc>,
    /// When the stream was last updated.
    pub updated_at: DateTime<Utc>,
}
