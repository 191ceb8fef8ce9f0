use anyhow::bail;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use crate::config::MediaServerConfig;

#[derive(Debug, thiserror::Error)]
pub enum RoomApiError {
    #[error("failed to sign access token")]
    Token,
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status: {0}")]
    Status(reqwest::StatusCode),
}

/// Claims of a short-lived media server access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub iss: String,
    pub exp: i64,
    pub video: VideoGrant,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoGrant {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub room_list: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub room_admin: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Room {
    pub name: String,
    #[serde(default)]
    pub num_participants: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Participant {
    pub identity: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
struct ListRoomsResponse {
    #[serde(default)]
    rooms: Vec<Room>,
}

#[derive(Debug, Default, Deserialize)]
struct ListParticipantsResponse {
    #[serde(default)]
    participants: Vec<Participant>,
}

/// Room state queries against the media server. A trait so tests can stand
/// in a fake for the HTTP client.
#[async_trait]
pub trait RoomApi: Send + Sync + 'static {
    async fn list_rooms(&self) -> Result<Vec<Room>, RoomApiError>;

    async fn list_participants(&self, room: &str) -> Result<Vec<Participant>, RoomApiError>;
}

pub struct RoomApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

impl RoomApiClient {
    pub fn new(config: &MediaServerConfig) -> anyhow::Result<Self> {
        if config.url.is_empty() {
            bail!("media server url is required");
        }

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        })
    }

    /// Signs a short-lived bearer token carrying the given video grant.
    fn access_token(&self, grant: VideoGrant) -> Result<String, RoomApiError> {
        let key = Hmac::<Sha256>::new_from_slice(self.api_secret.as_bytes())
            .map_err(|_| RoomApiError::Token)?;

        let claims = AccessClaims {
            iss: self.api_key.clone(),
            exp: (Utc::now() + Duration::minutes(5)).timestamp(),
            video: grant,
        };

        claims.sign_with_key(&key).map_err(|_| RoomApiError::Token)
    }

    async fn twirp<Req: Serialize, Resp: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        grant: VideoGrant,
        body: &Req,
    ) -> Result<Resp, RoomApiError> {
        let token = self.access_token(grant)?;

        let resp = self
            .http
            .post(format!(
                "{}/twirp/livekit.RoomService/{}",
                self.base_url, method
            ))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(RoomApiError::Status(resp.status()));
        }

        Ok(resp.json().await?)
    }
}

#[async_trait]
impl RoomApi for RoomApiClient {
    async fn list_rooms(&self) -> Result<Vec<Room>, RoomApiError> {
        let resp: ListRoomsResponse = self
            .twirp(
                "ListRooms",
                VideoGrant {
                    room_list: true,
                    ..Default::default()
                },
                &serde_json::json!({}),
            )
            .await?;

        Ok(resp.rooms)
    }

    async fn list_participants(&self, room: &str) -> Result<Vec<Participant>, RoomApiError> {
        let resp: ListParticipantsResponse = self
            .twirp(
                "ListParticipants",
                VideoGrant {
                    room_admin: true,
                    room: Some(room.to_string()),
                    ..Default::default()
                },
                &serde_json::json!({ "room": room }),
            )
            .await?;

        Ok(resp.participants)
    }
}

/// The host publishes under an identity equal to their raw user id. Viewer
/// connections use a different identity convention, so an exact match is the
/// only reliable host test.
pub fn host_present(participants: &[Participant], owner_id: Uuid) -> bool {
    let owner = owner_id.to_string();
    participants.iter().any(|p| p.identity == owner)
}

pub fn viewer_count(participants: &[Participant], owner_id: Uuid) -> i32 {
    let owner = owner_id.to_string();
    participants.iter().filter(|p| p.identity != owner).count() as i32
}

/// Viewer count for client-facing reads. Any media server failure collapses
/// to zero; an error never reaches the caller on this path.
pub async fn observed_viewer_count(rooms: &dyn RoomApi, room: &str, owner_id: Uuid) -> i32 {
    match rooms.list_participants(room).await {
        Ok(participants) => viewer_count(&participants, owner_id),
        Err(err) => {
            tracing::debug!(room = %room, error = %err, "participant query failed, reporting zero");
            0
        }
    }
}

#[cfg(test)]
mod tests;
