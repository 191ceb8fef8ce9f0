use hmac::{Hmac, Mac};
use jwt::VerifyWithKey;
use sha2::Sha256;

use super::*;

fn participant(identity: &str) -> Participant {
    Participant {
        identity: identity.to_string(),
        name: String::new(),
    }
}

#[test]
fn test_host_present() {
    let owner = Uuid::new_v4();

    assert!(!host_present(&[], owner));
    assert!(!host_present(&[participant("viewer-1")], owner));
    assert!(host_present(
        &[participant("viewer-1"), participant(&owner.to_string())],
        owner
    ));
}

#[test]
fn test_viewer_count_excludes_host() {
    let owner = Uuid::new_v4();

    assert_eq!(viewer_count(&[], owner), 0);
    assert_eq!(viewer_count(&[participant(&owner.to_string())], owner), 0);

    let participants = vec![
        participant(&owner.to_string()),
        participant("viewer-1"),
        participant("viewer-2"),
        participant("viewer-3"),
    ];
    assert_eq!(viewer_count(&participants, owner), 3);
}

struct FakeRooms {
    participants: Vec<Participant>,
    fail: bool,
}

impl FakeRooms {
    fn with_participants(participants: Vec<Participant>) -> Self {
        Self {
            participants,
            fail: false,
        }
    }

    fn unavailable() -> Self {
        Self {
            participants: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl RoomApi for FakeRooms {
    async fn list_rooms(&self) -> Result<Vec<Room>, RoomApiError> {
        Ok(Vec::new())
    }

    async fn list_participants(&self, _room: &str) -> Result<Vec<Participant>, RoomApiError> {
        if self.fail {
            return Err(RoomApiError::Status(reqwest::StatusCode::BAD_GATEWAY));
        }

        Ok(self.participants.clone())
    }
}

#[tokio::test]
async fn test_observed_count_excludes_host() {
    let owner = Uuid::new_v4();
    let rooms = FakeRooms::with_participants(vec![
        participant(&owner.to_string()),
        participant("viewer-1"),
        participant("viewer-2"),
        participant("viewer-3"),
    ]);

    assert_eq!(observed_viewer_count(&rooms, "room-a", owner).await, 3);
}

#[tokio::test]
async fn test_observed_count_collapses_failure_to_zero() {
    let rooms = FakeRooms::unavailable();

    assert_eq!(
        observed_viewer_count(&rooms, "room-a", Uuid::new_v4()).await,
        0
    );
}

#[test]
fn test_access_token_roundtrip() {
    let client = RoomApiClient::new(&crate::config::MediaServerConfig {
        url: "http://localhost:7880".to_string(),
        api_key: "test-key".to_string(),
        api_secret: "test-secret".to_string(),
    })
    .unwrap();

    let token = client
        .access_token(VideoGrant {
            room_list: true,
            ..Default::default()
        })
        .unwrap();

    let key = Hmac::<Sha256>::new_from_slice(b"test-secret").unwrap();
    let claims: AccessClaims = token.as_str().verify_with_key(&key).unwrap();

    assert_eq!(claims.iss, "test-key");
    assert!(claims.video.room_list);
    assert!(!claims.video.room_admin);
    assert!(claims.exp > chrono::Utc::now().timestamp());
}
