//! Room-grant issuance
//!
//! Signs short-lived join tokens over a capability grant. The media plane
//! verifies them with the same `(api_key, api_secret)` pair; the issuer
//! neither stores nor re-signs tokens.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use std::time::Duration;

use crate::{
    models::{GrantClaims, IssuedGrant, Identity, RoomId, VideoGrant},
    Error, Result,
};

/// Signs room-join grants under the configured API credential pair
#[derive(Clone)]
pub struct TokenService {
    api_key: String,
    api_secret: String,
    media_url: String,
    token_ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("api_key", &self.api_key)
            .field("media_url", &self.media_url)
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

impl TokenService {
    pub fn new(api_key: String, api_secret: String, media_url: String, token_ttl: Duration) -> Self {
        Self {
            api_key,
            api_secret,
            media_url,
            token_ttl,
        }
    }

    /// Issue a signed room-join grant.
    ///
    /// Publishers get publish + data + subscribe + record; viewers get
    /// data + subscribe only.
    pub fn issue(
        &self,
        room_name: &RoomId,
        identity: &Identity,
        is_publisher: bool,
    ) -> Result<IssuedGrant> {
        if room_name.as_str().is_empty() || identity.as_str().is_empty() {
            return Err(Error::InvalidInput(
                "room_name and identity required".to_string(),
            ));
        }

        let video = if is_publisher {
            VideoGrant::publisher(room_name.as_str().to_string())
        } else {
            VideoGrant::viewer(room_name.as_str().to_string())
        };

        let now = chrono::Utc::now().timestamp();
        let claims = GrantClaims {
            iss: self.api_key.clone(),
            sub: identity.as_str().to_string(),
            iat: now,
            nbf: now,
            exp: now + self.token_ttl.as_secs() as i64,
            video,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.api_secret.as_bytes()),
        )
        .map_err(|e| Error::Internal(format!("failed to sign grant: {e}")))?;

        Ok(IssuedGrant {
            token,
            url: self.media_url.clone(),
        })
    }

    /// Verify a grant and return its claims
    pub fn verify(&self, token: &str) -> Result<GrantClaims> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.api_key]);
        validation.leeway = 30;

        let data = decode::<GrantClaims>(
            token,
            &DecodingKey::from_secret(self.api_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| Error::Authentication(format!("invalid token: {e}")))?;

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> TokenService {
        TokenService::new(
            "devkey".to_string(),
            "secret".to_string(),
            "ws://localhost:7880".to_string(),
            Duration::from_secs(24 * 3600),
        )
    }

    #[test]
    fn test_publisher_grant_round_trip() {
        let svc = test_service();
        let issued = svc
            .issue(&RoomId::from("r1"), &Identity::from("alice"), true)
            .unwrap();
        assert!(!issued.token.is_empty());
        assert_eq!(issued.url, "ws://localhost:7880");

        let claims = svc.verify(&issued.token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.video.room, "r1");
        assert!(claims.video.can_publish);
        assert!(claims.video.can_subscribe);
        assert!(claims.video.room_record);
    }

    #[test]
    fn test_viewer_grant_keeps_data_channel() {
        let svc = test_service();
        let issued = svc
            .issue(&RoomId::from("r1"), &Identity::from("bob"), false)
            .unwrap();
        let claims = svc.verify(&issued.token).unwrap();
        assert!(!claims.video.can_publish);
        assert!(claims.video.can_publish_data);
        assert!(claims.video.can_subscribe);
    }

    #[test]
    fn test_empty_identity_rejected() {
        let svc = test_service();
        let err = svc
            .issue(&RoomId::from("r1"), &Identity::from(""), false)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_wrong_secret_fails_verification() {
        let svc = test_service();
        let other = TokenService::new(
            "devkey".to_string(),
            "other-secret".to_string(),
            "ws://localhost:7880".to_string(),
            Duration::from_secs(3600),
        );
        let issued = svc
            .issue(&RoomId::from("r1"), &Identity::from("alice"), true)
            .unwrap();
        assert!(matches!(
            other.verify(&issued.token),
            Err(Error::Authentication(_))
        ));
    }
}
