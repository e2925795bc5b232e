use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::info;
use url::Url;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        share::{InvitationStatus, PublicShareLink, ShareInvitation, SharePermission, TripShare},
        trip::Trip,
    },
    services::store::TripStore,
};

const INVITATION_TTL_DAYS: i64 = 7;
const DEFAULT_LINK_TTL_DAYS: i64 = 30;

/// Issues and redeems share invitations and public share links.
#[derive(Clone)]
pub struct SharingManager {
    db: DbPool,
    public_base_url: Arc<String>,
}

impl SharingManager {
    pub fn new(db: DbPool, public_base_url: String) -> Self {
        Self {
            db,
            public_base_url: Arc::new(public_base_url),
        }
    }

    /// Invitation tokens bind the trip and the invited address to the moment
    /// of issuance.
    pub fn invitation_token(trip_id: &str, invited_email: &str) -> String {
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let digest = Sha256::digest(format!("{trip_id}:{invited_email}:{nanos}").as_bytes());
        hex_encode(&digest)
    }

    pub fn public_link_token() -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        hex_encode(&bytes)
    }

    pub async fn create_invitation(
        &self,
        trip_id: &str,
        invited_email: &str,
        invited_by: &str,
        permission: SharePermission,
    ) -> Result<ShareInvitation, AppError> {
        let invited_email = invited_email.trim().to_lowercase();
        if !invited_email.contains('@') {
            return Err(AppError::BadRequest("invalid email address".into()));
        }

        let now = Utc::now();
        let invitation = ShareInvitation {
            id: Uuid::new_v4().to_string(),
            trip_id: trip_id.to_string(),
            invited_email: invited_email.clone(),
            invited_by: invited_by.to_string(),
            permission: permission.as_str().to_string(),
            token: Self::invitation_token(trip_id, &invited_email),
            expires_at: now + Duration::days(INVITATION_TTL_DAYS),
            status: InvitationStatus::Pending.as_str().to_string(),
            created_at: now,
        };

        sqlx::query(
            r#"INSERT INTO share_invitations (id, trip_id, invited_email, invited_by, permission,
                                              token, expires_at, status, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
        )
        .bind(&invitation.id)
        .bind(&invitation.trip_id)
        .bind(&invitation.invited_email)
        .bind(&invitation.invited_by)
        .bind(&invitation.permission)
        .bind(&invitation.token)
        .bind(invitation.expires_at)
        .bind(&invitation.status)
        .bind(invitation.created_at)
        .execute(&self.db)
        .await?;

        Ok(invitation)
    }

    /// Redeems an invitation token for the accepting user. Expired or
    /// already-consumed invitations are refused.
    pub async fn accept_invitation(
        &self,
        store: &TripStore,
        token: &str,
        accepting_user_uuid: &str,
    ) -> Result<TripShare, AppError> {
        let invitation: Option<ShareInvitation> =
            sqlx::query_as("SELECT * FROM share_invitations WHERE token = ?1")
                .bind(token)
                .fetch_optional(&self.db)
                .await?;
        let Some(invitation) = invitation else {
            return Err(AppError::NotFound);
        };

        if invitation.status != InvitationStatus::Pending.as_str() {
            return Err(AppError::BadRequest("invitation already settled".into()));
        }
        if invitation.expires_at < Utc::now() {
            self.set_invitation_status(&invitation.id, InvitationStatus::Rejected)
                .await?;
            return Err(AppError::BadRequest("invitation expired".into()));
        }
        if invitation.invited_by == accepting_user_uuid {
            return Err(AppError::BadRequest(
                "cannot accept an invitation to your own trip".into(),
            ));
        }

        let share = store
            .upsert_share(
                &invitation.trip_id,
                &invitation.invited_by,
                accepting_user_uuid,
                &invitation.permission,
            )
            .await?;
        self.set_invitation_status(&invitation.id, InvitationStatus::Accepted)
            .await?;
        info!(trip_id = %invitation.trip_id, "share invitation accepted");

        Ok(share)
    }

    async fn set_invitation_status(
        &self,
        invitation_id: &str,
        status: InvitationStatus,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE share_invitations SET status = ?1 WHERE id = ?2")
            .bind(status.as_str())
            .bind(invitation_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    /// Mints a public read-only link token and persists it.
    pub async fn issue_public_link(
        &self,
        store: &TripStore,
        trip_id: &str,
        expires_in_days: Option<i64>,
    ) -> Result<PublicShareLink, AppError> {
        let days = expires_in_days.unwrap_or(DEFAULT_LINK_TTL_DAYS);
        if !(1..=365).contains(&days) {
            return Err(AppError::BadRequest(
                "expires_in_days must be between 1 and 365".into(),
            ));
        }
        let now = Utc::now();
        let link = PublicShareLink {
            token: Self::public_link_token(),
            trip_id: trip_id.to_string(),
            expires_at: now + Duration::days(days),
            created_at: now,
        };
        store.save_public_link(&link).await?;
        Ok(link)
    }

    /// Redeems a public link token for its trip. Unknown, expired, or
    /// mismatched tokens all look the same to the caller.
    pub async fn resolve_public_link(
        &self,
        store: &TripStore,
        trip_id: &str,
        token: &str,
    ) -> Result<Trip, AppError> {
        let Some(link) = store.fetch_public_link(token).await? else {
            return Err(AppError::NotFound);
        };
        if link.trip_id != trip_id || link.expires_at < Utc::now() {
            return Err(AppError::NotFound);
        }
        store.fetch_trip(trip_id).await?.ok_or(AppError::NotFound)
    }

    pub fn share_link(&self, trip_id: &str, token: &str) -> Result<String, AppError> {
        let mut url = Url::parse(&self.public_base_url)
            .map_err(|err| AppError::Config(format!("invalid PUBLIC_BASE_URL: {err}")))?;
        url.set_path(&format!("/shared/{trip_id}"));
        url.query_pairs_mut().append_pair("token", token);
        Ok(url.to_string())
    }

    pub fn qr_code_url(link: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(link.as_bytes()).collect();
        format!("https://api.qrserver.com/v1/create-qr-code/?size=200x200&data={encoded}")
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;

    bytes.iter().fold(
        String::with_capacity(bytes.len() * 2),
        |mut acc, byte| {
            let _ = write!(acc, "{byte:02x}");
            acc
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invitation_tokens_are_sha256_hex() {
        let token = SharingManager::invitation_token("trip-1", "friend@example.com");
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn invitation_tokens_differ_per_invitee() {
        let a = SharingManager::invitation_token("trip-1", "a@example.com");
        let b = SharingManager::invitation_token("trip-1", "b@example.com");
        assert_ne!(a, b);
    }

    #[test]
    fn public_link_tokens_are_random() {
        let a = SharingManager::public_link_token();
        let b = SharingManager::public_link_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }

    #[test]
    fn qr_url_encodes_the_link() {
        let qr = SharingManager::qr_code_url("https://app.example.com/shared/t1?token=abc");
        assert!(qr.starts_with("https://api.qrserver.com/v1/create-qr-code/"));
        assert!(qr.contains("token%3Dabc"));
    }
}
