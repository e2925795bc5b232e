use sqlx::Row;

use crate::{db::DbPool, error::AppError, models::share::SharePermission};

/// Answers "may this user do that to this trip". Owners can do everything;
/// shared users are limited by their grant.
#[derive(Clone)]
pub struct PermissionValidator {
    db: DbPool,
}

impl PermissionValidator {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    async fn trip_owner(&self, trip_id: &str) -> Result<Option<String>, AppError> {
        let owner = sqlx::query_scalar("SELECT owner_uuid FROM trips WHERE id = ?1")
            .bind(trip_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(owner)
    }

    async fn share_permission(
        &self,
        user_uuid: &str,
        trip_id: &str,
    ) -> Result<Option<String>, AppError> {
        let row =
            sqlx::query("SELECT permission FROM trip_shares WHERE trip_id = ?1 AND shared_with = ?2")
                .bind(trip_id)
                .bind(user_uuid)
                .fetch_optional(&self.db)
                .await?;
        Ok(row.map(|r| r.get("permission")))
    }

    pub async fn can_access_trip(&self, user_uuid: &str, trip_id: &str) -> Result<bool, AppError> {
        if self.trip_owner(trip_id).await?.as_deref() == Some(user_uuid) {
            return Ok(true);
        }
        Ok(self.share_permission(user_uuid, trip_id).await?.is_some())
    }

    pub async fn can_edit_trip(&self, user_uuid: &str, trip_id: &str) -> Result<bool, AppError> {
        if self.trip_owner(trip_id).await?.as_deref() == Some(user_uuid) {
            return Ok(true);
        }
        let permission = self.share_permission(user_uuid, trip_id).await?;
        Ok(permission.as_deref() == Some(SharePermission::Edit.as_str()))
    }

    pub async fn can_delete_trip(&self, user_uuid: &str, trip_id: &str) -> Result<bool, AppError> {
        Ok(self.trip_owner(trip_id).await?.as_deref() == Some(user_uuid))
    }

    pub async fn can_manage_sharing(
        &self,
        user_uuid: &str,
        trip_id: &str,
    ) -> Result<bool, AppError> {
        Ok(self.trip_owner(trip_id).await?.as_deref() == Some(user_uuid))
    }

    /// Shorthand used by handlers: error instead of bool.
    pub async fn require_access(&self, user_uuid: &str, trip_id: &str) -> Result<(), AppError> {
        if self.can_access_trip(user_uuid, trip_id).await? {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    pub async fn require_edit(&self, user_uuid: &str, trip_id: &str) -> Result<(), AppError> {
        if self.can_edit_trip(user_uuid, trip_id).await? {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    pub async fn require_owner(&self, user_uuid: &str, trip_id: &str) -> Result<(), AppError> {
        if self.can_manage_sharing(user_uuid, trip_id).await? {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}
