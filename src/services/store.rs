use chrono::Utc;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        itinerary::Itinerary,
        location::Location,
        review::PlaceReview,
        share::{PublicShareLink, TripShare},
        trip::{BudgetByCategory, BudgetSummary, Trip},
        user::User,
    },
};

/// Persistence for trips and everything they compose.
#[derive(Clone)]
pub struct TripStore {
    db: DbPool,
}

impl TripStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    // ---- trips ----

    pub async fn create_trip(&self, trip: &Trip) -> Result<(), AppError> {
        sqlx::query(
            r#"INSERT INTO trips (id, owner_uuid, title, description, start_date, end_date,
                                  total_budget, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
        )
        .bind(&trip.id)
        .bind(&trip.owner_uuid)
        .bind(&trip.title)
        .bind(&trip.description)
        .bind(trip.start_date)
        .bind(trip.end_date)
        .bind(trip.total_budget)
        .bind(trip.created_at)
        .bind(trip.updated_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    pub async fn fetch_trip(&self, trip_id: &str) -> Result<Option<Trip>, AppError> {
        let trip = sqlx::query_as("SELECT * FROM trips WHERE id = ?1")
            .bind(trip_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(trip)
    }

    /// Trips the user owns plus trips shared with them, newest first.
    pub async fn list_trips_for(&self, user_uuid: &str) -> Result<Vec<Trip>, AppError> {
        let trips = sqlx::query_as(
            r#"SELECT DISTINCT t.* FROM trips t
               LEFT JOIN trip_shares s ON s.trip_id = t.id
               WHERE t.owner_uuid = ?1 OR s.shared_with = ?1
               ORDER BY t.created_at DESC"#,
        )
        .bind(user_uuid)
        .fetch_all(&self.db)
        .await?;
        Ok(trips)
    }

    pub async fn update_trip(&self, trip: &Trip) -> Result<(), AppError> {
        sqlx::query(
            r#"UPDATE trips SET title = ?1, description = ?2, start_date = ?3, end_date = ?4,
                                total_budget = ?5, updated_at = ?6
               WHERE id = ?7"#,
        )
        .bind(&trip.title)
        .bind(&trip.description)
        .bind(trip.start_date)
        .bind(trip.end_date)
        .bind(trip.total_budget)
        .bind(Utc::now())
        .bind(&trip.id)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    pub async fn delete_trip(&self, trip_id: &str) -> Result<(), AppError> {
        let mut tx = self.db.begin().await?;
        sqlx::query(
            "DELETE FROM place_reviews WHERE location_id IN (SELECT id FROM locations WHERE trip_id = ?1)",
        )
        .bind(trip_id)
        .execute(&mut *tx)
        .await?;
        for table in [
            "itineraries",
            "locations",
            "trip_shares",
            "share_invitations",
            "public_share_links",
        ] {
            sqlx::query(&format!("DELETE FROM {table} WHERE trip_id = ?1"))
                .bind(trip_id)
                .execute(&mut *tx)
                .await?;
        }
        sqlx::query("DELETE FROM trips WHERE id = ?1")
            .bind(trip_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn touch_trip(&self, trip_id: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE trips SET updated_at = ?1 WHERE id = ?2")
            .bind(Utc::now())
            .bind(trip_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    // ---- budget ----

    pub async fn budget_summary(&self, trip: &Trip) -> Result<BudgetSummary, AppError> {
        let activities: f64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(budget), 0) FROM itineraries WHERE trip_id = ?1")
                .bind(&trip.id)
                .fetch_one(&self.db)
                .await?;
        let transportation: f64 = sqlx::query_scalar(
            r#"SELECT COALESCE(SUM(json_extract(transportation, '$.cost')), 0)
               FROM itineraries WHERE trip_id = ?1 AND transportation IS NOT NULL"#,
        )
        .bind(&trip.id)
        .fetch_one(&self.db)
        .await?;

        let spent = activities + transportation;
        Ok(BudgetSummary {
            trip_id: trip.id.clone(),
            total_budget: trip.total_budget,
            spent_budget: spent,
            remaining: trip.total_budget - spent,
            by_category: BudgetByCategory {
                activities,
                transportation,
            },
        })
    }

    pub async fn spent_budget(&self, trip: &Trip) -> Result<f64, AppError> {
        Ok(self.budget_summary(trip).await?.spent_budget)
    }

    // ---- locations ----

    pub async fn add_location(&self, location: &Location) -> Result<(), AppError> {
        sqlx::query(
            r#"INSERT INTO locations (id, trip_id, name, latitude, longitude, address,
                                      place_id, rating, photo_url)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
        )
        .bind(&location.id)
        .bind(&location.trip_id)
        .bind(&location.name)
        .bind(location.latitude)
        .bind(location.longitude)
        .bind(&location.address)
        .bind(&location.place_id)
        .bind(location.rating)
        .bind(&location.photo_url)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    pub async fn fetch_location(&self, location_id: &str) -> Result<Option<Location>, AppError> {
        let location = sqlx::query_as("SELECT * FROM locations WHERE id = ?1")
            .bind(location_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(location)
    }

    pub async fn trip_locations(&self, trip_id: &str) -> Result<Vec<Location>, AppError> {
        let locations = sqlx::query_as("SELECT * FROM locations WHERE trip_id = ?1 ORDER BY name")
            .bind(trip_id)
            .fetch_all(&self.db)
            .await?;
        Ok(locations)
    }

    /// Removes a location together with the itinerary entries and reviews
    /// that reference it. Returns false when the location is not part of the
    /// trip.
    pub async fn remove_location(&self, trip_id: &str, location_id: &str) -> Result<bool, AppError> {
        let mut tx = self.db.begin().await?;
        let result = sqlx::query("DELETE FROM locations WHERE id = ?1 AND trip_id = ?2")
            .bind(location_id)
            .bind(trip_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }
        sqlx::query("DELETE FROM itineraries WHERE location_id = ?1")
            .bind(location_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM place_reviews WHERE location_id = ?1")
            .bind(location_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(true)
    }

    // ---- itineraries ----

    pub async fn add_itinerary(&self, entry: &Itinerary) -> Result<(), AppError> {
        sqlx::query(
            r#"INSERT INTO itineraries (id, trip_id, location_id, position, start_time, end_time,
                                        budget, notes, photos, transportation)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"#,
        )
        .bind(&entry.id)
        .bind(&entry.trip_id)
        .bind(&entry.location_id)
        .bind(entry.position)
        .bind(entry.start_time)
        .bind(entry.end_time)
        .bind(entry.budget)
        .bind(&entry.notes)
        .bind(entry.photos.clone())
        .bind(entry.transportation.clone())
        .execute(&self.db)
        .await?;
        Ok(())
    }

    pub async fn fetch_itinerary(&self, itinerary_id: &str) -> Result<Option<Itinerary>, AppError> {
        let entry = sqlx::query_as("SELECT * FROM itineraries WHERE id = ?1")
            .bind(itinerary_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(entry)
    }

    pub async fn trip_itineraries(&self, trip_id: &str) -> Result<Vec<Itinerary>, AppError> {
        let entries =
            sqlx::query_as("SELECT * FROM itineraries WHERE trip_id = ?1 ORDER BY position")
                .bind(trip_id)
                .fetch_all(&self.db)
                .await?;
        Ok(entries)
    }

    pub async fn update_itinerary(&self, entry: &Itinerary) -> Result<(), AppError> {
        sqlx::query(
            r#"UPDATE itineraries SET location_id = ?1, position = ?2, start_time = ?3,
                                      end_time = ?4, budget = ?5, notes = ?6, photos = ?7,
                                      transportation = ?8
               WHERE id = ?9"#,
        )
        .bind(&entry.location_id)
        .bind(entry.position)
        .bind(entry.start_time)
        .bind(entry.end_time)
        .bind(entry.budget)
        .bind(&entry.notes)
        .bind(entry.photos.clone())
        .bind(entry.transportation.clone())
        .bind(&entry.id)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    pub async fn remove_itinerary(&self, itinerary_id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM itineraries WHERE id = ?1")
            .bind(itinerary_id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn next_position(&self, trip_id: &str) -> Result<i64, AppError> {
        let max: Option<i64> =
            sqlx::query_scalar("SELECT MAX(position) FROM itineraries WHERE trip_id = ?1")
                .bind(trip_id)
                .fetch_one(&self.db)
                .await?;
        Ok(max.unwrap_or(0) + 1)
    }

    // ---- shares ----

    pub async fn upsert_share(
        &self,
        trip_id: &str,
        shared_by: &str,
        shared_with: &str,
        permission: &str,
    ) -> Result<TripShare, AppError> {
        sqlx::query(
            r#"INSERT INTO trip_shares (id, trip_id, shared_by, shared_with, permission, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)
               ON CONFLICT (trip_id, shared_with) DO UPDATE SET permission = excluded.permission"#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(trip_id)
        .bind(shared_by)
        .bind(shared_with)
        .bind(permission)
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        let share = self
            .fetch_share(trip_id, shared_with)
            .await?
            .ok_or(AppError::NotFound)?;
        Ok(share)
    }

    pub async fn fetch_share(
        &self,
        trip_id: &str,
        shared_with: &str,
    ) -> Result<Option<TripShare>, AppError> {
        let share =
            sqlx::query_as("SELECT * FROM trip_shares WHERE trip_id = ?1 AND shared_with = ?2")
                .bind(trip_id)
                .bind(shared_with)
                .fetch_optional(&self.db)
                .await?;
        Ok(share)
    }

    pub async fn trip_shares(&self, trip_id: &str) -> Result<Vec<TripShare>, AppError> {
        let shares =
            sqlx::query_as("SELECT * FROM trip_shares WHERE trip_id = ?1 ORDER BY created_at")
                .bind(trip_id)
                .fetch_all(&self.db)
                .await?;
        Ok(shares)
    }

    pub async fn update_share_permission(
        &self,
        trip_id: &str,
        shared_with: &str,
        permission: &str,
    ) -> Result<Option<TripShare>, AppError> {
        let result =
            sqlx::query("UPDATE trip_shares SET permission = ?1 WHERE trip_id = ?2 AND shared_with = ?3")
                .bind(permission)
                .bind(trip_id)
                .bind(shared_with)
                .execute(&self.db)
                .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.fetch_share(trip_id, shared_with).await
    }

    pub async fn remove_share(&self, trip_id: &str, shared_with: &str) -> Result<bool, AppError> {
        let result =
            sqlx::query("DELETE FROM trip_shares WHERE trip_id = ?1 AND shared_with = ?2")
                .bind(trip_id)
                .bind(shared_with)
                .execute(&self.db)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    // ---- public links ----

    pub async fn save_public_link(&self, link: &PublicShareLink) -> Result<(), AppError> {
        sqlx::query(
            r#"INSERT INTO public_share_links (token, trip_id, expires_at, created_at)
               VALUES (?1, ?2, ?3, ?4)"#,
        )
        .bind(&link.token)
        .bind(&link.trip_id)
        .bind(link.expires_at)
        .bind(link.created_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    pub async fn fetch_public_link(&self, token: &str) -> Result<Option<PublicShareLink>, AppError> {
        let link = sqlx::query_as("SELECT * FROM public_share_links WHERE token = ?1")
            .bind(token)
            .fetch_optional(&self.db)
            .await?;
        Ok(link)
    }

    // ---- reviews ----

    pub async fn add_review(&self, review: &PlaceReview) -> Result<(), AppError> {
        sqlx::query(
            r#"INSERT INTO place_reviews (id, location_id, user_uuid, rating, comment, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
        )
        .bind(&review.id)
        .bind(&review.location_id)
        .bind(&review.user_uuid)
        .bind(review.rating)
        .bind(&review.comment)
        .bind(review.created_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    pub async fn location_reviews(
        &self,
        location_id: &str,
    ) -> Result<(Vec<PlaceReview>, f64), AppError> {
        let reviews: Vec<PlaceReview> = sqlx::query_as(
            "SELECT * FROM place_reviews WHERE location_id = ?1 ORDER BY created_at DESC",
        )
        .bind(location_id)
        .fetch_all(&self.db)
        .await?;
        let average = if reviews.is_empty() {
            0.0
        } else {
            reviews.iter().map(|r| r.rating as f64).sum::<f64>() / reviews.len() as f64
        };
        Ok((reviews, average))
    }

    // ---- users ----

    pub async fn fetch_user_by_uuid(&self, uuid: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as("SELECT * FROM users WHERE uuid = ?1")
            .bind(uuid)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }
}
