use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, Key, PrivateCookieJar, SameSite};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{session::Session, user::User},
    state::AppState,
};

pub const SESSION_COOKIE: &str = "tripplanner_session";

const SESSION_TTL_DAYS: i64 = 30;

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub uuid: String,
    pub username: String,
    pub email: String,
}

impl From<&User> for AuthenticatedUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            uuid: user.uuid.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<AuthenticatedUser>);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = match PrivateCookieJar::<Key>::from_request_parts(parts, state).await {
            Ok(jar) => jar,
            Err(err) => match err {},
        };
        let Some(cookie) = jar.get(SESSION_COOKIE) else {
            return Ok(Self(None));
        };
        Ok(Self(session_user(state, cookie.value()).await?))
    }
}

impl CurrentUser {
    pub fn require_user(&self) -> Result<&AuthenticatedUser, AppError> {
        self.0.as_ref().ok_or(AppError::Unauthorized)
    }
}

pub async fn register_user(
    state: &AppState,
    username: &str,
    email: &str,
    password: &str,
) -> Result<AuthenticatedUser, AppError> {
    let username = username.trim();
    let email = email.trim();
    if username.is_empty() || email.is_empty() {
        return Err(AppError::BadRequest(
            "username and email must not be empty".into(),
        ));
    }
    if !email.contains('@') {
        return Err(AppError::BadRequest("invalid email address".into()));
    }
    if password.len() < 8 {
        return Err(AppError::BadRequest(
            "password must be at least 8 characters".into(),
        ));
    }

    let existing: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ?1 OR email = ?2")
            .bind(username)
            .bind(email)
            .fetch_one(&state.db)
            .await?;
    if existing > 0 {
        return Err(AppError::BadRequest(
            "username or email already taken".into(),
        ));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| AppError::Other(anyhow::anyhow!("password hashing failed: {err}")))?
        .to_string();

    let uuid = Uuid::new_v4().to_string();
    let now = Utc::now();
    // Concurrent registrations can slip past the count check above and land
    // on the UNIQUE constraints instead.
    let id: i64 = sqlx::query_scalar(
        r#"INSERT INTO users (uuid, username, email, password_hash, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5) RETURNING id"#,
    )
    .bind(&uuid)
    .bind(username)
    .bind(email)
    .bind(&password_hash)
    .bind(now)
    .fetch_one(&state.db)
    .await
    .map_err(map_registration_error)?;

    Ok(AuthenticatedUser {
        id,
        uuid,
        username: username.to_string(),
        email: email.to_string(),
    })
}

fn map_registration_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::BadRequest("username or email already taken".into())
        }
        _ => AppError::Database(err),
    }
}

/// Looks the user up by username or email and verifies the password.
pub async fn authenticate_user(
    state: &AppState,
    identifier: &str,
    password: &str,
) -> Result<AuthenticatedUser, AppError> {
    let user: Option<User> =
        sqlx::query_as("SELECT * FROM users WHERE username = ?1 OR email = ?1")
            .bind(identifier.trim())
            .fetch_optional(&state.db)
            .await?;
    let Some(user) = user else {
        return Err(AppError::Unauthorized);
    };

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|err| AppError::Other(anyhow::anyhow!("stored password hash invalid: {err}")))?;
    if Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(AppError::Unauthorized);
    }

    sqlx::query("UPDATE users SET last_login_at = ?1 WHERE id = ?2")
        .bind(Utc::now())
        .bind(user.id)
        .execute(&state.db)
        .await?;

    Ok(AuthenticatedUser::from(&user))
}

pub async fn create_session(state: &AppState, user_id: i64) -> Result<String, AppError> {
    let now = Utc::now();
    let session = Session {
        id: Uuid::new_v4().to_string(),
        user_id,
        created_at: now,
        last_seen_at: now,
        expires_at: Some(now + Duration::days(SESSION_TTL_DAYS)),
    };
    sqlx::query(
        r#"INSERT INTO sessions (id, user_id, created_at, last_seen_at, expires_at)
           VALUES (?1, ?2, ?3, ?4, ?5)"#,
    )
    .bind(&session.id)
    .bind(session.user_id)
    .bind(session.created_at)
    .bind(session.last_seen_at)
    .bind(session.expires_at)
    .execute(&state.db)
    .await?;
    Ok(session.id)
}

pub async fn destroy_session(state: &AppState, session_id: &str) -> Result<(), AppError> {
    sqlx::query("DELETE FROM sessions WHERE id = ?1")
        .bind(session_id)
        .execute(&state.db)
        .await?;
    Ok(())
}

/// Resolves a session id to its user, enforcing expiry. Touches
/// `last_seen_at` on success.
pub async fn session_user(
    state: &AppState,
    session_id: &str,
) -> Result<Option<AuthenticatedUser>, AppError> {
    let session: Option<Session> = sqlx::query_as("SELECT * FROM sessions WHERE id = ?1")
        .bind(session_id)
        .fetch_optional(&state.db)
        .await?;
    let Some(session) = session else {
        return Ok(None);
    };

    if let Some(expires_at) = session.expires_at {
        if expires_at < Utc::now() {
            destroy_session(state, &session.id).await?;
            return Ok(None);
        }
    }

    sqlx::query("UPDATE sessions SET last_seen_at = ?1 WHERE id = ?2")
        .bind(Utc::now())
        .bind(&session.id)
        .execute(&state.db)
        .await?;

    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = ?1")
        .bind(session.user_id)
        .fetch_optional(&state.db)
        .await?;
    Ok(user.as_ref().map(AuthenticatedUser::from))
}

pub fn apply_session_cookie(jar: PrivateCookieJar, session_id: &str) -> PrivateCookieJar {
    let cookie = Cookie::build((SESSION_COOKIE, session_id.to_owned()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    jar.add(cookie)
}

pub fn clear_session_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    let mut cookie = Cookie::from(SESSION_COOKIE);
    cookie.set_path("/");
    jar.remove(cookie)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::SqlitePool;

    #[tokio::test]
    async fn unique_violation_on_insert_maps_to_bad_request() {
        let db = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("connect in-memory db");
        sqlx::query("CREATE TABLE accounts (email TEXT NOT NULL UNIQUE)")
            .execute(&db)
            .await
            .expect("create table");
        sqlx::query("INSERT INTO accounts (email) VALUES ('mika@example.com')")
            .execute(&db)
            .await
            .expect("first insert");

        let err = sqlx::query("INSERT INTO accounts (email) VALUES ('mika@example.com')")
            .execute(&db)
            .await
            .expect_err("duplicate insert must fail");
        assert!(matches!(
            map_registration_error(err),
            AppError::BadRequest(_)
        ));
    }

    #[test]
    fn other_database_errors_pass_through() {
        let mapped = map_registration_error(sqlx::Error::RowNotFound);
        assert!(matches!(mapped, AppError::Database(_)));
    }
}
