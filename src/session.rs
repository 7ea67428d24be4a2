use crate::error::{Error, Result};
use crate::models::{Profile, ProfileUpdate, ReadingStats, ReadingStatus, User, UserBookView};
use base64::Engine;
use rand::Rng;
use sqlx::PgPool;

/// Adapter for authentication state and profile reads/writes.
#[derive(Debug, Clone)]
pub struct Sessions {
    pool: PgPool,
}

impl Sessions {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the account and its profile row. The profile starts
    /// empty; the UI fills in the username right after sign-up.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<()> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (email, password) VALUES ($1, $2) \
             RETURNING id, email, password",
        )
        .bind(email)
        .bind(password)
        .fetch_one(&self.pool)
        .await?;

        sqlx::query("INSERT INTO profiles (user_id) VALUES ($1)")
            .bind(user.id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Exchanges credentials for a session token. A credential mismatch
    /// reads as [`Error::AuthRequired`]: the caller re-prompts.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<String> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password FROM users WHERE email = $1 AND password = $2",
        )
        .bind(email)
        .bind(password)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(Error::AuthRequired)?;

        let mut buf = [0u8; 32];
        rand::rngs::OsRng.fill(&mut buf);
        let token = base64::engine::general_purpose::STANDARD.encode(buf);

        sqlx::query("INSERT INTO sessions (token, user_id) VALUES ($1, $2)")
            .bind(&token)
            .bind(user.id)
            .execute(&self.pool)
            .await?;

        Ok(token)
    }

    pub async fn sign_out(&self, token: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// `None` is the signed-out state, not an error.
    pub async fn current_user(&self, token: &str) -> Result<Option<User>> {
        user_for_token(&self.pool, token).await
    }

    pub async fn get_profile(&self, user_id: i64) -> Result<Profile> {
        let profile = sqlx::query_as::<_, Profile>(
            "SELECT user_id, username, display_name, avatar_url, bio \
             FROM profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(profile)
    }

    /// Partial update; unset fields keep their stored values.
    pub async fn update_profile(&self, user_id: i64, update: &ProfileUpdate) -> Result<Profile> {
        let profile = sqlx::query_as::<_, Profile>(
            "UPDATE profiles SET \
                 username = COALESCE($2, username), \
                 display_name = COALESCE($3, display_name), \
                 avatar_url = COALESCE($4, avatar_url), \
                 bio = COALESCE($5, bio) \
             WHERE user_id = $1 \
             RETURNING user_id, username, display_name, avatar_url, bio",
        )
        .bind(user_id)
        .bind(update.username.as_deref())
        .bind(update.display_name.as_deref())
        .bind(update.avatar_url.as_deref())
        .bind(update.bio.as_deref())
        .fetch_one(&self.pool)
        .await?;

        Ok(profile)
    }
}

/// Resolves a session token to its user. Shared with the library
/// adapter so both gate writes on the same session lookup.
pub(crate) async fn user_for_token(pool: &PgPool, token: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT u.id, u.email, u.password \
         FROM sessions s \
         JOIN users u ON u.id = s.user_id \
         WHERE s.token = $1",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Aggregate stats for the profile screen. Streak and annotation
/// counts are not tracked yet and always read 0.
pub fn compute_stats(books: &[UserBookView]) -> ReadingStats {
    let mut stats = ReadingStats::default();
    for book in books {
        if book.status == ReadingStatus::Completed {
            stats.books_read += 1;
            stats.pages_read += i64::from(book.page_count);
        }
    }
    stats
}
