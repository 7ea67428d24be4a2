use crate::error::{Error, Result};
use crate::models::{
    BookSummary, LibraryBook, ReadingStatus, UserBook, UserBookView, UNKNOWN_AUTHOR,
};
use crate::session;
use chrono::{NaiveDateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;

/// Adapter owning all reads and writes of a user's library. Screens
/// never touch the store directly.
#[derive(Debug, Clone)]
pub struct Library {
    pool: PgPool,
}

impl Library {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Saves a catalog result to the caller's library: upserts the
    /// shared `books` row keyed by `external_id`, then links it to the
    /// user. Repeating the call for the same book yields
    /// [`Error::AlreadySaved`] and leaves exactly one row behind.
    ///
    /// The two writes are not transactional. If the link insert fails
    /// the upserted book row persists, which is harmless: the upsert is
    /// idempotent and the whole call can be retried.
    pub async fn save_book(&self, token: &str, summary: &BookSummary) -> Result<LibraryBook> {
        let user = session::user_for_token(&self.pool, token)
            .await?
            .ok_or(Error::AuthRequired)?;

        let authors = if summary.author == UNKNOWN_AUTHOR {
            Value::Null
        } else {
            serde_json::json!([summary.author])
        };

        let book = sqlx::query_as::<_, LibraryBook>(
            "INSERT INTO books (external_id, title, authors, cover_url, page_count) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (external_id) DO UPDATE SET \
                 title = EXCLUDED.title, \
                 authors = EXCLUDED.authors, \
                 cover_url = EXCLUDED.cover_url, \
                 page_count = EXCLUDED.page_count \
             RETURNING id, external_id, title, authors, cover_url, page_count",
        )
        .bind(&summary.external_id)
        .bind(&summary.title)
        .bind(&authors)
        .bind(&summary.cover_url)
        .bind(summary.page_count as i32)
        .fetch_one(&self.pool)
        .await?;

        let link = sqlx::query(
            "INSERT INTO user_books (user_id, book_id, status) VALUES ($1, $2, $3)",
        )
        .bind(user.id)
        .bind(book.id)
        .bind(ReadingStatus::WantToRead.as_str())
        .execute(&self.pool)
        .await;

        if let Err(err) = link {
            if is_unique_violation(&err) {
                tracing::debug!(external_id = %summary.external_id, "book already in library");
                return Err(Error::AlreadySaved);
            }
            return Err(Error::Store(err));
        }

        Ok(book)
    }

    /// The caller's saved books joined with their metadata, newest
    /// first, optionally filtered to one status.
    pub async fn list_user_books(
        &self,
        token: &str,
        status: Option<ReadingStatus>,
    ) -> Result<Vec<UserBookView>> {
        let user = session::user_for_token(&self.pool, token)
            .await?
            .ok_or(Error::AuthRequired)?;

        let rows = sqlx::query_as::<_, UserBookJoinRow>(
            "SELECT ub.id, ub.book_id, ub.status, ub.current_page, ub.finished_at, ub.created_at, \
                    b.external_id, b.title, b.authors, b.cover_url, b.page_count \
             FROM user_books ub \
             JOIN books b ON b.id = ub.book_id \
             WHERE ub.user_id = $1 AND ($2::text IS NULL OR ub.status = $2) \
             ORDER BY ub.created_at DESC",
        )
        .bind(user.id)
        .bind(status.map(ReadingStatus::as_str))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(UserBookJoinRow::into_view).collect()
    }

    /// The caller's most recently saved books, regardless of status.
    pub async fn list_saved_previews(&self, token: &str, limit: u32) -> Result<Vec<LibraryBook>> {
        let user = session::user_for_token(&self.pool, token)
            .await?
            .ok_or(Error::AuthRequired)?;

        let books = sqlx::query_as::<_, LibraryBook>(
            "SELECT b.id, b.external_id, b.title, b.authors, b.cover_url, b.page_count \
             FROM user_books ub \
             JOIN books b ON b.id = ub.book_id \
             WHERE ub.user_id = $1 \
             ORDER BY ub.created_at DESC \
             LIMIT $2",
        )
        .bind(user.id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    /// User-initiated status change. Entry into `completed` stamps
    /// `finished_at`; any other status clears it, so a book moved back
    /// to `reading` carries no stale finish date.
    pub async fn update_status(
        &self,
        token: &str,
        user_book_id: i64,
        status: ReadingStatus,
    ) -> Result<UserBook> {
        let user = session::user_for_token(&self.pool, token)
            .await?
            .ok_or(Error::AuthRequired)?;

        let finished_at: Option<NaiveDateTime> = match status {
            ReadingStatus::Completed => Some(Utc::now().naive_utc()),
            _ => None,
        };

        let row = sqlx::query_as::<_, UserBook>(
            "UPDATE user_books \
             SET status = $3, finished_at = $4 \
             WHERE id = $2 AND user_id = $1 \
             RETURNING id, user_id, book_id, status, current_page, finished_at, created_at",
        )
        .bind(user.id)
        .bind(user_book_id)
        .bind(status.as_str())
        .bind(finished_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    /// Records reading progress, clamped to the book's page range.
    pub async fn update_progress(
        &self,
        token: &str,
        user_book_id: i64,
        current_page: i32,
    ) -> Result<UserBook> {
        let user = session::user_for_token(&self.pool, token)
            .await?
            .ok_or(Error::AuthRequired)?;

        let row = sqlx::query_as::<_, UserBook>(
            "UPDATE user_books ub \
             SET current_page = LEAST(GREATEST($3, 0), b.page_count) \
             FROM books b \
             WHERE b.id = ub.book_id AND ub.id = $2 AND ub.user_id = $1 \
             RETURNING ub.id, ub.user_id, ub.book_id, ub.status, ub.current_page, \
                       ub.finished_at, ub.created_at",
        )
        .bind(user.id)
        .bind(user_book_id)
        .bind(current_page)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserBookJoinRow {
    id: i64,
    book_id: i64,
    status: String,
    current_page: i32,
    finished_at: Option<NaiveDateTime>,
    created_at: NaiveDateTime,
    external_id: String,
    title: String,
    authors: Option<Value>,
    cover_url: Option<String>,
    page_count: i32,
}

impl UserBookJoinRow {
    fn into_view(self) -> Result<UserBookView> {
        let status = ReadingStatus::parse(&self.status).ok_or_else(|| {
            Error::Store(sqlx::Error::Decode(
                format!("unknown reading status {:?}", self.status).into(),
            ))
        })?;

        Ok(UserBookView {
            id: self.id,
            book_id: self.book_id,
            external_id: self.external_id,
            title: self.title,
            author_display: display_authors(self.authors.as_ref()),
            cover_url: self.cover_url,
            page_count: self.page_count,
            status,
            current_page: self.current_page,
            progress: reading_progress(self.current_page, self.page_count),
            finished_at: self.finished_at,
            created_at: self.created_at,
        })
    }
}

/// Whole-percent progress through a book. An unknown page count reads
/// as 0%, never a division error.
pub fn reading_progress(current_page: i32, page_count: i32) -> i32 {
    if page_count <= 0 {
        return 0;
    }
    (current_page as f64 / page_count as f64 * 100.0).round() as i32
}

/// Stored authors may be a JSON array, a bare string, or null; the
/// screens always get one comma-joined display string.
pub fn display_authors(authors: Option<&Value>) -> String {
    match authors {
        Some(Value::Array(list)) => {
            let names: Vec<&str> = list.iter().filter_map(Value::as_str).collect();
            if names.is_empty() {
                UNKNOWN_AUTHOR.to_string()
            } else {
                names.join(", ")
            }
        }
        Some(Value::String(name)) => name.clone(),
        _ => UNKNOWN_AUTHOR.to_string(),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505")
    )
}
