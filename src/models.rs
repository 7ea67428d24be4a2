use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sentinel shown when the catalog source lists no authors.
pub const UNKNOWN_AUTHOR: &str = "Unknown author";

/// One catalog search result, normalized for display. Constructed fresh
/// per response and never persisted as-is; `save_book` turns it into a
/// [`LibraryBook`].
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookSummary {
    /// Vendor catalog identifier, unique per source.
    pub external_id: String,
    pub title: String,
    /// First listed author, or [`UNKNOWN_AUTHOR`].
    pub author: String,
    /// Always populated: placeholder when the source has no cover, and
    /// rewritten to https.
    pub cover_url: String,
    /// 0 when the source does not know.
    pub page_count: u32,
    /// `None` when the source provides no numeric average rating.
    pub rating: Option<f64>,
    pub ratings_count: u32,
    /// Best-effort deep link for viewing the work.
    pub preview_url: Option<String>,
}

/// Shelf membership of a saved book.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingStatus {
    #[default]
    WantToRead,
    Reading,
    Completed,
}

impl ReadingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReadingStatus::WantToRead => "want_to_read",
            ReadingStatus::Reading => "reading",
            ReadingStatus::Completed => "completed",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "want_to_read" => Some(ReadingStatus::WantToRead),
            "reading" => Some(ReadingStatus::Reading),
            "completed" => Some(ReadingStatus::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password: String,
}

/// One row per distinct `external_id`, shared by every user who saves
/// the book.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LibraryBook {
    pub id: i64,
    pub external_id: String,
    pub title: String,
    /// JSON array of author names, or a bare string, or null.
    pub authors: Option<Value>,
    pub cover_url: Option<String>,
    pub page_count: i32,
}

/// Link row relating a user to a saved book. At most one per
/// (user_id, book_id) pair.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserBook {
    pub id: i64,
    pub user_id: i64,
    pub book_id: i64,
    pub status: String,
    pub current_page: i32,
    /// Set on entry into `completed`, cleared by any other status.
    pub finished_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

/// A user's saved book joined with its metadata, plus the derived
/// display fields the screens need.
#[derive(Debug, Clone, Serialize)]
pub struct UserBookView {
    pub id: i64,
    pub book_id: i64,
    pub external_id: String,
    pub title: String,
    /// Comma-joined author names.
    pub author_display: String,
    pub cover_url: Option<String>,
    pub page_count: i32,
    pub status: ReadingStatus,
    pub current_page: i32,
    /// Whole percentage, 0 when the page count is unknown.
    pub progress: i32,
    pub finished_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Profile {
    pub user_id: i64,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
}

/// Partial profile update; `None` fields are left untouched.
#[derive(Debug, Default, Clone)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
}

/// Aggregate reading statistics for the profile screen.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ReadingStats {
    pub books_read: u32,
    pub pages_read: i64,
    /// Not tracked yet; always 0.
    pub current_streak: u32,
    /// Not tracked yet; always 0.
    pub total_annotations: u32,
}

#[cfg(test)]
mod test {
    use super::ReadingStatus;

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            ReadingStatus::WantToRead,
            ReadingStatus::Reading,
            ReadingStatus::Completed,
        ] {
            assert_eq!(ReadingStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ReadingStatus::parse("abandoned"), None);
    }
}
