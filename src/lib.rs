//! # nextchapter-core
//!
//! Headless core of the NextChapter reading tracker: catalog search
//! against the Google Books volumes API, the category shelf
//! aggregator, and the adapters for a user's library, session, and
//! profile over the backing Postgres store. UI layers embed this crate
//! and render from its view-model state; nothing here draws anything.

pub mod catalog;
pub mod config;
pub mod error;
pub mod focus;
pub mod models;
pub mod session;
pub mod shelf;
pub mod store;

pub use catalog::{CatalogClient, CatalogSource, PAGE_SIZE, PLACEHOLDER_COVER};
pub use config::Config;
pub use error::{Error, Result};
pub use focus::{Navigator, Screen};
pub use models::{
    BookSummary, LibraryBook, Profile, ProfileUpdate, ReadingStats, ReadingStatus, User, UserBook,
    UserBookView, UNKNOWN_AUTHOR,
};
pub use session::{compute_stats, Sessions};
pub use shelf::{
    Category, CategoryTicket, SearchTicket, Shelf, ShelfAggregator, ShelfBoard, CATEGORIES,
};
pub use store::{display_authors, reading_progress, Library};
