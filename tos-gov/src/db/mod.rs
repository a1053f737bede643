//! SQLite repositories for tos-gov
//!
//! Tables are created by `tos_common::db::create_schema`. Writes go through
//! `retry_on_lock` because tos-bridge shares the database file.

mod ai_ratings;
mod proposals;
mod ratings;
mod reviews;

pub use ai_ratings::SqliteAiRatingRepo;
pub use proposals::SqliteProposalRepo;
pub use ratings::SqliteRatingRepo;
pub use reviews::SqliteModerationRepo;

pub use tos_common::db::{init_database_pool, init_memory_pool};
