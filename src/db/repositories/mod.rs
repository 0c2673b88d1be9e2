//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the storage operations for one entity.

pub mod category;
pub mod comment;
pub mod contact;
pub mod newsletter;
pub mod post;
pub mod profile;
pub mod session;
pub mod tag;
pub mod user;

#[cfg(test)]
pub(crate) mod fixtures;

pub use category::{CategoryRepository, SqlxCategoryRepository};
pub use comment::{CommentRepository, SqlxCommentRepository};
pub use contact::{ContactRepository, SqlxContactRepository};
pub use newsletter::{NewsletterRepository, SqlxNewsletterRepository};
pub use post::{PostRepository, SqlxPostRepository};
pub use profile::{ProfileRepository, SqlxProfileRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use tag::{SqlxTagRepository, TagRepository};
pub use user::{SqlxUserRepository, UserRepository};
