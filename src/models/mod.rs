//! Data models
//!
//! This module contains the data structures used throughout Gazette:
//! - Database entities (Post, Category, Tag, Comment, Newsletter, Contact,
//!   User, UserProfile, Session)
//! - Form and API input types
//! - Pagination

mod category;
mod comment;
mod contact;
mod newsletter;
mod pagination;
mod post;
mod session;
mod tag;
mod user;

pub use category::{Category, CategoryInput};
pub use comment::{gravatar_url, Comment, CommentForm, CommentView, NewComment};
pub use contact::{Contact, ContactForm, NewContact};
pub use newsletter::{Newsletter, NewsletterForm};
pub use pagination::{total_pages, Page, PageOutOfRange, PageRequest, PageWindow};
pub use post::{CreatePostInput, InvalidPostStatus, Post, PostStatus, UpdatePostInput};
pub use session::Session;
pub use tag::{Tag, TagInput};
pub use user::{Author, CreateUserInput, ProfileInput, User, UserProfile};
