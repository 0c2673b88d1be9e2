//! Services layer - Business logic
//!
//! Services implement the newspaper's rules on top of the repositories:
//! validation, visibility, pagination and cache invalidation.

pub mod category;
pub mod password;
pub mod post;
pub mod submission;
pub mod tag;
pub mod user;

pub use category::{CategoryService, CategoryServiceError};
pub use password::{hash_password, verify_password};
pub use post::{
    AdjacentPosts, FeaturedPosts, HomeData, Navigation, PageSizes, PostDetail, PostService,
    PostServiceError,
};
pub use submission::{is_valid_email, FieldErrors, SubmissionError, SubmissionService};
pub use tag::{TagService, TagServiceError};
pub use user::{UserService, UserServiceError};
