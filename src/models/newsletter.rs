//! Newsletter subscription model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Newsletter subscriber. Emails are stored trimmed and lower-cased.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Newsletter {
    pub id: i64,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewsletterForm {
    #[serde(default)]
    pub email: String,
}
