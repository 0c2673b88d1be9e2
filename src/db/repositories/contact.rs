//! Contact query repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::db::{on_pool, DynDatabasePool, LastInsertId};
use crate::models::{Contact, NewContact};

const COLUMNS: &str = "id, name, email, subject, message, created_at, updated_at";

/// Contact repository trait
#[async_trait]
pub trait ContactRepository: Send + Sync {
    async fn create(&self, contact: &NewContact) -> Result<Contact>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Contact>>;

    /// Contact queries in the order they arrived
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Contact>>;

    async fn count(&self) -> Result<i64>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based contact repository for SQLite and MySQL
pub struct SqlxContactRepository {
    pool: DynDatabasePool,
}

impl SqlxContactRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ContactRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ContactRepository for SqlxContactRepository {
    async fn create(&self, contact: &NewContact) -> Result<Contact> {
        let now = Utc::now();
        let id = on_pool!(self.pool, |conn| {
            sqlx::query(
                "INSERT INTO contacts (name, email, subject, message, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&contact.name)
            .bind(&contact.email)
            .bind(&contact.subject)
            .bind(&contact.message)
            .bind(now)
            .bind(now)
            .execute(conn)
            .await
            .context("Failed to create contact")?
            .last_id()
        });

        Ok(Contact {
            id,
            name: contact.name.clone(),
            email: contact.email.clone(),
            subject: contact.subject.clone(),
            message: contact.message.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Contact>> {
        let sql = format!("SELECT {} FROM contacts WHERE id = ?", COLUMNS);
        let contact = on_pool!(self.pool, |conn| {
            sqlx::query_as::<_, Contact>(&sql)
                .bind(id)
                .fetch_optional(conn)
                .await
                .context("Failed to get contact by id")?
        });
        Ok(contact)
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Contact>> {
        let sql = format!(
            "SELECT {} FROM contacts ORDER BY created_at ASC, id ASC LIMIT ? OFFSET ?",
            COLUMNS
        );
        let contacts = on_pool!(self.pool, |conn| {
            sqlx::query_as::<_, Contact>(&sql)
                .bind(limit)
                .bind(offset)
                .fetch_all(conn)
                .await
                .context("Failed to list contacts")?
        });
        Ok(contacts)
    }

    async fn count(&self) -> Result<i64> {
        let count = on_pool!(self.pool, |conn| {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM contacts")
                .fetch_one(conn)
                .await
                .context("Failed to count contacts")?
        });
        Ok(count)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let affected = on_pool!(self.pool, |conn| {
            sqlx::query("DELETE FROM contacts WHERE id = ?")
                .bind(id)
                .execute(conn)
                .await
                .context("Failed to delete contact")?
                .rows_affected()
        });
        Ok(affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::fixtures;

    fn query(subject: &str) -> NewContact {
        NewContact {
            name: "Reader".into(),
            email: "reader@example.com".into(),
            subject: subject.into(),
            message: "Hello".into(),
        }
    }

    #[tokio::test]
    async fn test_contacts_listed_in_arrival_order() {
        let pool = fixtures::migrated_pool().await;
        let repo = SqlxContactRepository::new(pool);

        let first = repo.create(&query("first")).await.unwrap();
        repo.create(&query("second")).await.unwrap();

        let subjects: Vec<_> = repo
            .list(10, 0)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.subject)
            .collect();
        assert_eq!(subjects, vec!["first", "second"]);

        let found = repo.get_by_id(first.id).await.unwrap().unwrap();
        assert_eq!(found.message, "Hello");

        assert!(repo.delete(first.id).await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 1);
    }
}
