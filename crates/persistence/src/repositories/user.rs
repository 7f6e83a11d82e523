//! User repository for database operations.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::entities::UserEntity;
use crate::metrics::QueryTimer;

/// Read access to office users. Provisioning belongs to the auth service;
/// `insert` exists for seeding.
#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_user_by_id");
        let result = sqlx::query_as::<_, UserEntity>(
            "SELECT id, name, email, role FROM users WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// All users, by name.
    pub async fn list(&self) -> Result<Vec<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_users");
        let result = sqlx::query_as::<_, UserEntity>(
            "SELECT id, name, email, role FROM users ORDER BY name, id",
        )
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn insert(
        &self,
        name: &str,
        email: Option<&str>,
        role: &str,
    ) -> Result<UserEntity, sqlx::Error> {
        let timer = QueryTimer::new("insert_user");
        let result = sqlx::query_as::<_, UserEntity>(
            r#"
            INSERT INTO users (name, email, role, created_at)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING id, name, email, role
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(role)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_memory_pool;

    #[tokio::test]
    async fn test_insert_and_find() {
        let repo = UserRepository::new(create_memory_pool().await.unwrap());
        let user = repo
            .insert("山田 太郎", Some("yamada@example.com"), "admin")
            .await
            .unwrap();

        let found = repo.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(found.email.as_deref(), Some("yamada@example.com"));
        assert!(repo.find_by_id(user.id + 1).await.unwrap().is_none());
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }
}
