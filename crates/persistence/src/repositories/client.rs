//! Client repository for database operations.

use chrono::{DateTime, Utc};
use domain::models::client::{CreateClientRequest, UpdateClientRequest};
use sqlx::SqlitePool;

use crate::entities::ClientEntity;
use crate::metrics::QueryTimer;

const CLIENT_COLUMNS: &str = "id, name, contact_person, email, phone, address, employee_count, \
     monthly_fee, drive_folder_id, notes, created_at, updated_at";

/// Repository for client-related database operations.
#[derive(Clone)]
pub struct ClientRepository {
    pool: SqlitePool,
}

impl ClientRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Lists clients by name, optionally filtered by a name substring.
    pub async fn list(
        &self,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ClientEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_clients");
        let sql = format!(
            r#"
            SELECT {CLIENT_COLUMNS}
            FROM clients
            WHERE (?1 IS NULL OR name LIKE '%' || ?1 || '%')
            ORDER BY name, id
            LIMIT ?2 OFFSET ?3
            "#
        );
        let result = sqlx::query_as::<_, ClientEntity>(&sql)
            .bind(search)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        result
    }

    pub async fn count(&self, search: Option<&str>) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_clients");
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM clients WHERE (?1 IS NULL OR name LIKE '%' || ?1 || '%')",
        )
        .bind(search)
        .fetch_one(&self.pool)
        .await?;
        timer.record();
        Ok(count.0)
    }

    /// Clients that have an e-mail address on file.
    pub async fn list_with_email(&self) -> Result<Vec<ClientEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_clients_with_email");
        let sql = format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE email IS NOT NULL AND email <> '' ORDER BY id"
        );
        let result = sqlx::query_as::<_, ClientEntity>(&sql)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Case-insensitive match on the client's e-mail address.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<ClientEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_client_by_email");
        let sql = format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE lower(email) = lower(?1) ORDER BY id LIMIT 1"
        );
        let result = sqlx::query_as::<_, ClientEntity>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<ClientEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_client_by_id");
        let sql = format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = ?1");
        let result = sqlx::query_as::<_, ClientEntity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }

    pub async fn create(
        &self,
        request: &CreateClientRequest,
        now: DateTime<Utc>,
    ) -> Result<ClientEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_client");
        let sql = format!(
            r#"
            INSERT INTO clients (name, contact_person, email, phone, address, employee_count,
                                 monthly_fee, notes, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
            RETURNING {CLIENT_COLUMNS}
            "#
        );
        let result = sqlx::query_as::<_, ClientEntity>(&sql)
            .bind(request.name.trim())
            .bind(&request.contact_person)
            .bind(&request.email)
            .bind(&request.phone)
            .bind(&request.address)
            .bind(request.employee_count)
            .bind(request.monthly_fee)
            .bind(&request.notes)
            .bind(now)
            .fetch_one(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Applies the provided fields; absent fields keep their value.
    pub async fn update(
        &self,
        id: i64,
        request: &UpdateClientRequest,
        now: DateTime<Utc>,
    ) -> Result<Option<ClientEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_client");
        let sql = format!(
            r#"
            UPDATE clients SET
                name = COALESCE(?2, name),
                contact_person = COALESCE(?3, contact_person),
                email = COALESCE(?4, email),
                phone = COALESCE(?5, phone),
                address = COALESCE(?6, address),
                employee_count = COALESCE(?7, employee_count),
                monthly_fee = COALESCE(?8, monthly_fee),
                notes = COALESCE(?9, notes),
                updated_at = ?10
            WHERE id = ?1
            RETURNING {CLIENT_COLUMNS}
            "#
        );
        let result = sqlx::query_as::<_, ClientEntity>(&sql)
            .bind(id)
            .bind(request.name.as_deref().map(str::trim))
            .bind(&request.contact_person)
            .bind(&request.email)
            .bind(&request.phone)
            .bind(&request.address)
            .bind(request.employee_count)
            .bind(request.monthly_fee)
            .bind(&request.notes)
            .bind(now)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }

    pub async fn set_drive_folder(
        &self,
        id: i64,
        folder_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("set_client_drive_folder");
        let result = sqlx::query("UPDATE clients SET drive_folder_id = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(folder_id)
            .bind(now)
            .execute(&self.pool)
            .await?;
        timer.record();
        Ok(result.rows_affected() > 0)
    }

    /// Deletes a client. Fails with a foreign-key violation while tasks,
    /// projects or applications still reference it.
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("delete_client");
        let result = sqlx::query("DELETE FROM clients WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        timer.record();
        Ok(result.rows_affected() > 0)
    }
}
