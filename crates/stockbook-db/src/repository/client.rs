//! # Client Repository
//!
//! Database operations for client records.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Client Lifecycle                                  │
//! │                                                                         │
//! │  insert() ──► status: active                                           │
//! │                  │                                                      │
//! │                  ├── update() ──► edits contact fields                 │
//! │                  │                                                      │
//! │                  ├── set_status(inactive) ──► dormant, still billable  │
//! │                  │                                                      │
//! │                  └── soft_delete() ──► status: deleted                 │
//! │                        history kept, checkout rejects the client       │
//! │                                                                         │
//! │  Revenue moves only through add_revenue() (delta-based) and the        │
//! │  checkout transaction - never absolute writes.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use stockbook_core::validation::{validate_name, validate_uuid};
use stockbook_core::{Client, ClientStatus};

/// Repository for client database operations.
#[derive(Debug, Clone)]
pub struct ClientRepository {
    pool: SqlitePool,
}

/// Column list shared by the client queries.
const CLIENT_COLUMNS: &str =
    "id, name, phone, email, address, revenue_cents, status, created_at, updated_at";

impl ClientRepository {
    /// Creates a new ClientRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ClientRepository { pool }
    }

    /// Gets a client by ID, regardless of status.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Client>> {
        let client = sqlx::query_as::<_, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(client)
    }

    /// Lists non-deleted clients sorted by name.
    pub async fn list_active(&self, limit: u32) -> DbResult<Vec<Client>> {
        let clients = sqlx::query_as::<_, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE status != 'deleted' \
             ORDER BY name LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(clients)
    }

    /// Inserts a new client.
    ///
    /// The id should be generated beforehand, see [`generate_client_id`].
    pub async fn insert(&self, client: &Client) -> DbResult<()> {
        validate_uuid(&client.id)?;
        validate_name(&client.name)?;

        debug!(id = %client.id, name = %client.name, "Inserting client");

        sqlx::query(
            r#"
            INSERT INTO clients (
                id, name, phone, email, address,
                revenue_cents, status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&client.id)
        .bind(&client.name)
        .bind(&client.phone)
        .bind(&client.email)
        .bind(&client.address)
        .bind(client.revenue_cents)
        .bind(client.status)
        .bind(client.created_at)
        .bind(client.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates a client's contact fields and status.
    ///
    /// Revenue is deliberately excluded: it moves only through
    /// `add_revenue` or the checkout transaction.
    pub async fn update(&self, client: &Client) -> DbResult<()> {
        validate_name(&client.name)?;

        debug!(id = %client.id, "Updating client");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE clients SET
                name = ?2,
                phone = ?3,
                email = ?4,
                address = ?5,
                status = ?6,
                updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(&client.id)
        .bind(&client.name)
        .bind(&client.phone)
        .bind(&client.email)
        .bind(&client.address)
        .bind(client.status)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Client", &client.id));
        }

        Ok(())
    }

    /// Soft-deletes a client by marking its status deleted.
    ///
    /// ## Why Soft Delete?
    /// - Historical orders and sales still reference this client
    /// - Can be restored if deleted by mistake
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting client");

        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE clients SET status = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(ClientStatus::Deleted)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Client", id));
        }

        Ok(())
    }

    /// Adds revenue to a client (delta-based).
    ///
    /// The guard keeps revenue non-negative; negative deltas exist for
    /// manual corrections, not for the sales flow.
    pub async fn add_revenue(&self, id: &str, delta_cents: i64) -> DbResult<()> {
        debug!(id = %id, delta = %delta_cents, "Adjusting client revenue");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE clients
            SET revenue_cents = revenue_cents + ?2, updated_at = ?3
            WHERE id = ?1 AND revenue_cents + ?2 >= 0
            "#,
        )
        .bind(id)
        .bind(delta_cents)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Client", id));
        }

        Ok(())
    }

    /// Counts non-deleted clients (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM clients WHERE status != 'deleted'")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

/// Helper to generate a new client ID.
pub fn generate_client_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
