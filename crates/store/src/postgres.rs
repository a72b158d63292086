//! Postgres-backed ticket store (feature `postgres`).
//!
//! One `tickets` table, schema in `schema.sql`. Enum fields are stored as
//! TEXT and parsed back through the domain enums; a row that fails to parse
//! surfaces as a database error rather than being silently skipped.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use triagedesk_core::{
    Category, Ticket, TicketId, TicketStatus, TriageOutcome, Urgency,
};

use crate::query::{SortField, SortOrder, TicketPage, TicketQuery};
use crate::ticket_store::{NewTicket, StoreError, TicketPatch, TicketStore};

pub struct PostgresTicketStore {
    pool: PgPool,
}

impl PostgresTicketStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and verify the pool is usable.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(Self::new(pool))
    }
}

fn db_err(e: sqlx::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

fn row_to_ticket(row: &PgRow) -> Result<Ticket, StoreError> {
    let id: Uuid = row.try_get("id").map_err(db_err)?;
    let status_raw: String = row.try_get("status").map_err(db_err)?;
    let status = TicketStatus::parse(&status_raw)
        .ok_or_else(|| StoreError::Database(format!("bad status in row: {status_raw}")))?;
    let category = row
        .try_get::<Option<String>, _>("category")
        .map_err(db_err)?
        .as_deref()
        .and_then(Category::parse);
    let urgency = row
        .try_get::<Option<String>, _>("urgency")
        .map_err(db_err)?
        .as_deref()
        .and_then(Urgency::parse);

    Ok(Ticket {
        id: TicketId::from_uuid(id),
        content: row.try_get("content").map_err(db_err)?,
        customer_email: row.try_get("customer_email").map_err(db_err)?,
        status,
        category,
        sentiment: row.try_get("sentiment").map_err(db_err)?,
        urgency,
        ai_draft: row.try_get("ai_draft").map_err(db_err)?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(db_err)?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at").map_err(db_err)?,
    })
}

/// ORDER BY expression per sort field. Enum columns sort by definition
/// rank (urgency: high before medium before low) rather than alphabetically,
/// to match the in-memory store; nulls always sort last.
fn order_expr(field: SortField) -> &'static str {
    match field {
        SortField::CreatedAt => "created_at",
        SortField::Sentiment => "COALESCE(sentiment, 2147483647)",
        SortField::Urgency => {
            "CASE urgency WHEN 'HIGH' THEN 0 WHEN 'MEDIUM' THEN 1 WHEN 'LOW' THEN 2 ELSE 3 END"
        }
        SortField::Status => {
            "CASE status WHEN 'PENDING' THEN 0 WHEN 'PROCESSED' THEN 1 WHEN 'RESOLVED' THEN 2 ELSE 3 END"
        }
    }
}

#[async_trait]
impl TicketStore for PostgresTicketStore {
    async fn insert(&self, new: NewTicket) -> Result<Ticket, StoreError> {
        let ticket = Ticket::new(new.content, new.customer_email);

        sqlx::query(
            r#"
            INSERT INTO tickets (id, content, customer_email, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(ticket.id.as_uuid())
        .bind(&ticket.content)
        .bind(&ticket.customer_email)
        .bind(ticket.status.as_str())
        .bind(ticket.created_at)
        .bind(ticket.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(ticket)
    }

    async fn get(&self, id: TicketId) -> Result<Option<Ticket>, StoreError> {
        let row = sqlx::query("SELECT * FROM tickets WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(row_to_ticket).transpose()
    }

    async fn update(&self, id: TicketId, patch: TicketPatch) -> Result<Ticket, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE tickets
            SET status = COALESCE($2, status),
                ai_draft = COALESCE($3, ai_draft),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id.as_uuid())
        .bind(patch.status.map(|s| s.as_str()))
        .bind(patch.ai_draft)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(StoreError::NotFound(id))?;

        row_to_ticket(&row)
    }

    async fn apply_triage(
        &self,
        id: TicketId,
        outcome: &TriageOutcome,
    ) -> Result<Ticket, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE tickets
            SET status = 'PROCESSED',
                category = $2,
                sentiment = $3,
                urgency = $4,
                ai_draft = $5,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id.as_uuid())
        .bind(outcome.category.as_str())
        .bind(outcome.sentiment)
        .bind(outcome.urgency.as_str())
        .bind(&outcome.draft)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(StoreError::NotFound(id))?;

        row_to_ticket(&row)
    }

    async fn mark_failed(&self, id: TicketId) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE tickets SET status = 'FAILED', updated_at = NOW() WHERE id = $1",
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn list(&self, query: TicketQuery) -> Result<TicketPage, StoreError> {
        // Filters are bound parameters; only the ORDER BY expression is
        // assembled from the (allow-listed) sort field.
        let direction = match query.sort_order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        let sql = format!(
            "SELECT * FROM tickets \
             WHERE ($1::text IS NULL OR status = $1) \
               AND ($2::text IS NULL OR urgency = $2) \
             ORDER BY {} {} \
             LIMIT $3 OFFSET $4",
            order_expr(query.sort_by),
            direction,
        );

        let status = query.status.map(|s| s.as_str());
        let urgency = query.urgency.map(|u| u.as_str());

        let rows = sqlx::query(&sql)
            .bind(status)
            .bind(urgency)
            .bind(i64::from(query.limit))
            .bind(query.offset() as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        let tickets = rows
            .iter()
            .map(row_to_ticket)
            .collect::<Result<Vec<_>, _>>()?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM tickets \
             WHERE ($1::text IS NULL OR status = $1) \
               AND ($2::text IS NULL OR urgency = $2)",
        )
        .bind(status)
        .bind(urgency)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(TicketPage::new(tickets, total as u64, &query))
    }
}
