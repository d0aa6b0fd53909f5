use sqlx::PgPool;
use uuid::Uuid;

use lingualink_common::{AppError, TicketStatus};
use lingualink_database::SupportTicket;

use crate::models::CreateSupportTicketRequest;

#[derive(Clone)]
pub struct SupportService {
    db_pool: PgPool,
}

impl SupportService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    pub async fn create_ticket(
        &self,
        user_id: Uuid,
        request: CreateSupportTicketRequest,
    ) -> Result<SupportTicket, AppError> {
        let ticket = sqlx::query_as::<_, SupportTicket>(
            r#"
            INSERT INTO support_tickets (id, user_id, subject, message, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&request.subject)
        .bind(&request.message)
        .bind(TicketStatus::Open.as_str())
        .fetch_one(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        tracing::info!("Support ticket {} opened by {}", ticket.id, user_id);

        Ok(ticket)
    }

    pub async fn list_tickets(&self) -> Result<Vec<SupportTicket>, AppError> {
        sqlx::query_as::<_, SupportTicket>(
            "SELECT * FROM support_tickets ORDER BY created_at DESC LIMIT 100",
        )
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)
    }
}
