use async_trait::async_trait;
use sqlx::{PgConnection, Row};
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::subscription::{CreateSubscriptionInput, SubscriptionRepo},
    domain::entities::subscription::{Subscription, SubscriptionStatus},
};

fn row_to_subscription(row: &sqlx::postgres::PgRow) -> Subscription {
    Subscription {
        id: row.get("id"),
        user_id: row.get("user_id"),
        plan: row.get("plan"),
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
        status: row.get("status"),
        amount: row.get("amount"),
        stripe_session_id: row.get("stripe_session_id"),
        stripe_subscription_id: row.get("stripe_subscription_id"),
        stripe_payment_intent_id: row.get("stripe_payment_intent_id"),
        failure_reason: row.get("failure_reason"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const SELECT_COLS: &str = r#"
    id, user_id, plan, start_date, end_date, status, amount,
    stripe_session_id, stripe_subscription_id, stripe_payment_intent_id,
    failure_reason, created_at, updated_at
"#;

/// Insert a new subscription. Status comes from the column default (`pending`).
pub(super) async fn insert_subscription(
    conn: &mut PgConnection,
    input: &CreateSubscriptionInput,
) -> AppResult<Subscription> {
    let row = sqlx::query(&format!(
        r#"
        INSERT INTO subscriptions (id, user_id, plan, start_date, end_date, amount, stripe_session_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {}
        "#,
        SELECT_COLS
    ))
    .bind(Uuid::new_v4())
    .bind(input.user_id)
    .bind(input.plan)
    .bind(input.start_date)
    .bind(input.end_date)
    .bind(input.amount)
    .bind(&input.stripe_session_id)
    .fetch_one(conn)
    .await
    .map_err(AppError::from)?;
    Ok(row_to_subscription(&row))
}

#[async_trait]
impl SubscriptionRepo for PostgresPersistence {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Subscription>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscriptions WHERE id = $1",
            SELECT_COLS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_subscription))
    }

    async fn get_by_stripe_session_id(
        &self,
        session_id: &str,
    ) -> AppResult<Option<Subscription>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscriptions WHERE stripe_session_id = $1",
            SELECT_COLS
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_subscription))
    }

    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<Subscription>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM subscriptions WHERE user_id = $1 ORDER BY created_at DESC",
            SELECT_COLS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.iter().map(row_to_subscription).collect())
    }

    async fn update_status_by_stripe_session_id(
        &self,
        session_id: &str,
        status: SubscriptionStatus,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE subscriptions SET status = $2, updated_at = NOW() WHERE stripe_session_id = $1",
        )
        .bind(session_id)
        .bind(status)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(result.rows_affected())
    }
}
