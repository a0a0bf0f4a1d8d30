use sqlx::{PgConnection, Row};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::user::UserBillingIdentity,
};

fn row_to_identity(row: &sqlx::postgres::PgRow) -> UserBillingIdentity {
    UserBillingIdentity {
        id: row.get("id"),
        full_name: row.get("full_name"),
        email: row.get("email"),
        stripe_customer_id: row.get("stripe_customer_id"),
        stripe_payment_method_id: row.get("stripe_payment_method_id"),
    }
}

pub(super) async fn get_billing_identity(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> AppResult<Option<UserBillingIdentity>> {
    let row = sqlx::query(
        r#"
        SELECT id, full_name, email, stripe_customer_id, stripe_payment_method_id
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(conn)
    .await
    .map_err(AppError::from)?;
    Ok(row.as_ref().map(row_to_identity))
}

pub(super) async fn set_stripe_customer_id(
    conn: &mut PgConnection,
    user_id: Uuid,
    customer_id: &str,
) -> AppResult<()> {
    let result = sqlx::query(
        "UPDATE users SET stripe_customer_id = $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(user_id)
    .bind(customer_id)
    .execute(conn)
    .await
    .map_err(AppError::from)?;

    if result.rows_affected() == 0 {
        return Err(AppError::UserNotFound);
    }
    Ok(())
}
