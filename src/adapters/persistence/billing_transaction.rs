use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::{
    adapters::persistence::{PostgresPersistence, subscription, user},
    app_error::{AppError, AppResult},
    application::use_cases::{
        payment::{BillingTransaction, BillingUnitOfWork},
        subscription::CreateSubscriptionInput,
    },
    domain::entities::{subscription::Subscription, user::UserBillingIdentity},
};

/// A checkout transaction on a pooled connection. sqlx rolls it back on drop
/// unless `commit` was called.
pub struct PgBillingTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl BillingUnitOfWork for PostgresPersistence {
    async fn begin(&self) -> AppResult<Box<dyn BillingTransaction>> {
        let tx = self.pool.begin().await.map_err(AppError::from)?;
        Ok(Box::new(PgBillingTransaction { tx }))
    }
}

#[async_trait]
impl BillingTransaction for PgBillingTransaction {
    async fn get_user(&mut self, user_id: Uuid) -> AppResult<Option<UserBillingIdentity>> {
        user::get_billing_identity(&mut self.tx, user_id).await
    }

    async fn set_stripe_customer_id(
        &mut self,
        user_id: Uuid,
        customer_id: &str,
    ) -> AppResult<()> {
        user::set_stripe_customer_id(&mut self.tx, user_id, customer_id).await
    }

    async fn create_subscription(
        &mut self,
        input: &CreateSubscriptionInput,
    ) -> AppResult<Subscription> {
        subscription::insert_subscription(&mut self.tx, input).await
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await.map_err(AppError::from)
    }
}
