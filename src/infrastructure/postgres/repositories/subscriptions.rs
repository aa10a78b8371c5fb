use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{RunQueryDsl, prelude::*, update};
use std::sync::Arc;
use tokio::task;
use uuid::Uuid;

use crate::{
    domain::{
        entities::subscriptions::SubscriptionEntity,
        repositories::subscriptions::SubscriptionRepository,
        value_objects::enums::subscription_statuses::SubscriptionStatus,
    },
    infrastructure::postgres::{postgres_connection::PgPoolSquad, schema::subscriptions},
};

pub struct SubscriptionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl SubscriptionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl SubscriptionRepository for SubscriptionPostgres {
    async fn list_active_subscribers(&self) -> Result<Vec<SubscriptionEntity>> {
        // Diesel is synchronous; keep DB work on the blocking threadpool.
        let db_pool = Arc::clone(&self.db_pool);

        task::spawn_blocking(move || -> Result<Vec<SubscriptionEntity>> {
            let mut conn = db_pool.get()?;

            let results = subscriptions::table
                .filter(subscriptions::status.eq(SubscriptionStatus::Active.to_string()))
                .order((subscriptions::created_at.asc(), subscriptions::id.asc()))
                .select(SubscriptionEntity::as_select())
                .load::<SubscriptionEntity>(&mut conn)?;

            Ok(results)
        })
        .await?
    }

    async fn update_last_credited_at(
        &self,
        user_id: Uuid,
        credited_at: DateTime<Utc>,
    ) -> Result<()> {
        let db_pool = Arc::clone(&self.db_pool);
        let now = Utc::now();

        task::spawn_blocking(move || -> Result<()> {
            let mut conn = db_pool.get()?;

            update(subscriptions::table)
                .filter(subscriptions::user_id.eq(user_id))
                .filter(subscriptions::status.eq(SubscriptionStatus::Active.to_string()))
                .set((
                    subscriptions::last_credited_at.eq(Some(credited_at)),
                    subscriptions::updated_at.eq(now),
                ))
                .execute(&mut conn)?;

            Ok(())
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::postgres::postgres_connection::pool_builder;
    use diesel::r2d2::ConnectionManager;
    use std::{
        sync::atomic::{AtomicU32, Ordering},
        time::Duration,
    };

    fn unreachable_pool() -> Arc<PgPoolSquad> {
        let manager =
            ConnectionManager::<PgConnection>::new("postgres://subcredit@127.0.0.1:1/none");
        Arc::new(pool_builder(Duration::from_millis(500)).build_unchecked(manager))
    }

    #[tokio::test(flavor = "current_thread")]
    async fn store_call_does_not_stall_the_runtime() {
        let repository = SubscriptionPostgres::new(unreachable_pool());
        let ticks = Arc::new(AtomicU32::new(0));

        let ticker_ticks = Arc::clone(&ticks);
        let ticker = tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_millis(50)).await;
                ticker_ticks.fetch_add(1, Ordering::SeqCst);
            }
        });

        let result = repository.list_active_subscribers().await;
        let ticks_during_call = ticks.load(Ordering::SeqCst);
        ticker.abort();

        assert!(result.is_err());
        assert!(ticks_during_call > 0);
    }
}
