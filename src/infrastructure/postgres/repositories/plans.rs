use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, prelude::*};
use std::sync::Arc;
use tokio::task;

use crate::{
    domain::{entities::plans::PlanEntity, repositories::plans::PlanRepository},
    infrastructure::postgres::{postgres_connection::PgPoolSquad, schema::subscription_plans},
};

pub struct PlanPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PlanPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PlanRepository for PlanPostgres {
    async fn list_plans(&self) -> Result<Vec<PlanEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        task::spawn_blocking(move || -> Result<Vec<PlanEntity>> {
            let mut conn = db_pool.get()?;

            let results = subscription_plans::table
                .order(subscription_plans::name.asc())
                .select(PlanEntity::as_select())
                .load::<PlanEntity>(&mut conn)?;

            Ok(results)
        })
        .await?
    }
}
