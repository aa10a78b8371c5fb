use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::subscription_plans;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = subscription_plans)]
pub struct PlanEntity {
    pub id: Uuid,
    pub name: String,
    pub monthly_coins: i32,
    pub price_minor: i32,
    pub created_at: DateTime<Utc>,
}

impl PlanEntity {
    /// Negative allotments in the store are treated as zero.
    pub fn coin_allotment(&self) -> i64 {
        i64::from(self.monthly_coins.max(0))
    }
}
