use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::subscriptions::SubscriptionEntity;

#[automock]
#[async_trait]
pub trait SubscriptionRepository {
    /// Active subscriptions in a stable fetch order.
    async fn list_active_subscribers(&self) -> Result<Vec<SubscriptionEntity>>;
    async fn update_last_credited_at(
        &self,
        user_id: Uuid,
        credited_at: DateTime<Utc>,
    ) -> Result<()>;
}
