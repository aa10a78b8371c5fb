use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

#[automock]
#[async_trait]
pub trait CoinLedger {
    /// Adds `coins` to the user's balance in one atomic step.
    ///
    /// `Ok(false)` means the ledger refused the credit (e.g. the user has no
    /// balance account); `Err` is reserved for unexpected faults.
    async fn add_coins(&self, user_id: Uuid, plan_name: String, coins: i64) -> Result<bool>;
}
