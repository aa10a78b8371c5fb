use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use diesel::{PgConnection, RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use tokio::task;
use uuid::Uuid;

use crate::{
    domain::{
        entities::coin_transactions::InsertCoinTransactionEntity,
        repositories::coin_ledger::CoinLedger,
    },
    infrastructure::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{coin_transactions, user_coins},
    },
};

pub const SUBSCRIPTION_CREDIT_KIND: &str = "subscription_credit";

pub struct CoinLedgerPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl CoinLedgerPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl CoinLedger for CoinLedgerPostgres {
    async fn add_coins(&self, user_id: Uuid, plan_name: String, coins: i64) -> Result<bool> {
        let entry = subscription_credit_entry(user_id, plan_name, coins)?;
        let db_pool = Arc::clone(&self.db_pool);

        task::spawn_blocking(move || -> Result<bool> {
            let mut conn = db_pool.get()?;
            let added = credit_balance(&mut conn, coins, entry)?;
            Ok(added)
        })
        .await?
    }
}

/// History row for a subscription credit; rejects amounts a ledger entry cannot hold.
fn subscription_credit_entry(
    user_id: Uuid,
    plan_name: String,
    coins: i64,
) -> Result<InsertCoinTransactionEntity> {
    let amount = i32::try_from(coins)
        .with_context(|| format!("coin amount {coins} does not fit a ledger entry"))?;

    Ok(InsertCoinTransactionEntity {
        user_id,
        amount,
        kind: SUBSCRIPTION_CREDIT_KIND.to_string(),
        plan_name: Some(plan_name),
    })
}

/// Increments the balance and appends `entry` atomically.
///
/// Returns `false` without writing anything when the user has no balance row.
fn credit_balance(
    conn: &mut PgConnection,
    coins: i64,
    entry: InsertCoinTransactionEntity,
) -> QueryResult<bool> {
    conn.transaction(|conn| {
        let updated = update(user_coins::table)
            .filter(user_coins::user_id.eq(entry.user_id))
            .set((
                user_coins::balance.eq(user_coins::balance + coins),
                user_coins::updated_at.eq(Utc::now()),
            ))
            .execute(conn)?;

        if updated == 0 {
            return Ok(false);
        }

        insert_into(coin_transactions::table)
            .values(&entry)
            .execute(conn)?;

        Ok(true)
    })
}
