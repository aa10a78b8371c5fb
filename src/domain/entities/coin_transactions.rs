use diesel::prelude::*;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::coin_transactions;

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = coin_transactions)]
pub struct InsertCoinTransactionEntity {
    pub user_id: Uuid,
    pub amount: i32,
    pub kind: String,
    pub plan_name: Option<String>,
}
