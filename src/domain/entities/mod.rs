pub mod coin_transactions;
pub mod plans;
pub mod subscriptions;
