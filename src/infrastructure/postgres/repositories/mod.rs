pub mod coin_ledger;
pub mod plans;
pub mod subscriptions;
