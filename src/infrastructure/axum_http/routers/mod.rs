pub mod credit_reconciliation;
