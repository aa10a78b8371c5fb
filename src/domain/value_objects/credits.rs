use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use uuid::Uuid;

pub const REASON_ALREADY_CREDITED: &str = "already credited this month";
pub const REASON_INVALID_PLAN: &str = "invalid plan or zero coins";
pub const REASON_DUPLICATE_SUBSCRIBER: &str = "duplicate subscriber in this run";
pub const REASON_ADD_COINS_FAILED: &str = "failed to add coins";

/// Result of one subscriber within a single reconciliation run.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CreditOutcome {
    Credited { coins: i64, plan: String },
    Skipped { reason: String },
    Failed { reason: String },
}

impl CreditOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        CreditOutcome::Skipped {
            reason: reason.into(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        CreditOutcome::Failed {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubscriberCreditResult {
    pub user_id: Uuid,
    #[serde(flatten)]
    pub outcome: CreditOutcome,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ReconciliationReport {
    pub processed: usize,
    pub results: Vec<SubscriberCreditResult>,
}

impl ReconciliationReport {
    pub fn push(&mut self, user_id: Uuid, outcome: CreditOutcome) {
        self.processed += 1;
        self.results.push(SubscriberCreditResult { user_id, outcome });
    }

    pub fn summary(&self) -> ReconciliationSummary {
        let mut summary = ReconciliationSummary::default();
        for result in &self.results {
            match &result.outcome {
                CreditOutcome::Credited { coins, .. } => {
                    summary.credited += 1;
                    summary.coins_granted += coins;
                }
                CreditOutcome::Skipped { .. } => summary.skipped += 1,
                CreditOutcome::Failed { .. } => summary.failed += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReconciliationSummary {
    pub credited: usize,
    pub skipped: usize,
    pub failed: usize,
    pub coins_granted: i64,
}

/// True when `last_credited_at` falls in the same UTC calendar month as `now`.
pub fn credited_in_current_month(
    last_credited_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    last_credited_at
        .is_some_and(|last| last.year() == now.year() && last.month() == now.month())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn same_month_counts_as_credited() {
        let now = Utc.with_ymd_and_hms(2025, 3, 28, 12, 0, 0).unwrap();
        let last = Utc.with_ymd_and_hms(2025, 3, 3, 8, 30, 0).unwrap();

        assert!(credited_in_current_month(Some(last), now));
    }

    #[test]
    fn previous_month_or_never_is_due() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let last = Utc.with_ymd_and_hms(2025, 2, 28, 23, 59, 59).unwrap();

        assert!(!credited_in_current_month(Some(last), now));
        assert!(!credited_in_current_month(None, now));
    }

    #[test]
    fn same_month_of_another_year_is_due() {
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap();
        let december = Utc.with_ymd_and_hms(2024, 12, 20, 0, 0, 0).unwrap();
        let last_january = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();

        assert!(!credited_in_current_month(Some(december), now));
        assert!(!credited_in_current_month(Some(last_january), now));
    }

    #[test]
    fn report_serializes_flat_outcomes() {
        let user_id = Uuid::nil();
        let mut report = ReconciliationReport::default();
        report.push(
            user_id,
            CreditOutcome::Credited {
                coins: 500,
                plan: "Pro".to_string(),
            },
        );
        report.push(user_id, CreditOutcome::skipped(REASON_ALREADY_CREDITED));

        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(
            value,
            json!({
                "processed": 2,
                "results": [
                    {
                        "user_id": "00000000-0000-0000-0000-000000000000",
                        "status": "credited",
                        "coins": 500,
                        "plan": "Pro"
                    },
                    {
                        "user_id": "00000000-0000-0000-0000-000000000000",
                        "status": "skipped",
                        "reason": "already credited this month"
                    }
                ]
            })
        );
    }

    #[test]
    fn summary_counts_each_outcome() {
        let mut report = ReconciliationReport::default();
        report.push(
            Uuid::new_v4(),
            CreditOutcome::Credited {
                coins: 300,
                plan: "Basic".to_string(),
            },
        );
        report.push(
            Uuid::new_v4(),
            CreditOutcome::Credited {
                coins: 500,
                plan: "Pro".to_string(),
            },
        );
        report.push(Uuid::new_v4(), CreditOutcome::failed(REASON_ADD_COINS_FAILED));
        report.push(Uuid::new_v4(), CreditOutcome::skipped(REASON_INVALID_PLAN));

        let summary = report.summary();

        assert_eq!(summary.credited, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.coins_granted, 800);
    }
}
