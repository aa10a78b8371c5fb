use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use anyhow::{Context, Result as AnyResult};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::domain::{
    entities::subscriptions::SubscriptionEntity,
    repositories::{
        coin_ledger::CoinLedger, plans::PlanRepository, subscriptions::SubscriptionRepository,
    },
    value_objects::credits::{
        CreditOutcome, REASON_ADD_COINS_FAILED, REASON_ALREADY_CREDITED,
        REASON_DUPLICATE_SUBSCRIBER, REASON_INVALID_PLAN, ReconciliationReport,
        credited_in_current_month,
    },
};

#[derive(Debug, Error)]
pub enum ReconciliationError {
    #[error("failed to fetch {resource}")]
    Fetch {
        resource: &'static str,
        #[source]
        cause: anyhow::Error,
    },
    #[error("a credit reconciliation run is already in progress")]
    AlreadyRunning,
}

/// Grants every active subscriber the monthly coin allotment of their plan,
/// at most once per calendar month.
pub struct CreditReconciliationUseCase {
    subscription_repository: Arc<dyn SubscriptionRepository + Send + Sync>,
    plan_repository: Arc<dyn PlanRepository + Send + Sync>,
    coin_ledger: Arc<dyn CoinLedger + Send + Sync>,
    run_guard: Mutex<()>,
}

impl CreditReconciliationUseCase {
    pub fn new(
        subscription_repository: Arc<dyn SubscriptionRepository + Send + Sync>,
        plan_repository: Arc<dyn PlanRepository + Send + Sync>,
        coin_ledger: Arc<dyn CoinLedger + Send + Sync>,
    ) -> Self {
        Self {
            subscription_repository,
            plan_repository,
            coin_ledger,
            run_guard: Mutex::new(()),
        }
    }

    pub async fn run(&self) -> Result<ReconciliationReport, ReconciliationError> {
        self.run_at(Utc::now()).await
    }

    pub async fn run_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<ReconciliationReport, ReconciliationError> {
        let _guard = self
            .run_guard
            .try_lock()
            .map_err(|_| ReconciliationError::AlreadyRunning)?;

        let subscribers = self
            .subscription_repository
            .list_active_subscribers()
            .await
            .map_err(|cause| {
                error!(error = ?cause, "credit_reconciliation: failed to fetch subscriptions");
                ReconciliationError::Fetch {
                    resource: "subscriptions",
                    cause,
                }
            })?;

        let plans = self.plan_repository.list_plans().await.map_err(|cause| {
            error!(error = ?cause, "credit_reconciliation: failed to fetch plans");
            ReconciliationError::Fetch {
                resource: "plans",
                cause,
            }
        })?;

        let plan_coins: HashMap<String, i64> = plans
            .iter()
            .map(|plan| (plan.name.clone(), plan.coin_allotment()))
            .collect();

        info!(
            subscribers = subscribers.len(),
            plans = plan_coins.len(),
            "credit_reconciliation: started"
        );

        let mut seen_users = HashSet::with_capacity(subscribers.len());
        let mut report = ReconciliationReport::default();

        for subscriber in subscribers {
            if !seen_users.insert(subscriber.user_id) {
                warn!(
                    user_id = %subscriber.user_id,
                    subscription_id = %subscriber.id,
                    provider_subscription_id = %subscriber.provider_subscription_id,
                    "credit_reconciliation: duplicate active subscription row; skipping"
                );
                report.push(
                    subscriber.user_id,
                    CreditOutcome::skipped(REASON_DUPLICATE_SUBSCRIBER),
                );
                continue;
            }

            let outcome = self.credit_subscriber(&subscriber, &plan_coins, now).await;
            report.push(subscriber.user_id, outcome);
        }

        let summary = report.summary();
        info!(
            processed = report.processed,
            credited = summary.credited,
            skipped = summary.skipped,
            failed = summary.failed,
            coins_granted = summary.coins_granted,
            "credit_reconciliation: completed"
        );

        Ok(report)
    }

    async fn credit_subscriber(
        &self,
        subscriber: &SubscriptionEntity,
        plan_coins: &HashMap<String, i64>,
        now: DateTime<Utc>,
    ) -> CreditOutcome {
        if credited_in_current_month(subscriber.last_credited_at, now) {
            debug!(
                user_id = %subscriber.user_id,
                last_credited_at = ?subscriber.last_credited_at,
                "credit_reconciliation: already credited this month"
            );
            return CreditOutcome::skipped(REASON_ALREADY_CREDITED);
        }

        let coins = plan_coins
            .get(&subscriber.plan_name)
            .copied()
            .unwrap_or_default();
        if coins <= 0 {
            debug!(
                user_id = %subscriber.user_id,
                plan = %subscriber.plan_name,
                "credit_reconciliation: unknown plan or zero coins"
            );
            return CreditOutcome::skipped(REASON_INVALID_PLAN);
        }

        match self.apply_credit(subscriber, coins, now).await {
            Ok(true) => {
                info!(
                    user_id = %subscriber.user_id,
                    plan = %subscriber.plan_name,
                    coins,
                    "credit_reconciliation: subscriber credited"
                );
                CreditOutcome::Credited {
                    coins,
                    plan: subscriber.plan_name.clone(),
                }
            }
            Ok(false) => {
                error!(
                    user_id = %subscriber.user_id,
                    plan = %subscriber.plan_name,
                    coins,
                    "credit_reconciliation: ledger refused the credit"
                );
                CreditOutcome::failed(REASON_ADD_COINS_FAILED)
            }
            Err(err) => {
                error!(
                    user_id = %subscriber.user_id,
                    plan = %subscriber.plan_name,
                    error = ?err,
                    "credit_reconciliation: failed to credit subscriber"
                );
                CreditOutcome::failed(format!("{err:#}"))
            }
        }
    }

    /// The timestamp is written only after the ledger accepted the credit.
    async fn apply_credit(
        &self,
        subscriber: &SubscriptionEntity,
        coins: i64,
        now: DateTime<Utc>,
    ) -> AnyResult<bool> {
        let added = self
            .coin_ledger
            .add_coins(subscriber.user_id, subscriber.plan_name.clone(), coins)
            .await?;
        if !added {
            return Ok(false);
        }

        self.subscription_repository
            .update_last_credited_at(subscriber.user_id, now)
            .await
            .context("coins added but the credit timestamp was not recorded")?;

        Ok(true)
    }
}
