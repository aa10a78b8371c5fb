use anyhow::Result;
use std::sync::Arc;
use subcredit::{
    application::usecases::credit_reconciliation::CreditReconciliationUseCase,
    config::config_loader,
    domain::repositories::{
        coin_ledger::CoinLedger, plans::PlanRepository, subscriptions::SubscriptionRepository,
    },
    infrastructure::{
        axum_http::http_serve,
        postgres::{
            postgres_connection,
            repositories::{
                coin_ledger::CoinLedgerPostgres, plans::PlanPostgres,
                subscriptions::SubscriptionPostgres,
            },
        },
    },
    observability,
};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        error!("subcredit exited with error: {:#}", error);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    observability::init_observability("subcredit")?;

    let dotenvy_env = Arc::new(config_loader::load()?);
    info!(stage = %dotenvy_env.stage, "ENV has been loaded");

    let postgres_pool = postgres_connection::establish_connection(&dotenvy_env.database.url)?;
    info!("Postgres connection has been established");

    let db_pool_arc = Arc::new(postgres_pool);

    let subscription_repository: Arc<dyn SubscriptionRepository + Send + Sync> =
        Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool_arc)));
    let plan_repository: Arc<dyn PlanRepository + Send + Sync> =
        Arc::new(PlanPostgres::new(Arc::clone(&db_pool_arc)));
    let coin_ledger: Arc<dyn CoinLedger + Send + Sync> =
        Arc::new(CoinLedgerPostgres::new(Arc::clone(&db_pool_arc)));

    let credit_reconciliation_usecase = Arc::new(CreditReconciliationUseCase::new(
        subscription_repository,
        plan_repository,
        coin_ledger,
    ));

    if dotenvy_env.cron_job.secret.is_none() {
        info!("CRON_SECRET is not set; the credit trigger will answer 503");
    }

    http_serve::start(dotenvy_env, credit_reconciliation_usecase).await?;

    info!("Server has shut down");
    Ok(())
}
