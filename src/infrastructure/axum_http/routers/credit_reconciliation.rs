use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, header::AUTHORIZATION},
    routing::get,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    application::usecases::credit_reconciliation::CreditReconciliationUseCase,
    domain::value_objects::credits::SubscriberCreditResult,
    infrastructure::axum_http::error_responses::AppError,
};

// Run example
//   curl -X POST "http://localhost:$SERVER_PORT/api/v1/cron/credit-subscriptions" \
//     -H "Authorization: Bearer $CRON_SECRET"

#[derive(Clone)]
pub struct CreditReconciliationRouteState {
    cron_secret: Option<Arc<str>>,
    usecase: Arc<CreditReconciliationUseCase>,
}

pub fn routes(cron_secret: Option<String>, usecase: Arc<CreditReconciliationUseCase>) -> Router {
    Router::new()
        .route(
            "/credit-subscriptions",
            get(credit_subscriptions).post(credit_subscriptions),
        )
        .with_state(CreditReconciliationRouteState {
            cron_secret: cron_secret.map(Arc::from),
            usecase,
        })
}

#[derive(Debug, Serialize)]
pub struct CreditSubscriptionsResponse {
    pub success: bool,
    pub processed: usize,
    pub results: Vec<SubscriberCreditResult>,
}

pub async fn credit_subscriptions(
    State(state): State<CreditReconciliationRouteState>,
    headers: HeaderMap,
) -> Result<Json<CreditSubscriptionsResponse>, AppError> {
    let Some(expected_secret) = state.cron_secret.as_deref() else {
        warn!("credit_subscriptions: CRON_SECRET is not configured; rejecting trigger");
        return Err(AppError::ServiceUnavailable(
            "cron secret is not configured".to_string(),
        ));
    };

    authorize_bearer(&headers, expected_secret).inspect_err(|err| {
        warn!(error = %err, "credit_subscriptions: trigger rejected");
    })?;

    info!("credit_subscriptions: trigger accepted");
    let report = state.usecase.run().await?;

    Ok(Json(CreditSubscriptionsResponse {
        success: true,
        processed: report.processed,
        results: report.results,
    }))
}

fn authorize_bearer(headers: &HeaderMap, expected_secret: &str) -> Result<(), AppError> {
    let auth = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let token = auth
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AppError::Unauthorized)?;

    if token == expected_secret {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        entities::{plans::PlanEntity, subscriptions::SubscriptionEntity},
        repositories::{
            coin_ledger::MockCoinLedger, plans::MockPlanRepository,
            subscriptions::MockSubscriptionRepository,
        },
    };
    use anyhow::anyhow;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use chrono::Utc;
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use uuid::Uuid;

    const SECRET: &str = "cron-secret-for-tests";

    fn untouched_usecase() -> Arc<CreditReconciliationUseCase> {
        let mut subscriptions = MockSubscriptionRepository::new();
        subscriptions.expect_list_active_subscribers().never();
        subscriptions.expect_update_last_credited_at().never();
        let mut plans = MockPlanRepository::new();
        plans.expect_list_plans().never();
        let mut ledger = MockCoinLedger::new();
        ledger.expect_add_coins().never();

        Arc::new(CreditReconciliationUseCase::new(
            Arc::new(subscriptions),
            Arc::new(plans),
            Arc::new(ledger),
        ))
    }

    fn trigger(authorization: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/credit-subscriptions");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized_without_store_reads() {
        let router = routes(Some(SECRET.to_string()), untouched_usecase());

        let (status, body) = send(router, trigger(None)).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            body,
            json!({ "error": "missing or malformed authorization header" })
        );
    }

    #[tokio::test]
    async fn malformed_header_is_unauthorized() {
        let router = routes(Some(SECRET.to_string()), untouched_usecase());

        let (status, _) = send(router, trigger(Some(SECRET))).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn empty_bearer_token_is_unauthorized() {
        for header in ["Bearer ", "Bearer    "] {
            let router = routes(Some(SECRET.to_string()), untouched_usecase());

            let (status, _) = send(router, trigger(Some(header))).await;

            assert_eq!(status, StatusCode::UNAUTHORIZED, "header {header:?}");
        }
    }

    #[tokio::test]
    async fn wrong_secret_is_forbidden_without_store_reads() {
        let router = routes(Some(SECRET.to_string()), untouched_usecase());

        let (status, body) = send(router, trigger(Some("Bearer not-the-secret"))).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body, json!({ "error": "invalid credentials" }));
    }

    #[tokio::test]
    async fn unconfigured_secret_disables_trigger() {
        let router = routes(None, untouched_usecase());

        let (status, _) = send(router, trigger(Some("Bearer anything"))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn fetch_failure_maps_to_internal_error() {
        let mut subscriptions = MockSubscriptionRepository::new();
        subscriptions
            .expect_list_active_subscribers()
            .times(1)
            .returning(|| Err(anyhow!("password authentication failed for user")));
        let mut plans = MockPlanRepository::new();
        plans.expect_list_plans().never();
        let usecase = Arc::new(CreditReconciliationUseCase::new(
            Arc::new(subscriptions),
            Arc::new(plans),
            Arc::new(MockCoinLedger::new()),
        ));
        let router = routes(Some(SECRET.to_string()), usecase);

        let (status, body) = send(router, trigger(Some(&format!("Bearer {SECRET}")))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "failed to fetch subscriptions" }));
    }

    #[tokio::test]
    async fn authorized_trigger_returns_report() {
        let user_id = Uuid::new_v4();
        let now = Utc::now();

        let mut subscriptions = MockSubscriptionRepository::new();
        subscriptions
            .expect_list_active_subscribers()
            .times(1)
            .returning(move || {
                Ok(vec![SubscriptionEntity {
                    id: Uuid::new_v4(),
                    user_id,
                    plan_name: "Pro".to_string(),
                    provider_subscription_id: "I-BW452GLLEP1G".to_string(),
                    status: "active".to_string(),
                    last_credited_at: None,
                    created_at: now,
                    updated_at: now,
                }])
            });
        subscriptions
            .expect_update_last_credited_at()
            .times(1)
            .returning(|_, _| Ok(()));

        let mut plans = MockPlanRepository::new();
        plans.expect_list_plans().times(1).returning(move || {
            Ok(vec![PlanEntity {
                id: Uuid::new_v4(),
                name: "Pro".to_string(),
                monthly_coins: 500,
                price_minor: 999,
                created_at: now,
            }])
        });

        let mut ledger = MockCoinLedger::new();
        ledger
            .expect_add_coins()
            .times(1)
            .returning(|_, _, _| Ok(true));

        let usecase = Arc::new(CreditReconciliationUseCase::new(
            Arc::new(subscriptions),
            Arc::new(plans),
            Arc::new(ledger),
        ));
        let router = routes(Some(SECRET.to_string()), usecase);

        let (status, body) = send(router, trigger(Some(&format!("Bearer {SECRET}")))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "success": true,
                "processed": 1,
                "results": [
                    { "user_id": user_id, "status": "credited", "coins": 500, "plan": "Pro" }
                ]
            })
        );
    }
}
