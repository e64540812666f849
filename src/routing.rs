//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Json, Router,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;

use crate::{
    AppState,
    account::{create_account_endpoint, list_accounts_endpoint},
    auth::{auth_guard, log_in_endpoint, log_out_endpoint, register_user_endpoint},
    budget::{budget_progress_endpoint, create_budget_endpoint},
    category::{create_category_endpoint, list_categories_endpoint},
    dashboard::{dashboard_summary_endpoint, net_worth_endpoint},
    endpoints,
    provider::PlaidClient,
    sync::{
        create_link_token_endpoint, exchange_token_endpoint, sync_accounts_endpoint,
        sync_transactions_endpoint,
    },
    transaction::{create_transaction_endpoint, list_transactions_endpoint},
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::USERS, post(register_user_endpoint))
        .route(endpoints::LOG_IN, post(log_in_endpoint))
        .route(endpoints::LOG_OUT, get(log_out_endpoint));

    let protected_routes = Router::new()
        .route(
            endpoints::ACCOUNTS,
            post(create_account_endpoint).get(list_accounts_endpoint),
        )
        .route(
            endpoints::CATEGORIES,
            post(create_category_endpoint).get(list_categories_endpoint),
        )
        .route(
            endpoints::TRANSACTIONS,
            post(create_transaction_endpoint).get(list_transactions_endpoint),
        )
        .route(
            endpoints::BUDGETS,
            post(create_budget_endpoint).get(budget_progress_endpoint),
        )
        .route(endpoints::DASHBOARD_SUMMARY, get(dashboard_summary_endpoint))
        .route(endpoints::DASHBOARD_NET_WORTH, get(net_worth_endpoint))
        .route(
            endpoints::PLAID_LINK_TOKEN,
            post(create_link_token_endpoint::<PlaidClient>),
        )
        .route(
            endpoints::PLAID_EXCHANGE_TOKEN,
            post(exchange_token_endpoint::<PlaidClient>),
        )
        .route(
            endpoints::PLAID_SYNC_ACCOUNTS,
            post(sync_accounts_endpoint::<PlaidClient>),
        )
        .route(
            endpoints::PLAID_SYNC_TRANSACTIONS,
            post(sync_transactions_endpoint::<PlaidClient>),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes
        .merge(unprotected_routes)
        .fallback(get_404_not_found)
        .with_state(state)
}

/// Serve a JSON 404 for routes that do not exist.
async fn get_404_not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" }))).into_response()
}
