//! The endpoint for reading budget progress for a calendar month.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    budget::{core::list_budgets_for_period, progress::build_budget_progress},
    period::Period,
    transaction::sum_expenses_by_category,
    user::UserID,
};

/// The state needed to report budget progress.
#[derive(Debug, Clone)]
pub struct BudgetProgressState {
    /// The database connection for reading budgets and spending.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for BudgetProgressState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The query string parameters for the budget progress endpoint.
#[derive(Debug, Deserialize)]
pub struct BudgetProgressParams {
    /// The calendar month to report on, e.g. "2025-06".
    pub period: Option<String>,
}

/// A route handler for reporting how far through each budget cap the month's
/// spending has gone, for the currently logged in user.
///
/// Spending is summed over the full calendar month, from the first day to the
/// last day of the month named by `period`.
///
/// # Errors
/// Returns an [Error::InvalidPeriod] if the period parameter is missing or
/// not of the form "YYYY-MM", or an [Error::DatabaseLockError] if the
/// database lock cannot be acquired.
pub async fn budget_progress_endpoint(
    State(state): State<BudgetProgressState>,
    Extension(user_id): Extension<UserID>,
    Query(params): Query<BudgetProgressParams>,
) -> Result<Response, Error> {
    let period: Period = params.period.unwrap_or_default().parse()?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("Could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let budgets = list_budgets_for_period(user_id, period, &connection)?;
    let spent_by_category = sum_expenses_by_category(
        user_id,
        period.first_day(),
        period.last_day(),
        &connection,
    )?;

    Ok(Json(build_budget_progress(&budgets, &spent_by_category)).into_response())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension,
        extract::{Query, State},
        http::StatusCode,
        response::IntoResponse,
    };
    use rusqlite::Connection;
    use time::{Month, macros::date};

    use crate::{
        budget::{BudgetProgress, create_budget},
        db::initialize,
        period::Period,
        test_utils::{insert_test_account, insert_test_category, insert_test_user},
        transaction::{Transaction, TransactionKind, create_transaction},
        user::UserID,
    };

    use super::{BudgetProgressParams, BudgetProgressState, budget_progress_endpoint};

    fn get_test_state() -> BudgetProgressState {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        insert_test_user(&conn, "test@example.com");
        insert_test_account(&conn, 1, "Everyday");
        insert_test_category(&conn, 1, "Groceries");

        BudgetProgressState {
            db_connection: Arc::new(Mutex::new(conn)),
        }
    }

    fn spend(state: &BudgetProgressState, amount: f64, day: u8) {
        let conn = state.db_connection.lock().unwrap();
        create_transaction(
            Transaction::build(
                UserID::new(1),
                1,
                TransactionKind::Expense,
                amount,
                date!(2025 - 06 - 01).replace_day(day).unwrap(),
            )
            .category_id(Some(1)),
            &conn,
        )
        .unwrap();
    }

    async fn get_progress(state: BudgetProgressState, period: &str) -> Vec<BudgetProgress> {
        let params = BudgetProgressParams {
            period: Some(period.to_owned()),
        };

        let response = budget_progress_endpoint(State(state), Extension(UserID::new(1)), Query(params))
            .await
            .expect("the handler should succeed");

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn reports_fraction_of_cap_spent() {
        let state = get_test_state();
        {
            let conn = state.db_connection.lock().unwrap();
            create_budget(1, Period::new(2025, Month::June), 100.0, UserID::new(1), &conn).unwrap();
        }
        spend(&state, 60.0, 5);
        spend(&state, 30.0, 20);

        let progress = get_progress(state, "2025-06").await;

        assert_eq!(progress.len(), 1);
        assert_eq!(progress[0].spent, 90.0);
        assert_eq!(progress[0].progress, 0.9);
        assert_eq!(progress[0].remaining, 10.0);
    }

    #[tokio::test]
    async fn ignores_spending_outside_the_month() {
        let state = get_test_state();
        {
            let conn = state.db_connection.lock().unwrap();
            create_budget(1, Period::new(2025, Month::June), 100.0, UserID::new(1), &conn).unwrap();
            // One day either side of June.
            create_transaction(
                Transaction::build(
                    UserID::new(1),
                    1,
                    TransactionKind::Expense,
                    500.0,
                    date!(2025 - 05 - 31),
                )
                .category_id(Some(1)),
                &conn,
            )
            .unwrap();
            create_transaction(
                Transaction::build(
                    UserID::new(1),
                    1,
                    TransactionKind::Expense,
                    500.0,
                    date!(2025 - 07 - 01),
                )
                .category_id(Some(1)),
                &conn,
            )
            .unwrap();
        }
        spend(&state, 30.0, 30);

        let progress = get_progress(state, "2025-06").await;

        assert_eq!(progress[0].spent, 30.0);
    }

    #[tokio::test]
    async fn returns_empty_list_when_month_has_no_budgets() {
        let state = get_test_state();

        let progress = get_progress(state, "2025-06").await;

        assert_eq!(progress, vec![]);
    }

    #[tokio::test]
    async fn rejects_malformed_period() {
        let state = get_test_state();

        for period in [None, Some("junk".to_owned()), Some("2025-13".to_owned())] {
            let params = BudgetProgressParams {
                period: period.clone(),
            };

            let response =
                budget_progress_endpoint(State(state.clone()), Extension(UserID::new(1)), Query(params))
                    .await
                    .into_response();

            assert_eq!(
                response.status(),
                StatusCode::BAD_REQUEST,
                "want 400 for period {period:?}"
            );
        }
    }
}
