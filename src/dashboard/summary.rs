//! The endpoint for the dashboard summary figures.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    account::get_net_worth,
    period::Period,
    timezone::get_local_offset,
    transaction::{TransactionListItem, list_recent_transactions, sum_amounts_by_kind_in_range},
    user::UserID,
};

/// How many recent transactions the summary includes.
const RECENT_TRANSACTIONS_COUNT: u32 = 5;

/// The headline figures shown at the top of the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    /// Total income so far this calendar month.
    pub income: f64,
    /// Total expenses so far this calendar month.
    pub expenses: f64,
    /// Income minus expenses for the month.
    pub net: f64,
    /// The signed sum of current account balances.
    pub net_worth: f64,
    /// The most recent transactions with account and category names.
    pub recent_transactions: Vec<TransactionListItem>,
}

/// The state needed to build the dashboard summary.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The database connection for reading accounts and transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// A route handler for the dashboard summary of the currently logged in user:
/// month-to-date income and expenses, net worth, and the five most recent
/// transactions.
///
/// # Errors
/// Returns an [Error::InvalidTimezoneError] if the configured timezone is not
/// a canonical timezone name, or an [Error::DatabaseLockError] if the
/// database lock cannot be acquired.
pub async fn dashboard_summary_endpoint(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let Some(local_offset) = get_local_offset(&state.local_timezone) else {
        tracing::error!("Invalid timezone {}", state.local_timezone);
        return Err(Error::InvalidTimezoneError(state.local_timezone));
    };

    let today = OffsetDateTime::now_utc().to_offset(local_offset).date();
    let month_start = Period::containing(today).first_day();

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("Could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let (income, expenses) =
        sum_amounts_by_kind_in_range(user_id, month_start, today, &connection)?;
    let net_worth = get_net_worth(user_id, &connection)?;
    let recent_transactions =
        list_recent_transactions(user_id, RECENT_TRANSACTIONS_COUNT, &connection)?;

    Ok(Json(DashboardSummary {
        income,
        expenses,
        net: income - expenses,
        net_worth,
        recent_transactions,
    })
    .into_response())
}
