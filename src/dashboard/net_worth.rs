//! The endpoint for the net-worth history chart.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::{Date, Duration, OffsetDateTime};

use crate::{
    AppState, Error,
    account::get_net_worth,
    timezone::get_local_offset,
    transaction::{DailyFlow, get_daily_flows},
    user::UserID,
};

time::serde::format_description!(date_format, Date, "[year]-[month]-[day]");

/// How many days of history the net-worth series covers, today included.
pub const NET_WORTH_SERIES_DAYS: usize = 30;

/// The net worth at the end of one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetWorthPoint {
    /// The day the amount is for.
    #[serde(with = "date_format")]
    pub date: Date,
    /// The net worth at the end of that day.
    pub amount: f64,
}

/// Reconstruct a daily net-worth series by working backwards from the current
/// total.
///
/// Produces one point per day for the [NET_WORTH_SERIES_DAYS] days ending at
/// `today`, oldest first, with the last point equal to `current_net_worth`.
/// Stepping back across a day undoes that day's income and restores its
/// expenses. Activity from before the window is not undone, so every point
/// carries it as a constant offset; callers with a reliable historical
/// snapshot can pass that as the seed instead.
pub fn build_net_worth_series(
    current_net_worth: f64,
    today: Date,
    daily_flows: &[DailyFlow],
) -> Vec<NetWorthPoint> {
    let flows_by_date: HashMap<Date, &DailyFlow> =
        daily_flows.iter().map(|flow| (flow.date, flow)).collect();

    // Calculate balances by working backwards from the current total.
    let mut points = Vec::with_capacity(NET_WORTH_SERIES_DAYS);
    let mut running = current_net_worth;

    for day_offset in 0..NET_WORTH_SERIES_DAYS as i64 {
        let date = today - Duration::days(day_offset);
        points.push(NetWorthPoint {
            date,
            amount: running,
        });

        if let Some(flow) = flows_by_date.get(&date) {
            running = running - flow.income + flow.expense;
        }
    }

    points.reverse();

    points
}

/// The state needed to chart net worth over time.
#[derive(Debug, Clone)]
pub struct NetWorthState {
    /// The database connection for reading accounts and transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for NetWorthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// A route handler for the net-worth history of the currently logged in user:
/// one point per day for the last [NET_WORTH_SERIES_DAYS] days, oldest first.
///
/// # Errors
/// Returns an [Error::InvalidTimezoneError] if the configured timezone is not
/// a canonical timezone name, or an [Error::DatabaseLockError] if the
/// database lock cannot be acquired.
pub async fn net_worth_endpoint(
    State(state): State<NetWorthState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let Some(local_offset) = get_local_offset(&state.local_timezone) else {
        tracing::error!("Invalid timezone {}", state.local_timezone);
        return Err(Error::InvalidTimezoneError(state.local_timezone));
    };

    let today = OffsetDateTime::now_utc().to_offset(local_offset).date();
    let window_start = today - Duration::days(NET_WORTH_SERIES_DAYS as i64 - 1);

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("Could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let net_worth = get_net_worth(user_id, &connection)?;
    let daily_flows = get_daily_flows(user_id, window_start, today, &connection)?;

    Ok(Json(build_net_worth_series(net_worth, today, &daily_flows)).into_response())
}


#[cfg(test)]
mod net_worth_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::State, http::StatusCode};
    use rusqlite::Connection;
    use time::{Duration, OffsetDateTime};

    use crate::{
        db::initialize,
        test_utils::{insert_test_account, insert_test_user},
        transaction::{Transaction, TransactionKind, create_transaction},
        user::UserID,
    };

    use super::{NET_WORTH_SERIES_DAYS, NetWorthPoint, NetWorthState, net_worth_endpoint};

    #[tokio::test]
    async fn reconstructs_balance_history_from_flows() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        insert_test_user(&conn, "test@example.com");
        insert_test_account(&conn, 1, "Everyday");
        // Balance after a 40 dollar expense yesterday.
        conn.execute("UPDATE account SET current_balance = 60.0 WHERE id = 1", ())
            .unwrap();
        let today = OffsetDateTime::now_utc().date();
        create_transaction(
            Transaction::build(
                UserID::new(1),
                1,
                TransactionKind::Expense,
                40.0,
                today - Duration::days(1),
            ),
            &conn,
        )
        .unwrap();
        let state = NetWorthState {
            db_connection: Arc::new(Mutex::new(conn)),
            local_timezone: "Etc/UTC".to_owned(),
        };

        let response = net_worth_endpoint(State(state), Extension(UserID::new(1)))
            .await
            .expect("the handler should succeed");

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let series: Vec<NetWorthPoint> = serde_json::from_slice(&body).unwrap();
        assert_eq!(series.len(), NET_WORTH_SERIES_DAYS);
        assert_eq!(series.last().unwrap().amount, 60.0);
        assert_eq!(series[NET_WORTH_SERIES_DAYS - 2].amount, 60.0);
        assert_eq!(series[NET_WORTH_SERIES_DAYS - 3].amount, 100.0);
        assert_eq!(series[0].amount, 100.0);
    }

    #[tokio::test]
    async fn rejects_invalid_timezone() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let state = NetWorthState {
            db_connection: Arc::new(Mutex::new(conn)),
            local_timezone: "Atlantis/Central".to_owned(),
        };

        let result = net_worth_endpoint(State(state), Extension(UserID::new(1))).await;

        assert!(
            matches!(result, Err(crate::Error::InvalidTimezoneError(_))),
            "want InvalidTimezoneError, got {result:?}"
        );
    }
}
