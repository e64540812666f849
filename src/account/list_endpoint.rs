//! The endpoint for listing a user's accounts.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    account::{Account, map_account_row},
    user::UserID,
};

/// The state needed to list accounts.
#[derive(Debug, Clone)]
pub struct ListAccountsState {
    /// The database connection for reading accounts.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ListAccountsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for listing the accounts of the currently logged in user,
/// newest first.
///
/// # Errors
/// Returns an [Error::DatabaseLockError] if the database lock cannot be
/// acquired, or an [Error::SqlError] if the query fails.
pub async fn list_accounts_endpoint(
    State(state): State<ListAccountsState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("Could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let accounts = list_accounts(user_id, &connection)
        .inspect_err(|error| tracing::error!("Could not list accounts: {error}"))?;

    Ok(Json(accounts).into_response())
}

/// Get all of the user's accounts, newest first.
///
/// # Errors
/// Returns an [Error::SqlError] if the SQL query fails.
pub fn list_accounts(user_id: UserID, connection: &Connection) -> Result<Vec<Account>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, kind, starting_balance, current_balance, \
             available_balance, currency, is_sync_enabled, external_account_id, last_synced_at \
             FROM account \
             WHERE user_id = :user_id \
             ORDER BY id DESC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_account_row)?
        .map(|account_result| account_result.map_err(Error::from))
        .collect()
}
