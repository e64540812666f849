//! The endpoint for creating a manual account.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::{Connection, params};
use serde::Deserialize;

use crate::{
    AppState, Error,
    account::{Account, AccountKind, map_account_row},
    user::UserID,
};

/// The state needed to create an account.
#[derive(Debug, Clone)]
pub struct CreateAccountState {
    /// The database connection for storing the new account.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateAccountState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for creating a manual account.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    /// The display name of the account.
    pub name: String,
    /// What sort of account this is.
    pub kind: AccountKind,
    /// The balance of the account right now, defaulting to zero.
    #[serde(default)]
    pub starting_balance: f64,
    /// The ISO 4217 currency code, defaulting to "USD".
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "USD".to_owned()
}

/// A route handler for creating an account for the currently logged in user.
///
/// # Errors
/// Returns an [Error::DatabaseLockError] if the database lock cannot be
/// acquired, or an [Error::SqlError] if the insert fails.
pub async fn create_account_endpoint(
    State(state): State<CreateAccountState>,
    Extension(user_id): Extension<UserID>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("Could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let account = create_account(&request, user_id, &connection)?;

    Ok((StatusCode::CREATED, Json(account)).into_response())
}

/// Create a manual account in the database.
///
/// The current and available balances both start at the starting balance, and
/// the account is not linked to any banking provider.
///
/// # Errors
/// Returns an [Error::SqlError] if the SQL query fails.
pub fn create_account(
    request: &CreateAccountRequest,
    user_id: UserID,
    connection: &Connection,
) -> Result<Account, Error> {
    let account = connection
        .prepare(
            "INSERT INTO account (user_id, name, kind, starting_balance, current_balance, \
             available_balance, currency, is_sync_enabled) \
             VALUES (?1, ?2, ?3, ?4, ?4, ?4, ?5, 0) \
             RETURNING id, user_id, name, kind, starting_balance, current_balance, \
             available_balance, currency, is_sync_enabled, external_account_id, last_synced_at",
        )?
        .query_row(
            params![
                user_id.as_i64(),
                request.name,
                request.kind,
                request.starting_balance,
                request.currency
            ],
            map_account_row,
        )?;

    Ok(account)
}


#[cfg(test)]
mod create_account_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, Json, extract::State, http::StatusCode};
    use rusqlite::Connection;

    use crate::{
        account::{Account, AccountKind},
        db::initialize,
        user::UserID,
    };

    use super::{CreateAccountRequest, CreateAccountState, create_account_endpoint};

    fn get_test_state() -> CreateAccountState {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn.execute(
            "INSERT INTO user (email, password) VALUES ('test@example.com', 'hunter2')",
            (),
        )
        .unwrap();

        CreateAccountState {
            db_connection: Arc::new(Mutex::new(conn)),
        }
    }

    #[tokio::test]
    async fn returns_created_account_as_json() {
        let state = get_test_state();
        let request = CreateAccountRequest {
            name: "Everyday".to_owned(),
            kind: AccountKind::Checking,
            starting_balance: 100.0,
            currency: "USD".to_owned(),
        };

        let response =
            create_account_endpoint(State(state), Extension(UserID::new(1)), Json(request))
                .await
                .expect("the handler should succeed");

        assert_eq!(response.status(), StatusCode::CREATED);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let account: Account = serde_json::from_slice(&body).unwrap();
        assert_eq!(account.name, "Everyday");
        assert_eq!(account.current_balance, 100.0);
    }

    #[test]
    fn request_parses_with_defaults() {
        let request: CreateAccountRequest =
            serde_json::from_str(r#"{"name": "Wallet", "kind": "manual_cash"}"#).unwrap();

        assert_eq!(request.starting_balance, 0.0);
        assert_eq!(request.currency, "USD");
    }
}
