//! The endpoint for listing a user's transactions.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{AppState, Error, transaction::core::list_transactions, user::UserID};

/// The state needed to list transactions.
#[derive(Debug, Clone)]
pub struct ListTransactionsState {
    /// The database connection for reading transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ListTransactionsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for listing the transactions of the currently logged in
/// user with their account and category names, most recent date first.
///
/// # Errors
/// Returns an [Error::DatabaseLockError] if the database lock cannot be
/// acquired, or an [Error::SqlError] if the query fails.
pub async fn list_transactions_endpoint(
    State(state): State<ListTransactionsState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("Could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let transactions = list_transactions(user_id, &connection)
        .inspect_err(|error| tracing::error!("Could not list transactions: {error}"))?;

    Ok(Json(transactions).into_response())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::State, http::StatusCode};
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        db::initialize,
        test_utils::{insert_test_account, insert_test_category, insert_test_user},
        transaction::{Transaction, TransactionKind, TransactionListItem, create_transaction},
        user::UserID,
    };

    use super::{ListTransactionsState, list_transactions_endpoint};

    #[tokio::test]
    async fn returns_joined_transactions_as_json() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        insert_test_user(&conn, "test@example.com");
        insert_test_account(&conn, 1, "Everyday");
        insert_test_category(&conn, 1, "Groceries");
        create_transaction(
            Transaction::build(
                UserID::new(1),
                1,
                TransactionKind::Expense,
                12.3,
                date!(2025 - 06 - 15),
            )
            .category_id(Some(1))
            .description("weekly shop"),
            &conn,
        )
        .unwrap();
        let state = ListTransactionsState {
            db_connection: Arc::new(Mutex::new(conn)),
        };

        let response = list_transactions_endpoint(State(state), Extension(UserID::new(1)))
            .await
            .expect("the handler should succeed");

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let items: Vec<TransactionListItem> = serde_json::from_slice(&body).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].account_name, "Everyday");
        assert_eq!(items[0].category_name, Some("Groceries".to_owned()));
        assert_eq!(items[0].amount, 12.3);
    }
}
