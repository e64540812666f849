//! Defines the endpoint for recording a new transaction.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Deserialize;
use time::Date;

use crate::{
    AppState, Error,
    account::{AccountId, adjust_account_balance},
    category::CategoryId,
    transaction::{Transaction, TransactionKind, core::create_transaction},
    user::UserID,
};

time::serde::format_description!(date_format, Date, "[year]-[month]-[day]");

/// The state needed to record a transaction.
#[derive(Debug, Clone)]
pub struct CreateTransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for recording a transaction.
#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    /// The ID of the account the money moved in or out of.
    pub account_id: AccountId,
    /// The ID of the category the transaction belongs to.
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    /// Whether money was earned or spent.
    pub kind: TransactionKind,
    /// The amount of money spent or earned, zero or more.
    pub amount: f64,
    /// The date when the transaction occurred.
    #[serde(with = "date_format")]
    pub date: Date,
    /// Text detailing the transaction.
    #[serde(default)]
    pub description: String,
}

/// A route handler for recording a transaction for the currently logged in
/// user.
///
/// On success the cached balance of the transaction's account is adjusted by
/// the signed amount in the same request. If the balance adjustment fails
/// after the transaction row was written, the failure is logged and the
/// request still succeeds with the stored transaction.
///
/// # Errors
/// This function will return a:
/// - [Error::NegativeAmount] if the amount is less than zero,
/// - [Error::InvalidCategory] or [Error::InvalidAccount] if the referenced
///   rows do not exist,
/// - or [Error::DatabaseLockError] if the database lock cannot be acquired.
pub async fn create_transaction_endpoint(
    State(state): State<CreateTransactionState>,
    Extension(user_id): Extension<UserID>,
    Json(request): Json<CreateTransactionRequest>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("Could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let builder = Transaction::build(
        user_id,
        request.account_id,
        request.kind,
        request.amount,
        request.date,
    )
    .category_id(request.category_id)
    .description(&request.description);

    let transaction = create_transaction(builder, &connection)?;

    let delta = match transaction.kind {
        TransactionKind::Income => transaction.amount,
        TransactionKind::Expense => -transaction.amount,
    };

    // The transaction row is already written at this point, so a failed
    // balance adjustment downgrades to a log line instead of failing the
    // request. The balance can drift from the ledger here; a later sync or
    // recount corrects it.
    match adjust_account_balance(transaction.account_id, user_id, delta, &connection) {
        Ok(true) => {}
        Ok(false) => tracing::warn!(
            "transaction {} was recorded but account {} was not found, its balance is unchanged",
            transaction.id,
            transaction.account_id
        ),
        Err(error) => tracing::error!(
            "transaction {} was recorded but the balance of account {} could not be updated: {error}",
            transaction.id,
            transaction.account_id
        ),
    }

    Ok((StatusCode::CREATED, Json(transaction)).into_response())
}
