//! Moneytor is a web app for tracking your personal finances in one place.
//!
//! This library provides a JSON REST API for managing accounts, categories,
//! transactions and budgets, for reporting dashboard summaries, and for
//! syncing accounts and transactions from a banking data provider.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod account;
mod app_state;
mod auth;
mod budget;
mod category;
mod dashboard;
mod database_id;
mod db;
mod endpoints;
mod period;
mod provider;
mod routing;
mod sync;
mod timezone;
mod transaction;
mod user;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use auth::{PasswordHash, ValidatedPassword};
pub use db::initialize as initialize_db;
pub use provider::{PlaidClient, PlaidConfig};
pub use routing::build_router;
pub use timezone::get_local_offset;
pub use user::{User, UserID, get_user_by_id};

use crate::{account::AccountId, category::CategoryId};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an `axum_server` instance.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The user provided an email and password combination that does not
    /// match a registered user.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Either the user ID or expiry cookie is missing from the cookie jar in
    /// the request.
    #[error("no cookies in the cookie jar :(")]
    CookieMissing,

    /// There was an error parsing the date in the cookie or creating the new
    /// expiry date time.
    ///
    /// Callers should pass in the original error as a string and the date
    /// string that caused the error.
    #[error("could not format expiry cookie date-time string \"{1}\": {0}")]
    InvalidDateFormat(String, String),

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The email address used to register already belongs to a user.
    #[error("the email address is already in use")]
    DuplicateEmail,

    /// An empty string was used to create a category name.
    #[error("Category name cannot be empty")]
    EmptyCategoryName,

    /// The category ID used to create a transaction or budget did not match
    /// one of the user's categories.
    #[error("the category ID does not refer to a valid category")]
    InvalidCategory(Option<CategoryId>),

    /// The account ID used to create a transaction did not match one of the
    /// user's accounts.
    #[error("the account ID does not refer to a valid account")]
    InvalidAccount(AccountId),

    /// A negative amount was used to create a transaction or budget.
    ///
    /// Amounts record a magnitude and the kind records the direction,
    /// therefore negative amounts are not allowed.
    #[error("{0} is a negative amount, which is not allowed")]
    NegativeAmount(f64),

    /// The string could not be parsed as a budget period.
    #[error("\"{0}\" is not a valid budget period")]
    InvalidPeriod(String),

    /// The provider's transaction ID already exists in the database.
    ///
    /// When syncing transactions from the banking data provider, the
    /// provider's transaction ID uniquely identifies each transaction.
    /// Rejecting duplicate IDs avoids recording the same transaction multiple
    /// times when sync windows overlap in time.
    #[error("the external transaction ID already exists in the database")]
    DuplicateExternalId,

    /// A request to the banking data provider failed or returned a response
    /// that could not be parsed.
    #[error("the banking provider request failed: {0}")]
    ProviderError(String),

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("user.email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067
                    && desc.ends_with("transaction.external_transaction_id") =>
            {
                Error::DuplicateExternalId
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        tracing::error!("a request to the banking provider failed: {}", value);
        Error::ProviderError(value.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code = match &self {
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::InvalidCredentials | Error::CookieMissing => StatusCode::UNAUTHORIZED,
            Error::InvalidPeriod(_) => StatusCode::BAD_REQUEST,
            Error::DuplicateEmail | Error::DuplicateExternalId => StatusCode::CONFLICT,
            Error::TooWeak(_)
            | Error::EmptyCategoryName
            | Error::InvalidCategory(_)
            | Error::InvalidAccount(_)
            | Error::NegativeAmount(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::ProviderError(_) => StatusCode::BAD_GATEWAY,
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);

                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "an unexpected error occurred" })),
                )
                    .into_response();
            }
        };

        (status_code, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
