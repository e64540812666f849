//! The endpoints for linking institutions and syncing their data.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::{Duration, OffsetDateTime};

use crate::{
    AppState, Error,
    provider::{BankingProvider, PlaidClient},
    sync::{create_connection, insert_synced_transactions, list_connections, upsert_synced_account},
    user::UserID,
};

/// The provider name stored alongside new connections.
const PROVIDER_NAME: &str = "plaid";

/// How many days of transaction history each sync requests.
const SYNC_WINDOW_DAYS: i64 = 30;

/// The state needed for the institution linking and sync endpoints.
#[derive(Debug, Clone)]
pub struct SyncState<P> {
    /// The database connection for storing synced data.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The client for the banking data provider.
    pub provider: P,
}

impl FromRef<AppState> for SyncState<PlaidClient> {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            provider: state.plaid_client.clone(),
        }
    }
}

/// A route handler that creates a token for starting the account linking
/// flow for the currently logged in user.
///
/// # Errors
/// Returns an [Error::ProviderError] if the provider call fails.
pub async fn create_link_token_endpoint<P: BankingProvider>(
    State(state): State<SyncState<P>>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let link_token = state.provider.create_link_token(user_id).await?;

    Ok(Json(json!({ "link_token": link_token })).into_response())
}

/// The request body for completing the account linking flow.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExchangeTokenRequest {
    /// The public token produced by the linking flow.
    pub public_token: String,
}

/// A route handler that trades the public token from a completed linking
/// flow for an access token, and stores the new connection.
///
/// # Errors
/// Returns an [Error::ProviderError] if the provider call fails, or an
/// [Error::DatabaseLockError] if the database lock cannot be acquired.
pub async fn exchange_token_endpoint<P: BankingProvider>(
    State(state): State<SyncState<P>>,
    Extension(user_id): Extension<UserID>,
    Json(request): Json<ExchangeTokenRequest>,
) -> Result<Response, Error> {
    let exchanged = state
        .provider
        .exchange_public_token(&request.public_token)
        .await?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("Could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    create_connection(
        user_id,
        PROVIDER_NAME,
        &exchanged.item_id,
        &exchanged.access_token,
        &connection,
    )?;

    Ok(Json(json!({ "success": true })).into_response())
}

/// A route handler that pulls account data for every connection of the
/// currently logged in user.
///
/// A connection whose provider call fails is logged and skipped, the
/// remaining connections still sync. The response reports how many accounts
/// were newly linked, refreshed accounts are not counted.
///
/// # Errors
/// Returns an [Error::DatabaseLockError] if the database lock cannot be
/// acquired, or an [Error::SqlError] if a write fails.
pub async fn sync_accounts_endpoint<P: BankingProvider>(
    State(state): State<SyncState<P>>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connections = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("Could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        list_connections(user_id, &connection)?
    };

    let synced_at = OffsetDateTime::now_utc();
    let mut synced = 0;

    for external_connection in connections {
        let accounts = match state
            .provider
            .fetch_accounts(&external_connection.access_token)
            .await
        {
            Ok(accounts) => accounts,
            Err(error) => {
                tracing::error!(
                    "Could not fetch accounts for connection {}: {error}",
                    external_connection.id
                );
                continue;
            }
        };

        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("Could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        for account in &accounts {
            if upsert_synced_account(user_id, account, synced_at, &connection)? {
                synced += 1;
            }
        }
    }

    Ok(Json(json!({ "synced": synced })).into_response())
}

/// A route handler that pulls the last thirty days of transactions for every
/// connection of the currently logged in user.
///
/// A connection whose provider call fails is logged and skipped, the
/// remaining connections still sync. The response reports how many ledger
/// rows were newly written, previously synced transactions are not counted.
///
/// # Errors
/// Returns an [Error::DatabaseLockError] if the database lock cannot be
/// acquired, or an [Error::SqlError] if a write fails.
pub async fn sync_transactions_endpoint<P: BankingProvider>(
    State(state): State<SyncState<P>>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connections = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("Could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        list_connections(user_id, &connection)?
    };

    let end_date = OffsetDateTime::now_utc().date();
    let start_date = end_date - Duration::days(SYNC_WINDOW_DAYS);
    let mut synced = 0;

    for external_connection in connections {
        let transactions = match state
            .provider
            .fetch_transactions(&external_connection.access_token, start_date, end_date)
            .await
        {
            Ok(transactions) => transactions,
            Err(error) => {
                tracing::error!(
                    "Could not fetch transactions for connection {}: {error}",
                    external_connection.id
                );
                continue;
            }
        };

        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("Could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        synced += insert_synced_transactions(user_id, &transactions, &connection)?;
    }

    Ok(Json(json!({ "synced": synced })).into_response())
}

// ============================================================================
// TESTS
// ============================================================================
