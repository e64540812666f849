//! External sync module
//!
//! Stores linked institution logins and reconciles the account and
//! transaction data a banking provider reports into the user's ledger.
//! Provider data is merged conservatively: account balances are refreshed on
//! every sync while synced transactions are written once and never updated.

mod accounts;
mod connection;
mod endpoints;
mod transactions;

pub use accounts::{map_provider_account_kind, upsert_synced_account};
pub use connection::{
    ConnectionId, ExternalConnection, create_connection, create_connection_table,
    list_connections,
};
pub use endpoints::{
    ExchangeTokenRequest, create_link_token_endpoint, exchange_token_endpoint,
    sync_accounts_endpoint, sync_transactions_endpoint,
};
pub use transactions::insert_synced_transactions;

pub(crate) use endpoints::SyncState;
