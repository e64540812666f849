//! Banking data provider module
//!
//! Defines the interface the sync endpoints use to talk to an external
//! banking data aggregator, and the data types the aggregator reports
//! accounts and transactions in.

mod plaid;

use std::future::Future;

use time::Date;

use crate::{Error, user::UserID};

pub use plaid::{PlaidClient, PlaidConfig};

/// An account as reported by the banking data provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderAccount {
    /// The provider's identifier for the account.
    pub external_id: String,
    /// The account name shown by the institution.
    pub name: String,
    /// The provider's coarse account type, e.g. "depository" or "credit".
    pub kind: String,
    /// The provider's finer account type, e.g. "savings" or "cd".
    pub subkind: Option<String>,
    /// The balance including pending activity, if reported.
    pub current_balance: Option<f64>,
    /// The balance available to spend, if reported.
    pub available_balance: Option<f64>,
    /// The ISO 4217 currency code, if reported.
    pub currency: Option<String>,
}

/// A transaction as reported by the banking data provider.
///
/// Amounts follow the provider's convention: money leaving the account is
/// positive and money entering it is negative.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderTransaction {
    /// The provider's identifier for the transaction.
    pub external_id: String,
    /// The provider's identifier for the account the transaction belongs to.
    pub external_account_id: String,
    /// The transaction amount in the account's currency.
    pub amount: f64,
    /// The date the transaction was posted or authorized.
    pub date: Date,
    /// The merchant or transaction description.
    pub description: String,
    /// The provider's category label, if the provider assigned one.
    pub category: Option<String>,
    /// Whether the transaction is still pending settlement.
    pub pending: bool,
}

/// The credentials returned when a public token is exchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangedToken {
    /// The long lived token used for subsequent API calls.
    pub access_token: String,
    /// The provider's identifier for the linked institution login.
    pub item_id: String,
}

/// The operations the sync endpoints need from a banking data aggregator.
///
/// Implementations must be cheap to clone since the router state is cloned
/// per request.
pub trait BankingProvider: Clone + Send + Sync + 'static {
    /// Create a short lived token the client uses to start the account
    /// linking flow for `user_id`.
    fn create_link_token(
        &self,
        user_id: UserID,
    ) -> impl Future<Output = Result<String, Error>> + Send;

    /// Trade the public token produced by the linking flow for a long lived
    /// access token.
    fn exchange_public_token(
        &self,
        public_token: &str,
    ) -> impl Future<Output = Result<ExchangedToken, Error>> + Send;

    /// Fetch the accounts reachable through `access_token`.
    fn fetch_accounts(
        &self,
        access_token: &str,
    ) -> impl Future<Output = Result<Vec<ProviderAccount>, Error>> + Send;

    /// Fetch the transactions dated between `start_date` and `end_date`
    /// inclusive.
    fn fetch_transactions(
        &self,
        access_token: &str,
        start_date: Date,
        end_date: Date,
    ) -> impl Future<Output = Result<Vec<ProviderTransaction>, Error>> + Send;
}
