//! A client for the Plaid REST API.

use serde::Deserialize;
use serde_json::json;
use time::Date;

use crate::{
    Error,
    provider::{BankingProvider, ExchangedToken, ProviderAccount, ProviderTransaction},
    user::UserID,
};

time::serde::format_description!(date_format, Date, "[year]-[month]-[day]");

/// How many transactions to request per sync.
const TRANSACTIONS_PER_REQUEST: u32 = 500;

/// The settings needed to talk to a Plaid environment.
#[derive(Debug, Clone)]
pub struct PlaidConfig {
    /// The client ID issued by Plaid.
    pub client_id: String,
    /// The secret for the chosen environment.
    pub secret: String,
    /// The environment base URL, e.g. <https://sandbox.plaid.com>.
    pub base_url: String,
}

/// A client for the Plaid REST API.
///
/// Cloning is cheap, the underlying HTTP client is reference counted.
#[derive(Debug, Clone)]
pub struct PlaidClient {
    config: PlaidConfig,
    client: reqwest::Client,
}

impl PlaidClient {
    /// Create a client for the Plaid environment described by `config`.
    pub fn new(config: PlaidConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    async fn post<T>(&self, path: &str, body: serde_json::Value) -> Result<T, Error>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}{path}", self.config.base_url);
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }
}

impl BankingProvider for PlaidClient {
    async fn create_link_token(&self, user_id: UserID) -> Result<String, Error> {
        let body = json!({
            "client_id": self.config.client_id,
            "secret": self.config.secret,
            "client_name": "Moneytor",
            "user": { "client_user_id": user_id.as_i64().to_string() },
            "products": ["transactions"],
            "country_codes": ["US"],
            "language": "en",
        });

        let response: LinkTokenResponse = self.post("/link/token/create", body).await?;

        Ok(response.link_token)
    }

    async fn exchange_public_token(&self, public_token: &str) -> Result<ExchangedToken, Error> {
        let body = json!({
            "client_id": self.config.client_id,
            "secret": self.config.secret,
            "public_token": public_token,
        });

        let response: ExchangeResponse = self.post("/item/public_token/exchange", body).await?;

        Ok(ExchangedToken {
            access_token: response.access_token,
            item_id: response.item_id,
        })
    }

    async fn fetch_accounts(&self, access_token: &str) -> Result<Vec<ProviderAccount>, Error> {
        let body = json!({
            "client_id": self.config.client_id,
            "secret": self.config.secret,
            "access_token": access_token,
        });

        let response: AccountsResponse = self.post("/accounts/get", body).await?;

        Ok(response.accounts.into_iter().map(Into::into).collect())
    }

    async fn fetch_transactions(
        &self,
        access_token: &str,
        start_date: Date,
        end_date: Date,
    ) -> Result<Vec<ProviderTransaction>, Error> {
        // TODO: Page through the results with the offset option once a linked
        // account produces more than TRANSACTIONS_PER_REQUEST rows per sync.
        let body = json!({
            "client_id": self.config.client_id,
            "secret": self.config.secret,
            "access_token": access_token,
            "start_date": start_date.to_string(),
            "end_date": end_date.to_string(),
            "options": { "count": TRANSACTIONS_PER_REQUEST },
        });

        let response: TransactionsResponse = self.post("/transactions/get", body).await?;

        Ok(response.transactions.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, Deserialize)]
struct LinkTokenResponse {
    link_token: String,
}

#[derive(Debug, Deserialize)]
struct ExchangeResponse {
    access_token: String,
    item_id: String,
}

#[derive(Debug, Deserialize)]
struct AccountsResponse {
    accounts: Vec<PlaidAccount>,
}

#[derive(Debug, Deserialize)]
struct PlaidAccount {
    account_id: String,
    name: String,
    #[serde(rename = "type")]
    kind: String,
    subtype: Option<String>,
    balances: PlaidBalances,
}

#[derive(Debug, Deserialize)]
struct PlaidBalances {
    current: Option<f64>,
    available: Option<f64>,
    iso_currency_code: Option<String>,
}

impl From<PlaidAccount> for ProviderAccount {
    fn from(account: PlaidAccount) -> Self {
        Self {
            external_id: account.account_id,
            name: account.name,
            kind: account.kind,
            subkind: account.subtype,
            current_balance: account.balances.current,
            available_balance: account.balances.available,
            currency: account.balances.iso_currency_code,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TransactionsResponse {
    transactions: Vec<PlaidTransaction>,
}

#[derive(Debug, Deserialize)]
struct PlaidTransaction {
    transaction_id: String,
    account_id: String,
    name: String,
    amount: f64,
    #[serde(with = "date_format")]
    date: Date,
    pending: bool,
    personal_finance_category: Option<PlaidCategory>,
}

#[derive(Debug, Deserialize)]
struct PlaidCategory {
    primary: String,
}

impl From<PlaidTransaction> for ProviderTransaction {
    fn from(transaction: PlaidTransaction) -> Self {
        Self {
            external_id: transaction.transaction_id,
            external_account_id: transaction.account_id,
            amount: transaction.amount,
            date: transaction.date,
            description: transaction.name,
            category: transaction
                .personal_finance_category
                .map(|category| category.primary),
            pending: transaction.pending,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
