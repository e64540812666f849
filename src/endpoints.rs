//! The API endpoint URIs.

/// The route for registering a user.
pub const USERS: &str = "/api/users";
/// The route for logging in a user.
pub const LOG_IN: &str = "/api/log_in";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/log_out";

/// The route to access accounts.
pub const ACCOUNTS: &str = "/api/accounts";
/// The route to access categories.
pub const CATEGORIES: &str = "/api/categories";
/// The route to access transactions.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route to access budgets and budget progress.
pub const BUDGETS: &str = "/api/budgets";

/// The route for the dashboard summary.
pub const DASHBOARD_SUMMARY: &str = "/api/dashboard/summary";
/// The route for the net worth series.
pub const DASHBOARD_NET_WORTH: &str = "/api/dashboard/net_worth";

/// The route to create a Plaid Link token.
pub const PLAID_LINK_TOKEN: &str = "/api/plaid/link_token";
/// The route to exchange a Plaid public token for an access token.
pub const PLAID_EXCHANGE_TOKEN: &str = "/api/plaid/exchange_token";
/// The route to pull linked accounts from Plaid.
pub const PLAID_SYNC_ACCOUNTS: &str = "/api/plaid/sync/accounts";
/// The route to pull transactions for linked accounts from Plaid.
pub const PLAID_SYNC_TRANSACTIONS: &str = "/api/plaid/sync/transactions";
