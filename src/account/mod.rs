//! Financial accounts and their cached balances.

mod core;
mod create_endpoint;
mod list_endpoint;

pub use core::{
    Account, AccountId, AccountKind, adjust_account_balance, create_account_table, get_net_worth,
    map_account_row,
};
pub use create_endpoint::{CreateAccountRequest, create_account, create_account_endpoint};
pub use list_endpoint::{list_accounts, list_accounts_endpoint};

pub(crate) use create_endpoint::CreateAccountState;
pub(crate) use list_endpoint::ListAccountsState;
