//! Transaction management for the dashboard.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and `TransactionBuilder` for creating transactions
//! - Database functions for storing, querying, and aggregating transactions
//! - Route handlers for recording and listing transactions

mod core;
mod create_endpoint;
mod list_endpoint;

pub use core::{
    DailyFlow, Transaction, TransactionBuilder, TransactionKind, TransactionListItem,
    create_transaction, create_transaction_table, get_daily_flows, list_recent_transactions,
    list_transactions, map_transaction_row, sum_amounts_by_kind_in_range, sum_expenses_by_category,
};
pub use create_endpoint::{CreateTransactionRequest, create_transaction_endpoint};
pub use list_endpoint::list_transactions_endpoint;

pub(crate) use create_endpoint::CreateTransactionState;
pub(crate) use list_endpoint::ListTransactionsState;
