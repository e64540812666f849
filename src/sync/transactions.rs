//! Reconciles provider transaction data into the ledger.

use std::collections::HashMap;

use rusqlite::{Connection, params};

use crate::{
    Error,
    account::AccountId,
    category::{Category, CategoryId, list_categories},
    provider::ProviderTransaction,
    transaction::TransactionKind,
    user::UserID,
};

/// Find the first category whose name appears inside the provider's category
/// label, ignoring case. `categories` is scanned in order, so passing a
/// name-sorted list makes the match deterministic.
fn match_category(label: &str, categories: &[Category]) -> Option<CategoryId> {
    let label = label.to_lowercase();

    categories
        .iter()
        .find(|category| label.contains(&category.name.to_lowercase()))
        .map(|category| category.id)
}

fn get_synced_account_ids(
    user_id: UserID,
    connection: &Connection,
) -> Result<HashMap<String, AccountId>, Error> {
    connection
        .prepare(
            "SELECT external_account_id, id FROM account \
             WHERE user_id = :user_id AND external_account_id IS NOT NULL",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?
        .map(|row_result| row_result.map_err(Error::from))
        .collect()
}

/// Write the provider's transactions for `user_id` into the ledger.
///
/// Rows are matched to accounts by external account ID, and rows for
/// accounts the user never linked are skipped. A transaction that was
/// already synced stays untouched, the ledger is insert-once. The provider
/// reports outflows as positive amounts, so positive amounts become expenses
/// and negative amounts become income, both stored as magnitudes.
///
/// Returns how many new rows were written.
///
/// # Errors
/// Returns an [Error::SqlError] if an SQL query fails.
pub fn insert_synced_transactions(
    user_id: UserID,
    provider_transactions: &[ProviderTransaction],
    connection: &Connection,
) -> Result<usize, Error> {
    let account_ids = get_synced_account_ids(user_id, connection)?;
    let categories = list_categories(user_id, connection)?;

    let mut inserted = 0;

    for provider_transaction in provider_transactions {
        let Some(&account_id) = account_ids.get(&provider_transaction.external_account_id) else {
            continue;
        };

        let kind = if provider_transaction.amount > 0.0 {
            TransactionKind::Expense
        } else {
            TransactionKind::Income
        };
        let category_id = provider_transaction
            .category
            .as_deref()
            .and_then(|label| match_category(label, &categories));

        inserted += connection.execute(
            "INSERT INTO \"transaction\" \
                (user_id, account_id, category_id, kind, amount, date, description, \
                 external_transaction_id, pending) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) \
             ON CONFLICT(user_id, external_transaction_id) DO NOTHING",
            params![
                user_id.as_i64(),
                account_id,
                category_id,
                kind,
                provider_transaction.amount.abs(),
                provider_transaction.date,
                provider_transaction.description,
                provider_transaction.external_id,
                provider_transaction.pending,
            ],
        )?;
    }

    Ok(inserted)
}

// ============================================================================
// TESTS
// ============================================================================
