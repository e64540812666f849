//! Reconciles provider account data into the account table.

use rusqlite::{Connection, params};
use time::OffsetDateTime;

use crate::{
    Error,
    account::AccountKind,
    provider::ProviderAccount,
    user::UserID,
};

/// Map the provider's account type and subtype onto an [AccountKind].
///
/// The first matching rule wins: a "credit" type is a credit card, "loan"
/// and "investment" types map onto themselves, a "savings" or "cd" subtype
/// is a savings account, and everything else is treated as checking.
pub fn map_provider_account_kind(kind: &str, subkind: Option<&str>) -> AccountKind {
    match (kind, subkind) {
        ("credit", _) => AccountKind::CreditCard,
        ("loan", _) => AccountKind::Loan,
        ("investment", _) => AccountKind::Investment,
        (_, Some("savings" | "cd")) => AccountKind::Savings,
        _ => AccountKind::Checking,
    }
}

/// Insert the provider's account for `user_id`, or refresh the balances of
/// the row that already carries the same external account ID.
///
/// Returns whether a new row was inserted. On the first sync the provider's
/// current balance also becomes the account's starting balance; later syncs
/// leave the starting balance untouched. Balances the provider omits are
/// stored as zero.
///
/// # Errors
/// Returns an [Error::SqlError] if the SQL query fails.
pub fn upsert_synced_account(
    user_id: UserID,
    account: &ProviderAccount,
    synced_at: OffsetDateTime,
    connection: &Connection,
) -> Result<bool, Error> {
    let already_linked = connection
        .prepare("SELECT id FROM account WHERE user_id = ?1 AND external_account_id = ?2")?
        .exists(params![user_id.as_i64(), account.external_id])?;

    let kind = map_provider_account_kind(&account.kind, account.subkind.as_deref());
    let current_balance = account.current_balance.unwrap_or(0.0);
    let available_balance = account.available_balance.unwrap_or(0.0);
    let currency = account.currency.as_deref().unwrap_or("USD");

    connection.execute(
        "INSERT INTO account \
            (user_id, name, kind, starting_balance, current_balance, available_balance, \
             currency, is_sync_enabled, external_account_id, last_synced_at) \
         VALUES (?1, ?2, ?3, ?4, ?4, ?5, ?6, 1, ?7, ?8) \
         ON CONFLICT(user_id, external_account_id) DO UPDATE SET \
            current_balance = excluded.current_balance, \
            available_balance = excluded.available_balance, \
            last_synced_at = excluded.last_synced_at",
        params![
            user_id.as_i64(),
            account.name,
            kind,
            current_balance,
            available_balance,
            currency,
            account.external_id,
            synced_at,
        ],
    )?;

    Ok(!already_linked)
}

// ============================================================================
// TESTS
// ============================================================================
