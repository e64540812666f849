use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use time::{Duration, OffsetDateTime};

use moneytor::{PasswordHash, ValidatedPassword, initialize_db};

/// A utility for creating a test database for the REST API server of moneytor.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// Create and populate a database for manual testing.
///
/// The test user logs in with the email "test@example.com" and the password
/// "test".
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating test user...");

    let password_hash = PasswordHash::new(
        ValidatedPassword::new_unchecked("test"),
        PasswordHash::DEFAULT_COST,
    )?;

    conn.execute(
        "INSERT INTO user (email, password) VALUES (?1, ?2)",
        ("test@example.com", password_hash.to_string()),
    )?;

    println!("Creating test data...");

    for (name, kind) in [
        ("Groceries", "expense"),
        ("Rent", "expense"),
        ("Salary", "income"),
    ] {
        conn.execute(
            "INSERT INTO category (user_id, name, kind) VALUES (1, ?1, ?2)",
            (name, kind),
        )?;
    }

    // The current balance of the first account is its starting balance plus
    // the transactions inserted below.
    conn.execute(
        "INSERT INTO account (user_id, name, kind, starting_balance, current_balance, \
         available_balance, currency, is_sync_enabled) \
         VALUES (1, 'Everyday', 'checking', 1000.0, 2579.5, 2579.5, 'USD', 0)",
        (),
    )?;
    conn.execute(
        "INSERT INTO account (user_id, name, kind, starting_balance, current_balance, \
         available_balance, currency, is_sync_enabled) \
         VALUES (1, 'Rainy Day', 'savings', 5000.0, 5000.0, 5000.0, 'USD', 0)",
        (),
    )?;

    let today = OffsetDateTime::now_utc().date();

    for (amount, kind, category_id, description, date) in [
        (2500.0, "income", 3, "Salary", today.saturating_sub(Duration::days(14))),
        (800.0, "expense", 2, "Rent", today.saturating_sub(Duration::days(7))),
        (120.5, "expense", 1, "Countdown", today.saturating_sub(Duration::days(3))),
    ] {
        conn.execute(
            "INSERT INTO \"transaction\" (user_id, account_id, category_id, kind, amount, date, \
             description) VALUES (1, 1, ?1, ?2, ?3, ?4, ?5)",
            (category_id, kind, amount, date, description),
        )?;
    }

    let this_month = format!("{:04}-{:02}", today.year(), u8::from(today.month()));
    conn.execute(
        "INSERT INTO budget (user_id, category_id, period, amount) VALUES (1, 1, ?1, 400.0)",
        (this_month,),
    )?;

    println!("Success!");

    Ok(())
}
