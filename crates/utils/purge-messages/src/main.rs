//! # Purge Messages Utility
//!
//! Deletes every ledger message whose retention deadline has passed.
//!
//! The server already filters expired messages on read and sweeps them on an
//! interval; this binary is for running the purge by hand (e.g. from cron
//! while the server is down).
//!
//! ## Usage
//!
//! ```bash
//! cargo run --package purge-messages --bin purge_messages
//! cargo run --package purge-messages --bin purge_messages -- --yes
//! ```

use lib_core::model::store::MessageLedger;
use lib_core::{create_pool, run_migrations};
use lib_utils::{format_time, get_env_or, now_utc};
use std::io::{self, Write};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let assume_yes = std::env::args().skip(1).any(|arg| arg == "--yes" || arg == "-y");

    println!("============================================");
    println!("  Purge Expired Messages");
    println!("============================================");
    println!();

    let database_url = get_env_or("DATABASE_URL", "sqlite:data/collab.db");
    println!("Connecting to {}...", database_url);
    let pool = create_pool(&database_url).await?;
    run_migrations(&pool).await?;
    println!("Connected successfully.");
    println!();

    let now = now_utc();
    let expired = MessageLedger::count_expired_at(&pool, now).await?;

    if expired == 0 {
        println!("No expired messages as of {}.", format_time(now));
        println!("Nothing to delete.");
        return Ok(());
    }

    println!("Found {} expired message(s) as of {}.", expired, format_time(now));
    println!();

    if !assume_yes {
        print!("Delete them now? (yes/no): ");
        io::stdout().flush()?;

        let mut confirmation = String::new();
        io::stdin().read_line(&mut confirmation)?;
        let confirmation = confirmation.trim().to_lowercase();

        if confirmation != "yes" && confirmation != "y" {
            println!("Operation cancelled.");
            return Ok(());
        }
        println!();
    }

    let deleted = MessageLedger::purge_expired_at(&pool, now).await?;

    println!("Successfully deleted {} message(s).", deleted);
    Ok(())
}
