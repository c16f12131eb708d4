// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Innkeep - room reservation and payment verification engine.
//!
//! This is the binary entry point: operator commands for the database,
//! catalog, bookings, and the background verification worker.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod commands;
mod setup;
mod shutdown;
mod worker;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

/// Innkeep - room reservation and payment verification engine.
#[derive(Parser, Debug)]
#[command(name = "innkeep", version, about, long_about = None)]
struct Cli {
    /// Config file to use instead of the standard lookup.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print machine-readable JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Create or upgrade the database schema.
    Migrate,
    /// Run the slip verification worker until interrupted.
    Worker,
    /// Show free rooms per category for a stay.
    Availability {
        #[arg(long)]
        check_in: NaiveDate,
        #[arg(long)]
        check_out: NaiveDate,
        /// Only list free rooms of this category.
        #[arg(long)]
        category: Option<i64>,
    },
    /// Inspect bookings.
    Booking {
        #[command(subcommand)]
        action: BookingCommands,
    },
    /// Manage room categories, rooms, and blocked dates.
    Catalog {
        #[command(subcommand)]
        action: CatalogCommands,
    },
    /// Show SlipOK usage for the current month.
    Quota,
}

#[derive(Subcommand, Debug)]
enum BookingCommands {
    /// Print a booking with its audit history.
    Show { booking_id: String },
}

#[derive(Subcommand, Debug)]
enum CatalogCommands {
    /// Add a room category.
    AddCategory {
        name: String,
        /// Price per night.
        #[arg(long)]
        price: Decimal,
        #[arg(long, default_value_t = 2)]
        max_occupancy: u32,
        #[arg(long)]
        description: Option<String>,
    },
    /// Add a room to a category.
    AddRoom {
        #[arg(long)]
        category: i64,
        room_number: String,
    },
    /// Take a room out of service for one night.
    BlockDate {
        room_number: String,
        date: NaiveDate,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Return a blocked night to service.
    UnblockDate {
        room_number: String,
        date: NaiveDate,
    },
    /// List the blocked nights of a room.
    Blocked { room_number: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => innkeep_config::load_and_validate_path(path),
        None => innkeep_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            innkeep_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    setup::init_tracing(&config.engine.log_level);

    let json = cli.json;
    let result = match cli.command {
        Some(Commands::Migrate) => commands::migrate(&config).await,
        Some(Commands::Worker) => worker::run_worker(config).await,
        Some(Commands::Availability {
            check_in,
            check_out,
            category,
        }) => commands::availability(&config, check_in, check_out, category, json).await,
        Some(Commands::Booking {
            action: BookingCommands::Show { booking_id },
        }) => commands::show_booking(&config, &booking_id, json).await,
        Some(Commands::Catalog { action }) => match action {
            CatalogCommands::AddCategory {
                name,
                price,
                max_occupancy,
                description,
            } => {
                commands::add_category(&config, &name, description.as_deref(), price, max_occupancy)
                    .await
            }
            CatalogCommands::AddRoom {
                category,
                room_number,
            } => commands::add_room(&config, category, &room_number).await,
            CatalogCommands::BlockDate {
                room_number,
                date,
                reason,
            } => commands::block_date(&config, &room_number, date, reason.as_deref()).await,
            CatalogCommands::UnblockDate { room_number, date } => {
                commands::unblock_date(&config, &room_number, date).await
            }
            CatalogCommands::Blocked { room_number } => {
                commands::blocked_dates(&config, &room_number, json).await
            }
        },
        Some(Commands::Quota) => commands::quota(&config, json).await,
        None => {
            println!("innkeep: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("innkeep: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc answers epoch/stats queries.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_parses_nested_subcommands() {
        let cli = Cli::try_parse_from([
            "innkeep",
            "--json",
            "catalog",
            "add-category",
            "Deluxe",
            "--price",
            "1000.50",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Some(Commands::Catalog {
                action:
                    CatalogCommands::AddCategory {
                        name,
                        price,
                        max_occupancy,
                        ..
                    },
            }) => {
                assert_eq!(name, "Deluxe");
                assert_eq!(price, Decimal::new(100050, 2));
                assert_eq!(max_occupancy, 2);
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn availability_requires_iso_dates() {
        let ok = Cli::try_parse_from([
            "innkeep",
            "availability",
            "--check-in",
            "2025-06-10",
            "--check-out",
            "2025-06-12",
        ]);
        assert!(ok.is_ok());

        let bad = Cli::try_parse_from([
            "innkeep",
            "availability",
            "--check-in",
            "10/06/2025",
            "--check-out",
            "2025-06-12",
        ]);
        assert!(bad.is_err());
    }
}
