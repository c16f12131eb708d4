// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot operator commands.
//!
//! Each command opens the configured database, does its work, and prints
//! either a short human summary or, with `--json`, the full record.

use std::io::IsTerminal;

use chrono::{NaiveDate, Utc};
use colored::Colorize;
use innkeep_booking::VERIFICATION_QUEUE;
use innkeep_config::InnkeepConfig;
use innkeep_core::{
    AuditRecord, Booking, BookingError, BookingWithAudit, InnkeepError, QuotaStatus, Room,
    SlipVerifier,
};
use innkeep_slipok::SlipokVerifier;
use innkeep_storage::Database;
use innkeep_storage::queries::{catalog, queue};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use crate::setup::{build_engine, open_database};

fn print_json<T: Serialize>(value: &T) -> Result<(), BookingError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| InnkeepError::Internal(format!("failed to encode output: {e}")))?;
    println!("{text}");
    Ok(())
}

fn plain_output() {
    if !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }
}

/// `innkeep migrate`
pub async fn migrate(config: &InnkeepConfig) -> Result<(), BookingError> {
    let db = open_database(config).await?;
    db.close().await?;
    println!("innkeep: database ready at {}", config.storage.database_path);
    Ok(())
}

/// `innkeep availability`
pub async fn availability(
    config: &InnkeepConfig,
    check_in: NaiveDate,
    check_out: NaiveDate,
    category: Option<i64>,
    json: bool,
) -> Result<(), BookingError> {
    let db = open_database(config).await?;
    let engine = build_engine(config, &db);

    if let Some(category_id) = category {
        let rooms = engine.available_rooms(category_id, check_in, check_out).await?;
        if json {
            return print_json(&rooms);
        }
        plain_output();
        if rooms.is_empty() {
            println!("{}", "no rooms free for that stay".yellow());
        }
        for room in rooms {
            println!("  {} {}", "room".dimmed(), room.room_number.bold());
        }
        return Ok(());
    }

    let summary = engine.availability_summary(check_in, check_out).await?;
    if json {
        return print_json(&summary);
    }
    plain_output();
    println!("{} {check_in} to {check_out}", "Availability".bold());
    for entry in summary {
        let free = format!("{}/{}", entry.available_rooms, entry.total_rooms);
        let free = if entry.available_rooms == 0 {
            free.red()
        } else {
            free.green()
        };
        println!(
            "  [{}] {:<20} {:>10}/night  max {}  free {}",
            entry.category.id,
            entry.category.name,
            entry.category.nightly_price,
            entry.category.max_occupancy,
            free
        );
    }
    Ok(())
}

/// `innkeep booking show`
pub async fn show_booking(
    config: &InnkeepConfig,
    booking_id: &str,
    json: bool,
) -> Result<(), BookingError> {
    let db = open_database(config).await?;
    let engine = build_engine(config, &db);
    let record = engine.get_booking_with_audit(booking_id).await?;
    if json {
        return print_json(&record);
    }
    plain_output();
    print_booking(&record);
    Ok(())
}

fn print_booking(record: &BookingWithAudit) {
    let b: &Booking = &record.booking;
    println!("{} {}", "Booking".bold(), b.id);
    println!("  guest        {}", b.user_id);
    println!("  room         {} ({} to {}, {} guests)", b.room_number, b.check_in, b.check_out, b.guest_count);
    println!("  status       {}", b.status.to_string().bold());
    println!("  total        {} ({} {})", b.total_price, b.payment_type, b.payment_amount);
    if let Some(original) = b.original_total {
        println!(
            "  discount     {} off {} ({})",
            b.discount_amount,
            original,
            b.discount_reason.as_deref().unwrap_or("-")
        );
    }
    println!("  points       {}", b.points_earned);
    println!(
        "  slip         {} [{}]",
        b.slip_image_url.as_deref().unwrap_or("-"),
        b.slipok_status
    );
    println!("  admin        {}", b.admin_status);
    println!("{}", "History".bold());
    for entry in &record.audit {
        print_audit(entry);
    }
}

fn print_audit(entry: &AuditRecord) {
    println!(
        "  {}  {:<22} {}{}",
        entry.created_at.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
        entry.action.to_string(),
        entry.actor_id.as_deref().unwrap_or("system"),
        entry
            .notes
            .as_deref()
            .map(|n| format!("  \"{n}\""))
            .unwrap_or_default()
    );
}

/// `innkeep catalog add-category`
pub async fn add_category(
    config: &InnkeepConfig,
    name: &str,
    description: Option<&str>,
    nightly_price: Decimal,
    max_occupancy: u32,
) -> Result<(), BookingError> {
    if nightly_price <= Decimal::ZERO || max_occupancy == 0 {
        return Err(BookingError::Validation(
            "price and max occupancy must be positive".into(),
        ));
    }
    let db = open_database(config).await?;
    let category =
        catalog::insert_category(&db, name, description, nightly_price, max_occupancy).await?;
    info!(category_id = category.id, name, "room category added");
    println!("added category {} ({})", category.id, category.name);
    Ok(())
}

/// `innkeep catalog add-room`
pub async fn add_room(
    config: &InnkeepConfig,
    category_id: i64,
    room_number: &str,
) -> Result<(), BookingError> {
    let db = open_database(config).await?;
    if catalog::get_category(&db, category_id).await?.is_none() {
        return Err(BookingError::not_found("room category", category_id.to_string()));
    }
    let room = catalog::insert_room(&db, category_id, room_number).await?;
    info!(room_id = room.id, room_number, category_id, "room added");
    println!("added room {} to category {category_id}", room.room_number);
    Ok(())
}

async fn room_by_number(db: &Database, room_number: &str) -> Result<Room, BookingError> {
    catalog::get_room_by_number(db, room_number)
        .await?
        .ok_or_else(|| BookingError::not_found("room", room_number))
}

/// `innkeep catalog block-date`
pub async fn block_date(
    config: &InnkeepConfig,
    room_number: &str,
    date: NaiveDate,
    reason: Option<&str>,
) -> Result<(), BookingError> {
    let db = open_database(config).await?;
    let room = room_by_number(&db, room_number).await?;
    if catalog::block_date(&db, room.id, date, reason).await? {
        println!("room {room_number} blocked on {date}");
    } else {
        println!("room {room_number} was already blocked on {date}");
    }
    Ok(())
}

/// `innkeep catalog unblock-date`
pub async fn unblock_date(
    config: &InnkeepConfig,
    room_number: &str,
    date: NaiveDate,
) -> Result<(), BookingError> {
    let db = open_database(config).await?;
    let room = room_by_number(&db, room_number).await?;
    if catalog::unblock_date(&db, room.id, date).await? {
        info!(room_number, %date, "blocked date removed");
        println!("room {room_number} is back in service on {date}");
    } else {
        println!("room {room_number} was not blocked on {date}");
    }
    Ok(())
}

/// `innkeep catalog blocked`
pub async fn blocked_dates(
    config: &InnkeepConfig,
    room_number: &str,
    json: bool,
) -> Result<(), BookingError> {
    let db = open_database(config).await?;
    let room = room_by_number(&db, room_number).await?;
    let blocked = catalog::blocked_dates_for_room(&db, room.id).await?;
    if json {
        return print_json(&blocked);
    }
    plain_output();
    if blocked.is_empty() {
        println!("room {room_number} has no blocked nights");
    }
    for entry in blocked {
        println!(
            "  {}  {}",
            entry.date.to_string().bold(),
            entry.reason.as_deref().unwrap_or("-").dimmed()
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct QuotaReport {
    configured: bool,
    month: String,
    #[serde(flatten)]
    quota: QuotaStatus,
    queued_jobs: u64,
}

/// `innkeep quota`
pub async fn quota(config: &InnkeepConfig, json: bool) -> Result<(), BookingError> {
    let db = open_database(config).await?;
    let verifier = SlipokVerifier::new(&config.slipok, db.clone()).await?;
    let report = QuotaReport {
        configured: verifier.client().is_configured(),
        month: Utc::now().format("%Y-%m").to_string(),
        quota: verifier.check_quota().await?,
        queued_jobs: queue::pending_count(&db, VERIFICATION_QUEUE).await?,
    };
    if json {
        return print_json(&report);
    }

    plain_output();
    println!("{} {}", "SlipOK usage".bold(), report.month);
    if !report.configured {
        println!("  {}", "not configured: set slipok.api_key and slipok.branch_id".yellow());
    }
    let limit = report
        .quota
        .limit
        .map(|l| l.to_string())
        .unwrap_or_else(|| "unlimited".into());
    let used = format!("{} / {limit}", report.quota.used);
    println!(
        "  used         {}",
        if report.quota.exceeded { used.red() } else { used.normal() }
    );
    println!("  queued jobs  {}", report.queued_jobs);
    Ok(())
}
