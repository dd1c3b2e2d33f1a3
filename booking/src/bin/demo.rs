//! RailConnect Demo
//!
//! Walks one booking end to end against whatever collaborators the
//! environment configures:
//! - sign up
//! - search and pick a fare
//! - add two passengers and pay
//! - cancel the ticket
//! - list the booking history
//!
//! # Usage
//!
//! ```bash
//! # Fully local: in-memory auth and bookings, fallback trains
//! cargo run --bin railconnect-demo
//!
//! # With LLM search and PostgreSQL
//! ANTHROPIC_API_KEY=... DATABASE_URL=postgres://... cargo run --bin railconnect-demo
//! ```

use railconnect::auth::SignUpOutcome;
use railconnect::bootstrap::{build_app, init_tracing};
use railconnect::payment::PaymentMethod;
use railconnect::ticket::CANCELLATION_CHARGE;
use railconnect::{Config, Gender, PassengerEntry, SyncStatus};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    init_tracing();

    println!("\n🚆 ============================================");
    println!("   RailConnect - Live Demo");
    println!("============================================\n");

    let config = Config::from_env();
    println!("⚙️  Initializing application...");
    let app = build_app(&config).await?;
    println!("✓ Application ready\n");

    // ========== Sign up ==========

    let email = format!("demo-{}@example.com", uuid::Uuid::new_v4().simple());
    println!("1️⃣  Signing up {email}...");
    match app.sign_up(&email, "railconnect", Some("Demo Traveller")).await? {
        SignUpOutcome::Session(identity) => {
            println!("   ✓ Signed in as {}\n", identity.display_name);
        }
        SignUpOutcome::PendingVerification { email } => {
            println!("   ✉️  Confirmation sent to {email}; confirm it and sign in to continue.");
            return Ok(());
        }
    }

    // ========== Search ==========

    println!("2️⃣  Searching New Delhi → Mumbai Central on 2024-06-15...");
    let trains = app.search("New Delhi", "Mumbai Central", "2024-06-15").await?;
    for (index, train) in trains.iter().enumerate() {
        println!(
            "   [{index}] {} {} {} → {} ({})",
            train.number, train.name, train.departure_time, train.arrival_time, train.duration
        );
        for fare in &train.fares {
            println!(
                "         {:<3} {:>8} {:>4} {}",
                fare.class_type.code(),
                fare.price.to_string(),
                fare.available,
                fare.status
            );
        }
    }

    let Some((train_index, fare_index)) = trains.iter().enumerate().find_map(|(t, train)| {
        train
            .fares
            .iter()
            .position(railconnect::FareClass::is_selectable)
            .map(|f| (t, f))
    }) else {
        println!("   ✗ No bookable fare in the results");
        return Ok(());
    };
    println!();

    // ========== Booking ==========

    println!("3️⃣  Booking train {train_index}, fare {fare_index} for two passengers...");
    app.select_fare(train_index, fare_index).await?;
    app.update_passenger(0, PassengerEntry::new("Asha Rao", 31, Gender::Female))
        .await?;
    let second = app.add_passenger().await?;
    app.update_passenger(second, PassengerEntry::new("Vikram Rao", 34, Gender::Male))
        .await?;
    app.set_contact("9876543210", &email).await?;
    let total = app.submit_booking().await?;
    println!("   ✓ Total payable: {total}\n");

    // ========== Payment ==========

    println!(
        "4️⃣  Paying by UPI (simulated, {:?})...",
        Duration::from_millis(config.payment.processing_delay_ms)
    );
    let ticket = app.pay(PaymentMethod::Upi).await?;
    println!("   ✓ PNR {} {}", ticket.pnr, ticket.status);
    println!("   ✓ {} {} on {}", ticket.train.number, ticket.train.name, ticket.travel_date);
    match &ticket.sync {
        SyncStatus::Synced => println!("   ✓ Saved to booking history\n"),
        SyncStatus::Pending => println!("   … Saving to booking history\n"),
        SyncStatus::Unsynced { error } => println!("   ⚠️  Not saved ({error})\n"),
    }

    // ========== Cancellation ==========

    println!("5️⃣  Cancelling PNR {} (charge {CANCELLATION_CHARGE})...", ticket.pnr);
    match app.cancel_ticket().await {
        Ok(cancelled) => println!("   ✓ Status: {}\n", cancelled.status),
        Err(error) => println!("   ✗ {error}\n"),
    }

    // ========== History ==========

    println!("6️⃣  Booking history...");
    let history = app.show_history().await?;
    if history.is_empty() {
        println!("   (no bookings)");
    }
    for ticket in &history {
        println!(
            "   {} {} {} {}",
            ticket.pnr, ticket.train.number, ticket.travel_date, ticket.status
        );
    }

    app.sign_out().await?;
    app.shutdown(Duration::from_secs(5)).await?;

    println!("\n✓ Demo complete\n");
    Ok(())
}
