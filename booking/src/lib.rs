//! # RailConnect
//!
//! A railway ticket booking controller. A user signs in, searches trains,
//! picks a fare class, fills in passengers, pays through a simulated
//! gateway and receives an e-ticket with a PNR that can later be cancelled
//! or found again in the booking history.
//!
//! The flow is a view-state machine (`Auth → Search → Results → Booking →
//! Payment → Ticket → History`) implemented as a reducer ([`app::AppReducer`])
//! running inside a `railconnect_runtime::Store`. Collaborators sit behind
//! traits in the environment:
//!
//! - [`auth::AuthProvider`]: sessions ([`auth::InMemoryAuthProvider`],
//!   [`auth::HostedAuthClient`])
//! - [`search::TrainGenerator`]: LLM train results with a static fallback
//! - [`bookings::BookingStore`]: ticket persistence (in-memory or `PostgreSQL`)
//!
//! [`app::RailConnectApp`] wraps the store in a request/response facade.
//!
//! ## Example
//!
//! ```ignore
//! let app = RailConnectApp::new(AppEnvironment::in_memory());
//! app.sign_up("asha@example.com", "secret1", Some("Asha")).await?;
//! let trains = app.search("New Delhi", "Mumbai Central", "2024-06-15").await?;
//! app.select_fare(0, 2).await?;
//! app.update_passenger(0, PassengerEntry::new("Asha", 31, Gender::Female)).await?;
//! app.set_contact("9876543210", "asha@example.com").await?;
//! app.submit_booking().await?;
//! let ticket = app.pay(PaymentMethod::Upi).await?;
//! ```

pub mod app;
pub mod auth;
pub mod bookings;
pub mod bootstrap;
pub mod config;
pub mod draft;
pub mod error;
pub mod payment;
pub mod search;
pub mod ticket;
pub mod types;

pub use app::{AppAction, AppEnvironment, AppReducer, AppState, RailConnectApp, View};
pub use config::Config;
pub use error::BookingError;
pub use ticket::{BookingStatus, Pnr, SyncStatus, Ticket};
pub use types::{
    ClassType, FareClass, Gender, Identity, Money, Passenger, PassengerEntry, SeatStatus,
    TrainOffer, UserId,
};
